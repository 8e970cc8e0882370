use crate::geometry::Polygon;
use rstar::{RTree, RTreeObject, AABB};

/// One boundary edge, indexed by its position in the ring.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EdgeSegment {
    pub index: usize,
    pub start: [f64; 2],
    pub end: [f64; 2],
}

impl RTreeObject for EdgeSegment {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(self.start, self.end)
    }
}

/// Build an R*-tree over the polygon's edges via bulk_load (O(n log n)).
pub fn build_edge_index(polygon: &Polygon) -> RTree<EdgeSegment> {
    RTree::bulk_load(
        polygon
            .edges()
            .map(|(index, start, end)| EdgeSegment { index, start, end })
            .collect(),
    )
}

/// True if any boundary edge touches the closed rectangle `[min, max]`.
/// Uses an envelope query, then an exact segment/rectangle clip.
pub fn rect_touches_boundary(tree: &RTree<EdgeSegment>, min: [f64; 2], max: [f64; 2]) -> bool {
    let envelope = AABB::from_corners(min, max);
    tree.locate_in_envelope_intersecting(&envelope)
        .any(|edge| segment_touches_rect(edge.start, edge.end, min, max))
}

/// Return the first pair of non-adjacent edges that intersect, or adjacent
/// edges that fold back over each other.
pub fn find_self_intersection(polygon: &Polygon) -> Option<(usize, usize)> {
    let n = polygon.vertices().len();
    let tree = build_edge_index(polygon);
    let mut edges: Vec<EdgeSegment> = tree.iter().copied().collect();
    // Deterministic report order regardless of tree layout.
    edges.sort_by_key(|e| e.index);

    for edge in &edges {
        let mut hits: Vec<&EdgeSegment> = tree
            .locate_in_envelope_intersecting(&edge.envelope())
            .filter(|other| other.index > edge.index)
            .collect();
        hits.sort_by_key(|e| e.index);
        for other in hits {
            let adjacent = other.index == edge.index + 1 || (edge.index == 0 && other.index == n - 1);
            let crossing = if adjacent {
                folds_back(edge, other)
            } else {
                segments_intersect(edge.start, edge.end, other.start, other.end)
            };
            if crossing {
                return Some((edge.index, other.index));
            }
        }
    }
    None
}

fn cross(o: [f64; 2], a: [f64; 2], b: [f64; 2]) -> f64 {
    (a[0] - o[0]) * (b[1] - o[1]) - (a[1] - o[1]) * (b[0] - o[0])
}

fn on_segment(p: [f64; 2], q: [f64; 2], r: [f64; 2]) -> bool {
    q[0] >= p[0].min(r[0]) && q[0] <= p[0].max(r[0]) && q[1] >= p[1].min(r[1]) && q[1] <= p[1].max(r[1])
}

fn segments_intersect(p1: [f64; 2], p2: [f64; 2], q1: [f64; 2], q2: [f64; 2]) -> bool {
    let d1 = cross(q1, q2, p1);
    let d2 = cross(q1, q2, p2);
    let d3 = cross(p1, p2, q1);
    let d4 = cross(p1, p2, q2);

    if ((d1 > 0.0 && d2 < 0.0) || (d1 < 0.0 && d2 > 0.0))
        && ((d3 > 0.0 && d4 < 0.0) || (d3 < 0.0 && d4 > 0.0))
    {
        return true;
    }
    (d1 == 0.0 && on_segment(q1, p1, q2))
        || (d2 == 0.0 && on_segment(q1, p2, q2))
        || (d3 == 0.0 && on_segment(p1, q1, p2))
        || (d4 == 0.0 && on_segment(p1, q2, p2))
}

/// Adjacent edges share one vertex; they only overlap if collinear and
/// pointing back along each other.
fn folds_back(a: &EdgeSegment, b: &EdgeSegment) -> bool {
    let da = [a.end[0] - a.start[0], a.end[1] - a.start[1]];
    let db = [b.end[0] - b.start[0], b.end[1] - b.start[1]];
    let cross = da[0] * db[1] - da[1] * db[0];
    let dot = da[0] * db[0] + da[1] * db[1];
    cross == 0.0 && dot < 0.0
}

/// Liang–Barsky clip of a segment against a closed rectangle.
pub(crate) fn segment_touches_rect(
    start: [f64; 2],
    end: [f64; 2],
    min: [f64; 2],
    max: [f64; 2],
) -> bool {
    let mut t0 = 0.0f64;
    let mut t1 = 1.0f64;
    for axis in 0..2 {
        let d = end[axis] - start[axis];
        if d == 0.0 {
            if start[axis] < min[axis] || start[axis] > max[axis] {
                return false;
            }
            continue;
        }
        let mut ta = (min[axis] - start[axis]) / d;
        let mut tb = (max[axis] - start[axis]) / d;
        if ta > tb {
            std::mem::swap(&mut ta, &mut tb);
        }
        t0 = t0.max(ta);
        t1 = t1.min(tb);
        if t0 > t1 {
            return false;
        }
    }
    true
}
