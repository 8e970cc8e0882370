//! Field boundaries: validation and projection into a local metric frame.
//!
//! Boundaries arrive as `[latitude, longitude]` pairs. Everything downstream
//! (area, perimeter, grid layout) works on a [`Polygon`] in metres, projected
//! equirectangularly about the vertex centroid. That is accurate to well under
//! a percent for farm-sized fields away from the poles.

use crate::spatial;
use serde::{Deserialize, Serialize};

/// Mean Earth radius (IUGG).
pub const EARTH_RADIUS_M: f64 = 6_371_008.8;
pub const SQUARE_METRES_PER_HECTARE: f64 = 10_000.0;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeometryError {
    #[error("boundary needs at least 3 distinct vertices, got {count}")]
    TooFewVertices { count: usize },
    #[error("vertex {index} is not a finite [lat, lon] pair within range")]
    InvalidCoordinate { index: usize },
    #[error("vertex {index} repeats the previous vertex")]
    DuplicateVertex { index: usize },
    #[error("boundary edges {first} and {second} intersect")]
    SelfIntersecting { first: usize, second: usize },
    #[error("field area must be positive, got {area_m2} m²")]
    NonPositiveArea { area_m2: f64 },
}

/// Field as supplied by a caller: boundary vertices plus an optional area.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// `[latitude, longitude]` in decimal degrees.
    pub boundary: Vec<[f64; 2]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_hectares: Option<f64>,
}

impl Field {
    pub fn new(boundary: Vec<[f64; 2]>) -> Self {
        Self {
            boundary,
            area_hectares: None,
        }
    }

    pub fn with_area_hectares(mut self, area_hectares: f64) -> Self {
        self.area_hectares = Some(area_hectares);
        self
    }

    /// Square field of `area_hectares` centred on `anchor`, for records that
    /// carry an area but no surveyed boundary.
    pub fn square_from_area(anchor: [f64; 2], area_hectares: f64) -> Self {
        let half_side = (area_hectares * SQUARE_METRES_PER_HECTARE).sqrt() / 2.0;
        let dlat = (half_side / EARTH_RADIUS_M).to_degrees();
        let dlon = dlat / anchor[0].to_radians().cos();
        let [lat, lon] = anchor;
        Self {
            boundary: vec![
                [lat - dlat, wrap_longitude(lon - dlon)],
                [lat - dlat, wrap_longitude(lon + dlon)],
                [lat + dlat, wrap_longitude(lon + dlon)],
                [lat + dlat, wrap_longitude(lon - dlon)],
            ],
            area_hectares: Some(area_hectares),
        }
    }

    /// Validate the boundary and project it. Nothing is computed for a field
    /// that fails here.
    pub fn validate(&self) -> Result<FieldGeometry, GeometryError> {
        let ring = open_ring(&self.boundary);
        if ring.len() < 3 {
            return Err(GeometryError::TooFewVertices { count: ring.len() });
        }
        for (index, &[lat, lon]) in ring.iter().enumerate() {
            let valid = lat.is_finite()
                && lon.is_finite()
                && (-90.0..=90.0).contains(&lat)
                && (-180.0..=180.0).contains(&lon);
            if !valid {
                return Err(GeometryError::InvalidCoordinate { index });
            }
        }
        let ring = unwrap_longitudes(ring);
        for index in 0..ring.len() {
            let prev = ring[(index + ring.len() - 1) % ring.len()];
            if ring[index] == prev {
                return Err(GeometryError::DuplicateVertex { index });
            }
        }

        let centre = centroid(&ring);
        let polygon = Polygon::new(ring.iter().map(|&v| project(v, centre)).collect());
        let origin = [centre[0], wrap_longitude(centre[1])];

        let polygon_area_m2 = polygon.area();
        if !(polygon_area_m2 > 0.0) {
            return Err(GeometryError::NonPositiveArea {
                area_m2: polygon_area_m2,
            });
        }
        if let Some((first, second)) = spatial::find_self_intersection(&polygon) {
            return Err(GeometryError::SelfIntersecting { first, second });
        }

        let area_m2 = match self.area_hectares {
            Some(ha) => {
                let area_m2 = ha * SQUARE_METRES_PER_HECTARE;
                if !(area_m2.is_finite() && area_m2 > 0.0) {
                    return Err(GeometryError::NonPositiveArea { area_m2 });
                }
                area_m2
            }
            None => polygon_area_m2,
        };

        Ok(FieldGeometry {
            origin,
            perimeter_m: polygon.perimeter(),
            polygon,
            polygon_area_m2,
            area_m2,
        })
    }
}

/// Drop the closing vertex of a GeoJSON-style closed ring.
fn open_ring(boundary: &[[f64; 2]]) -> &[[f64; 2]] {
    match boundary {
        [first, .., last] if boundary.len() > 3 && first == last => {
            &boundary[..boundary.len() - 1]
        }
        _ => boundary,
    }
}

/// Map a longitude into `[-180, 180)`.
fn wrap_longitude(lon: f64) -> f64 {
    (lon + 180.0).rem_euclid(360.0) - 180.0
}

/// Shift longitudes by whole turns so every vertex lies within 180° of the
/// first one. A field straddling the antimeridian then projects as the small
/// polygon it is instead of wrapping around the globe.
fn unwrap_longitudes(ring: &[[f64; 2]]) -> Vec<[f64; 2]> {
    let reference = ring[0][1];
    ring.iter()
        .map(|&[lat, lon]| {
            let mut lon = lon;
            while lon - reference > 180.0 {
                lon -= 360.0;
            }
            while reference - lon > 180.0 {
                lon += 360.0;
            }
            [lat, lon]
        })
        .collect()
}

fn centroid(ring: &[[f64; 2]]) -> [f64; 2] {
    let n = ring.len() as f64;
    let (lat, lon) = ring
        .iter()
        .fold((0.0, 0.0), |(lat, lon), v| (lat + v[0], lon + v[1]));
    [lat / n, lon / n]
}

/// `[lat, lon]` → local `[east, north]` metres relative to `origin`.
fn project(vertex: [f64; 2], origin: [f64; 2]) -> [f64; 2] {
    let cos_lat = origin[0].to_radians().cos();
    [
        EARTH_RADIUS_M * (vertex[1] - origin[1]).to_radians() * cos_lat,
        EARTH_RADIUS_M * (vertex[0] - origin[0]).to_radians(),
    ]
}

/// Simple polygon in local metres, vertices in boundary order (not closed).
#[derive(Clone, Debug, PartialEq)]
pub struct Polygon {
    vertices: Vec<[f64; 2]>,
}

impl Polygon {
    pub fn new(vertices: Vec<[f64; 2]>) -> Self {
        Self { vertices }
    }

    pub fn vertices(&self) -> &[[f64; 2]] {
        &self.vertices
    }

    /// Edges as `(index, start, end)`; edge `i` runs from vertex `i` to `i + 1`.
    pub fn edges(&self) -> impl Iterator<Item = (usize, [f64; 2], [f64; 2])> + '_ {
        let n = self.vertices.len();
        (0..n).map(move |i| (i, self.vertices[i], self.vertices[(i + 1) % n]))
    }

    /// Shoelace area, orientation-independent.
    pub fn area(&self) -> f64 {
        let twice: f64 = self
            .edges()
            .map(|(_, a, b)| a[0] * b[1] - b[0] * a[1])
            .sum();
        twice.abs() / 2.0
    }

    pub fn perimeter(&self) -> f64 {
        self.edges()
            .map(|(_, a, b)| (b[0] - a[0]).hypot(b[1] - a[1]))
            .sum()
    }

    /// Axis-aligned bounding rectangle as `(min, max)` corners.
    pub fn bounding_box(&self) -> ([f64; 2], [f64; 2]) {
        self.vertices.iter().fold(
            ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]),
            |(min, max), v| {
                (
                    [min[0].min(v[0]), min[1].min(v[1])],
                    [max[0].max(v[0]), max[1].max(v[1])],
                )
            },
        )
    }

    /// Ray-casting point-in-polygon test.
    pub fn contains(&self, point: [f64; 2]) -> bool {
        let [x, y] = point;
        let mut inside = false;
        for (_, a, b) in self.edges() {
            if (a[1] > y) != (b[1] > y) {
                let x_cross = (b[0] - a[0]) * (y - a[1]) / (b[1] - a[1]) + a[0];
                if x < x_cross {
                    inside = !inside;
                }
            }
        }
        inside
    }
}

/// A validated field, projected into local metres.
#[derive(Clone, Debug)]
pub struct FieldGeometry {
    /// `[lat, lon]` of the projection origin.
    pub origin: [f64; 2],
    pub polygon: Polygon,
    pub polygon_area_m2: f64,
    /// Authoritative field area: the supplied area when present, else the
    /// polygon's.
    pub area_m2: f64,
    pub perimeter_m: f64,
}

impl FieldGeometry {
    pub fn area_hectares(&self) -> f64 {
        self.area_m2 / SQUARE_METRES_PER_HECTARE
    }

    pub fn polygon_area_hectares(&self) -> f64 {
        self.polygon_area_m2 / SQUARE_METRES_PER_HECTARE
    }
}
