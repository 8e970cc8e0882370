//! Row-major planting grid over a projected field polygon.
//!
//! Rows run east–west and step `row_spacing_m` northward; plants step
//! `plant_spacing_m` eastward along a row. Each plant owns one
//! `row × plant` cell, and a plant is only placed when its whole cell lies
//! inside the polygon, so the planted cells never overlap and never exceed
//! the polygon area.

use crate::candidate::SpacingCandidate;
use crate::geometry::FieldGeometry;
use crate::spatial::{self, EdgeSegment};
use rayon::prelude::*;
use rstar::RTree;
use serde::{Deserialize, Serialize};

/// Cells are shrunk by this much before the boundary test, so a cell that
/// merely shares an edge with the boundary still counts as inside.
const EDGE_TOLERANCE_M: f64 = 1e-6;

/// Largest lattice (rows × columns over the bounding box) a layout may scan.
pub const MAX_GRID_CELLS: u64 = 25_000_000;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GridError {
    #[error("spacing {row_spacing_m} x {plant_spacing_m} m needs {cells} grid cells, limit is {max}")]
    TooManyCells {
        row_spacing_m: f64,
        plant_spacing_m: f64,
        cells: u64,
        max: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlantPosition {
    pub row: u32,
    pub col: u32,
    /// Metres east of the field origin.
    pub x_m: f64,
    /// Metres north of the field origin.
    pub y_m: f64,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GridLayout {
    pub plant_count: u64,
    /// Rows holding at least one plant.
    pub rows: u32,
    /// Most plants in any single row.
    pub plants_per_row: u32,
    pub field_efficiency_pct: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub positions: Vec<PlantPosition>,
}

/// Lattice over the polygon's bounding box for one spacing.
struct Lattice<'a> {
    field: &'a FieldGeometry,
    tree: RTree<EdgeSegment>,
    origin: [f64; 2],
    row: f64,
    plant: f64,
    n_rows: usize,
    n_cols: usize,
}

impl Lattice<'_> {
    fn planted(&self, r: usize, c: usize) -> bool {
        let x0 = self.origin[0] + c as f64 * self.plant;
        let y0 = self.origin[1] + r as f64 * self.row;
        cell_inside(self.field, &self.tree, [x0, y0], [x0 + self.plant, y0 + self.row])
    }

    fn planted_in_row(&self, r: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.n_cols).filter(move |&c| self.planted(r, c))
    }

    fn position(&self, r: usize, c: usize) -> PlantPosition {
        PlantPosition {
            row: r as u32,
            col: c as u32,
            x_m: self.origin[0] + (c as f64 + 0.5) * self.plant,
            y_m: self.origin[1] + (r as f64 + 0.5) * self.row,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridLayoutGenerator {
    /// Plant positions to return with the layout; `0` returns counts only.
    pub max_positions: usize,
}

impl GridLayoutGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_positions(mut self, max_positions: usize) -> Self {
        self.max_positions = max_positions;
        self
    }

    /// Lattice size for `candidate` over the field's bounding box.
    pub fn cell_count(candidate: &SpacingCandidate, field: &FieldGeometry) -> u64 {
        let (min, max) = field.polygon.bounding_box();
        let rows = ((max[1] - min[1]) / candidate.row_spacing_m).floor();
        let cols = ((max[0] - min[0]) / candidate.plant_spacing_m).floor();
        // Float-to-int casts saturate, so absurd lattices stay above the limit.
        (rows * cols) as u64
    }

    /// Fail fast when laying out `candidate` would exceed [`MAX_GRID_CELLS`].
    pub fn check_size(candidate: &SpacingCandidate, field: &FieldGeometry) -> Result<(), GridError> {
        let cells = Self::cell_count(candidate, field);
        if cells > MAX_GRID_CELLS {
            return Err(GridError::TooManyCells {
                row_spacing_m: candidate.row_spacing_m,
                plant_spacing_m: candidate.plant_spacing_m,
                cells,
                max: MAX_GRID_CELLS,
            });
        }
        Ok(())
    }

    pub fn generate(
        &self,
        candidate: &SpacingCandidate,
        field: &FieldGeometry,
    ) -> Result<GridLayout, GridError> {
        let row = candidate.row_spacing_m;
        let plant = candidate.plant_spacing_m;
        if !(candidate.is_finite() && row > 0.0 && plant > 0.0) {
            return Ok(GridLayout::default());
        }
        Self::check_size(candidate, field)?;

        let (min, max) = field.polygon.bounding_box();
        let lattice = Lattice {
            field,
            tree: spatial::build_edge_index(&field.polygon),
            origin: min,
            row,
            plant,
            n_rows: ((max[1] - min[1]) / row).floor() as usize,
            n_cols: ((max[0] - min[0]) / plant).floor() as usize,
        };

        let per_row: Vec<u32> = (0..lattice.n_rows)
            .into_par_iter()
            .map(|r| lattice.planted_in_row(r).count() as u32)
            .collect();

        // The authoritative area may be smaller than the drawn polygon.
        let cap = (field.area_m2 / candidate.area_per_plant_m2()).floor() as u64;

        let mut layout = GridLayout::default();
        let mut remaining = cap;
        for (r, &count) in per_row.iter().enumerate() {
            if remaining == 0 {
                break;
            }
            let take = u64::from(count).min(remaining);
            if take == 0 {
                continue;
            }
            remaining -= take;
            layout.plant_count += take;
            layout.rows += 1;
            layout.plants_per_row = layout.plants_per_row.max(take as u32);

            let wanted = self.max_positions.saturating_sub(layout.positions.len());
            if wanted > 0 {
                layout.positions.extend(
                    lattice
                        .planted_in_row(r)
                        .take((take as usize).min(wanted))
                        .map(|c| lattice.position(r, c)),
                );
            }
        }

        let used_m2 = layout.plant_count as f64 * candidate.area_per_plant_m2();
        layout.field_efficiency_pct = if field.polygon_area_m2 > 0.0 {
            (used_m2 / field.polygon_area_m2 * 100.0).clamp(0.0, 100.0)
        } else {
            0.0
        };

        tracing::debug!(
            plant_count = layout.plant_count,
            rows = layout.rows,
            plants_per_row = layout.plants_per_row,
            field_efficiency_pct = layout.field_efficiency_pct,
            "grid generated"
        );
        Ok(layout)
    }
}

fn cell_inside(
    field: &FieldGeometry,
    tree: &RTree<EdgeSegment>,
    min: [f64; 2],
    max: [f64; 2],
) -> bool {
    let centre = [(min[0] + max[0]) / 2.0, (min[1] + max[1]) / 2.0];
    if !field.polygon.contains(centre) {
        return false;
    }
    let inner_min = [min[0] + EDGE_TOLERANCE_M, min[1] + EDGE_TOLERANCE_M];
    let inner_max = [max[0] - EDGE_TOLERANCE_M, max[1] - EDGE_TOLERANCE_M];
    !spatial::rect_touches_boundary(tree, inner_min, inner_max)
}
