use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// A (row spacing, intra-row spacing) pair in metres.
///
/// Candidates are plain `Copy` values; operators always return a new
/// candidate instead of editing one in place.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpacingCandidate {
    pub row_spacing_m: f64,
    pub plant_spacing_m: f64,
}

impl SpacingCandidate {
    pub const fn new(row_spacing_m: f64, plant_spacing_m: f64) -> Self {
        Self {
            row_spacing_m,
            plant_spacing_m,
        }
    }

    /// Ground area allotted to one plant.
    pub fn area_per_plant_m2(&self) -> f64 {
        self.row_spacing_m * self.plant_spacing_m
    }

    pub fn plants_per_m2(&self) -> f64 {
        1.0 / self.area_per_plant_m2()
    }

    /// Naive plant count for `area_m2`, ignoring boundary loss.
    pub fn naive_plant_count(&self, area_m2: f64) -> f64 {
        area_m2 / self.area_per_plant_m2()
    }

    pub(crate) fn genes(&self) -> [f64; 2] {
        [self.row_spacing_m, self.plant_spacing_m]
    }

    pub(crate) fn from_genes(genes: [f64; 2]) -> Self {
        Self::new(genes[0], genes[1])
    }

    pub fn is_finite(&self) -> bool {
        self.row_spacing_m.is_finite() && self.plant_spacing_m.is_finite()
    }

    /// Denser spacing first: smaller row spacing, then smaller plant spacing.
    pub fn density_cmp(&self, other: &Self) -> Ordering {
        self.row_spacing_m
            .total_cmp(&other.row_spacing_m)
            .then_with(|| self.plant_spacing_m.total_cmp(&other.plant_spacing_m))
    }
}

/// A candidate together with its fitness in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Individual {
    pub candidate: SpacingCandidate,
    pub fitness: f64,
}

impl Individual {
    pub fn new(candidate: SpacingCandidate, fitness: f64) -> Self {
        Self { candidate, fitness }
    }

    /// Ranking order: higher fitness first, ties go to the denser candidate.
    ///
    /// This is a total order, so sorting a population never depends on the
    /// order in which fitness values were produced.
    pub fn rank_cmp(&self, other: &Self) -> Ordering {
        other
            .fitness
            .total_cmp(&self.fitness)
            .then_with(|| self.candidate.density_cmp(&other.candidate))
    }
}
