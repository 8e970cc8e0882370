//! Scoring of spacing candidates.
//!
//! Fitness is a weighted blend of three terms, each in `[0, 1]`:
//!
//! * **density**: plants per area relative to the densest admissible spacing,
//! * **suitability**: closeness to the recommended spacing, measured in
//!   range-normalised coordinates so both axes count equally,
//! * **edge loss**: share of the field lost to a half-row strip along the
//!   boundary, which grows with the perimeter-to-area ratio and row spacing.
//!
//! The blend `w_d·density + w_s·suitability − w_e·edge_loss` is rescaled
//! linearly from its attainable range `[−w_e, w_d + w_s]` onto `[0, 1]`.

use crate::bounds::SpacingBounds;
use crate::candidate::SpacingCandidate;
use crate::config::FitnessWeights;
use crate::geometry::FieldGeometry;
use serde::{Deserialize, Serialize};

/// The field quantities fitness depends on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldMetrics {
    pub area_m2: f64,
    pub perimeter_m: f64,
}

impl FieldMetrics {
    pub fn new(area_m2: f64, perimeter_m: f64) -> Self {
        Self {
            area_m2,
            perimeter_m,
        }
    }

    pub fn perimeter_to_area(&self) -> f64 {
        self.perimeter_m / self.area_m2
    }
}

impl From<&FieldGeometry> for FieldMetrics {
    fn from(geometry: &FieldGeometry) -> Self {
        Self::new(geometry.area_m2, geometry.perimeter_m)
    }
}

/// Unweighted fitness components, each in `[0, 1]`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct FitnessTerms {
    pub density: f64,
    pub suitability: f64,
    pub edge_loss: f64,
}

/// Stateless scorer; safe to share across evaluation threads.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FitnessEvaluator {
    weights: FitnessWeights,
}

impl Default for FitnessEvaluator {
    fn default() -> Self {
        Self::new(FitnessWeights::default())
    }
}

impl FitnessEvaluator {
    pub fn new(weights: FitnessWeights) -> Self {
        Self { weights }
    }

    pub fn weights(&self) -> &FitnessWeights {
        &self.weights
    }

    pub fn terms(
        &self,
        candidate: &SpacingCandidate,
        field: &FieldMetrics,
        bounds: &SpacingBounds,
    ) -> FitnessTerms {
        FitnessTerms {
            density: density_term(candidate, bounds),
            suitability: suitability_term(candidate, bounds),
            edge_loss: edge_loss_term(candidate, field),
        }
    }

    /// Fitness in `[0, 1]`. Deterministic for identical inputs.
    pub fn evaluate(
        &self,
        candidate: &SpacingCandidate,
        field: &FieldMetrics,
        bounds: &SpacingBounds,
    ) -> f64 {
        let terms = self.terms(candidate, field, bounds);
        let w = &self.weights;
        let raw = w.density * terms.density + w.suitability * terms.suitability
            - w.edge_loss * terms.edge_loss;
        let floor = -w.edge_loss;
        let span = w.density + w.suitability + w.edge_loss;
        if span <= 0.0 || !raw.is_finite() {
            return 0.0;
        }
        ((raw - floor) / span).clamp(0.0, 1.0)
    }
}

/// Raw density `area / (row * plant)` relative to the densest corner of the
/// bounds; the area cancels out.
pub(crate) fn density_term(candidate: &SpacingCandidate, bounds: &SpacingBounds) -> f64 {
    let densest = bounds.row_min * bounds.plant_min;
    (densest / candidate.area_per_plant_m2()).clamp(0.0, 1.0)
}

pub(crate) fn suitability_term(candidate: &SpacingCandidate, bounds: &SpacingBounds) -> f64 {
    let rec = bounds.recommended;
    let normalized = |value: f64, center: f64, range: f64| {
        if range > 0.0 {
            (value - center) / range
        } else {
            0.0
        }
    };
    let row_range = bounds.row_range();
    let plant_range = bounds.plant_range();
    let distance = |c: SpacingCandidate| {
        normalized(c.row_spacing_m, rec.row_spacing_m, row_range)
            .hypot(normalized(c.plant_spacing_m, rec.plant_spacing_m, plant_range))
    };

    let farthest = [
        SpacingCandidate::new(bounds.row_min, bounds.plant_min),
        SpacingCandidate::new(bounds.row_min, bounds.plant_max),
        SpacingCandidate::new(bounds.row_max, bounds.plant_min),
        SpacingCandidate::new(bounds.row_max, bounds.plant_max),
    ]
    .into_iter()
    .map(distance)
    .fold(0.0f64, f64::max);
    if farthest <= 0.0 {
        return 1.0;
    }
    (1.0 - distance(*candidate) / farthest).clamp(0.0, 1.0)
}

pub(crate) fn edge_loss_term(candidate: &SpacingCandidate, field: &FieldMetrics) -> f64 {
    (field.perimeter_to_area() * candidate.row_spacing_m / 2.0).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suitability::Tolerance;
    use approx::assert_relative_eq;

    fn loam_tropical() -> SpacingBounds {
        SpacingBounds::around(SpacingCandidate::new(0.8, 0.5), Tolerance::default())
    }

    fn acre() -> FieldMetrics {
        // 63.64 m square.
        FieldMetrics::new(4_050.0, 4.0 * 4_050f64.sqrt())
    }

    #[test]
    fn fitness_stays_in_unit_interval_across_bounds() {
        let bounds = loam_tropical();
        let evaluator = FitnessEvaluator::default();
        for i in 0..=10 {
            for j in 0..=10 {
                let c = SpacingCandidate::new(
                    bounds.row_min + bounds.row_range() * i as f64 / 10.0,
                    bounds.plant_min + bounds.plant_range() * j as f64 / 10.0,
                );
                let f = evaluator.evaluate(&c, &acre(), &bounds);
                assert!((0.0..=1.0).contains(&f), "fitness {f} for {c:?}");
            }
        }
    }

    #[test]
    fn recommended_point_is_fully_suitable() {
        let bounds = loam_tropical();
        assert_relative_eq!(suitability_term(&bounds.recommended, &bounds), 1.0);
        let corner = SpacingCandidate::new(bounds.row_max, bounds.plant_max);
        assert_relative_eq!(suitability_term(&corner, &bounds), 0.0);
    }

    #[test]
    fn densest_corner_has_full_density() {
        let bounds = loam_tropical();
        let densest = SpacingCandidate::new(bounds.row_min, bounds.plant_min);
        assert_relative_eq!(density_term(&densest, &bounds), 1.0);
        let sparse = SpacingCandidate::new(bounds.row_max, bounds.plant_max);
        assert!(density_term(&sparse, &bounds) < 0.5);
    }

    #[test]
    fn coarser_rows_lose_more_edge() {
        let field = acre();
        let fine = edge_loss_term(&SpacingCandidate::new(0.64, 0.5), &field);
        let coarse = edge_loss_term(&SpacingCandidate::new(1.04, 0.5), &field);
        assert!(coarse > fine);
    }

    #[test]
    fn irregular_fields_penalise_more_than_compact_ones() {
        let c = SpacingCandidate::new(0.9, 0.5);
        let compact = FieldMetrics::new(4_050.0, 255.0);
        let ragged = FieldMetrics::new(4_050.0, 900.0);
        let evaluator = FitnessEvaluator::default();
        let bounds = loam_tropical();
        assert!(evaluator.evaluate(&c, &ragged, &bounds) < evaluator.evaluate(&c, &compact, &bounds));
    }

    #[test]
    fn weights_steer_the_optimum() {
        let bounds = loam_tropical();
        let field = acre();
        let dense = SpacingCandidate::new(bounds.row_min, bounds.plant_min);
        let density_only = FitnessEvaluator::new(FitnessWeights {
            density: 1.0,
            suitability: 0.0,
            edge_loss: 0.0,
        });
        let suitability_only = FitnessEvaluator::new(FitnessWeights {
            density: 0.0,
            suitability: 1.0,
            edge_loss: 0.0,
        });
        assert!(
            density_only.evaluate(&dense, &field, &bounds)
                > density_only.evaluate(&bounds.recommended, &field, &bounds)
        );
        assert!(
            suitability_only.evaluate(&dense, &field, &bounds)
                < suitability_only.evaluate(&bounds.recommended, &field, &bounds)
        );
    }

    #[test]
    fn degenerate_bounds_score_consistently() {
        let bounds = SpacingBounds::fixed(SpacingCandidate::new(0.8, 0.5));
        let f1 = FitnessEvaluator::default().evaluate(&bounds.recommended, &acre(), &bounds);
        let f2 = FitnessEvaluator::default().evaluate(&bounds.recommended, &acre(), &bounds);
        assert_eq!(f1, f2);
        assert!((0.0..=1.0).contains(&f1));
    }
}
