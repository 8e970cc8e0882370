//! One optimization request, end to end.
//!
//! The controller validates the request, takes a single suitability
//! snapshot, resolves spacing bounds, runs the genetic search and lays out
//! the winning spacing on the field. The soil assessment rides along with
//! the result. It keeps nothing between calls.

use crate::bounds::{resolve_bounds, SoilClimateProfile, SpacingBounds};
use crate::candidate::SpacingCandidate;
use crate::config::OptimizerConfig;
use crate::engine::{
    CancellationToken, FitnessPoint, GenerationRecord, PopulationEngine, RunBudget, RunControl,
    StopReason,
};
use crate::error::OptimizationError;
use crate::fitness::FieldMetrics;
use crate::geometry::{Field, SQUARE_METRES_PER_HECTARE};
use crate::grid::{GridLayoutGenerator, PlantPosition};
use crate::soil::{assess_soil, recommend, Recommendation, SoilAssessment};
use crate::suitability::SuitabilitySource;
use crate::warning::Warning;
use rand::SeedableRng;
use rand_chacha::ChaCha12Rng;
use serde::{Deserialize, Serialize};

/// Relative gap between supplied and polygon area that earns a warning.
const AREA_MISMATCH_RATIO: f64 = 0.10;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationRequest {
    pub field: Field,
    pub soil_type: String,
    pub climate_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organic_matter_pct: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimizer_config: Option<OptimizerConfig>,
}

impl OptimizationRequest {
    pub fn new(field: Field, soil_type: impl Into<String>, climate_zone: impl Into<String>) -> Self {
        Self {
            field,
            soil_type: soil_type.into(),
            climate_zone: climate_zone.into(),
            ph: None,
            organic_matter_pct: None,
            optimizer_config: None,
        }
    }

    pub fn with_optimizer_config(mut self, config: OptimizerConfig) -> Self {
        self.optimizer_config = Some(config);
        self
    }

    pub fn profile(&self) -> SoilClimateProfile {
        SoilClimateProfile {
            soil_type: self.soil_type.clone(),
            climate_zone: self.climate_zone.clone(),
            ph: self.ph,
            organic_matter_pct: self.organic_matter_pct,
        }
    }
}

/// Per-call knobs that are not part of the request data.
#[derive(Clone, Debug, Default)]
pub struct RunOptions {
    pub seed: u64,
    /// Omit fitness and generation history from the result.
    pub compact: bool,
    pub budget: RunBudget,
    pub cancel: Option<CancellationToken>,
    /// Plant positions to include in the result; `0` for none.
    pub max_positions: usize,
}

impl RunOptions {
    pub fn seeded(seed: u64) -> Self {
        Self {
            seed,
            ..Self::default()
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DensityReport {
    pub plants_per_m2: f64,
    pub plants_per_hectare: f64,
}

impl From<&SpacingCandidate> for DensityReport {
    fn from(candidate: &SpacingCandidate) -> Self {
        let plants_per_m2 = candidate.plants_per_m2();
        Self {
            plants_per_m2,
            plants_per_hectare: plants_per_m2 * SQUARE_METRES_PER_HECTARE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResult {
    pub best_candidate: SpacingCandidate,
    pub best_fitness: f64,
    pub plant_count: u64,
    pub rows: u32,
    pub plants_per_row: u32,
    pub field_efficiency_pct: f64,
    pub generations_run: u32,
    pub converged: bool,
    pub stop_reason: StopReason,
    pub bounds: SpacingBounds,
    pub bounds_defaulted: bool,
    pub table_version: u64,
    pub warnings: Vec<Warning>,
    pub density: DensityReport,
    pub soil: SoilAssessment,
    pub recommendations: Vec<Recommendation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generation_history: Vec<GenerationRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plant_positions: Vec<PlantPosition>,
}

impl OptimizationResult {
    pub fn fitness_history(&self) -> Vec<FitnessPoint> {
        self.generation_history.iter().map(GenerationRecord::point).collect()
    }

    pub fn to_response(&self) -> OptimizationResponse {
        OptimizationResponse {
            best_spacing: SpacingResponse {
                row_m: self.best_candidate.row_spacing_m,
                plant_m: self.best_candidate.plant_spacing_m,
            },
            best_fitness: self.best_fitness,
            plant_count: self.plant_count,
            rows: self.rows,
            plants_per_row: self.plants_per_row,
            field_efficiency_pct: self.field_efficiency_pct,
            plants_per_m2: self.density.plants_per_m2,
            plants_per_hectare: self.density.plants_per_hectare,
            generations_run: self.generations_run,
            converged: self.converged,
            stop_reason: self.stop_reason,
            bounds_defaulted: self.bounds_defaulted,
            bounds: self.bounds,
            table_version: self.table_version,
            warnings: self.warnings.clone(),
            soil_suitability_score: self.soil.score,
            recommendations: self
                .recommendations
                .iter()
                .map(|r| r.message().to_string())
                .collect(),
            fitness_history: self.fitness_history(),
            generation_history: self.generation_history.clone(),
            plant_positions: self.plant_positions.clone(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpacingResponse {
    pub row_m: f64,
    pub plant_m: f64,
}

/// Wire shape returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResponse {
    pub best_spacing: SpacingResponse,
    pub best_fitness: f64,
    pub plant_count: u64,
    pub rows: u32,
    pub plants_per_row: u32,
    pub field_efficiency_pct: f64,
    pub plants_per_m2: f64,
    pub plants_per_hectare: f64,
    pub generations_run: u32,
    pub converged: bool,
    pub stop_reason: StopReason,
    pub bounds_defaulted: bool,
    pub bounds: SpacingBounds,
    pub table_version: u64,
    pub warnings: Vec<Warning>,
    pub soil_suitability_score: f64,
    pub recommendations: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fitness_history: Vec<FitnessPoint>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub generation_history: Vec<GenerationRecord>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub plant_positions: Vec<PlantPosition>,
}

#[derive(Clone, Debug, Default)]
pub struct OptimizationController {
    /// Used when a request carries no `optimizer_config`.
    default_config: OptimizerConfig,
}

impl OptimizationController {
    pub fn new(default_config: OptimizerConfig) -> Self {
        Self { default_config }
    }

    #[tracing::instrument(
        skip_all,
        fields(
            soil_type = %request.soil_type,
            climate_zone = %request.climate_zone,
            seed = options.seed,
        )
    )]
    pub fn optimize(
        &self,
        request: &OptimizationRequest,
        source: &dyn SuitabilitySource,
        options: &RunOptions,
    ) -> Result<OptimizationResult, OptimizationError> {
        let config = request
            .optimizer_config
            .clone()
            .unwrap_or_else(|| self.default_config.clone());
        config.validate()?;
        let geometry = request.field.validate()?;

        let table = source.snapshot()?;
        table.validate()?;
        let profile = request.profile();
        let resolved = resolve_bounds(&table, &profile);
        let mut warnings = resolved.warnings;

        // The densest corner of the bounds is the largest lattice the search
        // can land on.
        GridLayoutGenerator::check_size(
            &SpacingCandidate::new(resolved.bounds.row_min, resolved.bounds.plant_min),
            &geometry,
        )?;

        if let Some(supplied) = request.field.area_hectares {
            let polygon = geometry.polygon_area_hectares();
            if (supplied - polygon).abs() > AREA_MISMATCH_RATIO * polygon {
                tracing::warn!(
                    supplied_hectares = supplied,
                    polygon_hectares = polygon,
                    "supplied area disagrees with boundary"
                );
                warnings.push(Warning::AreaMismatch {
                    supplied_hectares: supplied,
                    polygon_hectares: polygon,
                });
            }
        }

        let engine = PopulationEngine::new(config, FieldMetrics::from(&geometry), resolved.bounds)?;
        let mut rng = ChaCha12Rng::seed_from_u64(options.seed);
        let control = RunControl {
            budget: options.budget,
            cancel: options.cancel.clone(),
            keep_snapshots: !options.compact,
        };
        let outcome = engine.run(&mut rng, &control)?;

        let best = outcome.best;
        let layout = GridLayoutGenerator::new()
            .with_max_positions(options.max_positions)
            .generate(&best.candidate, &geometry)?;
        let soil = assess_soil(&profile);
        let recommendations = recommend(&soil, &profile, &best.candidate);

        tracing::info!(
            row_spacing_m = best.candidate.row_spacing_m,
            plant_spacing_m = best.candidate.plant_spacing_m,
            best_fitness = best.fitness,
            plant_count = layout.plant_count,
            generations_run = outcome.generations_run,
            stop_reason = ?outcome.stop_reason,
            soil_score = soil.score,
            "optimization complete"
        );

        Ok(OptimizationResult {
            best_candidate: best.candidate,
            best_fitness: best.fitness,
            plant_count: layout.plant_count,
            rows: layout.rows,
            plants_per_row: layout.plants_per_row,
            field_efficiency_pct: layout.field_efficiency_pct,
            generations_run: outcome.generations_run,
            converged: outcome.converged(),
            stop_reason: outcome.stop_reason,
            bounds: resolved.bounds,
            bounds_defaulted: resolved.bounds_defaulted,
            table_version: resolved.table_version,
            warnings,
            density: DensityReport::from(&best.candidate),
            soil,
            recommendations,
            generation_history: if options.compact {
                Vec::new()
            } else {
                outcome.history
            },
            plant_positions: layout.positions,
        })
    }
}
