pub mod bounds;
pub mod candidate;
pub mod config;
pub mod controller;
pub mod engine;
pub mod error;
pub mod fitness;
pub mod geometry;
pub mod grid;
pub mod soil;
pub mod spatial;
pub mod suitability;
pub mod warning;

pub use bounds::{resolve_bounds, ResolvedBounds, SoilClimateProfile, SpacingBounds};
pub use candidate::{Individual, SpacingCandidate};
pub use config::{ConfigError, FitnessWeights, OptimizerConfig};
pub use controller::{
    DensityReport, OptimizationController, OptimizationRequest, OptimizationResponse,
    OptimizationResult, RunOptions,
};
pub use engine::{
    CancellationToken, GenerationRecord, PopulationEngine, RunBudget, RunControl, SearchOutcome,
    StopReason,
};
pub use error::OptimizationError;
pub use fitness::{FieldMetrics, FitnessEvaluator};
pub use geometry::{Field, FieldGeometry, GeometryError};
pub use grid::{GridError, GridLayout, GridLayoutGenerator, PlantPosition, MAX_GRID_CELLS};
pub use soil::{assess_soil, Recommendation, SoilAssessment};
pub use suitability::{
    JsonFileSuitability, SharedSuitabilityStore, SourceError, StaticSuitability, SuitabilitySource,
    SuitabilityTable,
};
pub use warning::Warning;
