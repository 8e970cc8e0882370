use crate::config::ConfigError;
use crate::geometry::GeometryError;
use crate::grid::GridError;
use crate::suitability::SourceError;

/// Failure of a whole optimization request.
///
/// Budget exhaustion and cancellation are not errors; they end the search
/// with a partial result.
#[derive(Debug, thiserror::Error)]
pub enum OptimizationError {
    #[error("invalid field geometry: {0}")]
    InvalidFieldGeometry(#[from] GeometryError),
    #[error("invalid optimizer config: {0}")]
    InvalidOptimizerConfig(#[from] ConfigError),
    #[error("suitability configuration unavailable: {0}")]
    ConfigurationUnavailable(#[from] SourceError),
    #[error("layout too large: {0}")]
    LayoutTooLarge(#[from] GridError),
}

impl OptimizationError {
    /// Only a missing or unreadable suitability table may succeed on retry.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OptimizationError::ConfigurationUnavailable(_))
    }
}
