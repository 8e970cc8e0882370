use serde::{Deserialize, Serialize};

/// Recoverable conditions surfaced alongside a result.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The soil/climate pair is not in the table; the default pair was used.
    UnknownSoilClimateCombination {
        soil_type: String,
        climate_zone: String,
    },
    /// Recommended spacing was widened for acidic or alkaline soil.
    PhOutsideOptimalRange { ph: f64, factor: f64 },
    /// A soil reading was outside its physical range and ignored.
    SoilReadingIgnored { name: String, value: f64 },
    /// Supplied area and boundary polygon disagree noticeably.
    AreaMismatch {
        supplied_hectares: f64,
        polygon_hectares: f64,
    },
}
