//! Soil/climate suitability table and the sources that hand out snapshots.
//!
//! The table is administrator-maintained data. The optimizer never holds a
//! global copy: each request asks a [`SuitabilitySource`] for an immutable
//! snapshot and uses it for the whole run, so publishing a new table takes
//! effect on the next request.

use crate::candidate::SpacingCandidate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Fractional widening of the recommended pair into bounds.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tolerance {
    pub below: f64,
    pub above: f64,
}

impl Default for Tolerance {
    fn default() -> Self {
        Self {
            below: 0.20,
            above: 0.30,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityEntry {
    pub soil_type: String,
    pub climate_zone: String,
    pub row_spacing_m: f64,
    pub plant_spacing_m: f64,
}

impl SuitabilityEntry {
    pub fn new(soil_type: &str, climate_zone: &str, row_spacing_m: f64, plant_spacing_m: f64) -> Self {
        Self {
            soil_type: soil_type.to_string(),
            climate_zone: climate_zone.to_string(),
            row_spacing_m,
            plant_spacing_m,
        }
    }

    pub fn recommended(&self) -> SpacingCandidate {
        SpacingCandidate::new(self.row_spacing_m, self.plant_spacing_m)
    }

    fn matches(&self, soil_type: &str, climate_zone: &str) -> bool {
        normalize(&self.soil_type) == soil_type && normalize(&self.climate_zone) == climate_zone
    }
}

/// Spacing used when a soil/climate pair is not listed.
pub const DEFAULT_RECOMMENDED: SpacingCandidate = SpacingCandidate::new(0.75, 0.60);

fn default_pair() -> SpacingCandidate {
    DEFAULT_RECOMMENDED
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SuitabilityTable {
    pub version: u64,
    #[serde(default)]
    pub tolerance: Tolerance,
    #[serde(default = "default_pair")]
    pub default_pair: SpacingCandidate,
    pub entries: Vec<SuitabilityEntry>,
}

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read suitability table {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse suitability table: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid suitability table: {0}")]
    Invalid(String),
    #[error("no suitability table has been published")]
    NotPublished,
}

/// Category keys compare trimmed and case-insensitively.
pub fn normalize(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

impl SuitabilityTable {
    pub fn new(version: u64, entries: Vec<SuitabilityEntry>) -> Self {
        Self {
            version,
            tolerance: Tolerance::default(),
            default_pair: DEFAULT_RECOMMENDED,
            entries,
        }
    }

    pub fn with_tolerance(mut self, tolerance: Tolerance) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Table shipped with the crate: four soils by four climate zones.
    pub fn builtin() -> Self {
        #[rustfmt::skip]
        let rows: [(&str, &str, f64, f64); 16] = [
            ("loam",  "tropical",    0.80, 0.50),
            ("sandy", "tropical",    0.76, 0.48),
            ("clay",  "tropical",    0.88, 0.55),
            ("silt",  "tropical",    0.84, 0.53),
            ("loam",  "subtropical", 0.75, 0.60),
            ("sandy", "subtropical", 0.71, 0.57),
            ("clay",  "subtropical", 0.83, 0.66),
            ("silt",  "subtropical", 0.79, 0.63),
            ("loam",  "temperate",   0.70, 0.45),
            ("sandy", "temperate",   0.67, 0.43),
            ("clay",  "temperate",   0.77, 0.50),
            ("silt",  "temperate",   0.74, 0.47),
            ("loam",  "arid",        0.90, 0.65),
            ("sandy", "arid",        0.86, 0.62),
            ("clay",  "arid",        0.99, 0.72),
            ("silt",  "arid",        0.95, 0.68),
        ];
        Self::new(
            1,
            rows.iter()
                .map(|&(soil, climate, row, plant)| SuitabilityEntry::new(soil, climate, row, plant))
                .collect(),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self, SourceError> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    pub fn from_json_file(path: &Path) -> Result<Self, SourceError> {
        let json = std::fs::read_to_string(path).map_err(|source| SourceError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    pub fn validate(&self) -> Result<(), SourceError> {
        let positive = |c: SpacingCandidate| {
            c.is_finite() && c.row_spacing_m > 0.0 && c.plant_spacing_m > 0.0
        };
        if !positive(self.default_pair) {
            return Err(SourceError::Invalid(format!(
                "default pair must be positive, got {:?}",
                self.default_pair
            )));
        }
        let Tolerance { below, above } = self.tolerance;
        if !(0.0..1.0).contains(&below) || !(above.is_finite() && above >= 0.0) {
            return Err(SourceError::Invalid(format!(
                "tolerance must satisfy 0 <= below < 1 and above >= 0, got below={below}, above={above}"
            )));
        }
        for (i, entry) in self.entries.iter().enumerate() {
            if !positive(entry.recommended()) {
                return Err(SourceError::Invalid(format!(
                    "entry {i} ({}/{}) has non-positive spacing",
                    entry.soil_type, entry.climate_zone
                )));
            }
            let soil = normalize(&entry.soil_type);
            let climate = normalize(&entry.climate_zone);
            if self.entries[..i].iter().any(|e| e.matches(&soil, &climate)) {
                return Err(SourceError::Invalid(format!(
                    "duplicate entry for {soil}/{climate}"
                )));
            }
        }
        Ok(())
    }

    /// Recommended pair for a soil/climate combination, if listed.
    pub fn lookup(&self, soil_type: &str, climate_zone: &str) -> Option<SpacingCandidate> {
        let soil = normalize(soil_type);
        let climate = normalize(climate_zone);
        self.entries
            .iter()
            .find(|e| e.matches(&soil, &climate))
            .map(SuitabilityEntry::recommended)
    }
}

/// Anything that can produce the current suitability table snapshot.
pub trait SuitabilitySource: Send + Sync {
    fn snapshot(&self) -> Result<Arc<SuitabilityTable>, SourceError>;
}

/// A fixed table.
#[derive(Clone, Debug)]
pub struct StaticSuitability(Arc<SuitabilityTable>);

impl StaticSuitability {
    pub fn new(table: SuitabilityTable) -> Self {
        Self(Arc::new(table))
    }
}

impl SuitabilitySource for StaticSuitability {
    fn snapshot(&self) -> Result<Arc<SuitabilityTable>, SourceError> {
        Ok(Arc::clone(&self.0))
    }
}

/// Hot-reloadable table: `publish` swaps the snapshot handed to subsequent
/// requests; runs already holding the old snapshot keep it.
#[derive(Debug, Default)]
pub struct SharedSuitabilityStore {
    current: RwLock<Option<Arc<SuitabilityTable>>>,
}

impl SharedSuitabilityStore {
    pub fn new(table: SuitabilityTable) -> Self {
        Self {
            current: RwLock::new(Some(Arc::new(table))),
        }
    }

    /// Validate and install `table`, returning the version it replaced.
    pub fn publish(&self, table: SuitabilityTable) -> Result<Option<u64>, SourceError> {
        table.validate()?;
        let previous = self.current.write().replace(Arc::new(table));
        let previous_version = previous.map(|t| t.version);
        tracing::info!(?previous_version, "published suitability table");
        Ok(previous_version)
    }

    pub fn version(&self) -> Option<u64> {
        self.current.read().as_ref().map(|t| t.version)
    }
}

impl SuitabilitySource for SharedSuitabilityStore {
    fn snapshot(&self) -> Result<Arc<SuitabilityTable>, SourceError> {
        self.current.read().clone().ok_or(SourceError::NotPublished)
    }
}

/// Table read from a JSON file on every snapshot, so edits to the file are
/// picked up by the next request.
#[derive(Clone, Debug)]
pub struct JsonFileSuitability {
    path: PathBuf,
}

impl JsonFileSuitability {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl SuitabilitySource for JsonFileSuitability {
    fn snapshot(&self) -> Result<Arc<SuitabilityTable>, SourceError> {
        SuitabilityTable::from_json_file(&self.path).map(Arc::new)
    }
}
