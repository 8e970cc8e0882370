use crate::candidate::SpacingCandidate;
use crate::soil::{plausible_organic_matter, plausible_ph};
use crate::suitability::{SuitabilityTable, Tolerance};
use crate::warning::Warning;
use serde::{Deserialize, Serialize};

/// Permissible spacing rectangle plus the agronomically recommended point.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SpacingBounds {
    pub row_min: f64,
    pub row_max: f64,
    pub plant_min: f64,
    pub plant_max: f64,
    pub recommended: SpacingCandidate,
}

impl SpacingBounds {
    /// `recommended` widened by `tolerance` on each axis.
    pub fn around(recommended: SpacingCandidate, tolerance: Tolerance) -> Self {
        let lo = 1.0 - tolerance.below;
        let hi = 1.0 + tolerance.above;
        Self {
            row_min: recommended.row_spacing_m * lo,
            row_max: recommended.row_spacing_m * hi,
            plant_min: recommended.plant_spacing_m * lo,
            plant_max: recommended.plant_spacing_m * hi,
            recommended,
        }
    }

    /// Zero-width bounds pinned to one spacing.
    pub fn fixed(spacing: SpacingCandidate) -> Self {
        Self::around(
            spacing,
            Tolerance {
                below: 0.0,
                above: 0.0,
            },
        )
    }

    pub fn row_range(&self) -> f64 {
        self.row_max - self.row_min
    }

    pub fn plant_range(&self) -> f64 {
        self.plant_max - self.plant_min
    }

    pub(crate) fn gene_ranges(&self) -> [(f64, f64); 2] {
        [(self.row_min, self.row_max), (self.plant_min, self.plant_max)]
    }

    pub fn is_degenerate(&self) -> bool {
        self.row_min == self.row_max && self.plant_min == self.plant_max
    }

    pub fn contains(&self, candidate: &SpacingCandidate) -> bool {
        (self.row_min..=self.row_max).contains(&candidate.row_spacing_m)
            && (self.plant_min..=self.plant_max).contains(&candidate.plant_spacing_m)
    }

    pub fn clamp(&self, candidate: SpacingCandidate) -> SpacingCandidate {
        SpacingCandidate::new(
            candidate.row_spacing_m.clamp(self.row_min, self.row_max),
            candidate.plant_spacing_m.clamp(self.plant_min, self.plant_max),
        )
    }
}

/// Soil and climate description supplied with a request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SoilClimateProfile {
    pub soil_type: String,
    pub climate_zone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organic_matter_pct: Option<f64>,
}

impl SoilClimateProfile {
    pub fn new(soil_type: impl Into<String>, climate_zone: impl Into<String>) -> Self {
        Self {
            soil_type: soil_type.into(),
            climate_zone: climate_zone.into(),
            ph: None,
            organic_matter_pct: None,
        }
    }

    pub fn with_ph(mut self, ph: f64) -> Self {
        self.ph = Some(ph);
        self
    }

    pub fn with_organic_matter_pct(mut self, pct: f64) -> Self {
        self.organic_matter_pct = Some(pct);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResolvedBounds {
    pub bounds: SpacingBounds,
    pub bounds_defaulted: bool,
    pub table_version: u64,
    pub warnings: Vec<Warning>,
}

/// Widening applied to the recommended pair outside pH 6.0–7.0.
fn ph_factor(ph: f64) -> f64 {
    if ph < 6.0 {
        1.10
    } else if ph > 7.0 {
        1.05
    } else {
        1.0
    }
}

/// Map a soil/climate profile to spacing bounds using one table snapshot.
///
/// Never fails: an unlisted combination uses the table's default pair and is
/// flagged with `bounds_defaulted`.
pub fn resolve_bounds(table: &SuitabilityTable, profile: &SoilClimateProfile) -> ResolvedBounds {
    let mut warnings = Vec::new();
    let (mut recommended, bounds_defaulted) =
        match table.lookup(&profile.soil_type, &profile.climate_zone) {
            Some(pair) => (pair, false),
            None => {
                tracing::warn!(
                    soil_type = %profile.soil_type,
                    climate_zone = %profile.climate_zone,
                    table_version = table.version,
                    "unknown soil/climate combination, using default spacing"
                );
                warnings.push(Warning::UnknownSoilClimateCombination {
                    soil_type: profile.soil_type.clone(),
                    climate_zone: profile.climate_zone.clone(),
                });
                (table.default_pair, true)
            }
        };

    if let Some(ph) = profile.ph {
        if plausible_ph(ph) {
            let factor = ph_factor(ph);
            if factor != 1.0 {
                recommended = SpacingCandidate::new(
                    recommended.row_spacing_m * factor,
                    recommended.plant_spacing_m * factor,
                );
                warnings.push(Warning::PhOutsideOptimalRange { ph, factor });
            }
        } else {
            warnings.push(Warning::SoilReadingIgnored {
                name: "ph".to_string(),
                value: ph,
            });
        }
    }
    if let Some(pct) = profile.organic_matter_pct {
        if !plausible_organic_matter(pct) {
            warnings.push(Warning::SoilReadingIgnored {
                name: "organic_matter_pct".to_string(),
                value: pct,
            });
        }
    }

    ResolvedBounds {
        bounds: SpacingBounds::around(recommended, table.tolerance),
        bounds_defaulted,
        table_version: table.version,
        warnings,
    }
}
