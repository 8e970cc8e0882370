//! Soil suitability assessment and agronomic recommendations.
//!
//! Each available reading (pH, soil type, organic matter) is scored on a
//! 0–100 band scale and the overall score is their mean. The assessment is
//! reported next to the layout; it does not steer the spacing search.

use crate::bounds::SoilClimateProfile;
use crate::candidate::SpacingCandidate;
use crate::suitability::normalize;
use serde::{Deserialize, Serialize};

/// Overall score below which amendments are recommended.
pub const AMENDMENT_THRESHOLD: f64 = 70.0;
/// Row spacing above which the layout is flagged as wide.
pub const WIDE_ROW_SPACING_M: f64 = 0.8;
/// Organic matter below this share is considered depleted.
pub const LOW_ORGANIC_MATTER_PCT: f64 = 2.0;

pub(crate) fn plausible_ph(ph: f64) -> bool {
    ph.is_finite() && (0.0..=14.0).contains(&ph)
}

pub(crate) fn plausible_organic_matter(pct: f64) -> bool {
    pct.is_finite() && (0.0..=100.0).contains(&pct)
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentScores {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ph: Option<f64>,
    pub soil_type: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub organic_matter: Option<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SoilAssessment {
    /// Mean of the component scores, `0..=100`.
    pub score: f64,
    pub components: ComponentScores,
}

impl SoilAssessment {
    pub fn needs_amendment(&self) -> bool {
        self.score < AMENDMENT_THRESHOLD
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    SoilAmendment,
    AddOrganicMatter,
    WiderSpacing,
}

impl Recommendation {
    pub fn message(self) -> &'static str {
        match self {
            Recommendation::SoilAmendment => "Consider soil amendments before planting",
            Recommendation::AddOrganicMatter => "Apply 0.5-1.0 kg/m² of compost before planting",
            Recommendation::WiderSpacing => "Wider spacing recommended due to soil conditions",
        }
    }
}

/// Full marks inside 6.0–6.8, stepping down outside.
fn ph_score(ph: f64) -> f64 {
    if (6.0..=6.8).contains(&ph) {
        100.0
    } else if (5.8..=7.0).contains(&ph) {
        80.0
    } else if (5.5..=7.3).contains(&ph) {
        60.0
    } else {
        40.0
    }
}

fn soil_type_score(soil_type: &str) -> f64 {
    match normalize(soil_type).as_str() {
        "loam" | "loamy" => 100.0,
        "silt" => 85.0,
        "sandy" => 70.0,
        "clay" => 60.0,
        _ => 50.0,
    }
}

fn organic_matter_score(pct: f64) -> f64 {
    if (3.0..=6.0).contains(&pct) {
        100.0
    } else if (2.0..=8.0).contains(&pct) {
        80.0
    } else if (1.0..=10.0).contains(&pct) {
        60.0
    } else {
        40.0
    }
}

/// Score the soil readings in `profile`; implausible readings are skipped.
pub fn assess_soil(profile: &SoilClimateProfile) -> SoilAssessment {
    let components = ComponentScores {
        ph: profile.ph.filter(|&v| plausible_ph(v)).map(ph_score),
        soil_type: soil_type_score(&profile.soil_type),
        organic_matter: profile
            .organic_matter_pct
            .filter(|&v| plausible_organic_matter(v))
            .map(organic_matter_score),
    };
    let scores: Vec<f64> = [components.ph, Some(components.soil_type), components.organic_matter]
        .into_iter()
        .flatten()
        .collect();
    SoilAssessment {
        score: scores.iter().sum::<f64>() / scores.len() as f64,
        components,
    }
}

/// At most three recommendations for the assessed soil and chosen spacing.
pub fn recommend(
    assessment: &SoilAssessment,
    profile: &SoilClimateProfile,
    best: &SpacingCandidate,
) -> Vec<Recommendation> {
    let mut out = Vec::new();
    if assessment.needs_amendment() {
        out.push(Recommendation::SoilAmendment);
    }
    if profile
        .organic_matter_pct
        .is_some_and(|v| plausible_organic_matter(v) && v < LOW_ORGANIC_MATTER_PCT)
    {
        out.push(Recommendation::AddOrganicMatter);
    }
    if best.row_spacing_m > WIDE_ROW_SPACING_M {
        out.push(Recommendation::WiderSpacing);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn ideal_loam_scores_full_marks() {
        let profile = SoilClimateProfile::new("Loam", "tropical")
            .with_ph(6.4)
            .with_organic_matter_pct(4.0);
        let assessment = assess_soil(&profile);
        assert_relative_eq!(assessment.score, 100.0);
        assert!(!assessment.needs_amendment());
    }

    #[test]
    fn missing_readings_are_left_out_of_the_mean() {
        let assessment = assess_soil(&SoilClimateProfile::new("clay", "arid"));
        assert_eq!(assessment.components.ph, None);
        assert_eq!(assessment.components.organic_matter, None);
        assert_relative_eq!(assessment.score, 60.0);
    }

    #[test]
    fn ph_bands_step_down_away_from_neutral() {
        assert_eq!(ph_score(6.8), 100.0);
        assert_eq!(ph_score(5.9), 80.0);
        assert_eq!(ph_score(7.2), 60.0);
        assert_eq!(ph_score(4.5), 40.0);
    }

    #[test]
    fn organic_matter_affects_the_score() {
        let rich = assess_soil(&SoilClimateProfile::new("sandy", "arid").with_organic_matter_pct(4.5));
        let poor = assess_soil(&SoilClimateProfile::new("sandy", "arid").with_organic_matter_pct(0.5));
        assert_relative_eq!(rich.score, 85.0);
        assert_relative_eq!(poor.score, 55.0);
    }

    #[test]
    fn implausible_readings_are_ignored() {
        let profile = SoilClimateProfile::new("silt", "temperate")
            .with_ph(19.0)
            .with_organic_matter_pct(-3.0);
        let assessment = assess_soil(&profile);
        assert_eq!(assessment.components.ph, None);
        assert_eq!(assessment.components.organic_matter, None);
        assert_relative_eq!(assessment.score, 85.0);
    }

    #[test]
    fn poor_soil_and_wide_rows_are_flagged() {
        let profile = SoilClimateProfile::new("peat", "arid")
            .with_ph(4.8)
            .with_organic_matter_pct(1.2);
        let assessment = assess_soil(&profile);
        let recs = recommend(&assessment, &profile, &SpacingCandidate::new(0.9, 0.6));
        assert_eq!(
            recs,
            vec![
                Recommendation::SoilAmendment,
                Recommendation::AddOrganicMatter,
                Recommendation::WiderSpacing,
            ]
        );
        assert_eq!(
            Recommendation::SoilAmendment.message(),
            "Consider soil amendments before planting"
        );
    }

    #[test]
    fn good_soil_at_close_spacing_needs_nothing() {
        let profile = SoilClimateProfile::new("loam", "tropical").with_ph(6.5);
        let assessment = assess_soil(&profile);
        assert!(recommend(&assessment, &profile, &SpacingCandidate::new(0.7, 0.5)).is_empty());
    }
}
