//! Results and reflection summary.
use serde::Serialize;

use crate::constants::{SURVIVAL_FAIR_ABOVE, SURVIVAL_STRONG_ABOVE};
use crate::costs::format_cost;
use crate::insights::RiskLevel;
use crate::numbers::round_clamped;
use crate::state::{SessionError, SessionState};

/// Coarse survival band used to color the results gauge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SurvivalBand {
    Strong,
    Fair,
    Poor,
}

impl SurvivalBand {
    #[must_use]
    pub fn from_probability(survival_probability: f64) -> Self {
        if survival_probability > SURVIVAL_STRONG_ABOVE {
            Self::Strong
        } else if survival_probability > SURVIVAL_FAIR_ABOVE {
            Self::Fair
        } else {
            Self::Poor
        }
    }
}

impl std::fmt::Display for SurvivalBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Strong => write!(f, "strong"),
            Self::Fair => write!(f, "fair"),
            Self::Poor => write!(f, "poor"),
        }
    }
}

/// Everything the results and reflection phases show.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultSummary {
    pub character_name: String,
    pub location_name: String,
    /// Location earthquake risk as a whole percentage.
    pub location_risk_pct: f64,
    pub size_name: String,
    pub structure_name: String,
    pub total_budget: i64,
    pub amount_spent: i64,
    pub spent_label: String,
    pub magnitude: f64,
    pub survival_probability: f64,
    pub band: SurvivalBand,
    pub lessons: Vec<String>,
    pub risk_level: Option<RiskLevel>,
    pub primary_factors: Vec<&'static str>,
}

/// Summarize a finished session.
///
/// # Errors
///
/// Returns [`SessionError::SimulationIncomplete`] before a prediction has been folded in, or
/// [`SessionError::MissingSelection`] if a selection is absent.
pub fn result_summary(state: &SessionState) -> Result<ResultSummary, SessionError> {
    let (Some(survival_probability), Some(magnitude)) =
        (state.survival_probability(), state.earthquake_intensity())
    else {
        return Err(SessionError::SimulationIncomplete);
    };
    let character = state
        .character()
        .ok_or(SessionError::MissingSelection("character"))?;
    let location = state
        .location()
        .ok_or(SessionError::MissingSelection("location"))?;
    let size = state
        .building_size()
        .ok_or(SessionError::MissingSelection("building size"))?;
    let structure = state
        .building_structure()
        .ok_or(SessionError::MissingSelection("building structure"))?;

    Ok(ResultSummary {
        character_name: character.name.clone(),
        location_name: location.name.clone(),
        location_risk_pct: round_clamped(location.earthquake_risk_factor * 100.0, 0.0, 100.0),
        size_name: size.name.clone(),
        structure_name: structure.name.clone(),
        total_budget: state.total_budget(),
        amount_spent: state.amount_spent(),
        spent_label: format_cost(state.amount_spent()),
        magnitude,
        survival_probability,
        band: SurvivalBand::from_probability(survival_probability),
        lessons: state.lessons().to_vec(),
        risk_level: state.insights().map(|i| i.risk_level),
        primary_factors: state
            .insights()
            .map(|i| i.primary_factors.clone())
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bands_split_at_seventy_and_forty() {
        assert_eq!(SurvivalBand::from_probability(71.0), SurvivalBand::Strong);
        assert_eq!(SurvivalBand::from_probability(70.0), SurvivalBand::Fair);
        assert_eq!(SurvivalBand::from_probability(41.0), SurvivalBand::Fair);
        assert_eq!(SurvivalBand::from_probability(40.0), SurvivalBand::Poor);
        assert_eq!(SurvivalBand::Poor.to_string(), "poor");
    }

    #[test]
    fn summary_requires_finished_simulation() {
        let state = SessionState::new();
        assert_eq!(
            result_summary(&state),
            Err(SessionError::SimulationIncomplete)
        );
    }
}
