//! Prediction request/response types and the orchestrator that drives a predictor.
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use thiserror::Error;

use crate::constants::{LOG_SIMULATION_STALE, SURVIVAL_MAX, SURVIVAL_MIN};
use crate::features::FeatureRecord;
use crate::numbers::round_clamped;
use crate::state::SessionState;

/// Response body of the prediction service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Predicted damage percentage, 0-100.
    pub prediction: f64,
    #[serde(default)]
    pub feature_importance: Option<BTreeMap<String, f64>>,
}

impl PredictionResult {
    #[must_use]
    pub const fn new(prediction: f64) -> Self {
        Self {
            prediction,
            feature_importance: None,
        }
    }

    #[must_use]
    pub fn with_importance(mut self, importance: BTreeMap<String, f64>) -> Self {
        self.feature_importance = Some(importance);
        self
    }

    /// Chance of the occupants coming through unharmed, rounded and bounded to 0-100.
    #[must_use]
    pub fn survival_probability(&self) -> f64 {
        round_clamped(100.0 - self.prediction, SURVIVAL_MIN, SURVIVAL_MAX)
    }
}

/// Liveness stamp identifying which session epoch issued a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SimulationTicket {
    pub epoch: u64,
}

/// Emitted when the session enters the simulation phase.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimulationRequest {
    pub features: FeatureRecord,
    pub ticket: SimulationTicket,
}

/// Progress report from a running prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationProgress {
    /// 0-100.
    pub progress: f64,
    #[serde(default)]
    pub message: Option<String>,
}

/// Status of the pending prediction shown alongside the simulation phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum SimulationStatus {
    #[default]
    Idle,
    Pending,
    Failed(String),
}

/// What happened when a prediction outcome was folded into the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FoldOutcome {
    Completed { survival_probability: f64 },
    Failed,
    /// The ticket no longer matches the session; nothing changed.
    Stale,
}

/// Faults raised while talking to the prediction service.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("network error: {0}")]
    Network(String),
    #[error("prediction service returned HTTP {0}")]
    Status(u16),
    #[error("malformed stream frame: {0}")]
    MalformedFrame(String),
    #[error("prediction service reported an error: {0}")]
    Remote(String),
    #[error("stream ended before a prediction arrived")]
    StreamEnded,
    #[error("prediction timed out after {0:?}")]
    Timeout(Duration),
    #[error("could not decode prediction: {0}")]
    Decode(String),
}

/// Anything able to turn a feature record into a damage prediction.
#[allow(async_fn_in_trait)]
pub trait Predictor {
    /// Run one prediction, reporting progress through `progress` as it arrives.
    ///
    /// # Errors
    ///
    /// Returns a [`TransportError`] when the prediction could not be obtained.
    async fn predict(
        &self,
        features: &FeatureRecord,
        progress: &mut dyn FnMut(&SimulationProgress),
    ) -> Result<PredictionResult, TransportError>;
}

/// Submit `request` to `predictor`, fold the outcome into `state` and move to the results
/// phase on success. A request that is already stale never reaches the predictor.
pub async fn run_simulation<P: Predictor>(
    state: &mut SessionState,
    request: SimulationRequest,
    predictor: &P,
    progress: &mut dyn FnMut(&SimulationProgress),
) -> FoldOutcome {
    if !state.accepts(request.ticket) {
        log::warn!("{LOG_SIMULATION_STALE}: epoch {} not submitted", request.ticket.epoch);
        return FoldOutcome::Stale;
    }
    let outcome = match predictor.predict(&request.features, progress).await {
        Ok(result) => state.complete_simulation(request.ticket, result),
        Err(err) => state.fail_simulation(request.ticket, &err),
    };
    if matches!(outcome, FoldOutcome::Completed { .. }) {
        if let Err(err) = state.advance() {
            log::warn!("could not leave the simulation phase: {err}");
        }
    }
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survival_is_inverse_of_damage() {
        assert!((PredictionResult::new(35.0).survival_probability() - 65.0).abs() < f64::EPSILON);
        assert!((PredictionResult::new(12.6).survival_probability() - 87.0).abs() < f64::EPSILON);
    }

    #[test]
    fn survival_is_bounded() {
        assert!((PredictionResult::new(-20.0).survival_probability() - 100.0).abs() < f64::EPSILON);
        assert!(PredictionResult::new(140.0).survival_probability().abs() < f64::EPSILON);
        assert!(PredictionResult::new(f64::NAN).survival_probability().abs() < f64::EPSILON);
    }

    #[test]
    fn prediction_parses_with_and_without_importance() {
        let bare: PredictionResult = serde_json::from_str(r#"{"prediction": 42.5}"#).unwrap();
        assert!(bare.feature_importance.is_none());
        let full: PredictionResult = serde_json::from_str(
            r#"{"prediction": 10.0, "feature_importance": {"age_building": 3.5}}"#,
        )
        .unwrap();
        assert_eq!(
            full.feature_importance
                .as_ref()
                .and_then(|map| map.get("age_building"))
                .copied(),
            Some(3.5)
        );
        let null: PredictionResult =
            serde_json::from_str(r#"{"prediction": 1.0, "feature_importance": null}"#).unwrap();
        assert!(null.feature_importance.is_none());
    }

    #[test]
    fn status_serializes_with_message() {
        let failed = SimulationStatus::Failed("boom".to_string());
        let json = serde_json::to_string(&failed).unwrap();
        assert_eq!(json, r#"{"status":"failed","message":"boom"}"#);
        assert_eq!(SimulationStatus::default(), SimulationStatus::Idle);
    }
}
