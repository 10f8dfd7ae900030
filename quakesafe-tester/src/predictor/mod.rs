pub mod http;
pub mod offline;

pub use http::{HttpPredictor, Transport};
pub use offline::OfflinePredictor;

use quakesafe_game::{
    FeatureRecord, PredictionResult, Predictor, SimulationProgress, TransportError,
};

/// The predictors a tester run can be pointed at.
#[derive(Debug, Clone)]
pub enum PredictorBackend {
    Offline(OfflinePredictor),
    Http(HttpPredictor),
}

impl PredictorBackend {
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Offline(_) => "offline",
            Self::Http(client) => match client.transport() {
                Transport::Single => "service",
                Transport::Stream => "service-stream",
            },
        }
    }
}

impl Predictor for PredictorBackend {
    async fn predict(
        &self,
        features: &FeatureRecord,
        progress: &mut dyn FnMut(&SimulationProgress),
    ) -> Result<PredictionResult, TransportError> {
        match self {
            Self::Offline(predictor) => predictor.predict(features, progress).await,
            Self::Http(predictor) => predictor.predict(features, progress).await,
        }
    }
}
