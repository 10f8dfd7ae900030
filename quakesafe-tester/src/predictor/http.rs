use anyhow::{Context, Result};
use clap::ValueEnum;
use quakesafe_game::{
    FeatureRecord, FrameDecoder, PredictionResult, Predictor, SimulationProgress, StreamEvent,
    TransportError,
};
use std::time::Duration;

const PREDICT_PATH: &str = "/api/predict";
const PREDICT_STREAM_PATH: &str = "/api/predict/stream";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// One request, one JSON response
    Single,
    /// Server-push progress frames ending in a completion frame
    Stream,
}

/// Client for the external prediction service.
#[derive(Debug, Clone)]
pub struct HttpPredictor {
    client: reqwest::Client,
    endpoint: String,
    transport: Transport,
    timeout: Duration,
}

impl HttpPredictor {
    pub fn new(endpoint: &str, transport: Transport, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            transport,
            timeout,
        })
    }

    pub const fn transport(&self) -> Transport {
        self.transport
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.endpoint)
    }

    async fn send(
        &self,
        path: &str,
        features: &FeatureRecord,
    ) -> Result<reqwest::Response, TransportError> {
        let resp = self
            .client
            .post(self.url(path))
            .json(features)
            .send()
            .await
            .map_err(network)?;
        let status = resp.status();
        if !status.is_success() {
            log::warn!("prediction service answered {status} for {path}");
            return Err(TransportError::Status(status.as_u16()));
        }
        Ok(resp)
    }

    async fn predict_single(
        &self,
        features: &FeatureRecord,
        progress: &mut dyn FnMut(&SimulationProgress),
    ) -> Result<PredictionResult, TransportError> {
        progress(&SimulationProgress {
            progress: 0.0,
            message: Some("Submitting building to the prediction service".to_string()),
        });
        let resp = self.send(PREDICT_PATH, features).await?;
        let result = resp
            .json::<PredictionResult>()
            .await
            .map_err(|err| TransportError::Decode(err.to_string()))?;
        progress(&SimulationProgress {
            progress: 100.0,
            message: None,
        });
        Ok(result)
    }

    async fn predict_stream(
        &self,
        features: &FeatureRecord,
        progress: &mut dyn FnMut(&SimulationProgress),
    ) -> Result<PredictionResult, TransportError> {
        let mut resp = self.send(PREDICT_STREAM_PATH, features).await?;
        let mut decoder = FrameDecoder::new();
        while let Some(chunk) = resp.chunk().await.map_err(network)? {
            for event in decoder.push(&chunk)? {
                if let Some(result) = settle(event, progress)? {
                    return Ok(result);
                }
            }
        }
        match decoder.finish()? {
            Some(event) => settle(event, progress)?.ok_or(TransportError::StreamEnded),
            None => Err(TransportError::StreamEnded),
        }
    }
}

/// Apply one stream event; `Some` once the prediction has arrived.
fn settle(
    event: StreamEvent,
    progress: &mut dyn FnMut(&SimulationProgress),
) -> Result<Option<PredictionResult>, TransportError> {
    match event {
        StreamEvent::Progress(update) => {
            log::debug!("prediction progress {:.0}%", update.progress);
            progress(&update);
            Ok(None)
        }
        StreamEvent::Error { message } => Err(TransportError::Remote(message)),
        StreamEvent::Complete(result) => {
            progress(&SimulationProgress {
                progress: 100.0,
                message: None,
            });
            Ok(Some(result))
        }
    }
}

fn network(err: reqwest::Error) -> TransportError {
    TransportError::Network(err.to_string())
}

impl Predictor for HttpPredictor {
    async fn predict(
        &self,
        features: &FeatureRecord,
        progress: &mut dyn FnMut(&SimulationProgress),
    ) -> Result<PredictionResult, TransportError> {
        let request = async move {
            match self.transport {
                Transport::Single => self.predict_single(features, progress).await,
                Transport::Stream => self.predict_stream(features, progress).await,
            }
        };
        tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| TransportError::Timeout(self.timeout))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::body::Bytes;
    use hyper::service::{make_service_fn, service_fn};
    use hyper::{Body, Request, Response, Server, StatusCode};
    use quakesafe_game::{Catalog, SessionState};
    use std::convert::Infallible;
    use std::net::SocketAddr;

    const STREAM_FRAMES: &[&str] = &[
        "data: {\"progress\": 10, \"message\": \"Loading model\"}\n\n",
        "data: {\"progress\": 60, \"mess",
        "age\": \"Shaking\"}\n\ndata: {\"type\": \"complete\", \"progress\": 100, ",
        "\"prediction\": 18.5, \"feature_importance\": {\"foundation_type_RC\": -7.5}}\n\n",
    ];

    fn json_response(status: StatusCode, body: &str) -> Response<Body> {
        Response::builder()
            .status(status)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap_or_default()
    }

    fn chunked(frames: &'static [&'static str]) -> Response<Body> {
        let (mut sender, body) = Body::channel();
        tokio::spawn(async move {
            for frame in frames {
                if sender.send_data(Bytes::from_static(frame.as_bytes())).await.is_err() {
                    return;
                }
                tokio::task::yield_now().await;
            }
        });
        Response::new(body)
    }

    async fn fake_service(req: Request<Body>) -> Result<Response<Body>, Infallible> {
        let path = req.uri().path().to_string();
        let body = hyper::body::to_bytes(req.into_body())
            .await
            .unwrap_or_default();
        let features: serde_json::Value = serde_json::from_slice(&body).unwrap_or_default();
        if features.get("foundation_type_RC").is_none() {
            return Ok(json_response(
                StatusCode::BAD_REQUEST,
                r#"{"error": "Missing keys"}"#,
            ));
        }
        let response = match path.as_str() {
            "/api/predict" => json_response(
                StatusCode::OK,
                r#"{"prediction": 32.4, "feature_importance": {"count_floors_pre_eq": 12.0}}"#,
            ),
            "/api/predict/stream" => chunked(STREAM_FRAMES),
            "/broken/api/predict/stream" => chunked(&[
                "data: {\"progress\": 5}\n\n",
                "data: {\"type\": \"error\", \"error\": \"model crashed\"}\n\n",
            ]),
            "/short/api/predict/stream" => chunked(&["data: {\"progress\": 5}\n\n"]),
            "/slow/api/predict" => {
                tokio::time::sleep(Duration::from_secs(5)).await;
                json_response(StatusCode::OK, r#"{"prediction": 1.0}"#)
            }
            _ => json_response(StatusCode::INTERNAL_SERVER_ERROR, r#"{"error": "boom"}"#),
        };
        Ok(response)
    }

    fn spawn_fake_service() -> SocketAddr {
        let make = make_service_fn(|_| async { Ok::<_, Infallible>(service_fn(fake_service)) });
        let server = Server::bind(&SocketAddr::from(([127, 0, 0, 1], 0))).serve(make);
        let addr = server.local_addr();
        tokio::spawn(server);
        addr
    }

    fn sample_features() -> FeatureRecord {
        let catalog = Catalog::default_catalog();
        FeatureRecord::from_selections(
            catalog.building_size("medium-two-story"),
            catalog.building_structure("modern-concrete"),
            catalog.location("gorkha"),
        )
        .unwrap()
    }

    fn predictor(base: String, transport: Transport) -> HttpPredictor {
        HttpPredictor::new(&base, transport, Duration::from_secs(2)).unwrap()
    }

    #[tokio::test]
    async fn single_request_returns_prediction() {
        let addr = spawn_fake_service();
        let client = predictor(format!("http://{addr}/"), Transport::Single);
        let mut seen = Vec::new();
        let result = client
            .predict(&sample_features(), &mut |p| seen.push(p.progress))
            .await
            .unwrap();
        assert!((result.prediction - 32.4).abs() < f64::EPSILON);
        assert!(result.feature_importance.is_some());
        assert_eq!(seen, vec![0.0, 100.0]);
    }

    #[tokio::test]
    async fn stream_reports_progress_then_completes() {
        let addr = spawn_fake_service();
        let client = predictor(format!("http://{addr}"), Transport::Stream);
        let mut seen = Vec::new();
        let result = client
            .predict(&sample_features(), &mut |p| seen.push(p.progress))
            .await
            .unwrap();
        assert!((result.prediction - 18.5).abs() < f64::EPSILON);
        assert_eq!(seen, vec![10.0, 60.0, 100.0]);
    }

    #[tokio::test]
    async fn stream_error_frame_is_remote_error() {
        let addr = spawn_fake_service();
        let client = predictor(format!("http://{addr}/broken"), Transport::Stream);
        let err = client
            .predict(&sample_features(), &mut |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Remote("model crashed".to_string()));
    }

    #[tokio::test]
    async fn stream_closing_early_is_reported() {
        let addr = spawn_fake_service();
        let client = predictor(format!("http://{addr}/short"), Transport::Stream);
        let err = client
            .predict(&sample_features(), &mut |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::StreamEnded);
    }

    #[tokio::test]
    async fn non_success_status_is_surfaced() {
        let addr = spawn_fake_service();
        let client = predictor(format!("http://{addr}/missing"), Transport::Single);
        let err = client
            .predict(&sample_features(), &mut |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Status(500));
    }

    #[tokio::test]
    async fn slow_service_times_out() {
        let addr = spawn_fake_service();
        let client = HttpPredictor::new(
            &format!("http://{addr}/slow"),
            Transport::Single,
            Duration::from_millis(200),
        )
        .unwrap();
        let err = client
            .predict(&sample_features(), &mut |_| {})
            .await
            .unwrap_err();
        assert_eq!(err, TransportError::Timeout(Duration::from_millis(200)));
    }

    #[tokio::test]
    async fn unreachable_service_is_a_network_error() {
        let client = HttpPredictor::new(
            "http://127.0.0.1:9",
            Transport::Single,
            Duration::from_secs(2),
        )
        .unwrap();
        let err = client
            .predict(&sample_features(), &mut |_| {})
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::Network(_) | TransportError::Timeout(_)
        ));
    }

    #[tokio::test]
    async fn failed_prediction_folds_into_session() {
        let addr = spawn_fake_service();
        let client = predictor(format!("http://{addr}/broken"), Transport::Stream);
        let catalog = Catalog::default_catalog();
        let mut state = SessionState::new();
        state.advance().unwrap();
        state
            .select_character(catalog.character("village-teacher").unwrap())
            .unwrap();
        state.advance().unwrap();
        state
            .select_location(catalog.location("gorkha").unwrap())
            .unwrap();
        state.advance().unwrap();
        state
            .select_building_size(catalog.building_size("medium-two-story").unwrap())
            .unwrap();
        state.advance().unwrap();
        state
            .select_building_structure(catalog.building_structure("modern-concrete").unwrap())
            .unwrap();
        let quakesafe_game::AdvanceOutcome::SimulationRequested(request) =
            state.advance().unwrap()
        else {
            panic!("expected a simulation request");
        };
        let outcome =
            quakesafe_game::run_simulation(&mut state, request, &client, &mut |_| {}).await;
        assert_eq!(outcome, quakesafe_game::FoldOutcome::Failed);
        assert_eq!(state.phase(), quakesafe_game::Phase::Simulation);
    }
}
