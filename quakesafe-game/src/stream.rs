//! Incremental decoder for the prediction service's server-push progress stream.
//!
//! The stream is a sequence of `data: {json}` frames separated by blank lines.
//! Bytes may arrive split anywhere, including inside a UTF-8 sequence, so the
//! decoder buffers raw bytes and only decodes complete frames.
use serde::Deserialize;
use std::collections::BTreeMap;

use crate::simulation::{PredictionResult, SimulationProgress, TransportError};

const FRAME_SEPARATOR: &[u8] = b"\n\n";
const DATA_PREFIX: &str = "data:";

/// One decoded frame of the progress stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Progress(SimulationProgress),
    Error { message: String },
    Complete(PredictionResult),
}

#[derive(Debug, Deserialize)]
struct RawFrame {
    #[serde(default)]
    progress: Option<f64>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    prediction: Option<f64>,
    #[serde(default)]
    feature_importance: Option<BTreeMap<String, f64>>,
}

impl RawFrame {
    fn into_event(self) -> Result<StreamEvent, TransportError> {
        match self.kind.as_deref() {
            Some("error") => Ok(StreamEvent::Error {
                message: self
                    .error
                    .or(self.message)
                    .unwrap_or_else(|| "unknown error".to_string()),
            }),
            Some("complete") => {
                let prediction = self.prediction.ok_or_else(|| {
                    TransportError::MalformedFrame("complete frame without prediction".to_string())
                })?;
                Ok(StreamEvent::Complete(PredictionResult {
                    prediction,
                    feature_importance: self.feature_importance,
                }))
            }
            _ => Ok(StreamEvent::Progress(SimulationProgress {
                progress: self.progress.unwrap_or(0.0),
                message: self.message,
            })),
        }
    }
}

/// Buffers stream bytes and yields events for every complete frame.
#[derive(Debug, Default, Clone)]
pub struct FrameDecoder {
    buffer: Vec<u8>,
}

impl FrameDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of bytes, returning the events of every frame it completed.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MalformedFrame`] when a completed frame is not valid UTF-8
    /// or its payload is not a valid progress frame.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<StreamEvent>, TransportError> {
        self.buffer.extend(bytes.iter().copied().filter(|b| *b != b'\r'));
        let mut events = Vec::new();
        while let Some(pos) = find_separator(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..pos + FRAME_SEPARATOR.len()).collect();
            if let Some(event) = decode_frame(&frame[..pos])? {
                events.push(event);
            }
        }
        Ok(events)
    }

    /// Decode whatever remains once the stream has closed.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::MalformedFrame`] when the trailing bytes form an invalid frame.
    pub fn finish(&mut self) -> Result<Option<StreamEvent>, TransportError> {
        let rest = std::mem::take(&mut self.buffer);
        decode_frame(&rest)
    }

    /// Number of buffered bytes not yet forming a complete frame.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

fn find_separator(buffer: &[u8]) -> Option<usize> {
    buffer
        .windows(FRAME_SEPARATOR.len())
        .position(|window| window == FRAME_SEPARATOR)
}

fn decode_frame(frame: &[u8]) -> Result<Option<StreamEvent>, TransportError> {
    let text = std::str::from_utf8(frame)
        .map_err(|err| TransportError::MalformedFrame(err.to_string()))?;
    let payload: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix(DATA_PREFIX))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();
    if payload.is_empty() {
        return Ok(None);
    }
    let raw: RawFrame = serde_json::from_str(&payload.join("\n"))
        .map_err(|err| TransportError::MalformedFrame(err.to_string()))?;
    raw.into_event().map(Some)
}
