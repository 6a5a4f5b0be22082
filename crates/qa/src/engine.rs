//! Seam to the external inference runtime.
//!
//! The runtime is a black box: it takes a `(1, sequence_length)` integer tensor
//! of token ids and returns start and end scores for every position.

use serde::{Deserialize, Serialize};

/// Model input tensor, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InputTensor {
    /// token ids widened to the runtime's integer type
    pub data: Vec<i64>,
    /// `[batch, sequence_length]`, batch is always 1
    pub shape: [usize; 2],
}

impl InputTensor {
    /// Single-row tensor over `ids`.
    pub fn from_ids(ids: &[u32]) -> Self {
        Self {
            data: ids.iter().map(|&id| i64::from(id)).collect(),
            shape: [1, ids.len()],
        }
    }

    /// Sequence length.
    pub fn seq_len(&self) -> usize {
        self.shape[1]
    }
}

/// Per-position answer boundary scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QaLogits {
    /// score of each position being the first answer token
    #[serde(alias = "start_logits")]
    pub start: Vec<f32>,
    /// score of each position being the last answer token
    #[serde(alias = "end_logits")]
    pub end: Vec<f32>,
}

/// Failure reported by an inference runtime.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The runtime ran but failed
    #[error("inference failed: {0}")]
    Runtime(String),

    /// Output does not cover the input sequence
    #[error("engine returned {got} scores for a sequence of {expected}")]
    ShapeMismatch {
        /// sequence length sent
        expected: usize,
        /// scores received
        got: usize,
    },
}

/// An extractive question answering model.
pub trait InferenceEngine {
    /// Run one forward pass.
    fn forward(&self, input: &InputTensor) -> Result<QaLogits, EngineError>;
}

impl<F> InferenceEngine for F
where
    F: Fn(&InputTensor) -> Result<QaLogits, EngineError>,
{
    fn forward(&self, input: &InputTensor) -> Result<QaLogits, EngineError> {
        self(input)
    }
}

/// Engine that replays scores produced elsewhere, e.g. by a runtime in another
/// process that wrote them to a JSON file.
#[derive(Debug, Clone)]
pub struct PrecomputedLogits {
    logits: QaLogits,
}

impl PrecomputedLogits {
    /// Replay `logits` for any input of matching length.
    pub fn new(logits: QaLogits) -> Self {
        Self { logits }
    }

    /// Parse `{"start": [...], "end": [...]}` (or `start_logits`/`end_logits`).
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(text)?))
    }
}

impl InferenceEngine for PrecomputedLogits {
    fn forward(&self, input: &InputTensor) -> Result<QaLogits, EngineError> {
        let expected = input.seq_len();
        for got in [self.logits.start.len(), self.logits.end.len()] {
            if got != expected {
                return Err(EngineError::ShapeMismatch { expected, got });
            }
        }
        Ok(self.logits.clone())
    }
}
