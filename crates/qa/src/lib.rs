#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
#![deny(missing_docs, unused_must_use)]

//! Extractive question answering on top of the `tokenize` WordPiece tokenizer.
//!
//! The flow is: encode `[CLS] question [SEP] context [SEP]`, hand the ids to an
//! [`InferenceEngine`] as a `(1, n)` tensor, pick the best start/end positions
//! inside the context from the returned scores, decode the ids in between.
//!
//! The inference runtime itself is outside this crate; anything implementing
//! [`InferenceEngine`] can be plugged in, including plain closures and
//! [`PrecomputedLogits`] for scores computed by another process.

/// Answer extraction.
pub mod answer;
/// JSON configuration.
pub mod config;
/// Inference runtime seam.
pub mod engine;
/// Error type.
pub mod error;
/// Span selection over start/end scores.
pub mod span;

pub use answer::{answer_from_logits, Answer, AnswerOptions, QuestionAnswerer};
pub use config::{ConfigError, QaConfig, ServerConfig};
pub use engine::{EngineError, InferenceEngine, InputTensor, PrecomputedLogits, QaLogits};
pub use error::QaError;
pub use span::{argmax, best_span, independent_span, AnswerSpan, SpanError};

/// Install the `tracing` subscriber used by the binaries.
///
/// Honours `RUST_LOG`; defaults to info for this workspace's crates.
pub fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("qa=info,tokenize=info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
