use tokenize::{TokenizerError, VocabularyLoadError};

use crate::config::ConfigError;
use crate::engine::EngineError;
use crate::span::SpanError;

/// Anything that can go wrong answering a question.
#[derive(Debug, thiserror::Error)]
pub enum QaError {
    /// Vocabulary could not be loaded
    #[error(transparent)]
    Load(#[from] VocabularyLoadError),

    /// Encode/decode failure, e.g. an id outside the vocabulary
    #[error(transparent)]
    Tokenizer(#[from] TokenizerError),

    /// Inference engine failure
    #[error(transparent)]
    Engine(#[from] EngineError),

    /// No usable answer span in the logits
    #[error(transparent)]
    Span(#[from] SpanError),

    /// Configuration file problem
    #[error(transparent)]
    Config(#[from] ConfigError),
}
