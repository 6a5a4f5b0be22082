/// Reasons a vocabulary source is rejected at load time.
///
/// Any of these is fatal to building a [`crate::Tokenizer`]; there is no
/// partially loaded vocabulary.
#[derive(Debug, thiserror::Error)]
pub enum VocabularyLoadError {
    /// The source file could not be read
    #[error("cannot read vocabulary source: {0}")]
    Io(#[from] std::io::Error),

    /// The source is not valid JSON or does not have the expected shape
    #[error("malformed vocabulary json: {0}")]
    Json(#[from] serde_json::Error),

    /// The source lists no tokens at all
    #[error("vocabulary is empty")]
    Empty,

    /// Two different tokens claim the same id
    #[error("id {id} is assigned to both {first:?} and {second:?}")]
    DuplicateId {
        /// the contested id
        id: u32,
        /// token seen first with this id
        first: String,
        /// token seen second with this id
        second: String,
    },

    /// The same token string appears with two ids
    #[error("token {token:?} is listed twice (ids {first} and {second})")]
    DuplicateToken {
        /// the repeated token
        token: String,
        /// first id seen for it
        first: u32,
        /// second id seen for it
        second: u32,
    },

    /// Some id below the vocabulary size has no token
    #[error("id space is not contiguous: id {missing} is unassigned (vocabulary has {size} tokens)")]
    NonContiguous {
        /// lowest unassigned id
        missing: u32,
        /// number of tokens in the source
        size: usize,
    },

    /// A reserved marker such as `[CLS]` is absent
    #[error("required marker {0} is missing from the vocabulary")]
    MissingMarker(String),

    /// A `tokenizer.json` declares a model other than WordPiece
    #[error("unsupported tokenizer model {0:?}, expected WordPiece")]
    UnsupportedModel(String),

    /// More tokens than fit in a 32-bit id
    #[error("vocabulary too large for 32-bit ids")]
    TooLarge,
}

/// Errors surfaced by tokenizer operations.
#[derive(Debug, thiserror::Error)]
pub enum TokenizerError {
    /// The vocabulary could not be built
    #[error(transparent)]
    Load(#[from] VocabularyLoadError),

    /// An id outside `[0, size)` was looked up. Always a caller bug, never coerced.
    #[error("token id {id} is outside the vocabulary (size {size})")]
    InvalidId {
        /// the offending id
        id: u32,
        /// vocabulary size at the time of the lookup
        size: usize,
    },
}
