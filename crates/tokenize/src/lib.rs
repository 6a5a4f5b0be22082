#![forbid(unsafe_code)]
#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::indexing_slicing
)]
#![deny(missing_docs, unused_must_use)]

//! WordPiece subword tokenizer.
//!
//! Converts raw text into vocabulary ids for a BERT-style model and turns a
//! span of ids back into text. Segmentation is greedy longest-match over a
//! fixed vocabulary; a word that cannot be fully segmented becomes one `[UNK]`.
//!
//! Layout:
//! - `vocab.rs`: validated token/id table and its file formats
//! - `normalize.rs`: case/accent folding and word splitting, declared per vocabulary
//! - `wordpiece.rs`: per-word segmentation
//! - `decode.rs`: detokenization join rules
//! - `tokenizer.rs`: `Tokenizer` facade (encode, decode, batch)
//! - `pair.rs`: `[CLS] question [SEP] context [SEP]` composition
//!
//! ```no_run
//! use tokenize::{Tokenizer, VocabularyConfig};
//!
//! let tokenizer = Tokenizer::from_file("vocab.txt", VocabularyConfig::default())?;
//! let pair = tokenizer.encode_pair("What crawled up?", "The itsy bitsy spider crawled up the spout.");
//! let answer = tokenizer.decode(pair.context_ids())?;
//! # Ok::<(), tokenize::TokenizerError>(())
//! ```

/// Load and lookup errors.
pub mod error;
/// Text normalization ahead of segmentation.
pub mod normalize;
/// Token/id table.
pub mod vocab;
mod wordpiece;
/// Detokenization helpers.
pub mod decode;
/// Encode/decode facade.
pub mod tokenizer;
/// Question/context composition.
pub mod pair;

pub use decode::DecodeOptions;
pub use error::{TokenizerError, VocabularyLoadError};
pub use normalize::Normalization;
pub use pair::EncodedPair;
pub use tokenizer::Tokenizer;
pub use vocab::{SpecialIds, Vocabulary, VocabularyConfig};
