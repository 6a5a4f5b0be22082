//! The encode/decode facade over a shared vocabulary.

use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use crate::decode::{clean_up_spaces, join_pieces, DecodeOptions};
use crate::error::{TokenizerError, VocabularyLoadError};
use crate::vocab::{Vocabulary, VocabularyConfig};
use crate::wordpiece::segment_word;

/// WordPiece tokenizer.
///
/// Cloning is cheap: clones share one read-only [`Vocabulary`], so a tokenizer
/// can be handed to any number of threads without locking.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    vocab: Arc<Vocabulary>,
    decode_options: DecodeOptions,
}

impl From<Vocabulary> for Tokenizer {
    fn from(vocab: Vocabulary) -> Self {
        Self::new(Arc::new(vocab))
    }
}

impl Tokenizer {
    /// Wrap an already loaded vocabulary.
    pub fn new(vocab: Arc<Vocabulary>) -> Self {
        Self {
            vocab,
            decode_options: DecodeOptions::default(),
        }
    }

    /// Load the vocabulary at `path` (see [`Vocabulary::from_file`]).
    pub fn from_file(path: impl AsRef<Path>, config: VocabularyConfig) -> Result<Self, VocabularyLoadError> {
        Ok(Self::from(Vocabulary::from_file(path, config)?))
    }

    /// Replace the options used by [`Tokenizer::decode`].
    pub fn with_decode_options(mut self, options: DecodeOptions) -> Self {
        self.decode_options = options;
        self
    }

    /// The shared vocabulary.
    pub fn vocabulary(&self) -> &Vocabulary {
        &self.vocab
    }

    /// Subword ids of `text`, without framing markers.
    ///
    /// Never fails: unknown words become `[UNK]`. Empty or blank text gives an
    /// empty sequence.
    pub fn encode(&self, text: &str) -> Vec<u32> {
        let mut ids = Vec::new();
        self.encode_into(text, &mut ids);
        ids
    }

    /// `[CLS] text [SEP]`. Always at least two ids.
    pub fn encode_framed(&self, text: &str) -> Vec<u32> {
        let special = self.vocab.special();
        let mut ids = vec![special.cls];
        self.encode_into(text, &mut ids);
        ids.push(special.sep);
        ids
    }

    /// Encode many texts in parallel. Output order follows input order.
    pub fn encode_batch<S>(&self, texts: &[S]) -> Vec<Vec<u32>>
    where
        S: AsRef<str> + Sync,
    {
        texts.par_iter().map(|t| self.encode(t.as_ref())).collect()
    }

    /// Piece strings of `text`, e.g. `["play", "##ing"]`.
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        self.encode(text)
            .into_iter()
            .filter_map(|id| self.vocab.token_for(id).ok().map(str::to_string))
            .collect()
    }

    pub(crate) fn encode_into(&self, text: &str, out: &mut Vec<u32>) {
        let vocab = &*self.vocab;
        let words = vocab
            .normalization()
            .split_words(text, |chunk| vocab.is_reserved_marker(chunk));
        let before = out.len();
        let mut unknown = 0usize;
        for word in &words {
            if !segment_word(vocab, word, out) {
                unknown += 1;
            }
        }
        tracing::trace!(
            words = words.len(),
            pieces = out.len() - before,
            unknown,
            "encoded text"
        );
    }

    /// Text for `ids` using the tokenizer's decode options.
    ///
    /// Fails with [`TokenizerError::InvalidId`] on the first id outside the vocabulary.
    pub fn decode(&self, ids: &[u32]) -> Result<String, TokenizerError> {
        self.decode_with(ids, self.decode_options)
    }

    /// Text for `ids` with explicit options.
    pub fn decode_with(&self, ids: &[u32], options: DecodeOptions) -> Result<String, TokenizerError> {
        let mut pieces = Vec::with_capacity(ids.len());
        for &id in ids {
            let token = self.vocab.token_for(id)?;
            if options.skip_framing && self.vocab.is_framing(id) {
                continue;
            }
            pieces.push(token);
        }
        let text = join_pieces(pieces, self.vocab.continuation_prefix());
        Ok(if options.clean_up_spaces {
            clean_up_spaces(&text)
        } else {
            text
        })
    }
}
