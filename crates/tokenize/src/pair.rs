//! `[CLS] question [SEP] context [SEP]` model input.

use std::ops::Range;

use serde::Serialize;

use crate::tokenizer::Tokenizer;

/// Framed (question, context) sequence plus the positions of each segment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedPair {
    /// `[CLS] q [SEP] c [SEP]`
    pub input_ids: Vec<u32>,
    /// segment of each position: 0 through the first `[SEP]`, 1 after it
    pub type_ids: Vec<u32>,
    /// positions of the question pieces
    pub question: Range<usize>,
    /// positions of the context pieces; an answer span should lie inside it
    pub context: Range<usize>,
    /// whether pieces were dropped to respect a length limit
    pub truncated: bool,
}

impl EncodedPair {
    fn compose(cls: u32, sep: u32, question: &[u32], context: &[u32], truncated: bool) -> Self {
        let q_start = 1;
        let q_end = q_start + question.len();
        let c_start = q_end + 1;
        let c_end = c_start + context.len();

        let mut input_ids = Vec::with_capacity(c_end + 1);
        input_ids.push(cls);
        input_ids.extend_from_slice(question);
        input_ids.push(sep);
        input_ids.extend_from_slice(context);
        input_ids.push(sep);

        let mut type_ids = vec![0; c_start];
        type_ids.resize(input_ids.len(), 1);

        Self {
            input_ids,
            type_ids,
            question: q_start..q_end,
            context: c_start..c_end,
            truncated,
        }
    }

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.input_ids.len()
    }

    /// Never true: framing alone is three ids.
    pub fn is_empty(&self) -> bool {
        self.input_ids.is_empty()
    }

    /// All ones; there is no padding in a single unbatched pair.
    pub fn attention_mask(&self) -> Vec<u32> {
        vec![1; self.input_ids.len()]
    }

    /// Context piece ids.
    pub fn context_ids(&self) -> &[u32] {
        self.input_ids.get(self.context.clone()).unwrap_or(&[])
    }

    /// Question piece ids.
    pub fn question_ids(&self) -> &[u32] {
        self.input_ids.get(self.question.clone()).unwrap_or(&[])
    }
}

impl Tokenizer {
    /// Encode a question and its context as one framed model input.
    pub fn encode_pair(&self, question: &str, context: &str) -> EncodedPair {
        let special = self.vocabulary().special();
        let q = self.encode(question);
        let c = self.encode(context);
        EncodedPair::compose(special.cls, special.sep, &q, &c, false)
    }

    /// Like [`Tokenizer::encode_pair`] but at most `max_len` ids long.
    ///
    /// Context pieces are dropped from the end first, then question pieces.
    /// The three framing markers are always kept, so `max_len` below 3 acts as 3.
    pub fn encode_pair_truncated(&self, question: &str, context: &str, max_len: usize) -> EncodedPair {
        let special = self.vocabulary().special();
        let mut q = self.encode(question);
        let mut c = self.encode(context);
        let room = max_len.saturating_sub(3);
        let total = q.len() + c.len();
        let truncated = total > room;
        if truncated {
            c.truncate(room.saturating_sub(q.len()));
            q.truncate(room);
            tracing::debug!(
                max_len,
                dropped = total - q.len() - c.len(),
                "truncated question/context pair"
            );
        }
        EncodedPair::compose(special.cls, special.sep, &q, &c, truncated)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::vocab::{Vocabulary, VocabularyConfig};

    fn tokenizer() -> Tokenizer {
        let tokens = vec!["[PAD]", "[UNK]", "[CLS]", "[SEP]", "what", "crawled", "?", "the", "spider", "up"];
        Tokenizer::from(Vocabulary::from_ordered_tokens(tokens, VocabularyConfig::default()).unwrap())
    }

    #[test]
    fn pair_is_framed_question_first() {
        let t = tokenizer();
        let pair = t.encode_pair("What crawled?", "the spider crawled up");
        assert_eq!(pair.input_ids, vec![2, 4, 5, 6, 3, 7, 8, 5, 9, 3]);
        assert_eq!(pair.type_ids, vec![0, 0, 0, 0, 0, 1, 1, 1, 1, 1]);
        assert_eq!(pair.question, 1..4);
        assert_eq!(pair.context, 5..9);
        assert_eq!(pair.context_ids(), &[7, 8, 5, 9]);
        assert_eq!(pair.question_ids(), &[4, 5, 6]);
        assert_eq!(pair.attention_mask().len(), pair.len());
        assert!(!pair.truncated);
    }

    #[test]
    fn empty_pair_is_only_markers() {
        let t = tokenizer();
        let pair = t.encode_pair("", "");
        assert_eq!(pair.input_ids, vec![2, 3, 3]);
        assert!(pair.context.is_empty());
        assert!(pair.question.is_empty());
    }

    #[test]
    fn truncation_drops_context_before_question() {
        let t = tokenizer();
        let pair = t.encode_pair_truncated("What crawled?", "the spider crawled up", 8);
        assert_eq!(pair.input_ids, vec![2, 4, 5, 6, 3, 7, 8, 3]);
        assert!(pair.truncated);

        let pair = t.encode_pair_truncated("What crawled?", "the spider crawled up", 5);
        assert_eq!(pair.input_ids, vec![2, 4, 5, 3, 3]);
        assert_eq!(pair.context, 4..4);
    }

    #[test]
    fn tiny_limit_keeps_framing() {
        let t = tokenizer();
        let pair = t.encode_pair_truncated("what", "spider", 0);
        assert_eq!(pair.input_ids, vec![2, 3, 3]);
    }

    #[test]
    fn limit_that_fits_changes_nothing() {
        let t = tokenizer();
        let full = t.encode_pair("what", "the spider");
        let limited = t.encode_pair_truncated("what", "the spider", full.len());
        assert_eq!(full, limited);
    }
}
