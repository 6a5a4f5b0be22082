//! Question in, answer text out.

use serde::{Deserialize, Serialize};
use tokenize::{DecodeOptions, EncodedPair, Tokenizer};

use crate::engine::{InferenceEngine, InputTensor, QaLogits};
use crate::error::QaError;
use crate::span::{best_span, independent_span, AnswerSpan};

/// Knobs for turning scores into an answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnswerOptions {
    /// longest input sent to the engine; longer contexts are truncated
    pub max_seq_len: usize,
    /// longest answer considered, in tokens
    pub max_answer_len: usize,
    /// restrict the span to the context segment with `start <= end`
    pub constrain_to_context: bool,
    /// tighten spaces before punctuation in the answer text
    pub clean_up_spaces: bool,
}

impl Default for AnswerOptions {
    fn default() -> Self {
        Self {
            max_seq_len: 384,
            max_answer_len: 30,
            constrain_to_context: true,
            clean_up_spaces: true,
        }
    }
}

/// Extracted answer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Answer {
    /// decoded answer text
    pub text: String,
    /// token positions in the model input
    pub span: AnswerSpan,
    /// `start + end` score of the span
    pub score: f32,
}

/// Pick a span from `logits` and decode the ids it covers.
pub fn answer_from_logits(
    tokenizer: &Tokenizer,
    pair: &EncodedPair,
    logits: &QaLogits,
    options: &AnswerOptions,
) -> Result<Answer, QaError> {
    let (span, score) = if options.constrain_to_context {
        best_span(&logits.start, &logits.end, pair.context.clone(), options.max_answer_len)?
    } else {
        let span = independent_span(&logits.start, &logits.end)?;
        let score = logits.start.get(span.start()).copied().unwrap_or(f32::NAN)
            + logits.end.get(span.end()).copied().unwrap_or(f32::NAN);
        (span, score)
    };
    let ids = span.ids(&pair.input_ids)?;
    let decode = DecodeOptions {
        skip_framing: true,
        clean_up_spaces: options.clean_up_spaces,
    };
    let text = tokenizer.decode_with(ids, decode)?;
    tracing::debug!(start = span.start(), end = span.end(), score, "answer span selected");
    Ok(Answer { text, span, score })
}

/// Tokenizer and engine wired together.
pub struct QuestionAnswerer<E> {
    tokenizer: Tokenizer,
    engine: E,
    options: AnswerOptions,
}

impl<E: InferenceEngine> QuestionAnswerer<E> {
    /// Pair a tokenizer with the engine it was trained for.
    pub fn new(tokenizer: Tokenizer, engine: E, options: AnswerOptions) -> Self {
        Self { tokenizer, engine, options }
    }

    /// The tokenizer in use.
    pub fn tokenizer(&self) -> &Tokenizer {
        &self.tokenizer
    }

    /// Build the model input for a question about `context`.
    pub fn prepare(&self, question: &str, context: &str) -> EncodedPair {
        self.tokenizer
            .encode_pair_truncated(question, context, self.options.max_seq_len)
    }

    /// Answer `question` from `context`.
    ///
    /// Encoding completes before the engine runs; decoding starts only after
    /// the engine has returned.
    pub fn answer(&self, question: &str, context: &str) -> Result<Answer, QaError> {
        let pair = self.prepare(question, context);
        let input = InputTensor::from_ids(&pair.input_ids);
        let logits = self.engine.forward(&input)?;
        answer_from_logits(&self.tokenizer, &pair, &logits, &self.options)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::engine::{EngineError, PrecomputedLogits};
    use crate::span::SpanError;
    use tokenize::{Vocabulary, VocabularyConfig};

    fn tokenizer() -> Tokenizer {
        let tokens = vec![
            "[PAD]", "[UNK]", "[CLS]", "[SEP]", "what", "crawled", "?", "the", "itsy", "bits", "##y", "spider", ".",
        ];
        Tokenizer::from(Vocabulary::from_ordered_tokens(tokens, VocabularyConfig::default()).unwrap())
    }

    /// Scores peaking at `start` and `end` for a sequence of `len`.
    fn peaked(len: usize, start: usize, end: usize) -> QaLogits {
        let mut logits = QaLogits { start: vec![0.0; len], end: vec![0.0; len] };
        logits.start[start] = 10.0;
        logits.end[end] = 10.0;
        logits
    }

    #[test]
    fn answers_from_context_span() {
        let t = tokenizer();
        // [CLS] what crawled ? [SEP] the itsy bits ##y spider crawled . [SEP]
        let pair = t.encode_pair("What crawled?", "The itsy bitsy spider crawled.");
        assert_eq!(pair.len(), 13);
        let logits = peaked(pair.len(), 5, 9);
        let answer = answer_from_logits(&t, &pair, &logits, &AnswerOptions::default()).unwrap();
        assert_eq!(answer.text, "the itsy bitsy spider");
        assert_eq!(answer.span, AnswerSpan::new(5, 9).unwrap());
        assert_eq!(answer.score, 20.0);
    }

    #[test]
    fn constrained_answer_ignores_question_peaks() {
        let t = tokenizer();
        let pair = t.encode_pair("What crawled?", "The itsy bitsy spider crawled.");
        let mut logits = peaked(pair.len(), 1, 2);
        logits.start[9] = 5.0;
        logits.end[9] = 5.0;
        let answer = answer_from_logits(&t, &pair, &logits, &AnswerOptions::default()).unwrap();
        assert_eq!(answer.text, "spider");
    }

    #[test]
    fn unconstrained_answer_follows_raw_argmax() {
        let t = tokenizer();
        let pair = t.encode_pair("What crawled?", "The itsy bitsy spider crawled.");
        let options = AnswerOptions { constrain_to_context: false, ..AnswerOptions::default() };
        let answer = answer_from_logits(&t, &pair, &peaked(pair.len(), 1, 2), &options).unwrap();
        assert_eq!(answer.text, "what crawled");

        let err = answer_from_logits(&t, &pair, &peaked(pair.len(), 9, 5), &options).unwrap_err();
        assert!(matches!(err, QaError::Span(SpanError::Inverted { start: 9, end: 5 })));
    }

    #[test]
    fn framing_inside_span_is_not_in_text() {
        let t = tokenizer();
        let pair = t.encode_pair("What crawled?", "The itsy bitsy spider crawled.");
        let options = AnswerOptions { constrain_to_context: false, ..AnswerOptions::default() };
        let answer = answer_from_logits(&t, &pair, &peaked(pair.len(), 3, 6), &options).unwrap();
        assert_eq!(answer.text, "? the itsy");
    }

    #[test]
    fn answerer_runs_engine_on_framed_input() {
        let engine = |input: &InputTensor| {
            assert_eq!(input.data.first(), Some(&2));
            assert_eq!(input.data.last(), Some(&3));
            let mut logits = QaLogits { start: vec![0.0; input.seq_len()], end: vec![0.0; input.seq_len()] };
            logits.start[9] = 1.0;
            logits.end[11] = 1.0;
            Ok::<_, EngineError>(logits)
        };
        let qa = QuestionAnswerer::new(tokenizer(), engine, AnswerOptions::default());
        let answer = qa.answer("What crawled?", "The itsy bitsy spider crawled.").unwrap();
        assert_eq!(answer.text, "spider crawled.");
    }

    #[test]
    fn engine_failure_propagates() {
        let engine = |_: &InputTensor| Err::<QaLogits, _>(EngineError::Runtime("model not loaded".into()));
        let qa = QuestionAnswerer::new(tokenizer(), engine, AnswerOptions::default());
        let err = qa.answer("what", "the spider").unwrap_err();
        assert!(matches!(err, QaError::Engine(EngineError::Runtime(_))));
    }

    #[test]
    fn wrong_length_logits_are_rejected() {
        let qa = QuestionAnswerer::new(
            tokenizer(),
            PrecomputedLogits::new(peaked(4, 1, 2)),
            AnswerOptions::default(),
        );
        let err = qa.answer("what", "the itsy spider").unwrap_err();
        assert!(matches!(err, QaError::Engine(EngineError::ShapeMismatch { .. })));
    }

    #[test]
    fn long_context_is_truncated_to_max_seq_len() {
        let options = AnswerOptions { max_seq_len: 8, ..AnswerOptions::default() };
        let qa = QuestionAnswerer::new(tokenizer(), PrecomputedLogits::new(peaked(8, 5, 6)), options);
        let pair = qa.prepare("What crawled?", "The itsy bitsy spider crawled.");
        assert_eq!(pair.len(), 8);
        assert!(pair.truncated);
        let answer = qa.answer("What crawled?", "The itsy bitsy spider crawled.").unwrap();
        assert_eq!(answer.text, "the itsy");
    }
}
