//! Picking the answer span out of start/end scores.
//!
//! Choosing the positions is the caller's job, not the tokenizer's. A usable
//! span has `start <= end` and lies inside the context segment of the input;
//! [`best_span`] enforces both, [`independent_span`] enforces neither and only
//! reports an inverted pair.

use std::ops::Range;

use serde::Serialize;

/// Inclusive range of token positions, `start <= end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AnswerSpan {
    start: usize,
    end: usize,
}

/// Why no span could be taken from the scores.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpanError {
    /// start and end score vectors differ in length
    #[error("start scores cover {start} positions but end scores cover {end}")]
    LengthMismatch {
        /// start vector length
        start: usize,
        /// end vector length
        end: usize,
    },

    /// The context segment has no positions
    #[error("context segment is empty")]
    EmptyContext,

    /// The chosen end precedes the chosen start
    #[error("answer end {end} precedes start {start}")]
    Inverted {
        /// start position
        start: usize,
        /// end position
        end: usize,
    },

    /// The span reaches past the sequence
    #[error("answer end {end} is outside a sequence of {len}")]
    OutOfRange {
        /// end position
        end: usize,
        /// sequence length
        len: usize,
    },

    /// No finite score pair satisfies the constraints
    #[error("no valid answer span")]
    NoValidSpan,
}

impl AnswerSpan {
    /// `start..=end`; fails if `end < start`.
    pub fn new(start: usize, end: usize) -> Result<Self, SpanError> {
        if end < start {
            return Err(SpanError::Inverted { start, end });
        }
        Ok(Self { start, end })
    }

    /// First answer position.
    pub fn start(&self) -> usize {
        self.start
    }

    /// Last answer position, inclusive.
    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of positions covered.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Never true; a span covers at least one position.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The ids inside the span.
    pub fn ids<'a>(&self, ids: &'a [u32]) -> Result<&'a [u32], SpanError> {
        ids.get(self.start..=self.end)
            .ok_or(SpanError::OutOfRange { end: self.end, len: ids.len() })
    }
}

/// Index of the highest finite score; the first one on ties.
pub fn argmax(scores: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &s) in scores.iter().enumerate() {
        if !s.is_finite() {
            continue;
        }
        match best {
            Some((_, b)) if s <= b => {}
            _ => best = Some((i, s)),
        }
    }
    best.map(|(i, _)| i)
}

/// Start and end chosen independently by argmax, without positional constraints.
pub fn independent_span(start: &[f32], end: &[f32]) -> Result<AnswerSpan, SpanError> {
    check_lengths(start, end)?;
    let s = argmax(start).ok_or(SpanError::NoValidSpan)?;
    let e = argmax(end).ok_or(SpanError::NoValidSpan)?;
    AnswerSpan::new(s, e)
}

/// Highest `start[i] + end[j]` with `i <= j`, both inside `context`, and at
/// most `max_answer_len` positions. Returns the span and its score.
pub fn best_span(
    start: &[f32],
    end: &[f32],
    context: Range<usize>,
    max_answer_len: usize,
) -> Result<(AnswerSpan, f32), SpanError> {
    check_lengths(start, end)?;
    let context = context.start..context.end.min(start.len());
    if context.is_empty() {
        return Err(SpanError::EmptyContext);
    }

    let mut best: Option<(AnswerSpan, f32)> = None;
    for (i, &s) in start.iter().enumerate().take(context.end).skip(context.start) {
        if !s.is_finite() {
            continue;
        }
        let last = context.end.min(i.saturating_add(max_answer_len));
        let Some(ends) = end.get(i..last) else { continue };
        for (offset, &e) in ends.iter().enumerate() {
            let score = s + e;
            if !score.is_finite() {
                continue;
            }
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((AnswerSpan { start: i, end: i + offset }, score));
            }
        }
    }
    best.ok_or(SpanError::NoValidSpan)
}

fn check_lengths(start: &[f32], end: &[f32]) -> Result<(), SpanError> {
    if start.len() != end.len() {
        return Err(SpanError::LengthMismatch { start: start.len(), end: end.len() });
    }
    Ok(())
}
