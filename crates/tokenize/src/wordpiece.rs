//! Greedy longest-match segmentation of one normalized word.

use crate::vocab::Vocabulary;

/// Append the piece ids of `word` to `out`.
///
/// At each position the longest remaining prefix found in the vocabulary wins;
/// every piece after the first is looked up with the continuation prefix.
/// If some position has no match at all, whatever this word already pushed is
/// discarded and a single `[UNK]` stands for the whole word. Returns false in
/// that case.
pub(crate) fn segment_word(vocab: &Vocabulary, word: &str, out: &mut Vec<u32>) -> bool {
    let unk = vocab.special().unk;
    // byte offset of every char boundary, end of word included
    let bounds: Vec<usize> = word
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(word.len()))
        .collect();
    let n_chars = bounds.len().saturating_sub(1);
    if n_chars == 0 {
        return true;
    }
    if n_chars > vocab.config().max_input_chars_per_word {
        out.push(unk);
        return false;
    }

    let prefix = vocab.continuation_prefix();
    let window = vocab.longest_piece();
    let mark = out.len();
    let mut candidate = String::with_capacity(prefix.len() + word.len());
    let mut start = 0usize;
    while start < n_chars {
        let mut end = n_chars.min(start.saturating_add(window));
        let mut matched = None;
        while end > start {
            candidate.clear();
            if start > 0 {
                candidate.push_str(prefix);
            }
            candidate.push_str(slice_chars(word, &bounds, start, end));
            if let Some(id) = vocab.id_for(&candidate) {
                matched = Some(id);
                break;
            }
            end -= 1;
        }
        match matched {
            Some(id) => {
                out.push(id);
                start = end;
            }
            None => {
                out.truncate(mark);
                out.push(unk);
                return false;
            }
        }
    }
    true
}

fn slice_chars<'a>(word: &'a str, bounds: &[usize], start: usize, end: usize) -> &'a str {
    match (bounds.get(start), bounds.get(end)) {
        (Some(&a), Some(&b)) => word.get(a..b).unwrap_or(""),
        _ => "",
    }
}
