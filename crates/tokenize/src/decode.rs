//! Joining pieces back into text.

use serde::{Deserialize, Serialize};

/// Switches for [`crate::Tokenizer::decode_with`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DecodeOptions {
    /// omit `[CLS]`, `[SEP]` and `[PAD]` from the output
    pub skip_framing: bool,
    /// tighten spaces before punctuation and English contractions
    pub clean_up_spaces: bool,
}

impl Default for DecodeOptions {
    fn default() -> Self {
        Self {
            skip_framing: true,
            clean_up_spaces: false,
        }
    }
}

/// Join pieces left to right.
///
/// A piece starting with `prefix` is glued to the previous output with the
/// prefix removed; any other piece gets one separating space. The first piece
/// never gets a leading space, continuation or not.
pub fn join_pieces<'a, I>(pieces: I, prefix: &str) -> String
where
    I: IntoIterator<Item = &'a str>,
{
    let mut out = String::new();
    for piece in pieces {
        match piece.strip_prefix(prefix).filter(|_| !prefix.is_empty()) {
            Some(rest) => out.push_str(rest),
            None => {
                if !out.is_empty() {
                    out.push(' ');
                }
                out.push_str(piece);
            }
        }
    }
    out
}

/// Remove the space a word-level join leaves before punctuation and contractions.
pub fn clean_up_spaces(text: &str) -> String {
    const RULES: [(&str, &str); 10] = [
        (" .", "."),
        (" ?", "?"),
        (" !", "!"),
        (" ,", ","),
        (" ' ", "'"),
        (" n't", "n't"),
        (" 'm", "'m"),
        (" 's", "'s"),
        (" 've", "'ve"),
        (" 're", "'re"),
    ];
    let mut out = text.to_string();
    for (from, to) in RULES {
        if out.contains(from) {
            out = out.replace(from, to);
        }
    }
    out
}
