//! Text normalization and word splitting ahead of subword segmentation.
//!
//! The rules are a property of the vocabulary: an uncased vocabulary was built
//! from lower-cased, accent-stripped text and must be fed the same. The
//! [`Normalization`] value travels with the [`crate::Vocabulary`] for that reason.

use serde::{Deserialize, Serialize};
use unicode_general_category::{get_general_category, GeneralCategory};
use unicode_normalization::UnicodeNormalization;

/// Declared normalization convention of a vocabulary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Normalization {
    /// drop control characters and map all whitespace to a plain space
    pub clean_text: bool,
    /// fold to lower case
    pub lowercase: bool,
    /// strip accents; `None` follows `lowercase`
    pub strip_accents: Option<bool>,
    /// split punctuation characters into standalone words
    pub split_punctuation: bool,
    /// surround CJK ideographs with spaces so each becomes a word
    pub split_cjk: bool,
}

impl Default for Normalization {
    /// Uncased BERT convention.
    fn default() -> Self {
        Self {
            clean_text: true,
            lowercase: true,
            strip_accents: None,
            split_punctuation: true,
            split_cjk: true,
        }
    }
}

impl Normalization {
    /// Cased BERT convention: same splitting, no case or accent folding.
    pub fn cased() -> Self {
        Self {
            lowercase: false,
            ..Self::default()
        }
    }

    /// Whether accents are stripped once `strip_accents` is resolved.
    pub fn strips_accents(&self) -> bool {
        self.strip_accents.unwrap_or(self.lowercase)
    }

    /// Split `text` into normalized words.
    ///
    /// A whitespace-delimited chunk for which `keep` returns true is passed
    /// through untouched (used for reserved markers typed into the text).
    /// Never returns an empty word.
    pub fn split_words(&self, text: &str, keep: impl Fn(&str) -> bool) -> Vec<String> {
        let mut staged = String::with_capacity(text.len());
        for c in text.chars() {
            if self.clean_text {
                if c == '\0' || c == '\u{FFFD}' || is_control(c) {
                    continue;
                }
                if c.is_whitespace() {
                    staged.push(' ');
                    continue;
                }
            }
            if self.split_cjk && is_cjk(c) {
                staged.push(' ');
                staged.push(c);
                staged.push(' ');
            } else {
                staged.push(c);
            }
        }

        let mut words = Vec::new();
        for chunk in staged.split_whitespace() {
            if keep(chunk) {
                words.push(chunk.to_string());
                continue;
            }
            let folded = self.fold(chunk);
            if self.split_punctuation {
                split_on_punctuation(&folded, &mut words);
            } else if !folded.is_empty() {
                words.push(folded);
            }
        }
        words
    }

    fn fold(&self, chunk: &str) -> String {
        let lowered = if self.lowercase {
            chunk.to_lowercase()
        } else {
            chunk.to_string()
        };
        if self.strips_accents() {
            lowered.nfd().filter(|c| !is_accent(*c)).collect()
        } else {
            lowered
        }
    }
}

fn split_on_punctuation(chunk: &str, words: &mut Vec<String>) {
    let mut current = String::new();
    for c in chunk.chars() {
        if is_punctuation(c) {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            words.push(c.to_string());
        } else {
            current.push(c);
        }
    }
    if !current.is_empty() {
        words.push(current);
    }
}

/// General category C (control, format, unassigned, private use). Tab,
/// newline and carriage return count as whitespace instead.
fn is_control(c: char) -> bool {
    if matches!(c, '\t' | '\n' | '\r') {
        return false;
    }
    matches!(
        get_general_category(c),
        GeneralCategory::Control
            | GeneralCategory::Format
            | GeneralCategory::Unassigned
            | GeneralCategory::PrivateUse
            | GeneralCategory::Surrogate
    )
}

/// ASCII symbols are all treated as punctuation (`$`, `^`, `` ` `` included),
/// plus every character in general category P.
pub(crate) fn is_punctuation(c: char) -> bool {
    if c.is_ascii() {
        return c.is_ascii_punctuation();
    }
    matches!(
        get_general_category(c),
        GeneralCategory::ConnectorPunctuation
            | GeneralCategory::DashPunctuation
            | GeneralCategory::OpenPunctuation
            | GeneralCategory::ClosePunctuation
            | GeneralCategory::InitialPunctuation
            | GeneralCategory::FinalPunctuation
            | GeneralCategory::OtherPunctuation
    )
}

/// Only nonspacing marks (Mn) count as accents; spacing vowel signs stay.
fn is_accent(c: char) -> bool {
    matches!(get_general_category(c), GeneralCategory::NonspacingMark)
}

/// CJK Unified Ideographs and their extension and compatibility blocks.
/// Hangul, Hiragana and Katakana are written with spaces and are not included.
fn is_cjk(c: char) -> bool {
    matches!(
        c,
        '\u{4E00}'..='\u{9FFF}'
            | '\u{3400}'..='\u{4DBF}'
            | '\u{20000}'..='\u{2A6DF}'
            | '\u{2A700}'..='\u{2B73F}'
            | '\u{2B740}'..='\u{2B81F}'
            | '\u{2B820}'..='\u{2CEAF}'
            | '\u{F900}'..='\u{FAFF}'
            | '\u{2F800}'..='\u{2FA1F}'
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn words(n: &Normalization, text: &str) -> Vec<String> {
        n.split_words(text, |_| false)
    }

    #[test]
    fn uncased_folds_case_and_splits_punctuation() {
        let n = Normalization::default();
        assert_eq!(words(&n, "Hello, World!"), vec!["hello", ",", "world", "!"]);
    }

    #[test]
    fn whitespace_runs_collapse() {
        let n = Normalization::default();
        assert_eq!(words(&n, "  a \t\n  b   "), vec!["a", "b"]);
        assert!(words(&n, "   \n\t ").is_empty());
        assert!(words(&n, "").is_empty());
    }

    #[test]
    fn accents_are_stripped_when_uncased() {
        let n = Normalization::default();
        assert_eq!(words(&n, "Café naïve"), vec!["cafe", "naive"]);
    }

    #[test]
    fn cased_keeps_case_and_accents() {
        let n = Normalization::cased();
        assert_eq!(words(&n, "Café Noir"), vec!["Café", "Noir"]);
    }

    #[test]
    fn explicit_accent_flag_overrides_lowercase() {
        let n = Normalization {
            strip_accents: Some(false),
            ..Normalization::default()
        };
        assert_eq!(words(&n, "Café"), vec!["café"]);
    }

    #[test]
    fn control_characters_are_dropped() {
        let n = Normalization::default();
        assert_eq!(words(&n, "ab\u{0}c\u{200B}d\u{FFFD}"), vec!["abcd"]);
    }

    #[test]
    fn cjk_ideographs_become_single_words() {
        let n = Normalization::default();
        assert_eq!(words(&n, "ab中文cd"), vec!["ab", "中", "文", "cd"]);
    }

    #[test]
    fn kept_chunks_bypass_folding() {
        let n = Normalization::default();
        let out = n.split_words("What? [SEP] Yes", |w| w == "[SEP]");
        assert_eq!(out, vec!["what", "?", "[SEP]", "yes"]);
    }

    #[test]
    fn punctuation_split_can_be_disabled() {
        let n = Normalization {
            split_punctuation: false,
            ..Normalization::default()
        };
        assert_eq!(words(&n, "don't stop."), vec!["don't", "stop."]);
    }

    #[test]
    fn unicode_punctuation_is_recognised() {
        assert!(is_punctuation('“'));
        assert!(is_punctuation('—'));
        assert!(is_punctuation('¿'));
        assert!(is_punctuation('。'));
        assert!(!is_punctuation('é'));
        assert!(!is_punctuation('7'));
        // Hebrew sof pasuq, Devanagari abbreviation sign, Ethiopic and Khmer stops
        for c in ['\u{05C3}', '\u{05F3}', '\u{0970}', '\u{1361}', '\u{1368}', '\u{17D4}', '\u{17D6}'] {
            assert!(is_punctuation(c), "{c:?}");
        }
    }

    #[test]
    fn other_category_punctuation_splits_words() {
        let n = Normalization::cased();
        assert_eq!(words(&n, "\u{05E9}\u{05C3}"), vec!["\u{05E9}", "\u{05C3}"]);
    }

    #[test]
    fn spacing_vowel_signs_survive_accent_stripping() {
        let n = Normalization::default();
        // KA + AA: the vowel sign is a spacing mark, not an accent
        assert_eq!(words(&n, "\u{0915}\u{093E}"), vec!["\u{0915}\u{093E}"]);
        // combining acute is nonspacing and goes
        assert_eq!(words(&n, "e\u{0301}"), vec!["e"]);
    }

    #[test]
    fn private_use_and_tag_characters_are_dropped() {
        let n = Normalization::default();
        assert_eq!(words(&n, "ab\u{E000}c"), vec!["abc"]);
        assert_eq!(words(&n, "x\u{E0041}y\u{E007F}"), vec!["xy"]);
        assert!(is_control('\u{E0020}'));
        assert!(!is_control('\t'));
    }
}
