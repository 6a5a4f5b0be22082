//! Immutable bidirectional token/id table.
//!
//! Built once, validated at construction (dense unique ids, reserved markers
//! present) and read-only afterwards. Share it behind an `Arc`.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{TokenizerError, VocabularyLoadError};
use crate::normalize::Normalization;

/// Marker prepended to every sequence
pub const CLS_TOKEN: &str = "[CLS]";
/// Marker closing each segment
pub const SEP_TOKEN: &str = "[SEP]";
/// Substitute for words that cannot be segmented
pub const UNK_TOKEN: &str = "[UNK]";
/// Padding marker, optional in a vocabulary
pub const PAD_TOKEN: &str = "[PAD]";
/// Prefix marking a piece that continues the previous one
pub const CONTINUATION_PREFIX: &str = "##";
/// Words longer than this many characters are not segmented
pub const DEFAULT_MAX_INPUT_CHARS_PER_WORD: usize = 100;

/// Conventions a vocabulary was built with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    /// text normalization applied before segmentation
    pub normalization: Normalization,
    /// prefix of non-initial pieces
    pub continuation_prefix: String,
    /// unknown-word marker
    pub unk_token: String,
    /// sequence-start marker
    pub cls_token: String,
    /// segment separator marker
    pub sep_token: String,
    /// padding marker (may be absent from the vocabulary)
    pub pad_token: String,
    /// longer words collapse to the unknown marker without segmentation
    pub max_input_chars_per_word: usize,
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            normalization: Normalization::default(),
            continuation_prefix: CONTINUATION_PREFIX.to_string(),
            unk_token: UNK_TOKEN.to_string(),
            cls_token: CLS_TOKEN.to_string(),
            sep_token: SEP_TOKEN.to_string(),
            pad_token: PAD_TOKEN.to_string(),
            max_input_chars_per_word: DEFAULT_MAX_INPUT_CHARS_PER_WORD,
        }
    }
}

/// Ids of the reserved markers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SpecialIds {
    /// `[CLS]`
    pub cls: u32,
    /// `[SEP]`
    pub sep: u32,
    /// `[UNK]`
    pub unk: u32,
    /// `[PAD]`, when the vocabulary has one
    pub pad: Option<u32>,
}

/// Validated WordPiece vocabulary.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    tokens: Vec<String>,
    ids: HashMap<String, u32>,
    special: SpecialIds,
    config: VocabularyConfig,
    longest_piece: usize,
}

impl Vocabulary {
    /// Build from `(token, id)` pairs in any order.
    ///
    /// Fails when ids repeat, leave gaps in `[0, len)`, a token repeats, or a
    /// required marker (`[CLS]`, `[SEP]`, `[UNK]` as named by `config`) is missing.
    pub fn from_entries<I, S>(entries: I, config: VocabularyConfig) -> Result<Self, VocabularyLoadError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut pairs: Vec<(u32, String)> = entries.into_iter().map(|(t, id)| (id, t.into())).collect();
        if pairs.is_empty() {
            return Err(VocabularyLoadError::Empty);
        }
        if u32::try_from(pairs.len()).is_err() {
            return Err(VocabularyLoadError::TooLarge);
        }
        pairs.sort_by_key(|(id, _)| *id);

        let size = pairs.len();
        let mut tokens: Vec<String> = Vec::with_capacity(size);
        let mut ids: HashMap<String, u32> = HashMap::with_capacity(size);
        for (expected, (id, token)) in (0u32..).zip(pairs) {
            if id != expected {
                // sorted input: a repeat shows up as the previous id again
                if let Some(prev) = expected.checked_sub(1).filter(|p| *p == id) {
                    let first = tokens.last().cloned().unwrap_or_default();
                    return Err(VocabularyLoadError::DuplicateId { id: prev, first, second: token });
                }
                return Err(VocabularyLoadError::NonContiguous { missing: expected, size });
            }
            if let Some(first) = ids.insert(token.clone(), id) {
                return Err(VocabularyLoadError::DuplicateToken { token, first, second: id });
            }
            tokens.push(token);
        }

        let required = |name: &str| {
            ids.get(name)
                .copied()
                .ok_or_else(|| VocabularyLoadError::MissingMarker(name.to_string()))
        };
        let special = SpecialIds {
            cls: required(&config.cls_token)?,
            sep: required(&config.sep_token)?,
            unk: required(&config.unk_token)?,
            pad: ids.get(&config.pad_token).copied(),
        };

        let longest_piece = tokens.iter().map(|t| t.chars().count()).max().unwrap_or(0);

        tracing::info!(
            tokens = tokens.len(),
            longest_piece,
            lowercase = config.normalization.lowercase,
            strip_accents = config.normalization.strips_accents(),
            "vocabulary loaded"
        );

        Ok(Self { tokens, ids, special, config, longest_piece })
    }

    /// Build from tokens whose id is their position (BERT `vocab.txt` order).
    pub fn from_ordered_tokens<I, S>(tokens: I, config: VocabularyConfig) -> Result<Self, VocabularyLoadError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut entries = Vec::new();
        for (i, token) in tokens.into_iter().enumerate() {
            let id = u32::try_from(i).map_err(|_| VocabularyLoadError::TooLarge)?;
            entries.push((token.into(), id));
        }
        Self::from_entries(entries, config)
    }

    /// Parse a `vocab.txt`: one token per line, id = zero-based line number.
    ///
    /// Trailing `\r` is dropped; a final empty line is ignored.
    pub fn from_vocab_txt(text: &str, config: VocabularyConfig) -> Result<Self, VocabularyLoadError> {
        let text = text.strip_suffix('\n').unwrap_or(text);
        Self::from_ordered_tokens(text.split('\n').map(|l| l.strip_suffix('\r').unwrap_or(l)), config)
    }

    /// Parse a flat JSON object mapping token to id (`vocab.json`).
    pub fn from_json(text: &str, config: VocabularyConfig) -> Result<Self, VocabularyLoadError> {
        let map: HashMap<String, u32> = serde_json::from_str(text)?;
        Self::from_entries(map, config)
    }

    /// Parse a Hugging Face `tokenizer.json` holding a WordPiece model.
    ///
    /// The file's declared normalizer, unknown token, continuation prefix and
    /// word length limit replace the corresponding fields of `config`.
    pub fn from_tokenizer_json(text: &str, config: VocabularyConfig) -> Result<Self, VocabularyLoadError> {
        let file: TokenizerFile = serde_json::from_str(text)?;
        let config = file.apply_to(config)?;
        let mut vocab = file.model.vocab;
        for added in file.added_tokens {
            vocab.entry(added.content).or_insert(added.id);
        }
        Self::from_entries(vocab, config)
    }

    /// Load from disk, choosing the format from the extension and JSON shape.
    pub fn from_file(path: impl AsRef<Path>, config: VocabularyConfig) -> Result<Self, VocabularyLoadError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        tracing::debug!(path = %path.display(), bytes = text.len(), "reading vocabulary");
        let is_txt = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("txt"));
        if is_txt {
            return Self::from_vocab_txt(&text, config);
        }
        let value: serde_json::Value = serde_json::from_str(&text)?;
        if value.get("model").is_some() {
            Self::from_tokenizer_json(&text, config)
        } else {
            let map: HashMap<String, u32> = serde_json::from_value(value)?;
            Self::from_entries(map, config)
        }
    }

    /// Id of an exact token string.
    pub fn id_for(&self, token: &str) -> Option<u32> {
        self.ids.get(token).copied()
    }

    /// Id of `token`, or the `[UNK]` id when absent.
    pub fn id_or_unk(&self, token: &str) -> u32 {
        self.id_for(token).unwrap_or(self.special.unk)
    }

    /// Token string for `id`.
    pub fn token_for(&self, id: u32) -> Result<&str, TokenizerError> {
        usize::try_from(id)
            .ok()
            .and_then(|i| self.tokens.get(i))
            .map(String::as_str)
            .ok_or(TokenizerError::InvalidId { id, size: self.tokens.len() })
    }

    /// Whether `token` is an entry.
    pub fn contains(&self, token: &str) -> bool {
        self.ids.contains_key(token)
    }

    /// Number of tokens; valid ids are `0..len()`.
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Always false for a constructed vocabulary.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Ids of the reserved markers.
    pub fn special(&self) -> SpecialIds {
        self.special
    }

    /// `[CLS]`, `[SEP]` and `[PAD]` carry structure, not content.
    pub fn is_framing(&self, id: u32) -> bool {
        id == self.special.cls || id == self.special.sep || Some(id) == self.special.pad
    }

    /// Token string is exactly one of the reserved markers, `[UNK]` included.
    pub fn is_reserved_marker(&self, token: &str) -> bool {
        let c = &self.config;
        token == c.cls_token || token == c.sep_token || token == c.unk_token || token == c.pad_token
    }

    /// Conventions this vocabulary was loaded with.
    pub fn config(&self) -> &VocabularyConfig {
        &self.config
    }

    /// Declared normalization.
    pub fn normalization(&self) -> &Normalization {
        &self.config.normalization
    }

    /// Continuation prefix, `##` by default.
    pub fn continuation_prefix(&self) -> &str {
        &self.config.continuation_prefix
    }

    /// Character length of the longest entry. No match can span more characters.
    pub(crate) fn longest_piece(&self) -> usize {
        self.longest_piece
    }
}

#[derive(Deserialize)]
struct TokenizerFile {
    model: ModelSection,
    #[serde(default)]
    normalizer: Option<NormalizerSection>,
    #[serde(default)]
    added_tokens: Vec<AddedToken>,
}

#[derive(Deserialize)]
struct ModelSection {
    #[serde(rename = "type", default)]
    kind: Option<String>,
    vocab: HashMap<String, u32>,
    #[serde(default)]
    unk_token: Option<String>,
    #[serde(default)]
    continuing_subword_prefix: Option<String>,
    #[serde(default)]
    max_input_chars_per_word: Option<usize>,
}

#[derive(Deserialize)]
struct NormalizerSection {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    clean_text: Option<bool>,
    #[serde(default)]
    handle_chinese_chars: Option<bool>,
    #[serde(default)]
    strip_accents: Option<bool>,
    #[serde(default)]
    lowercase: Option<bool>,
}

#[derive(Deserialize)]
struct AddedToken {
    id: u32,
    content: String,
}

impl TokenizerFile {
    fn apply_to(&self, mut config: VocabularyConfig) -> Result<VocabularyConfig, VocabularyLoadError> {
        if let Some(kind) = self.model.kind.as_deref() {
            if kind != "WordPiece" {
                return Err(VocabularyLoadError::UnsupportedModel(kind.to_string()));
            }
        }
        if let Some(unk) = &self.model.unk_token {
            config.unk_token = unk.clone();
        }
        if let Some(prefix) = &self.model.continuing_subword_prefix {
            config.continuation_prefix = prefix.clone();
        }
        if let Some(max) = self.model.max_input_chars_per_word {
            config.max_input_chars_per_word = max;
        }
        match &self.normalizer {
            Some(n) if n.kind == "BertNormalizer" => {
                let d = Normalization::default();
                config.normalization = Normalization {
                    clean_text: n.clean_text.unwrap_or(d.clean_text),
                    lowercase: n.lowercase.unwrap_or(d.lowercase),
                    strip_accents: n.strip_accents,
                    split_punctuation: config.normalization.split_punctuation,
                    split_cjk: n.handle_chinese_chars.unwrap_or(d.split_cjk),
                };
            }
            Some(n) if n.kind == "Lowercase" => config.normalization.lowercase = true,
            Some(n) => {
                tracing::warn!(normalizer = %n.kind, "unrecognised normalizer, keeping configured normalization");
            }
            None => {}
        }
        Ok(config)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    fn base() -> Vec<&'static str> {
        vec!["[PAD]", "[UNK]", "[CLS]", "[SEP]", "play", "##ing"]
    }

    #[test]
    fn ordered_tokens_get_positional_ids() {
        let v = Vocabulary::from_ordered_tokens(base(), VocabularyConfig::default()).unwrap();
        assert_eq!(v.len(), 6);
        assert_eq!(v.id_for("play"), Some(4));
        assert_eq!(v.token_for(5).unwrap(), "##ing");
        assert_eq!(
            v.special(),
            SpecialIds { cls: 2, sep: 3, unk: 1, pad: Some(0) }
        );
    }

    #[test]
    fn absent_token_maps_to_unk() {
        let v = Vocabulary::from_ordered_tokens(base(), VocabularyConfig::default()).unwrap();
        assert_eq!(v.id_for("chess"), None);
        assert_eq!(v.id_or_unk("chess"), 1);
    }

    #[test]
    fn out_of_range_id_is_invalid() {
        let v = Vocabulary::from_ordered_tokens(base(), VocabularyConfig::default()).unwrap();
        assert!(matches!(
            v.token_for(6),
            Err(TokenizerError::InvalidId { id: 6, size: 6 })
        ));
        assert!(matches!(v.token_for(u32::MAX), Err(TokenizerError::InvalidId { .. })));
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let entries = vec![("[UNK]", 0), ("[CLS]", 1), ("[SEP]", 2), ("a", 2)];
        let err = Vocabulary::from_entries(entries, VocabularyConfig::default()).unwrap_err();
        assert!(matches!(err, VocabularyLoadError::DuplicateId { id: 2, .. }));
    }

    #[test]
    fn gap_in_ids_is_rejected() {
        let entries = vec![("[UNK]", 0), ("[CLS]", 1), ("[SEP]", 3)];
        let err = Vocabulary::from_entries(entries, VocabularyConfig::default()).unwrap_err();
        assert!(matches!(err, VocabularyLoadError::NonContiguous { missing: 2, size: 3 }));
    }

    #[test]
    fn duplicate_token_is_rejected() {
        let err = Vocabulary::from_ordered_tokens(
            vec!["[UNK]", "[CLS]", "[SEP]", "a", "a"],
            VocabularyConfig::default(),
        )
        .unwrap_err();
        assert!(matches!(err, VocabularyLoadError::DuplicateToken { first: 3, second: 4, .. }));
    }

    #[test]
    fn missing_marker_is_rejected() {
        let err = Vocabulary::from_ordered_tokens(vec!["[UNK]", "[CLS]", "a"], VocabularyConfig::default())
            .unwrap_err();
        assert!(matches!(err, VocabularyLoadError::MissingMarker(ref m) if m == "[SEP]"));
    }

    #[test]
    fn empty_source_is_rejected() {
        let err = Vocabulary::from_ordered_tokens(Vec::<String>::new(), VocabularyConfig::default()).unwrap_err();
        assert!(matches!(err, VocabularyLoadError::Empty));
    }

    #[test]
    fn pad_is_optional() {
        let v = Vocabulary::from_ordered_tokens(vec!["[UNK]", "[CLS]", "[SEP]"], VocabularyConfig::default())
            .unwrap();
        assert_eq!(v.special().pad, None);
        assert!(v.is_framing(1));
        assert!(!v.is_framing(0));
    }

    #[test]
    fn vocab_txt_handles_crlf_and_trailing_newline() {
        let v = Vocabulary::from_vocab_txt("[UNK]\r\n[CLS]\r\n[SEP]\r\nrun\n", VocabularyConfig::default()).unwrap();
        assert_eq!(v.len(), 4);
        assert_eq!(v.id_for("run"), Some(3));
    }

    #[test]
    fn flat_json_map_loads() {
        let v = Vocabulary::from_json(
            r###"{"[SEP]": 2, "[UNK]": 0, "[CLS]": 1, "un": 3, "##able": 4}"###,
            VocabularyConfig::default(),
        )
        .unwrap();
        assert_eq!(v.token_for(4).unwrap(), "##able");
        assert_eq!(v.longest_piece(), 6);
    }

    #[test]
    fn tokenizer_json_declares_normalization() {
        let text = r###"{
            "added_tokens": [{"id": 3, "content": "[SEP]"}],
            "normalizer": {"type": "BertNormalizer", "clean_text": true,
                           "handle_chinese_chars": true, "strip_accents": null, "lowercase": false},
            "model": {"type": "WordPiece", "unk_token": "[UNK]",
                      "continuing_subword_prefix": "##", "max_input_chars_per_word": 50,
                      "vocab": {"[PAD]": 0, "[UNK]": 1, "[CLS]": 2, "Play": 4}}
        }"###;
        let v = Vocabulary::from_tokenizer_json(text, VocabularyConfig::default()).unwrap();
        assert_eq!(v.id_for("[SEP]"), Some(3));
        assert!(!v.normalization().lowercase);
        assert!(!v.normalization().strips_accents());
        assert_eq!(v.config().max_input_chars_per_word, 50);
    }

    #[test]
    fn tokenizer_json_rejects_other_models() {
        let text = r#"{"model": {"type": "BPE", "vocab": {"a": 0}}}"#;
        let err = Vocabulary::from_tokenizer_json(text, VocabularyConfig::default()).unwrap_err();
        assert!(matches!(err, VocabularyLoadError::UnsupportedModel(ref m) if m == "BPE"));
    }

    #[test]
    fn malformed_json_is_a_load_error() {
        let err = Vocabulary::from_json("{not json", VocabularyConfig::default()).unwrap_err();
        assert!(matches!(err, VocabularyLoadError::Json(_)));
    }

    #[test]
    fn custom_marker_names_are_honoured() {
        let config = VocabularyConfig {
            unk_token: "<unk>".into(),
            cls_token: "<s>".into(),
            sep_token: "</s>".into(),
            ..VocabularyConfig::default()
        };
        let v = Vocabulary::from_ordered_tokens(vec!["<unk>", "<s>", "</s>"], config).unwrap();
        assert_eq!(v.special().unk, 0);
        assert!(v.is_reserved_marker("</s>"));
        assert!(!v.is_reserved_marker("[SEP]"));
    }
}
