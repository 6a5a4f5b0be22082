//! JSON configuration file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokenize::{Tokenizer, VocabularyConfig, VocabularyLoadError};

use crate::answer::AnswerOptions;

/// Top-level configuration. Every field has a default, so `{}` is a valid file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QaConfig {
    /// vocabulary source: `vocab.txt`, `vocab.json` or `tokenizer.json`
    pub vocab_path: PathBuf,
    /// conventions of that vocabulary
    pub vocabulary: VocabularyConfig,
    /// span selection and decoding
    pub answer: AnswerOptions,
    /// HTTP front end
    pub server: ServerConfig,
}

impl Default for QaConfig {
    fn default() -> Self {
        Self {
            vocab_path: PathBuf::from("vocab.txt"),
            vocabulary: VocabularyConfig::default(),
            answer: AnswerOptions::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Bind address of `qa-server`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// interface to listen on
    pub host: String,
    /// TCP port
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3030,
        }
    }
}

impl ServerConfig {
    /// `host:port`
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Configuration file could not be used.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// file unreadable
    #[error("cannot read config {path}: {source}")]
    Io {
        /// file path
        path: PathBuf,
        /// underlying error
        source: std::io::Error,
    },

    /// file is not valid configuration JSON
    #[error("invalid config {path}: {source}")]
    Parse {
        /// file path
        path: PathBuf,
        /// underlying error
        source: serde_json::Error,
    },
}

impl QaConfig {
    /// Read a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Load the configured vocabulary into a tokenizer.
    ///
    /// Plain `decode` keeps the word-level join; `answer.clean_up_spaces`
    /// only applies to extracted answers.
    pub fn tokenizer(&self) -> Result<Tokenizer, VocabularyLoadError> {
        Tokenizer::from_file(&self.vocab_path, self.vocabulary.clone())
    }
}
