use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkerError>;

#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Chunk size or overlap out of range
    #[error("Invalid chunker configuration: {0}")]
    InvalidConfig(String),

    /// No tree-sitter grammar is registered for the language
    #[error("No structural analysis for language '{0}'")]
    UnsupportedLanguage(String),

    /// Grammar setup or parsing failed; the caller falls back to plain metadata
    #[error("Failed to parse {language} source: {reason}")]
    Parse { language: String, reason: String },

    #[error("Invalid separator pattern {pattern:?}: {reason}")]
    InvalidSeparator { pattern: String, reason: String },
}

impl ChunkerError {
    pub fn unsupported_language(language: impl Into<String>) -> Self {
        Self::UnsupportedLanguage(language.into())
    }

    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    pub fn parse(language: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Parse {
            language: language.into(),
            reason: reason.to_string(),
        }
    }
}
