use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

/// Setup-phase and loop-wide failures. Per-file problems are reported as
/// [`FileFailure`] instead.
#[derive(Error, Debug)]
pub enum IndexerError {
    /// Missing or invalid configuration; raised before any work starts
    #[error("Invalid configuration:{}", format_violations(.0))]
    Config(Vec<String>),

    /// Embedding provider unreachable at construction
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Chunker error: {0}")]
    ChunkerError(#[from] bugtrace_chunker::ChunkerError),

    #[error("Vector store error: {0}")]
    VectorStoreError(bugtrace_vector_store::VectorStoreError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Invalid project path: {0}")]
    InvalidPath(String),

    #[error("{0}")]
    Other(String),
}

impl IndexerError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(vec![message.into()])
    }

    /// True for the errors that must abort a run before any file is touched
    #[must_use]
    pub const fn is_setup_error(&self) -> bool {
        matches!(self, Self::Config(_) | Self::Connection(_))
    }
}

impl From<bugtrace_vector_store::VectorStoreError> for IndexerError {
    fn from(err: bugtrace_vector_store::VectorStoreError) -> Self {
        use bugtrace_vector_store::VectorStoreError;

        match err {
            VectorStoreError::Connection(message) => Self::Connection(message),
            VectorStoreError::Config(message) => Self::config(message),
            other => Self::VectorStoreError(other),
        }
    }
}

fn format_violations(violations: &[String]) -> String {
    violations
        .iter()
        .map(|v| format!("\n  • {v}"))
        .collect::<String>()
}

/// A file skipped during a scan or index run. It stays eligible for the next run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub path: PathBuf,
    pub reason: String,
}

impl FileFailure {
    pub fn new(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        Self {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl std::fmt::Display for FileFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.reason)
    }
}
