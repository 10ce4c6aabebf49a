use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for chunk sizing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkerConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,

    /// Characters shared between consecutive chunks (must be < `chunk_size`)
    pub chunk_overlap: usize,

    /// Attach definition metadata and docstring summaries where a syntax tree is available
    pub enhance_definitions: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
            enhance_definitions: true,
        }
    }
}

impl ChunkerConfig {
    /// Create config with the given size/overlap and enhancement enabled
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Self {
        Self {
            chunk_size,
            chunk_overlap,
            ..Default::default()
        }
    }

    /// Builder: toggle the definition enhancement layer
    #[must_use]
    pub const fn with_enhancement(mut self, enabled: bool) -> Self {
        self.enhance_definitions = enabled;
        self
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(ChunkerError::invalid_config("chunk_size must be > 0"));
        }

        if self.chunk_overlap >= self.chunk_size {
            return Err(ChunkerError::invalid_config(format!(
                "chunk_overlap ({}) must be smaller than chunk_size ({})",
                self.chunk_overlap, self.chunk_size
            )));
        }

        Ok(())
    }
}
