use serde::{Deserialize, Serialize};

/// A bounded segment of a file plus derived metadata
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Chunk {
    /// Chunk text, possibly prefixed with a synthesized definition summary
    pub text: String,

    pub metadata: ChunkMetadata,
}

impl Chunk {
    #[must_use]
    pub const fn new(text: String, metadata: ChunkMetadata) -> Self {
        Self { text, metadata }
    }

    /// Number of lines this chunk covers in the source file
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.metadata.line_end.saturating_sub(self.metadata.line_start) + 1
    }

    /// Check if chunk contains a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.metadata.line_start && line <= self.metadata.line_end
    }
}

/// Metadata attached to every chunk
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChunkMetadata {
    /// Absolute source path; the key used for per-file deletion
    pub file: String,

    pub file_name: String,

    /// Lower-case extension without the dot, or empty
    pub file_type: String,

    /// Registry language name (`text` for the generic splitter)
    pub language: String,

    /// Ordinal within the file for one chunking pass
    pub chunk_id: usize,

    pub total_chunks: usize,

    /// SHA-256 hex of the chunk text as split (before enhancement)
    pub content_hash: String,

    /// Start line (1-indexed)
    pub line_start: usize,

    /// End line (1-indexed, inclusive)
    pub line_end: usize,

    pub has_error_handling: bool,
    pub has_logging: bool,
    pub has_todo: bool,
    pub has_fixme: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_type: Option<DefinitionKind>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub definition_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_docstring: Option<bool>,
}

/// Kind of top-level definition recognised by the enhancement layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DefinitionKind {
    Function,
    Class,
    Struct,
    Enum,
    Trait,
    Interface,
}

impl DefinitionKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Function => "function",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Enum => "enum",
            Self::Trait => "trait",
            Self::Interface => "interface",
        }
    }

    /// Function-like definitions populate `function_name`, the rest `class_name`
    pub const fn is_function(self) -> bool {
        matches!(self, Self::Function)
    }
}

impl std::fmt::Display for DefinitionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Totals over a set of chunks
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkStats {
    pub total_chunks: usize,
    pub total_lines: usize,
    pub total_chars: usize,
    pub avg_chars: usize,
    pub min_chars: usize,
    pub max_chars: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(start: usize, end: usize) -> Chunk {
        Chunk::new(
            "body".to_string(),
            ChunkMetadata {
                line_start: start,
                line_end: end,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_line_count_and_contains() {
        let c = chunk(3, 7);
        assert_eq!(c.line_count(), 5);
        assert!(c.contains_line(3));
        assert!(c.contains_line(7));
        assert!(!c.contains_line(8));
    }

    #[test]
    fn test_optional_fields_are_omitted() {
        let json = serde_json::to_value(chunk(1, 1).metadata).unwrap();
        assert!(json.get("function_name").is_none());
        assert_eq!(json["file"], "");
        assert_eq!(json["has_todo"], false);
    }

    #[test]
    fn test_definition_kind_serializes_lowercase() {
        let json = serde_json::to_string(&DefinitionKind::Struct).unwrap();
        assert_eq!(json, "\"struct\"");
        assert!(DefinitionKind::Function.is_function());
        assert!(!DefinitionKind::Class.is_function());
    }
}
