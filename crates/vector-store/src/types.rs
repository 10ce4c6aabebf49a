use bugtrace_chunker::Chunk;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Scalar metadata value kept with a stored vector
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Text(String),
}

impl MetadataValue {
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Bool(_) => None,
        }
    }

    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            Self::Text(_) => None,
        }
    }
}

impl std::fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bool(value) => write!(f, "{value}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

pub type Metadata = BTreeMap<String, MetadataValue>;

/// Flatten chunk metadata: nulls and nested values are dropped, booleans kept,
/// everything else stringified.
pub fn project_metadata(chunk: &Chunk) -> Metadata {
    let mut out = Metadata::new();
    let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(&chunk.metadata) else {
        return out;
    };

    for (key, value) in fields {
        let projected = match value {
            serde_json::Value::Null
            | serde_json::Value::Array(_)
            | serde_json::Value::Object(_) => continue,
            serde_json::Value::Bool(flag) => MetadataValue::Bool(flag),
            serde_json::Value::String(text) => MetadataValue::Text(text),
            serde_json::Value::Number(number) => MetadataValue::Text(number.to_string()),
        };
        out.insert(key, projected);
    }
    out
}

/// Storage key for a chunk: SHA-256 of `"{file}_{chunk_id}"`
pub fn chunk_key(file: &str, chunk_id: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(format!("{file}_{chunk_id}").as_bytes());
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StoredVector {
    pub id: String,
    /// Insertion sequence, used to break distance ties
    pub seq: u64,
    pub vector: Vec<f32>,
    pub text: String,
    pub metadata: Metadata,
}

impl StoredVector {
    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.metadata.get("file").and_then(MetadataValue::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub text: String,
    pub metadata: Metadata,
    /// Cosine distance; lower is more relevant
    pub score: f32,
}

impl SearchResult {
    /// `1 - score`, or `None` when the distance is beyond the similarity range
    #[must_use]
    pub fn similarity(&self) -> Option<f32> {
        (self.score <= 1.0).then(|| 1.0 - self.score)
    }

    #[must_use]
    pub fn file(&self) -> Option<&str> {
        self.metadata.get("file").and_then(MetadataValue::as_str)
    }

    /// Metadata field as text, for display
    #[must_use]
    pub fn field(&self, key: &str) -> Option<String> {
        self.metadata.get(key).map(ToString::to_string)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    pub collection_name: String,
    pub total_chunks: usize,
    pub total_files: usize,
    pub index_dir: PathBuf,
}

#[cfg(test)]
mod tests {
    use super::*;
    use bugtrace_chunker::ChunkMetadata;
    use pretty_assertions::assert_eq;

    #[test]
    fn projection_keeps_bools_and_stringifies_numbers() {
        let chunk = Chunk::new(
            "body".to_string(),
            ChunkMetadata {
                file: "/p/a.py".to_string(),
                chunk_id: 2,
                line_start: 10,
                has_todo: true,
                function_name: Some("run".to_string()),
                ..Default::default()
            },
        );

        let meta = project_metadata(&chunk);
        assert_eq!(meta["file"], MetadataValue::Text("/p/a.py".to_string()));
        assert_eq!(meta["chunk_id"], MetadataValue::Text("2".to_string()));
        assert_eq!(meta["line_start"], MetadataValue::Text("10".to_string()));
        assert_eq!(meta["has_todo"], MetadataValue::Bool(true));
        assert_eq!(meta["function_name"], MetadataValue::Text("run".to_string()));
        assert!(!meta.contains_key("class_name"));
    }

    #[test]
    fn chunk_key_is_deterministic() {
        assert_eq!(chunk_key("/p/a.py", 0), chunk_key("/p/a.py", 0));
        assert_ne!(chunk_key("/p/a.py", 0), chunk_key("/p/a.py", 1));
        assert_eq!(chunk_key("/p/a.py", 0).len(), 64);
    }

    #[test]
    fn similarity_conversion() {
        let mut result = SearchResult {
            text: String::new(),
            metadata: Metadata::new(),
            score: 0.25,
        };
        assert_eq!(result.similarity(), Some(0.75));
        result.score = 1.5;
        assert_eq!(result.similarity(), None);
    }

    #[test]
    fn metadata_values_roundtrip_untagged() {
        let meta: Metadata = serde_json::from_str(r#"{"file":"/a","has_todo":false}"#).unwrap();
        assert_eq!(meta["has_todo"].as_bool(), Some(false));
        assert_eq!(meta["file"].as_str(), Some("/a"));
    }
}
