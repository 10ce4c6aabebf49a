use crate::error::{IndexerError, Result};
use bugtrace_chunker::ChunkerConfig;
use bugtrace_vector_store::{EmbedderSettings, DEFAULT_EMBEDDING_MODEL};
use globset::Glob;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "bugtrace.yaml";

const LLM_PROVIDERS: &[&str] = &["ollama", "openai", "anthropic"];
const VECTOR_STORES: &[&str] = &["chroma"];
const REASONING_STYLES: &[&str] = &["concise", "detailed", "step-by-step"];

/// Validated project configuration, built once from `bugtrace.yaml`
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BugtraceConfig {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub rag: RagConfig,
    #[serde(default)]
    pub tools: ToolsConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_llm_model(),
            temperature: default_temperature(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_llm_model() -> String {
    "llama3.2:3b".to_string()
}
fn default_temperature() -> f64 {
    0.2
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathsConfig {
    #[serde(default = "default_project_root")]
    pub project_root: String,
    #[serde(default = "default_ignore")]
    pub ignore: Vec<String>,
    #[serde(default = "default_logs")]
    pub logs: Vec<String>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            project_root: default_project_root(),
            ignore: default_ignore(),
            logs: default_logs(),
        }
    }
}

fn default_project_root() -> String {
    ".".to_string()
}
fn default_ignore() -> Vec<String> {
    ["node_modules", "venv", ".git", ".bugtrace"]
        .iter()
        .map(ToString::to_string)
        .collect()
}
fn default_logs() -> Vec<String> {
    vec!["logs/".to_string()]
}

/// Retrieval settings. Every field feeds the config hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default = "default_store")]
    pub store: String,
    #[serde(default = "default_embedding_model")]
    pub embedding_model: String,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            store: default_store(),
            embedding_model: default_embedding_model(),
        }
    }
}

fn default_chunk_size() -> usize {
    1000
}
fn default_chunk_overlap() -> usize {
    200
}
fn default_top_k() -> usize {
    6
}
fn default_store() -> String {
    "chroma".to_string()
}
fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolsConfig {
    #[serde(default = "enabled")]
    pub code_search: bool,
    #[serde(default = "enabled")]
    pub log_search: bool,
    #[serde(default = "enabled")]
    pub config_check: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            code_search: true,
            log_search: true,
            config_check: true,
        }
    }
}

fn enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,
    #[serde(default = "default_reasoning_style")]
    pub reasoning_style: String,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            max_steps: default_max_steps(),
            reasoning_style: default_reasoning_style(),
        }
    }
}

fn default_max_steps() -> u32 {
    5
}
fn default_reasoning_style() -> String {
    "concise".to_string()
}

impl BugtraceConfig {
    #[must_use]
    pub fn path_for_project_root(root: &Path) -> PathBuf {
        root.join(CONFIG_FILE_NAME)
    }

    /// Read `bugtrace.yaml`, falling back to defaults when it is absent or empty.
    /// Does not validate.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::path_for_project_root(root);
        if !path.exists() {
            log::debug!("No {} at {}, using defaults", CONFIG_FILE_NAME, root.display());
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path)?;
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }

        serde_yaml::from_str(&raw)
            .map_err(|e| IndexerError::config(format!("{}: {e}", path.display())))
    }

    /// Load and validate in one step
    pub fn load_validated(root: &Path) -> Result<Self> {
        let config = Self::load(root)?;
        config.validate()?;
        Ok(config)
    }

    /// Check every field, reporting all violations at once
    pub fn validate(&self) -> Result<()> {
        let mut errors = Vec::new();

        if !LLM_PROVIDERS.contains(&self.llm.provider.as_str()) {
            errors.push(format!(
                "llm.provider must be one of: {} (got '{}')",
                LLM_PROVIDERS.join(", "),
                self.llm.provider
            ));
        }
        if self.llm.model.trim().is_empty() {
            errors.push("llm.model must be a non-empty string".to_string());
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            errors.push("llm.temperature must be between 0.0 and 2.0".to_string());
        }

        for pattern in &self.paths.ignore {
            if let Err(e) = Glob::new(pattern) {
                errors.push(format!("paths.ignore entry '{pattern}' is not a valid glob: {e}"));
            }
        }

        let rag = &self.rag;
        if !(1..=2000).contains(&rag.chunk_size) {
            errors.push("rag.chunk_size must be between 1 and 2000".to_string());
        }
        if !(200..=2000).contains(&rag.chunk_overlap) {
            errors.push("rag.chunk_overlap must be between 200 and 2000".to_string());
        }
        if rag.chunk_overlap >= rag.chunk_size {
            errors.push(format!(
                "rag.chunk_overlap ({}) must be smaller than rag.chunk_size ({})",
                rag.chunk_overlap, rag.chunk_size
            ));
        }
        if !(1..=20).contains(&rag.top_k) {
            errors.push("rag.top_k must be between 1 and 20".to_string());
        }
        if !VECTOR_STORES.contains(&rag.store.as_str()) {
            errors.push(format!(
                "rag.store must be one of: {} (got '{}')",
                VECTOR_STORES.join(", "),
                rag.store
            ));
        }
        if rag.embedding_model.trim().is_empty() {
            errors.push("rag.embedding_model must be a non-empty string".to_string());
        }

        if !(1..=20).contains(&self.analysis.max_steps) {
            errors.push("analysis.max_steps must be between 1 and 20".to_string());
        }
        if !REASONING_STYLES.contains(&self.analysis.reasoning_style.as_str()) {
            errors.push(format!(
                "analysis.reasoning_style must be one of: {} (got '{}')",
                REASONING_STYLES.join(", "),
                self.analysis.reasoning_style
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(IndexerError::Config(errors))
        }
    }

    /// Write a default `bugtrace.yaml` with the given LLM provider and model.
    /// Returns `false` and leaves the file alone when one already exists.
    pub fn write_default(root: &Path, provider: &str, model: &str) -> Result<bool> {
        let path = Self::path_for_project_root(root);
        if path.exists() {
            return Ok(false);
        }

        let mut config = Self::default();
        config.llm.provider = provider.to_string();
        config.llm.model = model.to_string();

        let yaml = serde_yaml::to_string(&config)
            .map_err(|e| IndexerError::Other(format!("serialize {CONFIG_FILE_NAME}: {e}")))?;
        std::fs::write(&path, yaml)?;
        log::info!("Created {}", path.display());
        Ok(true)
    }

    #[must_use]
    pub fn chunker_config(&self) -> ChunkerConfig {
        ChunkerConfig::new(self.rag.chunk_size, self.rag.chunk_overlap)
    }

    #[must_use]
    pub fn embedder_settings(&self) -> EmbedderSettings {
        EmbedderSettings {
            provider: self.llm.provider.clone(),
            model: self.rag.embedding_model.clone(),
        }
    }

    /// Configured ignore patterns plus the state directory, which is never indexed
    #[must_use]
    pub fn ignore_patterns(&self) -> Vec<String> {
        let mut patterns = self.paths.ignore.clone();
        if !patterns.iter().any(|p| p == crate::paths::STATE_DIR_NAME) {
            patterns.push(crate::paths::STATE_DIR_NAME.to_string());
        }
        patterns
    }

    /// SHA-256 over the canonical JSON of the `rag` section and the embedder
    /// identity. LLM-only edits leave it unchanged.
    #[must_use]
    pub fn config_hash(&self, model_id: &str, dimension: usize) -> String {
        let canonical = serde_json::json!({
            "rag": self.rag,
            "embedder": {
                "model_id": model_id,
                "dimension": dimension,
            },
        });

        let mut hasher = Sha256::new();
        hasher.update(canonical.to_string().as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = BugtraceConfig::load_validated(dir.path()).unwrap();
        assert_eq!(config, BugtraceConfig::default());
        assert_eq!(config.rag.chunk_size, 1000);
        assert_eq!(config.rag.top_k, 6);
        assert_eq!(config.analysis.reasoning_style, "concise");
    }

    #[test]
    fn partial_file_fills_defaults_and_ignores_unknown_sections() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILE_NAME),
            "rag:\n  chunk_size: 800\nextras:\n  anything: 1\n",
        )
        .unwrap();

        let config = BugtraceConfig::load_validated(dir.path()).unwrap();
        assert_eq!(config.rag.chunk_size, 800);
        assert_eq!(config.rag.chunk_overlap, 200);
        assert_eq!(config.llm.provider, "ollama");
    }

    #[test]
    fn validation_collects_every_violation() {
        let mut config = BugtraceConfig::default();
        config.llm.provider = "watson".into();
        config.llm.temperature = 3.0;
        config.rag.chunk_size = 5000;
        config.rag.chunk_overlap = 100;
        config.rag.top_k = 0;
        config.rag.store = "faiss".into();
        config.analysis.max_steps = 50;

        let Err(IndexerError::Config(errors)) = config.validate() else {
            panic!("expected config error");
        };
        assert_eq!(errors.len(), 7);
        assert!(errors.iter().any(|e| e.starts_with("rag.chunk_overlap must be between")));
    }

    #[test]
    fn overlap_must_be_smaller_than_size() {
        let mut config = BugtraceConfig::default();
        config.rag.chunk_size = 300;
        config.rag.chunk_overlap = 300;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("must be smaller than rag.chunk_size"));
    }

    #[test]
    fn invalid_glob_is_reported() {
        let mut config = BugtraceConfig::default();
        config.paths.ignore.push("[unclosed".into());
        assert!(config.validate().is_err());
    }

    #[test]
    fn wrong_type_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), "rag:\n  chunk_size: big\n").unwrap();
        let err = BugtraceConfig::load(dir.path()).unwrap_err();
        assert!(err.is_setup_error());
    }

    #[test]
    fn write_default_never_overwrites() {
        let dir = TempDir::new().unwrap();
        assert!(BugtraceConfig::write_default(dir.path(), "anthropic", "claude").unwrap());
        assert!(!BugtraceConfig::write_default(dir.path(), "ollama", "other").unwrap());

        let config = BugtraceConfig::load_validated(dir.path()).unwrap();
        assert_eq!(config.llm.provider, "anthropic");
        assert_eq!(config.llm.model, "claude");
        assert!(config.tools.code_search);
    }

    #[test]
    fn config_hash_tracks_rag_and_embedder_only() {
        let base = BugtraceConfig::default();
        let hash = base.config_hash("m", 384);

        let mut llm_edit = base.clone();
        llm_edit.llm.temperature = 1.0;
        assert_eq!(llm_edit.config_hash("m", 384), hash);

        let mut rag_edit = base.clone();
        rag_edit.rag.chunk_size = 800;
        assert_ne!(rag_edit.config_hash("m", 384), hash);

        assert_ne!(base.config_hash("other", 384), hash);
        assert_ne!(base.config_hash("m", 768), hash);
    }

    #[test]
    fn ignore_patterns_always_cover_state_dir() {
        let mut config = BugtraceConfig::default();
        config.paths.ignore = vec!["*.pyc".into()];
        assert_eq!(config.ignore_patterns(), vec!["*.pyc".to_string(), ".bugtrace".to_string()]);
    }
}
