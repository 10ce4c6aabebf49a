use crate::error::Result;
use crate::manifest::Manifest;
use crate::paths::{read_json, write_json_atomic, STATE_FILE_NAME};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub const INDEX_STATE_VERSION: &str = "0.1.0";

/// Persisted record of the last successful index run (`state.json`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexState {
    pub version: String,
    pub created_at: DateTime<Utc>,
    pub last_scan: Option<DateTime<Utc>>,
    pub last_index: Option<DateTime<Utc>>,
    pub config_hash: Option<String>,
    /// Path → content hash of every file whose chunks are in the vector index
    #[serde(default)]
    pub indexed_files: BTreeMap<String, String>,
    #[serde(default)]
    pub metadata: StateMetadata,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateMetadata {
    pub total_files: usize,
    pub total_chunks: usize,
    pub last_analysis: Option<DateTime<Utc>>,
}

impl Default for IndexState {
    fn default() -> Self {
        Self {
            version: INDEX_STATE_VERSION.to_string(),
            created_at: Utc::now(),
            last_scan: None,
            last_index: None,
            config_hash: None,
            indexed_files: BTreeMap::new(),
            metadata: StateMetadata::default(),
        }
    }
}

impl IndexState {
    #[must_use]
    pub fn path_for_state_dir(state_dir: &Path) -> PathBuf {
        state_dir.join(STATE_FILE_NAME)
    }

    /// Load `state.json`; a missing or corrupt file yields a fresh state
    pub async fn load(state_dir: &Path) -> Self {
        let path = Self::path_for_state_dir(state_dir);
        match read_json::<Self>(&path).await {
            Ok(Some(state)) => state,
            Ok(None) => Self::default(),
            Err(e) => {
                log::warn!("Ignoring unreadable state {}: {e}", path.display());
                Self::default()
            }
        }
    }

    pub async fn save(&self, state_dir: &Path) -> Result<()> {
        write_json_atomic(&Self::path_for_state_dir(state_dir), self).await
    }

    #[must_use]
    pub fn config_changed(&self, current_hash: &str) -> bool {
        self.config_hash.as_deref() != Some(current_hash)
    }

    /// Manifest entries that are new or whose hash differs from the indexed one
    #[must_use]
    pub fn files_to_index(&self, manifest: &Manifest) -> BTreeMap<String, String> {
        manifest
            .iter()
            .filter(|(path, hash)| self.indexed_files.get(*path) != Some(*hash))
            .map(|(path, hash)| (path.clone(), hash.clone()))
            .collect()
    }

    /// Indexed paths the manifest no longer tracks
    #[must_use]
    pub fn removed_files(&self, manifest: &Manifest) -> Vec<String> {
        self.indexed_files
            .keys()
            .filter(|path| !manifest.contains_key(*path))
            .cloned()
            .collect()
    }

    pub fn touch_scan(&mut self) {
        self.last_scan = Some(Utc::now());
    }
}

/// Where a project sits in the scan → index lifecycle
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IndexPhase {
    Unscanned,
    Scanned,
    Indexed,
    Stale,
}

impl IndexPhase {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unscanned => "unscanned",
            Self::Scanned => "scanned",
            Self::Indexed => "indexed",
            Self::Stale => "stale",
        }
    }
}

impl std::fmt::Display for IndexPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "count", rename_all = "snake_case")]
pub enum StaleReason {
    ConfigChanged,
    /// New or changed files not yet indexed
    FilesPending(usize),
    /// Indexed files no longer in the manifest
    FilesRemoved(usize),
    /// The last run stored chunks but the collection is now empty
    IndexMissing,
}

impl std::fmt::Display for StaleReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ConfigChanged => f.write_str("configuration changed"),
            Self::FilesPending(n) => write!(f, "{n} files new or changed"),
            Self::FilesRemoved(n) => write!(f, "{n} files removed"),
            Self::IndexMissing => f.write_str("vector index missing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseAssessment {
    pub phase: IndexPhase,
    pub reasons: Vec<StaleReason>,
}

/// Derive the lifecycle phase from persisted manifest/state and the live
/// collection size
#[must_use]
pub fn assess_phase(
    manifest_exists: bool,
    manifest: &Manifest,
    state: &IndexState,
    config_hash: &str,
    stored_chunks: usize,
) -> PhaseAssessment {
    if !manifest_exists {
        return PhaseAssessment {
            phase: IndexPhase::Unscanned,
            reasons: Vec::new(),
        };
    }

    let mut reasons = Vec::new();
    if state.last_index.is_some() && state.config_changed(config_hash) {
        reasons.push(StaleReason::ConfigChanged);
    }
    let pending = state.files_to_index(manifest).len();
    if pending > 0 {
        reasons.push(StaleReason::FilesPending(pending));
    }
    let removed = state.removed_files(manifest).len();
    if removed > 0 {
        reasons.push(StaleReason::FilesRemoved(removed));
    }
    if state.metadata.total_chunks > 0 && stored_chunks == 0 {
        reasons.push(StaleReason::IndexMissing);
    }

    let phase = if state.last_index.is_none() {
        IndexPhase::Scanned
    } else if reasons.is_empty() {
        IndexPhase::Indexed
    } else {
        IndexPhase::Stale
    };

    PhaseAssessment { phase, reasons }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn manifest(entries: &[(&str, &str)]) -> Manifest {
        entries
            .iter()
            .map(|(p, h)| (p.to_string(), h.to_string()))
            .collect()
    }

    fn indexed_state(entries: &[(&str, &str)], hash: &str) -> IndexState {
        IndexState {
            config_hash: Some(hash.to_string()),
            last_index: Some(Utc::now()),
            indexed_files: manifest(entries),
            ..Default::default()
        }
    }

    #[test]
    fn files_to_index_covers_new_and_changed() {
        let state = indexed_state(&[("/a", "h1"), ("/b", "h2")], "cfg");
        let current = manifest(&[("/a", "h1"), ("/b", "h2x"), ("/c", "h3")]);

        let pending: Vec<String> = state.files_to_index(&current).into_keys().collect();
        assert_eq!(pending, vec!["/b".to_string(), "/c".to_string()]);
        assert!(state.removed_files(&current).is_empty());
    }

    #[test]
    fn removed_files_are_indexed_but_untracked() {
        let state = indexed_state(&[("/a", "h1"), ("/b", "h2")], "cfg");
        assert_eq!(state.removed_files(&manifest(&[("/a", "h1")])), vec!["/b".to_string()]);
    }

    #[test]
    fn phase_progression() {
        let current = manifest(&[("/a", "h1")]);
        let fresh = IndexState::default();

        assert_eq!(assess_phase(false, &current, &fresh, "cfg", 0).phase, IndexPhase::Unscanned);
        assert_eq!(assess_phase(true, &current, &fresh, "cfg", 0).phase, IndexPhase::Scanned);

        let state = indexed_state(&[("/a", "h1")], "cfg");
        let current_view = assess_phase(true, &current, &state, "cfg", 3);
        assert_eq!(current_view.phase, IndexPhase::Indexed);
        assert!(current_view.reasons.is_empty());
    }

    #[test]
    fn stale_reasons_accumulate() {
        let mut state = indexed_state(&[("/a", "h1"), ("/gone", "h9")], "old");
        state.metadata.total_chunks = 5;
        let current = manifest(&[("/a", "h1"), ("/new", "h2")]);

        let view = assess_phase(true, &current, &state, "new", 0);
        assert_eq!(view.phase, IndexPhase::Stale);
        assert_eq!(
            view.reasons,
            vec![
                StaleReason::ConfigChanged,
                StaleReason::FilesPending(1),
                StaleReason::FilesRemoved(1),
                StaleReason::IndexMissing,
            ]
        );
    }

    #[tokio::test]
    async fn state_roundtrips_and_tolerates_corruption() {
        let dir = TempDir::new().unwrap();
        let mut state = indexed_state(&[("/a", "h1")], "cfg");
        state.metadata.total_chunks = 4;
        state.save(dir.path()).await.unwrap();

        let back = IndexState::load(dir.path()).await;
        assert_eq!(back, state);

        tokio::fs::write(IndexState::path_for_state_dir(dir.path()), b"{ not json")
            .await
            .unwrap();
        let fresh = IndexState::load(dir.path()).await;
        assert!(fresh.indexed_files.is_empty());
        assert!(fresh.config_changed("cfg"));
    }

    #[test]
    fn state_json_shape() {
        let state = IndexState::default();
        let value = serde_json::to_value(&state).unwrap();
        for key in ["version", "created_at", "last_scan", "last_index", "config_hash", "indexed_files", "metadata"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert!(value["metadata"].get("last_analysis").is_some());
    }
}
