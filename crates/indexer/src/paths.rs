use crate::error::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const STATE_DIR_NAME: &str = ".bugtrace";
pub const MANIFEST_FILE_NAME: &str = "manifest.json";
pub const STATE_FILE_NAME: &str = "state.json";
pub const INDEX_DIR_NAME: &str = "index";
const LOCK_FILE_NAME: &str = "index.lock";

#[must_use]
pub fn state_dir_for_project_root(root: &Path) -> PathBuf {
    root.join(STATE_DIR_NAME)
}

#[must_use]
pub fn index_dir_for_project_root(root: &Path) -> PathBuf {
    state_dir_for_project_root(root).join(INDEX_DIR_NAME)
}

pub(crate) fn lock_path_for_state_dir(state_dir: &Path) -> PathBuf {
    state_dir.join(LOCK_FILE_NAME)
}

/// Create `.bugtrace/` and `.bugtrace/index/` if missing
pub async fn ensure_state_dir(root: &Path) -> Result<PathBuf> {
    let state_dir = state_dir_for_project_root(root);
    tokio::fs::create_dir_all(state_dir.join(INDEX_DIR_NAME)).await?;
    Ok(state_dir)
}

/// Serialize to a sibling temp file, then rename over the target
pub(crate) async fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let bytes = serde_json::to_vec_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, bytes).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

/// `Ok(None)` when the file does not exist; an unparsable file is an error
pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.exists() {
        return Ok(None);
    }
    let bytes = tokio::fs::read(path).await?;
    Ok(Some(serde_json::from_slice(&bytes)?))
}
