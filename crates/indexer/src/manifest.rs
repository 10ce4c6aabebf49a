use crate::error::{FileFailure, Result};
use crate::paths::{read_json, write_json_atomic, MANIFEST_FILE_NAME};
use crate::scanner::{scan_project, IgnoreMatcher};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Absolute file path → SHA-256 hex of its contents
pub type Manifest = BTreeMap<String, String>;

const HASH_BUFFER_SIZE: usize = 8192;

/// Result of refreshing the manifest against a fresh scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ManifestUpdate {
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    /// Previously tracked paths missing from this scan (deleted or now ignored)
    pub removed: usize,
    /// Files that could not be hashed or whose path cannot be stored as a
    /// manifest key; left out of the new manifest
    pub failed: Vec<FileFailure>,
    #[serde(skip)]
    pub manifest: Manifest,
}

impl ManifestUpdate {
    #[must_use]
    pub fn has_changes(&self) -> bool {
        self.new + self.changed + self.removed > 0
    }
}

/// Persisted snapshot of what the last scan saw, stored as `manifest.json`
#[derive(Debug, Clone)]
pub struct FileManifest {
    path: PathBuf,
}

impl FileManifest {
    pub fn new(state_dir: impl AsRef<Path>) -> Self {
        Self {
            path: state_dir.as_ref().join(MANIFEST_FILE_NAME),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Walk `root` and return the non-ignored files in lexical order
    pub fn scan<S: AsRef<str>>(root: &Path, ignore_patterns: &[S]) -> Result<Vec<PathBuf>> {
        let matcher = IgnoreMatcher::new(ignore_patterns)?;
        Ok(scan_project(root, &matcher))
    }

    /// Last persisted manifest; empty when missing or unreadable
    pub async fn load(&self) -> Manifest {
        match read_json::<Manifest>(&self.path).await {
            Ok(manifest) => manifest.unwrap_or_default(),
            Err(e) => {
                log::warn!("Ignoring unreadable manifest {}: {e}", self.path.display());
                Manifest::new()
            }
        }
    }

    pub async fn save(&self, manifest: &Manifest) -> Result<()> {
        write_json_atomic(&self.path, manifest).await
    }

    /// Hash every file, diff against the persisted manifest and persist the new
    /// one, even when nothing changed.
    pub async fn update(&self, files: &[PathBuf]) -> Result<ManifestUpdate> {
        let old = self.load().await;
        let mut update = ManifestUpdate::default();
        let mut seen = HashSet::with_capacity(files.len());

        for file in files {
            let Some(key) = file.to_str().map(str::to_string) else {
                log::warn!("Skipping {}: path is not valid UTF-8", file.display());
                update
                    .failed
                    .push(FileFailure::new(file, "path is not valid UTF-8"));
                continue;
            };
            seen.insert(key.clone());

            let hash = match hash_file(file).await {
                Ok(hash) => hash,
                Err(e) => {
                    log::warn!("Failed to hash {}: {e}", file.display());
                    update.failed.push(FileFailure::new(file, e));
                    continue;
                }
            };

            match old.get(&key) {
                None => update.new += 1,
                Some(previous) if *previous != hash => update.changed += 1,
                Some(_) => update.unchanged += 1,
            }
            update.manifest.insert(key, hash);
        }

        update.removed = old.keys().filter(|key| !seen.contains(*key)).count();

        self.save(&update.manifest).await?;
        log::info!(
            "Manifest updated: {} new, {} changed, {} unchanged, {} removed, {} failed",
            update.new,
            update.changed,
            update.unchanged,
            update.removed,
            update.failed.len()
        );
        Ok(update)
    }
}

/// Streaming SHA-256 of a file's contents
pub async fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = tokio::fs::File::open(path).await?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUFFER_SIZE];

    loop {
        let n = file.read(&mut buf).await?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(format!("{:x}", hasher.finalize()))
}
