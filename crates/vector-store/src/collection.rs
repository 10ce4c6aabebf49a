use sha2::{Digest, Sha256};
use std::path::Path;

/// Deterministic collection name for a project root.
///
/// Lower-cased directory name with non-alphanumerics replaced by `_`, then the
/// first 8 hex chars of the SHA-256 of the absolute path.
pub fn collection_name(project_root: &Path) -> String {
    let project = project_root
        .file_name()
        .map(|name| name.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let project: String = project
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .collect();

    let mut hasher = Sha256::new();
    hasher.update(project_root.to_string_lossy().as_bytes());
    let digest = format!("{:x}", hasher.finalize());

    format!("{project}_{}", &digest[..8])
}
