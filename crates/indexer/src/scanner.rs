use crate::error::{IndexerError, Result};
use globset::{Glob, GlobMatcher};
use ignore::WalkBuilder;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Ignore rules for project walks.
///
/// Patterns starting with `.` match a path segment exactly (so `.git` does not
/// match `git` or `.gitignore`). Every other pattern is a glob tested against
/// each segment, the full relative path, and the file name.
#[derive(Debug, Clone)]
pub struct IgnoreMatcher {
    hidden: Vec<String>,
    globs: Vec<GlobMatcher>,
}

impl IgnoreMatcher {
    pub fn new<S: AsRef<str>>(patterns: &[S]) -> Result<Self> {
        let mut hidden = Vec::new();
        let mut globs = Vec::new();

        for pattern in patterns {
            let pattern = pattern.as_ref();
            if pattern.starts_with('.') {
                hidden.push(pattern.to_string());
            } else {
                let glob = Glob::new(pattern).map_err(|e| {
                    IndexerError::config(format!("invalid ignore pattern '{pattern}': {e}"))
                })?;
                globs.push(glob.compile_matcher());
            }
        }

        Ok(Self { hidden, globs })
    }

    /// `relative` is the path below the project root
    #[must_use]
    pub fn is_ignored(&self, relative: &Path) -> bool {
        let segments: Vec<String> = relative
            .components()
            .filter_map(|component| match component {
                Component::Normal(name) => Some(name.to_string_lossy().to_string()),
                _ => None,
            })
            .collect();
        if segments.is_empty() {
            return false;
        }

        if segments
            .iter()
            .any(|segment| self.hidden.iter().any(|pattern| pattern == segment))
        {
            return true;
        }

        if self.globs.is_empty() {
            return false;
        }

        let full = segments.join("/");
        self.globs.iter().any(|glob| {
            glob.is_match(&full) || segments.iter().any(|segment| glob.is_match(segment))
        })
    }
}

/// Walk `root` recursively and return every non-ignored regular file, sorted.
///
/// Unreadable directories are skipped. Symlinks are not followed.
pub fn scan_project(root: &Path, matcher: &IgnoreMatcher) -> Vec<PathBuf> {
    let filter_root = root.to_path_buf();
    let filter = Arc::new(matcher.clone());

    let mut builder = WalkBuilder::new(root);
    builder.standard_filters(false).follow_links(false);
    builder.filter_entry(move |entry| {
        entry
            .path()
            .strip_prefix(&filter_root)
            .map(|relative| !filter.is_ignored(relative))
            .unwrap_or(true)
    });

    let mut files = Vec::new();
    for result in builder.build() {
        match result {
            Ok(entry) => {
                if entry.file_type().is_some_and(|ft| ft.is_file()) {
                    files.push(entry.into_path());
                }
            }
            Err(e) => log::debug!("Skipping unreadable entry: {e}"),
        }
    }

    files.sort();
    log::info!("Found {} files under {}", files.len(), root.display());
    files
}
