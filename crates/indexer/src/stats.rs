use crate::error::FileFailure;
use serde::Serialize;
use std::collections::BTreeMap;

/// Result of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanReport {
    /// Files found by the walk, before hashing
    pub files_found: usize,
    pub new: usize,
    pub changed: usize,
    pub unchanged: usize,
    pub removed: usize,
    pub failed: Vec<FileFailure>,
    pub time_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexMode {
    Full,
    Incremental,
}

impl IndexMode {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Incremental => "incremental",
        }
    }
}

/// What an index run decided to do, reported before the file loop starts
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexPlan {
    pub mode: IndexMode,
    pub tracked_files: usize,
    pub files_to_index: usize,
    pub files_to_purge: usize,
}

/// Statistics about an index run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexReport {
    pub mode: IndexMode,

    /// Files successfully chunked, embedded and stored
    pub files_indexed: usize,

    /// Chunks written during this run
    pub chunks_indexed: usize,

    /// Indexed files dropped because they left the manifest
    pub files_purged: usize,

    /// Chunks removed for purged files
    pub chunks_purged: usize,

    /// Per-file failures; these files are retried next run
    pub failures: Vec<FileFailure>,

    /// Files per language
    pub languages: BTreeMap<String, usize>,

    /// Manifest size after the run
    pub total_files: usize,

    /// Chunks in the collection after the run
    pub total_chunks: usize,

    pub collection_name: String,

    pub time_ms: u64,
}

impl IndexReport {
    pub fn new(mode: IndexMode) -> Self {
        Self {
            mode,
            files_indexed: 0,
            chunks_indexed: 0,
            files_purged: 0,
            chunks_purged: 0,
            failures: Vec::new(),
            languages: BTreeMap::new(),
            total_files: 0,
            total_chunks: 0,
            collection_name: String::new(),
            time_ms: 0,
        }
    }

    pub fn add_file(&mut self, language: &str, chunks: usize) {
        self.files_indexed += 1;
        self.chunks_indexed += chunks;
        *self.languages.entry(language.to_string()).or_insert(0) += 1;
    }

    pub fn add_purge(&mut self, chunks: usize) {
        self.files_purged += 1;
        self.chunks_purged += chunks;
    }

    pub fn add_failure(&mut self, failure: FileFailure) {
        self.failures.push(failure);
    }
}

/// Outcome of `index()`. The no-op cases are not errors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum IndexOutcome {
    /// The manifest is empty
    NothingToIndex,
    /// Every tracked file is indexed under the current configuration
    AlreadyCurrent { total_files: usize },
    Indexed(IndexReport),
}

impl IndexOutcome {
    #[must_use]
    pub const fn report(&self) -> Option<&IndexReport> {
        match self {
            Self::Indexed(report) => Some(report),
            _ => None,
        }
    }
}
