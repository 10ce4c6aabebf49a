//! # Bugtrace Indexer
//!
//! Incremental project indexing: change detection, configuration, and the
//! coordinator that keeps the vector index consistent with the files on disk.
//!
//! ## Pipeline
//!
//! ```text
//! Project root
//!     │
//!     ├──> FileManifest (walk + ignore patterns + SHA-256)
//!     │      └─> .bugtrace/manifest.json
//!     │
//!     ├──> IndexState (config hash + indexed files)
//!     │      └─> .bugtrace/state.json
//!     │
//!     └──> IndexCoordinator
//!            ├─> Chunker        (changed files only)
//!            ├─> EmbeddingModel (one batch per file)
//!            └─> VectorIndex    (delete-then-insert per file)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use bugtrace_indexer::{IndexCoordinator, IndexOutcome};
//!
//! #[tokio::main]
//! async fn main() -> bugtrace_indexer::Result<()> {
//!     let coordinator = IndexCoordinator::open("/path/to/project").await?;
//!
//!     if let IndexOutcome::Indexed(report) = coordinator.index(false).await? {
//!         println!("Indexed {} files, {} chunks", report.files_indexed, report.chunks_indexed);
//!     }
//!
//!     for hit in coordinator.search("database timeout", None).await? {
//!         println!("{:.3} {}", hit.score, hit.file().unwrap_or_default());
//!     }
//!     Ok(())
//! }
//! ```

mod config;
mod coordinator;
mod error;
mod index_lock;
mod index_state;
mod manifest;
mod observer;
mod paths;
mod scanner;
mod stats;

pub use config::{
    AnalysisConfig, BugtraceConfig, LlmConfig, PathsConfig, RagConfig, ToolsConfig,
    CONFIG_FILE_NAME,
};
pub use coordinator::{IndexCoordinator, IndexStatus};
pub use error::{FileFailure, IndexerError, Result};
pub use index_state::{
    assess_phase, IndexPhase, IndexState, PhaseAssessment, StaleReason, StateMetadata,
    INDEX_STATE_VERSION,
};
pub use manifest::{hash_file, FileManifest, Manifest, ManifestUpdate};
pub use observer::{IndexObserver, LogObserver, NoopObserver};
pub use paths::{
    ensure_state_dir, index_dir_for_project_root, state_dir_for_project_root, INDEX_DIR_NAME,
    MANIFEST_FILE_NAME, STATE_DIR_NAME, STATE_FILE_NAME,
};
pub use scanner::{scan_project, IgnoreMatcher};
pub use stats::{IndexMode, IndexOutcome, IndexPlan, IndexReport, ScanReport};
