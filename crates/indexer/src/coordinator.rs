use crate::config::BugtraceConfig;
use crate::error::{FileFailure, IndexerError, Result};
use crate::index_lock::acquire_index_write_lock;
use crate::index_state::{assess_phase, IndexPhase, IndexState, PhaseAssessment, StaleReason};
use crate::manifest::{FileManifest, Manifest};
use crate::observer::{IndexObserver, NoopObserver};
use crate::paths::{ensure_state_dir, index_dir_for_project_root, state_dir_for_project_root};
use crate::stats::{IndexMode, IndexOutcome, IndexPlan, IndexReport, ScanReport};
use bugtrace_chunker::{Chunk, Chunker};
use bugtrace_vector_store::{
    CollectionStats, EmbeddingModel, JsonVectorStore, SearchResult, VectorIndex,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

const MAX_TOP_K: usize = 20;

/// Snapshot returned by [`IndexCoordinator::status`]
#[derive(Debug, Clone, Serialize)]
pub struct IndexStatus {
    pub phase: IndexPhase,
    pub reasons: Vec<StaleReason>,
    pub tracked_files: usize,
    pub indexed_files: usize,
    pub last_scan: Option<DateTime<Utc>>,
    pub last_index: Option<DateTime<Utc>>,
    pub collection: CollectionStats,
}

/// Drives scan → chunk → embed → store for one project root
pub struct IndexCoordinator {
    root: PathBuf,
    state_dir: PathBuf,
    config: BugtraceConfig,
    chunker: Chunker,
    embedder: Arc<EmbeddingModel>,
    observer: Arc<dyn IndexObserver>,
}

impl IndexCoordinator {
    /// Load and validate `bugtrace.yaml`, then connect the embedding backend.
    ///
    /// Fails before any file is touched if the configuration is invalid or the
    /// provider is unreachable.
    pub async fn open(root: impl AsRef<Path>) -> Result<Self> {
        let root = resolve_root(root.as_ref())?;
        let config = BugtraceConfig::load_validated(&root)?;
        let embedder = EmbeddingModel::from_config(&config.embedder_settings()).await?;
        log::info!(
            "Embedder ready: {} (dimension {})",
            embedder.model_id(),
            embedder.dimension()
        );
        Self::with_embedder(root, config, Arc::new(embedder))
    }

    /// Build with an explicit configuration and embedder
    pub fn with_embedder(
        root: impl AsRef<Path>,
        config: BugtraceConfig,
        embedder: Arc<EmbeddingModel>,
    ) -> Result<Self> {
        let root = resolve_root(root.as_ref())?;
        config.validate()?;
        let chunker = Chunker::new(config.chunker_config())?;

        Ok(Self {
            state_dir: state_dir_for_project_root(&root),
            root,
            config,
            chunker,
            embedder,
            observer: Arc::new(NoopObserver),
        })
    }

    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn IndexObserver>) -> Self {
        self.observer = observer;
        self
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    #[must_use]
    pub const fn config(&self) -> &BugtraceConfig {
        &self.config
    }

    #[must_use]
    pub fn config_hash(&self) -> String {
        self.config
            .config_hash(self.embedder.model_id(), self.embedder.dimension())
    }

    /// Walk the project and refresh `manifest.json`
    pub async fn scan(&self) -> Result<ScanReport> {
        let _write_lock = acquire_index_write_lock(&self.state_dir).await?;
        let (report, _) = self.scan_locked().await?;
        Ok(report)
    }

    /// Scan, then index whatever the manifest and config hash say is out of date.
    /// `force` re-embeds every tracked file.
    pub async fn index(&self, force: bool) -> Result<IndexOutcome> {
        let _write_lock = acquire_index_write_lock(&self.state_dir).await?;
        let (_, manifest) = self.scan_locked().await?;

        let mut store = self.open_store().await?;
        let mut state = IndexState::load(&self.state_dir).await;
        self.index_locked(&manifest, &mut state, &mut store, force)
            .await
    }

    /// Scan, then index only if the project is not already current.
    /// Returns `None` when nothing needed doing.
    pub async fn ensure_indexed(&self) -> Result<Option<IndexReport>> {
        let _write_lock = acquire_index_write_lock(&self.state_dir).await?;
        let (_, manifest) = self.scan_locked().await?;

        let mut store = self.open_store().await?;
        let mut state = IndexState::load(&self.state_dir).await;
        let assessment = assess_phase(true, &manifest, &state, &self.config_hash(), store.len());
        if assessment.phase == IndexPhase::Indexed {
            log::info!("Project index is up to date");
            return Ok(None);
        }

        log::info!("Index is {}; updating", describe(&assessment));
        let outcome = self
            .index_locked(&manifest, &mut state, &mut store, false)
            .await?;
        Ok(match outcome {
            IndexOutcome::Indexed(report) => Some(report),
            IndexOutcome::NothingToIndex | IndexOutcome::AlreadyCurrent { .. } => None,
        })
    }

    /// Rank stored chunks against `query`. `top_k` defaults to `rag.top_k` and is
    /// clamped to 1..=20.
    pub async fn search(&self, query: &str, top_k: Option<usize>) -> Result<Vec<SearchResult>> {
        let k = top_k.unwrap_or(self.config.rag.top_k).clamp(1, MAX_TOP_K);
        let store = self.open_store().await?;
        if store.is_empty() {
            log::info!("Collection {} is empty; run `index` first", store.collection_name());
            return Ok(Vec::new());
        }
        Ok(store.search(query, k).await?)
    }

    /// Lifecycle phase and counts, read from persisted state without scanning
    pub async fn status(&self) -> Result<IndexStatus> {
        let manifest_file = FileManifest::new(&self.state_dir);
        let manifest = manifest_file.load().await;
        let state = IndexState::load(&self.state_dir).await;
        let store = self.open_store().await?;

        let assessment = assess_phase(
            manifest_file.exists(),
            &manifest,
            &state,
            &self.config_hash(),
            store.len(),
        );

        Ok(IndexStatus {
            phase: assessment.phase,
            reasons: assessment.reasons,
            tracked_files: manifest.len(),
            indexed_files: state.indexed_files.len(),
            last_scan: state.last_scan,
            last_index: state.last_index,
            collection: store.stats(),
        })
    }

    async fn open_store(&self) -> Result<JsonVectorStore> {
        Ok(JsonVectorStore::open(
            index_dir_for_project_root(&self.root),
            &self.root,
            self.embedder.clone(),
        )
        .await?)
    }

    async fn scan_locked(&self) -> Result<(ScanReport, Manifest)> {
        let start = Instant::now();
        ensure_state_dir(&self.root).await?;

        let files = FileManifest::scan(&self.root, &self.config.ignore_patterns())?;
        let update = FileManifest::new(&self.state_dir).update(&files).await?;

        let mut state = IndexState::load(&self.state_dir).await;
        state.touch_scan();
        state.save(&self.state_dir).await?;

        let report = ScanReport {
            files_found: files.len(),
            new: update.new,
            changed: update.changed,
            unchanged: update.unchanged,
            removed: update.removed,
            failed: update.failed,
            time_ms: elapsed_ms(start),
        };
        self.observer.scan_finished(&report);
        Ok((report, update.manifest))
    }

    async fn index_locked(
        &self,
        manifest: &Manifest,
        state: &mut IndexState,
        store: &mut JsonVectorStore,
        force: bool,
    ) -> Result<IndexOutcome> {
        let start = Instant::now();

        if manifest.is_empty() {
            if !state.indexed_files.is_empty() || !store.is_empty() {
                log::info!("Manifest is empty; clearing {} indexed files", state.indexed_files.len());
                store.reset();
                store.persist().await?;
                state.indexed_files.clear();
                state.metadata.total_files = 0;
                state.metadata.total_chunks = 0;
                state.save(&self.state_dir).await?;
            }
            log::info!("Manifest is empty. Nothing to index.");
            return Ok(IndexOutcome::NothingToIndex);
        }

        let config_hash = self.config_hash();
        let config_changed = state.config_changed(&config_hash);
        let index_missing = state.metadata.total_chunks > 0 && store.is_empty();
        if config_changed && state.config_hash.is_some() {
            log::info!("Configuration changed - full re-index required");
        }
        if index_missing {
            log::warn!("Vector index is missing or was discarded - full re-index required");
        }

        let mode = if force || config_changed || index_missing {
            IndexMode::Full
        } else {
            IndexMode::Incremental
        };

        let (files_to_index, removed) = match mode {
            IndexMode::Full => (manifest.clone(), Vec::new()),
            IndexMode::Incremental => (state.files_to_index(manifest), state.removed_files(manifest)),
        };

        if mode == IndexMode::Incremental && files_to_index.is_empty() && removed.is_empty() {
            log::info!("All {} files already indexed - nothing to do", manifest.len());
            return Ok(IndexOutcome::AlreadyCurrent {
                total_files: manifest.len(),
            });
        }

        let plan = IndexPlan {
            mode,
            tracked_files: manifest.len(),
            files_to_index: files_to_index.len(),
            files_to_purge: removed.len(),
        };
        self.observer.index_planned(&plan);

        let mut report = IndexReport::new(mode);
        let mut indexed_files = match mode {
            IndexMode::Full => {
                store.reset();
                BTreeMap::new()
            }
            IndexMode::Incremental => state.indexed_files.clone(),
        };

        for path in &removed {
            let purged = store.delete_by_file(Path::new(path));
            indexed_files.remove(path);
            report.add_purge(purged);
        }

        let total = files_to_index.len();
        for (position, (path_str, hash)) in files_to_index.iter().enumerate() {
            let path = Path::new(path_str);
            self.observer.file_started(path, position + 1, total);

            match self.index_file(store, path).await {
                Ok(chunks) => {
                    let language = chunks.first().map_or("text", |c| c.metadata.language.as_str());
                    report.add_file(language, chunks.len());
                    indexed_files.insert(path_str.clone(), hash.clone());
                    self.observer.file_indexed(path, chunks.len());
                }
                Err(e) => {
                    let failure = FileFailure::new(path, e);
                    log::warn!("Error processing {failure}");
                    indexed_files.remove(path_str);
                    self.observer.file_failed(&failure);
                    report.add_failure(failure);
                }
            }
        }

        store.persist().await?;

        state.indexed_files = indexed_files;
        state.config_hash = Some(config_hash);
        state.last_index = Some(Utc::now());
        state.metadata.total_files = manifest.len();
        state.metadata.total_chunks = store.len();
        state.save(&self.state_dir).await?;

        report.total_files = manifest.len();
        report.total_chunks = store.len();
        report.collection_name = store.collection_name().to_string();
        report.time_ms = elapsed_ms(start);

        self.observer.index_finished(&report);
        Ok(IndexOutcome::Indexed(report))
    }

    /// Delete-then-insert every chunk of one file. Returns the stored chunks.
    async fn index_file(&self, store: &mut JsonVectorStore, path: &Path) -> Result<Vec<Chunk>> {
        let bytes = tokio::fs::read(path).await?;
        let content = String::from_utf8_lossy(&bytes);

        store.delete_by_file(path);

        let chunks = self.chunker.chunk_file(path, &content)?;
        if chunks.is_empty() {
            return Ok(chunks);
        }

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let vectors = self.embedder.embed_batch(&texts).await?;
        store.upsert(&chunks, vectors)?;

        Ok(chunks)
    }
}

fn resolve_root(root: &Path) -> Result<PathBuf> {
    if !root.is_dir() {
        return Err(IndexerError::InvalidPath(format!(
            "Path does not exist or is not a directory: {}",
            root.display()
        )));
    }
    Ok(root.canonicalize()?)
}

fn describe(assessment: &PhaseAssessment) -> String {
    if assessment.reasons.is_empty() {
        return assessment.phase.to_string();
    }
    let reasons: Vec<String> = assessment.reasons.iter().map(ToString::to_string).collect();
    format!("{} ({})", assessment.phase, reasons.join(", "))
}

#[allow(clippy::cast_possible_truncation)]
fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}
