use async_trait::async_trait;
use bugtrace_indexer::{
    BugtraceConfig, IndexCoordinator, IndexMode, IndexOutcome, IndexPhase, IndexerError,
    StaleReason,
};
use bugtrace_vector_store::{EmbeddingModel, EmbeddingProvider, StubProvider, VectorStoreError};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

/// Stub vectors plus a count of every text sent to the backend.
/// Texts containing `EXPLODE` fail the whole batch.
struct CountingProvider {
    inner: StubProvider,
    texts: AtomicUsize,
    batches: AtomicUsize,
}

impl CountingProvider {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            inner: StubProvider::new("counting", 64),
            texts: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
        })
    }

    fn texts(&self) -> usize {
        self.texts.load(Ordering::SeqCst)
    }

    fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EmbeddingProvider for CountingProvider {
    fn model_id(&self) -> &str {
        self.inner.model_id()
    }

    fn dimension(&self) -> usize {
        self.inner.dimension()
    }

    async fn embed_batch(
        &self,
        texts: &[String],
    ) -> bugtrace_vector_store::Result<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.texts.fetch_add(texts.len(), Ordering::SeqCst);
        if texts.iter().any(|t| t.contains("EXPLODE")) {
            return Err(VectorStoreError::EmbeddingError("provider rejected batch".into()));
        }
        self.inner.embed_batch(texts).await
    }
}

fn coordinator(root: &Path, config: BugtraceConfig, provider: &Arc<CountingProvider>) -> IndexCoordinator {
    let embedder = Arc::new(EmbeddingModel::new(provider.clone()));
    IndexCoordinator::with_embedder(root, config, embedder).unwrap()
}

fn write(root: &Path, relative: &str, content: &str) {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(path, content).unwrap();
}

fn seed_project(root: &Path) {
    write(
        root,
        "app/users.py",
        "def fetch_user(user_id):\n    try:\n        return db.get(user_id)\n    except KeyError:\n        logger.warning('missing user')\n        return None\n",
    );
    write(root, "app/config.py", "TIMEOUT = 30\nRETRIES = 3\n");
    write(root, "src/lib.rs", "/// Adds two numbers\npub fn add(a: i32, b: i32) -> i32 {\n    a + b\n}\n");
}

fn paragraphs(count: usize, tag: &str) -> String {
    (0..count)
        .map(|i| format!("{tag} paragraph {i}: {}", "lorem ipsum ".repeat(18).trim_end()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn report(outcome: IndexOutcome) -> bugtrace_indexer::IndexReport {
    match outcome {
        IndexOutcome::Indexed(report) => report,
        other => panic!("expected an index run, got {other:?}"),
    }
}

#[tokio::test]
async fn second_index_without_changes_embeds_nothing() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);

    let first = report(coordinator.index(false).await.unwrap());
    assert_eq!(first.mode, IndexMode::Full);
    assert_eq!(first.files_indexed, 3);
    assert!(first.failures.is_empty());
    let calls = provider.batches();
    assert!(calls > 0);

    let second = coordinator.index(false).await.unwrap();
    assert_eq!(second, IndexOutcome::AlreadyCurrent { total_files: 3 });
    assert_eq!(provider.batches(), calls);
}

#[tokio::test]
async fn incremental_runs_converge_on_changed_files_only() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);
    report(coordinator.index(false).await.unwrap());

    write(temp.path(), "app/config.py", "TIMEOUT = 60\nRETRIES = 5\n");
    write(temp.path(), "app/new_module.py", "def helper():\n    return 42\n");
    let before = provider.batches();

    let run = report(coordinator.index(false).await.unwrap());
    assert_eq!(run.mode, IndexMode::Incremental);
    assert_eq!(run.files_indexed, 2);
    assert_eq!(provider.batches() - before, 2);

    let again = coordinator.index(false).await.unwrap();
    assert!(matches!(again, IndexOutcome::AlreadyCurrent { total_files: 4 }));
    assert_eq!(provider.batches() - before, 2);
}

#[tokio::test]
async fn chunk_size_change_reindexes_everything() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let provider = CountingProvider::new();
    report(
        coordinator(temp.path(), BugtraceConfig::default(), &provider)
            .index(false)
            .await
            .unwrap(),
    );

    let mut changed = BugtraceConfig::default();
    changed.rag.chunk_size = 800;
    let rerun = report(
        coordinator(temp.path(), changed, &provider)
            .index(false)
            .await
            .unwrap(),
    );

    assert_eq!(rerun.mode, IndexMode::Full);
    assert_eq!(rerun.files_indexed, 3);
}

#[tokio::test]
async fn llm_only_change_does_not_reindex() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let provider = CountingProvider::new();
    report(
        coordinator(temp.path(), BugtraceConfig::default(), &provider)
            .index(false)
            .await
            .unwrap(),
    );

    let mut changed = BugtraceConfig::default();
    changed.llm.temperature = 0.9;
    let outcome = coordinator(temp.path(), changed, &provider)
        .index(false)
        .await
        .unwrap();
    assert!(matches!(outcome, IndexOutcome::AlreadyCurrent { .. }));
}

#[tokio::test]
async fn shrinking_file_leaves_only_new_chunks() {
    let temp = TempDir::new().unwrap();
    write(temp.path(), "notes.txt", &paragraphs(5, "v1"));

    let mut config = BugtraceConfig::default();
    config.rag.chunk_size = 250;
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), config, &provider);

    let first = report(coordinator.index(false).await.unwrap());
    assert_eq!(first.chunks_indexed, 5);

    write(temp.path(), "notes.txt", &paragraphs(3, "v2"));
    let second = report(coordinator.index(false).await.unwrap());
    assert_eq!(second.chunks_indexed, 3);
    assert_eq!(second.total_chunks, 3);

    let status = coordinator.status().await.unwrap();
    assert_eq!(status.collection.total_chunks, 3);
    let hits = coordinator.search("paragraph", Some(10)).await.unwrap();
    assert_eq!(hits.len(), 3);
    assert!(hits.iter().all(|hit| hit.text.starts_with("v2")));
}

#[tokio::test]
async fn deleted_files_are_purged() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);
    let first = report(coordinator.index(false).await.unwrap());

    std::fs::remove_file(temp.path().join("src/lib.rs")).unwrap();
    let before = provider.batches();
    let second = report(coordinator.index(false).await.unwrap());

    assert_eq!(second.files_purged, 1);
    assert_eq!(second.files_indexed, 0);
    assert!(second.total_chunks < first.total_chunks);
    assert_eq!(provider.batches(), before);

    let status = coordinator.status().await.unwrap();
    assert_eq!(status.indexed_files, 2);
    assert_eq!(status.collection.total_files, 2);
    assert_eq!(status.phase, IndexPhase::Indexed);
}

#[tokio::test]
async fn failed_file_is_retried_on_next_run() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    write(temp.path(), "app/broken.py", "print('EXPLODE')\n");
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);

    let first = report(coordinator.index(false).await.unwrap());
    assert_eq!(first.files_indexed, 3);
    assert_eq!(first.failures.len(), 1);
    assert!(first.failures[0].path.ends_with("app/broken.py"));

    let status = coordinator.status().await.unwrap();
    assert_eq!(status.phase, IndexPhase::Stale);
    assert_eq!(status.reasons, vec![StaleReason::FilesPending(1)]);

    write(temp.path(), "app/broken.py", "print('fixed')\n");
    let second = report(coordinator.index(false).await.unwrap());
    assert_eq!(second.files_indexed, 1);
    assert!(second.failures.is_empty());
    assert!(matches!(
        coordinator.index(false).await.unwrap(),
        IndexOutcome::AlreadyCurrent { total_files: 4 }
    ));
}

#[tokio::test]
async fn forced_index_reembeds_every_file() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);
    let first = report(coordinator.index(false).await.unwrap());

    let forced = report(coordinator.index(true).await.unwrap());
    assert_eq!(forced.mode, IndexMode::Full);
    assert_eq!(forced.files_indexed, 3);
    assert_eq!(forced.total_chunks, first.total_chunks);
}

#[tokio::test]
async fn lost_collection_triggers_full_reindex() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);
    report(coordinator.index(false).await.unwrap());

    std::fs::remove_dir_all(temp.path().join(".bugtrace").join("index")).unwrap();
    let status = coordinator.status().await.unwrap();
    assert_eq!(status.reasons, vec![StaleReason::IndexMissing]);

    let rerun = report(coordinator.index(false).await.unwrap());
    assert_eq!(rerun.mode, IndexMode::Full);
    assert_eq!(rerun.files_indexed, 3);
}

#[tokio::test]
async fn status_walks_through_phases() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);

    assert_eq!(coordinator.status().await.unwrap().phase, IndexPhase::Unscanned);

    let scan = coordinator.scan().await.unwrap();
    assert_eq!((scan.new, scan.files_found), (3, 3));
    assert_eq!(coordinator.status().await.unwrap().phase, IndexPhase::Scanned);

    report(coordinator.index(false).await.unwrap());
    let status = coordinator.status().await.unwrap();
    assert_eq!(status.phase, IndexPhase::Indexed);
    assert_eq!(status.tracked_files, 3);
    assert!(status.last_index.is_some());

    write(temp.path(), "app/config.py", "TIMEOUT = 90\n");
    coordinator.scan().await.unwrap();
    let status = coordinator.status().await.unwrap();
    assert_eq!(status.phase, IndexPhase::Stale);
    assert_eq!(status.reasons, vec![StaleReason::FilesPending(1)]);
}

#[tokio::test]
async fn ensure_indexed_only_works_when_needed() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);

    let first = coordinator.ensure_indexed().await.unwrap();
    assert_eq!(first.map(|r| r.files_indexed), Some(3));

    let calls = provider.batches();
    assert!(coordinator.ensure_indexed().await.unwrap().is_none());
    assert_eq!(provider.batches(), calls);
}

#[tokio::test]
async fn search_returns_ranked_hits() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);

    assert!(coordinator.search("fetch user", None).await.unwrap().is_empty());
    report(coordinator.index(false).await.unwrap());

    let hits = coordinator.search("TIMEOUT = 30\nRETRIES = 3", Some(2)).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert!(hits[0].score <= hits[1].score);
    assert!(hits[0].file().unwrap().ends_with("config.py"));
    assert!(hits[0].score.abs() < 1e-4);

    let all = coordinator.search("anything", Some(500)).await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn ignore_patterns_keep_files_out_of_the_manifest() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    write(temp.path(), ".git/HEAD", "ref: refs/heads/main\n");
    write(temp.path(), "gitstuff/keep.py", "x = 1\n");
    write(temp.path(), "app/__pycache__/users.cpython-311.pyc", "\0\0");
    write(temp.path(), "app/stale.pyc", "\0\0");

    let mut config = BugtraceConfig::default();
    config.paths.ignore = vec![".git".into(), "*.pyc".into(), "__pycache__".into()];
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), config, &provider);

    let scan = coordinator.scan().await.unwrap();
    assert_eq!(scan.files_found, 4);

    let manifest: std::collections::BTreeMap<String, String> = serde_json::from_slice(
        &std::fs::read(temp.path().join(".bugtrace").join("manifest.json")).unwrap(),
    )
    .unwrap();
    assert!(manifest.keys().all(|k| !k.contains(".git/") && !k.ends_with(".pyc")));
    assert!(manifest.keys().any(|k| k.ends_with("gitstuff/keep.py")));
    assert!(manifest.keys().all(|k| !k.contains(".bugtrace")));
}

#[tokio::test]
async fn empty_project_has_nothing_to_index() {
    let temp = TempDir::new().unwrap();
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);

    assert_eq!(coordinator.index(false).await.unwrap(), IndexOutcome::NothingToIndex);
    assert_eq!(provider.texts(), 0);
}

#[tokio::test]
async fn invalid_config_fails_before_any_work() {
    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    write(temp.path(), "bugtrace.yaml", "rag:\n  chunk_size: 100\n  top_k: 99\n");

    match IndexCoordinator::open(temp.path()).await {
        Err(IndexerError::Config(violations)) => assert_eq!(violations.len(), 2),
        Err(other) => panic!("expected a configuration error, got {other}"),
        Ok(_) => panic!("invalid configuration was accepted"),
    }
    assert!(!temp.path().join(".bugtrace").exists());
}

#[cfg(target_os = "linux")]
#[tokio::test]
async fn non_utf8_file_name_does_not_block_convergence() {
    use std::os::unix::ffi::OsStrExt;

    let temp = TempDir::new().unwrap();
    seed_project(temp.path());
    let odd = temp.path().join("app").join(std::ffi::OsStr::from_bytes(b"bad\xff.py"));
    std::fs::write(&odd, "x = 1\n").unwrap();
    let provider = CountingProvider::new();
    let coordinator = coordinator(temp.path(), BugtraceConfig::default(), &provider);

    let scan = coordinator.scan().await.unwrap();
    assert_eq!(scan.files_found, 4);
    assert_eq!(scan.failed.len(), 1);
    assert_eq!(scan.failed[0].path.file_name(), odd.file_name());

    let first = report(coordinator.index(false).await.unwrap());
    assert_eq!(first.files_indexed, 3);
    assert!(first.failures.is_empty());

    let calls = provider.batches();
    assert_eq!(
        coordinator.index(false).await.unwrap(),
        IndexOutcome::AlreadyCurrent { total_files: 3 }
    );
    assert_eq!(coordinator.status().await.unwrap().phase, IndexPhase::Indexed);
    assert!(coordinator.ensure_indexed().await.unwrap().is_none());
    assert_eq!(provider.batches(), calls);
}
