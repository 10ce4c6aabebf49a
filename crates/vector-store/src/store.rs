use crate::collection::collection_name;
use crate::embeddings::EmbeddingModel;
use crate::error::{Result, VectorStoreError};
use crate::flat_index::FlatIndex;
use crate::types::{
    chunk_key, project_metadata, CollectionStats, MetadataValue, SearchResult, StoredVector,
};
use async_trait::async_trait;
use bugtrace_chunker::Chunk;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const COLLECTION_FILE_NAME: &str = "collection.json";

/// Swappable vector storage backend used by the index coordinator
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store one vector per chunk, keyed by `hash(file + chunk_id)`. `file` is
    /// normalized with [`normalize_path`] before it is stored or hashed.
    /// Returns the number of vectors written.
    fn upsert(&mut self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<usize>;

    /// Remove every vector whose `file` metadata equals the normalized path.
    /// Returns the number removed.
    fn delete_by_file(&mut self, path: &Path) -> usize;

    /// Embed the query and return the `k` nearest chunks, best first
    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>>;

    fn search_by_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>>;

    /// Drop all stored vectors
    fn reset(&mut self);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn stats(&self) -> CollectionStats;

    /// Write the collection to disk
    async fn persist(&self) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize)]
struct CollectionFile {
    collection_name: String,
    project_root: String,
    model_id: String,
    dimension: usize,
    next_seq: u64,
    vectors: Vec<StoredVector>,
}

/// JSON-file vector collection, one per project root
pub struct JsonVectorStore {
    collection_name: String,
    project_root: PathBuf,
    index_dir: PathBuf,
    embedder: Arc<EmbeddingModel>,
    entries: BTreeMap<u64, StoredVector>,
    by_id: HashMap<String, u64>,
    index: FlatIndex,
    next_seq: u64,
}

impl JsonVectorStore {
    /// Open (or start) the collection for `project_root` under `index_dir`.
    ///
    /// A persisted collection built with a different model or dimension is
    /// discarded rather than mixed with new vectors.
    pub async fn open(
        index_dir: impl AsRef<Path>,
        project_root: impl AsRef<Path>,
        embedder: Arc<EmbeddingModel>,
    ) -> Result<Self> {
        let index_dir = index_dir.as_ref().to_path_buf();
        let project_root = project_root.as_ref().to_path_buf();
        let name = collection_name(&project_root);
        let dimension = embedder.dimension();

        let mut store = Self {
            collection_name: name,
            project_root,
            index_dir,
            index: FlatIndex::new(dimension),
            embedder,
            entries: BTreeMap::new(),
            by_id: HashMap::new(),
            next_seq: 0,
        };

        let path = store.collection_path();
        if !path.exists() {
            log::debug!("No persisted collection at {}", path.display());
            return Ok(store);
        }

        let bytes = tokio::fs::read(&path).await?;
        let persisted: CollectionFile = match serde_json::from_slice(&bytes) {
            Ok(file) => file,
            Err(e) => {
                log::warn!(
                    "Ignoring unreadable collection {}: {e}; starting empty",
                    path.display()
                );
                return Ok(store);
            }
        };

        if persisted.dimension != dimension || persisted.model_id != store.embedder.model_id() {
            log::warn!(
                "Collection {} was built with {} ({}d), active model is {} ({}d); starting empty",
                store.collection_name,
                persisted.model_id,
                persisted.dimension,
                store.embedder.model_id(),
                dimension
            );
            return Ok(store);
        }

        for stored in persisted.vectors {
            store.insert(stored)?;
        }
        store.next_seq = store.next_seq.max(persisted.next_seq);

        log::info!(
            "Loaded collection {} ({} chunks)",
            store.collection_name,
            store.entries.len()
        );
        Ok(store)
    }

    #[must_use]
    pub fn collection_name(&self) -> &str {
        &self.collection_name
    }

    #[must_use]
    pub fn collection_dir(&self) -> PathBuf {
        self.index_dir.join(&self.collection_name)
    }

    fn collection_path(&self) -> PathBuf {
        self.collection_dir().join(COLLECTION_FILE_NAME)
    }

    fn insert(&mut self, stored: StoredVector) -> Result<()> {
        if let Some(previous) = self.by_id.remove(&stored.id) {
            self.entries.remove(&previous);
            self.index.remove(previous);
        }
        self.index.add(stored.seq, &stored.vector)?;
        self.next_seq = self.next_seq.max(stored.seq + 1);
        self.by_id.insert(stored.id.clone(), stored.seq);
        self.entries.insert(stored.seq, stored);
        Ok(())
    }
}

#[async_trait]
impl VectorIndex for JsonVectorStore {
    fn upsert(&mut self, chunks: &[Chunk], vectors: Vec<Vec<f32>>) -> Result<usize> {
        if chunks.len() != vectors.len() {
            return Err(VectorStoreError::CountMismatch {
                sent: chunks.len(),
                received: vectors.len(),
            });
        }

        let dimension = self.embedder.dimension();
        if let Some(bad) = vectors.iter().find(|v| v.len() != dimension) {
            return Err(VectorStoreError::InvalidDimension {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let count = chunks.len();
        let mut resolved: HashMap<&str, String> = HashMap::new();
        for (chunk, vector) in chunks.iter().zip(vectors) {
            let file = resolved
                .entry(chunk.metadata.file.as_str())
                .or_insert_with(|| normalize_path(Path::new(&chunk.metadata.file)))
                .clone();
            let mut metadata = project_metadata(chunk);
            metadata.insert("file".to_string(), MetadataValue::Text(file.clone()));
            let stored = StoredVector {
                id: chunk_key(&file, chunk.metadata.chunk_id),
                seq: self.next_seq,
                vector,
                text: chunk.text.clone(),
                metadata,
            };
            self.insert(stored)?;
        }

        log::debug!("Upserted {count} chunks into {}", self.collection_name);
        Ok(count)
    }

    fn delete_by_file(&mut self, path: &Path) -> usize {
        let target = normalize_path(path);
        let doomed: Vec<u64> = self
            .entries
            .iter()
            .filter(|(_, stored)| stored.file() == Some(target.as_str()))
            .map(|(seq, _)| *seq)
            .collect();

        for seq in &doomed {
            if let Some(stored) = self.entries.remove(seq) {
                self.by_id.remove(&stored.id);
            }
            self.index.remove(*seq);
        }

        if !doomed.is_empty() {
            log::debug!("Deleted {} chunks for {target}", doomed.len());
        }
        doomed.len()
    }

    async fn search(&self, query: &str, k: usize) -> Result<Vec<SearchResult>> {
        log::debug!("Searching for: '{}' (limit: {})", query, k);
        if self.entries.is_empty() || k == 0 {
            return Ok(vec![]);
        }

        let query_vector = self.embedder.embed(query).await?;
        let results = self.search_by_vector(&query_vector, k)?;

        log::debug!("Found {} results", results.len());
        Ok(results)
    }

    fn search_by_vector(&self, query: &[f32], k: usize) -> Result<Vec<SearchResult>> {
        let neighbors = self.index.search(query, k)?;
        Ok(neighbors
            .into_iter()
            .filter_map(|(seq, score)| {
                self.entries.get(&seq).map(|stored| SearchResult {
                    text: stored.text.clone(),
                    metadata: stored.metadata.clone(),
                    score,
                })
            })
            .collect())
    }

    fn reset(&mut self) {
        log::info!("Resetting collection {}", self.collection_name);
        self.entries.clear();
        self.by_id.clear();
        self.index.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn stats(&self) -> CollectionStats {
        let files: HashSet<&str> = self.entries.values().filter_map(StoredVector::file).collect();
        CollectionStats {
            collection_name: self.collection_name.clone(),
            total_chunks: self.entries.len(),
            total_files: files.len(),
            index_dir: self.index_dir.clone(),
        }
    }

    async fn persist(&self) -> Result<()> {
        let dir = self.collection_dir();
        tokio::fs::create_dir_all(&dir).await?;

        let file = CollectionFile {
            collection_name: self.collection_name.clone(),
            project_root: self.project_root.to_string_lossy().to_string(),
            model_id: self.embedder.model_id().to_string(),
            dimension: self.embedder.dimension(),
            next_seq: self.next_seq,
            vectors: self.entries.values().cloned().collect(),
        };

        let path = self.collection_path();
        let bytes = serde_json::to_vec(&file)?;
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, bytes).await?;
        tokio::fs::rename(&tmp, &path).await?;

        log::info!(
            "Saved collection {} ({} chunks)",
            self.collection_name,
            self.entries.len()
        );
        Ok(())
    }
}

/// Absolute, resolved form of a path; falls back to lexical absolutization for
/// paths that no longer exist.
pub fn normalize_path(path: &Path) -> String {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}
