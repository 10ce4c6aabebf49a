//! # Bugtrace Vector Store
//!
//! Embeddings and a persistent per-project vector collection.
//!
//! ## Architecture
//!
//! ```text
//! Chunk[]
//!     │
//!     ├──> EmbeddingModel
//!     │      ├─> OllamaProvider (POST /api/embeddings)
//!     │      └─> StubProvider   (deterministic, offline)
//!     │
//!     ├──> FlatIndex
//!     │      └─> Exact cosine distance search
//!     │
//!     └──> JsonVectorStore
//!            └─> index/<collection>/collection.json
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use bugtrace_vector_store::{EmbedderSettings, EmbeddingModel, JsonVectorStore, VectorIndex};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> bugtrace_vector_store::Result<()> {
//!     let embedder = Arc::new(EmbeddingModel::from_config(&EmbedderSettings::default()).await?);
//!     let store = JsonVectorStore::open("/project/.bugtrace/index", "/project", embedder).await?;
//!
//!     for result in store.search("connection refused retry", 5).await? {
//!         println!("{}: {:.3}", result.file().unwrap_or_default(), result.score);
//!     }
//!     Ok(())
//! }
//! ```

mod collection;
mod embeddings;
mod error;
mod flat_index;
mod store;
mod types;

pub use collection::collection_name;
pub use embeddings::{
    ollama_base_url, EmbedderSettings, EmbeddingMode, EmbeddingModel, EmbeddingProvider,
    OllamaProvider, StubProvider, DEFAULT_EMBEDDING_MODEL, DEFAULT_OLLAMA_HOST, STUB_DIMENSION,
};
pub use error::{Result, VectorStoreError};
pub use flat_index::{cosine_distance, FlatIndex};
pub use store::{normalize_path, JsonVectorStore, VectorIndex};
pub use types::{
    chunk_key, project_metadata, CollectionStats, Metadata, MetadataValue, SearchResult,
    StoredVector,
};
