//! # Bugtrace Chunker
//!
//! Language-aware splitting of source files into overlapping chunks for
//! embedding, plus per-chunk metadata.
//!
//! ## Architecture
//!
//! ```text
//! File text
//!     │
//!     ├──> Language Detection (from extension)
//!     │
//!     ├──> Recursive separator splitting
//!     │    ├─> First separator present in the text is used
//!     │    ├─> Oversized pieces recurse into finer separators
//!     │    └─> Pieces are merged up to chunk_size with chunk_overlap carry-over
//!     │
//!     ├──> Metadata (line range, error handling / logging / TODO / FIXME flags)
//!     │
//!     └──> Definition enhancement (Tree-sitter, Python / Rust / JS / TS)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use bugtrace_chunker::{Chunker, ChunkerConfig};
//! use std::path::Path;
//!
//! let chunker = Chunker::new(ChunkerConfig::default()).unwrap();
//!
//! let code = "def process(data):\n    try:\n        return data.strip()\n    except AttributeError:\n        return None\n";
//!
//! let chunks = chunker.chunk_file(Path::new("/project/example.py"), code).unwrap();
//! for chunk in &chunks {
//!     println!(
//!         "Chunk at lines {}-{}: {}",
//!         chunk.metadata.line_start,
//!         chunk.metadata.line_end,
//!         chunk.metadata.function_name.as_deref().unwrap_or_default()
//!     );
//! }
//! assert!(chunks[0].metadata.has_error_handling);
//! ```

mod ast_analyzer;
mod chunker;
mod config;
mod error;
mod language;
mod metadata;
mod splitter;
mod types;

pub use ast_analyzer::{AstAnalyzer, Definition};
pub use chunker::Chunker;
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use language::{Language, Separator};
pub use types::{Chunk, ChunkMetadata, ChunkStats, DefinitionKind};
