use crate::ast_analyzer::AstAnalyzer;
use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::language::Language;
use crate::metadata::{content_hash, line_range, TextSignals};
use crate::splitter::RecursiveSplitter;
use crate::types::{Chunk, ChunkMetadata, ChunkStats};
use std::collections::HashMap;
use std::path::Path;

/// Main chunker interface for processing files
pub struct Chunker {
    config: ChunkerConfig,
    splitters: HashMap<Language, RecursiveSplitter>,
}

impl Chunker {
    /// Create a new chunker, compiling every language's separator hierarchy
    pub fn new(config: ChunkerConfig) -> Result<Self> {
        config.validate()?;

        let mut splitters = HashMap::with_capacity(Language::ALL.len());
        for language in Language::ALL {
            splitters.insert(language, RecursiveSplitter::new(language.separators(), &config)?);
        }

        Ok(Self { config, splitters })
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    /// Split a file's text into ordered chunks with metadata.
    ///
    /// Empty or whitespace-only content yields no chunks. `path` is recorded
    /// verbatim as `metadata.file`.
    pub fn chunk_file(&self, path: &Path, content: &str) -> Result<Vec<Chunk>> {
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }

        let language = Language::from_path(path);
        let splitter = self
            .splitters
            .get(&language)
            .ok_or_else(|| ChunkerError::unsupported_language(language.as_str()))?;

        let pieces = splitter.split_text(content);
        let total = pieces.len();

        let file = path.to_string_lossy().to_string();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();
        let file_type = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        let mut chunks: Vec<Chunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(chunk_id, text)| {
                let (line_start, line_end) = line_range(content, &text);
                let signals = TextSignals::detect(&text);
                let metadata = ChunkMetadata {
                    file: file.clone(),
                    file_name: file_name.clone(),
                    file_type: file_type.clone(),
                    language: language.as_str().to_string(),
                    chunk_id,
                    total_chunks: total,
                    content_hash: content_hash(&text),
                    line_start,
                    line_end,
                    has_error_handling: signals.has_error_handling,
                    has_logging: signals.has_logging,
                    has_todo: signals.has_todo,
                    has_fixme: signals.has_fixme,
                    ..Default::default()
                };
                Chunk::new(text, metadata)
            })
            .collect();

        if self.config.enhance_definitions && language.supports_ast() {
            self.enhance(&mut chunks, content, language, &file);
        }

        log::debug!("Chunked {file} into {total} {} chunks", language.as_str());
        Ok(chunks)
    }

    /// Best effort: a parser failure leaves the chunks as split
    fn enhance(&self, chunks: &mut [Chunk], content: &str, language: Language, file: &str) {
        let result = AstAnalyzer::new(language).and_then(|mut analyzer| {
            let definitions = analyzer.definitions(content)?;
            analyzer.enhance(chunks, &definitions);
            Ok(())
        });

        if let Err(e) = result {
            log::debug!("Skipping definition enhancement for {file}: {e}");
        }
    }

    /// Aggregate size figures for a set of chunks
    #[must_use]
    pub fn stats(chunks: &[Chunk]) -> ChunkStats {
        if chunks.is_empty() {
            return ChunkStats::default();
        }

        let sizes: Vec<usize> = chunks.iter().map(|c| c.text.chars().count()).collect();
        let total_chars: usize = sizes.iter().sum();

        ChunkStats {
            total_chunks: chunks.len(),
            total_lines: chunks.iter().map(Chunk::line_count).sum(),
            total_chars,
            avg_chars: total_chars / chunks.len(),
            min_chars: sizes.iter().copied().min().unwrap_or(0),
            max_chars: sizes.iter().copied().max().unwrap_or(0),
        }
    }
}
