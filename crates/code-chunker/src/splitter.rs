use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::language::Separator;
use regex::Regex;

/// Separator compiled for matching. `None` splits into characters.
#[derive(Debug, Clone)]
struct CompiledSeparator {
    regex: Option<Regex>,
}

impl CompiledSeparator {
    fn compile(separator: Separator) -> Result<Self> {
        if separator.is_character_split() {
            return Ok(Self { regex: None });
        }
        let source = separator.regex_source();
        let regex = Regex::new(&source).map_err(|e| ChunkerError::InvalidSeparator {
            pattern: source.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { regex: Some(regex) })
    }

    fn is_present(&self, text: &str) -> bool {
        self.regex.as_ref().map_or(true, |re| re.is_match(text))
    }

    /// Split `text`, keeping each matched separator at the start of the piece it opens.
    /// Empty pieces are dropped.
    fn split<'a>(&self, text: &'a str) -> Vec<&'a str> {
        let Some(regex) = &self.regex else {
            return text
                .char_indices()
                .map(|(idx, ch)| &text[idx..idx + ch.len_utf8()])
                .collect();
        };

        let mut pieces = Vec::new();
        let mut start = 0;
        for found in regex.find_iter(text) {
            if found.start() > start {
                pieces.push(&text[start..found.start()]);
            }
            start = found.start();
        }
        if start < text.len() {
            pieces.push(&text[start..]);
        }
        pieces.retain(|piece| !piece.is_empty());
        pieces
    }
}

/// Recursive separator-hierarchy splitter with character-counted size and overlap
#[derive(Debug, Clone)]
pub struct RecursiveSplitter {
    separators: Vec<CompiledSeparator>,
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveSplitter {
    pub fn new(separators: &[Separator], config: &ChunkerConfig) -> Result<Self> {
        config.validate()?;
        let separators = separators
            .iter()
            .map(|sep| CompiledSeparator::compile(*sep))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            separators,
            chunk_size: config.chunk_size,
            chunk_overlap: config.chunk_overlap,
        })
    }

    /// Split text into trimmed, non-empty segments
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
            .into_iter()
            .filter_map(|piece| {
                let trimmed = piece.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            })
            .collect()
    }

    fn split_recursive(&self, text: &str, separators: &[CompiledSeparator]) -> Vec<String> {
        // First separator present in the text wins; the character split always matches
        let (separator, remaining) = match separators
            .iter()
            .position(|sep| sep.is_present(text))
        {
            Some(idx) => (&separators[idx], &separators[idx + 1..]),
            None => match separators.last() {
                Some(last) => (last, &separators[separators.len()..]),
                None => return vec![text.to_string()],
            },
        };

        let mut chunks = Vec::new();
        let mut good: Vec<&str> = Vec::new();

        for piece in separator.split(text) {
            if char_len(piece) < self.chunk_size {
                good.push(piece);
                continue;
            }

            if !good.is_empty() {
                chunks.extend(self.merge(&good));
                good.clear();
            }

            if remaining.is_empty() {
                chunks.push(piece.to_string());
            } else {
                chunks.extend(self.split_recursive(piece, remaining));
            }
        }

        if !good.is_empty() {
            chunks.extend(self.merge(&good));
        }

        chunks
    }

    /// Greedily pack pieces up to `chunk_size`, carrying at most `chunk_overlap`
    /// characters of trailing pieces into the next chunk.
    fn merge(&self, pieces: &[&str]) -> Vec<String> {
        let mut docs = Vec::new();
        let mut window: Vec<&str> = Vec::new();
        let mut head = 0;
        let mut total = 0;

        for piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    log::warn!(
                        "Created a chunk of {} characters, longer than the configured {}",
                        total,
                        self.chunk_size
                    );
                }

                if head < window.len() {
                    if let Some(doc) = join(&window[head..]) {
                        docs.push(doc);
                    }

                    while head < window.len()
                        && (total > self.chunk_overlap || total + len > self.chunk_size)
                    {
                        total -= char_len(window[head]);
                        head += 1;
                    }
                }
            }

            window.push(piece);
            total += len;
        }

        if let Some(doc) = join(&window[head..]) {
            docs.push(doc);
        }

        docs
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn join(pieces: &[&str]) -> Option<String> {
    let joined: String = pieces.concat();
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}
