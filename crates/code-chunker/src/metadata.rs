//! Language-agnostic signals derived from raw chunk text

use once_cell::sync::Lazy;
use regex::Regex;
use sha2::{Digest, Sha256};

fn compile_regex(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap_or_else(|err| panic!("invalid regex literal {pattern}: {err}"))
}

static ERROR_HANDLING: Lazy<Regex> =
    Lazy::new(|| compile_regex(r"(?i)\b(try|except|catch|finally|rescue)\b"));

static LOGGING: Lazy<Regex> = Lazy::new(|| {
    compile_regex(
        r"(?i)(\blogger\b|\blogging\.|\bprint\s*\(|\bprintln!|console\.(log|warn|error|info|debug)|\blog::|\blog\.(debug|info|warn|warning|error))",
    )
});

static TODO: Lazy<Regex> = Lazy::new(|| compile_regex(r"(?i)\btodo\b"));
static FIXME: Lazy<Regex> = Lazy::new(|| compile_regex(r"(?i)\bfixme\b"));

/// Boolean flags pattern-matched against chunk text
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextSignals {
    pub has_error_handling: bool,
    pub has_logging: bool,
    pub has_todo: bool,
    pub has_fixme: bool,
}

impl TextSignals {
    pub fn detect(text: &str) -> Self {
        Self {
            has_error_handling: ERROR_HANDLING.is_match(text),
            has_logging: LOGGING.is_match(text),
            has_todo: TODO.is_match(text),
            has_fixme: FIXME.is_match(text),
        }
    }
}

/// 1-based inclusive line range of `chunk` within `content`.
///
/// Located by the first occurrence of the chunk text, so a chunk that repeats
/// earlier text inherits the earlier position. Text that cannot be found is
/// attributed to line 1.
pub fn line_range(content: &str, chunk: &str) -> (usize, usize) {
    let start = content
        .find(chunk)
        .map_or(1, |offset| content[..offset].matches('\n').count() + 1);
    let end = start + chunk.matches('\n').count();
    (start, end)
}

/// SHA-256 hex digest of the chunk text
pub fn content_hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    format!("{:x}", hasher.finalize())
}
