//! Line-boundary text chunker.
//!
//! Splits extracted text into contiguous groups of at most `max_lines`
//! lines. A line ends at `\n` and keeps its terminator, so concatenating
//! the chunks in order reproduces the input exactly.
//!
//! # Example
//!
//! ```rust
//! use contextify_core::chunk::chunk_lines;
//!
//! let chunks = chunk_lines("a\nb\nc\n", 2);
//! assert_eq!(chunks, vec!["a\nb\n".to_string(), "c\n".to_string()]);
//! assert!(chunk_lines("", 2).is_empty());
//! ```

/// Lines per chunk when the configuration does not say otherwise.
pub const DEFAULT_MAX_LINES: usize = 1000;

/// Split `text` into chunks of at most `max_lines` lines.
///
/// - Empty text yields no chunks.
/// - Otherwise the chunk count is `ceil(line_count / max_lines)` and only
///   the last chunk may be shorter.
/// - A `max_lines` of 0 is treated as 1.
pub fn chunk_lines(text: &str, max_lines: usize) -> Vec<String> {
    let max_lines = max_lines.max(1);

    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut lines_in_current = 0usize;

    for line in text.split_inclusive('\n') {
        current.push_str(line);
        lines_in_current += 1;
        if lines_in_current == max_lines {
            chunks.push(std::mem::take(&mut current));
            lines_in_current = 0;
        }
    }

    if !current.is_empty() {
        chunks.push(current);
    }

    chunks
}
