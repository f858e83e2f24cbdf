//! Chain Splitter
//!
//! `a; b ; c` runs `a`, then `b`, then `c`, whatever their exit statuses.

const SEPARATOR: char = ';';

/// Splits `line` on `;`, yielding each trimmed, non-empty segment in order.
pub fn split_segments(line: &str) -> impl Iterator<Item = &str> {
    line.split(SEPARATOR)
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
}
