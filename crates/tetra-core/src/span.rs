//! Source location tracking for diagnostics.
//!
//! A [`Span`] records the start and end [`Position`] of a syntax node so a
//! diagnostic can be reported as a (kind, message, start, end) record.

use std::fmt;

/// A line/column position in source text (both 1-indexed).
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    #[inline]
    pub const fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }
}

impl fmt::Debug for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// A region of source code delimited by a start and an end position.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// Create a span covering `start..end`.
    #[inline]
    pub const fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a single-line span starting at `line:col` covering `len` columns.
    #[inline]
    pub const fn on_line(line: u32, col: u32, len: u32) -> Self {
        Self {
            start: Position::new(line, col),
            end: Position::new(line, col + len),
        }
    }

    /// Create a zero-width span at a position.
    #[inline]
    pub const fn point(line: u32, col: u32) -> Self {
        Self::on_line(line, col, 0)
    }

    /// Whether the span covers no source text.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Smallest span covering both `self` and `other`.
    #[inline]
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }
}

impl fmt::Debug for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}-{:?}", self.start, self.end)
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.start)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn on_line_sets_end_column() {
        let span = Span::on_line(3, 5, 4);
        assert_eq!(span.start, Position::new(3, 5));
        assert_eq!(span.end, Position::new(3, 9));
        assert!(!span.is_empty());
    }

    #[test]
    fn point_is_empty() {
        assert!(Span::point(1, 1).is_empty());
    }

    #[test]
    fn merge_covers_both_regardless_of_order() {
        let a = Span::on_line(1, 10, 3);
        let b = Span::on_line(2, 1, 5);
        let merged = b.merge(a);
        assert_eq!(merged.start, Position::new(1, 10));
        assert_eq!(merged.end, Position::new(2, 6));
    }

    #[test]
    fn display_shows_start() {
        assert_eq!(format!("{}", Span::on_line(7, 2, 1)), "7:2");
        assert_eq!(format!("{:?}", Span::on_line(7, 2, 1)), "7:2-7:3");
    }
}
