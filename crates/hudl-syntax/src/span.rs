//! Byte spans and line/column conversion.

use serde::Serialize;

/// A half-open byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// A zero-width span at the given offset.
    pub fn point(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    /// The smallest span covering both `self` and `other`.
    pub fn merge(self, other: Span) -> Span {
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
        }
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// 1-based line and column, as reported in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LineCol {
    pub line: u32,
    pub column: u32,
}

impl LineCol {
    /// Resolve a byte offset against the source it was produced from.
    ///
    /// Offsets past the end of the text resolve to the final position.
    ///
    /// # Examples
    ///
    /// ```
    /// use hudl_syntax::LineCol;
    ///
    /// let pos = LineCol::of("ab\ncd", 3);
    /// assert_eq!((pos.line, pos.column), (2, 1));
    /// ```
    pub fn of(source: &str, offset: usize) -> LineCol {
        let mut line = 1u32;
        let mut column = 1u32;
        for (i, ch) in source.char_indices() {
            if i >= offset {
                break;
            }
            if ch == '\n' {
                line += 1;
                column = 1;
            } else {
                column += 1;
            }
        }
        LineCol { line, column }
    }
}

impl std::fmt::Display for LineCol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_covers_both() {
        let a = Span::new(3, 7);
        let b = Span::new(5, 12);
        assert_eq!(a.merge(b), Span::new(3, 12));
    }

    #[test]
    fn line_col_start() {
        let pos = LineCol::of("hello", 0);
        assert_eq!((pos.line, pos.column), (1, 1));
    }

    #[test]
    fn line_col_multiline() {
        let src = "one\ntwo\nthree";
        let offset = src.find("three").unwrap();
        let pos = LineCol::of(src, offset);
        assert_eq!((pos.line, pos.column), (3, 1));
    }

    #[test]
    fn line_col_past_end() {
        let pos = LineCol::of("ab", 99);
        assert_eq!((pos.line, pos.column), (1, 3));
    }
}
