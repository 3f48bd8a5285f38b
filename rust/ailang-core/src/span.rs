use serde::{Deserialize, Serialize};
use std::fmt;

/// A source location: a byte range plus the 1-based line/column of its start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub line: usize,
    pub col: usize,
}

impl Span {
    pub fn new(start: usize, end: usize, line: usize, col: usize) -> Self {
        Span {
            start,
            end,
            line,
            col,
        }
    }

    /// A span with no real position, for synthesized nodes (prelude builtins, etc).
    pub fn dummy() -> Self {
        Span {
            start: 0,
            end: 0,
            line: 0,
            col: 0,
        }
    }

    /// Combine two spans into one covering both, keeping the earlier start position.
    pub fn merge(self, other: Span) -> Span {
        let (line, col) = if self.start <= other.start {
            (self.line, self.col)
        } else {
            (other.line, other.col)
        };
        Span {
            start: self.start.min(other.start),
            end: self.end.max(other.end),
            line,
            col,
        }
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_picks_earlier_start() {
        let a = Span::new(10, 20, 2, 3);
        let b = Span::new(0, 5, 1, 1);
        let m = a.merge(b);
        assert_eq!(m.start, 0);
        assert_eq!(m.end, 20);
        assert_eq!(m.line, 1);
        assert_eq!(m.col, 1);
    }

    #[test]
    fn dummy_has_zero_extent() {
        let d = Span::dummy();
        assert_eq!(d.start, 0);
        assert_eq!(d.end, 0);
    }
}
