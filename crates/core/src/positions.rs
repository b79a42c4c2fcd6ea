//! Position types for source text

use serde::{Deserialize, Serialize};
use std::fmt;

/// Line/column position inside a script (both 1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourcePosition {
    pub line: usize,
    pub column: usize,
}

impl SourcePosition {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Position of the first character of a script
    pub const fn start() -> Self {
        Self { line: 1, column: 1 }
    }

    /// Step past `ch`, moving to the next line on a newline
    pub fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advance_columns() {
        let mut pos = SourcePosition::start();
        pos.advance('a');
        pos.advance('b');
        assert_eq!(pos, SourcePosition::new(1, 3));
    }

    #[test]
    fn test_advance_newline() {
        let mut pos = SourcePosition::new(4, 9);
        pos.advance('\n');
        assert_eq!(pos, SourcePosition::new(5, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(SourcePosition::new(3, 7).to_string(), "3:7");
    }
}
