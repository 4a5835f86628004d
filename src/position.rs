use std::fmt;

/// A 1-based line/column location within a source string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub const fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Advances past one character; a newline moves to the next line.
    pub fn advance(&mut self, ch: char) {
        if ch == '\n' {
            self.advance_newline();
        } else {
            self.column += 1;
        }
    }

    pub fn advance_newline(&mut self) {
        self.line += 1;
        self.column = 1;
    }

    /// Renders the position prefixed with a source name, e.g. `main.lisp:3:7`.
    pub fn with_source(&self, name: &str) -> String {
        format!("{name}:{self}")
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
