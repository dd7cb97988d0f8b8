use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
/// The line and column information at a byte offset into the source.
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    /// Create a new Position object based on the line and column number.
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Compute the 1-based line/column of `pointer` within `source`.
    pub fn at(source: &[u8], pointer: usize) -> Self {
        let bound = pointer.min(source.len());
        let mut line = 1usize;
        let mut last_newline: Option<usize> = None;
        for (i, c) in source[..bound].iter().enumerate() {
            if *c == b'\n' {
                line += 1;
                last_newline = Some(i);
            }
        }
        let column = match last_newline {
            Some(nl) => bound - nl,
            None => bound + 1,
        };
        Position::new(line, column)
    }

    /// The text of the line containing `pointer`, without its trailing newline.
    pub fn line_text(source: &[u8], pointer: usize) -> String {
        let bound = pointer.min(source.len());
        let start = source[..bound]
            .iter()
            .rposition(|c| *c == b'\n')
            .map(|i| i + 1)
            .unwrap_or(0);
        let end = source[bound..]
            .iter()
            .position(|c| *c == b'\n')
            .map(|i| bound + i)
            .unwrap_or(source.len());
        String::from_utf8_lossy(&source[start..end]).into_owned()
    }
}

impl Display for Position {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}
