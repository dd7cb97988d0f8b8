use crate::position::Position;
use std::fmt::{Display, Formatter};

/// A syntax error surfaced when the parser engine cannot fully consume the
/// input. Fatal: there is no partial parse tree on this path.
#[derive(Debug, Clone)]
pub struct SyntaxError {
    pub pointer: usize,
    pub position: Position,
    pub line_text: String,
    pub message: String,
}

impl SyntaxError {
    pub fn new(source: &[u8], pointer: usize, message: impl Into<String>) -> Self {
        Self {
            pointer,
            position: Position::at(source, pointer),
            line_text: Position::line_text(source, pointer),
            message: message.into(),
        }
    }
}

impl Display for SyntaxError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.position, self.line_text)?;
        if !self.message.is_empty() {
            write!(f, " ({})", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for SyntaxError {}

/// A failure while rendering the parse tree, PDGs, or invariant templates.
/// Fatal, but distinct from a [SyntaxError]: the input parsed fine, the
/// output tree was ill-formed instead.
#[derive(Debug, Clone)]
pub struct SerializationError {
    pub message: String,
}

impl SerializationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for SerializationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "SerializationError: {}", self.message)
    }
}

impl std::error::Error for SerializationError {}

/// Top-level error returned by the analysis pipeline.
#[derive(Debug, Clone)]
pub enum AnalysisError {
    Syntax(SyntaxError),
    Serialization(SerializationError),
}

impl From<SyntaxError> for AnalysisError {
    fn from(err: SyntaxError) -> Self {
        AnalysisError::Syntax(err)
    }
}

impl From<SerializationError> for AnalysisError {
    fn from(err: SerializationError) -> Self {
        AnalysisError::Serialization(err)
    }
}

impl Display for AnalysisError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisError::Syntax(e) => write!(f, "{}", e),
            AnalysisError::Serialization(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for AnalysisError {}
