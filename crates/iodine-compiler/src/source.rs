//! Source locations attached to AST nodes and emitted instructions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// A position in a source file.
///
/// The file name is shared so cloning a location onto every instruction
/// stays cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// The file the node came from
    pub file: Arc<str>,
    /// 1-based line number
    pub line: u32,
    /// 1-based column number (0 when unknown)
    pub column: u32,
}

impl SourceLocation {
    /// Creates a new location.
    pub fn new(file: impl Into<Arc<str>>, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }

    /// A location for synthesized nodes that have no source text.
    pub fn synthesized() -> Self {
        Self::new("<synthesized>", 0, 0)
    }
}

impl Default for SourceLocation {
    fn default() -> Self {
        Self::synthesized()
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}
