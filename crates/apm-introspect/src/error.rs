//! Error types for source introspection

/// Errors when parsing or querying contract source
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// Grammar could not be loaded into the parser
    #[error("parser initialization failed: {0}")]
    ParserInit(String),

    /// Parser gave up without producing a tree
    #[error("parse failed")]
    ParseFailed,

    /// Source is not well-formed; positions are 1-based
    #[error("syntax error at {line}:{column}: {message}")]
    Syntax {
        line: usize,
        column: usize,
        message: String,
    },

    /// Requested contract is not declared in the source
    #[error("contract '{0}' not found in source")]
    ContractNotFound(String),
}

impl ParseError {
    /// Create syntax error from a zero-based tree-sitter position
    pub(crate) fn syntax(point: tree_sitter::Point, message: impl Into<String>) -> Self {
        Self::Syntax {
            line: point.row + 1,
            column: point.column + 1,
            message: message.into(),
        }
    }
}
