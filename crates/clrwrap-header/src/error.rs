//! Header front-end error types.

use std::path::PathBuf;

/// Errors that stop the front end. There is no partial recovery: a header
/// either parses completely or not at all.
#[derive(Debug, thiserror::Error)]
pub enum HeaderError {
    /// The header file could not be read.
    #[error("cannot read header {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The header does not match the accepted declaration grammar.
    #[error("syntax error at {line}:{column}: {detail}")]
    Syntax {
        line: u32,
        column: u32,
        detail: String,
    },

    /// The namespace argument is not a `::`-separated identifier path.
    #[error("invalid namespace `{0}`")]
    InvalidNamespace(String),
}

/// Result type alias for front-end operations.
pub type Result<T> = std::result::Result<T, HeaderError>;
