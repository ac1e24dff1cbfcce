//! Fatal generation errors.
//!
//! Problems confined to one declaration or member are reported as
//! [`clrwrap_core::Diagnostic`]s instead and never abort a run.

use clrwrap_header::HeaderError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// The input header could not be read or parsed.
    #[error("parse error: {0}")]
    Parse(#[from] HeaderError),

    /// An option is not usable as a C++ identifier.
    #[error("invalid option `{option}`: `{value}` is not a valid C++ identifier")]
    InvalidOption { option: &'static str, value: String },

    /// A generated file could not be finalised.
    #[error("failed to emit {file}: {message}")]
    Emit { file: String, message: String },
}

pub type Result<T> = std::result::Result<T, GenerationError>;
