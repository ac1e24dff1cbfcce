//! Interop header front end.
//!
//! Parses the restricted C++ declaration subset produced by foreign-export
//! tooling and builds a [`DeclarationIndex`] for one namespace.

pub mod error;
pub mod index;
pub mod lexer;
pub mod parser;
pub mod types;

pub use error::{HeaderError, Result};
pub use index::DeclarationIndex;
pub use parser::{parse, ParsedHeader, ScopedDeclaration};
