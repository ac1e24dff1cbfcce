//! Shared data model for clrwrap.
//!
//! The header front end produces [`Declaration`]s, the code generator consumes
//! them and reports [`Diagnostic`]s alongside the [`GeneratedFile`]s it emits.

pub mod diagnostic;
pub mod file;
pub mod model;
pub mod types;

pub use diagnostic::{sort_by_location, Diagnostic, DiagnosticKind};
pub use file::{content_digest, digest_hex, FileKind, GeneratedFile};
pub use model::{
    Access, Declaration, DeclKeyword, EnumCase, EnumValue, Member, Method, MethodKind, Parameter,
    Passing, Property, SourceLocation,
};
pub use types::{HandleForm, PrimitiveKind, TypeReference};
