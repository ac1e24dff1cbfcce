//! Managed C++/CLI wrapper generation for unmanaged interop headers.
//!
//! [`execute`] runs the whole pipeline: the header's declarations are
//! classified into enums, value structs, protocols and classes, mapped into
//! a wrapper model and rendered as one declaration and one definition file.

pub mod builder;
pub mod classify;
pub mod emit;
pub mod error;
pub mod ir;
pub mod pipeline;
pub mod platform;
pub mod policy;
pub mod report;

pub use classify::{classify, Classification, ClassifiedDeclaration, ConstructKind};
pub use error::{GenerationError, Result};
pub use pipeline::{
    execute, execute_source, GenerateOptions, GenerationOutput, DEFAULT_WRAPPED_OBJECT_NAME,
};
pub use platform::PlatformProfile;
pub use report::GenerationReport;
