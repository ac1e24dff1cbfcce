//! Non-fatal problems reported while translating a header.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::model::SourceLocation;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// A declaration or member with no supported managed shape. It is
    /// excluded from the output.
    UnsupportedConstruct,
    /// A member signature references a type the mapping policy cannot
    /// resolve. The member is dropped; its owner is still emitted.
    UnresolvedType,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::UnsupportedConstruct => f.write_str("unsupported construct"),
            DiagnosticKind::UnresolvedType => f.write_str("unresolved type"),
        }
    }
}

/// A diagnostic attached to a declaration (`Widget`) or one of its members
/// (`Widget::frob`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub subject: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<SourceLocation>,
}

impl Diagnostic {
    pub fn unsupported(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::UnsupportedConstruct,
            subject: subject.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn unresolved(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: DiagnosticKind::UnresolvedType,
            subject: subject.into(),
            message: message.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }
}

/// Order diagnostics the way they appear in the header. Ones without a
/// location keep their relative order and go last.
pub fn sort_by_location(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| (d.location.is_none(), d.location));
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.location {
            Some(loc) => write!(f, "{} `{}` at {}: {}", self.kind, self.subject, loc, self.message),
            None => write!(f, "{} `{}`: {}", self.kind, self.subject, self.message),
        }
    }
}
