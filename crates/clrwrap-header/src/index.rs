//! The Declaration Index: every declaration found directly inside one
//! namespace of a header, in source order.

use std::path::{Path, PathBuf};

use clrwrap_core::{Declaration, Member, TypeReference};

use crate::error::{HeaderError, Result};
use crate::parser::parse;

/// Owns the header text for the duration of one parse.
struct ParseSession {
    path: PathBuf,
    source: String,
}

impl ParseSession {
    fn open(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path).map_err(|source| HeaderError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            source,
        })
    }

    fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

#[derive(Debug, Clone)]
pub struct DeclarationIndex {
    namespace: String,
    file_name: String,
    namespace_found: bool,
    declarations: Vec<Declaration>,
}

impl DeclarationIndex {
    /// Read and parse `path`, keeping the declarations of `namespace`.
    pub fn load(path: &Path, namespace: &str) -> Result<Self> {
        let session = ParseSession::open(path)?;
        Self::parse(&session.source, &session.file_name(), namespace)
    }

    /// Parse in-memory header text. `file_name` is what generated code
    /// uses to include the header.
    pub fn parse(source: &str, file_name: &str, namespace: &str) -> Result<Self> {
        let namespace = normalize_namespace(namespace)?;
        let parsed = parse(source)?;

        let namespace_found = parsed.namespaces.contains(&namespace);
        let declarations: Vec<Declaration> = parsed
            .declarations
            .into_iter()
            .filter(|d| d.namespace == namespace)
            .map(|d| normalize_declaration(d.declaration, &namespace))
            .collect();

        if declarations.is_empty() {
            log::warn!("no declarations found in namespace `{namespace}` of {file_name}");
        } else {
            log::debug!(
                "indexed {} declarations from namespace `{namespace}` of {file_name}",
                declarations.len()
            );
        }

        Ok(Self {
            namespace,
            file_name: file_name.to_string(),
            namespace_found,
            declarations,
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// File name of the parsed header, without directories.
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Whether the namespace occurs in the header at all.
    pub fn namespace_found(&self) -> bool {
        self.namespace_found
    }

    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    pub fn get(&self, name: &str) -> Option<&Declaration> {
        self.declarations.iter().find(|d| d.name == name)
    }

    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }
}

fn normalize_namespace(namespace: &str) -> Result<String> {
    let trimmed = namespace.trim().trim_start_matches("::");
    let valid = !trimmed.is_empty()
        && trimmed.split("::").all(|part| {
            let mut chars = part.chars();
            matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_')
        });
    if valid {
        Ok(trimmed.to_string())
    } else {
        Err(HeaderError::InvalidNamespace(namespace.to_string()))
    }
}

/// Strip a leading `::` and the input namespace qualifier from a name.
pub(crate) fn normalize_name(name: &str, namespace: &str) -> String {
    let name = name.strip_prefix("::").unwrap_or(name);
    name.strip_prefix(namespace)
        .and_then(|rest| rest.strip_prefix("::"))
        .unwrap_or(name)
        .to_string()
}

fn normalize_type(ty: &mut TypeReference, namespace: &str) {
    match ty {
        TypeReference::Primitive { .. } => {}
        TypeReference::Optional { inner } => normalize_type(inner, namespace),
        TypeReference::Collection { element } => normalize_type(element, namespace),
        TypeReference::Declared { name } => *name = normalize_name(name, namespace),
        TypeReference::Handle { pointee, .. } => {
            if let Some(name) = pointee {
                *name = normalize_name(name, namespace);
            }
        }
    }
}

fn normalize_declaration(mut decl: Declaration, namespace: &str) -> Declaration {
    for base in &mut decl.bases {
        *base = normalize_name(base, namespace);
    }
    for member in &mut decl.members {
        match member {
            Member::Method(method) => {
                normalize_type(&mut method.return_type, namespace);
                for param in &mut method.params {
                    normalize_type(&mut param.ty, namespace);
                }
            }
            Member::Property(property) => normalize_type(&mut property.ty, namespace),
            Member::EnumCase(_) | Member::Other { .. } => {}
        }
    }
    decl
}

#[cfg(test)]
mod tests {
    use super::*;
    use clrwrap_core::{DeclKeyword, HandleForm};
    use std::io::Write;

    const HEADER: &str = "\
#pragma once
#include <optional>

namespace Other { class Widget; }

namespace N {
class Widget;

enum class Mode : int { a = 0, b = 1 };

class Widget {
public:
    std::shared_ptr<Other::Widget> impl;
    N::Mode getMode() const;
    std::optional<::N::Widget> sibling();
};
}

namespace Elsewhere { struct Ignored { int x; }; }
";

    #[test]
    fn keeps_only_requested_namespace_in_order() {
        let index = DeclarationIndex::parse(HEADER, "Unmanaged.hpp", "N").unwrap();
        let names: Vec<_> = index.declarations().iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["Mode", "Widget"]);
        assert_eq!(index.get("Mode").unwrap().keyword, DeclKeyword::Enum);
        assert!(index.namespace_found());
        assert_eq!(index.file_name(), "Unmanaged.hpp");
    }

    #[test]
    fn names_inside_the_namespace_are_unqualified() {
        let index = DeclarationIndex::parse(HEADER, "Unmanaged.hpp", "::N").unwrap();
        let widget = index.get("Widget").unwrap();
        let methods: Vec<_> = widget.methods().collect();
        assert_eq!(methods[0].return_type, TypeReference::declared("Mode"));
        assert_eq!(
            methods[1].return_type,
            TypeReference::optional(TypeReference::declared("Widget"))
        );
        let field = widget.stored_fields().next().unwrap();
        assert_eq!(
            field.ty,
            TypeReference::handle(HandleForm::Shared, Some("Other::Widget".into()))
        );
    }

    #[test]
    fn missing_namespace_yields_empty_index() {
        let index = DeclarationIndex::parse(HEADER, "Unmanaged.hpp", "Absent").unwrap();
        assert!(index.is_empty());
        assert!(!index.namespace_found());
    }

    #[test]
    fn invalid_namespace_is_rejected() {
        assert!(matches!(
            DeclarationIndex::parse(HEADER, "h", "N::"),
            Err(HeaderError::InvalidNamespace(_))
        ));
        assert!(DeclarationIndex::parse(HEADER, "h", "").is_err());
    }

    #[test]
    fn load_reads_from_disk() {
        let mut file = tempfile::Builder::new().suffix(".hpp").tempfile().unwrap();
        file.write_all(HEADER.as_bytes()).unwrap();
        let index = DeclarationIndex::load(file.path(), "N").unwrap();
        assert_eq!(index.len(), 2);
        assert!(index.file_name().ends_with(".hpp"));
    }

    #[test]
    fn load_reports_unreadable_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = DeclarationIndex::load(&dir.path().join("missing.hpp"), "N").unwrap_err();
        assert!(matches!(err, HeaderError::Io { .. }));
    }

    #[test]
    fn syntax_error_fails_whole_parse() {
        let err = DeclarationIndex::parse("namespace N { class W { int x; ", "h", "N").unwrap_err();
        assert!(matches!(err, HeaderError::Syntax { .. }));
    }

    #[test]
    fn normalize_name_only_strips_exact_namespace() {
        assert_eq!(normalize_name("N::Mode", "N"), "Mode");
        assert_eq!(normalize_name("::N::Mode", "N"), "Mode");
        assert_eq!(normalize_name("NX::Mode", "N"), "NX::Mode");
        assert_eq!(normalize_name("std::string", "N"), "std::string");
    }
}
