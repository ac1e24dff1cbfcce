//! Declarations recovered from an interop header.
//!
//! A [`Declaration`] is one top-level entity found directly inside the input
//! namespace. It is immutable once the front end has produced it.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::TypeReference;

/// Line and column (both 1-based) of a declaration or member name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: u32,
    pub column: u32,
}

impl SourceLocation {
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// The keyword that introduced a top-level declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeclKeyword {
    Class,
    Struct,
    Union,
    Enum,
    /// Free function at namespace scope.
    Function,
    /// Variable at namespace scope.
    Variable,
    /// `typedef` or `using` alias.
    Alias,
}

impl DeclKeyword {
    /// Whether the declaration is a `class` or `struct` body.
    pub fn is_aggregate(self) -> bool {
        matches!(self, DeclKeyword::Class | DeclKeyword::Struct)
    }
}

impl fmt::Display for DeclKeyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DeclKeyword::Class => "class",
            DeclKeyword::Struct => "struct",
            DeclKeyword::Union => "union",
            DeclKeyword::Enum => "enum",
            DeclKeyword::Function => "function",
            DeclKeyword::Variable => "variable",
            DeclKeyword::Alias => "alias",
        };
        f.write_str(s)
    }
}

/// Member access level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    Public,
    Protected,
    Private,
}

/// A top-level declaration inside the input namespace.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub name: String,
    pub keyword: DeclKeyword,
    pub location: SourceLocation,
    /// Base classes, normalised the same way as type names.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bases: Vec<String>,
    /// Declared under a `template <...>` prefix.
    #[serde(default)]
    pub is_template: bool,
    /// Enum backing type, when spelled out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backing: Option<TypeReference>,
    pub members: Vec<Member>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl Declaration {
    pub fn new(name: impl Into<String>, keyword: DeclKeyword, location: SourceLocation) -> Self {
        Self {
            name: name.into(),
            keyword,
            location,
            bases: Vec::new(),
            is_template: false,
            backing: None,
            members: Vec::new(),
            doc: None,
        }
    }

    /// Non-static data members, in declaration order.
    pub fn stored_fields(&self) -> impl Iterator<Item = &Property> {
        self.members.iter().filter_map(|m| match m {
            Member::Property(p) if !p.is_static => Some(p),
            _ => None,
        })
    }

    pub fn methods(&self) -> impl Iterator<Item = &Method> {
        self.members.iter().filter_map(|m| match m {
            Member::Method(method) => Some(method),
            _ => None,
        })
    }

    pub fn cases(&self) -> impl Iterator<Item = &EnumCase> {
        self.members.iter().filter_map(|m| match m {
            Member::EnumCase(case) => Some(case),
            _ => None,
        })
    }
}

/// One member of a declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "member", rename_all = "snake_case")]
pub enum Member {
    Method(Method),
    /// Data member.
    Property(Property),
    EnumCase(EnumCase),
    /// A member the front end recognised but cannot represent (nested type,
    /// array field, bit-field, ...).
    Other {
        name: String,
        reason: String,
        location: SourceLocation,
    },
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Method(m) => &m.name,
            Member::Property(p) => &p.name,
            Member::EnumCase(c) => &c.name,
            Member::Other { name, .. } => name,
        }
    }

    pub fn location(&self) -> SourceLocation {
        match self {
            Member::Method(m) => m.location,
            Member::Property(p) => p.location,
            Member::EnumCase(c) => c.location,
            Member::Other { location, .. } => *location,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MethodKind {
    Instance,
    Static,
    Constructor,
    Destructor,
    /// Overloaded operator; the method name holds the full `operator==` spelling.
    Operator,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub kind: MethodKind,
    pub params: Vec<Parameter>,
    /// `void` for constructors and destructors.
    pub return_type: TypeReference,
    /// `T &` and `const T &` results.
    #[serde(default)]
    pub return_passing: Passing,
    pub is_const: bool,
    pub is_virtual: bool,
    /// `= 0`
    pub is_pure: bool,
    /// `= delete`
    #[serde(default)]
    pub is_deleted: bool,
    pub access: Access,
    pub location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

impl Method {
    /// Constructors, destructors and operators are not ordinary methods.
    pub fn is_special(&self) -> bool {
        matches!(
            self.kind,
            MethodKind::Constructor | MethodKind::Destructor | MethodKind::Operator
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Passing {
    #[default]
    Value,
    /// `const T &`
    ConstRef,
    /// `T &`
    Ref,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeReference,
    pub passing: Passing,
}

impl Parameter {
    /// Whether the argument may be absent on the managed side.
    pub fn is_optional(&self) -> bool {
        self.ty.is_optional()
    }
}

/// A data member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub ty: TypeReference,
    pub read_only: bool,
    pub is_static: bool,
    pub access: Access,
    pub location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", content = "value", rename_all = "snake_case")]
pub enum EnumValue {
    /// No initializer; previous value plus one.
    Implicit,
    /// Wide enough for every `int64_t` and `uint64_t` value.
    Literal(i128),
    /// Any initializer that is not an integer literal, as written.
    Expression(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumCase {
    pub name: String,
    pub value: EnumValue,
    pub location: SourceLocation,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,
}
