//! Intermediate representation between classification and emission.
//!
//! One [`IrType`] per managed type to emit, each holding [`IrNode`]s in
//! emission order. Nodes carry resolved managed and native spellings plus
//! the [`Conversion`]s the emitter renders into bodies, so emission never
//! consults the policy again.

use clrwrap_core::SourceLocation;
use serde::Serialize;

use crate::policy::Conversion;

#[derive(Debug, Clone)]
pub struct WrapperModel {
    pub native_namespace: String,
    pub managed_namespace: String,
    /// File name of the input header, as it should be included.
    pub header_file: String,
    /// Field under which wrappers and adapters keep their native object.
    pub wrapped_object_name: String,
    pub types: Vec<IrType>,
}

impl WrapperModel {
    pub fn types_of(&self, kind: IrTypeKind) -> impl Iterator<Item = &IrType> {
        self.types.iter().filter(move |t| t.kind == kind)
    }

    pub fn get(&self, name: &str) -> Option<&IrType> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Members emitted across all types, enum cases and struct fields included.
    pub fn member_count(&self) -> usize {
        self.types.iter().map(|t| t.nodes.len()).sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IrTypeKind {
    /// `enum class`
    Enum,
    /// `value struct`
    Struct,
    /// `interface class` mirroring a protocol.
    Interface,
    /// `ref class` owning a native object.
    Wrapper,
    /// `ref class` forwarding an interface into a native protocol object.
    Adapter,
}

#[derive(Debug, Clone)]
pub struct IrType {
    pub name: String,
    pub kind: IrTypeKind,
    /// Fully qualified native type (`N::Widget`).
    pub native_name: String,
    /// Qualified managed interfaces this type implements.
    pub implements: Vec<String>,
    /// Enum backing type.
    pub backing: Option<String>,
    /// Interfaces only: a native bridge is emitted for it.
    pub bridgeable: bool,
    pub doc: Option<String>,
    pub location: SourceLocation,
    pub nodes: Vec<IrNode>,
}

impl IrType {
    pub fn new(name: impl Into<String>, kind: IrTypeKind, native_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            native_name: native_name.into(),
            implements: Vec::new(),
            backing: None,
            bridgeable: false,
            doc: None,
            location: SourceLocation::default(),
            nodes: Vec::new(),
        }
    }

    /// Native type of the owned object field.
    pub fn held_type(&self) -> String {
        match self.kind {
            IrTypeKind::Adapter => format!("std::shared_ptr<{}>*", self.native_name),
            _ => format!("{}*", self.native_name),
        }
    }

    /// Expression prefix for calling into the owned object.
    pub fn receiver(&self, field: &str) -> String {
        match self.kind {
            IrTypeKind::Adapter => format!("(*{field})->"),
            _ => format!("{field}->"),
        }
    }

    pub fn owns_native_object(&self) -> bool {
        matches!(self.kind, IrTypeKind::Wrapper | IrTypeKind::Adapter)
    }
}

/// Where a node came from, for diagnostics and verbose trailers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub declaration: String,
    pub member: String,
    pub location: SourceLocation,
}

impl Origin {
    pub fn new(declaration: &str, member: &str, location: SourceLocation) -> Self {
        Self {
            declaration: declaration.to_string(),
            member: member.to_string(),
            location,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrNodeKind {
    /// Internal constructor adopting a native object.
    WrappingConstructor,
    Constructor,
    /// Destructor plus finalizer.
    Destructor,
    Method { is_static: bool },
    /// Static `operator==` comparing the native objects.
    Equality,
    /// Managed property over a public data member.
    Property { read_only: bool, is_static: bool },
    /// Abstract interface requirement.
    Requirement { is_const: bool },
    EnumCase { value: i128 },
    /// Value struct field.
    Field { read_only: bool },
}

#[derive(Debug, Clone)]
pub struct IrParam {
    pub name: String,
    pub managed: String,
    /// Native type of the converted argument.
    pub native: String,
    /// Native parameter as declared, passing style included.
    pub native_decl: String,
    /// Type of the local holding the converted argument.
    pub local_type: String,
    pub moves: bool,
    pub to_native: Conversion,
    /// Only for requirements of bridgeable interfaces.
    pub to_managed: Option<Conversion>,
}

#[derive(Debug, Clone)]
pub struct IrReturn {
    pub managed: String,
    pub native: String,
    pub to_managed: Conversion,
    /// Struct fields and requirements of bridgeable interfaces.
    pub to_native: Option<Conversion>,
}

impl IrReturn {
    pub fn is_void(&self) -> bool {
        self.native == "void"
    }
}

#[derive(Debug, Clone)]
pub struct IrNode {
    pub name: String,
    pub kind: IrNodeKind,
    pub params: Vec<IrParam>,
    pub ret: Option<IrReturn>,
    /// Qualified interface when the node satisfies a requirement.
    pub implements: Option<String>,
    pub doc: Option<String>,
    pub origin: Origin,
}

impl IrNode {
    pub fn new(name: impl Into<String>, kind: IrNodeKind, origin: Origin) -> Self {
        Self {
            name: name.into(),
            kind,
            params: Vec::new(),
            ret: None,
            implements: None,
            doc: None,
            origin,
        }
    }

    /// Managed signature used to detect colliding overloads.
    pub fn signature_key(&self) -> String {
        let params: Vec<&str> = self.params.iter().map(|p| p.managed.as_str()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapters_hold_shared_pointers() {
        let wrapper = IrType::new("Widget", IrTypeKind::Wrapper, "N::Widget");
        assert_eq!(wrapper.held_type(), "N::Widget*");
        assert_eq!(wrapper.receiver("native"), "native->");

        let adapter = IrType::new("DelegateAdapter", IrTypeKind::Adapter, "N::Delegate");
        assert_eq!(adapter.held_type(), "std::shared_ptr<N::Delegate>*");
        assert_eq!(adapter.receiver("native"), "(*native)->");
        assert!(adapter.owns_native_object());
    }

    #[test]
    fn signature_key_ignores_native_spelling() {
        let origin = Origin::new("Widget", "resize", SourceLocation::new(3, 5));
        let mut a = IrNode::new("resize", IrNodeKind::Method { is_static: false }, origin.clone());
        let mut b = IrNode::new("resize", IrNodeKind::Method { is_static: false }, origin);
        for (node, native) in [(&mut a, "int"), (&mut b, "const int&")] {
            node.params.push(IrParam {
                name: "size".into(),
                managed: "int".into(),
                native: "int".into(),
                native_decl: native.into(),
                local_type: "int".into(),
                moves: false,
                to_native: Conversion::Direct,
                to_managed: None,
            });
        }
        assert_eq!(a.signature_key(), "resize(int)");
        assert_eq!(a.signature_key(), b.signature_key());
    }
}
