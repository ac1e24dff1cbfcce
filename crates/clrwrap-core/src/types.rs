//! Type references as they appear in interop header signatures.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Built-in scalar types of the header language.
///
/// The spelling is preserved exactly so that integer widths survive the
/// translation unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrimitiveKind {
    Void,
    Bool,
    Char,
    SignedChar,
    UnsignedChar,
    Short,
    UnsignedShort,
    Int,
    UnsignedInt,
    Long,
    UnsignedLong,
    LongLong,
    UnsignedLongLong,
    Float,
    Double,
    LongDouble,
    // <cstdint>
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    SizeT,
}

impl PrimitiveKind {
    /// Whether this type is void.
    pub fn is_void(self) -> bool {
        matches!(self, PrimitiveKind::Void)
    }

    /// Whether the type may back an enumeration.
    pub fn is_integral(self) -> bool {
        !matches!(
            self,
            PrimitiveKind::Void
                | PrimitiveKind::Float
                | PrimitiveKind::Double
                | PrimitiveKind::LongDouble
        )
    }

    /// Look up a single-token primitive spelling (`int`, `uint32_t`, ...).
    pub fn from_keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "void" => PrimitiveKind::Void,
            "bool" | "_Bool" => PrimitiveKind::Bool,
            "char" => PrimitiveKind::Char,
            "short" => PrimitiveKind::Short,
            "int" => PrimitiveKind::Int,
            "long" => PrimitiveKind::Long,
            "float" => PrimitiveKind::Float,
            "double" => PrimitiveKind::Double,
            "int8_t" => PrimitiveKind::Int8,
            "int16_t" => PrimitiveKind::Int16,
            "int32_t" => PrimitiveKind::Int32,
            "int64_t" => PrimitiveKind::Int64,
            "uint8_t" => PrimitiveKind::UInt8,
            "uint16_t" => PrimitiveKind::UInt16,
            "uint32_t" => PrimitiveKind::UInt32,
            "uint64_t" => PrimitiveKind::UInt64,
            "size_t" => PrimitiveKind::SizeT,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for PrimitiveKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let spelling = match self {
            PrimitiveKind::Void => "void",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Char => "char",
            PrimitiveKind::SignedChar => "signed char",
            PrimitiveKind::UnsignedChar => "unsigned char",
            PrimitiveKind::Short => "short",
            PrimitiveKind::UnsignedShort => "unsigned short",
            PrimitiveKind::Int => "int",
            PrimitiveKind::UnsignedInt => "unsigned int",
            PrimitiveKind::Long => "long",
            PrimitiveKind::UnsignedLong => "unsigned long",
            PrimitiveKind::LongLong => "long long",
            PrimitiveKind::UnsignedLongLong => "unsigned long long",
            PrimitiveKind::Float => "float",
            PrimitiveKind::Double => "double",
            PrimitiveKind::LongDouble => "long double",
            PrimitiveKind::Int8 => "int8_t",
            PrimitiveKind::Int16 => "int16_t",
            PrimitiveKind::Int32 => "int32_t",
            PrimitiveKind::Int64 => "int64_t",
            PrimitiveKind::UInt8 => "uint8_t",
            PrimitiveKind::UInt16 => "uint16_t",
            PrimitiveKind::UInt32 => "uint32_t",
            PrimitiveKind::UInt64 => "uint64_t",
            PrimitiveKind::SizeT => "size_t",
        };
        f.write_str(spelling)
    }
}

/// How a pointer-sized handle owns its pointee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleForm {
    /// `T *`
    Raw,
    /// `std::shared_ptr<T>`
    Shared,
    /// `std::unique_ptr<T>`
    Unique,
}

/// A type used by a member signature or a stored field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeReference {
    Primitive { primitive: PrimitiveKind },
    /// `std::optional<T>`
    Optional { inner: Box<TypeReference> },
    /// A named type. Names inside the input namespace are unqualified.
    Declared { name: String },
    /// `std::vector<T>`
    Collection { element: Box<TypeReference> },
    /// Pointer-sized native handle. `pointee` is `None` for `void *`.
    Handle {
        form: HandleForm,
        pointee: Option<String>,
    },
}

impl TypeReference {
    pub fn primitive(primitive: PrimitiveKind) -> Self {
        TypeReference::Primitive { primitive }
    }

    pub fn declared(name: impl Into<String>) -> Self {
        TypeReference::Declared { name: name.into() }
    }

    pub fn optional(inner: TypeReference) -> Self {
        TypeReference::Optional {
            inner: Box::new(inner),
        }
    }

    pub fn collection(element: TypeReference) -> Self {
        TypeReference::Collection {
            element: Box::new(element),
        }
    }

    pub fn handle(form: HandleForm, pointee: Option<String>) -> Self {
        TypeReference::Handle { form, pointee }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeReference::Primitive { primitive } if primitive.is_void())
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeReference::Optional { .. })
    }

    pub fn is_handle(&self) -> bool {
        matches!(self, TypeReference::Handle { .. })
    }

    /// Every declared or handle pointee name reachable from this reference.
    pub fn referenced_names(&self) -> Vec<&str> {
        let mut names = Vec::new();
        self.collect_names(&mut names);
        names
    }

    fn collect_names<'a>(&'a self, out: &mut Vec<&'a str>) {
        match self {
            TypeReference::Primitive { .. } => {}
            TypeReference::Optional { inner } => inner.collect_names(out),
            TypeReference::Collection { element } => element.collect_names(out),
            TypeReference::Declared { name } => out.push(name),
            TypeReference::Handle { pointee, .. } => {
                if let Some(name) = pointee {
                    out.push(name);
                }
            }
        }
    }
}

impl fmt::Display for TypeReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeReference::Primitive { primitive } => write!(f, "{primitive}"),
            TypeReference::Optional { inner } => write!(f, "std::optional<{inner}>"),
            TypeReference::Declared { name } => f.write_str(name),
            TypeReference::Collection { element } => write!(f, "std::vector<{element}>"),
            TypeReference::Handle { form, pointee } => {
                let pointee = pointee.as_deref().unwrap_or("void");
                match form {
                    HandleForm::Raw => write!(f, "{pointee} *"),
                    HandleForm::Shared => write!(f, "std::shared_ptr<{pointee}>"),
                    HandleForm::Unique => write!(f, "std::unique_ptr<{pointee}>"),
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_spelling_roundtrips_single_keywords() {
        for word in ["int", "bool", "double", "uint64_t", "size_t", "int8_t"] {
            let kind = PrimitiveKind::from_keyword(word).unwrap();
            assert_eq!(kind.to_string(), word);
        }
        assert!(PrimitiveKind::from_keyword("string").is_none());
    }

    #[test]
    fn integral_excludes_floating_and_void() {
        assert!(PrimitiveKind::UInt8.is_integral());
        assert!(PrimitiveKind::Bool.is_integral());
        assert!(!PrimitiveKind::Double.is_integral());
        assert!(!PrimitiveKind::Void.is_integral());
    }

    #[test]
    fn display_nested_reference() {
        let ty = TypeReference::optional(TypeReference::collection(TypeReference::declared(
            "Widget",
        )));
        assert_eq!(ty.to_string(), "std::optional<std::vector<Widget>>");

        let handle = TypeReference::handle(HandleForm::Shared, Some("Impl".into()));
        assert_eq!(handle.to_string(), "std::shared_ptr<Impl>");
        assert_eq!(TypeReference::handle(HandleForm::Raw, None).to_string(), "void *");
    }

    #[test]
    fn referenced_names_walks_wrappers() {
        let ty = TypeReference::collection(TypeReference::optional(TypeReference::declared(
            "Mode",
        )));
        assert_eq!(ty.referenced_names(), vec!["Mode"]);
        assert!(TypeReference::primitive(PrimitiveKind::Int)
            .referenced_names()
            .is_empty());
    }
}
