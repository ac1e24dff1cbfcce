//! Symbol classification: decide which managed construct each declaration
//! becomes, or exclude it with a diagnostic.

use std::collections::BTreeMap;
use std::fmt;

use clrwrap_core::{
    sort_by_location, DeclKeyword, Declaration, Diagnostic, EnumValue, MethodKind, TypeReference,
};
use clrwrap_header::DeclarationIndex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstructKind {
    Enum,
    Struct,
    Protocol,
    Class,
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstructKind::Enum => "enum",
            ConstructKind::Struct => "struct",
            ConstructKind::Protocol => "protocol",
            ConstructKind::Class => "class",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedDeclaration {
    pub kind: ConstructKind,
    pub declaration: Declaration,
    /// Field holding the native object, for classes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub handle_field: Option<String>,
    /// Resolved enumerator values, aligned with `declaration.cases()`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub case_values: Vec<i128>,
}

impl ClassifiedDeclaration {
    pub fn name(&self) -> &str {
        &self.declaration.name
    }
}

/// Result of classifying a whole index.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Classification {
    pub declarations: Vec<ClassifiedDeclaration>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Classification {
    pub fn get(&self, name: &str) -> Option<&ClassifiedDeclaration> {
        self.declarations.iter().find(|d| d.name() == name)
    }

    pub fn kind_of(&self, name: &str) -> Option<ConstructKind> {
        self.get(name).map(|d| d.kind)
    }
}

/// Classify every declaration of the index, in source order.
pub fn classify(index: &DeclarationIndex) -> Classification {
    let mut result = Classification::default();
    let mut first_seen: BTreeMap<&str, &Declaration> = BTreeMap::new();

    for decl in index.declarations() {
        if let Some(first) = first_seen.get(decl.name.as_str()) {
            result.diagnostics.push(
                Diagnostic::unsupported(
                    &decl.name,
                    format!("duplicate definition (first defined at {})", first.location),
                )
                .at(decl.location),
            );
            continue;
        }
        first_seen.insert(&decl.name, decl);

        match classify_one(decl) {
            Ok(classified) => {
                log::debug!("classified `{}` as {}", decl.name, classified.kind);
                result.declarations.push(classified);
            }
            Err(reason) => {
                log::debug!("excluded `{}`: {reason}", decl.name);
                result
                    .diagnostics
                    .push(Diagnostic::unsupported(&decl.name, reason).at(decl.location));
            }
        }
    }

    reject_non_protocol_bases(&mut result);
    sort_by_location(&mut result.diagnostics);
    result
}

fn classify_one(decl: &Declaration) -> Result<ClassifiedDeclaration, String> {
    if decl.is_template {
        return Err("templates have no managed equivalent".into());
    }
    match decl.keyword {
        DeclKeyword::Enum => classify_enum(decl),
        DeclKeyword::Class | DeclKeyword::Struct => classify_aggregate(decl),
        DeclKeyword::Union => Err("unions have no managed equivalent".into()),
        DeclKeyword::Function => Err("free functions are not wrapped".into()),
        DeclKeyword::Variable => Err("namespace-scope variables are not wrapped".into()),
        DeclKeyword::Alias => Err("type aliases are not wrapped".into()),
    }
}

fn classify_enum(decl: &Declaration) -> Result<ClassifiedDeclaration, String> {
    match &decl.backing {
        None => {}
        Some(TypeReference::Primitive { primitive }) if primitive.is_integral() => {}
        Some(other) => return Err(format!("backing type `{other}` is not integral")),
    }

    let mut values = Vec::new();
    let range = i128::from(i64::MIN)..=i128::from(u64::MAX);
    let mut next = 0i128;
    for case in decl.cases() {
        let value = match &case.value {
            EnumValue::Literal(v) => *v,
            EnumValue::Implicit => next,
            EnumValue::Expression(text) => {
                return Err(format!(
                    "enumerator `{}` = `{text}` is not an integer literal",
                    case.name
                ))
            }
        };
        if !range.contains(&value) {
            return Err(format!("enumerator `{}` = {value} does not fit in 64 bits", case.name));
        }
        values.push(value);
        next = value + 1;
    }

    Ok(ClassifiedDeclaration {
        kind: ConstructKind::Enum,
        declaration: decl.clone(),
        handle_field: None,
        case_values: values,
    })
}

fn classify_aggregate(decl: &Declaration) -> Result<ClassifiedDeclaration, String> {
    let fields: Vec<_> = decl.stored_fields().collect();
    let handles: Vec<_> = fields.iter().filter(|f| f.ty.is_handle()).collect();
    let methods: Vec<_> = decl.methods().filter(|m| !m.is_deleted).collect();
    let has_pure = methods.iter().any(|m| m.is_pure);
    let ordinary: Vec<_> = methods
        .iter()
        .filter(|m| matches!(m.kind, MethodKind::Instance | MethodKind::Static | MethodKind::Operator))
        .collect();

    let kind = if handles.len() == 1 && !has_pure {
        // A struct-shaped aggregate that also holds one handle is a class.
        ConstructKind::Class
    } else if handles.len() > 1 {
        return Err(format!(
            "holds {} opaque handles ({}); exactly one is required",
            handles.len(),
            handles.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", ")
        ));
    } else if has_pure {
        if !fields.is_empty() {
            return Err("abstract type with stored state".into());
        }
        if !decl.bases.is_empty() {
            return Err("protocol inheritance is not supported".into());
        }
        if let Some(m) = ordinary.iter().find(|m| !m.is_pure) {
            return Err(format!(
                "abstract type mixes pure and implemented methods (`{}`)",
                m.name
            ));
        }
        ConstructKind::Protocol
    } else if !fields.is_empty() {
        if let Some(m) = ordinary.first() {
            return Err(format!(
                "has method `{}` but no opaque handle field",
                m.name
            ));
        }
        if methods.iter().any(|m| m.is_virtual) {
            return Err("aggregate with virtual members".into());
        }
        if !decl.bases.is_empty() {
            return Err("aggregate inheritance is not supported".into());
        }
        ConstructKind::Struct
    } else {
        return Err("no opaque handle, stored fields or pure virtual methods".into());
    };

    Ok(ClassifiedDeclaration {
        kind,
        declaration: decl.clone(),
        handle_field: (kind == ConstructKind::Class).then(|| handles[0].name.clone()),
        case_values: Vec::new(),
    })
}

/// Classes may only derive from protocols of the same header.
fn reject_non_protocol_bases(result: &mut Classification) {
    let protocols: Vec<String> = result
        .declarations
        .iter()
        .filter(|d| d.kind == ConstructKind::Protocol)
        .map(|d| d.name().to_string())
        .collect();

    let mut rejected = Vec::new();
    result.declarations.retain(|d| {
        if d.kind != ConstructKind::Class {
            return true;
        }
        match d.declaration.bases.iter().find(|b| !protocols.contains(b)) {
            Some(base) => {
                rejected.push(
                    Diagnostic::unsupported(
                        d.name(),
                        format!("base `{base}` is not a protocol of this namespace"),
                    )
                    .at(d.declaration.location),
                );
                false
            }
            None => true,
        }
    });
    result.diagnostics.extend(rejected);
}
