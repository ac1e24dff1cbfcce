use std::collections::BTreeSet;
use std::fmt;

use super::{managed_params, origin_comment, CodeWriter, EmitOptions, BANNER};
use crate::ir::{IrNode, IrNodeKind, IrType, IrTypeKind, WrapperModel};

pub(super) fn render(model: &WrapperModel, options: &EmitOptions) -> Result<String, fmt::Error> {
    let mut w = CodeWriter::new();
    let ns = &model.managed_namespace;

    w.line(BANNER)?;
    w.blank()?;
    w.line("#pragma once")?;
    w.lines(options.platform.prelude())?;
    w.line(options.platform.include(&model.header_file))?;
    if model.types_of(IrTypeKind::Adapter).next().is_some() {
        w.line("#include <memory>")?;
    }
    w.blank()?;
    w.line(format_args!("namespace {ns} {{"))?;
    w.indent();

    let header = Header { model, options };

    for ty in model.types_of(IrTypeKind::Enum) {
        w.blank()?;
        header.enumeration(&mut w, ty)?;
    }

    let forward: Vec<&IrType> = model
        .types
        .iter()
        .filter(|t| matches!(t.kind, IrTypeKind::Interface | IrTypeKind::Wrapper | IrTypeKind::Adapter))
        .collect();
    if !forward.is_empty() {
        w.blank()?;
        for ty in forward {
            let keyword = if ty.kind == IrTypeKind::Interface {
                "interface class"
            } else {
                "ref class"
            };
            w.line(format_args!("{keyword} {};", ty.name))?;
        }
    }

    for ty in struct_order(model) {
        w.blank()?;
        header.value_struct(&mut w, ty)?;
    }
    for ty in model.types_of(IrTypeKind::Interface) {
        w.blank()?;
        header.interface(&mut w, ty)?;
    }
    for ty in model.types_of(IrTypeKind::Wrapper) {
        w.blank()?;
        header.ref_class(&mut w, ty)?;
    }
    for ty in model.types_of(IrTypeKind::Adapter) {
        w.blank()?;
        header.ref_class(&mut w, ty)?;
    }

    w.dedent();
    w.line("}")?;
    Ok(w.finish())
}

/// Value structs ordered so every struct follows the structs its fields hold.
fn struct_order(model: &WrapperModel) -> Vec<&IrType> {
    let structs: Vec<&IrType> = model.types_of(IrTypeKind::Struct).collect();
    let mut ordered = Vec::new();
    let mut placed = BTreeSet::new();

    fn visit<'m>(
        ty: &'m IrType,
        structs: &[&'m IrType],
        ns: &str,
        placed: &mut BTreeSet<&'m str>,
        ordered: &mut Vec<&'m IrType>,
    ) {
        if !placed.insert(ty.name.as_str()) {
            return;
        }
        for field in &ty.nodes {
            let Some(ret) = &field.ret else { continue };
            for dep in structs {
                if dep.name != ty.name && mentions(&ret.managed, &format!("{ns}::{}", dep.name)) {
                    visit(dep, structs, ns, placed, ordered);
                }
            }
        }
        ordered.push(ty);
    }

    for ty in &structs {
        visit(ty, &structs, &model.managed_namespace, &mut placed, &mut ordered);
    }
    ordered
}

/// Whether `spelling` names `qualified` as a whole identifier.
fn mentions(spelling: &str, qualified: &str) -> bool {
    spelling.match_indices(qualified).any(|(i, _)| {
        let before = spelling[..i].chars().next_back();
        let after = spelling[i + qualified.len()..].chars().next();
        let boundary = |c: Option<char>| !c.is_some_and(|c| c.is_alphanumeric() || c == '_' || c == ':');
        boundary(before) && boundary(after)
    })
}

/// Enumerator initializer; values past `int64_t` need an unsigned suffix.
fn enum_literal(value: i128) -> String {
    if value > i128::from(i64::MAX) {
        format!("{value}ULL")
    } else {
        value.to_string()
    }
}

struct Header<'a> {
    model: &'a WrapperModel,
    options: &'a EmitOptions,
}

impl Header<'_> {
    fn member(&self, w: &mut CodeWriter, node: &IrNode, text: impl fmt::Display) -> fmt::Result {
        w.doc(node.doc.as_deref())?;
        if self.options.verbose {
            w.line(format_args!("{text} {}", origin_comment(self.model, &node.origin)))
        } else {
            w.line(text)
        }
    }

    fn enumeration(&self, w: &mut CodeWriter, ty: &IrType) -> fmt::Result {
        let backing = ty.backing.as_deref().unwrap_or("int");
        w.doc(ty.doc.as_deref())?;
        w.line(format_args!("public enum class {} : {backing} {{", ty.name))?;
        w.indent();
        let last = ty.nodes.len().saturating_sub(1);
        for (i, node) in ty.nodes.iter().enumerate() {
            if let IrNodeKind::EnumCase { value } = node.kind {
                let comma = if i == last { "" } else { "," };
                let value = enum_literal(value);
                self.member(w, node, format_args!("{} = {value}{comma}", node.name))?;
            }
        }
        w.dedent();
        w.line("};")
    }

    fn value_struct(&self, w: &mut CodeWriter, ty: &IrType) -> fmt::Result {
        w.doc(ty.doc.as_deref())?;
        w.line(format_args!("public value struct {} {{", ty.name))?;
        w.indent();
        for node in &ty.nodes {
            if let Some(ret) = &node.ret {
                self.member(w, node, format_args!("{} {};", ret.managed, node.name))?;
            }
        }
        w.dedent();
        w.line("};")
    }

    fn interface(&self, w: &mut CodeWriter, ty: &IrType) -> fmt::Result {
        w.doc(ty.doc.as_deref())?;
        w.line(format_args!("public interface class {} {{", ty.name))?;
        w.indent();
        for node in &ty.nodes {
            let ret = node.ret.as_ref().map_or("void", |r| r.managed.as_str());
            self.member(
                w,
                node,
                format_args!("{ret} {}({});", node.name, managed_params(&node.params)),
            )?;
        }
        w.dedent();
        w.line("};")
    }

    fn ref_class(&self, w: &mut CodeWriter, ty: &IrType) -> fmt::Result {
        let field = &self.model.wrapped_object_name;
        let bases = if ty.implements.is_empty() {
            String::new()
        } else {
            let list: Vec<String> = ty.implements.iter().map(|i| format!("public {i}")).collect();
            format!(" : {}", list.join(", "))
        };

        w.doc(ty.doc.as_deref())?;
        w.line(format_args!("public ref class {}{bases} {{", ty.name))?;
        w.line("internal:")?;
        w.indent();
        w.line(format_args!("{} {field};", ty.held_type()))?;
        w.line(format_args!(
            "{}({} objectToTakeOwnershipOf);",
            ty.name,
            ty.held_type()
        ))?;
        w.dedent();
        w.line("public:")?;
        w.indent();

        let mut blank_before_members = false;
        for node in &ty.nodes {
            match &node.kind {
                IrNodeKind::WrappingConstructor => {}
                IrNodeKind::Constructor => {
                    self.member(
                        w,
                        node,
                        format_args!("{}({});", ty.name, managed_params(&node.params)),
                    )?;
                }
                IrNodeKind::Destructor => {
                    w.line(format_args!("~{}();", ty.name))?;
                    w.line(format_args!("!{}();", ty.name))?;
                    blank_before_members = true;
                }
                kind => {
                    if blank_before_members {
                        w.blank()?;
                        blank_before_members = false;
                    }
                    self.class_member(w, ty, node, kind)?;
                }
            }
        }

        w.dedent();
        w.line("};")
    }

    fn class_member(
        &self,
        w: &mut CodeWriter,
        ty: &IrType,
        node: &IrNode,
        kind: &IrNodeKind,
    ) -> fmt::Result {
        let ret = node.ret.as_ref().map_or("void", |r| r.managed.as_str());
        match kind {
            IrNodeKind::Method { is_static } => {
                let prefix = if *is_static {
                    "static "
                } else if node.implements.is_some() {
                    "virtual "
                } else {
                    ""
                };
                self.member(
                    w,
                    node,
                    format_args!("{prefix}{ret} {}({});", node.name, managed_params(&node.params)),
                )
            }
            IrNodeKind::Equality => {
                let qualified = format!("{}::{}^", self.model.managed_namespace, ty.name);
                self.member(
                    w,
                    node,
                    format_args!("static bool operator==({qualified} lhs, {qualified} rhs);"),
                )
            }
            IrNodeKind::Property { read_only, is_static } => {
                let prefix = if *is_static { "static " } else { "" };
                self.member(w, node, format_args!("{prefix}property {ret} {} {{", node.name))?;
                w.indent();
                w.line(format_args!("{ret} get();"))?;
                if !read_only {
                    w.line(format_args!("void set({ret} value);"))?;
                }
                w.dedent();
                w.line("}")
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mentions_matches_whole_names_only() {
        assert!(mentions("M::Point", "M::Point"));
        assert!(mentions("System::Nullable<M::Point>", "M::Point"));
        assert!(!mentions("M::Point3", "M::Point"));
        assert!(!mentions("NM::Point", "M::Point"));
    }

    #[test]
    fn enum_literals_mark_unsigned_range() {
        assert_eq!(enum_literal(-2), "-2");
        assert_eq!(enum_literal(i128::from(i64::MAX)), "9223372036854775807");
        assert_eq!(enum_literal(i128::from(u64::MAX)), "18446744073709551615ULL");
    }
}
