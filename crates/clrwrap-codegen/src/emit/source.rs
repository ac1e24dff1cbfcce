use std::fmt;

use super::{declare, managed_params, origin_comment, CodeWriter, EmitOptions, BANNER};
use crate::ir::{IrNode, IrNodeKind, IrReturn, IrType, IrTypeKind, WrapperModel};
use crate::policy::{bridge_name, struct_to_managed_fn, struct_to_native_fn, Scratch, Snippet};

pub(super) fn render(
    model: &WrapperModel,
    options: &EmitOptions,
    header_name: &str,
) -> Result<String, fmt::Error> {
    let mut w = CodeWriter::new();
    let bridged: Vec<&IrType> = model
        .types_of(IrTypeKind::Interface)
        .filter(|t| t.bridgeable)
        .collect();

    w.line(BANNER)?;
    w.blank()?;
    w.line(format_args!("#include \"{header_name}\""))?;
    w.line("#include <msclr/marshal_cppstd.h>")?;
    if !bridged.is_empty() {
        w.line("#include <vcclr.h>")?;
    }
    w.line("#include <memory>")?;
    w.line("#include <optional>")?;
    w.line("#include <vector>")?;
    w.blank()?;
    w.line("using namespace msclr::interop;")?;

    let source = Source { model, options };

    let structs: Vec<&IrType> = model.types_of(IrTypeKind::Struct).collect();
    if !structs.is_empty() {
        w.blank()?;
        w.line("// Marshalling helpers")?;
        w.blank()?;
        for ty in &structs {
            w.line(format_args!("{};", source.to_managed_helper_signature(ty)))?;
            w.line(format_args!("{};", source.to_native_helper_signature(ty)))?;
        }
        for ty in &structs {
            w.blank()?;
            source.struct_helpers(&mut w, ty)?;
        }
    }

    if !bridged.is_empty() {
        w.blank()?;
        w.line("// Native bridges")?;
        for ty in &bridged {
            w.blank()?;
            source.bridge_class(&mut w, ty)?;
        }
        for ty in &bridged {
            source.bridge_bodies(&mut w, ty)?;
        }
    }

    for ty in model
        .types
        .iter()
        .filter(|t| t.owns_native_object())
    {
        w.blank()?;
        w.line(format_args!(
            "// Implementation of {}::{}",
            model.managed_namespace, ty.name
        ))?;
        for node in &ty.nodes {
            w.blank()?;
            source.member(&mut w, ty, node)?;
        }
    }

    Ok(w.finish())
}

struct Source<'a> {
    model: &'a WrapperModel,
    options: &'a EmitOptions,
}

/// Locals and the call argument list for a set of converted parameters.
struct Arguments {
    setup: Vec<String>,
    call: String,
}

impl Source<'_> {
    fn managed(&self, name: &str) -> String {
        format!("{}::{name}", self.model.managed_namespace)
    }

    fn field(&self) -> &str {
        &self.model.wrapped_object_name
    }

    fn origin(&self, w: &mut CodeWriter, node: &IrNode) -> fmt::Result {
        if self.options.verbose {
            w.line(origin_comment(self.model, &node.origin))?;
        }
        Ok(())
    }

    fn to_managed_helper_signature(&self, ty: &IrType) -> String {
        format!(
            "static {} {}(const {}& nativeValue)",
            self.managed(&ty.name),
            struct_to_managed_fn(&ty.name),
            ty.native_name
        )
    }

    fn to_native_helper_signature(&self, ty: &IrType) -> String {
        format!(
            "static {} {}({} managedValue)",
            ty.native_name,
            struct_to_native_fn(&ty.name),
            self.managed(&ty.name)
        )
    }

    fn struct_helpers(&self, w: &mut CodeWriter, ty: &IrType) -> fmt::Result {
        w.line(format_args!("{} {{", self.to_managed_helper_signature(ty)))?;
        w.indent();
        w.line(format_args!("{} managedValue;", self.managed(&ty.name)))?;
        let mut scratch = Scratch::default();
        for node in &ty.nodes {
            if let Some(ret) = &node.ret {
                let snippet = ret
                    .to_managed
                    .render(&format!("nativeValue.{}", node.name), &mut scratch);
                w.lines(&snippet.setup)?;
                w.line(format_args!("managedValue.{} = {};", node.name, snippet.expr))?;
            }
        }
        w.line("return managedValue;")?;
        w.dedent();
        w.line("}")?;
        w.blank()?;

        w.line(format_args!("{} {{", self.to_native_helper_signature(ty)))?;
        w.indent();
        w.line(format_args!("{} nativeValue;", ty.native_name))?;
        let mut scratch = Scratch::default();
        for node in &ty.nodes {
            if matches!(node.kind, IrNodeKind::Field { read_only: true }) {
                continue;
            }
            if let Some(to_native) = node.ret.as_ref().and_then(|r| r.to_native.as_ref()) {
                let snippet = to_native.render(&format!("managedValue.{}", node.name), &mut scratch);
                w.lines(&snippet.setup)?;
                w.line(format_args!("nativeValue.{} = {};", node.name, snippet.expr))?;
            }
        }
        w.line("return nativeValue;")?;
        w.dedent();
        w.line("}")
    }

    fn bridge_class(&self, w: &mut CodeWriter, ty: &IrType) -> fmt::Result {
        let bridge = bridge_name(&ty.name);
        w.line(format_args!("class {bridge} : public {} {{", ty.native_name))?;
        w.line("public:")?;
        w.indent();
        w.line(format_args!(
            "explicit {bridge}({}^ managedObject);",
            self.managed(&ty.name)
        ))?;
        for node in &ty.nodes {
            w.line(format_args!("{} override;", self.bridge_signature(node, None)))?;
        }
        w.dedent();
        w.blank()?;
        w.line("private:")?;
        w.indent();
        w.line(format_args!("gcroot<{}^> managedObject;", self.managed(&ty.name)))?;
        w.dedent();
        w.line("};")
    }

    fn bridge_signature(&self, node: &IrNode, owner: Option<&str>) -> String {
        let ret = node.ret.as_ref().map_or("void", |r| r.native.as_str());
        let params: Vec<String> = node
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| declare(&p.native_decl, &format!("nativeArg{i}")))
            .collect();
        let is_const = matches!(node.kind, IrNodeKind::Requirement { is_const: true });
        let qualifier = owner.map(|o| format!("{o}::")).unwrap_or_default();
        format!(
            "{ret} {qualifier}{}({}){}",
            node.name,
            params.join(", "),
            if is_const { " const" } else { "" }
        )
    }

    fn bridge_bodies(&self, w: &mut CodeWriter, ty: &IrType) -> fmt::Result {
        let bridge = bridge_name(&ty.name);
        w.blank()?;
        w.line(format_args!(
            "{bridge}::{bridge}({}^ managedObject) : managedObject(managedObject) {{}}",
            self.managed(&ty.name)
        ))?;

        for node in &ty.nodes {
            w.blank()?;
            self.origin(w, node)?;
            w.line(format_args!("{} {{", self.bridge_signature(node, Some(&bridge))))?;
            w.indent();
            let mut scratch = Scratch::default();
            let mut args = Vec::new();
            for (i, param) in node.params.iter().enumerate() {
                let input = format!("nativeArg{i}");
                let snippet = match &param.to_managed {
                    Some(conversion) => conversion.render(&input, &mut scratch),
                    None => Snippet {
                        setup: Vec::new(),
                        expr: input,
                    },
                };
                w.lines(&snippet.setup)?;
                let local = format!("managedArg{i}");
                w.line(format_args!("{} = {};", declare(&param.managed, &local), snippet.expr))?;
                args.push(local);
            }
            let call = format!("managedObject->{}({})", node.name, args.join(", "));
            match &node.ret {
                Some(ret) if !ret.is_void() => {
                    w.line(format_args!("{} = {call};", declare(&ret.managed, "managedResult")))?;
                    let snippet = match &ret.to_native {
                        Some(conversion) => conversion.render("managedResult", &mut scratch),
                        None => Snippet {
                            setup: Vec::new(),
                            expr: "managedResult".into(),
                        },
                    };
                    w.lines(&snippet.setup)?;
                    w.line(format_args!("return {};", snippet.expr))?;
                }
                _ => w.line(format_args!("{call};"))?,
            }
            w.dedent();
            w.line("}")?;
        }
        Ok(())
    }

    fn member(&self, w: &mut CodeWriter, ty: &IrType, node: &IrNode) -> fmt::Result {
        let qualified = self.managed(&ty.name);
        let field = self.field();
        self.origin(w, node)?;

        match &node.kind {
            IrNodeKind::WrappingConstructor => {
                w.line(format_args!(
                    "{qualified}::{}({} objectToTakeOwnershipOf) {{",
                    ty.name,
                    ty.held_type()
                ))?;
                w.indent();
                w.line(format_args!("{field} = objectToTakeOwnershipOf;"))?;
            }
            IrNodeKind::Constructor => {
                w.line(format_args!(
                    "{qualified}::{}({}) {{",
                    ty.name,
                    managed_params(&node.params)
                ))?;
                w.indent();
                let args = self.arguments(node, &mut Scratch::default());
                w.lines(&args.setup)?;
                w.line(format_args!(
                    "{} = new {}({});",
                    declare(&ty.held_type(), "newObject"),
                    ty.native_name,
                    args.call
                ))?;
                w.line(format_args!("{field} = newObject;"))?;
            }
            IrNodeKind::Destructor => {
                w.line(format_args!("{qualified}::~{}() {{", ty.name))?;
                w.indent();
                w.line(format_args!("this->!{}();", ty.name))?;
                w.dedent();
                w.line("}")?;
                w.blank()?;
                w.line(format_args!("{qualified}::!{}() {{", ty.name))?;
                w.indent();
                w.line(format_args!("delete {field};"))?;
                w.line(format_args!("{field} = nullptr;"))?;
            }
            IrNodeKind::Method { is_static } => {
                let ret = node.ret.as_ref().map_or("void", |r| r.managed.as_str());
                w.line(format_args!(
                    "{ret} {qualified}::{}({}) {{",
                    node.name,
                    managed_params(&node.params)
                ))?;
                w.indent();
                let mut scratch = Scratch::default();
                let args = self.arguments(node, &mut scratch);
                w.lines(&args.setup)?;
                let callee = if *is_static {
                    format!("{}::{}", ty.native_name, node.name)
                } else {
                    format!("{}{}", ty.receiver(field), node.name)
                };
                self.call_and_return(w, &format!("{callee}({})", args.call), node.ret.as_ref(), &mut scratch)?;
            }
            IrNodeKind::Equality => {
                let handle = format!("{qualified}^");
                w.line(format_args!(
                    "bool {qualified}::operator==({handle} lhs, {handle} rhs) {{"
                ))?;
                w.indent();
                w.line("if (System::Object::ReferenceEquals(lhs, nullptr) && System::Object::ReferenceEquals(rhs, nullptr)) { return true; }")?;
                w.line("if (System::Object::ReferenceEquals(lhs, nullptr) || System::Object::ReferenceEquals(rhs, nullptr)) { return false; }")?;
                w.line(format_args!("return (*lhs->{field} == *rhs->{field});"))?;
            }
            IrNodeKind::Property { read_only, is_static } => {
                return self.property(w, ty, node, *read_only, *is_static);
            }
            IrNodeKind::Requirement { .. } | IrNodeKind::EnumCase { .. } | IrNodeKind::Field { .. } => {
                return Ok(());
            }
        }
        w.dedent();
        w.line("}")
    }

    fn property(
        &self,
        w: &mut CodeWriter,
        ty: &IrType,
        node: &IrNode,
        read_only: bool,
        is_static: bool,
    ) -> fmt::Result {
        let qualified = self.managed(&ty.name);
        let Some(ret) = &node.ret else {
            return Ok(());
        };
        let target = if is_static {
            format!("{}::{}", ty.native_name, node.name)
        } else {
            format!("{}{}", ty.receiver(self.field()), node.name)
        };

        w.line(format_args!(
            "{} {qualified}::{}::get() {{",
            ret.managed, node.name
        ))?;
        w.indent();
        self.call_and_return(w, &target, Some(ret), &mut Scratch::default())?;
        w.dedent();
        w.line("}")?;

        if read_only {
            return Ok(());
        }
        w.blank()?;
        w.line(format_args!(
            "void {qualified}::{}::set({}) {{",
            node.name,
            managed_params(&node.params)
        ))?;
        w.indent();
        let args = self.arguments(node, &mut Scratch::default());
        w.lines(&args.setup)?;
        w.line(format_args!("{target} = {};", args.call))?;
        w.dedent();
        w.line("}")
    }

    fn arguments(&self, node: &IrNode, scratch: &mut Scratch) -> Arguments {
        let mut setup = Vec::new();
        let mut call = Vec::new();
        for (i, param) in node.params.iter().enumerate() {
            let snippet = param.to_native.render(&param.name, scratch);
            setup.extend(snippet.setup);
            let local = format!("arg{i}");
            setup.push(format!("{} = {};", declare(&param.local_type, &local), snippet.expr));
            call.push(if param.moves {
                format!("std::move({local})")
            } else {
                local
            });
        }
        Arguments {
            setup,
            call: call.join(", "),
        }
    }

    fn call_and_return(
        &self,
        w: &mut CodeWriter,
        call: &str,
        ret: Option<&IrReturn>,
        scratch: &mut Scratch,
    ) -> fmt::Result {
        match ret {
            Some(ret) if !ret.is_void() => {
                w.line(format_args!("{} = {call};", declare(&ret.native, "unmanagedResult")))?;
                let snippet = ret.to_managed.render("unmanagedResult", scratch);
                w.lines(&snippet.setup)?;
                w.line(format_args!("return {};", snippet.expr))
            }
            _ => w.line(format_args!("{call};")),
        }
    }
}
