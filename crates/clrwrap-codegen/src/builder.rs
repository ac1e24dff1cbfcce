//! Wrapper model construction.
//!
//! The first pass registers every classified declaration in a symbol table
//! so members can refer to types declared later in the header. Protocol
//! bridgeability is then settled as a fixpoint, and the second pass
//! populates each type's nodes.

use std::collections::BTreeSet;

use clrwrap_core::{
    Access, Declaration, Diagnostic, Member, Method, MethodKind, Passing, Property, SourceLocation,
    TypeReference,
};

use crate::classify::{Classification, ClassifiedDeclaration, ConstructKind};
use crate::ir::{IrNode, IrNodeKind, IrParam, IrReturn, IrType, IrTypeKind, Origin, WrapperModel};
use crate::policy::{
    native_param_spelling, Conversion, Direction, Holder, MappedKind, SymbolTable,
    TargetType, TypePolicy, Unresolved,
};

/// Names and namespaces the builder needs besides the classification.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub native_namespace: String,
    pub managed_namespace: String,
    pub wrapped_object_name: String,
    pub header_file: String,
}

#[derive(Debug)]
pub struct BuildOutput {
    pub model: WrapperModel,
    pub diagnostics: Vec<Diagnostic>,
}

/// Locals the emitter declares inside member bodies.
const RESERVED_LOCALS: &[&str] = &["unmanagedResult", "newObject", "managedResult", "lhs", "rhs"];

pub fn build(classification: &Classification, options: &BuildOptions) -> BuildOutput {
    let mut symbols = SymbolTable::default();
    for decl in &classification.declarations {
        symbols.register(decl.name(), decl.kind);
    }
    settle_bridgeability(classification, &mut symbols, options);

    let builder = Builder {
        policy: TypePolicy::new(
            &symbols,
            &options.native_namespace,
            &options.managed_namespace,
            &options.wrapped_object_name,
        ),
        classification,
        options,
        diagnostics: Vec::new(),
    };
    builder.run()
}

/// A protocol is bridgeable when every requirement maps in both directions.
/// Starting from "all bridgeable", protocols whose requirements depend on a
/// non-bridgeable protocol drop out until nothing changes.
fn settle_bridgeability(
    classification: &Classification,
    symbols: &mut SymbolTable,
    options: &BuildOptions,
) {
    let protocols: Vec<&ClassifiedDeclaration> = classification
        .declarations
        .iter()
        .filter(|d| d.kind == ConstructKind::Protocol)
        .collect();

    loop {
        let policy = TypePolicy::new(
            symbols,
            &options.native_namespace,
            &options.managed_namespace,
            &options.wrapped_object_name,
        );
        let demoted: Vec<String> = protocols
            .iter()
            .filter(|p| symbols.get(p.name()).is_some_and(|s| s.bridgeable))
            .filter(|p| !requirements(&p.declaration).all(|m| bridges(&policy, m)))
            .map(|p| p.name().to_string())
            .collect();
        if demoted.is_empty() {
            break;
        }
        for name in demoted {
            log::debug!("protocol `{name}` cannot be bridged into native code");
            symbols.set_bridgeable(&name, false);
        }
    }
}

fn bridges(policy: &TypePolicy<'_>, method: &Method) -> bool {
    let params = method.params.iter().all(|p| {
        policy.map_param(p, Direction::Parameter).is_ok()
            && policy.map_param(p, Direction::ReturnValue).is_ok()
    });
    let ret = method.return_type.is_void()
        || [Direction::ReturnValue, Direction::Parameter].into_iter().all(|direction| {
            policy
                .map_return(&method.return_type, method.return_passing, direction)
                .is_ok()
        });
    params && ret
}

fn requirements(decl: &Declaration) -> impl Iterator<Item = &Method> {
    decl.methods()
        .filter(|m| m.is_pure && !m.is_special())
}

fn is_public(access: Access) -> bool {
    access == Access::Public
}

struct Builder<'a> {
    policy: TypePolicy<'a>,
    classification: &'a Classification,
    options: &'a BuildOptions,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Builder<'a> {
    fn run(mut self) -> BuildOutput {
        let mut types = Vec::new();
        let mut adapters = Vec::new();
        let classification = self.classification;

        for decl in &classification.declarations {
            match decl.kind {
                ConstructKind::Enum => types.push(self.enum_type(decl)),
                ConstructKind::Struct => types.push(self.struct_type(decl)),
                ConstructKind::Protocol => {
                    let interface = self.interface_type(decl);
                    adapters.push(self.adapter_type(&interface));
                    types.push(interface);
                }
                ConstructKind::Class => types.push(self.wrapper_type(decl)),
            }
        }
        types.extend(adapters);

        for ty in &types {
            for node in &ty.nodes {
                log::debug!("emitting {}::{}", ty.name, node.name);
            }
        }

        BuildOutput {
            model: WrapperModel {
                native_namespace: self.options.native_namespace.clone(),
                managed_namespace: self.options.managed_namespace.clone(),
                header_file: self.options.header_file.clone(),
                wrapped_object_name: self.options.wrapped_object_name.clone(),
                types,
            },
            diagnostics: self.diagnostics,
        }
    }

    fn native(&self, name: &str) -> String {
        format!("{}::{name}", self.options.native_namespace)
    }

    fn managed(&self, name: &str) -> String {
        format!("{}::{name}", self.options.managed_namespace)
    }

    fn shell(&self, decl: &ClassifiedDeclaration, kind: IrTypeKind) -> IrType {
        let mut ty = IrType::new(decl.name(), kind, self.native(decl.name()));
        ty.doc = decl.declaration.doc.clone();
        ty.location = decl.declaration.location;
        ty
    }

    fn unresolved(&mut self, owner: &str, member: &str, location: SourceLocation, err: Unresolved) {
        log::debug!("dropping {owner}::{member}: {}", err.0);
        self.diagnostics
            .push(Diagnostic::unresolved(format!("{owner}::{member}"), err.0).at(location));
    }

    fn unsupported(&mut self, owner: &str, member: &str, location: SourceLocation, reason: impl Into<String>) {
        self.diagnostics
            .push(Diagnostic::unsupported(format!("{owner}::{member}"), reason).at(location));
    }

    fn enum_type(&mut self, decl: &ClassifiedDeclaration) -> IrType {
        let mut ty = self.shell(decl, IrTypeKind::Enum);
        ty.backing = decl.declaration.backing.as_ref().map(ToString::to_string);
        for (case, value) in decl.declaration.cases().zip(&decl.case_values) {
            let mut node = IrNode::new(
                &case.name,
                IrNodeKind::EnumCase { value: *value },
                Origin::new(decl.name(), &case.name, case.location),
            );
            node.doc = case.doc.clone();
            ty.nodes.push(node);
        }
        ty
    }

    fn struct_type(&mut self, decl: &ClassifiedDeclaration) -> IrType {
        let mut ty = self.shell(decl, IrTypeKind::Struct);
        for field in decl.declaration.stored_fields().filter(|f| is_public(f.access)) {
            let mapped = self
                .policy
                .map(&field.ty, Direction::ReturnValue)
                .and_then(|out| Ok((out, self.policy.map(&field.ty, Direction::Parameter)?)));
            match mapped {
                Ok((out, inp)) => {
                    let mut node = IrNode::new(
                        &field.name,
                        IrNodeKind::Field {
                            read_only: field.read_only,
                        },
                        Origin::new(decl.name(), &field.name, field.location),
                    );
                    node.ret = Some(IrReturn {
                        managed: out.managed,
                        native: out.native,
                        to_managed: out.conversion,
                        to_native: Some(inp.conversion),
                    });
                    node.doc = field.doc.clone();
                    ty.nodes.push(node);
                }
                Err(err) => self.unresolved(decl.name(), &field.name, field.location, err),
            }
        }
        ty
    }

    fn interface_type(&mut self, decl: &ClassifiedDeclaration) -> IrType {
        let mut ty = self.shell(decl, IrTypeKind::Interface);
        ty.bridgeable = self
            .policy
            .symbols()
            .get(decl.name())
            .is_some_and(|s| s.bridgeable);

        let mut seen = BTreeSet::new();
        for method in requirements(&decl.declaration) {
            let kind = IrNodeKind::Requirement {
                is_const: method.is_const,
            };
            match self.method_node(decl.name(), method, kind, ty.bridgeable) {
                Ok(node) => {
                    if seen.insert(node.signature_key()) {
                        ty.nodes.push(node);
                    } else {
                        self.unsupported(
                            decl.name(),
                            &method.name,
                            method.location,
                            "overload collides with an earlier requirement of the same managed signature",
                        );
                    }
                }
                Err(err) => self.unresolved(decl.name(), &method.name, method.location, err),
            }
        }
        for member in &decl.declaration.members {
            if let Member::Other { name, reason, location } = member {
                self.unsupported(decl.name(), name, *location, reason.clone());
            }
        }
        ty
    }

    /// Managed class forwarding the interface into a native protocol object.
    fn adapter_type(&self, interface: &IrType) -> IrType {
        let name = self.policy.symbols().adapter_for(&interface.name);
        if name != format!("{}Adapter", interface.name) {
            log::debug!("adapter for `{}` renamed to `{name}`", interface.name);
        }
        let mut adapter = IrType::new(name, IrTypeKind::Adapter, interface.native_name.clone());
        let qualified = self.managed(&interface.name);
        adapter.location = interface.location;
        adapter.implements.push(qualified.clone());
        adapter.nodes.push(IrNode::new(
            &adapter.name,
            IrNodeKind::WrappingConstructor,
            Origin::new(&interface.name, &interface.name, interface.location),
        ));
        adapter.nodes.push(IrNode::new(
            format!("~{}", adapter.name),
            IrNodeKind::Destructor,
            Origin::new(&interface.name, &interface.name, interface.location),
        ));
        for requirement in &interface.nodes {
            let mut node = requirement.clone();
            node.kind = IrNodeKind::Method { is_static: false };
            node.implements = Some(qualified.clone());
            adapter.nodes.push(node);
        }
        adapter
    }

    fn wrapper_type(&mut self, decl: &ClassifiedDeclaration) -> IrType {
        let name = decl.name();
        let mut ty = self.shell(decl, IrTypeKind::Wrapper);
        let handle = decl.handle_field.as_deref();
        let classification = self.classification;
        let bases: Vec<&ClassifiedDeclaration> = decl
            .declaration
            .bases
            .iter()
            .filter_map(|b| classification.get(b))
            .collect();
        ty.implements = bases.iter().map(|b| self.managed(b.name())).collect();

        let mut seen = BTreeSet::new();
        ty.nodes.push(IrNode::new(
            name,
            IrNodeKind::WrappingConstructor,
            Origin::new(name, name, decl.declaration.location),
        ));

        for ctor in decl
            .declaration
            .methods()
            .filter(|m| m.kind == MethodKind::Constructor && is_public(m.access) && !m.is_deleted)
        {
            if ctor.params.iter().any(|p| p.ty.is_handle()) {
                log::debug!("skipping {name} constructor taking a native handle");
                continue;
            }
            match self.method_node(name, ctor, IrNodeKind::Constructor, false) {
                Ok(node) => self.push_unique(&mut ty, &mut seen, node, ctor.location),
                Err(err) => self.unresolved(name, &ctor.name, ctor.location, err),
            }
        }

        ty.nodes.push(IrNode::new(
            format!("~{name}"),
            IrNodeKind::Destructor,
            Origin::new(name, name, decl.declaration.location),
        ));

        for member in &decl.declaration.members {
            match member {
                Member::Method(method) => {
                    if !is_public(method.access) || method.is_deleted {
                        continue;
                    }
                    match method.kind {
                        MethodKind::Instance | MethodKind::Static => {
                            let kind = IrNodeKind::Method {
                                is_static: method.kind == MethodKind::Static,
                            };
                            match self.method_node(name, method, kind, false) {
                                Ok(mut node) => {
                                    node.implements = satisfied_interface(&bases, method)
                                        .map(|p| self.managed(p));
                                    self.push_unique(&mut ty, &mut seen, node, method.location);
                                }
                                Err(err) => self.unresolved(name, &method.name, method.location, err),
                            }
                        }
                        MethodKind::Operator => self.operator(&mut ty, decl, method),
                        MethodKind::Constructor | MethodKind::Destructor => {}
                    }
                }
                Member::Property(field) => {
                    if Some(field.name.as_str()) == handle || !is_public(field.access) {
                        continue;
                    }
                    match self.property_node(name, field) {
                        Ok(node) => self.push_unique(&mut ty, &mut seen, node, field.location),
                        Err(err) => self.unresolved(name, &field.name, field.location, err),
                    }
                }
                Member::EnumCase(_) => {}
                Member::Other {
                    name: member,
                    reason,
                    location,
                } => self.unsupported(name, member, *location, reason.clone()),
            }
        }

        self.forward_inherited(&mut ty, &mut seen, decl, &bases);
        ty
    }

    /// Requirements of base protocols the class inherits without redeclaring.
    fn forward_inherited(
        &mut self,
        ty: &mut IrType,
        seen: &mut BTreeSet<String>,
        decl: &ClassifiedDeclaration,
        bases: &[&ClassifiedDeclaration],
    ) {
        for base in bases {
            for requirement in requirements(&base.declaration) {
                if hides(&decl.declaration, requirement) {
                    continue;
                }
                let kind = IrNodeKind::Method { is_static: false };
                // Unmappable requirements are reported against the protocol itself.
                if let Ok(mut node) = self.method_node(base.name(), requirement, kind, false) {
                    node.implements = Some(self.managed(base.name()));
                    if seen.insert(node.signature_key()) {
                        ty.nodes.push(node);
                    }
                }
            }
        }
    }

    fn push_unique(
        &mut self,
        ty: &mut IrType,
        seen: &mut BTreeSet<String>,
        node: IrNode,
        location: SourceLocation,
    ) {
        if seen.insert(node.signature_key()) {
            ty.nodes.push(node);
        } else {
            let member = node.origin.member.clone();
            self.unsupported(
                &ty.name,
                &member,
                location,
                "overload collides with an earlier member of the same managed signature",
            );
        }
    }

    fn operator(&mut self, ty: &mut IrType, decl: &ClassifiedDeclaration, method: &Method) {
        let name = decl.name();
        let compares_self = matches!(
            method.params.as_slice(),
            [param] if param.ty == TypeReference::declared(name)
        );
        if method.name != "operator==" || !compares_self {
            self.unsupported(
                name,
                &method.name,
                method.location,
                "only `operator==` against the same class is wrapped",
            );
            return;
        }
        if ty.nodes.iter().any(|n| n.kind == IrNodeKind::Equality) {
            return;
        }
        let mut node = IrNode::new(
            "operator==",
            IrNodeKind::Equality,
            Origin::new(name, &method.name, method.location),
        );
        node.doc = method.doc.clone();
        ty.nodes.push(node);
    }

    fn property_node(&self, owner: &str, field: &Property) -> Result<IrNode, Unresolved> {
        let out = self.policy.map(&field.ty, Direction::ReturnValue)?;
        let mut node = IrNode::new(
            &field.name,
            IrNodeKind::Property {
                read_only: field.read_only,
                is_static: field.is_static,
            },
            Origin::new(owner, &field.name, field.location),
        );
        if !field.read_only {
            let inp = self.policy.map(&field.ty, Direction::Parameter)?;
            node.params.push(IrParam {
                name: managed_param_name("value", 0, &self.options.wrapped_object_name),
                managed: inp.managed.clone(),
                native: inp.native.clone(),
                native_decl: inp.native.clone(),
                local_type: inp.native.clone(),
                moves: inp.moves(),
                to_native: inp.conversion,
                to_managed: None,
            });
        }
        node.ret = Some(IrReturn {
            managed: out.managed,
            native: out.native,
            to_managed: out.conversion,
            to_native: None,
        });
        node.doc = field.doc.clone();
        Ok(node)
    }

    /// Map a method's signature. With `bridge`, the reverse conversions
    /// needed by a native bridge are resolved too.
    fn method_node(
        &self,
        owner: &str,
        method: &Method,
        kind: IrNodeKind,
        bridge: bool,
    ) -> Result<IrNode, Unresolved> {
        let mut node = IrNode::new(
            &method.name,
            kind.clone(),
            Origin::new(owner, &method.name, method.location),
        );
        node.doc = method.doc.clone();

        for (i, param) in method.params.iter().enumerate() {
            let inp = self.policy.map_param(param, Direction::Parameter)?;
            let to_managed = if bridge {
                Some(self.policy.map_param(param, Direction::ReturnValue)?.conversion)
            } else {
                None
            };
            node.params.push(IrParam {
                name: managed_param_name(&param.name, i, &self.options.wrapped_object_name),
                managed: inp.managed.clone(),
                native: inp.native.clone(),
                native_decl: native_param_spelling(&inp.native, param.passing),
                local_type: local_type(&inp, param.passing),
                moves: inp.moves() && param.passing == Passing::Value,
                to_native: inp.conversion,
                to_managed,
            });
        }

        if kind != IrNodeKind::Constructor {
            let (ty, passing) = (&method.return_type, method.return_passing);
            let out = self.policy.map_return(ty, passing, Direction::ReturnValue)?;
            let to_native = if bridge && out.kind != MappedKind::Void {
                Some(self.policy.map_return(ty, passing, Direction::Parameter)?.conversion)
            } else {
                None
            };
            // A protocol result keeps its reference so the adapter sees the native object.
            let native = if out.kind == MappedKind::Protocol && passing != Passing::Value {
                native_param_spelling(&out.native, passing)
            } else {
                out.native
            };
            node.ret = Some(IrReturn {
                managed: out.managed,
                native,
                to_managed: out.conversion,
                to_native,
            });
        }
        Ok(node)
    }
}

/// Whether the class declares `requirement` itself without exposing it.
/// Public declarations are matched later by managed signature.
fn hides(decl: &Declaration, requirement: &Method) -> bool {
    decl.methods().any(|m| {
        (!is_public(m.access) || m.is_deleted)
            && m.name == requirement.name
            && m.params.len() == requirement.params.len()
    })
}

/// The base protocol whose requirement `method` implements, if any.
fn satisfied_interface<'d>(bases: &[&'d ClassifiedDeclaration], method: &Method) -> Option<&'d str> {
    bases
        .iter()
        .find(|b| {
            requirements(&b.declaration)
                .any(|r| r.name == method.name && r.params.len() == method.params.len())
        })
        .map(|b| b.name())
}

fn local_type(target: &TargetType, passing: Passing) -> String {
    let lvalue = matches!(
        target.conversion,
        Conversion::Unwrap { .. }
            | Conversion::Bridge {
                holder: Holder::Reference,
                ..
            }
    );
    match passing {
        Passing::Ref if lvalue => format!("{}&", target.native),
        Passing::ConstRef => format!("const {}&", target.native),
        _ => target.native.clone(),
    }
}

/// Managed parameter name that cannot shadow a generated local or the
/// wrapped object `field`.
fn managed_param_name(name: &str, index: usize, field: &str) -> String {
    if name.is_empty() {
        return format!("param{index}");
    }
    let clashes = name == field
        || RESERVED_LOCALS.contains(&name)
        || ["arg", "bridge", "optional", "nativeArray", "managedArray", "element", "managedArg"]
            .iter()
            .any(|stem| {
                name.strip_prefix(stem)
                    .is_some_and(|rest| !rest.is_empty() && rest.chars().all(|c| c.is_ascii_digit()))
            });
    if clashes {
        format!("{name}_")
    } else {
        name.to_string()
    }
}
