//! Type mapping between native declarations and their managed counterparts.
//!
//! [`TypePolicy::map`] resolves a [`TypeReference`] to the managed and native
//! spellings plus the [`Conversion`] that moves a value across the boundary
//! in the requested [`Direction`]. Conversions render to [`Snippet`]s:
//! setup statements followed by the expression yielding the converted value.

use std::collections::BTreeMap;

use clrwrap_core::{HandleForm, Parameter, Passing, PrimitiveKind, TypeReference};

use crate::classify::ConstructKind;

/// Which way a value crosses the boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Managed argument converted to a native argument.
    Parameter,
    /// Native result converted to a managed result.
    ReturnValue,
}

/// What a mapped type is on the managed side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MappedKind {
    Void,
    Primitive,
    /// `std::string` and friends.
    Foundation,
    Enum,
    Struct,
    Class,
    Protocol,
    Optional,
    Collection,
}

impl MappedKind {
    /// Value types are wrapped in `System::Nullable` when optional.
    pub fn is_value_type(self) -> bool {
        matches!(
            self,
            MappedKind::Primitive | MappedKind::Enum | MappedKind::Struct
        )
    }
}

/// How a native protocol object is held on the far side of a bridge or adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Holder {
    Raw,
    Shared,
    Unique,
    /// A reference valid for the duration of one call.
    Reference,
}

impl From<HandleForm> for Holder {
    fn from(form: HandleForm) -> Self {
        match form {
            HandleForm::Raw => Holder::Raw,
            HandleForm::Shared => Holder::Shared,
            HandleForm::Unique => Holder::Unique,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    /// Bit-compatible on both sides.
    Direct,
    /// `marshal_as<T>(x)`
    MarshalAs { target: String },
    /// `static_cast<T>(x)`
    StaticCast { target: String },
    /// `f(x)`
    Call { function: String },
    /// `*x->field`
    Unwrap { field: String },
    /// `x->field`, null-guarded.
    UnwrapPointer { field: String },
    /// `factory(*x->field)`, null-guarded.
    UnwrapCopy { factory: String, field: String },
    /// `gcnew M(new N(x))`
    Wrap { managed: String, native: String },
    /// `gcnew M(new N(*x))`, null-guarded.
    WrapPointee { managed: String, native: String },
    /// `gcnew M(x.release())`, null-guarded.
    WrapRelease { managed: String },
    /// Managed interface into a native bridge object.
    Bridge { bridge: String, holder: Holder },
    /// Native protocol object into a managed adapter.
    Adapt {
        adapter: String,
        native: String,
        holder: Holder,
    },
    OptionalToNative {
        native: String,
        value_type: bool,
        inner: Box<Conversion>,
    },
    OptionalToManaged {
        managed: String,
        value_type: bool,
        inner: Box<Conversion>,
    },
    CollectionToNative {
        native: String,
        managed_element: String,
        inner: Box<Conversion>,
    },
    CollectionToManaged {
        managed: String,
        managed_element: String,
        inner: Box<Conversion>,
    },
}

/// Statements preparing a converted value, and the expression producing it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Snippet {
    pub setup: Vec<String>,
    pub expr: String,
}

impl Snippet {
    fn expr(expr: String) -> Self {
        Self {
            setup: Vec::new(),
            expr,
        }
    }
}

/// Fresh local names for one function body.
#[derive(Debug, Default)]
pub struct Scratch {
    counter: usize,
}

impl Scratch {
    pub fn fresh(&mut self, stem: &str) -> String {
        let name = format!("{stem}{}", self.counter);
        self.counter += 1;
        name
    }
}

fn indent(lines: Vec<String>) -> impl Iterator<Item = String> {
    lines.into_iter().map(|l| format!("    {l}"))
}

impl Conversion {
    pub fn render(&self, input: &str, scratch: &mut Scratch) -> Snippet {
        match self {
            Conversion::Direct => Snippet::expr(input.to_string()),
            Conversion::MarshalAs { target } => {
                Snippet::expr(format!("marshal_as<{target}>({input})"))
            }
            Conversion::StaticCast { target } => {
                Snippet::expr(format!("static_cast<{target}>({input})"))
            }
            Conversion::Call { function } => Snippet::expr(format!("{function}({input})")),
            Conversion::Unwrap { field } => Snippet::expr(format!("*{input}->{field}")),
            Conversion::UnwrapPointer { field } => {
                Snippet::expr(format!("({input} == nullptr ? nullptr : {input}->{field})"))
            }
            Conversion::UnwrapCopy { factory, field } => Snippet::expr(format!(
                "({input} == nullptr ? nullptr : {factory}(*{input}->{field}))"
            )),
            Conversion::Wrap { managed, native } => {
                Snippet::expr(format!("gcnew {managed}(new {native}({input}))"))
            }
            Conversion::WrapPointee { managed, native } => Snippet::expr(format!(
                "({input} == nullptr ? nullptr : gcnew {managed}(new {native}(*{input})))"
            )),
            Conversion::WrapRelease { managed } => Snippet::expr(format!(
                "({input} == nullptr ? nullptr : gcnew {managed}({input}.release()))"
            )),
            Conversion::Bridge { bridge, holder } => match holder {
                Holder::Raw => Snippet::expr(format!(
                    "({input} == nullptr ? nullptr : new {bridge}({input}))"
                )),
                Holder::Shared => Snippet::expr(format!(
                    "({input} == nullptr ? nullptr : std::make_shared<{bridge}>({input}))"
                )),
                Holder::Unique => Snippet::expr(format!(
                    "({input} == nullptr ? nullptr : std::make_unique<{bridge}>({input}))"
                )),
                Holder::Reference => {
                    let local = scratch.fresh("bridge");
                    Snippet {
                        setup: vec![format!("{bridge} {local}({input});")],
                        expr: local,
                    }
                }
            },
            Conversion::Adapt {
                adapter,
                native,
                holder,
            } => {
                let held = match holder {
                    Holder::Raw => format!("new std::shared_ptr<{native}>({input}, []({native}*) {{}})"),
                    Holder::Shared => format!("new std::shared_ptr<{native}>({input})"),
                    Holder::Unique => format!("new std::shared_ptr<{native}>(std::move({input}))"),
                    Holder::Reference => {
                        return Snippet::expr(format!(
                            "gcnew {adapter}(new std::shared_ptr<{native}>(const_cast<{native}*>(&{input}), []({native}*) {{}}))"
                        ))
                    }
                };
                Snippet::expr(format!(
                    "({input} == nullptr ? nullptr : gcnew {adapter}({held}))"
                ))
            }
            Conversion::OptionalToNative {
                native,
                value_type,
                inner,
            } => {
                let (absent, value) = if *value_type {
                    (format!("!{input}.HasValue"), format!("{input}.Value"))
                } else {
                    (format!("{input} == nullptr"), input.to_string())
                };
                let converted = inner.render(&value, scratch);
                if converted.setup.is_empty() {
                    return Snippet::expr(format!(
                        "({absent} ? std::nullopt : {native}({}))",
                        converted.expr
                    ));
                }
                let local = scratch.fresh("optional");
                let mut setup = vec![format!("{native} {local};"), format!("if (!({absent})) {{")];
                setup.extend(indent(converted.setup));
                setup.push(format!("    {local} = {};", converted.expr));
                setup.push("}".to_string());
                Snippet { setup, expr: local }
            }
            Conversion::OptionalToManaged {
                managed,
                value_type,
                inner,
            } => {
                let value = format!("{input}.value()");
                let converted = inner.render(&value, scratch);
                let absent = if *value_type {
                    format!("{managed}()")
                } else {
                    "nullptr".to_string()
                };
                if converted.setup.is_empty() {
                    let present = if *value_type {
                        format!("{managed}({})", converted.expr)
                    } else {
                        converted.expr
                    };
                    return Snippet::expr(format!("({input}.has_value() ? {present} : {absent})"));
                }
                let local = scratch.fresh("optional");
                let mut setup = vec![
                    format!("{managed} {local} = {absent};"),
                    format!("if ({input}.has_value()) {{"),
                ];
                setup.extend(indent(converted.setup));
                setup.push(format!("    {local} = {};", converted.expr));
                setup.push("}".to_string());
                Snippet { setup, expr: local }
            }
            Conversion::CollectionToNative {
                native,
                managed_element,
                inner,
            } => {
                let local = scratch.fresh("nativeArray");
                let element = scratch.fresh("element");
                let converted = inner.render(&element, scratch);
                let mut setup = vec![
                    format!("{native} {local};"),
                    format!("if ({input} != nullptr) {{"),
                    format!("    {local}.reserve({input}->Count);"),
                    format!("    for each ({managed_element} {element} in {input}) {{"),
                ];
                setup.extend(indent(indent(converted.setup).collect()));
                setup.push(format!("        {local}.push_back({});", converted.expr));
                setup.push("    }".to_string());
                setup.push("}".to_string());
                Snippet { setup, expr: local }
            }
            Conversion::CollectionToManaged {
                managed,
                managed_element,
                inner,
            } => {
                let local = scratch.fresh("managedArray");
                let element = scratch.fresh("element");
                let converted = inner.render(&element, scratch);
                let generic = format!("System::Collections::Generic::List<{managed_element}>");
                let mut setup = vec![
                    format!("{managed} {local} = gcnew {generic}();"),
                    format!("for (auto &{element} : {input}) {{"),
                ];
                setup.extend(indent(converted.setup));
                setup.push(format!("    {local}->Add({});", converted.expr));
                setup.push("}".to_string());
                Snippet { setup, expr: local }
            }
        }
    }
}

/// A resolved type: spellings on both sides plus the conversion for one
/// direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetType {
    pub kind: MappedKind,
    pub managed: String,
    pub native: String,
    pub conversion: Conversion,
}

impl TargetType {
    /// A `std::unique_ptr` argument has to be moved into the call.
    pub fn moves(&self) -> bool {
        self.native.starts_with("std::unique_ptr<")
    }

    fn direct(kind: MappedKind, spelling: String) -> Self {
        Self {
            kind,
            managed: spelling.clone(),
            native: spelling,
            conversion: Conversion::Direct,
        }
    }
}

/// Why a type reference has no managed mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Unresolved(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Symbol {
    pub kind: ConstructKind,
    /// Protocols only: managed implementations can be handed to native code.
    pub bridgeable: bool,
}

/// Names known to the policy, filled before any member is mapped.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    symbols: BTreeMap<String, Symbol>,
}

impl SymbolTable {
    pub fn register(&mut self, name: &str, kind: ConstructKind) {
        self.symbols.insert(
            name.to_string(),
            Symbol {
                kind,
                bridgeable: kind == ConstructKind::Protocol,
            },
        );
    }

    pub fn set_bridgeable(&mut self, name: &str, bridgeable: bool) {
        if let Some(symbol) = self.symbols.get_mut(name) {
            symbol.bridgeable = bridgeable;
        }
    }

    pub fn get(&self, name: &str) -> Option<Symbol> {
        self.symbols.get(name).copied()
    }

    /// Name of the managed adapter for `protocol`. A trailing `_` is added
    /// while the name is taken by a declaration of the header.
    pub fn adapter_for(&self, protocol: &str) -> String {
        let mut name = format!("{protocol}Adapter");
        while self.symbols.contains_key(&name) {
            name.push('_');
        }
        name
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

/// Well-known library types with a fixed managed mapping.
const FOUNDATION: &[(&str, &str)] = &[("std::string", "std::string"), ("std::wstring", "std::wstring")];

pub fn struct_to_managed_fn(name: &str) -> String {
    format!("marshal{name}ToManaged")
}

pub fn struct_to_native_fn(name: &str) -> String {
    format!("marshal{name}ToNative")
}

pub fn bridge_name(protocol: &str) -> String {
    format!("{protocol}Bridge")
}

/// Spelling of a native parameter as declared (`const T&`, `T&`, `T`).
pub fn native_param_spelling(native: &str, passing: Passing) -> String {
    match passing {
        Passing::Value => native.to_string(),
        Passing::ConstRef => format!("const {native}&"),
        Passing::Ref => format!("{native}&"),
    }
}

pub struct TypePolicy<'a> {
    symbols: &'a SymbolTable,
    native_ns: &'a str,
    managed_ns: &'a str,
    field: &'a str,
}

impl<'a> TypePolicy<'a> {
    /// `field` is the name under which wrappers store their native object.
    pub fn new(
        symbols: &'a SymbolTable,
        native_ns: &'a str,
        managed_ns: &'a str,
        field: &'a str,
    ) -> Self {
        Self {
            symbols,
            native_ns,
            managed_ns,
            field,
        }
    }

    pub fn symbols(&self) -> &SymbolTable {
        self.symbols
    }

    fn native_name(&self, name: &str) -> String {
        format!("{}::{name}", self.native_ns)
    }

    fn managed_name(&self, name: &str) -> String {
        format!("{}::{name}", self.managed_ns)
    }

    /// Map a parameter, honouring how it is passed.
    pub fn map_param(&self, param: &Parameter, direction: Direction) -> Result<TargetType, Unresolved> {
        if let Some((name, symbol)) = self.protocol(&param.ty) {
            return self.protocol_reference(name, symbol, param.passing, direction);
        }
        self.map(&param.ty, direction)
    }

    /// Map a method result. `Parameter` is the direction of a result that a
    /// managed implementation hands back to native code.
    pub fn map_return(
        &self,
        ty: &TypeReference,
        passing: Passing,
        direction: Direction,
    ) -> Result<TargetType, Unresolved> {
        match self.protocol(ty) {
            Some((name, symbol)) if passing != Passing::Value => match direction {
                Direction::ReturnValue => self.protocol_reference(name, symbol, passing, direction),
                Direction::Parameter => Err(Unresolved(format!(
                    "protocol `{name}` returned by reference cannot come from a managed implementation"
                ))),
            },
            _ => self.map(ty, direction),
        }
    }

    fn protocol<'t>(&self, ty: &'t TypeReference) -> Option<(&'t str, Symbol)> {
        match ty {
            TypeReference::Declared { name } => self
                .symbols
                .get(name)
                .filter(|s| s.kind == ConstructKind::Protocol)
                .map(|s| (name.as_str(), s)),
            _ => None,
        }
    }

    fn protocol_reference(
        &self,
        name: &str,
        symbol: Symbol,
        passing: Passing,
        direction: Direction,
    ) -> Result<TargetType, Unresolved> {
        if passing == Passing::Value {
            return Err(Unresolved(format!("protocol `{name}` cannot be passed by value")));
        }
        let native = self.native_name(name);
        let conversion = match direction {
            Direction::Parameter => {
                self.require_bridge(name, symbol)?;
                Conversion::Bridge {
                    bridge: bridge_name(name),
                    holder: Holder::Reference,
                }
            }
            Direction::ReturnValue => Conversion::Adapt {
                adapter: self.managed_name(&self.symbols.adapter_for(name)),
                native: native.clone(),
                holder: Holder::Reference,
            },
        };
        Ok(TargetType {
            kind: MappedKind::Protocol,
            managed: format!("{}^", self.managed_name(name)),
            native,
            conversion,
        })
    }

    fn require_bridge(&self, name: &str, symbol: Symbol) -> Result<(), Unresolved> {
        if symbol.bridgeable {
            Ok(())
        } else {
            Err(Unresolved(format!(
                "protocol `{name}` has requirements without a managed mapping, so managed implementations cannot be passed to native code"
            )))
        }
    }

    /// Map a type for one direction.
    pub fn map(&self, ty: &TypeReference, direction: Direction) -> Result<TargetType, Unresolved> {
        match ty {
            TypeReference::Primitive { primitive } => self.primitive(*primitive, direction),
            TypeReference::Declared { name } => self.declared(name, direction),
            TypeReference::Optional { inner } => self.optional(inner, direction),
            TypeReference::Collection { element } => self.collection(element, direction),
            TypeReference::Handle { form, pointee } => {
                self.handle(*form, pointee.as_deref(), direction)
            }
        }
    }

    fn primitive(&self, primitive: PrimitiveKind, direction: Direction) -> Result<TargetType, Unresolved> {
        if primitive.is_void() {
            return match direction {
                Direction::ReturnValue => Ok(TargetType::direct(MappedKind::Void, "void".into())),
                Direction::Parameter => Err(Unresolved("`void` is not a parameter type".into())),
            };
        }
        Ok(TargetType::direct(MappedKind::Primitive, primitive.to_string()))
    }

    fn declared(&self, name: &str, direction: Direction) -> Result<TargetType, Unresolved> {
        if let Some((_, native)) = FOUNDATION.iter().find(|(n, _)| *n == name) {
            let conversion = match direction {
                Direction::Parameter => Conversion::MarshalAs {
                    target: native.to_string(),
                },
                Direction::ReturnValue => Conversion::MarshalAs {
                    target: "System::String^".into(),
                },
            };
            return Ok(TargetType {
                kind: MappedKind::Foundation,
                managed: "System::String^".into(),
                native: native.to_string(),
                conversion,
            });
        }

        let symbol = self
            .symbols
            .get(name)
            .ok_or_else(|| Unresolved(format!("unknown type `{name}`")))?;
        let native = self.native_name(name);
        let managed = self.managed_name(name);

        let target = match symbol.kind {
            ConstructKind::Enum => {
                let conversion = match direction {
                    Direction::Parameter => Conversion::StaticCast {
                        target: native.clone(),
                    },
                    Direction::ReturnValue => Conversion::StaticCast {
                        target: managed.clone(),
                    },
                };
                TargetType {
                    kind: MappedKind::Enum,
                    managed,
                    native,
                    conversion,
                }
            }
            ConstructKind::Struct => {
                let function = match direction {
                    Direction::Parameter => struct_to_native_fn(name),
                    Direction::ReturnValue => struct_to_managed_fn(name),
                };
                TargetType {
                    kind: MappedKind::Struct,
                    managed,
                    native,
                    conversion: Conversion::Call { function },
                }
            }
            ConstructKind::Class => {
                let conversion = match direction {
                    Direction::Parameter => Conversion::Unwrap {
                        field: self.field.to_string(),
                    },
                    Direction::ReturnValue => Conversion::Wrap {
                        managed: managed.clone(),
                        native: native.clone(),
                    },
                };
                TargetType {
                    kind: MappedKind::Class,
                    managed: format!("{managed}^"),
                    native,
                    conversion,
                }
            }
            ConstructKind::Protocol => {
                return Err(Unresolved(format!(
                    "protocol `{name}` can only be passed by pointer or reference"
                )))
            }
        };
        Ok(target)
    }

    fn optional(&self, inner: &TypeReference, direction: Direction) -> Result<TargetType, Unresolved> {
        if inner.is_optional() || inner.is_handle() {
            return Err(Unresolved(format!("`std::optional<{inner}>` has no managed mapping")));
        }
        let mapped = self.map(inner, direction)?;
        if mapped.kind == MappedKind::Void {
            return Err(Unresolved("`std::optional<void>` has no managed mapping".into()));
        }
        let value_type = mapped.kind.is_value_type();
        let native = format!("std::optional<{}>", mapped.native);
        let managed = if value_type {
            format!("System::Nullable<{}>", mapped.managed)
        } else {
            mapped.managed.clone()
        };
        let conversion = match direction {
            Direction::Parameter => Conversion::OptionalToNative {
                native: native.clone(),
                value_type,
                inner: Box::new(mapped.conversion),
            },
            Direction::ReturnValue => Conversion::OptionalToManaged {
                managed: managed.clone(),
                value_type,
                inner: Box::new(mapped.conversion),
            },
        };
        Ok(TargetType {
            kind: MappedKind::Optional,
            managed,
            native,
            conversion,
        })
    }

    fn collection(&self, element: &TypeReference, direction: Direction) -> Result<TargetType, Unresolved> {
        let mapped = self.map(element, direction)?;
        if mapped.kind == MappedKind::Void {
            return Err(Unresolved("`std::vector<void>` has no managed mapping".into()));
        }
        let native = format!("std::vector<{}>", mapped.native);
        let managed = format!(
            "System::Collections::Generic::List<{}>^",
            mapped.managed
        );
        let conversion = match direction {
            Direction::Parameter => Conversion::CollectionToNative {
                native: native.clone(),
                managed_element: mapped.managed.clone(),
                inner: Box::new(mapped.conversion),
            },
            Direction::ReturnValue => Conversion::CollectionToManaged {
                managed: managed.clone(),
                managed_element: mapped.managed.clone(),
                inner: Box::new(mapped.conversion),
            },
        };
        Ok(TargetType {
            kind: MappedKind::Collection,
            managed,
            native,
            conversion,
        })
    }

    fn handle(
        &self,
        form: HandleForm,
        pointee: Option<&str>,
        direction: Direction,
    ) -> Result<TargetType, Unresolved> {
        let spelled = TypeReference::handle(form, pointee.map(str::to_string)).to_string();
        let name = pointee.ok_or_else(|| {
            Unresolved(format!("opaque handle `{spelled}` has no managed mapping"))
        })?;
        let symbol = self.symbols.get(name).ok_or_else(|| {
            Unresolved(format!("opaque handle `{spelled}` has no managed mapping"))
        })?;

        let native_pointee = self.native_name(name);
        let native = match form {
            HandleForm::Raw => format!("{native_pointee}*"),
            HandleForm::Shared => format!("std::shared_ptr<{native_pointee}>"),
            HandleForm::Unique => format!("std::unique_ptr<{native_pointee}>"),
        };
        let managed_pointee = self.managed_name(name);

        let (kind, conversion) = match (symbol.kind, direction) {
            (ConstructKind::Class, Direction::Parameter) => {
                let field = self.field.to_string();
                let conversion = match form {
                    HandleForm::Raw => Conversion::UnwrapPointer { field },
                    HandleForm::Shared => Conversion::UnwrapCopy {
                        factory: format!("std::make_shared<{native_pointee}>"),
                        field,
                    },
                    HandleForm::Unique => Conversion::UnwrapCopy {
                        factory: format!("std::make_unique<{native_pointee}>"),
                        field,
                    },
                };
                (MappedKind::Class, conversion)
            }
            (ConstructKind::Class, Direction::ReturnValue) => {
                let conversion = match form {
                    HandleForm::Unique => Conversion::WrapRelease {
                        managed: managed_pointee.clone(),
                    },
                    HandleForm::Raw | HandleForm::Shared => Conversion::WrapPointee {
                        managed: managed_pointee.clone(),
                        native: native_pointee.clone(),
                    },
                };
                (MappedKind::Class, conversion)
            }
            (ConstructKind::Protocol, Direction::Parameter) => {
                self.require_bridge(name, symbol)?;
                (
                    MappedKind::Protocol,
                    Conversion::Bridge {
                        bridge: bridge_name(name),
                        holder: form.into(),
                    },
                )
            }
            (ConstructKind::Protocol, Direction::ReturnValue) => (
                MappedKind::Protocol,
                Conversion::Adapt {
                    adapter: self.managed_name(&self.symbols.adapter_for(name)),
                    native: native_pointee.clone(),
                    holder: form.into(),
                },
            ),
            (ConstructKind::Enum | ConstructKind::Struct, _) => {
                return Err(Unresolved(format!(
                    "handle `{spelled}` to a value type has no managed mapping"
                )))
            }
        };

        Ok(TargetType {
            kind,
            managed: format!("{managed_pointee}^"),
            native,
            conversion,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbols() -> SymbolTable {
        let mut table = SymbolTable::default();
        table.register("Mode", ConstructKind::Enum);
        table.register("Point", ConstructKind::Struct);
        table.register("Widget", ConstructKind::Class);
        table.register("Delegate", ConstructKind::Protocol);
        table
    }

    fn render(target: &TargetType, input: &str) -> Snippet {
        target.conversion.render(input, &mut Scratch::default())
    }

    #[test]
    fn primitives_are_identity_mapped() {
        let table = symbols();
        let policy = TypePolicy::new(&table, "N", "M", "native");
        for kind in [PrimitiveKind::Int, PrimitiveKind::UInt64, PrimitiveKind::Bool, PrimitiveKind::Double] {
            let t = policy.map(&TypeReference::primitive(kind), Direction::Parameter).unwrap();
            assert_eq!(t.managed, t.native);
            assert_eq!(t.conversion, Conversion::Direct);
        }
        assert!(policy
            .map(&TypeReference::primitive(PrimitiveKind::Void), Direction::Parameter)
            .is_err());
        assert_eq!(
            policy
                .map(&TypeReference::primitive(PrimitiveKind::Void), Direction::ReturnValue)
                .unwrap()
                .kind,
            MappedKind::Void
        );
    }

    #[test]
    fn optional_primitive_uses_nullable_and_never_zero() {
        let table = symbols();
        let policy = TypePolicy::new(&table, "N", "M", "native");
        let ty = TypeReference::optional(TypeReference::primitive(PrimitiveKind::Int));

        let out = policy.map(&ty, Direction::ReturnValue).unwrap();
        assert_eq!(out.managed, "System::Nullable<int>");
        assert_eq!(
            render(&out, "unmanagedResult").expr,
            "(unmanagedResult.has_value() ? System::Nullable<int>(unmanagedResult.value()) : System::Nullable<int>())"
        );

        let inp = policy.map(&ty, Direction::Parameter).unwrap();
        assert_eq!(
            render(&inp, "value").expr,
            "(!value.HasValue ? std::nullopt : std::optional<int>(value.Value))"
        );
    }

    #[test]
    fn optional_class_uses_nullptr() {
        let table = symbols();
        let policy = TypePolicy::new(&table, "N", "M", "native");
        let ty = TypeReference::optional(TypeReference::declared("Widget"));

        let out = policy.map(&ty, Direction::ReturnValue).unwrap();
        assert_eq!(out.managed, "M::Widget^");
        assert_eq!(
            render(&out, "r").expr,
            "(r.has_value() ? gcnew M::Widget(new N::Widget(r.value())) : nullptr)"
        );

        let inp = policy.map(&ty, Direction::Parameter).unwrap();
        assert_eq!(
            render(&inp, "w").expr,
            "(w == nullptr ? std::nullopt : std::optional<N::Widget>(*w->native))"
        );
    }

    #[test]
    fn enum_and_struct_conversions() {
        let table = symbols();
        let policy = TypePolicy::new(&table, "N", "M", "native");
        let mode = policy.map(&TypeReference::declared("Mode"), Direction::ReturnValue).unwrap();
        assert_eq!(render(&mode, "x").expr, "static_cast<M::Mode>(x)");
        let point = policy.map(&TypeReference::declared("Point"), Direction::Parameter).unwrap();
        assert_eq!(point.managed, "M::Point");
        assert_eq!(render(&point, "p").expr, "marshalPointToNative(p)");
    }

    #[test]
    fn strings_marshal_both_ways() {
        let table = symbols();
        let policy = TypePolicy::new(&table, "N", "M", "native");
        let ty = TypeReference::declared("std::string");
        let inp = policy.map(&ty, Direction::Parameter).unwrap();
        assert_eq!(render(&inp, "name").expr, "marshal_as<std::string>(name)");
        let out = policy.map(&ty, Direction::ReturnValue).unwrap();
        assert_eq!(out.managed, "System::String^");
        assert_eq!(render(&out, "r").expr, "marshal_as<System::String^>(r)");
    }

    #[test]
    fn collections_render_loops() {
        let table = symbols();
        let policy = TypePolicy::new(&table, "N", "M", "native");
        let ty = TypeReference::collection(TypeReference::declared("Widget"));

        let out = policy.map(&ty, Direction::ReturnValue).unwrap();
        assert_eq!(out.managed, "System::Collections::Generic::List<M::Widget^>^");
        let snippet = render(&out, "r");
        assert_eq!(snippet.expr, "managedArray0");
        assert_eq!(
            snippet.setup,
            vec![
                "System::Collections::Generic::List<M::Widget^>^ managedArray0 = gcnew System::Collections::Generic::List<M::Widget^>();",
                "for (auto &element1 : r) {",
                "    managedArray0->Add(gcnew M::Widget(new N::Widget(element1)));",
                "}",
            ]
        );

        let inp = policy.map(&ty, Direction::Parameter).unwrap();
        let snippet = render(&inp, "items");
        assert_eq!(snippet.setup[0], "std::vector<N::Widget> nativeArray0;");
        assert!(snippet.setup.contains(&"    for each (M::Widget^ element1 in items) {".to_string()));
        assert!(snippet.setup.contains(&"        nativeArray0.push_back(*element1->native);".to_string()));
    }

    #[test]
    fn protocols_need_indirection_and_bridges() {
        let mut table = symbols();
        let delegate = Parameter {
            name: "d".into(),
            ty: TypeReference::declared("Delegate"),
            passing: Passing::Value,
        };
        {
            let policy = TypePolicy::new(&table, "N", "M", "native");
            assert!(policy.map_param(&delegate, Direction::Parameter).is_err());

            let by_ref = Parameter {
                passing: Passing::Ref,
                ..delegate.clone()
            };
            let t = policy.map_param(&by_ref, Direction::Parameter).unwrap();
            let snippet = render(&t, "d");
            assert_eq!(snippet.setup, vec!["DelegateBridge bridge0(d);"]);
            assert_eq!(snippet.expr, "bridge0");

            let ptr = TypeReference::handle(HandleForm::Shared, Some("Delegate".into()));
            let t = policy.map(&ptr, Direction::Parameter).unwrap();
            assert_eq!(t.managed, "M::Delegate^");
            assert_eq!(
                render(&t, "d").expr,
                "(d == nullptr ? nullptr : std::make_shared<DelegateBridge>(d))"
            );
            let t = policy.map(&ptr, Direction::ReturnValue).unwrap();
            assert_eq!(
                render(&t, "r").expr,
                "(r == nullptr ? nullptr : gcnew M::DelegateAdapter(new std::shared_ptr<N::Delegate>(r)))"
            );
        }

        table.set_bridgeable("Delegate", false);
        let policy = TypePolicy::new(&table, "N", "M", "native");
        let ptr = TypeReference::handle(HandleForm::Raw, Some("Delegate".into()));
        assert!(policy.map(&ptr, Direction::Parameter).is_err());
        assert!(policy.map(&ptr, Direction::ReturnValue).is_ok());
    }

    #[test]
    fn protocol_results_by_reference() {
        let table = symbols();
        let policy = TypePolicy::new(&table, "N", "M", "native");
        let ty = TypeReference::declared("Delegate");

        let out = policy.map_return(&ty, Passing::ConstRef, Direction::ReturnValue).unwrap();
        assert_eq!(out.managed, "M::Delegate^");
        assert_eq!(
            render(&out, "r").expr,
            "gcnew M::DelegateAdapter(new std::shared_ptr<N::Delegate>(const_cast<N::Delegate*>(&r), [](N::Delegate*) {}))"
        );
        assert!(policy.map_return(&ty, Passing::Ref, Direction::Parameter).is_err());

        let err = policy.map_return(&ty, Passing::Value, Direction::ReturnValue).unwrap_err();
        assert!(err.0.contains("pointer or reference"));
        let mode = TypeReference::declared("Mode");
        assert_eq!(
            policy.map_return(&mode, Passing::ConstRef, Direction::Parameter).unwrap().kind,
            MappedKind::Enum
        );
    }

    #[test]
    fn adapter_names_step_past_declared_types() {
        let mut table = symbols();
        assert_eq!(table.adapter_for("Delegate"), "DelegateAdapter");
        table.register("DelegateAdapter", ConstructKind::Class);
        table.register("DelegateAdapter_", ConstructKind::Struct);
        assert_eq!(table.adapter_for("Delegate"), "DelegateAdapter__");

        let policy = TypePolicy::new(&table, "N", "M", "native");
        let ptr = TypeReference::handle(HandleForm::Raw, Some("Delegate".into()));
        let out = policy.map(&ptr, Direction::ReturnValue).unwrap();
        assert!(render(&out, "r").expr.contains("gcnew M::DelegateAdapter__("));
    }

    #[test]
    fn unknown_and_opaque_types_are_unresolved() {
        let table = symbols();
        let policy = TypePolicy::new(&table, "N", "M", "native");
        let err = policy.map(&TypeReference::declared("Gadget"), Direction::Parameter).unwrap_err();
        assert!(err.0.contains("Gadget"));
        assert!(policy
            .map(&TypeReference::handle(HandleForm::Raw, None), Direction::ReturnValue)
            .is_err());
        assert!(policy
            .map(
                &TypeReference::optional(TypeReference::optional(TypeReference::primitive(
                    PrimitiveKind::Int
                ))),
                Direction::ReturnValue
            )
            .is_err());
    }

    #[test]
    fn unique_handles_move_and_release() {
        let table = symbols();
        let policy = TypePolicy::new(&table, "N", "M", "native");
        let ty = TypeReference::handle(HandleForm::Unique, Some("Widget".into()));
        let inp = policy.map(&ty, Direction::Parameter).unwrap();
        assert!(inp.moves());
        assert_eq!(
            render(&inp, "w").expr,
            "(w == nullptr ? nullptr : std::make_unique<N::Widget>(*w->native))"
        );
        let out = policy.map(&ty, Direction::ReturnValue).unwrap();
        assert_eq!(
            render(&out, "r").expr,
            "(r == nullptr ? nullptr : gcnew M::Widget(r.release()))"
        );
    }

    #[test]
    fn nested_optional_collection_uses_statements() {
        let table = symbols();
        let policy = TypePolicy::new(&table, "N", "M", "native");
        let ty = TypeReference::optional(TypeReference::collection(TypeReference::primitive(
            PrimitiveKind::Int,
        )));
        let out = policy.map(&ty, Direction::ReturnValue).unwrap();
        let snippet = render(&out, "r");
        assert_eq!(snippet.expr, "optional2");
        assert_eq!(
            snippet.setup[0],
            "System::Collections::Generic::List<int>^ optional2 = nullptr;"
        );
        assert_eq!(snippet.setup[1], "if (r.has_value()) {");
    }
}
