//! Type expressions: `const std::optional<Mode> &`, `unsigned long long`,
//! `std::shared_ptr<Impl>`, ...
//!
//! Anything well-formed but outside the recognised vocabulary becomes a
//! declared name holding its spelling, so the mapping policy can report it
//! as unresolved instead of the front end rejecting the whole header.

use clrwrap_core::{HandleForm, Passing, PrimitiveKind, TypeReference};

use crate::lexer::Token;

/// Keywords that can never be part of a type's identity.
const IGNORED: &[&str] = &["const", "volatile", "typename", "struct", "class", "enum", "union"];

/// Parse the tokens of one type expression.
///
/// Returns `None` when the slice holds no type at all.
pub fn parse_type(tokens: &[Token]) -> Option<(TypeReference, Passing)> {
    let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();
    parse_words(&words)
}

pub(crate) fn parse_words(words: &[&str]) -> Option<(TypeReference, Passing)> {
    let mut end = words.len();
    let mut passing = Passing::Value;

    // Reference and pointer declarators trail the base type.
    while end > 0 && matches!(words[end - 1], "const" | "volatile") {
        end -= 1;
    }
    if end > 0 && words[end - 1] == "&" {
        passing = Passing::Ref;
        end -= 1;
    } else if end > 0 && words[end - 1] == "&&" {
        end -= 1;
    }
    let mut pointers = 0;
    while end > 0 && matches!(words[end - 1], "*" | "const" | "volatile") {
        if words[end - 1] == "*" {
            pointers += 1;
        }
        end -= 1;
    }

    let base = &words[..end];
    let is_const = base.contains(&"const");
    if passing == Passing::Ref && is_const && pointers == 0 {
        passing = Passing::ConstRef;
    }

    let core: Vec<&str> = base
        .iter()
        .copied()
        .filter(|w| !IGNORED.contains(w))
        .collect();
    if core.is_empty() {
        return None;
    }

    let ty = match pointers {
        0 => parse_base(&core),
        1 => pointer_to(&core),
        _ => TypeReference::declared(spell(words)),
    };
    Some((ty, passing))
}

fn pointer_to(core: &[&str]) -> TypeReference {
    match parse_base(core) {
        TypeReference::Primitive {
            primitive: PrimitiveKind::Void,
        } => TypeReference::handle(HandleForm::Raw, None),
        other => TypeReference::handle(HandleForm::Raw, Some(other.to_string())),
    }
}

fn parse_base(core: &[&str]) -> TypeReference {
    if let Some(primitive) = parse_primitive(core) {
        return TypeReference::primitive(primitive);
    }

    let (name, args) = match split_template(core) {
        Some(split) => split,
        None => return TypeReference::declared(spell(core)),
    };

    let Some(args) = args else {
        return TypeReference::declared(name);
    };

    let first_arg = || parse_words(&args[0]).map(|(ty, _)| ty);
    let known = match (name.as_str(), args.len()) {
        ("std::optional" | "swift::Optional" | "optional", 1) => {
            first_arg().map(TypeReference::optional)
        }
        ("std::vector" | "swift::Array" | "vector", 1) => first_arg().map(TypeReference::collection),
        ("std::vector", 2) => first_arg().map(TypeReference::collection),
        ("std::shared_ptr" | "shared_ptr", 1) => {
            Some(TypeReference::handle(HandleForm::Shared, Some(spell(&args[0]))))
        }
        ("std::unique_ptr" | "unique_ptr", 1) => {
            Some(TypeReference::handle(HandleForm::Unique, Some(spell(&args[0]))))
        }
        _ => None,
    };
    known.unwrap_or_else(|| TypeReference::declared(spell(core)))
}

/// Split `a::b<x, y>` into its qualified name and template argument lists.
/// Returns `None` when the words are not a single (possibly templated) name.
fn split_template<'a>(core: &[&'a str]) -> Option<(String, Option<Vec<Vec<&'a str>>>)> {
    let open = core.iter().position(|w| *w == "<");
    let name_words = &core[..open.unwrap_or(core.len())];
    if !is_qualified_name(name_words) {
        return None;
    }
    let name = name_words.concat();
    let Some(open) = open else {
        return Some((name, None));
    };
    if core.last() != Some(&">") {
        return None;
    }

    let mut args = vec![Vec::new()];
    let mut depth = 0usize;
    for word in &core[open + 1..core.len() - 1] {
        match *word {
            "<" | "(" => depth += 1,
            ">" | ")" => depth = depth.checked_sub(1)?,
            "," if depth == 0 => {
                args.push(Vec::new());
                continue;
            }
            _ => {}
        }
        args.last_mut()?.push(*word);
    }
    if depth != 0 || args.iter().any(Vec::is_empty) {
        return None;
    }
    Some((name, Some(args)))
}

fn is_qualified_name(words: &[&str]) -> bool {
    if words.is_empty() {
        return false;
    }
    let mut expect_ident = true;
    for (i, word) in words.iter().enumerate() {
        if *word == "::" {
            if !expect_ident && i + 1 < words.len() {
                expect_ident = true;
                continue;
            }
            if i == 0 {
                continue;
            }
            return false;
        }
        if !expect_ident || !is_identifier(word) {
            return false;
        }
        expect_ident = false;
    }
    !expect_ident
}

fn is_identifier(word: &str) -> bool {
    let mut chars = word.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// Multi-keyword primitives: `unsigned long long`, `signed char`, ...
fn parse_primitive(core: &[&str]) -> Option<PrimitiveKind> {
    if let [single] = core {
        if let Some(kind) = PrimitiveKind::from_keyword(single) {
            return Some(kind);
        }
        if let Some(stripped) = single.strip_prefix("std::") {
            return PrimitiveKind::from_keyword(stripped);
        }
    }
    if let ["std", "::", name] = core {
        return PrimitiveKind::from_keyword(name).filter(|k| !k.is_void());
    }

    let unsigned = core.contains(&"unsigned");
    let signed = core.contains(&"signed");
    let rest: Vec<&str> = core
        .iter()
        .copied()
        .filter(|w| *w != "unsigned" && *w != "signed")
        .collect();

    let kind = match (rest.as_slice(), unsigned) {
        ([], true) | (["int"], true) => PrimitiveKind::UnsignedInt,
        ([], false) if signed => PrimitiveKind::Int,
        (["char"], true) => PrimitiveKind::UnsignedChar,
        (["char"], false) if signed => PrimitiveKind::SignedChar,
        (["short"] | ["short", "int"], true) => PrimitiveKind::UnsignedShort,
        (["short"] | ["short", "int"], false) => PrimitiveKind::Short,
        (["long"] | ["long", "int"], true) => PrimitiveKind::UnsignedLong,
        (["long"] | ["long", "int"], false) => PrimitiveKind::Long,
        (["long", "long"] | ["long", "long", "int"], true) => PrimitiveKind::UnsignedLongLong,
        (["long", "long"] | ["long", "long", "int"], false) => PrimitiveKind::LongLong,
        (["long", "double"], false) => PrimitiveKind::LongDouble,
        (["int"], false) if signed => PrimitiveKind::Int,
        _ => return None,
    };
    Some(kind)
}

/// Join words back into conventional C++ spelling.
pub(crate) fn spell(words: &[&str]) -> String {
    let mut out = String::new();
    let mut prev: Option<&str> = None;
    for word in words {
        let tight = matches!(*word, "::" | "<" | ">" | "," | "*" | "&" | "&&")
            || matches!(prev, Some("::" | "<"))
            || prev.is_none();
        if !tight {
            out.push(' ');
        }
        out.push_str(word);
        if *word == "," {
            out.push(' ');
        }
        prev = Some(word);
    }
    out.replace("  ", " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ty(src: &str) -> (TypeReference, Passing) {
        let tokens = crate::lexer::tokenize(src).unwrap();
        parse_type(&tokens).unwrap()
    }

    #[test]
    fn primitives_keep_their_width() {
        assert_eq!(ty("int").0, TypeReference::primitive(PrimitiveKind::Int));
        assert_eq!(
            ty("unsigned long long").0,
            TypeReference::primitive(PrimitiveKind::UnsignedLongLong)
        );
        assert_eq!(ty("uint8_t").0, TypeReference::primitive(PrimitiveKind::UInt8));
        assert_eq!(ty("std::int64_t").0, TypeReference::primitive(PrimitiveKind::Int64));
        assert_eq!(ty("unsigned").0, TypeReference::primitive(PrimitiveKind::UnsignedInt));
        assert_eq!(ty("signed char").0, TypeReference::primitive(PrimitiveKind::SignedChar));
    }

    #[test]
    fn const_reference_passing() {
        let (t, passing) = ty("const std::string &");
        assert_eq!(t, TypeReference::declared("std::string"));
        assert_eq!(passing, Passing::ConstRef);

        let (_, passing) = ty("Widget &");
        assert_eq!(passing, Passing::Ref);

        let (_, passing) = ty("const int");
        assert_eq!(passing, Passing::Value);
    }

    #[test]
    fn optional_and_collection() {
        assert_eq!(
            ty("std::optional<N::Mode>").0,
            TypeReference::optional(TypeReference::declared("N::Mode"))
        );
        assert_eq!(
            ty("std::vector<std::optional<int>>").0,
            TypeReference::collection(TypeReference::optional(TypeReference::primitive(
                PrimitiveKind::Int
            )))
        );
        assert_eq!(
            ty("swift::Array<Camera>").0,
            TypeReference::collection(TypeReference::declared("Camera"))
        );
    }

    #[test]
    fn handles() {
        assert_eq!(ty("void *").0, TypeReference::handle(HandleForm::Raw, None));
        assert_eq!(
            ty("std::shared_ptr<Other::Impl>").0,
            TypeReference::handle(HandleForm::Shared, Some("Other::Impl".into()))
        );
        assert_eq!(
            ty("Delegate * const").0,
            TypeReference::handle(HandleForm::Raw, Some("Delegate".into()))
        );
        assert_eq!(
            ty("std::unique_ptr<Impl>").0,
            TypeReference::handle(HandleForm::Unique, Some("Impl".into()))
        );
    }

    #[test]
    fn unknown_shapes_fall_back_to_spelling() {
        assert_eq!(ty("char **").0, TypeReference::declared("char**"));
        assert_eq!(
            ty("std::map<int, int>").0,
            TypeReference::declared("std::map<int, int>")
        );
    }

    #[test]
    fn elaborated_keywords_are_ignored() {
        assert_eq!(ty("struct Point").0, TypeReference::declared("Point"));
        assert_eq!(ty("::N::Point").0, TypeReference::declared("::N::Point"));
    }
}
