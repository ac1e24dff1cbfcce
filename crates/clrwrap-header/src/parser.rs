//! Recursive-descent parser for the declaration subset of C++.
//!
//! Produces every top-level declaration together with the namespace path it
//! was found in. Bodies of inline functions, initializer lists and default
//! arguments are skipped, not interpreted.

use clrwrap_core::{
    Access, Declaration, DeclKeyword, EnumCase, EnumValue, Member, Method, MethodKind, Parameter,
    Passing, PrimitiveKind, Property, SourceLocation, TypeReference,
};

use crate::error::{HeaderError, Result};
use crate::lexer::{tokenize, Token, TokenKind};
use crate::types::{parse_type, parse_words, spell};

/// A declaration and the `::`-joined namespace path enclosing it.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopedDeclaration {
    pub namespace: String,
    pub declaration: Declaration,
}

/// Everything the parser recovered from one header.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedHeader {
    pub declarations: Vec<ScopedDeclaration>,
    /// Every namespace path opened by the header, in order of first appearance.
    pub namespaces: Vec<String>,
}

/// Parse a complete header.
pub fn parse(source: &str) -> Result<ParsedHeader> {
    let tokens = tokenize(source)?;
    let mut parser = Parser {
        tokens,
        pos: 0,
        out: ParsedHeader::default(),
    };
    parser.scope("", false)?;
    Ok(parser.out)
}

const SPECIFIERS: &[&str] = &[
    "static", "virtual", "inline", "explicit", "constexpr", "consteval", "extern", "mutable",
    "friend",
];

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    out: ParsedHeader,
}

impl Parser {
    // ---- token cursor ---------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn at(&self, text: &str) -> bool {
        self.peek().is_some_and(|t| t.is(text))
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| self.error_eof())?;
        self.pos += 1;
        Ok(token)
    }

    fn eat(&mut self, text: &str) -> bool {
        if self.at(text) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, text: &str) -> Result<Token> {
        let token = self.next()?;
        if token.is(text) {
            Ok(token)
        } else {
            Err(error_at(&token, format!("expected `{text}`, found `{}`", token.text)))
        }
    }

    fn ident(&mut self) -> Result<Token> {
        let token = self.next()?;
        if token.is_ident() {
            Ok(token)
        } else {
            Err(error_at(&token, format!("expected identifier, found `{}`", token.text)))
        }
    }

    fn error_eof(&self) -> HeaderError {
        let (line, column) = self
            .tokens
            .last()
            .map(|t| (t.line, t.column + t.text.chars().count() as u32))
            .unwrap_or((1, 1));
        HeaderError::Syntax {
            line,
            column,
            detail: "unexpected end of input".to_string(),
        }
    }

    /// Skip `[[...]]`, `__attribute__((...))`, `__declspec(...)` and `alignas(...)`.
    fn skip_attributes(&mut self) -> Result<()> {
        loop {
            if self.at("[") && self.peek_at(1).is_some_and(|t| t.is("[")) {
                self.skip_balanced("[", "]")?;
            } else if self
                .peek()
                .is_some_and(|t| matches!(t.text.as_str(), "__attribute__" | "__declspec" | "alignas"))
            {
                self.pos += 1;
                if self.at("(") {
                    self.skip_balanced("(", ")")?;
                }
            } else {
                return Ok(());
            }
        }
    }

    /// Consume a balanced group starting at the current `open` token.
    fn skip_balanced(&mut self, open: &str, close: &str) -> Result<Vec<Token>> {
        let first = self.expect(open)?;
        let mut depth = 1usize;
        let mut inner = Vec::new();
        while depth > 0 {
            let token = self.next().map_err(|_| error_at(&first, format!("unclosed `{open}`")))?;
            if token.is(open) {
                depth += 1;
            } else if token.is(close) {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            inner.push(token);
        }
        Ok(inner)
    }

    /// Skip `<...>` after `template`.
    fn skip_template_params(&mut self) -> Result<()> {
        let first = self.expect("<")?;
        let mut depth = 1usize;
        while depth > 0 {
            let token = self
                .next()
                .map_err(|_| error_at(&first, "unclosed template parameter list"))?;
            match token.text.as_str() {
                "<" => depth += 1,
                ">" => depth -= 1,
                "(" => {
                    self.pos -= 1;
                    self.skip_balanced("(", ")")?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn skip_to_semicolon(&mut self) -> Result<()> {
        self.chunk().map(|_| ())
    }

    // ---- scopes ---------------------------------------------------------

    fn scope(&mut self, namespace: &str, braced: bool) -> Result<()> {
        loop {
            self.skip_attributes()?;
            let Some(token) = self.peek().cloned() else {
                if braced {
                    return Err(self.error_eof());
                }
                return Ok(());
            };

            match token.text.as_str() {
                ";" => self.pos += 1,
                "}" if braced => {
                    self.pos += 1;
                    return Ok(());
                }
                "}" => return Err(error_at(&token, "unbalanced `}`")),
                "namespace" => self.namespace(namespace)?,
                "inline" if self.peek_at(1).is_some_and(|t| t.is("namespace")) => self.pos += 1,
                "extern"
                    if self
                        .peek_at(1)
                        .is_some_and(|t| t.kind == TokenKind::Literal) =>
                {
                    self.pos += 2;
                    if self.at("{") {
                        self.pos += 1;
                        self.scope(namespace, true)?;
                    }
                }
                "template" => {
                    self.pos += 1;
                    self.skip_template_params()?;
                    self.skip_attributes()?;
                    let mut decl = self.declaration(&token)?;
                    if let Some(decl) = decl.as_mut() {
                        decl.is_template = true;
                    }
                    self.push(namespace, decl);
                }
                "using" if self.peek_at(1).is_some_and(|t| t.is("namespace")) => {
                    self.skip_to_semicolon()?
                }
                "static_assert" => self.skip_to_semicolon()?,
                _ => {
                    let decl = self.declaration(&token)?;
                    self.push(namespace, decl);
                }
            }
        }
    }

    fn push(&mut self, namespace: &str, decl: Option<Declaration>) {
        if let Some(declaration) = decl {
            self.out.declarations.push(ScopedDeclaration {
                namespace: namespace.to_string(),
                declaration,
            });
        }
    }

    fn namespace(&mut self, outer: &str) -> Result<()> {
        self.expect("namespace")?;
        self.skip_attributes()?;
        let mut path: Vec<String> = Vec::new();
        while self.peek().is_some_and(Token::is_ident) {
            let part = self.ident()?;
            path.push(part.text);
            if !self.eat("::") {
                break;
            }
            self.eat("inline");
        }
        self.skip_attributes()?;
        if self.at("=") {
            // namespace alias
            return self.skip_to_semicolon();
        }
        self.expect("{")?;

        let inner = if path.is_empty() {
            "(anonymous)".to_string()
        } else {
            path.join("::")
        };
        let full = if outer.is_empty() {
            inner
        } else {
            format!("{outer}::{inner}")
        };
        if !self.out.namespaces.contains(&full) {
            self.out.namespaces.push(full.clone());
        }
        self.scope(&full, true)
    }

    /// One namespace-scope declaration. `doc_token` is the first token of the
    /// declaration (including any `template` prefix) and carries its docs.
    fn declaration(&mut self, doc_token: &Token) -> Result<Option<Declaration>> {
        let doc = doc_token.doc.clone();
        let head = self.peek().cloned().ok_or_else(|| self.error_eof())?;
        let mut decl = match head.text.as_str() {
            "class" | "struct" | "union" => self.aggregate()?,
            "enum" => self.enumeration()?,
            "typedef" | "using" => Some(self.alias()?),
            _ => self.free_declaration()?,
        };
        if let Some(decl) = decl.as_mut() {
            if decl.doc.is_none() {
                decl.doc = doc;
            }
        }
        Ok(decl)
    }

    // ---- aggregates -----------------------------------------------------

    fn aggregate(&mut self) -> Result<Option<Declaration>> {
        let head = self.next()?;
        let keyword = match head.text.as_str() {
            "class" => DeclKeyword::Class,
            "struct" => DeclKeyword::Struct,
            _ => DeclKeyword::Union,
        };
        self.skip_attributes()?;

        let (name, location) = match self.peek() {
            Some(t) if t.is_ident() && !t.is("final") => {
                let t = self.ident()?;
                (t.text, SourceLocation::new(t.line, t.column))
            }
            _ => ("(anonymous)".to_string(), SourceLocation::new(head.line, head.column)),
        };
        self.eat("final");

        // Elaborated use at namespace scope (`struct X *p;`) is a variable.
        if !self.at(";") && !self.at(":") && !self.at("{") {
            self.pos -= 1;
            return self.free_declaration_from(head);
        }
        if self.eat(";") {
            return Ok(None);
        }

        let mut decl = Declaration::new(name, keyword, location);
        decl.doc = head.doc.clone();
        if self.eat(":") {
            decl.bases = self.base_list()?;
        }
        self.expect("{")?;

        let default_access = if keyword == DeclKeyword::Class {
            Access::Private
        } else {
            Access::Public
        };
        decl.members = self.members(&decl.name, default_access)?;
        self.expect("}")?;
        // Trailing declarators (`} instance;`) are ignored.
        while !self.at(";") {
            self.next()?;
        }
        self.expect(";")?;
        Ok(Some(decl))
    }

    fn base_list(&mut self) -> Result<Vec<String>> {
        let mut bases = Vec::new();
        loop {
            let mut words: Vec<Token> = Vec::new();
            while !self.at(",") && !self.at("{") {
                let token = self.next()?;
                if matches!(token.text.as_str(), "public" | "protected" | "private" | "virtual") {
                    continue;
                }
                words.push(token);
            }
            let texts: Vec<&str> = words.iter().map(|t| t.text.as_str()).collect();
            if texts.is_empty() {
                let token = self.peek().cloned().ok_or_else(|| self.error_eof())?;
                return Err(error_at(&token, "expected base class name"));
            }
            bases.push(spell(&texts));
            if !self.eat(",") {
                return Ok(bases);
            }
        }
    }

    fn members(&mut self, owner: &str, default_access: Access) -> Result<Vec<Member>> {
        let mut access = default_access;
        let mut members = Vec::new();
        loop {
            self.skip_attributes()?;
            let token = self.peek().cloned().ok_or_else(|| self.error_eof())?;
            match token.text.as_str() {
                "}" => return Ok(members),
                ";" => self.pos += 1,
                "public" | "protected" | "private"
                    if self.peek_at(1).is_some_and(|t| t.is(":")) =>
                {
                    access = match token.text.as_str() {
                        "public" => Access::Public,
                        "protected" => Access::Protected,
                        _ => Access::Private,
                    };
                    self.pos += 2;
                }
                "using" | "typedef" | "static_assert" | "friend" => {
                    self.skip_to_semicolon()?
                }
                "template" => {
                    self.pos += 1;
                    self.skip_template_params()?;
                    let chunk = self.chunk()?;
                    members.push(Member::Other {
                        name: chunk_name(&chunk),
                        reason: "member templates are not supported".into(),
                        location: SourceLocation::new(token.line, token.column),
                    });
                }
                "class" | "struct" | "union" | "enum" if self.is_nested_type() => {
                    let name_token = self.nested_type_name();
                    self.skip_nested_type()?;
                    if let Some(name) = name_token {
                        members.push(Member::Other {
                            name: name.text,
                            reason: "nested types are not supported".into(),
                            location: SourceLocation::new(name.line, name.column),
                        });
                    }
                }
                _ => {
                    let chunk = self.chunk()?;
                    members.extend(member(owner, chunk, access)?);
                }
            }
        }
    }

    fn is_nested_type(&self) -> bool {
        let mut offset = 1;
        while self
            .peek_at(offset)
            .is_some_and(|t| t.is("class") || t.is("struct"))
        {
            offset += 1;
        }
        if self.peek_at(offset).is_some_and(Token::is_ident) {
            offset += 1;
        }
        self.peek_at(offset)
            .is_some_and(|t| t.is("{") || t.is(":") || t.is(";"))
    }

    fn nested_type_name(&self) -> Option<Token> {
        (1..4)
            .filter_map(|i| self.peek_at(i))
            .find(|t| t.is_ident() && !t.is("class") && !t.is("struct"))
            .cloned()
    }

    fn skip_nested_type(&mut self) -> Result<()> {
        while !self.at("{") && !self.at(";") {
            self.next()?;
        }
        if self.at("{") {
            self.skip_balanced("{", "}")?;
        }
        self.skip_to_semicolon()
    }

    /// Collect the tokens of one declaration, up to its `;` or past the body
    /// of an inline function. The terminator is not included.
    fn chunk(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        let mut saw_params = false;
        loop {
            let token = self.peek().cloned().ok_or_else(|| self.error_eof())?;
            match token.text.as_str() {
                ";" => {
                    self.pos += 1;
                    return Ok(tokens);
                }
                "}" => return Err(error_at(&token, "expected `;`")),
                "(" | "[" => {
                    let close = if token.is("(") { ")" } else { "]" };
                    let open_text = token.text.clone();
                    let inner = self.skip_balanced(&open_text, close)?;
                    let closing = inner.last().cloned().unwrap_or_else(|| token.clone());
                    tokens.push(token.clone());
                    tokens.extend(inner);
                    tokens.push(Token {
                        kind: TokenKind::Punct,
                        text: close.to_string(),
                        line: closing.line,
                        column: closing.column,
                        doc: None,
                    });
                    if token.is("(") {
                        saw_params = true;
                    }
                }
                ":" if saw_params => {
                    self.pos += 1;
                    self.skip_initializers()?;
                }
                "{" if saw_params => {
                    self.skip_balanced("{", "}")?;
                    self.eat(";");
                    return Ok(tokens);
                }
                "{" => {
                    // Brace initializer of a data member.
                    self.skip_balanced("{", "}")?;
                }
                _ => {
                    self.pos += 1;
                    tokens.push(token);
                }
            }
        }
    }

    /// Skip a constructor initializer list, stopping before the body.
    fn skip_initializers(&mut self) -> Result<()> {
        loop {
            while !self.at("(") && !self.at("{") {
                self.next()?;
            }
            if self.at("(") {
                self.skip_balanced("(", ")")?;
            } else {
                self.skip_balanced("{", "}")?;
            }
            if !self.eat(",") {
                return Ok(());
            }
        }
    }

    // ---- enums ----------------------------------------------------------

    fn enumeration(&mut self) -> Result<Option<Declaration>> {
        let head = self.expect("enum")?;
        let _scoped = self.eat("class") || self.eat("struct");
        self.skip_attributes()?;
        let (name, location) = if self.peek().is_some_and(Token::is_ident) {
            let t = self.ident()?;
            (t.text, SourceLocation::new(t.line, t.column))
        } else {
            ("(anonymous)".to_string(), SourceLocation::new(head.line, head.column))
        };

        let mut backing = None;
        if self.eat(":") {
            let mut words = Vec::new();
            while !self.at("{") && !self.at(";") {
                words.push(self.next()?);
            }
            backing = parse_type(&words).map(|(ty, _)| ty);
        }
        if self.eat(";") {
            return Ok(None);
        }
        self.expect("{")?;

        let mut decl = Declaration::new(name, DeclKeyword::Enum, location);
        decl.doc = head.doc.clone();
        decl.backing = backing;
        loop {
            self.skip_attributes()?;
            if self.eat("}") {
                break;
            }
            let case = self.ident()?;
            self.skip_attributes()?;
            let value = if self.eat("=") {
                let mut words = Vec::new();
                let mut depth = 0usize;
                while !(depth == 0 && (self.at(",") || self.at("}"))) {
                    let token = self.next()?;
                    match token.text.as_str() {
                        "(" => depth += 1,
                        ")" => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    words.push(token.text);
                }
                enum_value(&words)
            } else {
                EnumValue::Implicit
            };
            decl.members.push(Member::EnumCase(EnumCase {
                name: case.text.clone(),
                value,
                location: SourceLocation::new(case.line, case.column),
                doc: case.doc.clone(),
            }));
            if !self.eat(",") {
                self.expect("}")?;
                break;
            }
        }
        self.expect(";")?;
        Ok(Some(decl))
    }

    // ---- other namespace-scope declarations -----------------------------

    fn alias(&mut self) -> Result<Declaration> {
        let head = self.next()?;
        let chunk = self.chunk()?;
        let name_token = if head.is("using") {
            chunk.first().cloned()
        } else {
            chunk.iter().rev().find(|t| t.is_ident()).cloned()
        };
        let (name, location) = match name_token {
            Some(t) => (t.text, SourceLocation::new(t.line, t.column)),
            None => ("(anonymous)".to_string(), SourceLocation::new(head.line, head.column)),
        };
        Ok(Declaration::new(name, DeclKeyword::Alias, location))
    }

    fn free_declaration(&mut self) -> Result<Option<Declaration>> {
        let head = self.peek().cloned().ok_or_else(|| self.error_eof())?;
        self.free_declaration_from(head)
    }

    fn free_declaration_from(&mut self, head: Token) -> Result<Option<Declaration>> {
        let chunk = self.chunk()?;
        if chunk.is_empty() {
            return Ok(None);
        }
        let keyword = if chunk.iter().any(|t| t.is("(")) {
            DeclKeyword::Function
        } else {
            DeclKeyword::Variable
        };
        let name_token = declarator_name(&chunk);
        let (name, location) = match name_token {
            Some(t) => (t.text.clone(), SourceLocation::new(t.line, t.column)),
            None => (chunk_name(&chunk), SourceLocation::new(head.line, head.column)),
        };
        Ok(Some(Declaration::new(name, keyword, location)))
    }
}

fn error_at(token: &Token, detail: impl Into<String>) -> HeaderError {
    HeaderError::Syntax {
        line: token.line,
        column: token.column,
        detail: detail.into(),
    }
}

// ---- member analysis ------------------------------------------------------

/// Index of the first `(` outside template brackets.
fn first_paren(tokens: &[Token]) -> Option<usize> {
    let mut angle = 0usize;
    for (i, t) in tokens.iter().enumerate() {
        match t.text.as_str() {
            "<" if i > 0 && !tokens[i - 1].is("operator") => angle += 1,
            ">" if angle > 0 => angle -= 1,
            "(" if angle == 0 => {
                // `operator()` names the call operator; its parameter list follows.
                if i > 0 && tokens[i - 1].is("operator") {
                    continue;
                }
                return Some(i);
            }
            _ => {}
        }
    }
    None
}

fn matching_paren(tokens: &[Token], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, t) in tokens.iter().enumerate().skip(open) {
        if t.is("(") {
            depth += 1;
        } else if t.is(")") {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// Split on commas at nesting depth zero.
fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    for (i, t) in tokens.iter().enumerate() {
        match t.text.as_str() {
            "(" | "[" | "<" | "{" => depth += 1,
            ")" | "]" | ">" | "}" => depth -= 1,
            "," if depth == 0 => {
                parts.push(&tokens[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < tokens.len() {
        parts.push(&tokens[start..]);
    }
    parts
}

fn position_top_level(tokens: &[Token], text: &str) -> Option<usize> {
    let mut depth = 0i32;
    for (i, t) in tokens.iter().enumerate() {
        match t.text.as_str() {
            "(" | "[" | "<" | "{" => depth += 1,
            ")" | "]" | ">" | "}" => depth -= 1,
            s if s == text && depth == 0 => return Some(i),
            _ => {}
        }
    }
    None
}

/// Best-effort name for a chunk that could not be analysed.
fn chunk_name(tokens: &[Token]) -> String {
    declarator_name(tokens)
        .map(|t| t.text.clone())
        .unwrap_or_else(|| "(unnamed)".to_string())
}

fn declarator_name(tokens: &[Token]) -> Option<&Token> {
    let end = first_paren(tokens)
        .or_else(|| position_top_level(tokens, "="))
        .or_else(|| position_top_level(tokens, "["))
        .unwrap_or(tokens.len());
    tokens[..end].iter().rev().find(|t| t.is_ident())
}

fn member(owner: &str, tokens: Vec<Token>, access: Access) -> Result<Vec<Member>> {
    let Some(first) = tokens.first() else {
        return Ok(Vec::new());
    };
    let doc = first.doc.clone();

    match first_paren(&tokens) {
        Some(open) => Ok(vec![method(owner, &tokens, open, access, doc)?]),
        None => Ok(fields(&tokens, access, doc)),
    }
}

fn method(
    owner: &str,
    tokens: &[Token],
    open: usize,
    access: Access,
    doc: Option<String>,
) -> Result<Member> {
    let close = matching_paren(tokens, open).ok_or_else(|| error_at(&tokens[open], "unclosed `(`"))?;

    // Name and kind.
    let operator_at = tokens[..open].iter().position(|t| t.is("operator"));
    let (name_start, name, kind) = if let Some(op) = operator_at {
        let spelled: String = tokens[op..open].iter().map(|t| t.text.as_str()).collect();
        (op, spelled, MethodKind::Operator)
    } else {
        let name_index = open
            .checked_sub(1)
            .ok_or_else(|| error_at(&tokens[open], "expected member name before `(`"))?;
        let name_token = &tokens[name_index];
        if name_index > 0 && tokens[name_index - 1].is("~") {
            (name_index - 1, format!("~{}", name_token.text), MethodKind::Destructor)
        } else if name_token.is(owner) {
            (name_index, name_token.text.clone(), MethodKind::Constructor)
        } else {
            (name_index, name_token.text.clone(), MethodKind::Instance)
        }
    };
    let name_token = &tokens[name_start];
    let location = SourceLocation::new(name_token.line, name_token.column);

    // Leading specifiers and return type.
    let mut is_static = false;
    let mut is_virtual = false;
    let mut return_words: Vec<&str> = Vec::new();
    for t in &tokens[..name_start] {
        match t.text.as_str() {
            "static" => is_static = true,
            "virtual" => is_virtual = true,
            s if SPECIFIERS.contains(&s) => {}
            s => return_words.push(s),
        }
    }
    let kind = match kind {
        MethodKind::Instance if is_static => MethodKind::Static,
        other => other,
    };
    let (return_type, return_passing) = match kind {
        MethodKind::Constructor | MethodKind::Destructor => {
            (TypeReference::primitive(PrimitiveKind::Void), Passing::Value)
        }
        _ => parse_words(&return_words)
            .ok_or_else(|| error_at(name_token, format!("missing return type for `{name}`")))?,
    };

    // Parameters.
    let mut params = Vec::new();
    let inner = &tokens[open + 1..close];
    let is_void_list = inner.len() == 1 && inner[0].is("void");
    if !inner.is_empty() && !is_void_list {
        for (i, part) in split_top_level(inner).into_iter().enumerate() {
            params.push(parameter(part, i).ok_or_else(|| {
                error_at(&tokens[open], format!("malformed parameter {} of `{name}`", i + 1))
            })?);
        }
    }

    // Trailing qualifiers.
    let mut is_const = false;
    let mut is_pure = false;
    let mut is_deleted = false;
    let mut rest = tokens[close + 1..].iter();
    while let Some(t) = rest.next() {
        match t.text.as_str() {
            "const" => is_const = true,
            "override" | "final" => is_virtual = true,
            "=" => match rest.next().map(|t| t.text.as_str()) {
                Some("0") => is_pure = true,
                Some("delete") => is_deleted = true,
                _ => {}
            },
            _ => {}
        }
    }

    Ok(Member::Method(Method {
        name,
        kind,
        params,
        return_type,
        return_passing,
        is_const,
        is_virtual: is_virtual || is_pure,
        is_pure,
        is_deleted,
        access,
        location,
        doc,
    }))
}

fn parameter(tokens: &[Token], index: usize) -> Option<Parameter> {
    let tokens = match position_top_level(tokens, "=") {
        Some(eq) => &tokens[..eq],
        None => tokens,
    };
    let words: Vec<&str> = tokens.iter().map(|t| t.text.as_str()).collect();

    // A trailing identifier names the parameter unless it is part of the type.
    let named = words.len() > 1
        && tokens.last().is_some_and(Token::is_ident)
        && !matches!(words[words.len() - 2], "::" | "unsigned" | "signed")
        && !is_type_keyword(words[words.len() - 1]);
    let (type_words, name) = if named {
        (&words[..words.len() - 1], words[words.len() - 1].to_string())
    } else {
        (&words[..], format!("arg{index}"))
    };
    let (ty, passing) = parse_words(type_words)?;
    Some(Parameter { name, ty, passing })
}

fn is_type_keyword(word: &str) -> bool {
    matches!(word, "const" | "volatile" | "long" | "short" | "int" | "char" | "double")
        || PrimitiveKind::from_keyword(word).is_some()
}

fn fields(tokens: &[Token], access: Access, doc: Option<String>) -> Vec<Member> {
    let mut is_static = false;
    let mut spec_end = 0;
    for t in tokens {
        match t.text.as_str() {
            "static" => is_static = true,
            s if SPECIFIERS.contains(&s) => {}
            _ => break,
        }
        spec_end += 1;
    }
    let tokens = &tokens[spec_end..];

    let declarators = split_top_level(tokens);
    let Some(first) = declarators.first() else {
        return Vec::new();
    };
    let first = strip_initializer(first);
    let Some(name_index) = first.iter().rposition(Token::is_ident) else {
        return Vec::new();
    };
    let base = &first[..name_index];
    let base_words: Vec<&str> = base
        .iter()
        .map(|t| t.text.as_str())
        .take_while(|w| *w != "*" && *w != "&")
        .collect();

    let mut out = Vec::new();
    for (i, declarator) in declarators.iter().enumerate() {
        let declarator = strip_initializer(declarator);
        let Some(name_index) = declarator.iter().rposition(Token::is_ident) else {
            continue;
        };
        let name_token = &declarator[name_index];
        let location = SourceLocation::new(name_token.line, name_token.column);

        if declarator[name_index + 1..]
            .iter()
            .any(|t| t.is("[") || t.is(":"))
        {
            out.push(Member::Other {
                name: name_token.text.clone(),
                reason: "array and bit-field members are not supported".into(),
                location,
            });
            continue;
        }

        let words: Vec<&str> = if i == 0 {
            declarator[..name_index].iter().map(|t| t.text.as_str()).collect()
        } else {
            base_words
                .iter()
                .copied()
                .chain(declarator[..name_index].iter().map(|t| t.text.as_str()))
                .collect()
        };
        let Some((ty, _)) = parse_words(&words) else {
            continue;
        };
        let read_only = is_read_only(&words);
        out.push(Member::Property(Property {
            name: name_token.text.clone(),
            ty,
            read_only,
            is_static,
            access,
            location,
            doc: if i == 0 { doc.clone() } else { None },
        }));
    }
    out
}

fn strip_initializer(tokens: &[Token]) -> &[Token] {
    match position_top_level(tokens, "=") {
        Some(eq) => &tokens[..eq],
        None => tokens,
    }
}

/// `const int x` and `T * const p` are read-only; `const char *p` is not.
fn is_read_only(words: &[&str]) -> bool {
    match words.iter().rposition(|w| *w == "*") {
        Some(star) => words[star + 1..].contains(&"const"),
        None => words.contains(&"const"),
    }
}

fn enum_value(words: &[String]) -> EnumValue {
    let joined: String = words.concat();
    let (negative, digits) = match joined.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, joined.strip_prefix('+').unwrap_or(&joined)),
    };
    match parse_integer(digits) {
        Some(magnitude) => {
            let magnitude = i128::from(magnitude);
            EnumValue::Literal(if negative { -magnitude } else { magnitude })
        }
        None => EnumValue::Expression(spell(&words.iter().map(String::as_str).collect::<Vec<_>>())),
    }
}

/// Integer literal with C++ prefixes, digit separators and suffixes.
fn parse_integer(text: &str) -> Option<u64> {
    let cleaned: String = text.chars().filter(|c| *c != '\'').collect();
    let trimmed = cleaned.trim_end_matches(['u', 'U', 'l', 'L', 'z', 'Z']);
    let (radix, digits) = if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        (16, hex)
    } else if let Some(bin) = trimmed
        .strip_prefix("0b")
        .or_else(|| trimmed.strip_prefix("0B"))
    {
        (2, bin)
    } else if trimmed.len() > 1 && trimmed.starts_with('0') {
        (8, &trimmed[1..])
    } else {
        (10, trimmed)
    };
    if digits.is_empty() {
        return None;
    }
    u64::from_str_radix(digits, radix).ok()
}
