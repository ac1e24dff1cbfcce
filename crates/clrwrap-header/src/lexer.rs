//! Tokenizer for the declaration subset of C++.
//!
//! Preprocessor lines and ordinary comments are dropped. Documentation
//! comments (`///`, `//!`, `/** */`) are attached to the token that follows
//! them so the parser can carry them onto declarations.

use crate::error::{HeaderError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Ident,
    Number,
    /// String or character literal, quotes included.
    Literal,
    Punct,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub line: u32,
    pub column: u32,
    pub doc: Option<String>,
}

impl Token {
    pub fn is(&self, text: &str) -> bool {
        self.text == text
    }

    pub fn is_ident(&self) -> bool {
        self.kind == TokenKind::Ident
    }
}

/// Multi-character punctuators, longest first. `>>` is deliberately absent so
/// nested template argument lists close one bracket at a time.
const PUNCTUATORS: &[&str] = &[
    "...", "<=>", "::", "->", "==", "!=", "<=", ">=", "&&", "||", "++", "--", "+=", "-=", "*=",
    "/=", "<<",
];

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    column: u32,
    at_line_start: bool,
    pending_doc: Vec<String>,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            at_line_start: true,
            pending_doc: Vec::new(),
            tokens: Vec::new(),
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.get(self.pos).copied()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
            self.at_line_start = true;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn error(&self, detail: impl Into<String>) -> HeaderError {
        HeaderError::Syntax {
            line: self.line,
            column: self.column,
            detail: detail.into(),
        }
    }

    fn run(mut self) -> Result<Vec<Token>> {
        while let Some(c) = self.peek(0) {
            if c.is_whitespace() {
                self.bump();
                continue;
            }
            if c == '#' && self.at_line_start {
                self.skip_preprocessor_line();
                continue;
            }
            self.at_line_start = false;

            if c == '/' && self.peek(1) == Some('/') {
                self.line_comment();
                continue;
            }
            if c == '/' && self.peek(1) == Some('*') {
                self.block_comment()?;
                continue;
            }

            let (line, column) = (self.line, self.column);
            let (kind, text) = if c.is_alphabetic() || c == '_' {
                (TokenKind::Ident, self.take_while(|c| c.is_alphanumeric() || c == '_'))
            } else if c.is_ascii_digit() || (c == '.' && self.peek(1).is_some_and(|d| d.is_ascii_digit())) {
                (TokenKind::Number, self.number())
            } else if c == '"' || c == '\'' {
                (TokenKind::Literal, self.literal(c)?)
            } else {
                (TokenKind::Punct, self.punct())
            };

            let doc = if self.pending_doc.is_empty() {
                None
            } else {
                Some(std::mem::take(&mut self.pending_doc).join("\n"))
            };
            self.tokens.push(Token {
                kind,
                text,
                line,
                column,
                doc,
            });
        }
        Ok(self.tokens)
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek(0) {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    fn number(&mut self) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek(0) {
            let exponent_sign = (c == '+' || c == '-')
                && matches!(out.chars().last(), Some('e' | 'E' | 'p' | 'P'))
                && !out.starts_with("0x");
            if c.is_alphanumeric() || c == '.' || c == '\'' || exponent_sign {
                out.push(c);
                self.bump();
            } else {
                break;
            }
        }
        out
    }

    fn literal(&mut self, quote: char) -> Result<String> {
        let mut out = String::new();
        out.push(quote);
        self.bump();
        loop {
            match self.bump() {
                Some('\\') => {
                    out.push('\\');
                    if let Some(escaped) = self.bump() {
                        out.push(escaped);
                    }
                }
                Some('\n') | None => return Err(self.error("unterminated literal")),
                Some(c) if c == quote => {
                    out.push(c);
                    return Ok(out);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn punct(&mut self) -> String {
        for candidate in PUNCTUATORS {
            let matches = candidate
                .chars()
                .enumerate()
                .all(|(i, c)| self.peek(i) == Some(c));
            if matches {
                for _ in 0..candidate.chars().count() {
                    self.bump();
                }
                return (*candidate).to_string();
            }
        }
        self.bump().map(String::from).unwrap_or_default()
    }

    fn skip_preprocessor_line(&mut self) {
        while let Some(c) = self.peek(0) {
            if c == '\\' && self.peek(1) == Some('\n') {
                self.bump();
                self.bump();
                continue;
            }
            if c == '\n' {
                break;
            }
            self.bump();
        }
        // Documentation does not survive across a directive.
        self.pending_doc.clear();
    }

    fn line_comment(&mut self) {
        self.bump();
        self.bump();
        let marker = self.peek(0);
        let is_doc = (marker == Some('/') && self.peek(1) != Some('/')) || marker == Some('!');
        if is_doc {
            self.bump();
        }
        let text = self.take_while(|c| c != '\n');
        if is_doc {
            self.pending_doc.push(text.trim().to_string());
        }
    }

    fn block_comment(&mut self) -> Result<()> {
        self.bump();
        self.bump();
        let is_doc = self.peek(0) == Some('*') && self.peek(1) != Some('/');
        let mut body = String::new();
        loop {
            match self.peek(0) {
                None => return Err(self.error("unterminated block comment")),
                Some('*') if self.peek(1) == Some('/') => {
                    self.bump();
                    self.bump();
                    break;
                }
                Some(c) => {
                    body.push(c);
                    self.bump();
                }
            }
        }
        if is_doc {
            let lines = body
                .lines()
                .map(|l| l.trim().trim_start_matches('*').trim())
                .filter(|l| !l.is_empty())
                .map(str::to_string);
            self.pending_doc.extend(lines);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(src: &str) -> Vec<String> {
        tokenize(src).unwrap().into_iter().map(|t| t.text).collect()
    }

    #[test]
    fn skips_preprocessor_and_comments() {
        let src = "#pragma once\n#include <string>\n// note\nnamespace N { /* x */ }\n";
        assert_eq!(texts(src), vec!["namespace", "N", "{", "}"]);
    }

    #[test]
    fn continued_directive_is_skipped_entirely() {
        let src = "#define X(a) \\\n  a + 1\nint y;";
        assert_eq!(texts(src), vec!["int", "y", ";"]);
    }

    #[test]
    fn template_brackets_stay_separate() {
        let src = "std::optional<std::vector<int>> get();";
        assert_eq!(
            texts(src),
            vec![
                "std", "::", "optional", "<", "std", "::", "vector", "<", "int", ">", ">", "get",
                "(", ")", ";"
            ]
        );
    }

    #[test]
    fn doc_comments_attach_to_next_token() {
        let src = "/// A widget.\n/// Second line.\nclass Widget;";
        let tokens = tokenize(src).unwrap();
        assert_eq!(tokens[0].text, "class");
        assert_eq!(tokens[0].doc.as_deref(), Some("A widget.\nSecond line."));
        assert!(tokens[1].doc.is_none());

        let src = "/**\n * Block doc.\n */\nenum E {};";
        let tokens = tokenize(src).unwrap();
        assert_eq!(tokens[0].doc.as_deref(), Some("Block doc."));
    }

    #[test]
    fn positions_are_one_based() {
        let tokens = tokenize("int\n  count;").unwrap();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (2, 3));
    }

    #[test]
    fn numbers_and_literals() {
        assert_eq!(texts("a = 0x1F, b = -3, c = 1'000u;"), vec![
            "a", "=", "0x1F", ",", "b", "=", "-", "3", ",", "c", "=", "1'000u", ";"
        ]);
        assert_eq!(texts(r#"extern "C" {"#), vec!["extern", "\"C\"", "{"]);
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let err = tokenize("int x; /* open").unwrap_err();
        assert!(matches!(err, HeaderError::Syntax { line: 1, .. }));
    }
}
