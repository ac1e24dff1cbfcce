//! Rendering of a [`WrapperModel`] into the declaration and definition files.

mod header;
mod source;

use std::fmt::{self, Write as _};

use clrwrap_core::{FileKind, GeneratedFile};

use crate::error::{GenerationError, Result};
use crate::ir::{IrParam, Origin, WrapperModel};
use crate::platform::PlatformProfile;

pub(crate) const BANNER: &str = "// This is an auto-generated file. Do not modify.";

#[derive(Debug, Clone, Copy)]
pub struct EmitOptions {
    pub platform: PlatformProfile,
    /// Annotate members with the native declaration they came from.
    pub verbose: bool,
}

pub fn declaration_file_name(model: &WrapperModel) -> String {
    format!("{}.h", model.managed_namespace)
}

pub fn definition_file_name(model: &WrapperModel) -> String {
    format!("{}.cpp", model.managed_namespace)
}

/// Render both files. Always returns exactly two, declaration first.
pub fn emit(model: &WrapperModel, options: &EmitOptions) -> Result<Vec<GeneratedFile>> {
    let header_name = declaration_file_name(model);
    let source_name = definition_file_name(model);

    let header = header::render(model, options).map_err(|e| emit_error(&header_name, e))?;
    let source =
        source::render(model, options, &header_name).map_err(|e| emit_error(&source_name, e))?;

    Ok(vec![
        GeneratedFile::new(
            FileKind::Declaration,
            header_name,
            options.platform.apply_newlines(&header).into_bytes(),
        ),
        GeneratedFile::new(
            FileKind::Definition,
            source_name,
            options.platform.apply_newlines(&source).into_bytes(),
        ),
    ])
}

fn emit_error(file: &str, err: fmt::Error) -> GenerationError {
    GenerationError::Emit {
        file: file.to_string(),
        message: err.to_string(),
    }
}

/// Line-oriented writer with four-space indentation.
pub(crate) struct CodeWriter {
    out: String,
    depth: usize,
}

impl CodeWriter {
    pub(crate) fn new() -> Self {
        Self {
            out: String::new(),
            depth: 0,
        }
    }

    pub(crate) fn line(&mut self, text: impl fmt::Display) -> fmt::Result {
        let text = text.to_string();
        if text.is_empty() {
            return self.blank();
        }
        writeln!(self.out, "{:width$}{text}", "", width = self.depth * 4)
    }

    pub(crate) fn lines<I>(&mut self, lines: I) -> fmt::Result
    where
        I: IntoIterator,
        I::Item: fmt::Display,
    {
        for line in lines {
            self.line(line)?;
        }
        Ok(())
    }

    pub(crate) fn blank(&mut self) -> fmt::Result {
        self.out.write_char('\n')
    }

    /// `///` lines for a documentation comment.
    pub(crate) fn doc(&mut self, doc: Option<&str>) -> fmt::Result {
        for line in doc.into_iter().flat_map(str::lines) {
            if line.is_empty() {
                self.line("///")?;
            } else {
                self.line(format_args!("/// {line}"))?;
            }
        }
        Ok(())
    }

    pub(crate) fn indent(&mut self) {
        self.depth += 1;
    }

    pub(crate) fn dedent(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn finish(self) -> String {
        self.out
    }
}

/// `// from N::Widget::resize (line 12)`
pub(crate) fn origin_comment(model: &WrapperModel, origin: &Origin) -> String {
    format!(
        "// from {}::{}::{} (line {})",
        model.native_namespace, origin.declaration, origin.member, origin.location.line
    )
}

/// Declare a local, keeping `*` and `&` against the type.
pub(crate) fn declare(ty: &str, name: &str) -> String {
    format!("{ty} {name}")
}

pub(crate) fn managed_params(params: &[IrParam]) -> String {
    params
        .iter()
        .map(|p| declare(&p.managed, &p.name))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_indents_and_skips_trailing_whitespace() {
        let mut w = CodeWriter::new();
        w.line("namespace M {").unwrap();
        w.indent();
        w.doc(Some("First.\n\nThird.")).unwrap();
        w.line("").unwrap();
        w.dedent();
        w.line("}").unwrap();
        assert_eq!(
            w.finish(),
            "namespace M {\n    /// First.\n    ///\n    /// Third.\n\n}\n"
        );
    }
}
