//! Run report summarising one generation.

use std::fmt;

use clrwrap_core::{Diagnostic, DiagnosticKind};
use serde::Serialize;

use crate::ir::{IrTypeKind, WrapperModel};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeCounts {
    pub enums: usize,
    pub structs: usize,
    pub interfaces: usize,
    pub classes: usize,
    pub adapters: usize,
}

impl TypeCounts {
    pub fn of(model: &WrapperModel) -> Self {
        let count = |kind| model.types_of(kind).count();
        Self {
            enums: count(IrTypeKind::Enum),
            structs: count(IrTypeKind::Struct),
            interfaces: count(IrTypeKind::Interface),
            classes: count(IrTypeKind::Wrapper),
            adapters: count(IrTypeKind::Adapter),
        }
    }

    pub fn total(&self) -> usize {
        self.enums + self.structs + self.interfaces + self.classes + self.adapters
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    /// File name of the input header.
    pub header: String,
    pub input_namespace: String,
    pub output_namespace: String,
    /// Platform profile the files were rendered for.
    pub platform: String,
    pub types: TypeCounts,
    pub members_emitted: usize,
    pub unsupported: usize,
    pub unresolved: usize,
    /// Emitted files with their sizes in bytes.
    pub files: Vec<(String, usize)>,
    pub duration_ms: u64,
}

impl GenerationReport {
    pub fn count_diagnostics(&mut self, diagnostics: &[Diagnostic]) {
        self.unsupported = diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::UnsupportedConstruct)
            .count();
        self.unresolved = diagnostics
            .iter()
            .filter(|d| d.kind == DiagnosticKind::UnresolvedType)
            .count();
    }

    pub fn diagnostic_count(&self) -> usize {
        self.unsupported + self.unresolved
    }
}

impl fmt::Display for GenerationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Generation Report ===")?;
        writeln!(
            f,
            "Header: {} ({} -> {})",
            self.header, self.input_namespace, self.output_namespace
        )?;
        writeln!(f, "Platform: {}", self.platform)?;
        writeln!(f, "Duration: {} ms", self.duration_ms)?;
        writeln!(f)?;

        writeln!(f, "--- Types ({}) ---", self.types.total())?;
        writeln!(f, "  Enums: {}", self.types.enums)?;
        writeln!(f, "  Value structs: {}", self.types.structs)?;
        writeln!(f, "  Interfaces: {}", self.types.interfaces)?;
        writeln!(f, "  Classes: {}", self.types.classes)?;
        writeln!(f, "  Adapters: {}", self.types.adapters)?;
        writeln!(f, "  Members emitted: {}", self.members_emitted)?;

        writeln!(f)?;
        writeln!(f, "--- Diagnostics ({}) ---", self.diagnostic_count())?;
        writeln!(f, "  Unsupported constructs: {}", self.unsupported)?;
        writeln!(f, "  Unresolved types: {}", self.unresolved)?;

        if !self.files.is_empty() {
            writeln!(f)?;
            writeln!(f, "--- Files ---")?;
            for (name, size) in &self.files {
                writeln!(f, "  {name}: {size} bytes")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_display() {
        let mut report = GenerationReport {
            header: "Api.hpp".into(),
            input_namespace: "N".into(),
            output_namespace: "M".into(),
            platform: "portable".into(),
            types: TypeCounts {
                enums: 1,
                classes: 2,
                ..TypeCounts::default()
            },
            members_emitted: 7,
            unsupported: 0,
            unresolved: 0,
            files: vec![("M.h".into(), 120), ("M.cpp".into(), 640)],
            duration_ms: 3,
        };
        report.count_diagnostics(&[
            Diagnostic::unresolved("Widget::frob", "unknown type `Gadget`"),
            Diagnostic::unsupported("U", "unions have no managed equivalent"),
            Diagnostic::unsupported("V", "unions have no managed equivalent"),
        ]);

        let output = report.to_string();
        assert!(output.contains("Generation Report"));
        assert!(output.contains("Api.hpp (N -> M)"));
        assert!(output.contains("--- Types (3) ---"));
        assert!(output.contains("Unsupported constructs: 2"));
        assert!(output.contains("Unresolved types: 1"));
        assert!(output.contains("M.cpp: 640 bytes"));
    }
}
