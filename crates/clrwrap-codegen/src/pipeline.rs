//! Operation orchestrator: index, classify, build and emit in one call.

use std::path::{Path, PathBuf};
use std::time::Instant;

use clrwrap_core::{sort_by_location, Diagnostic, FileKind, GeneratedFile};
use clrwrap_header::DeclarationIndex;

use crate::builder::{build, BuildOptions};
use crate::classify::classify;
use crate::emit::{emit, EmitOptions};
use crate::error::{GenerationError, Result};
use crate::platform::PlatformProfile;
use crate::report::{GenerationReport, TypeCounts};

pub const DEFAULT_WRAPPED_OBJECT_NAME: &str = "wrappedObj";

/// Options for one generation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateOptions {
    /// Namespace of the input header to wrap (`A` or `A::B`).
    pub input_namespace: String,
    /// Namespace of the generated managed types; also names the files.
    pub output_namespace: String,
    /// Field under which wrappers keep their native object.
    pub wrapped_object_name: String,
    /// SDK root the input header was produced against.
    pub platform_root: Option<PathBuf>,
    pub verbose: bool,
}

impl GenerateOptions {
    pub fn new(input_namespace: impl Into<String>, output_namespace: impl Into<String>) -> Self {
        Self {
            input_namespace: input_namespace.into(),
            output_namespace: output_namespace.into(),
            wrapped_object_name: DEFAULT_WRAPPED_OBJECT_NAME.to_string(),
            platform_root: None,
            verbose: false,
        }
    }

    pub fn validate(&self) -> Result<()> {
        check_qualified("input-namespace", &self.input_namespace)?;
        check_identifier("output-namespace", &self.output_namespace)?;
        check_identifier("wrapped-object-name", &self.wrapped_object_name)
    }
}

#[derive(Debug, Clone)]
pub struct GenerationOutput {
    /// Declaration file first, then the definition file.
    pub files: Vec<GeneratedFile>,
    pub diagnostics: Vec<Diagnostic>,
    pub report: GenerationReport,
}

impl GenerationOutput {
    pub fn file(&self, kind: FileKind) -> Option<&GeneratedFile> {
        self.files.iter().find(|f| f.kind == kind)
    }
}

/// Generate the managed wrapper for the header at `header`.
pub fn execute(header: &Path, options: &GenerateOptions) -> Result<GenerationOutput> {
    options.validate()?;
    let start = Instant::now();
    let index = DeclarationIndex::load(header, &options.input_namespace)?;
    run(&index, options, start)
}

/// Generate from in-memory header text; `file_name` is what the generated
/// code includes.
pub fn execute_source(
    source: &str,
    file_name: &str,
    options: &GenerateOptions,
) -> Result<GenerationOutput> {
    options.validate()?;
    let start = Instant::now();
    let index = DeclarationIndex::parse(source, file_name, &options.input_namespace)?;
    run(&index, options, start)
}

fn run(index: &DeclarationIndex, options: &GenerateOptions, start: Instant) -> Result<GenerationOutput> {
    // Stage 1: classification
    let classification = classify(index);

    // Stage 2: wrapper model
    let built = build(
        &classification,
        &BuildOptions {
            native_namespace: index.namespace().to_string(),
            managed_namespace: options.output_namespace.clone(),
            wrapped_object_name: options.wrapped_object_name.clone(),
            header_file: index.file_name().to_string(),
        },
    );

    // Stage 3: emission
    let platform = PlatformProfile::detect(options.platform_root.as_deref());
    let files = emit(
        &built.model,
        &EmitOptions {
            platform,
            verbose: options.verbose,
        },
    )?;

    let mut diagnostics = classification.diagnostics;
    diagnostics.extend(built.diagnostics);
    sort_by_location(&mut diagnostics);

    let mut report = GenerationReport {
        header: index.file_name().to_string(),
        input_namespace: index.namespace().to_string(),
        output_namespace: options.output_namespace.clone(),
        platform: platform.to_string(),
        types: TypeCounts::of(&built.model),
        members_emitted: built.model.member_count(),
        unsupported: 0,
        unresolved: 0,
        files: files.iter().map(|f| (f.name.clone(), f.contents.len())).collect(),
        duration_ms: start.elapsed().as_millis() as u64,
    };
    report.count_diagnostics(&diagnostics);

    log::info!(
        "generated {} types ({} members) from {} with {} diagnostics",
        report.types.total(),
        report.members_emitted,
        report.header,
        diagnostics.len()
    );

    Ok(GenerationOutput {
        files,
        diagnostics,
        report,
    })
}

const KEYWORDS: &[&str] = &[
    "alignas", "alignof", "asm", "auto", "bool", "break", "case", "catch", "char", "class",
    "const", "constexpr", "const_cast", "continue", "decltype", "default", "delete", "do",
    "double", "dynamic_cast", "else", "enum", "explicit", "export", "extern", "false", "float",
    "for", "friend", "gcnew", "generic", "goto", "if", "inline", "int", "interface", "long",
    "mutable", "namespace", "new", "noexcept", "nullptr", "operator", "private", "property",
    "protected", "public", "register", "reinterpret_cast", "return", "short", "signed", "sizeof",
    "static", "static_assert", "static_cast", "struct", "switch", "template", "this", "throw",
    "true", "try", "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual",
    "void", "volatile", "while",
];

fn is_identifier(value: &str) -> bool {
    let mut chars = value.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !KEYWORDS.contains(&value)
}

fn check_identifier(option: &'static str, value: &str) -> Result<()> {
    if is_identifier(value) {
        Ok(())
    } else {
        Err(GenerationError::InvalidOption {
            option,
            value: value.to_string(),
        })
    }
}

fn check_qualified(option: &'static str, value: &str) -> Result<()> {
    let trimmed = value.strip_prefix("::").unwrap_or(value);
    if trimmed.split("::").all(is_identifier) {
        Ok(())
    } else {
        Err(GenerationError::InvalidOption {
            option,
            value: value.to_string(),
        })
    }
}
