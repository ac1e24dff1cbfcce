//! `clrwrap inspect`: show how a header's declarations are classified.

use std::path::Path;

use anyhow::{bail, Context, Result};
use clrwrap_codegen::{classify, Classification};
use clrwrap_header::DeclarationIndex;
use serde::Serialize;

#[derive(Serialize)]
struct InspectReport<'a> {
    header: &'a str,
    namespace: &'a str,
    #[serde(flatten)]
    classification: &'a Classification,
}

pub fn run(header: &Path, namespace: &str, format: Option<&str>) -> Result<()> {
    let index = DeclarationIndex::load(header, namespace)
        .with_context(|| format!("indexing {}", header.display()))?;
    let classification = classify(&index);

    let output = match format.unwrap_or("human") {
        "human" => render_human(&index, &classification),
        "json" => {
            let report = InspectReport {
                header: index.file_name(),
                namespace: index.namespace(),
                classification: &classification,
            };
            serde_json::to_string_pretty(&report).context("serializing classification")?
        }
        other => bail!("unknown format '{other}' (expected human or json)"),
    };
    println!("{output}");
    Ok(())
}

fn render_human(index: &DeclarationIndex, classification: &Classification) -> String {
    let mut out = format!(
        "--- {} (namespace {}) ---\n",
        index.file_name(),
        index.namespace()
    );
    if !index.namespace_found() {
        out.push_str("  namespace not found in header\n");
    }
    for decl in &classification.declarations {
        let detail = match &decl.handle_field {
            Some(field) => format!(" (handle `{field}`)"),
            None => String::new(),
        };
        out.push_str(&format!(
            "  {:<9} {}{detail}  [line {}]\n",
            decl.kind.to_string(),
            decl.name(),
            decl.declaration.location.line
        ));
    }
    if !classification.diagnostics.is_empty() {
        out.push_str(&format!(
            "\n--- Diagnostics ({}) ---\n",
            classification.diagnostics.len()
        ));
        for diagnostic in &classification.diagnostics {
            out.push_str(&format!("  {diagnostic}\n"));
        }
    }
    out
}
