//! `clrwrap check`: verify generated files on disk are current.

use std::path::Path;

use anyhow::{bail, Result};

use super::generate::{generate, jobs, on_disk_matches, GenerateArgs};
use crate::manifest::ClrwrapManifest;

/// Regenerate every manifest wrapper in memory and compare against disk.
pub fn run(project_dir: &Path, manifest: &ClrwrapManifest) -> Result<()> {
    let jobs = jobs(project_dir, Some((manifest, project_dir)), &GenerateArgs::default())?;

    let mut stale = Vec::new();
    let mut checked = 0;
    for job in &jobs {
        let output = generate(job)?;
        for file in &output.files {
            checked += 1;
            let path = job.output_dir.join(&file.name);
            if !on_disk_matches(&path, file)? {
                println!("  stale {}", path.display());
                stale.push(path);
            }
        }
    }

    if !stale.is_empty() {
        bail!(
            "{} of {checked} generated file(s) missing or out of date (run `clrwrap generate`)",
            stale.len()
        );
    }
    println!("All {checked} generated file(s) up to date");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::commands::generate;

    fn project() -> (tempfile::TempDir, ClrwrapManifest) {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("include")).unwrap();
        fs::write(
            dir.path().join("include/Api.hpp"),
            "namespace N { class Widget { void *h; public: int size() const; }; }\n",
        )
        .unwrap();
        let manifest = ClrwrapManifest::from_str(
            "[project]\nname = \"p\"\n\n[[wrapper]]\ninput = \"include/Api.hpp\"\ninput-namespace = \"N\"\noutput-namespace = \"M\"\n",
        )
        .unwrap();
        (dir, manifest)
    }

    #[test]
    fn missing_files_are_stale() {
        let (dir, manifest) = project();
        let err = run(dir.path(), &manifest).unwrap_err();
        assert!(err.to_string().contains("2 of 2"));
    }

    #[test]
    fn fresh_output_passes_and_edits_fail() {
        let (dir, manifest) = project();
        generate::run(
            dir.path(),
            Some((&manifest, dir.path())),
            GenerateArgs::default(),
        )
        .unwrap();
        run(dir.path(), &manifest).unwrap();

        fs::write(dir.path().join("generated/M.cpp"), "// edited\n").unwrap();
        let err = run(dir.path(), &manifest).unwrap_err();
        assert!(err.to_string().contains("1 of 2"));
    }
}
