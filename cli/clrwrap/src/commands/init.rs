//! `clrwrap init`: manifest scaffolding.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::manifest::{ClrwrapManifest, MANIFEST_FILE};

/// Write a template `clrwrap.toml` into `dir`. The project is named after
/// the directory unless `name` is given.
pub fn run(dir: &Path, name: Option<&str>) -> Result<()> {
    let path = dir.join(MANIFEST_FILE);
    if path.exists() {
        bail!("{} already exists", path.display());
    }
    let name = match name {
        Some(name) => name.to_string(),
        None => dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "wrappers".to_string()),
    };

    fs::write(&path, ClrwrapManifest::template(&name))
        .with_context(|| format!("writing {}", path.display()))?;

    println!("Created {}", path.display());
    println!("  edit [[wrapper]] to point at your interop header, then run `clrwrap generate`");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_writes_valid_manifest() {
        let dir = tempfile::tempdir().unwrap();
        run(dir.path(), Some("camera")).unwrap();

        let content = fs::read_to_string(dir.path().join(MANIFEST_FILE)).unwrap();
        let manifest = ClrwrapManifest::from_str(&content).unwrap();
        assert_eq!(manifest.project.name, "camera");
        assert_eq!(manifest.wrappers.len(), 1);
    }

    #[test]
    fn init_refuses_existing_manifest() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "").unwrap();
        let err = run(dir.path(), None).unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }
}
