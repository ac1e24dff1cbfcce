//! `clrwrap.toml` manifest parsing and wrapper configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clrwrap_codegen::{GenerateOptions, DEFAULT_WRAPPED_OBJECT_NAME};
use serde::{Deserialize, Serialize};

pub const MANIFEST_FILE: &str = "clrwrap.toml";

/// The top-level manifest structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClrwrapManifest {
    /// Project metadata (required).
    pub project: ProjectConfig,
    /// One entry per header to wrap.
    #[serde(default, rename = "wrapper")]
    pub wrappers: Vec<WrapperConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// A `[[wrapper]]` table. Paths are relative to the manifest directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct WrapperConfig {
    /// The interop header.
    pub input: PathBuf,
    pub input_namespace: String,
    pub output_namespace: String,
    #[serde(default = "default_wrapped_object_name")]
    pub wrapped_object_name: String,
    #[serde(default)]
    pub platform_root: Option<PathBuf>,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub verbose: bool,
}

fn default_wrapped_object_name() -> String {
    DEFAULT_WRAPPED_OBJECT_NAME.to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("generated")
}

impl WrapperConfig {
    pub fn header_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.input)
    }

    pub fn output_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.output_dir)
    }

    pub fn options(&self, project_dir: &Path) -> GenerateOptions {
        GenerateOptions {
            input_namespace: self.input_namespace.clone(),
            output_namespace: self.output_namespace.clone(),
            wrapped_object_name: self.wrapped_object_name.clone(),
            platform_root: self.platform_root.as_ref().map(|p| project_dir.join(p)),
            verbose: self.verbose,
        }
    }
}

impl ClrwrapManifest {
    /// Search upward from `start_dir` for a `clrwrap.toml` file, parse and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST_FILE);
            if candidate.is_file() {
                let content = std::fs::read_to_string(&candidate)
                    .with_context(|| format!("reading {}", candidate.display()))?;
                let manifest: ClrwrapManifest = toml::from_str(&content)
                    .with_context(|| format!("parsing {}", candidate.display()))?;
                return Ok(Some((manifest, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing clrwrap.toml")
    }

    /// Template written by `clrwrap init`.
    pub fn template(name: &str) -> String {
        format!(
            r#"[project]
name = "{name}"

[[wrapper]]
input = "include/Unmanaged.hpp"
input-namespace = "Unmanaged"
output-namespace = "Managed"
output-dir = "generated"
"#
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_manifest() {
        let manifest = ClrwrapManifest::from_str(
            r#"
[project]
name = "camera-sdk"
description = "Managed bindings for the camera SDK"

[[wrapper]]
input = "include/Camera.hpp"
input-namespace = "Camera"
output-namespace = "ManagedCamera"
wrapped-object-name = "native"
platform-root = "C:/Platforms/Windows.platform"
output-dir = "out/camera"
verbose = true

[[wrapper]]
input = "include/Storage.hpp"
input-namespace = "Vendor::Storage"
output-namespace = "ManagedStorage"
"#,
        )
        .unwrap();

        assert_eq!(manifest.project.name, "camera-sdk");
        assert_eq!(manifest.wrappers.len(), 2);

        let camera = &manifest.wrappers[0];
        assert_eq!(camera.wrapped_object_name, "native");
        assert!(camera.verbose);
        assert_eq!(camera.output_dir, PathBuf::from("out/camera"));

        let storage = &manifest.wrappers[1];
        assert_eq!(storage.wrapped_object_name, "wrappedObj");
        assert_eq!(storage.output_dir, PathBuf::from("generated"));
        assert!(storage.platform_root.is_none());
        assert!(!storage.verbose);
    }

    #[test]
    fn parse_minimal_manifest() {
        let manifest = ClrwrapManifest::from_str("[project]\nname = \"minimal\"\n").unwrap();
        assert_eq!(manifest.project.name, "minimal");
        assert!(manifest.wrappers.is_empty());
    }

    #[test]
    fn reject_invalid_toml() {
        assert!(ClrwrapManifest::from_str("this is not valid toml [[[").is_err());
        assert!(ClrwrapManifest::from_str(
            "[project]\nname = \"x\"\n[[wrapper]]\ninput = \"a.hpp\"\n"
        )
        .is_err());
    }

    #[test]
    fn options_resolve_against_project_dir() {
        let manifest = ClrwrapManifest::from_str(
            r#"
[project]
name = "p"

[[wrapper]]
input = "include/Api.hpp"
input-namespace = "N"
output-namespace = "M"
platform-root = "sdk/Windows.sdk"
"#,
        )
        .unwrap();
        let wrapper = &manifest.wrappers[0];
        let dir = Path::new("/work/p");
        assert_eq!(wrapper.header_path(dir), PathBuf::from("/work/p/include/Api.hpp"));
        assert_eq!(wrapper.output_path(dir), PathBuf::from("/work/p/generated"));

        let options = wrapper.options(dir);
        assert_eq!(options.input_namespace, "N");
        assert_eq!(options.output_namespace, "M");
        assert_eq!(
            options.platform_root,
            Some(PathBuf::from("/work/p/sdk/Windows.sdk"))
        );
    }

    #[test]
    fn template_is_valid_toml() {
        let manifest = ClrwrapManifest::from_str(&ClrwrapManifest::template("demo")).unwrap();
        assert_eq!(manifest.project.name, "demo");
        assert_eq!(manifest.wrappers.len(), 1);
        assert_eq!(manifest.wrappers[0].output_namespace, "Managed");
    }

    #[test]
    fn find_and_load_walks_up() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), "[project]\nname = \"parent\"\n").unwrap();

        let nested = dir.path().join("a").join("b");
        std::fs::create_dir_all(&nested).unwrap();

        let (manifest, found_dir) = ClrwrapManifest::find_and_load(&nested).unwrap().unwrap();
        assert_eq!(manifest.project.name, "parent");
        assert_eq!(found_dir, dir.path());
    }
}
