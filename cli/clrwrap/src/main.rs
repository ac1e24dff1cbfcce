//! clrwrap CLI: generate managed C++/CLI wrappers for interop headers.

mod commands;
mod manifest;

use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};

use commands::generate::GenerateArgs;
use manifest::ClrwrapManifest;

#[derive(Parser)]
#[command(name = "clrwrap", version, about = "Managed wrapper generator for interop headers")]
struct Cli {
    /// Debug logging; for `generate`, also trace members to their native origin
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a template clrwrap.toml in the current directory
    Init {
        /// Project name (default: directory name)
        name: Option<String>,
    },
    /// Generate the declaration and definition files
    Generate {
        /// Interop header (default: every [[wrapper]] in clrwrap.toml)
        header: Option<PathBuf>,
        /// Namespace of the header to wrap
        #[arg(long)]
        input_namespace: Option<String>,
        /// Namespace of the generated managed types
        #[arg(long)]
        output_namespace: Option<String>,
        /// Field holding the native object in each wrapper
        #[arg(long)]
        wrapped_object_name: Option<String>,
        /// SDK root the header was produced against
        #[arg(long)]
        platform_root: Option<PathBuf>,
        /// Output directory
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Fail if generated files are missing or out of date
    Check,
    /// Show how the declarations of a header are classified
    Inspect {
        /// Interop header
        header: PathBuf,
        /// Namespace of the header to inspect
        #[arg(long)]
        input_namespace: String,
        /// Output format (human, json)
        #[arg(long)]
        format: Option<String>,
    },
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .init();

    let result = run(cli);
    if let Err(e) = result {
        eprintln!("error: {e:#}");
        process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { name } => commands::init::run(&cwd, name.as_deref()),

        Commands::Generate {
            header,
            input_namespace,
            output_namespace,
            wrapped_object_name,
            platform_root,
            output,
        } => {
            let loaded = ClrwrapManifest::find_and_load(&cwd)?;
            let args = GenerateArgs {
                header,
                input_namespace,
                output_namespace,
                wrapped_object_name,
                platform_root,
                output_dir: output,
                verbose: cli.verbose,
            };
            commands::generate::run(
                &cwd,
                loaded.as_ref().map(|(m, dir)| (m, dir.as_path())),
                args,
            )
        }

        Commands::Check => {
            let (manifest, project_dir) = load_manifest_required(&cwd)?;
            commands::check::run(&project_dir, &manifest)
        }

        Commands::Inspect {
            header,
            input_namespace,
            format,
        } => commands::inspect::run(&cwd.join(header), &input_namespace, format.as_deref()),
    }
}

/// Load manifest, returning error if not found.
fn load_manifest_required(cwd: &Path) -> anyhow::Result<(ClrwrapManifest, PathBuf)> {
    match ClrwrapManifest::find_and_load(cwd)? {
        Some((manifest, dir)) => Ok((manifest, dir)),
        None => anyhow::bail!("no clrwrap.toml found (run `clrwrap init` first)"),
    }
}

#[cfg(test)]
mod integration_tests {
    use std::fs;

    use super::*;

    /// Full workflow: init, add a header, generate, check.
    #[test]
    fn init_generate_check_workflow() {
        let dir = tempfile::tempdir().unwrap();
        let project = dir.path();

        commands::init::run(project, Some("workflow")).unwrap();
        fs::create_dir_all(project.join("include")).unwrap();
        fs::write(
            project.join("include/Unmanaged.hpp"),
            "#pragma once\nnamespace Unmanaged {\n\
             struct Point { int x; int y; };\n\
             class Canvas { void *impl; public: Canvas(); void moveTo(const Point &p); Point position() const; };\n\
             }\n",
        )
        .unwrap();

        let (manifest, project_dir) = load_manifest_required(project).unwrap();
        assert_eq!(project_dir, project);

        commands::generate::run(
            project,
            Some((&manifest, project_dir.as_path())),
            GenerateArgs::default(),
        )
        .unwrap();
        let header = fs::read_to_string(project.join("generated/Managed.h")).unwrap();
        assert!(header.contains("public value struct Point {"));
        assert!(header.contains("public ref class Canvas {"));

        commands::check::run(&project_dir, &manifest).unwrap();
    }

    #[test]
    fn cli_parses_generate_flags() {
        let cli = Cli::try_parse_from([
            "clrwrap",
            "generate",
            "Api.hpp",
            "--input-namespace",
            "N",
            "--output-namespace",
            "M",
            "--wrapped-object-name",
            "native",
            "-o",
            "out",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Commands::Generate {
                header,
                wrapped_object_name,
                output,
                ..
            } => {
                assert_eq!(header, Some(PathBuf::from("Api.hpp")));
                assert_eq!(wrapped_object_name.as_deref(), Some("native"));
                assert_eq!(output, Some(PathBuf::from("out")));
            }
            _ => panic!("expected generate"),
        }
    }
}
