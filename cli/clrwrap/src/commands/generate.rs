//! `clrwrap generate`: wrapper generation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clrwrap_codegen::{execute, GenerateOptions, GenerationOutput};
use clrwrap_core::{content_digest, GeneratedFile};

use crate::manifest::ClrwrapManifest;

/// Flags given on the command line. Any of them overrides the manifest.
#[derive(Debug, Default)]
pub struct GenerateArgs {
    pub header: Option<PathBuf>,
    pub input_namespace: Option<String>,
    pub output_namespace: Option<String>,
    pub wrapped_object_name: Option<String>,
    pub platform_root: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub verbose: bool,
}

/// One header to generate a wrapper for.
#[derive(Debug)]
pub(crate) struct Job {
    pub header: PathBuf,
    pub options: GenerateOptions,
    pub output_dir: PathBuf,
}

pub fn run(cwd: &Path, manifest: Option<(&ClrwrapManifest, &Path)>, args: GenerateArgs) -> Result<()> {
    let jobs = jobs(cwd, manifest, &args)?;
    for job in &jobs {
        let output = generate(job)?;
        let mut written = 0;
        for file in &output.files {
            if write_if_changed(&job.output_dir, file)? {
                written += 1;
                println!("  wrote {}", job.output_dir.join(&file.name).display());
            } else {
                println!("  unchanged {}", job.output_dir.join(&file.name).display());
            }
        }
        println!(
            "Generated {} types ({} members) from {}; {written} file(s) updated",
            output.report.types.total(),
            output.report.members_emitted,
            job.header.display()
        );
        if job.options.verbose {
            println!();
            print!("{}", output.report);
        }
    }
    Ok(())
}

/// Run the generator for one job and print its diagnostics as warnings.
pub(crate) fn generate(job: &Job) -> Result<GenerationOutput> {
    let output = execute(&job.header, &job.options)
        .with_context(|| format!("generating wrapper for {}", job.header.display()))?;
    for diagnostic in &output.diagnostics {
        eprintln!("warning: {diagnostic}");
    }
    Ok(output)
}

/// Jobs for a run: the header named on the command line, or every
/// `[[wrapper]]` of the manifest.
pub(crate) fn jobs(
    cwd: &Path,
    manifest: Option<(&ClrwrapManifest, &Path)>,
    args: &GenerateArgs,
) -> Result<Vec<Job>> {
    if let Some(header) = &args.header {
        let (Some(input), Some(output)) = (&args.input_namespace, &args.output_namespace) else {
            bail!("--input-namespace and --output-namespace are required with a header argument");
        };
        let mut options = GenerateOptions::new(input.as_str(), output.as_str());
        apply_overrides(&mut options, cwd, args);
        return Ok(vec![Job {
            header: cwd.join(header),
            options,
            output_dir: args
                .output_dir
                .as_ref()
                .map_or_else(|| cwd.to_path_buf(), |dir| cwd.join(dir)),
        }]);
    }

    let Some((manifest, project_dir)) = manifest else {
        bail!("no header given and no clrwrap.toml found (run `clrwrap init` first)");
    };
    if manifest.wrappers.is_empty() {
        bail!("clrwrap.toml has no [[wrapper]] entries");
    }

    Ok(manifest
        .wrappers
        .iter()
        .map(|wrapper| {
            let mut options = wrapper.options(project_dir);
            if let Some(input) = &args.input_namespace {
                options.input_namespace = input.clone();
            }
            if let Some(output) = &args.output_namespace {
                options.output_namespace = output.clone();
            }
            apply_overrides(&mut options, cwd, args);
            Job {
                header: wrapper.header_path(project_dir),
                options,
                output_dir: args
                    .output_dir
                    .as_ref()
                    .map_or_else(|| wrapper.output_path(project_dir), |dir| cwd.join(dir)),
            }
        })
        .collect())
}

fn apply_overrides(options: &mut GenerateOptions, cwd: &Path, args: &GenerateArgs) {
    if let Some(name) = &args.wrapped_object_name {
        options.wrapped_object_name = name.clone();
    }
    if let Some(root) = &args.platform_root {
        options.platform_root = Some(cwd.join(root));
    }
    options.verbose |= args.verbose;
}

/// Write `file` into `dir` unless an identical file is already there.
/// Returns whether the file was written.
pub(crate) fn write_if_changed(dir: &Path, file: &GeneratedFile) -> Result<bool> {
    let path = dir.join(&file.name);
    if on_disk_matches(&path, file)? {
        log::debug!("{} is up to date", path.display());
        return Ok(false);
    }
    fs::create_dir_all(dir).with_context(|| format!("creating {}", dir.display()))?;
    fs::write(&path, &file.contents).with_context(|| format!("writing {}", path.display()))?;
    Ok(true)
}

/// Whether `path` holds exactly the contents of `file`.
pub(crate) fn on_disk_matches(path: &Path, file: &GeneratedFile) -> Result<bool> {
    if !path.is_file() {
        return Ok(false);
    }
    let existing = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(content_digest(&existing) == file.digest())
}
