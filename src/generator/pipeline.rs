//! Render-then-write driver.
//!
//! Every selected generator renders into memory first. Nothing is written
//! unless all of them succeed.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::format::format_files;
use super::{
    default_generators, GenerateError, GeneratedFile, GenerationContext, GenerationScope,
    GeneratorKind, WritePolicy,
};
use crate::config::Layout;
use crate::spec::{load_specs, AllSpecs};
use crate::validator::SpecReport;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineOptions {
    pub scope: GenerationScope,
    /// Render and report, but write nothing.
    pub dry_run: bool,
    /// Run rustfmt over the Rust files written.
    pub format: bool,
}

/// What happened to one rendered file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// On-disk content was already identical.
    Unchanged,
    /// Write-if-absent file that already exists.
    SkippedExisting,
    /// Dry run: would have been written.
    WouldWrite,
}

impl WriteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteOutcome::Written => "written",
            WriteOutcome::Unchanged => "unchanged",
            WriteOutcome::SkippedExisting => "skipped (exists)",
            WriteOutcome::WouldWrite => "would write",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub path: PathBuf,
    pub generator: GeneratorKind,
    pub outcome: WriteOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationReport {
    pub files: Vec<WrittenFile>,
    pub dry_run: bool,
}

impl GenerationReport {
    pub fn count(&self, outcome: WriteOutcome) -> usize {
        self.files.iter().filter(|f| f.outcome == outcome).count()
    }

    pub fn file(&self, path: &Path) -> Option<&WrittenFile> {
        self.files.iter().find(|f| f.path == path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("specification is invalid ({} issue(s))", .0.len())]
    Spec(SpecReport),
    #[error(transparent)]
    Generate(#[from] GenerateError),
    #[error("formatting failed: {0:#}")]
    Format(anyhow::Error),
}

/// Loads and validates the specs under `layout`, then runs the pipeline.
/// Returns either the report of written files or every spec issue, never both.
pub fn generate_all(
    layout: &Layout,
    options: &PipelineOptions,
) -> Result<GenerationReport, PipelineError> {
    let specs = load_specs(layout).map_err(PipelineError::Spec)?;
    run_pipeline(&specs, layout, options)
}

/// Renders every generator in `options.scope`, then writes the results.
pub fn run_pipeline(
    specs: &AllSpecs,
    layout: &Layout,
    options: &PipelineOptions,
) -> Result<GenerationReport, PipelineError> {
    let ctx = GenerationContext::new(layout)?;

    let mut rendered: Vec<(GeneratorKind, GeneratedFile)> = Vec::new();
    for generator in default_generators() {
        let kind = generator.kind();
        if !options.scope.includes(kind) {
            debug!(generator = %kind, "skipped by scope");
            continue;
        }
        let files = generator.generate(specs, &ctx)?;
        debug!(generator = %kind, files = files.len(), "rendered");
        rendered.extend(files.into_iter().map(|f| (kind, f)));
    }

    let mut report = GenerationReport {
        files: Vec::with_capacity(rendered.len()),
        dry_run: options.dry_run,
    };
    for (generator, file) in rendered {
        let outcome = write_file(&file, options.dry_run)?;
        let shown = layout.relative(&file.path).display();
        match outcome {
            WriteOutcome::Written => println!("✅ Generated {shown}"),
            WriteOutcome::SkippedExisting => {
                println!("⚠️  Skipping existing handler file {shown}")
            }
            WriteOutcome::Unchanged | WriteOutcome::WouldWrite => {}
        }
        report.files.push(WrittenFile {
            path: file.path,
            generator,
            outcome,
        });
    }

    if options.format && !options.dry_run {
        let written: Vec<PathBuf> = report
            .files
            .iter()
            .filter(|f| f.outcome == WriteOutcome::Written)
            .map(|f| f.path.clone())
            .collect();
        format_files(&written).map_err(PipelineError::Format)?;
    }

    info!(
        written = report.count(WriteOutcome::Written),
        unchanged = report.count(WriteOutcome::Unchanged),
        skipped = report.count(WriteOutcome::SkippedExisting),
        dry_run = options.dry_run,
        "generation finished"
    );
    Ok(report)
}

fn write_file(file: &GeneratedFile, dry_run: bool) -> Result<WriteOutcome, GenerateError> {
    let io_err = |source| GenerateError::Io {
        path: file.path.clone(),
        source,
    };
    if file.path.exists() {
        if file.policy == WritePolicy::WriteIfAbsent {
            return Ok(WriteOutcome::SkippedExisting);
        }
        if fs::read_to_string(&file.path).is_ok_and(|current| current == file.contents) {
            return Ok(WriteOutcome::Unchanged);
        }
    }
    if dry_run {
        return Ok(WriteOutcome::WouldWrite);
    }
    if let Some(parent) = file.path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }
    fs::write(&file.path, &file.contents).map_err(io_err)?;
    Ok(WriteOutcome::Written)
}
