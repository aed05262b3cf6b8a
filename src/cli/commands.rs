use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use crate::config::{GeneratorConfig, Layout};
use crate::generator::{
    generate_all, GenerationScope, GeneratorKind, PipelineError, PipelineOptions, WriteOutcome,
};
use crate::linter::{fix_handlers, has_errors, lint_all, print_lint_issues, LintIssue, LintSeverity};
use crate::logging::{init_logging, LogConfig, LogFormat};
use crate::spec::{load_specs, AllSpecs};
use crate::validator::print_issues;

/// Command-line interface for specforge
///
/// Validates YAML specs and generates service code from them.
#[derive(Debug, Parser)]
#[command(name = "specforge", version)]
#[command(about = "YAML spec-driven code generator", long_about = None)]
pub struct Cli {
    /// trace/debug/info/warn/error
    #[arg(long, global = true, env = "SPECFORGE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Log output format
    #[arg(long, global = true, value_enum, env = "SPECFORGE_LOG_FORMAT")]
    pub log_format: Option<LogFormat>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load and cross-validate every spec document
    Validate {
        /// Repository root
        #[arg(long, env = "SPECFORGE_ROOT", default_value = ".")]
        root: PathBuf,
    },
    /// Validate, then generate code
    Generate {
        /// Repository root
        #[arg(long, env = "SPECFORGE_ROOT", default_value = ".")]
        root: PathBuf,

        /// Limit generation to specific parts (comma-separated or repeated)
        #[arg(long, value_enum, num_args = 1.., value_delimiter = ',')]
        only: Option<Vec<OnlyPart>>,

        /// Show what would change without writing files
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Run rustfmt over the written files
        #[arg(long, default_value_t = false)]
        format: bool,
    },
    /// Check naming conventions and that handlers match their contracts
    Lint {
        /// Repository root
        #[arg(long, env = "SPECFORGE_ROOT", default_value = ".")]
        root: PathBuf,

        /// Add stubs for missing handler methods
        #[arg(long, default_value_t = false)]
        fix: bool,

        /// Exit with error code if any errors are found
        #[arg(long, default_value_t = false)]
        fail_on_error: bool,

        /// Show only errors (hide warnings and info)
        #[arg(long, default_value_t = false)]
        errors_only: bool,
    },
}

/// Generators selectable with `--only`
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OnlyPart {
    /// Shared data schemas and `schemas.json`
    Schemas,
    /// Shared event channel module
    Events,
    /// Domain contract traits
    Contracts,
    /// Web routers
    Web,
    /// Handler stubs (never overwritten)
    Handlers,
    /// Bus adapters
    Bus,
    /// HTTP clients for consumed domains
    Clients,
    /// Per-service registry and `generated/mod.rs`
    Registry,
    /// OpenAPI documents
    Openapi,
    /// TypeScript declarations of the shared models
    Typescript,
}

impl From<OnlyPart> for GeneratorKind {
    fn from(part: OnlyPart) -> Self {
        match part {
            OnlyPart::Schemas => GeneratorKind::Schemas,
            OnlyPart::Events => GeneratorKind::Events,
            OnlyPart::Contracts => GeneratorKind::Contracts,
            OnlyPart::Web => GeneratorKind::Web,
            OnlyPart::Handlers => GeneratorKind::Handlers,
            OnlyPart::Bus => GeneratorKind::Bus,
            OnlyPart::Clients => GeneratorKind::Clients,
            OnlyPart::Registry => GeneratorKind::Registry,
            OnlyPart::Openapi => GeneratorKind::OpenApi,
            OnlyPart::Typescript => GeneratorKind::TypeScript,
        }
    }
}

/// Convert CLI `--only` parts to a `GenerationScope`
///
/// `None` enables every generator.
pub(crate) fn map_only_to_scope(only: Option<&[OnlyPart]>) -> GenerationScope {
    match only {
        None => GenerationScope::all(),
        Some(parts) => {
            let kinds: Vec<GeneratorKind> = parts.iter().map(|p| (*p).into()).collect();
            GenerationScope::only(&kinds)
        }
    }
}

impl Cli {
    pub fn log_config(&self) -> LogConfig {
        let mut config = LogConfig::from_env();
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(format) = self.log_format {
            config.format = format;
        }
        config
    }
}

/// Parses the command line, sets up logging and runs the command.
pub fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    init_logging(&cli.log_config())?;
    run(&cli)
}

/// Executes an already parsed command.
pub fn run(cli: &Cli) -> anyhow::Result<ExitCode> {
    match &cli.command {
        Commands::Validate { root } => {
            let layout = layout_for(root)?;
            match load_specs(&layout) {
                Ok(specs) => {
                    print_summary(&specs);
                    Ok(ExitCode::SUCCESS)
                }
                Err(report) => {
                    print_issues(&report);
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Generate {
            root,
            only,
            dry_run,
            format,
        } => {
            let layout = layout_for(root)?;
            let options = PipelineOptions {
                scope: map_only_to_scope(only.as_deref()),
                dry_run: *dry_run,
                format: *format || layout.config.format,
            };
            debug!(?options, root = %root.display(), "generate");
            match generate_all(&layout, &options) {
                Ok(report) => {
                    if report.dry_run {
                        for file in &report.files {
                            println!(
                                "🔍 {:<16} {}",
                                file.outcome.as_str(),
                                layout.relative(&file.path).display()
                            );
                        }
                    }
                    println!(
                        "\n{} written, {} unchanged, {} skipped{}",
                        report.count(WriteOutcome::Written),
                        report.count(WriteOutcome::Unchanged),
                        report.count(WriteOutcome::SkippedExisting),
                        if report.dry_run {
                            format!(", {} would be written (dry run)", report.count(WriteOutcome::WouldWrite))
                        } else {
                            String::new()
                        }
                    );
                    Ok(ExitCode::SUCCESS)
                }
                Err(PipelineError::Spec(report)) => {
                    print_issues(&report);
                    Ok(ExitCode::FAILURE)
                }
                Err(other) => Err(other.into()),
            }
        }
        Commands::Lint {
            root,
            fix,
            fail_on_error,
            errors_only,
        } => {
            let layout = layout_for(root)?;
            let specs = match load_specs(&layout) {
                Ok(specs) => specs,
                Err(report) => {
                    print_issues(&report);
                    return Ok(ExitCode::FAILURE);
                }
            };
            if *fix {
                for path in fix_handlers(&specs, &layout)? {
                    println!("🔧 Added missing handler methods to {}", layout.relative(&path).display());
                }
            }
            let mut issues: Vec<LintIssue> = lint_all(&specs, &layout)?;
            if *errors_only {
                issues.retain(|i| i.severity == LintSeverity::Error);
            }
            print_lint_issues(&issues);
            if *fail_on_error && has_errors(&issues) {
                return Ok(ExitCode::FAILURE);
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn layout_for(root: &Path) -> anyhow::Result<Layout> {
    let config = GeneratorConfig::load_or_default(root)
        .with_context(|| format!("invalid configuration under {}", root.display()))?;
    Ok(Layout::new(root, config))
}

fn print_summary(specs: &AllSpecs) {
    println!("✅ Specs are valid");
    println!("Models: {}", specs.models.len());
    println!("Domains: {}", specs.domains.len());
    println!("Events: {}", specs.events.len());
    println!("Manifests: {}", specs.manifests.len());
}
