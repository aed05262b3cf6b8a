//! # specforge
//!
//! **specforge** turns a tree of YAML specs into the Rust code of a set of
//! web and message-bus services.
//!
//! ## Overview
//!
//! A repository describes its system in four kinds of documents:
//!
//! - `shared/spec/models.yaml` - shared data models and their variants
//! - `shared/spec/events.yaml` - bus channels and the model each one carries
//! - `services/<service>/spec/<domain>.yaml` - operations, grouped into
//!   domains, with optional web and bus transports
//! - `services/<service>/spec/manifest.yaml` - which domains a service
//!   consumes from other services
//!
//! The directories can be moved with a `specforge.toml` at the root.
//!
//! ## Architecture
//!
//! - **[`config`]** - `specforge.toml` and the repository [`Layout`](config::Layout)
//! - **[`spec`]** - typed spec model, loading and cross-document validation
//! - **[`validator`]** - issue collection and reporting
//! - **[`generator`]** - the generators and the write pipeline
//! - **[`linter`]** - naming conventions and handler/contract drift
//! - **[`logging`]** - `tracing` subscriber setup
//! - **[`cli`]** - the `specforge` command line
//!
//! ### Generation Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant User
//!     participant CLI as specforge generate
//!     participant Load as spec::load_specs
//!     participant Gen as Generators
//!     participant FS as File System
//!
//!     User->>CLI: specforge generate --root .
//!     CLI->>Load: load_specs(&layout)
//!     Load->>Load: Parse every document
//!     Load->>Load: Cross-validate references
//!     alt Any issue
//!         Load-->>CLI: SpecReport
//!         CLI-->>User: Issues, exit 1
//!     end
//!     Load-->>CLI: AllSpecs
//!     CLI->>Gen: render every selected generator
//!     Gen-->>CLI: Vec<GeneratedFile>
//!     CLI->>FS: write changed files, keep existing handlers
//!     CLI-->>User: ✅ Generated ...
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use specforge::config::{GeneratorConfig, Layout};
//! use specforge::generator::{generate_all, PipelineOptions};
//!
//! let root = std::path::Path::new(".");
//! let layout = Layout::new(root, GeneratorConfig::load_or_default(root)?);
//! let report = generate_all(&layout, &PipelineOptions::default())?;
//! println!("{} files", report.files.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;
pub mod config;
pub mod generator;
pub mod linter;
pub mod logging;
pub mod spec;
pub mod validator;

pub use config::{GeneratorConfig, Layout};
pub use generator::{generate_all, GenerationScope, GeneratorKind, PipelineOptions};
pub use spec::{load_specs, AllSpecs};
pub use validator::{SpecIssue, SpecReport};
