//! # Generator Module
//!
//! Turns a validated [`AllSpecs`] into source files.
//!
//! ## Architecture
//!
//! ```text
//! AllSpecs → Generator::generate → Vec<GeneratedFile> → pipeline writes
//! ```
//!
//! Every generator is a pure function of the specs and the [`GenerationContext`].
//! None of them touch the filesystem. The pipeline renders every selected
//! generator first and only writes once all of them succeeded, so a run either
//! produces a consistent tree or nothing.
//!
//! ## Generators
//!
//! | kind | output | policy |
//! |---|---|---|
//! | `schemas` | `shared/src/generated/{schemas.rs,schemas.json,mod.rs}` | overwrite |
//! | `events` | `shared/src/generated/events.rs` | overwrite |
//! | `contracts` | `services/<svc>/src/generated/contracts/` | overwrite |
//! | `web` | `services/<svc>/src/generated/web/` | overwrite |
//! | `handlers` | `services/<svc>/src/handlers/<domain>.rs` | if absent |
//! | `bus` | `services/<svc>/src/generated/bus_adapter.rs` | overwrite |
//! | `clients` | `services/<consumer>/src/generated/clients/` | overwrite |
//! | `registry` | `services/<svc>/src/generated/{registry.rs,mod.rs}` | overwrite |
//! | `openapi` | `services/<svc>/doc/openapi.yaml` | overwrite |
//! | `typescript` | `shared/generated/types.ts` | overwrite |
//!
//! Handler stubs are the only files a user is expected to edit, so they are
//! written with [`WritePolicy::WriteIfAbsent`].

mod bus;
mod clients;
mod context;
mod contracts;
mod events;
mod format;
mod handlers;
pub(crate) mod naming;
mod openapi;
mod pipeline;
mod registry;
mod schemas;
mod templates;
mod typescript;
mod web;

use std::fmt;
use std::path::PathBuf;

use crate::config::Layout;
use crate::spec::AllSpecs;

pub use bus::BusAdapterGenerator;
pub use clients::{ClientRetryPolicy, ClientsGenerator, CLIENT_RETRY_POLICY};
pub use context::{
    BusContext, OperationContext, OperationContextBuilder, ParamContext, WebContext,
};
pub use contracts::ContractsGenerator;
pub use events::EventsGenerator;
pub use format::format_files;
pub use handlers::HandlersGenerator;
pub(crate) use handlers::stub_method;
pub use naming::{
    client_name, contract_name, enum_type_name, handler_name, rust_default_literal,
    sanitize_rust_identifier, to_camel_case, to_snake_case,
};
pub use openapi::OpenApiGenerator;
pub use pipeline::{
    generate_all, run_pipeline, GenerationReport, PipelineError, PipelineOptions, WriteOutcome,
    WrittenFile,
};
pub use registry::RegistryGenerator;
pub use schemas::SchemasGenerator;
pub use templates::Templates;
pub use typescript::TypeScriptGenerator;
pub use web::WebGenerator;

/// How a generated file may be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WritePolicy {
    /// Replace whatever is on disk. Generated code is a pure function of the specs.
    #[default]
    OverwriteAlways,
    /// Only create the file; an existing file is left untouched.
    WriteIfAbsent,
}

/// A rendered file, not yet written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
    pub policy: WritePolicy,
}

impl GeneratedFile {
    pub fn overwrite(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        GeneratedFile {
            path: path.into(),
            contents: contents.into(),
            policy: WritePolicy::OverwriteAlways,
        }
    }

    pub fn if_absent(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        GeneratedFile {
            path: path.into(),
            contents: contents.into(),
            policy: WritePolicy::WriteIfAbsent,
        }
    }
}

/// Failures inside a generator. These point at a bug in the generator, not at
/// the specs, which are fully validated before any generator runs.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("failed to render template '{template}': {source}")]
    Render {
        template: String,
        #[source]
        source: minijinja::Error,
    },
    #[error("operation '{operation}' has no {transport} transport configured")]
    MissingTransport {
        operation: String,
        transport: &'static str,
    },
    #[error("failed to serialize {what}: {message}")]
    Serialize { what: String, message: String },
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// The individual generators, as selectable with `--only`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GeneratorKind {
    Schemas,
    Events,
    Contracts,
    Web,
    Handlers,
    Bus,
    Clients,
    Registry,
    OpenApi,
    TypeScript,
}

impl GeneratorKind {
    pub const ALL: [GeneratorKind; 10] = [
        GeneratorKind::Schemas,
        GeneratorKind::Events,
        GeneratorKind::Contracts,
        GeneratorKind::Web,
        GeneratorKind::Handlers,
        GeneratorKind::Bus,
        GeneratorKind::Clients,
        GeneratorKind::Registry,
        GeneratorKind::OpenApi,
        GeneratorKind::TypeScript,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorKind::Schemas => "schemas",
            GeneratorKind::Events => "events",
            GeneratorKind::Contracts => "contracts",
            GeneratorKind::Web => "web",
            GeneratorKind::Handlers => "handlers",
            GeneratorKind::Bus => "bus",
            GeneratorKind::Clients => "clients",
            GeneratorKind::Registry => "registry",
            GeneratorKind::OpenApi => "openapi",
            GeneratorKind::TypeScript => "typescript",
        }
    }
}

impl fmt::Display for GeneratorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which generators a run executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GenerationScope {
    pub schemas: bool,
    pub events: bool,
    pub contracts: bool,
    pub web: bool,
    pub handlers: bool,
    pub bus: bool,
    pub clients: bool,
    pub registry: bool,
    pub openapi: bool,
    pub typescript: bool,
}

impl GenerationScope {
    pub fn all() -> Self {
        GenerationScope {
            schemas: true,
            events: true,
            contracts: true,
            web: true,
            handlers: true,
            bus: true,
            clients: true,
            registry: true,
            openapi: true,
            typescript: true,
        }
    }

    pub fn none() -> Self {
        GenerationScope {
            schemas: false,
            events: false,
            contracts: false,
            web: false,
            handlers: false,
            bus: false,
            clients: false,
            registry: false,
            openapi: false,
            typescript: false,
        }
    }

    /// Only the listed generators.
    pub fn only(kinds: &[GeneratorKind]) -> Self {
        let mut scope = Self::none();
        for kind in kinds {
            scope.set(*kind, true);
        }
        scope
    }

    pub fn includes(&self, kind: GeneratorKind) -> bool {
        match kind {
            GeneratorKind::Schemas => self.schemas,
            GeneratorKind::Events => self.events,
            GeneratorKind::Contracts => self.contracts,
            GeneratorKind::Web => self.web,
            GeneratorKind::Handlers => self.handlers,
            GeneratorKind::Bus => self.bus,
            GeneratorKind::Clients => self.clients,
            GeneratorKind::Registry => self.registry,
            GeneratorKind::OpenApi => self.openapi,
            GeneratorKind::TypeScript => self.typescript,
        }
    }

    fn set(&mut self, kind: GeneratorKind, on: bool) {
        let slot = match kind {
            GeneratorKind::Schemas => &mut self.schemas,
            GeneratorKind::Events => &mut self.events,
            GeneratorKind::Contracts => &mut self.contracts,
            GeneratorKind::Web => &mut self.web,
            GeneratorKind::Handlers => &mut self.handlers,
            GeneratorKind::Bus => &mut self.bus,
            GeneratorKind::Clients => &mut self.clients,
            GeneratorKind::Registry => &mut self.registry,
            GeneratorKind::OpenApi => &mut self.openapi,
            GeneratorKind::TypeScript => &mut self.typescript,
        };
        *slot = on;
    }
}

impl Default for GenerationScope {
    fn default() -> Self {
        Self::all()
    }
}

/// Everything a generator needs besides the specs.
pub struct GenerationContext<'a> {
    pub layout: &'a Layout,
    pub templates: Templates,
}

impl<'a> GenerationContext<'a> {
    pub fn new(layout: &'a Layout) -> Result<Self, GenerateError> {
        Ok(GenerationContext {
            layout,
            templates: Templates::new()?,
        })
    }

    /// Rust path of the runtime support module.
    pub fn runtime_path(&self) -> &str {
        &self.layout.config.runtime_path
    }

    /// Rust path of the shared schema module.
    pub fn schemas_path(&self) -> &str {
        &self.layout.config.schemas_path
    }
}

/// One output artifact kind.
pub trait Generator {
    fn kind(&self) -> GeneratorKind;

    /// Renders every file of this kind. Must not touch the filesystem.
    fn generate(
        &self,
        specs: &AllSpecs,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFile>, GenerateError>;
}

/// Every generator, in pipeline order.
pub fn default_generators() -> Vec<Box<dyn Generator>> {
    vec![
        Box::new(SchemasGenerator),
        Box::new(EventsGenerator),
        Box::new(ContractsGenerator),
        Box::new(WebGenerator),
        Box::new(HandlersGenerator),
        Box::new(BusAdapterGenerator),
        Box::new(ClientsGenerator),
        Box::new(RegistryGenerator),
        Box::new(OpenApiGenerator),
        Box::new(TypeScriptGenerator),
    ]
}

/// Header placed at the top of every overwritten Rust file.
pub(crate) const GENERATED_HEADER: &str =
    "// @generated by specforge. Do not edit; changes are overwritten on the next run.";

/// `use path::Name;` or `use path::{A, B};`. `None` when `names` is empty.
pub(crate) fn use_line<S: AsRef<str>>(path: &str, names: &[S]) -> Option<String> {
    match names {
        [] => None,
        [one] => Some(format!("use {path}::{};", one.as_ref())),
        many => {
            let joined: Vec<&str> = many.iter().map(AsRef::as_ref).collect();
            Some(format!("use {path}::{{{}}};", joined.join(", ")))
        }
    }
}

/// Renders a `mod.rs` declaring `modules`.
pub(crate) fn render_mod_rs(
    ctx: &GenerationContext<'_>,
    modules: &[String],
    reexports: &[(String, String)],
) -> Result<String, GenerateError> {
    ctx.templates.render(
        "mod.rs.j2",
        minijinja::context! {
            header => GENERATED_HEADER,
            modules => modules,
            reexports => reexports,
        },
    )
}
