//! HTTP clients for the domains a service consumes.
//!
//! A consumer gets one client per provider service, covering only the web
//! operations its manifest lists. Operations without a web transport cannot be
//! called over HTTP and are left out.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::debug;

use super::context::{OperationContext, OperationContextBuilder};
use super::contracts::model_imports;
use super::naming::{client_name, sanitize_rust_identifier};
use super::web::full_path;
use super::{
    render_mod_rs, use_line, GenerateError, GeneratedFile, GenerationContext, Generator,
    GeneratorKind, GENERATED_HEADER,
};
use crate::spec::{AllSpecs, ManifestSpec};

/// Retry behaviour baked into every generated client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientRetryPolicy {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: u64,
    /// Lowest and highest status worth another attempt.
    pub retry_statuses: (u16, u16),
    /// Status reported as `ClientError::Conflict` instead of a plain failure.
    pub conflict_status: u16,
}

pub const CLIENT_RETRY_POLICY: ClientRetryPolicy = ClientRetryPolicy {
    max_attempts: 3,
    initial_delay_ms: 1000,
    backoff_multiplier: 2,
    retry_statuses: (500, 599),
    conflict_status: 409,
};

impl ClientRetryPolicy {
    /// Whether a failed attempt may be retried. `None` is a connection failure.
    pub fn retries(&self, status: Option<u16>) -> bool {
        let (low, high) = self.retry_statuses;
        match status {
            None => true,
            Some(code) => (low..=high).contains(&code),
        }
    }

    /// Delay after the `attempt`-th failure (1-based).
    pub fn delay_after(&self, attempt: u32) -> u64 {
        self.initial_delay_ms * self.backoff_multiplier.pow(attempt.saturating_sub(1))
    }

    /// Sleeps between attempts, one per retry.
    pub fn delays_ms(&self) -> Vec<u64> {
        (1..self.max_attempts).map(|a| self.delay_after(a)).collect()
    }

    /// `matches!` pattern over `Option<u16>` selecting retryable failures.
    pub fn retry_pattern(&self) -> String {
        let (low, high) = self.retry_statuses;
        format!("None | Some({low}..={high})")
    }
}

/// Emits `generated/clients/<provider>.rs` for every consumer.
pub struct ClientsGenerator;

#[derive(Debug, Serialize)]
struct QueryArgCtx {
    name: String,
    ident: String,
    optional: bool,
}

#[derive(Debug, Serialize)]
struct ClientMethodCtx {
    ident: String,
    domain: String,
    method_upper: String,
    full_path: String,
    /// Expression building the request path.
    path_expr: String,
    args: String,
    query: Vec<QueryArgCtx>,
    body: Option<String>,
    return_type: String,
}

impl Generator for ClientsGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Clients
    }

    fn generate(
        &self,
        specs: &AllSpecs,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let mut files = Vec::new();
        for (consumer, manifest) in &specs.manifests {
            let dir = ctx.layout.service_generated_dir(consumer).join("clients");
            let mut modules = Vec::new();
            let mut reexports = Vec::new();
            for provider in manifest.providers() {
                let operations = consumed_operations(specs, manifest, provider)?;
                if operations.is_empty() {
                    debug!(consumer = %consumer, provider, "no web operations consumed");
                    continue;
                }
                let contents = render_client(ctx, consumer, provider, &operations)?;
                let module = sanitize_rust_identifier(provider);
                files.push(GeneratedFile::overwrite(
                    dir.join(format!("{provider}.rs")),
                    contents,
                ));
                reexports.push((module.clone(), client_name(provider)));
                modules.push(module);
            }
            if !modules.is_empty() {
                files.push(GeneratedFile::overwrite(
                    dir.join("mod.rs"),
                    render_mod_rs(ctx, &modules, &reexports)?,
                ));
            }
        }
        Ok(files)
    }
}

/// True when `manifest` yields at least one client module.
pub(crate) fn has_clients(specs: &AllSpecs, manifest: &ManifestSpec) -> bool {
    manifest.consumes.iter().any(|consume| {
        specs
            .domain(&consume.service, &consume.domain)
            .is_some_and(|d| d.web_operations().any(|op| consume.includes(&op.name)))
    })
}

/// Web operations of `provider` listed by `manifest`, with their domain prefix.
fn consumed_operations(
    specs: &AllSpecs,
    manifest: &ManifestSpec,
    provider: &str,
) -> Result<Vec<(OperationContext, String, String)>, GenerateError> {
    let builder = OperationContextBuilder::new();
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for consume in manifest.consumes.iter().filter(|c| c.service == provider) {
        let Some(domain) = specs.domain(&consume.service, &consume.domain) else {
            continue;
        };
        for op in domain.web_operations().filter(|op| consume.includes(&op.name)) {
            if seen.insert((domain.name.as_str(), op.name.as_str())) {
                out.push((
                    builder.for_web(op)?,
                    domain.name.clone(),
                    domain.web.prefix.clone(),
                ));
            }
        }
    }
    Ok(out)
}

fn client_method(op: &OperationContext, domain: &str, prefix: &str) -> ClientMethodCtx {
    let (method_upper, path) = op
        .web
        .as_ref()
        .map(|w| (w.method_upper.clone(), w.path.as_str()))
        .unwrap_or_default();
    let full = full_path(prefix, path);
    let path_expr = if op.path_params.is_empty() {
        format!("{full:?}.to_string()")
    } else {
        let mut template = full.clone();
        for p in &op.path_params {
            template = template.replace(&format!("{{{}}}", p.name), "{}");
        }
        let args: Vec<&str> = op.path_params.iter().map(|p| p.ident.as_str()).collect();
        format!("format!({template:?}, {})", args.join(", "))
    };
    let mut args: Vec<String> = op
        .params
        .iter()
        .map(|p| format!("{}: {}", p.ident, p.rust_type))
        .collect();
    if let Some(input) = &op.input_model {
        args.push(format!("payload: &{input}"));
    }
    ClientMethodCtx {
        ident: op.ident.clone(),
        domain: domain.to_string(),
        method_upper,
        full_path: full,
        path_expr,
        args: std::iter::once("&self".to_string())
            .chain(args)
            .collect::<Vec<_>>()
            .join(", "),
        query: op
            .query_params
            .iter()
            .map(|p| QueryArgCtx {
                name: p.name.clone(),
                ident: p.ident.clone(),
                optional: p.rust_type.starts_with("Option<"),
            })
            .collect(),
        body: op.input_model.as_ref().map(|_| "Some(payload)".to_string()),
        return_type: op.return_type.clone(),
    }
}

fn render_client(
    ctx: &GenerationContext<'_>,
    consumer: &str,
    provider: &str,
    operations: &[(OperationContext, String, String)],
) -> Result<String, GenerateError> {
    let plain: Vec<OperationContext> = operations.iter().map(|(op, _, _)| op.clone()).collect();
    let methods: Vec<ClientMethodCtx> = operations
        .iter()
        .map(|(op, domain, prefix)| client_method(op, domain, prefix))
        .collect();
    let policy = CLIENT_RETRY_POLICY;
    let delays = policy.delays_ms();
    ctx.templates.render(
        "client.rs.j2",
        minijinja::context! {
            header => GENERATED_HEADER,
            consumer => consumer,
            provider => provider,
            client => client_name(provider),
            runtime_use => use_line(ctx.runtime_path(), &["ClientError", "RetryPolicy", "ServiceClient"]),
            schemas_use => use_line(ctx.schemas_path(), &model_imports(&plain)),
            max_attempts => policy.max_attempts,
            initial_delay_ms => policy.initial_delay_ms,
            backoff_multiplier => policy.backoff_multiplier,
            retry_delays => delays.iter().map(u64::to_string).collect::<Vec<_>>().join(", "),
            retry_delay_count => delays.len(),
            retry_pattern => policy.retry_pattern(),
            conflict_status => policy.conflict_status,
            methods => methods,
        },
    )
}
