use serde::Serialize;

use super::clients::has_clients;
use super::naming::{contract_name, handler_name, sanitize_rust_identifier, to_camel_case};
use super::{
    render_mod_rs, use_line, GenerateError, GeneratedFile, GenerationContext, Generator,
    GeneratorKind, GENERATED_HEADER,
};
use crate::spec::{AllSpecs, DomainSpec};

/// Emits the per-service `registry.rs`, which binds handlers to routers and
/// the bus adapter, and the `generated/mod.rs` tying the generated modules
/// together.
pub struct RegistryGenerator;

#[derive(Debug, Serialize)]
struct RegistryDomainCtx {
    name: String,
    field: String,
    contract: String,
    handler: String,
    state: String,
    has_web: bool,
    /// Web bindings publish results on the bus.
    web_bus: bool,
    has_subscribers: bool,
}

impl Generator for RegistryGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Registry
    }

    fn generate(
        &self,
        specs: &AllSpecs,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let mut files = Vec::new();
        for service in specs.services() {
            let domains: Vec<RegistryDomainCtx> =
                specs.domains_of(service).map(registry_domain).collect();
            let dir = ctx.layout.service_generated_dir(service);

            let has_web = domains.iter().any(|d| d.has_web);
            let has_subscribers = domains.iter().any(|d| d.has_subscribers);
            let has_clients = specs
                .manifests
                .get(service)
                .is_some_and(|m| has_clients(specs, m));

            let mut modules = Vec::new();
            if !domains.is_empty() {
                modules.push("contracts".to_string());
            }
            if has_web {
                modules.push("web".to_string());
            }
            if has_subscribers {
                modules.push("bus_adapter".to_string());
            }
            if has_clients {
                modules.push("clients".to_string());
            }
            if !domains.is_empty() {
                modules.push("registry".to_string());
                files.push(GeneratedFile::overwrite(
                    dir.join("registry.rs"),
                    render_registry(ctx, service, &domains)?,
                ));
            }
            if !modules.is_empty() {
                files.push(GeneratedFile::overwrite(
                    dir.join("mod.rs"),
                    render_mod_rs(ctx, &modules, &[])?,
                ));
            }
        }
        Ok(files)
    }
}

fn registry_domain(domain: &DomainSpec) -> RegistryDomainCtx {
    RegistryDomainCtx {
        name: domain.name.clone(),
        field: sanitize_rust_identifier(&domain.name),
        contract: contract_name(&domain.name),
        handler: handler_name(&domain.name),
        state: format!("{}WebState", to_camel_case(&domain.name)),
        has_web: domain.has_web_operations(),
        web_bus: domain.web_operations().any(|op| {
            op.bus.as_ref().is_some_and(|b| {
                b.publish_on_success_channel.is_some() || b.publish_on_error_channel.is_some()
            })
        }),
        has_subscribers: domain.subscriber_operations().next().is_some(),
    }
}

fn render_registry(
    ctx: &GenerationContext<'_>,
    service: &str,
    domains: &[RegistryDomainCtx],
) -> Result<String, GenerateError> {
    let web_bus = domains.iter().any(|d| d.web_bus);
    let has_subscribers = domains.iter().any(|d| d.has_subscribers);
    let contracts: Vec<&str> = domains.iter().map(|d| d.contract.as_str()).collect();
    ctx.templates.render(
        "registry.rs.j2",
        minijinja::context! {
            header => GENERATED_HEADER,
            service => service,
            contracts_use => use_line("crate::generated::contracts", &contracts),
            runtime_use => if web_bus || has_subscribers {
                use_line(ctx.runtime_path(), &["Bus"])
            } else {
                None
            },
            has_web => domains.iter().any(|d| d.has_web),
            web_bus => web_bus,
            has_subscribers => has_subscribers,
            domains => domains,
        },
    )
}
