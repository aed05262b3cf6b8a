use std::collections::BTreeMap;

use serde::Serialize;

use super::context::{OperationContext, OperationContextBuilder};
use super::contracts::model_imports;
use super::naming::{contract_name, sanitize_rust_identifier};
use super::{
    use_line, GenerateError, GeneratedFile, GenerationContext, Generator, GeneratorKind,
    GENERATED_HEADER,
};
use crate::spec::{AllSpecs, DomainSpec};

/// Emits one `bus_adapter.rs` per service that subscribes to any channel.
pub struct BusAdapterGenerator;

#[derive(Debug, Serialize)]
struct SubscriptionCtx {
    ident: String,
    method: String,
    subscribe_channel: String,
    message_model: String,
    call_args: String,
    success_channel: Option<String>,
    error_channel: Option<String>,
}

#[derive(Debug, Serialize)]
struct DomainCtx {
    name: String,
    field: String,
    contract: String,
    handlers: Vec<SubscriptionCtx>,
}

impl Generator for BusAdapterGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Bus
    }

    fn generate(
        &self,
        specs: &AllSpecs,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let builder = OperationContextBuilder::new();
        let mut services: BTreeMap<&str, (Vec<DomainCtx>, Vec<OperationContext>)> =
            BTreeMap::new();

        for domain in specs.domains.values() {
            let mut handlers = Vec::new();
            for op in domain.subscriber_operations() {
                let op_ctx = builder.for_bus(op)?;
                if let Some(sub) = subscription(&op_ctx) {
                    handlers.push(sub);
                    services
                        .entry(domain.service.as_str())
                        .or_default()
                        .1
                        .push(op_ctx);
                }
            }
            if !handlers.is_empty() {
                services
                    .entry(domain.service.as_str())
                    .or_default()
                    .0
                    .push(domain_ctx(domain, handlers));
            }
        }

        let mut files = Vec::new();
        for (service, (domains, operations)) in services {
            let contents = ctx.templates.render(
                "bus_adapter.rs.j2",
                minijinja::context! {
                    header => GENERATED_HEADER,
                    service => service,
                    runtime_use => use_line(ctx.runtime_path(), &["Bus", "HandlerError"]),
                    schemas_use => use_line(ctx.schemas_path(), &model_imports(&operations)),
                    domains => domains,
                },
            )?;
            files.push(GeneratedFile::overwrite(
                ctx.layout
                    .service_generated_dir(service)
                    .join("bus_adapter.rs"),
                contents,
            ));
        }
        Ok(files)
    }
}

fn domain_ctx(domain: &DomainSpec, handlers: Vec<SubscriptionCtx>) -> DomainCtx {
    DomainCtx {
        name: domain.name.clone(),
        field: sanitize_rust_identifier(&domain.name),
        contract: contract_name(&domain.name),
        handlers,
    }
}

fn subscription(op: &OperationContext) -> Option<SubscriptionCtx> {
    let bus = op.bus.as_ref()?;
    let subscribe_channel = bus.subscribe_channel.clone()?;
    let message_model = bus.message_model.clone()?;
    let mut args: Vec<String> = op
        .params
        .iter()
        .map(|p| match (&p.default_literal, p.rust_type.starts_with("Option<")) {
            (Some(literal), _) => literal.clone(),
            (None, true) => "None".to_string(),
            (None, false) => "Default::default()".to_string(),
        })
        .collect();
    if op.input_model.is_some() {
        args.push(if bus.converts_message {
            "message.into()".to_string()
        } else {
            "message".to_string()
        });
    }
    Some(SubscriptionCtx {
        ident: op.ident.clone(),
        method: format!("handle_{}", op.name),
        subscribe_channel,
        message_model,
        call_args: args.join(", "),
        success_channel: bus.publish_on_success_channel.clone(),
        error_channel: bus.publish_on_error_channel.clone(),
    })
}
