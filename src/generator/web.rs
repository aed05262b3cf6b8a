use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;

use super::context::{OperationContext, OperationContextBuilder};
use super::contracts::model_imports;
use super::naming::{contract_name, to_camel_case};
use super::{
    render_mod_rs, use_line, GenerateError, GeneratedFile, GenerationContext, Generator,
    GeneratorKind, GENERATED_HEADER,
};
use crate::spec::{AllSpecs, DomainSpec};

/// Emits one axum router module per domain with web operations.
pub struct WebGenerator;

/// Methods with a routing helper of the same name in `axum::routing`.
const ROUTING_HELPERS: &[&str] = &[
    "get", "post", "put", "delete", "patch", "head", "options", "trace",
];

#[derive(Debug, Serialize)]
struct WebOperationCtx {
    #[serde(flatten)]
    op: OperationContext,
    full_path: String,
    query_struct: String,
    /// `user_id` or `(user_id, post_id)`.
    path_pattern: Option<String>,
    /// `i64` or `(i64, i64)`.
    path_type: Option<String>,
    call_args: String,
    response_type: String,
    publish_on_success: Option<String>,
    publish_on_error: Option<String>,
}

#[derive(Debug, Serialize)]
struct RouteCtx {
    path: String,
    chain: String,
}

impl Generator for WebGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Web
    }

    fn generate(
        &self,
        specs: &AllSpecs,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let mut files = Vec::new();
        let mut modules: BTreeMap<&str, Vec<String>> = BTreeMap::new();

        for domain in specs.domains.values().filter(|d| d.has_web_operations()) {
            let contents = render_domain(ctx, domain)?;
            files.push(GeneratedFile::overwrite(
                ctx.layout
                    .service_generated_dir(&domain.service)
                    .join("web")
                    .join(format!("{}.rs", domain.name)),
                contents,
            ));
            modules
                .entry(domain.service.as_str())
                .or_default()
                .push(domain.name.clone());
        }

        for (service, domains) in modules {
            files.push(GeneratedFile::overwrite(
                ctx.layout
                    .service_generated_dir(service)
                    .join("web")
                    .join("mod.rs"),
                render_mod_rs(ctx, &domains, &[])?,
            ));
        }
        Ok(files)
    }
}

/// Prefix joined with an operation path. Never empty.
pub(crate) fn full_path(prefix: &str, path: &str) -> String {
    let joined = format!("{prefix}{path}");
    if joined.is_empty() {
        "/".to_string()
    } else {
        joined
    }
}

fn render_domain(
    ctx: &GenerationContext<'_>,
    domain: &DomainSpec,
) -> Result<String, GenerateError> {
    let builder = OperationContextBuilder::new();
    let mut operations = Vec::new();
    for op in domain.web_operations() {
        operations.push(web_operation(builder.for_web(op)?, &domain.web.prefix));
    }

    let mut routes: Vec<(String, Vec<(String, String)>)> = Vec::new();
    for op in &operations {
        let Some(web) = &op.op.web else { continue };
        let handler = (web.method.clone(), op.op.ident.clone());
        match routes.iter_mut().find(|(p, _)| *p == op.full_path) {
            Some((_, handlers)) => handlers.push(handler),
            None => routes.push((op.full_path.clone(), vec![handler])),
        }
    }
    let mut helpers: BTreeSet<&str> = BTreeSet::new();
    let routes: Vec<RouteCtx> = routes
        .iter()
        .map(|(path, handlers)| {
            let chain = handlers
                .iter()
                .enumerate()
                .map(|(i, (method, ident))| {
                    let known = ROUTING_HELPERS.iter().find(|h| **h == method.as_str());
                    match (i, known) {
                        (0, Some(helper)) => {
                            helpers.insert(*helper);
                            format!("{helper}({ident})")
                        }
                        (_, Some(helper)) => format!(".{helper}({ident})"),
                        (0, None) => {
                            helpers.insert("on");
                            format!("on(MethodFilter::{}, {ident})", method.to_uppercase())
                        }
                        (_, None) => {
                            format!(".on(MethodFilter::{}, {ident})", method.to_uppercase())
                        }
                    }
                })
                .collect::<String>();
            RouteCtx {
                path: path.clone(),
                chain,
            }
        })
        .collect();

    let mut extractors = vec!["State"];
    if operations.iter().any(|o| o.path_pattern.is_some()) {
        extractors.insert(0, "Path");
    }
    if operations.iter().any(|o| !o.op.query_params.is_empty()) {
        extractors.insert(extractors.len() - 1, "Query");
    }
    let has_bus = operations
        .iter()
        .any(|o| o.publish_on_success.is_some() || o.publish_on_error.is_some());
    let mut runtime_names = vec!["HandlerError"];
    if has_bus {
        runtime_names.insert(0, "Bus");
    }
    let mut routing: Vec<&str> = helpers.into_iter().collect();
    if routing.contains(&"on") {
        routing.insert(0, "MethodFilter");
    }
    let plain_ops: Vec<OperationContext> = operations.iter().map(|o| o.op.clone()).collect();

    ctx.templates.render(
        "web.rs.j2",
        minijinja::context! {
            header => GENERATED_HEADER,
            service => domain.service,
            domain => domain.name,
            prefix => domain.web.prefix,
            contract => contract_name(&domain.name),
            state => format!("{}WebState", to_camel_case(&domain.name)),
            has_bus => has_bus,
            has_query => extractors.contains(&"Query"),
            extract_use => use_line("axum::extract", &extractors),
            routing_use => use_line("axum::routing", &routing),
            runtime_use => use_line(ctx.runtime_path(), &runtime_names),
            schemas_use => use_line(ctx.schemas_path(), &model_imports(&plain_ops)),
            routes => routes,
            operations => operations,
        },
    )
}

fn web_operation(op: OperationContext, prefix: &str) -> WebOperationCtx {
    let path = op.web.as_ref().map(|w| w.path.as_str()).unwrap_or_default();
    let full = full_path(prefix, path);
    let (path_pattern, path_type) = match op.path_params.as_slice() {
        [] => (None, None),
        [one] => (Some(one.ident.clone()), Some(one.rust_type.clone())),
        many => (
            Some(format!(
                "({})",
                many.iter().map(|p| p.ident.as_str()).collect::<Vec<_>>().join(", ")
            )),
            Some(format!(
                "({})",
                many.iter()
                    .map(|p| p.rust_type.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
        ),
    };
    let response_type = if op.output_model.is_some() {
        format!("(StatusCode, Json<{}>)", op.return_type)
    } else {
        "StatusCode".to_string()
    };
    let (publish_on_success, publish_on_error) = match &op.bus {
        Some(bus) => (
            bus.publish_on_success_channel.clone(),
            bus.publish_on_error_channel.clone(),
        ),
        None => (None, None),
    };
    WebOperationCtx {
        full_path: full,
        query_struct: format!("{}Query", to_camel_case(&op.name)),
        path_pattern,
        path_type,
        call_args: op.call_arguments().join(", "),
        response_type,
        publish_on_success,
        publish_on_error,
        op,
    }
}
