use std::collections::BTreeMap;

use tracing::debug;

use super::context::{OperationContext, OperationContextBuilder};
use super::contracts::model_imports;
use super::naming::{contract_name, handler_name};
use super::{
    render_mod_rs, use_line, GenerateError, GeneratedFile, GenerationContext, Generator,
    GeneratorKind,
};
use crate::spec::AllSpecs;

/// Emits an editable handler per domain (only if absent) and the handlers
/// `mod.rs` (always).
pub struct HandlersGenerator;

impl Generator for HandlersGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Handlers
    }

    fn generate(
        &self,
        specs: &AllSpecs,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let builder = OperationContextBuilder::new();
        let mut files = Vec::new();
        let mut modules: BTreeMap<&str, Vec<String>> = BTreeMap::new();

        for domain in specs.domains.values() {
            let operations: Vec<OperationContext> = domain
                .operations
                .iter()
                .map(|op| builder.for_contract(op))
                .collect();
            let contents = ctx.templates.render(
                "handler.rs.j2",
                minijinja::context! {
                    domain => domain.name,
                    contract => contract_name(&domain.name),
                    handler => handler_name(&domain.name),
                    runtime_use => use_line(ctx.runtime_path(), &["HandlerError"]),
                    schemas_use => use_line(ctx.schemas_path(), &model_imports(&operations)),
                    operations => operations
                        .iter()
                        .map(|op| stub_method(&op.signature, &op.name))
                        .collect::<Vec<_>>(),
                },
            )?;
            let path = ctx
                .layout
                .service_handlers_dir(&domain.service)
                .join(format!("{}.rs", domain.name));
            debug!(path = %path.display(), "rendered handler stub");
            files.push(GeneratedFile::if_absent(path, contents));
            modules
                .entry(domain.service.as_str())
                .or_default()
                .push(domain.name.clone());
        }

        for (service, domains) in modules {
            files.push(GeneratedFile::overwrite(
                ctx.layout.service_handlers_dir(service).join("mod.rs"),
                render_mod_rs(ctx, &domains, &[])?,
            ));
        }
        Ok(files)
    }
}

/// A trait method returning "not implemented", indented for an impl block.
pub(crate) fn stub_method(signature: &str, operation: &str) -> String {
    format!(
        "    {signature} {{\n        Err(HandlerError::not_implemented(\"{operation}\"))\n    }}\n"
    )
}
