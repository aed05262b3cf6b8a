use std::collections::{BTreeMap, BTreeSet};

use super::context::{OperationContext, OperationContextBuilder};
use super::naming::contract_name;
use super::{
    render_mod_rs, use_line, GenerateError, GeneratedFile, GenerationContext, Generator,
    GeneratorKind, GENERATED_HEADER,
};
use crate::spec::{AllSpecs, DomainSpec};

/// Emits one transport-agnostic trait per domain. Handlers implement it;
/// web bindings and bus adapters call it.
pub struct ContractsGenerator;

impl Generator for ContractsGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Contracts
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
            let contents = render_contract(ctx, domain, &operations)?;
            let dir = ctx
                .layout
                .service_generated_dir(&domain.service)
                .join("contracts");
            files.push(GeneratedFile::overwrite(
                dir.join(format!("{}.rs", domain.name)),
                contents,
            ));
            modules
                .entry(domain.service.as_str())
                .or_default()
                .push(domain.name.clone());
        }

        for (service, domains) in modules {
            let reexports: Vec<(String, String)> = domains
                .iter()
                .map(|d| (d.clone(), contract_name(d)))
                .collect();
            let dir = ctx.layout.service_generated_dir(service).join("contracts");
            files.push(GeneratedFile::overwrite(
                dir.join("mod.rs"),
                render_mod_rs(ctx, &domains, &reexports)?,
            ));
        }
        Ok(files)
    }
}

/// Sorted model names used by `operations`.
pub(crate) fn model_imports(operations: &[OperationContext]) -> Vec<String> {
    operations
        .iter()
        .flat_map(|op| op.imports.iter().cloned())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

fn render_contract(
    ctx: &GenerationContext<'_>,
    domain: &DomainSpec,
    operations: &[OperationContext],
) -> Result<String, GenerateError> {
    ctx.templates.render(
        "contract.rs.j2",
        minijinja::context! {
            header => GENERATED_HEADER,
            service => domain.service,
            domain => domain.name,
            contract => contract_name(&domain.name),
            runtime_use => use_line(ctx.runtime_path(), &["HandlerError"]),
            schemas_use => use_line(ctx.schemas_path(), &model_imports(operations)),
            operations => operations,
        },
    )
}
