//! OpenAPI 3.1 description of each service's web operations.
//!
//! Component schemas are the structural schemas of the referenced model views,
//! so the document and `schemas.json` never disagree.

use std::collections::BTreeSet;

use serde_json::{json, Map, Value};

use super::web::full_path;
use super::{GenerateError, GeneratedFile, GenerationContext, Generator, GeneratorKind};
use crate::spec::{AllSpecs, DomainSpec, OperationSpec};

pub const OPENAPI_VERSION: &str = "3.1.0";

pub struct OpenApiGenerator;

impl Generator for OpenApiGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::OpenApi
    }

    fn generate(
        &self,
        specs: &AllSpecs,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        let mut files = Vec::new();
        for service in specs.services() {
            let domains: Vec<&DomainSpec> = specs
                .domains_of(service)
                .filter(|d| d.has_web_operations())
                .collect();
            if domains.is_empty() {
                continue;
            }
            let doc = build_document(specs, service, &domains);
            let yaml = serde_yaml::to_string(&doc).map_err(|e| GenerateError::Serialize {
                what: format!("OpenAPI document of '{service}'"),
                message: e.to_string(),
            })?;
            files.push(GeneratedFile::overwrite(
                ctx.layout.service_doc_dir(service).join("openapi.yaml"),
                yaml,
            ));
        }
        Ok(files)
    }
}

/// The OpenAPI document of `service` as a JSON value.
pub fn build_document(specs: &AllSpecs, service: &str, domains: &[&DomainSpec]) -> Value {
    let mut paths = Map::new();
    let mut referenced = BTreeSet::new();

    for domain in domains {
        let tags = if domain.web.tags.is_empty() {
            vec![domain.name.clone()]
        } else {
            domain.web.tags.clone()
        };
        for op in domain.web_operations() {
            let Some(web) = &op.web else { continue };
            let path = full_path(&domain.web.prefix, &web.path);
            let item = paths
                .entry(path)
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(item) = item {
                item.insert(
                    web.method.as_str().to_lowercase(),
                    operation_object(op, &tags, &mut referenced),
                );
            }
        }
    }

    let mut schemas = Map::new();
    for name in &referenced {
        if let Some(view) = specs.models.resolve(name) {
            schemas.insert(name.clone(), view.to_structural_schema().to_json());
        }
    }

    json!({
        "openapi": OPENAPI_VERSION,
        "info": {
            "title": service,
            "version": "0.1.0",
        },
        "paths": paths,
        "components": {
            "schemas": schemas,
        },
    })
}

fn schema_ref(name: &str) -> Value {
    json!({ "$ref": format!("#/components/schemas/{name}") })
}

fn operation_object(op: &OperationSpec, tags: &[String], referenced: &mut BTreeSet<String>) -> Value {
    let mut out = Map::new();
    out.insert("operationId".into(), json!(op.name));
    out.insert("tags".into(), json!(tags));

    if !op.params.is_empty() {
        let params: Vec<Value> = op
            .params
            .iter()
            .map(|p| {
                let mut schema = p.type_spec.to_structural_schema().to_json();
                if let (Some(default), Value::Object(map)) = (&p.default, &mut schema) {
                    map.insert("default".into(), default.clone());
                }
                json!({
                    "name": p.name,
                    "in": p.source.as_str(),
                    "required": p.must_be_supplied(),
                    "schema": schema,
                })
            })
            .collect();
        out.insert("parameters".into(), Value::Array(params));
    }

    if let Some(input) = &op.input_model {
        referenced.insert(input.clone());
        out.insert(
            "requestBody".into(),
            json!({
                "required": true,
                "content": { "application/json": { "schema": schema_ref(input) } },
            }),
        );
    }

    let status = op
        .web
        .as_ref()
        .map(|w| w.effective_status())
        .unwrap_or_default();
    let mut response = Map::new();
    response.insert(
        "description".into(),
        json!(status.canonical_reason().unwrap_or("Response")),
    );
    if let Some(output) = op.base_output_model() {
        referenced.insert(output.to_string());
        let schema = if op.response_is_collection() {
            json!({ "type": "array", "items": schema_ref(output) })
        } else {
            schema_ref(output)
        };
        response.insert(
            "content".into(),
            json!({ "application/json": { "schema": schema } }),
        );
    }
    let mut responses = Map::new();
    responses.insert(status.as_u16().to_string(), Value::Object(response));
    out.insert("responses".into(), Value::Object(responses));

    Value::Object(out)
}
