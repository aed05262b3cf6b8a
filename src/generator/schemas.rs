use serde::Serialize;
use tracing::debug;

use super::naming::{
    enum_type_name, rust_default_literal, sanitize_rust_identifier, to_camel_case, to_snake_case,
};
use super::{
    render_mod_rs, GenerateError, GeneratedFile, GenerationContext, Generator, GeneratorKind,
    GENERATED_HEADER,
};
use crate::spec::{AllSpecs, EnumType, ModelSpec, ModelView, TypeSpec};

/// Emits `schemas.rs` (one struct per model and variant), `schemas.json`
/// (the structural schema) and the shared `mod.rs`.
pub struct SchemasGenerator;

#[derive(Debug, Serialize)]
struct EnumVariantCtx {
    ident: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct EnumCtx {
    name: String,
    variants: Vec<EnumVariantCtx>,
    default: Option<String>,
}

#[derive(Debug, Serialize)]
struct FieldCtx {
    ident: String,
    rust_type: String,
    serde: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct StructCtx {
    name: String,
    doc: String,
    fields: Vec<FieldCtx>,
}

#[derive(Debug, Serialize)]
struct DefaultFnCtx {
    name: String,
    rust_type: String,
    literal: String,
}

impl Generator for SchemasGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::Schemas
    }

    fn generate(
        &self,
        specs: &AllSpecs,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        if specs.models.is_empty() {
            return Ok(Vec::new());
        }
        let out_dir = ctx.layout.shared_output_dir();

        let mut enums = Vec::new();
        let mut structs = Vec::new();
        let mut defaults = Vec::new();
        for model in specs.models.iter() {
            collect_model(model, &mut enums, &mut structs, &mut defaults);
        }
        debug!(
            structs = structs.len(),
            enums = enums.len(),
            "rendering schemas"
        );

        let rust = ctx.templates.render(
            "schemas.rs.j2",
            minijinja::context! {
                header => GENERATED_HEADER,
                enums => enums,
                structs => structs,
                defaults => defaults,
            },
        )?;

        let json = serde_json::to_string_pretty(&specs.models.to_structural_schema()).map_err(
            |e| GenerateError::Serialize {
                what: "structural schema".to_string(),
                message: e.to_string(),
            },
        )?;

        let mut modules = vec!["schemas".to_string()];
        if !specs.events.is_empty() {
            modules.push("events".to_string());
        }

        Ok(vec![
            GeneratedFile::overwrite(out_dir.join("schemas.rs"), rust),
            GeneratedFile::overwrite(out_dir.join("schemas.json"), json + "\n"),
            GeneratedFile::overwrite(out_dir.join("mod.rs"), render_mod_rs(ctx, &modules, &[])?),
        ])
    }
}

/// First enum anywhere inside `ty`.
pub(super) fn find_enum(ty: &TypeSpec) -> Option<&EnumType> {
    match ty {
        TypeSpec::Enum(e) => Some(e),
        TypeSpec::Optional(of) | TypeSpec::List(of) => find_enum(of),
        TypeSpec::Dict { value, .. } => find_enum(value),
        TypeSpec::Primitive(_) => None,
    }
}

fn collect_model(
    model: &ModelSpec,
    enums: &mut Vec<EnumCtx>,
    structs: &mut Vec<StructCtx>,
    defaults: &mut Vec<DefaultFnCtx>,
) {
    let model_snake = to_snake_case(&model.name);
    for (name, field) in model.fields() {
        let enum_name = enum_type_name(&model.name, name);
        if let Some(e) = find_enum(&field.type_spec) {
            enums.push(EnumCtx {
                name: enum_name.clone(),
                variants: e
                    .values()
                    .iter()
                    .map(|v| EnumVariantCtx {
                        ident: to_camel_case(v),
                        value: v.clone(),
                    })
                    .collect(),
                default: e.default().map(to_camel_case),
            });
        }
        if let Some(default) = &field.default {
            let literal = rust_default_literal(&field.type_spec, default, Some(&enum_name))
                .unwrap_or_else(|| "Default::default()".to_string());
            defaults.push(DefaultFnCtx {
                name: format!("default_{model_snake}_{name}"),
                rust_type: target_type(&model.name, name, &field.type_spec),
                literal,
            });
        }
    }
    for view in model.views() {
        structs.push(struct_ctx(&model_snake, &view));
    }
}

fn target_type(model: &str, field: &str, ty: &TypeSpec) -> String {
    if find_enum(ty).is_some() {
        ty.to_target_type_named(&enum_type_name(model, field))
    } else {
        ty.to_target_type()
    }
}

fn struct_ctx(model_snake: &str, view: &ModelView<'_>) -> StructCtx {
    let doc = match view.variant {
        None => format!("`{}` model.", view.model),
        Some(variant) => format!("`{}` model, `{variant}` variant.", view.model),
    };
    let fields = view
        .fields
        .iter()
        .map(|fv| {
            let base = target_type(view.model, fv.name, &fv.field.type_spec);
            let has_default = fv.field.default.is_some();
            let wrap = !fv.required && !has_default && !fv.field.type_spec.is_optional();
            let rust_type = if wrap { format!("Option<{base}>") } else { base };
            let serde = if has_default {
                Some(format!(
                    "#[serde(default = \"default_{model_snake}_{}\")]",
                    fv.name
                ))
            } else if !fv.required {
                Some("#[serde(default, skip_serializing_if = \"Option::is_none\")]".to_string())
            } else {
                None
            };
            FieldCtx {
                ident: sanitize_rust_identifier(fv.name),
                rust_type,
                serde,
                description: fv
                    .field
                    .description
                    .as_ref()
                    .map(|d| d.split_whitespace().collect::<Vec<_>>().join(" ")),
            }
        })
        .collect();
    StructCtx {
        name: view.type_name(),
        doc,
        fields,
    }
}
