//! TypeScript declarations of the shared models, for frontends that talk to
//! the services over JSON.

use serde::Serialize;
use tracing::debug;

use super::naming::enum_type_name;
use super::schemas::find_enum;
use super::{GenerateError, GeneratedFile, GenerationContext, Generator, GeneratorKind, GENERATED_HEADER};
use crate::spec::{AllSpecs, ModelView, PrimitiveKind, TypeSpec};

/// Emits one string-literal union per enum field and one interface per model
/// and variant.
pub struct TypeScriptGenerator;

#[derive(Debug, Serialize)]
struct UnionCtx {
    name: String,
    members: String,
}

#[derive(Debug, Serialize)]
struct PropertyCtx {
    name: String,
    ts_type: String,
    optional: bool,
    readonly: bool,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct InterfaceCtx {
    name: String,
    properties: Vec<PropertyCtx>,
}

impl Generator for TypeScriptGenerator {
    fn kind(&self) -> GeneratorKind {
        GeneratorKind::TypeScript
    }

    fn generate(
        &self,
        specs: &AllSpecs,
        ctx: &GenerationContext<'_>,
    ) -> Result<Vec<GeneratedFile>, GenerateError> {
        if specs.models.is_empty() {
            return Ok(Vec::new());
        }
        let mut unions = Vec::new();
        let mut interfaces = Vec::new();
        for model in specs.models.iter() {
            for (name, field) in model.fields() {
                if let Some(e) = find_enum(&field.type_spec) {
                    let members: Vec<String> = e.values().iter().map(|v| format!("{v:?}")).collect();
                    unions.push(UnionCtx {
                        name: enum_type_name(&model.name, name),
                        members: members.join(" | "),
                    });
                }
            }
            interfaces.extend(model.views().iter().map(interface));
        }
        debug!(interfaces = interfaces.len(), unions = unions.len(), "rendering typescript");

        let contents = ctx.templates.render(
            "types.ts.j2",
            minijinja::context! {
                header => GENERATED_HEADER,
                unions => unions,
                interfaces => interfaces,
            },
        )?;
        Ok(vec![GeneratedFile::overwrite(ctx.layout.typescript_file(), contents)])
    }
}

fn interface(view: &ModelView<'_>) -> InterfaceCtx {
    InterfaceCtx {
        name: view.type_name(),
        properties: view
            .fields
            .iter()
            .map(|fv| {
                let named = find_enum(&fv.field.type_spec).map(|_| enum_type_name(view.model, fv.name));
                let mut ts_type = ts_type(&fv.field.type_spec, named.as_deref());
                if fv.field.optional && !fv.field.type_spec.is_optional() {
                    ts_type.push_str(" | null");
                }
                PropertyCtx {
                    name: fv.name.to_string(),
                    ts_type,
                    optional: !fv.required,
                    readonly: fv.field.readonly,
                    description: fv.field.description.clone(),
                }
            })
            .collect(),
    }
}

/// TypeScript spelling of `ty`. An enum renders as `enum_name` when given,
/// else as an inline union of its values.
pub(crate) fn ts_type(ty: &TypeSpec, enum_name: Option<&str>) -> String {
    match ty {
        TypeSpec::Primitive(kind) => primitive(*kind).to_string(),
        TypeSpec::List(of) => {
            let inner = ts_type(of, enum_name);
            if inner.contains(' ') {
                format!("({inner})[]")
            } else {
                format!("{inner}[]")
            }
        }
        TypeSpec::Dict { key, value } => {
            let key = match key {
                PrimitiveKind::Int => "number",
                _ => "string",
            };
            format!("Record<{key}, {}>", ts_type(value, enum_name))
        }
        TypeSpec::Optional(of) => format!("{} | null", ts_type(of, enum_name)),
        TypeSpec::Enum(e) => match enum_name {
            Some(name) => name.to_string(),
            None => e
                .values()
                .iter()
                .map(|v| format!("{v:?}"))
                .collect::<Vec<_>>()
                .join(" | "),
        },
    }
}

fn primitive(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Int | PrimitiveKind::Float => "number",
        PrimitiveKind::Bool => "boolean",
        // ISO 8601 text and hyphenated UUIDs on the wire.
        PrimitiveKind::String | PrimitiveKind::DateTime | PrimitiveKind::Uuid => "string",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(raw: &str) -> String {
        ts_type(&TypeSpec::parse_shorthand(raw).unwrap(), None)
    }

    #[test]
    fn test_ts_type_mapping() {
        assert_eq!(ts("int"), "number");
        assert_eq!(ts("float"), "number");
        assert_eq!(ts("bool"), "boolean");
        assert_eq!(ts("datetime"), "string");
        assert_eq!(ts("list[uuid]"), "string[]");
        assert_eq!(ts("dict[string, list[int]]"), "Record<string, number[]>");
        assert_eq!(ts("dict[int, bool]"), "Record<number, boolean>");
        assert_eq!(ts("optional[string]"), "string | null");
        assert_eq!(ts("list[optional[int]]"), "(number | null)[]");
    }

    #[test]
    fn test_enum_renders_as_union_or_name() {
        let raw: serde_yaml::Value =
            serde_yaml::from_str("{type: enum, values: [active, banned]}").unwrap();
        let spec = TypeSpec::parse(&raw).unwrap();
        assert_eq!(ts_type(&spec, None), "\"active\" | \"banned\"");
        assert_eq!(ts_type(&spec, Some("UserStatus")), "UserStatus");
        let list = TypeSpec::List(Box::new(spec));
        assert_eq!(ts_type(&list, None), "(\"active\" | \"banned\")[]");
    }
}
