//! Models, fields and variant resolution.
//!
//! A model is an ordered set of fields plus named *variants*: partial views
//! such as `UserCreate` or `UserRead`. Each view decides which fields appear
//! and which of them are required.
//!
//! ## Variant policy
//!
//! Besides the explicit `exclude` list, some variant names carry an automatic
//! exclusion rule. The rule set lives in [`VARIANT_POLICIES`] and nowhere else:
//! today `Create` and `Update` drop every `readonly` field.
//!
//! ## Required fields
//!
//! A field is required in a view iff it is not optional in that view and has
//! no default. Field-level `optional: true` applies to every view, so such a
//! field never shows up in any `required` list.

use serde_json::{Map, Value as Json};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeSet;

use super::doc::{join, yaml_to_json, DocDiagnostics};
use super::schema::SchemaNode;
use super::types::{PrimitiveKind, TypeSpec};
use crate::validator::IssueKind;

/// Automatic exclusion applied to a variant on top of its explicit `exclude` list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoExclusion {
    /// Drop every field marked `readonly`.
    Readonly,
}

impl AutoExclusion {
    pub fn excludes(&self, field: &FieldSpec) -> bool {
        match self {
            AutoExclusion::Readonly => field.readonly,
        }
    }
}

/// Variant name -> automatic exclusion. Matching is by exact name.
pub const VARIANT_POLICIES: &[(&str, AutoExclusion)] = &[
    ("Create", AutoExclusion::Readonly),
    ("Update", AutoExclusion::Readonly),
];

pub fn auto_exclusion_for(variant: &str) -> Option<AutoExclusion> {
    VARIANT_POLICIES
        .iter()
        .find(|(name, _)| *name == variant)
        .map(|(_, policy)| *policy)
}

/// Numeric and length bounds of a field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Constraints {
    pub ge: Option<serde_json::Number>,
    pub gt: Option<serde_json::Number>,
    pub le: Option<serde_json::Number>,
    pub lt: Option<serde_json::Number>,
    pub min_length: Option<u64>,
    pub max_length: Option<u64>,
}

impl Constraints {
    fn has_numeric(&self) -> bool {
        self.ge.is_some() || self.gt.is_some() || self.le.is_some() || self.lt.is_some()
    }

    fn has_length(&self) -> bool {
        self.min_length.is_some() || self.max_length.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
    pub type_spec: TypeSpec,
    pub constraints: Constraints,
    pub readonly: bool,
    /// Nullable and never required, in every view.
    pub optional: bool,
    pub default: Option<Json>,
    pub description: Option<String>,
}

impl FieldSpec {
    pub fn new(type_spec: TypeSpec) -> Self {
        FieldSpec {
            type_spec,
            constraints: Constraints::default(),
            readonly: false,
            optional: false,
            default: None,
            description: None,
        }
    }

    pub fn readonly(mut self) -> Self {
        self.readonly = true;
        self
    }

    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    pub fn with_default(mut self, default: Json) -> Self {
        self.default = Some(default);
        self
    }

    /// Nullable either through `optional: true` or an `optional[...]` type.
    pub fn is_nullable(&self) -> bool {
        self.optional || self.type_spec.is_optional()
    }

    pub fn to_structural_schema(&self) -> SchemaNode {
        let mut node = self.type_spec.to_structural_schema();
        let c = &self.constraints;
        node.minimum = c.ge.clone().map(Json::Number);
        node.exclusive_minimum = c.gt.clone().map(Json::Number);
        node.maximum = c.le.clone().map(Json::Number);
        node.exclusive_maximum = c.lt.clone().map(Json::Number);
        node.min_length = c.min_length;
        node.max_length = c.max_length;
        if self.default.is_some() {
            node.default = self.default.clone();
        }
        node.read_only = self.readonly;
        if self.optional {
            node.nullable = true;
        }
        node
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VariantSpec {
    pub exclude: Vec<String>,
    pub optional: Vec<String>,
}

/// A variant names a field its model does not have.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ModelIntegrityError {
    /// Path relative to the model, e.g. `variants.Create.exclude`.
    pub path: String,
    pub message: String,
}

/// One field as it appears in a particular view.
#[derive(Debug, Clone, Copy)]
pub struct FieldView<'a> {
    pub name: &'a str,
    pub field: &'a FieldSpec,
    pub required: bool,
}

/// A model or one of its variants, resolved to its concrete field list.
#[derive(Debug, Clone)]
pub struct ModelView<'a> {
    pub model: &'a str,
    pub variant: Option<&'a str>,
    pub fields: Vec<FieldView<'a>>,
}

impl ModelView<'_> {
    /// `{Model}{Variant}`, or the bare model name.
    pub fn type_name(&self) -> String {
        format!("{}{}", self.model, self.variant.unwrap_or(""))
    }

    pub fn required(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.required)
            .map(|f| f.name)
            .collect()
    }

    pub fn to_structural_schema(&self) -> SchemaNode {
        let properties = self
            .fields
            .iter()
            .map(|f| (f.name.to_string(), f.field.to_structural_schema()))
            .collect();
        let required = self.required().into_iter().map(str::to_string).collect();
        SchemaNode::closed_object(self.type_name(), properties, required)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    pub name: String,
    fields: Vec<(String, FieldSpec)>,
    variants: Vec<(String, VariantSpec)>,
}

impl ModelSpec {
    /// Builds a model, checking it has fields and that every variant only
    /// names existing fields.
    pub fn new(
        name: impl Into<String>,
        fields: Vec<(String, FieldSpec)>,
        variants: Vec<(String, VariantSpec)>,
    ) -> Result<Self, Vec<ModelIntegrityError>> {
        let mut errors = Vec::new();
        if fields.is_empty() {
            errors.push(ModelIntegrityError {
                path: "fields".into(),
                message: "Model must have at least one field".into(),
            });
        }
        let known: BTreeSet<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
        errors.extend(variant_reference_errors(&known, &variants));
        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(ModelSpec {
            name: name.into(),
            fields,
            variants,
        })
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn variant_names(&self) -> impl Iterator<Item = &str> {
        self.variants.iter().map(|(n, _)| n.as_str())
    }

    pub fn variant(&self, name: &str) -> Option<&VariantSpec> {
        self.variants.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }

    pub fn readonly_fields(&self) -> BTreeSet<&str> {
        self.fields()
            .filter(|(_, f)| f.readonly)
            .map(|(n, _)| n)
            .collect()
    }

    /// Fields visible in `variant`, in declaration order.
    ///
    /// Removes the variant's `exclude` list and whatever its entry in
    /// [`VARIANT_POLICIES`] excludes. An undeclared variant name yields the
    /// base field set.
    pub fn get_variant_fields(&self, variant: &str) -> Vec<(&str, &FieldSpec)> {
        let Some(spec) = self.variant(variant) else {
            return self.fields().collect();
        };
        let policy = auto_exclusion_for(variant);
        self.fields()
            .filter(|(name, _)| !spec.exclude.iter().any(|e| e == name))
            .filter(|(_, field)| !policy.is_some_and(|p| p.excludes(field)))
            .collect()
    }

    /// The bare model (`None`) or a declared variant. Returns `None` for an
    /// undeclared variant name.
    pub fn view(&self, variant: Option<&str>) -> Option<ModelView<'_>> {
        let (variant, fields, view_optional) = match variant {
            None => (None, self.fields().collect::<Vec<_>>(), &[] as &[String]),
            Some(v) => {
                let (name, spec) = self.variants.iter().find(|(n, _)| n == v)?;
                (
                    Some(name.as_str()),
                    self.get_variant_fields(v),
                    spec.optional.as_slice(),
                )
            }
        };
        let fields = fields
            .into_iter()
            .map(|(name, field)| FieldView {
                name,
                field,
                required: !view_optional.iter().any(|o| o == name)
                    && !field.optional
                    && field.default.is_none(),
            })
            .collect();
        Some(ModelView {
            model: &self.name,
            variant,
            fields,
        })
    }

    /// The bare model followed by every variant, in declaration order.
    pub fn views(&self) -> Vec<ModelView<'_>> {
        std::iter::once(None)
            .chain(self.variant_names().map(Some))
            .filter_map(|v| self.view(v))
            .collect()
    }
}

/// Every model declared in the shared models document.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelsSpec {
    models: Vec<ModelSpec>,
    /// Names declared in the document, including models that failed validation.
    declared: BTreeSet<String>,
}

impl ModelsSpec {
    pub fn new(models: Vec<ModelSpec>) -> Self {
        let declared = models
            .iter()
            .flat_map(|m| {
                std::iter::once(m.name.clone())
                    .chain(m.variant_names().map(|v| format!("{}{v}", m.name)))
            })
            .collect();
        ModelsSpec { models, declared }
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.iter()
    }

    pub fn get(&self, name: &str) -> Option<&ModelSpec> {
        self.models.iter().find(|m| m.name == name)
    }

    /// Every bare and `{Model}{Variant}` name that may be referenced.
    pub fn known_model_names(&self) -> &BTreeSet<String> {
        &self.declared
    }

    /// Resolves `UserCreate` or `User` to its view.
    pub fn resolve(&self, type_name: &str) -> Option<ModelView<'_>> {
        self.models.iter().find_map(|m| {
            let rest = type_name.strip_prefix(m.name.as_str())?;
            if rest.is_empty() {
                m.view(None)
            } else {
                m.view(Some(rest))
            }
        })
    }

    /// `{definitions: {...}}` with the bare model and one entry per variant.
    pub fn to_structural_schema(&self) -> Json {
        let mut definitions = Map::new();
        for model in &self.models {
            for view in model.views() {
                definitions.insert(view.type_name(), view.to_structural_schema().to_json());
            }
        }
        let mut root = Map::new();
        root.insert("definitions".into(), Json::Object(definitions));
        Json::Object(root)
    }
}

const FIELD_KEYS: &[&str] = &[
    "type",
    "ge",
    "gt",
    "le",
    "lt",
    "min_length",
    "max_length",
    "readonly",
    "optional",
    "default",
    "description",
];

/// Parses the `models:` document. Models that fail validation are left out of
/// the result but their names stay declared.
pub(crate) fn parse_models(root: &Value, diag: &mut DocDiagnostics<'_>) -> ModelsSpec {
    let Some(root) = diag.mapping(root, "") else {
        return ModelsSpec::default();
    };
    diag.check_keys(root, &["models"], "");
    let models_raw = match root.get("models") {
        None | Some(Value::Null) => None,
        Some(v) => diag.mapping(v, "models"),
    };
    let Some(models_raw) = models_raw.filter(|m| !m.is_empty()) else {
        diag.report(
            "models",
            IssueKind::ModelIntegrityError,
            "Spec must define at least one model",
        );
        return ModelsSpec::default();
    };

    let mut models = Vec::new();
    let mut declared = BTreeSet::new();
    for (name, raw) in diag.entries(models_raw, "models") {
        let path = join("models", name);
        declared.insert(name.to_string());
        if let Some(variants) = raw.get("variants").and_then(Value::as_mapping) {
            for key in variants.keys().filter_map(Value::as_str) {
                declared.insert(format!("{name}{key}"));
            }
        }
        if let Some(model) = parse_model(name, raw, &path, diag) {
            models.push(model);
        }
    }
    ModelsSpec { models, declared }
}

/// Variant `exclude`/`optional` entries that name no declared field.
fn variant_reference_errors(
    known: &BTreeSet<&str>,
    variants: &[(String, VariantSpec)],
) -> Vec<ModelIntegrityError> {
    let mut errors = Vec::new();
    for (variant_name, variant) in variants {
        for excluded in &variant.exclude {
            if !known.contains(excluded.as_str()) {
                errors.push(ModelIntegrityError {
                    path: format!("variants.{variant_name}.exclude"),
                    message: format!(
                        "Variant '{variant_name}' excludes unknown field '{excluded}'"
                    ),
                });
            }
        }
        for optional in &variant.optional {
            if !known.contains(optional.as_str()) {
                errors.push(ModelIntegrityError {
                    path: format!("variants.{variant_name}.optional"),
                    message: format!(
                        "Variant '{variant_name}' marks unknown field '{optional}' as optional"
                    ),
                });
            }
        }
    }
    errors
}

fn parse_model(
    name: &str,
    raw: &Value,
    path: &str,
    diag: &mut DocDiagnostics<'_>,
) -> Option<ModelSpec> {
    let map = diag.mapping(raw, path)?;
    diag.check_keys(map, &["fields", "variants", "description"], path);

    let mut ok = true;
    let mut fields = Vec::new();
    // Every field key, including the ones that fail to parse.
    let mut declared_fields = Some(BTreeSet::new());
    let fields_path = join(path, "fields");
    match map.get("fields") {
        None | Some(Value::Null) => {}
        Some(raw_fields) => match diag.mapping(raw_fields, &fields_path) {
            Some(raw_fields) => {
                for (field_name, raw_field) in diag.entries(raw_fields, &fields_path) {
                    if let Some(declared) = declared_fields.as_mut() {
                        declared.insert(field_name.to_string());
                    }
                    match parse_field(raw_field, &join(&fields_path, field_name), diag) {
                        Some(field) => fields.push((field_name.to_string(), field)),
                        None => ok = false,
                    }
                }
            }
            None => {
                ok = false;
                declared_fields = None;
            }
        },
    }

    let mut variants = Vec::new();
    let variants_path = join(path, "variants");
    if let Some(raw_variants) = map.get("variants").filter(|v| !v.is_null()) {
        match diag.mapping(raw_variants, &variants_path) {
            Some(raw_variants) => {
                for (variant_name, raw_variant) in diag.entries(raw_variants, &variants_path) {
                    let vpath = join(&variants_path, variant_name);
                    let variant = match raw_variant {
                        Value::Null => VariantSpec::default(),
                        other => match diag.mapping(other, &vpath) {
                            Some(vmap) => {
                                diag.check_keys(vmap, &["exclude", "optional"], &vpath);
                                VariantSpec {
                                    exclude: diag.string_list(vmap, "exclude", &vpath),
                                    optional: diag.string_list(vmap, "optional", &vpath),
                                }
                            }
                            None => {
                                ok = false;
                                continue;
                            }
                        },
                    };
                    variants.push((variant_name.to_string(), variant));
                }
            }
            None => ok = false,
        }
    }

    if !ok {
        if let Some(declared) = &declared_fields {
            let known: BTreeSet<&str> = declared.iter().map(String::as_str).collect();
            for e in variant_reference_errors(&known, &variants) {
                diag.report(&join(path, &e.path), IssueKind::ModelIntegrityError, e.message);
            }
        }
        return None;
    }
    match ModelSpec::new(name, fields, variants) {
        Ok(model) => Some(model),
        Err(errors) => {
            for e in errors {
                diag.report(&join(path, &e.path), IssueKind::ModelIntegrityError, e.message);
            }
            None
        }
    }
}

fn parse_field(raw: &Value, path: &str, diag: &mut DocDiagnostics<'_>) -> Option<FieldSpec> {
    let map = match raw {
        Value::String(_) => {
            return match TypeSpec::parse(raw) {
                Ok(type_spec) => Some(FieldSpec::new(type_spec)),
                Err(e) => {
                    diag.report(path, IssueKind::TypeGrammarError, e.message);
                    None
                }
            }
        }
        other => diag.mapping(other, path)?,
    };
    diag.check_keys(map, FIELD_KEYS, path);

    let Some(raw_type) = map.get("type") else {
        diag.report(path, IssueKind::TypeGrammarError, "Field must have a 'type' key");
        return None;
    };
    let type_spec = match TypeSpec::parse(raw_type) {
        Ok(t) => t,
        Err(e) => {
            diag.report(&join(path, "type"), IssueKind::TypeGrammarError, e.message);
            return None;
        }
    };

    let before = diag.issue_count();
    let constraints = Constraints {
        ge: number(map, "ge", path, diag),
        gt: number(map, "gt", path, diag),
        le: number(map, "le", path, diag),
        lt: number(map, "lt", path, diag),
        min_length: length(map, "min_length", path, diag),
        max_length: length(map, "max_length", path, diag),
    };
    check_constraint_kinds(&type_spec, &constraints, path, diag);

    let default = match map.get("default") {
        None | Some(Value::Null) => None,
        Some(v) => {
            let json = yaml_to_json(v);
            match json {
                Some(j) if type_spec.accepts_default(&j) => Some(j),
                _ => {
                    diag.report(
                        &join(path, "default"),
                        IssueKind::TypeGrammarError,
                        format!("Default does not match field type '{type_spec}'"),
                    );
                    None
                }
            }
        }
    };

    let field = FieldSpec {
        readonly: diag.flag(map, "readonly", path),
        optional: diag.flag(map, "optional", path),
        description: diag.optional_str(map, "description", path),
        type_spec,
        constraints,
        default,
    };
    if diag.issue_count() != before {
        return None;
    }
    Some(field)
}

fn number(
    map: &Mapping,
    key: &str,
    path: &str,
    diag: &mut DocDiagnostics<'_>,
) -> Option<serde_json::Number> {
    match map.get(key)? {
        Value::Number(n) => match yaml_to_json(&Value::Number(n.clone())) {
            Some(Json::Number(n)) => Some(n),
            _ => {
                diag.report(&join(path, key), IssueKind::TypeGrammarError, "Bound must be finite");
                None
            }
        },
        _ => {
            diag.report(
                &join(path, key),
                IssueKind::TypeGrammarError,
                format!("'{key}' must be a number"),
            );
            None
        }
    }
}

fn length(map: &Mapping, key: &str, path: &str, diag: &mut DocDiagnostics<'_>) -> Option<u64> {
    let raw = map.get(key)?;
    match raw.as_u64() {
        Some(n) => Some(n),
        None => {
            diag.report(
                &join(path, key),
                IssueKind::TypeGrammarError,
                format!("'{key}' must be a non-negative integer"),
            );
            None
        }
    }
}

fn check_constraint_kinds(
    type_spec: &TypeSpec,
    constraints: &Constraints,
    path: &str,
    diag: &mut DocDiagnostics<'_>,
) {
    let inner = type_spec.innermost();
    let numeric = matches!(inner, TypeSpec::Primitive(k) if k.is_numeric());
    let sized = matches!(
        inner,
        TypeSpec::Primitive(PrimitiveKind::String) | TypeSpec::List(_) | TypeSpec::Dict { .. }
    );
    if constraints.has_numeric() && !numeric {
        diag.report(
            path,
            IssueKind::TypeGrammarError,
            format!("Numeric bounds (ge/gt/le/lt) do not apply to type '{type_spec}'"),
        );
    }
    if constraints.has_length() && !sized {
        diag.report(
            path,
            IssueKind::TypeGrammarError,
            format!("Length bounds (min_length/max_length) do not apply to type '{type_spec}'"),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::Path;

    fn int() -> TypeSpec {
        TypeSpec::Primitive(PrimitiveKind::Int)
    }

    fn user() -> ModelSpec {
        ModelSpec::new(
            "User",
            vec![
                ("id".into(), FieldSpec::new(int()).readonly()),
                ("telegram_id".into(), FieldSpec::new(int())),
                (
                    "is_admin".into(),
                    FieldSpec::new(TypeSpec::Primitive(PrimitiveKind::Bool))
                        .with_default(json!(false)),
                ),
            ],
            vec![
                ("Create".into(), VariantSpec::default()),
                ("Read".into(), VariantSpec::default()),
            ],
        )
        .unwrap()
    }

    fn names(fields: &[(&str, &FieldSpec)]) -> Vec<String> {
        fields.iter().map(|(n, _)| n.to_string()).collect()
    }

    #[test]
    fn test_policy_table() {
        assert_eq!(auto_exclusion_for("Create"), Some(AutoExclusion::Readonly));
        assert_eq!(auto_exclusion_for("Update"), Some(AutoExclusion::Readonly));
        assert_eq!(auto_exclusion_for("Read"), None);
        assert_eq!(auto_exclusion_for("create"), None);
    }

    #[test]
    fn test_create_drops_readonly() {
        let model = user();
        assert_eq!(
            names(&model.get_variant_fields("Create")),
            vec!["telegram_id", "is_admin"]
        );
        assert_eq!(
            names(&model.get_variant_fields("Read")),
            vec!["id", "telegram_id", "is_admin"]
        );
        assert_eq!(
            model.get_variant_fields("Create"),
            model.get_variant_fields("Create")
        );
    }

    #[test]
    fn test_user_scenario_required_sets() {
        let model = user();
        let create = model.view(Some("Create")).unwrap();
        assert_eq!(create.type_name(), "UserCreate");
        assert_eq!(create.required(), vec!["telegram_id"]);
        let read = model.view(Some("Read")).unwrap();
        assert_eq!(read.required(), vec!["id", "telegram_id"]);
        assert!(model.view(Some("Missing")).is_none());
    }

    #[test]
    fn test_field_optional_cascades_into_every_view() {
        let model = ModelSpec::new(
            "Profile",
            vec![
                ("id".into(), FieldSpec::new(int())),
                ("nickname".into(), FieldSpec::new(TypeSpec::Primitive(PrimitiveKind::String)).optional()),
            ],
            vec![
                ("Create".into(), VariantSpec::default()),
                (
                    "Update".into(),
                    VariantSpec {
                        exclude: vec![],
                        optional: vec!["id".into()],
                    },
                ),
            ],
        )
        .unwrap();
        for view in model.views() {
            assert!(
                !view.required().contains(&"nickname"),
                "{} lists nickname as required",
                view.type_name()
            );
            let schema = view.to_structural_schema().to_json();
            assert_eq!(schema["properties"]["nickname"]["nullable"], true);
        }
        assert!(model.view(Some("Update")).unwrap().required().is_empty());
    }

    #[test]
    fn test_variant_reference_errors() {
        let errors = ModelSpec::new(
            "User",
            vec![("id".into(), FieldSpec::new(int()))],
            vec![(
                "Create".into(),
                VariantSpec {
                    exclude: vec!["nope".into()],
                    optional: vec!["gone".into()],
                },
            )],
        )
        .unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].message.contains("excludes unknown field 'nope'"));
        assert!(errors[1].message.contains("unknown field 'gone' as optional"));
    }

    #[test]
    fn test_empty_model_is_rejected() {
        let errors = ModelSpec::new("Empty", vec![], vec![]).unwrap_err();
        assert!(errors[0].message.contains("at least one field"));
    }

    #[test]
    fn test_schema_definitions_and_resolve() {
        let spec = ModelsSpec::new(vec![user()]);
        let schema = spec.to_structural_schema();
        let defs = schema["definitions"].as_object().unwrap();
        let keys: Vec<_> = defs.keys().cloned().collect();
        assert_eq!(keys, vec!["User", "UserCreate", "UserRead"]);
        assert_eq!(defs["UserCreate"]["additionalProperties"], false);
        assert_eq!(defs["UserCreate"]["required"], json!(["telegram_id"]));
        assert_eq!(defs["User"]["properties"]["id"]["readOnly"], true);
        assert_eq!(defs["User"]["properties"]["is_admin"]["default"], false);

        assert_eq!(spec.resolve("UserRead").unwrap().type_name(), "UserRead");
        assert_eq!(spec.resolve("User").unwrap().variant, None);
        assert!(spec.resolve("UserDelete").is_none());
        assert!(spec.known_model_names().contains("UserCreate"));
    }

    fn parse(source: &str) -> (ModelsSpec, Vec<crate::validator::SpecIssue>) {
        let path = Path::new("models.yaml");
        let value = super::super::doc::parse_yaml(path, source).unwrap();
        let mut diag = DocDiagnostics::new(path, source);
        let spec = parse_models(&value, &mut diag);
        (spec, diag.into_issues())
    }

    #[test]
    fn test_parse_models_document() {
        let (spec, issues) = parse(
            r#"
models:
  User:
    fields:
      id: {type: int, readonly: true, ge: 1}
      name: {type: string, min_length: 1, max_length: 64}
      tags: list[string]
      status:
        type: {type: enum, values: [active, banned], default: active}
    variants:
      Create: {}
      Read:
"#,
        );
        assert!(issues.is_empty(), "{issues:?}");
        let user = spec.get("User").unwrap();
        assert_eq!(user.variant_names().collect::<Vec<_>>(), vec!["Create", "Read"]);
        let schema = user.view(None).unwrap().to_structural_schema().to_json();
        assert_eq!(schema["properties"]["id"]["minimum"], 1);
        assert_eq!(schema["properties"]["name"]["maxLength"], 64);
        assert_eq!(schema["properties"]["status"]["enum"], json!(["active", "banned"]));
    }

    #[test]
    fn test_parse_reports_every_broken_model() {
        let (spec, issues) = parse(
            r#"
models:
  Broken:
    fields:
      id: {type: integer}
    variants:
      Create: {exclude: [id]}
  AlsoBroken:
    fields:
      id: int
    variants:
      Create: {exclude: [missing]}
  Fine:
    fields:
      id: int
"#,
        );
        assert_eq!(issues.len(), 2, "{issues:?}");
        assert_eq!(issues[0].kind, IssueKind::TypeGrammarError);
        assert_eq!(issues[0].path, "models.Broken.fields.id.type");
        assert_eq!(issues[1].kind, IssueKind::ModelIntegrityError);
        assert_eq!(issues[1].path, "models.AlsoBroken.variants.Create.exclude");
        assert_eq!(spec.len(), 1);
        assert!(spec.known_model_names().contains("BrokenCreate"));
        assert!(spec.known_model_names().contains("AlsoBroken"));
    }

    #[test]
    fn test_variant_errors_survive_a_broken_field() {
        let (spec, issues) = parse(
            r#"
models:
  User:
    fields:
      id: {type: frob}
      name: string
    variants:
      Create: {exclude: [nope, id]}
"#,
        );
        assert_eq!(issues.len(), 2, "{issues:?}");
        assert_eq!(issues[0].kind, IssueKind::TypeGrammarError);
        assert_eq!(issues[0].path, "models.User.fields.id.type");
        assert_eq!(issues[1].kind, IssueKind::ModelIntegrityError);
        assert_eq!(issues[1].path, "models.User.variants.Create.exclude");
        assert!(issues[1].message.contains("unknown field 'nope'"));
        assert!(spec.get("User").is_none());
    }

    #[test]
    fn test_parse_rejects_misapplied_constraints() {
        let (_, issues) = parse(
            r#"
models:
  Item:
    fields:
      flag: {type: bool, ge: 0}
      count: {type: int, max_length: 3}
      price: {type: float, default: "cheap"}
"#,
        );
        assert_eq!(issues.len(), 3, "{issues:?}");
        assert!(issues.iter().all(|i| i.kind == IssueKind::TypeGrammarError));
    }

    #[test]
    fn test_parse_requires_a_model() {
        let (_, issues) = parse("models: {}\n");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("at least one model"));
    }
}
