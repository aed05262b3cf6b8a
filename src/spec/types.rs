//! Field and parameter type grammar.
//!
//! A [`TypeSpec`] is written either as a shorthand token (`int`, `list[string]`,
//! `dict[string, float]`) or in the structured form
//! (`{type: list, of: {type: uuid}}`). Both forms parse into the same closed
//! sum type, which every renderer matches exhaustively.

use serde_yaml::Value;
use std::fmt;

use super::schema::{AdditionalProperties, SchemaNode, SchemaType};
use crate::generator::naming::to_camel_case;

/// Scalar kinds understood by the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Int,
    String,
    Bool,
    Float,
    DateTime,
    Uuid,
}

impl PrimitiveKind {
    pub const ALL: [PrimitiveKind; 6] = [
        PrimitiveKind::Int,
        PrimitiveKind::String,
        PrimitiveKind::Bool,
        PrimitiveKind::Float,
        PrimitiveKind::DateTime,
        PrimitiveKind::Uuid,
    ];

    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "int" => Some(PrimitiveKind::Int),
            "string" => Some(PrimitiveKind::String),
            "bool" => Some(PrimitiveKind::Bool),
            "float" => Some(PrimitiveKind::Float),
            "datetime" => Some(PrimitiveKind::DateTime),
            "uuid" => Some(PrimitiveKind::Uuid),
            _ => None,
        }
    }

    pub fn token(&self) -> &'static str {
        match self {
            PrimitiveKind::Int => "int",
            PrimitiveKind::String => "string",
            PrimitiveKind::Bool => "bool",
            PrimitiveKind::Float => "float",
            PrimitiveKind::DateTime => "datetime",
            PrimitiveKind::Uuid => "uuid",
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, PrimitiveKind::Int | PrimitiveKind::Float)
    }

    /// Floats have no total equality, so they cannot key a map.
    pub fn is_hashable(&self) -> bool {
        !matches!(self, PrimitiveKind::Float)
    }
}

/// An enumeration of identifier-like string values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumType {
    values: Vec<String>,
    default: Option<String>,
}

impl EnumType {
    /// Builds an enum, enforcing at least two unique identifier values that
    /// map to distinct Rust variants, and a default drawn from them.
    pub fn new(values: Vec<String>, default: Option<String>) -> Result<Self, UnknownTypeError> {
        if values.len() < 2 {
            return Err(UnknownTypeError::new("Enum must have at least 2 values"));
        }
        for (i, value) in values.iter().enumerate() {
            if !is_identifier(value) || value.starts_with('_') {
                return Err(UnknownTypeError::new(format!(
                    "Enum value '{value}' must be a valid identifier (no spaces, no leading underscore)"
                )));
            }
            if values[..i].contains(value) {
                return Err(UnknownTypeError::new(format!(
                    "Enum values must be unique, '{value}' is repeated"
                )));
            }
            let ident = to_camel_case(value);
            if let Some(other) = values[..i].iter().find(|v| to_camel_case(v) == ident) {
                return Err(UnknownTypeError::new(format!(
                    "Enum values '{other}' and '{value}' both become variant '{ident}'"
                )));
            }
        }
        if let Some(default) = &default {
            if !values.contains(default) {
                return Err(UnknownTypeError::new(format!(
                    "Default '{default}' is not in enum values: [{}]",
                    values.join(", ")
                )));
            }
        }
        Ok(EnumType { values, default })
    }

    pub fn values(&self) -> &[String] {
        &self.values
    }

    pub fn default(&self) -> Option<&str> {
        self.default.as_deref()
    }
}

/// The shape of a field or parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeSpec {
    Primitive(PrimitiveKind),
    List(Box<TypeSpec>),
    /// Keys are always primitive.
    Dict {
        key: PrimitiveKind,
        value: Box<TypeSpec>,
    },
    Optional(Box<TypeSpec>),
    Enum(EnumType),
}

/// Raised when a type expression does not match the grammar.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct UnknownTypeError {
    pub message: String,
}

impl UnknownTypeError {
    pub fn new(message: impl Into<String>) -> Self {
        UnknownTypeError {
            message: message.into(),
        }
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_alphanumeric() || c == '_')
}

fn dict_key(kind: PrimitiveKind) -> Result<PrimitiveKind, UnknownTypeError> {
    if kind.is_hashable() {
        Ok(kind)
    } else {
        Err(UnknownTypeError::new(format!(
            "Dict key cannot be '{}'; use int, string, bool, datetime or uuid",
            kind.token()
        )))
    }
}

/// Splits `a, dict[b, c]` on the first comma outside brackets.
fn split_top_level(s: &str) -> Option<(&str, &str)> {
    let mut depth = 0usize;
    for (i, c) in s.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.checked_sub(1)?,
            ',' if depth == 0 => return Some((s[..i].trim(), s[i + 1..].trim())),
            _ => {}
        }
    }
    None
}

fn bracketed<'a>(s: &'a str, head: &str) -> Option<&'a str> {
    s.strip_prefix(head)
        .and_then(|rest| rest.strip_prefix('['))
        .and_then(|rest| rest.strip_suffix(']'))
        .map(str::trim)
}

impl TypeSpec {
    /// Parses a raw YAML type expression.
    pub fn parse(raw: &Value) -> Result<TypeSpec, UnknownTypeError> {
        match raw {
            Value::String(s) => Self::parse_shorthand(s),
            Value::Mapping(_) => Self::parse_structured(raw),
            Value::Tagged(tagged) => Self::parse(&tagged.value),
            other => Err(UnknownTypeError::new(format!(
                "Type must be a string or a mapping, got {}",
                describe(other)
            ))),
        }
    }

    /// Parses the shorthand token form, e.g. `dict[string, list[int]]`.
    pub fn parse_shorthand(token: &str) -> Result<TypeSpec, UnknownTypeError> {
        let token = token.trim();
        if let Some(kind) = PrimitiveKind::from_token(token) {
            return Ok(TypeSpec::Primitive(kind));
        }
        if let Some(inner) = bracketed(token, "list") {
            return Ok(TypeSpec::List(Box::new(Self::parse_shorthand(inner)?)));
        }
        if let Some(inner) = bracketed(token, "optional") {
            return Ok(TypeSpec::Optional(Box::new(Self::parse_shorthand(inner)?)));
        }
        if let Some(inner) = bracketed(token, "dict") {
            let (key, value) = split_top_level(inner).ok_or_else(|| {
                UnknownTypeError::new(format!("Unknown type shorthand: '{token}'"))
            })?;
            let key = match Self::parse_shorthand(key)? {
                TypeSpec::Primitive(kind) => dict_key(kind)?,
                _ => {
                    return Err(UnknownTypeError::new(format!(
                        "Dict key must be a primitive type, got '{key}'"
                    )))
                }
            };
            return Ok(TypeSpec::Dict {
                key,
                value: Box::new(Self::parse_shorthand(value)?),
            });
        }
        Err(UnknownTypeError::new(format!(
            "Unknown type shorthand: '{token}'"
        )))
    }

    fn parse_structured(raw: &Value) -> Result<TypeSpec, UnknownTypeError> {
        let Value::Mapping(map) = raw else {
            return Err(UnknownTypeError::new("Structured type must be a mapping"));
        };
        let tag = map
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| UnknownTypeError::new("Structured type needs a string 'type' key"))?;

        let allowed: &[&str] = match tag {
            "list" | "optional" => &["type", "of"],
            "dict" => &["type", "key", "value"],
            "enum" => &["type", "values", "default"],
            _ => &["type"],
        };
        for key in map.keys() {
            let key = key.as_str().unwrap_or("<non-string>");
            if !allowed.contains(&key) {
                return Err(UnknownTypeError::new(format!(
                    "Unexpected key '{key}' in '{tag}' type"
                )));
            }
        }

        let required = |name: &str| {
            map.get(name).ok_or_else(|| {
                UnknownTypeError::new(format!("'{tag}' type requires an '{name}' key"))
            })
        };

        match tag {
            "list" => Ok(TypeSpec::List(Box::new(Self::parse(required("of")?)?))),
            "optional" => Ok(TypeSpec::Optional(Box::new(Self::parse(required("of")?)?))),
            "dict" => {
                let key = match Self::parse(required("key")?)? {
                    TypeSpec::Primitive(kind) => dict_key(kind)?,
                    _ => {
                        return Err(UnknownTypeError::new(
                            "Dict key must be a primitive type",
                        ))
                    }
                };
                Ok(TypeSpec::Dict {
                    key,
                    value: Box::new(Self::parse(required("value")?)?),
                })
            }
            "enum" => {
                let values = required("values")?
                    .as_sequence()
                    .ok_or_else(|| UnknownTypeError::new("Enum 'values' must be a list"))?
                    .iter()
                    .map(|v| {
                        v.as_str().map(str::to_string).ok_or_else(|| {
                            UnknownTypeError::new("Enum values must be strings")
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                let default = match map.get("default") {
                    None | Some(Value::Null) => None,
                    Some(Value::String(s)) => Some(s.clone()),
                    Some(_) => return Err(UnknownTypeError::new("Enum default must be a string")),
                };
                Ok(TypeSpec::Enum(EnumType::new(values, default)?))
            }
            other => PrimitiveKind::from_token(other)
                .map(TypeSpec::Primitive)
                .ok_or_else(|| UnknownTypeError::new(format!("Unknown type '{other}'"))),
        }
    }

    /// Strips any `Optional` wrappers.
    pub fn innermost(&self) -> &TypeSpec {
        match self {
            TypeSpec::Optional(of) => of.innermost(),
            other => other,
        }
    }

    pub fn is_optional(&self) -> bool {
        matches!(self, TypeSpec::Optional(_))
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self.innermost() {
            TypeSpec::Enum(e) => Some(e),
            _ => None,
        }
    }

    /// Whether `value` is a valid default for this type.
    pub fn accepts_default(&self, value: &serde_json::Value) -> bool {
        use serde_json::Value as J;
        match (self, value) {
            (TypeSpec::Optional(_), J::Null) => true,
            (TypeSpec::Optional(of), v) => of.accepts_default(v),
            (TypeSpec::Primitive(PrimitiveKind::Int), J::Number(n)) => n.is_i64() || n.is_u64(),
            (TypeSpec::Primitive(PrimitiveKind::Float), J::Number(_)) => true,
            (TypeSpec::Primitive(PrimitiveKind::Bool), J::Bool(_)) => true,
            (
                TypeSpec::Primitive(
                    PrimitiveKind::String | PrimitiveKind::DateTime | PrimitiveKind::Uuid,
                ),
                J::String(_),
            ) => true,
            (TypeSpec::List(of), J::Array(items)) => items.iter().all(|i| of.accepts_default(i)),
            (TypeSpec::Dict { value: of, .. }, J::Object(entries)) => {
                entries.values().all(|v| of.accepts_default(v))
            }
            (TypeSpec::Enum(e), J::String(s)) => e.values.contains(s),
            _ => false,
        }
    }

    /// Lowers the type to a structural schema node.
    pub fn to_structural_schema(&self) -> SchemaNode {
        match self {
            TypeSpec::Primitive(kind) => match kind {
                PrimitiveKind::Int => SchemaNode::of_type(SchemaType::Integer),
                PrimitiveKind::Float => SchemaNode::of_type(SchemaType::Number),
                PrimitiveKind::Bool => SchemaNode::of_type(SchemaType::Boolean),
                PrimitiveKind::String => SchemaNode::of_type(SchemaType::String),
                PrimitiveKind::DateTime => {
                    SchemaNode::of_type(SchemaType::String).with_format("date-time")
                }
                PrimitiveKind::Uuid => SchemaNode::of_type(SchemaType::String).with_format("uuid"),
            },
            TypeSpec::List(of) => {
                let mut node = SchemaNode::of_type(SchemaType::Array);
                node.items = Some(Box::new(of.to_structural_schema()));
                node
            }
            TypeSpec::Dict { value, .. } => {
                let mut node = SchemaNode::of_type(SchemaType::Object);
                node.additional_properties = Some(AdditionalProperties::Schema(Box::new(
                    value.to_structural_schema(),
                )));
                node
            }
            TypeSpec::Optional(of) => {
                let mut node = of.to_structural_schema();
                node.nullable = true;
                node
            }
            TypeSpec::Enum(e) => {
                let mut node = SchemaNode::of_type(SchemaType::String);
                node.enum_values = Some(e.values.clone());
                node.default = e.default.clone().map(serde_json::Value::String);
                node
            }
        }
    }

    /// Renders the Rust type expression for this type. Enums render as
    /// `String`; use [`TypeSpec::to_target_type_named`] once the enum has a name.
    pub fn to_target_type(&self) -> String {
        self.render_target(None)
    }

    /// Like [`TypeSpec::to_target_type`], substituting `enum_name` for enums.
    pub fn to_target_type_named(&self, enum_name: &str) -> String {
        self.render_target(Some(enum_name))
    }

    fn render_target(&self, enum_name: Option<&str>) -> String {
        match self {
            TypeSpec::Primitive(kind) => primitive_target(*kind).to_string(),
            TypeSpec::List(of) => format!("Vec<{}>", of.render_target(enum_name)),
            TypeSpec::Dict { key, value } => format!(
                "std::collections::HashMap<{}, {}>",
                primitive_target(*key),
                value.render_target(enum_name)
            ),
            TypeSpec::Optional(of) => format!("Option<{}>", of.render_target(enum_name)),
            TypeSpec::Enum(_) => enum_name.unwrap_or("String").to_string(),
        }
    }
}

fn primitive_target(kind: PrimitiveKind) -> &'static str {
    match kind {
        PrimitiveKind::Int => "i64",
        PrimitiveKind::String => "String",
        PrimitiveKind::Bool => "bool",
        PrimitiveKind::Float => "f64",
        PrimitiveKind::DateTime => "chrono::DateTime<chrono::Utc>",
        PrimitiveKind::Uuid => "uuid::Uuid",
    }
}

impl fmt::Display for TypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeSpec::Primitive(kind) => f.write_str(kind.token()),
            TypeSpec::List(of) => write!(f, "list[{of}]"),
            TypeSpec::Dict { key, value } => write!(f, "dict[{}, {value}]", key.token()),
            TypeSpec::Optional(of) => write!(f, "optional[{of}]"),
            TypeSpec::Enum(e) => write!(f, "enum[{}]", e.values.join(", ")),
        }
    }
}

pub(crate) fn describe(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn yaml(s: &str) -> Value {
        serde_yaml::from_str(s).unwrap()
    }

    #[test]
    fn test_parse_primitives_shorthand() {
        for kind in PrimitiveKind::ALL {
            let parsed = TypeSpec::parse_shorthand(kind.token()).unwrap();
            assert_eq!(parsed, TypeSpec::Primitive(kind));
        }
    }

    #[test]
    fn test_parse_nested_shorthand() {
        let parsed = TypeSpec::parse_shorthand("dict[string, list[int]]").unwrap();
        assert_eq!(
            parsed,
            TypeSpec::Dict {
                key: PrimitiveKind::String,
                value: Box::new(TypeSpec::List(Box::new(TypeSpec::Primitive(
                    PrimitiveKind::Int
                )))),
            }
        );
        assert_eq!(parsed.to_string(), "dict[string, list[int]]");
    }

    #[test]
    fn test_unknown_shorthand() {
        let err = TypeSpec::parse_shorthand("integer").unwrap_err();
        assert!(err.message.contains("Unknown type shorthand: 'integer'"));
        assert!(TypeSpec::parse_shorthand("list[").is_err());
        assert!(TypeSpec::parse_shorthand("dict[int]").is_err());
    }

    #[test]
    fn test_dict_key_must_be_primitive() {
        let err = TypeSpec::parse_shorthand("dict[list[int], int]").unwrap_err();
        assert!(err.message.contains("Dict key must be a primitive"));

        let raw = yaml("{type: dict, key: {type: list, of: int}, value: int}");
        assert!(TypeSpec::parse(&raw).is_err());
    }

    #[test]
    fn test_dict_key_must_be_hashable() {
        let err = TypeSpec::parse_shorthand("dict[float, string]").unwrap_err();
        assert!(err.message.contains("Dict key cannot be 'float'"));

        let raw = yaml("{type: dict, key: float, value: int}");
        assert!(TypeSpec::parse(&raw).unwrap_err().message.contains("cannot be 'float'"));

        assert!(TypeSpec::parse_shorthand("dict[uuid, float]").is_ok());
    }

    #[test]
    fn test_parse_structured_forms() {
        let raw = yaml("{type: list, of: {type: uuid}}");
        assert_eq!(
            TypeSpec::parse(&raw).unwrap(),
            TypeSpec::List(Box::new(TypeSpec::Primitive(PrimitiveKind::Uuid)))
        );

        let raw = yaml("{type: optional, of: datetime}");
        assert_eq!(
            TypeSpec::parse(&raw).unwrap().to_target_type(),
            "Option<chrono::DateTime<chrono::Utc>>"
        );

        let raw = yaml("{type: int}");
        assert_eq!(
            TypeSpec::parse(&raw).unwrap(),
            TypeSpec::Primitive(PrimitiveKind::Int)
        );
    }

    #[test]
    fn test_structured_rejects_extra_keys() {
        let raw = yaml("{type: list, of: int, items: int}");
        let err = TypeSpec::parse(&raw).unwrap_err();
        assert!(err.message.contains("Unexpected key 'items'"));
    }

    #[test]
    fn test_enum_rules() {
        assert!(EnumType::new(vec!["only".into()], None).is_err());
        assert!(EnumType::new(vec!["a".into(), "a".into()], None).is_err());
        assert!(EnumType::new(vec!["a".into(), "_b".into()], None).is_err());
        assert!(EnumType::new(vec!["a".into(), "b c".into()], None).is_err());
        assert!(EnumType::new(vec!["a".into(), "b".into()], Some("c".into())).is_err());
        let clash = EnumType::new(vec!["Active".into(), "active".into()], None).unwrap_err();
        assert!(clash.message.contains("both become variant 'Active'"));
        assert!(EnumType::new(vec!["on_hold".into(), "onHold".into()], None).is_err());
        let e = EnumType::new(vec!["pending".into(), "active".into()], Some("pending".into()))
            .unwrap();
        assert_eq!(e.default(), Some("pending"));
    }

    #[test]
    fn test_enum_schema_and_target() {
        let raw = yaml("{type: enum, values: [pending, active], default: pending}");
        let spec = TypeSpec::parse(&raw).unwrap();
        let schema = serde_json::to_value(spec.to_structural_schema()).unwrap();
        assert_eq!(schema["type"], "string");
        assert_eq!(schema["enum"], serde_json::json!(["pending", "active"]));
        assert_eq!(schema["default"], "pending");
        assert_eq!(spec.to_target_type(), "String");
        assert_eq!(spec.to_target_type_named("UserStatus"), "UserStatus");
    }

    #[test]
    fn test_schema_lowering() {
        let spec = TypeSpec::parse_shorthand("dict[string, optional[float]]").unwrap();
        let schema = serde_json::to_value(spec.to_structural_schema()).unwrap();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["additionalProperties"]["type"], "number");
        assert_eq!(schema["additionalProperties"]["nullable"], true);

        let dt = serde_json::to_value(
            TypeSpec::Primitive(PrimitiveKind::DateTime).to_structural_schema(),
        )
        .unwrap();
        assert_eq!(dt["format"], "date-time");
    }

    #[test]
    fn test_renderers_are_stable() {
        let samples = [
            "int",
            "list[uuid]",
            "optional[list[string]]",
            "dict[int, dict[string, bool]]",
        ];
        for sample in samples {
            let spec = TypeSpec::parse_shorthand(sample).unwrap();
            assert_eq!(spec.to_target_type(), spec.to_target_type());
            assert_eq!(spec.to_structural_schema(), spec.to_structural_schema());
        }
        assert_eq!(
            TypeSpec::parse_shorthand("dict[int, list[bool]]")
                .unwrap()
                .to_target_type(),
            "std::collections::HashMap<i64, Vec<bool>>"
        );
    }

    #[test]
    fn test_accepts_default() {
        use serde_json::json;
        let int = TypeSpec::Primitive(PrimitiveKind::Int);
        assert!(int.accepts_default(&json!(3)));
        assert!(!int.accepts_default(&json!(3.5)));
        assert!(!int.accepts_default(&json!("3")));
        let list = TypeSpec::parse_shorthand("optional[list[string]]").unwrap();
        assert!(list.accepts_default(&json!(null)));
        assert!(list.accepts_default(&json!(["a", "b"])));
        assert!(!list.accepts_default(&json!([1])));
    }

    #[test]
    fn test_non_string_type_is_rejected() {
        let err = TypeSpec::parse(&yaml("42")).unwrap_err();
        assert!(err.message.contains("a number"));
    }
}
