use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use serde_json::Value;

/// JSON-schema primitive type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Number,
    Boolean,
}

/// `additionalProperties` is either a schema or a plain boolean.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AdditionalProperties {
    Schema(Box<SchemaNode>),
    Allowed(bool),
}

/// A structural schema in the JSON-schema vocabulary.
///
/// Properties keep declaration order so the emitted documents follow the
/// order of the source models.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaNode {
    #[serde(rename = "type")]
    pub schema_type: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<&'static str>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(
        skip_serializing_if = "Vec::is_empty",
        serialize_with = "ordered_properties"
    )]
    pub properties: Vec<(String, SchemaNode)>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    #[serde(
        rename = "additionalProperties",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_properties: Option<AdditionalProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<Value>,
    #[serde(rename = "exclusiveMinimum", skip_serializing_if = "Option::is_none")]
    pub exclusive_minimum: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<Value>,
    #[serde(rename = "exclusiveMaximum", skip_serializing_if = "Option::is_none")]
    pub exclusive_maximum: Option<Value>,
    #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "readOnly", skip_serializing_if = "std::ops::Not::not")]
    pub read_only: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub nullable: bool,
}

fn ordered_properties<S: Serializer>(
    properties: &[(String, SchemaNode)],
    serializer: S,
) -> Result<S::Ok, S::Error> {
    let mut map = serializer.serialize_map(Some(properties.len()))?;
    for (name, node) in properties {
        map.serialize_entry(name, node)?;
    }
    map.end()
}

impl SchemaNode {
    pub fn of_type(schema_type: SchemaType) -> Self {
        SchemaNode {
            schema_type,
            title: None,
            format: None,
            enum_values: None,
            items: None,
            properties: Vec::new(),
            required: None,
            additional_properties: None,
            minimum: None,
            exclusive_minimum: None,
            maximum: None,
            exclusive_maximum: None,
            min_length: None,
            max_length: None,
            default: None,
            read_only: false,
            nullable: false,
        }
    }

    pub fn with_format(mut self, format: &'static str) -> Self {
        self.format = Some(format);
        self
    }

    /// A closed object: `additionalProperties: false` and an explicit
    /// (possibly empty) `required` list.
    pub fn closed_object(
        title: impl Into<String>,
        properties: Vec<(String, SchemaNode)>,
        required: Vec<String>,
    ) -> Self {
        let mut node = SchemaNode::of_type(SchemaType::Object);
        node.title = Some(title.into());
        node.properties = properties;
        node.required = Some(required);
        node.additional_properties = Some(AdditionalProperties::Allowed(false));
        node
    }

    pub fn property(&self, name: &str) -> Option<&SchemaNode> {
        self.properties
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, node)| node)
    }

    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
