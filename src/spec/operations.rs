//! Operations, transports and domains.
//!
//! An operation is a named action with an optional input model, an optional
//! output model and a list of parameters. It is reachable over a web transport
//! (`rest:`), a bus transport (`events:`), or both. When both are configured
//! the web request is handled first and its result is then published.

use http::{Method, StatusCode};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value as Json;
use serde_yaml::Value;
use std::collections::BTreeSet;
use std::fmt;

use super::doc::{join, yaml_to_json, DocDiagnostics};
use super::types::{describe, PrimitiveKind, TypeSpec};
use crate::validator::IssueKind;

#[allow(clippy::expect_used)]
static PATH_PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("path placeholder regex should be valid")
});

/// Names of `{placeholder}` segments in a web path, in order.
pub fn path_placeholders(path: &str) -> Vec<String> {
    PATH_PLACEHOLDER
        .captures_iter(path)
        .filter_map(|c| c.get(1).map(|m| m.as_str().to_string()))
        .collect()
}

/// Reference to a model, optionally wrapped as a collection (`list[User]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelRef {
    pub name: String,
    pub many: bool,
}

impl ModelRef {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        for prefix in ["list[", "List["] {
            if let Some(inner) = raw.strip_prefix(prefix).and_then(|r| r.strip_suffix(']')) {
                return ModelRef {
                    name: inner.trim().to_string(),
                    many: true,
                };
            }
        }
        ModelRef {
            name: raw.to_string(),
            many: false,
        }
    }
}

impl fmt::Display for ModelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.many {
            write!(f, "list[{}]", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamSource {
    Path,
    Query,
}

impl ParamSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParamSource::Path => "path",
            ParamSource::Query => "query",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub type_spec: TypeSpec,
    pub required: bool,
    pub source: ParamSource,
    pub default: Option<Json>,
}

impl ParamSpec {
    /// Whether a caller must supply the value. A default satisfies the param.
    pub fn must_be_supplied(&self) -> bool {
        self.required && self.default.is_none()
    }

    pub fn new(name: impl Into<String>, type_spec: TypeSpec, source: ParamSource) -> Self {
        ParamSpec {
            name: name.into(),
            type_spec,
            required: true,
            source,
            default: None,
        }
    }
}

/// Request/response binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebTransport {
    pub method: Method,
    pub path: String,
    pub status: Option<StatusCode>,
}

impl WebTransport {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        WebTransport {
            method,
            path: path.into(),
            status: None,
        }
    }

    /// Explicit status, else 201 for POST, 204 for DELETE, 200 otherwise.
    pub fn effective_status(&self) -> StatusCode {
        if let Some(status) = self.status {
            return status;
        }
        match self.method {
            Method::POST => StatusCode::CREATED,
            Method::DELETE => StatusCode::NO_CONTENT,
            _ => StatusCode::OK,
        }
    }
}

/// Publish/subscribe binding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BusTransport {
    pub subscribe_channel: Option<String>,
    pub publish_on_success_channel: Option<String>,
    pub publish_on_error_channel: Option<String>,
    pub message_model_override: Option<String>,
}

impl BusTransport {
    pub fn subscribe(channel: impl Into<String>) -> Self {
        BusTransport {
            subscribe_channel: Some(channel.into()),
            ..Default::default()
        }
    }

    pub fn publish_on_success(channel: impl Into<String>) -> Self {
        BusTransport {
            publish_on_success_channel: Some(channel.into()),
            ..Default::default()
        }
    }

    pub fn is_subscriber(&self) -> bool {
        self.subscribe_channel.is_some()
    }
}

/// An operation's transports are missing or contradictory.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct TransportConfigError {
    /// Path relative to the operation, e.g. `events.subscribe`.
    pub path: String,
    pub message: String,
}

impl TransportConfigError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        TransportConfigError {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OperationSpec {
    pub name: String,
    pub input_model: Option<String>,
    pub output_model: Option<ModelRef>,
    pub params: Vec<ParamSpec>,
    pub web: Option<WebTransport>,
    pub bus: Option<BusTransport>,
}

impl OperationSpec {
    /// Builds an operation and checks its transport rules:
    /// at least one transport, a subscriber needs an input model and may only
    /// take params it can fill without a request, a bus binding must subscribe
    /// or publish on success, and every web path placeholder must be a
    /// required path parameter.
    pub fn new(
        name: impl Into<String>,
        input_model: Option<String>,
        output_model: Option<ModelRef>,
        params: Vec<ParamSpec>,
        web: Option<WebTransport>,
        bus: Option<BusTransport>,
    ) -> Result<Self, Vec<TransportConfigError>> {
        let name = name.into();
        let mut errors = Vec::new();

        if web.is_none() && bus.is_none() {
            errors.push(TransportConfigError::new(
                "",
                format!("Operation '{name}' must have at least one transport (rest or events)"),
            ));
        }

        if let Some(bus) = &bus {
            if bus.subscribe_channel.is_none() && bus.publish_on_success_channel.is_none() {
                errors.push(TransportConfigError::new(
                    "events",
                    "Events config must have 'subscribe' or 'publish_on_success' (or both)",
                ));
            }
            if bus.subscribe_channel.is_some() && input_model.is_none() {
                errors.push(TransportConfigError::new(
                    "events.subscribe",
                    format!(
                        "Operation '{name}' subscribes to a channel and must have 'input' model"
                    ),
                ));
            }
            if bus.subscribe_channel.is_some() {
                for param in params.iter().filter(|p| p.must_be_supplied()) {
                    errors.push(TransportConfigError::new(
                        "params",
                        format!(
                            "Param '{}' is required but '{name}' also runs from a subscription, which cannot supply it; make it optional or give it a default",
                            param.name
                        ),
                    ));
                }
            }
        }

        if let Some(web) = &web {
            let placeholders = path_placeholders(&web.path);
            for placeholder in &placeholders {
                match params.iter().find(|p| &p.name == placeholder) {
                    None => errors.push(TransportConfigError::new(
                        "rest.path",
                        format!("Path placeholder '{{{placeholder}}}' has no matching param"),
                    )),
                    Some(p) if p.source != ParamSource::Path => {
                        errors.push(TransportConfigError::new(
                            "params",
                            format!("Param '{placeholder}' appears in the path but is declared as {}", p.source.as_str()),
                        ))
                    }
                    Some(p) if !p.required => errors.push(TransportConfigError::new(
                        "params",
                        format!("Path param '{placeholder}' cannot be optional"),
                    )),
                    Some(_) => {}
                }
            }
            for param in params.iter().filter(|p| p.source == ParamSource::Path) {
                if !placeholders.contains(&param.name) {
                    errors.push(TransportConfigError::new(
                        "params",
                        format!(
                            "Path param '{}' does not appear in path '{}'",
                            param.name, web.path
                        ),
                    ));
                }
            }
        }

        if !errors.is_empty() {
            return Err(errors);
        }
        Ok(OperationSpec {
            name,
            input_model,
            output_model,
            params,
            web,
            bus,
        })
    }

    /// True iff the output is wrapped as `list[X]`.
    pub fn response_is_collection(&self) -> bool {
        self.output_model.as_ref().is_some_and(|m| m.many)
    }

    /// The output model with any list wrapper removed.
    pub fn base_output_model(&self) -> Option<&str> {
        self.output_model.as_ref().map(|m| m.name.as_str())
    }

    pub fn is_dual_transport(&self) -> bool {
        self.web.is_some() && self.bus.is_some()
    }

    pub fn is_subscriber(&self) -> bool {
        self.bus.as_ref().is_some_and(BusTransport::is_subscriber)
    }

    /// Model the bus payload deserializes into: the override, else the input.
    pub fn message_model(&self) -> Option<&str> {
        self.bus
            .as_ref()
            .and_then(|b| b.message_model_override.as_deref())
            .or(self.input_model.as_deref())
    }

    /// Every model name this operation mentions, with its field path.
    pub fn model_references(&self) -> Vec<(&'static str, &str)> {
        let mut refs = Vec::new();
        if let Some(input) = &self.input_model {
            refs.push(("input", input.as_str()));
        }
        if let Some(output) = &self.output_model {
            refs.push(("output", output.name.as_str()));
        }
        if let Some(message) = self
            .bus
            .as_ref()
            .and_then(|b| b.message_model_override.as_deref())
        {
            refs.push(("events.message_model", message));
        }
        refs
    }
}

/// Domain-level web settings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebDomainConfig {
    pub prefix: String,
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomainSpec {
    pub name: String,
    pub service: String,
    pub web: WebDomainConfig,
    pub operations: Vec<OperationSpec>,
}

impl DomainSpec {
    /// `service/domain`
    pub fn key(&self) -> String {
        format!("{}/{}", self.service, self.name)
    }

    pub fn operation(&self, name: &str) -> Option<&OperationSpec> {
        self.operations.iter().find(|op| op.name == name)
    }

    pub fn web_operations(&self) -> impl Iterator<Item = &OperationSpec> {
        self.operations.iter().filter(|op| op.web.is_some())
    }

    pub fn bus_operations(&self) -> impl Iterator<Item = &OperationSpec> {
        self.operations.iter().filter(|op| op.bus.is_some())
    }

    pub fn subscriber_operations(&self) -> impl Iterator<Item = &OperationSpec> {
        self.operations.iter().filter(|op| op.is_subscriber())
    }

    pub fn has_web_operations(&self) -> bool {
        self.web_operations().next().is_some()
    }
}

const OPERATION_KEYS: &[&str] = &["input", "output", "params", "rest", "events", "description"];
const PARAM_KEYS: &[&str] = &["name", "type", "required", "in", "default"];
const REST_KEYS: &[&str] = &["method", "path", "status"];
const EVENTS_KEYS: &[&str] = &[
    "subscribe",
    "publish_on_success",
    "publish_on_error",
    "message_model",
];

/// Parses one `services/<service>/spec/<domain>.yaml` document.
///
/// Returns the domain even when some operations failed, so references to the
/// surviving operations can still be checked. The names of failed operations
/// are returned alongside.
pub(crate) fn parse_domain(
    service: &str,
    stem: &str,
    root: &Value,
    diag: &mut DocDiagnostics<'_>,
) -> Option<(DomainSpec, BTreeSet<String>)> {
    let map = diag.mapping(root, "")?;
    diag.check_keys(map, &["domain", "config", "operations"], "");

    let name = diag.optional_str(map, "domain", "").unwrap_or_else(|| stem.to_string());
    if name != stem {
        diag.report(
            "domain",
            IssueKind::ParseError,
            format!("Domain name '{name}' does not match file name '{stem}.yaml'"),
        );
    }

    let mut web = WebDomainConfig::default();
    if let Some(config) = map.get("config").filter(|v| !v.is_null()) {
        if let Some(config) = diag.mapping(config, "config") {
            diag.check_keys(config, &["rest"], "config");
            if let Some(rest) = config.get("rest").filter(|v| !v.is_null()) {
                if let Some(rest) = diag.mapping(rest, "config.rest") {
                    diag.check_keys(rest, &["prefix", "tags"], "config.rest");
                    web.prefix = diag.optional_str(rest, "prefix", "config.rest").unwrap_or_default();
                    web.tags = diag.string_list(rest, "tags", "config.rest");
                }
            }
        }
    }

    let mut operations = Vec::new();
    let mut failed = BTreeSet::new();
    if let Some(raw_ops) = map.get("operations").filter(|v| !v.is_null()) {
        if let Some(raw_ops) = diag.mapping(raw_ops, "operations") {
            for (op_name, raw_op) in diag.entries(raw_ops, "operations") {
                let path = join("operations", op_name);
                match parse_operation(op_name, raw_op, &path, diag) {
                    Some(op) => operations.push(op),
                    None => {
                        failed.insert(op_name.to_string());
                    }
                }
            }
        }
    }

    Some((
        DomainSpec {
            name: stem.to_string(),
            service: service.to_string(),
            web,
            operations,
        },
        failed,
    ))
}

fn parse_operation(
    name: &str,
    raw: &Value,
    path: &str,
    diag: &mut DocDiagnostics<'_>,
) -> Option<OperationSpec> {
    let map = diag.mapping(raw, path)?;
    diag.check_keys(map, OPERATION_KEYS, path);
    let before = diag.issue_count();

    let input_model = diag.optional_str(map, "input", path);
    let output_model = diag
        .optional_str(map, "output", path)
        .map(|raw| ModelRef::parse(&raw));

    let web = map
        .get("rest")
        .filter(|v| !v.is_null())
        .and_then(|raw| parse_rest(raw, &join(path, "rest"), diag));
    let bus = map
        .get("events")
        .filter(|v| !v.is_null())
        .and_then(|raw| parse_events(raw, &join(path, "events"), diag));

    let params_path = join(path, "params");
    let placeholders = web
        .as_ref()
        .map(|w| path_placeholders(&w.path))
        .unwrap_or_default();
    let mut params = Vec::new();
    match map.get("params") {
        None | Some(Value::Null) => {}
        Some(Value::Sequence(items)) => {
            for (i, item) in items.iter().enumerate() {
                if let Some(param) =
                    parse_param(item, &join(&params_path, &i.to_string()), &placeholders, diag)
                {
                    params.push(param);
                }
            }
        }
        Some(other) => diag.report(
            &params_path,
            IssueKind::ParseError,
            format!("'params' must be a list, got {}", describe(other)),
        ),
    }

    if diag.issue_count() != before {
        return None;
    }
    match OperationSpec::new(name, input_model, output_model, params, web, bus) {
        Ok(op) => Some(op),
        Err(errors) => {
            for e in errors {
                diag.report(&join(path, &e.path), IssueKind::TransportConfigError, e.message);
            }
            None
        }
    }
}

fn parse_rest(raw: &Value, path: &str, diag: &mut DocDiagnostics<'_>) -> Option<WebTransport> {
    let map = diag.mapping(raw, path)?;
    diag.check_keys(map, REST_KEYS, path);
    let method = match diag.optional_str(map, "method", path) {
        Some(m) => match m.to_ascii_uppercase().as_str() {
            "GET" => Method::GET,
            "POST" => Method::POST,
            "PUT" => Method::PUT,
            "PATCH" => Method::PATCH,
            "DELETE" => Method::DELETE,
            other => {
                diag.report(
                    &join(path, "method"),
                    IssueKind::TransportConfigError,
                    format!("Unsupported method '{other}' (expected GET, POST, PUT, PATCH or DELETE)"),
                );
                return None;
            }
        },
        None => {
            diag.report(path, IssueKind::TransportConfigError, "REST config must have a 'method'");
            return None;
        }
    };
    let route = diag.optional_str(map, "path", path).unwrap_or_default();
    let status = match map.get("status") {
        None | Some(Value::Null) => None,
        Some(raw) => match raw.as_u64().and_then(|s| u16::try_from(s).ok()).map(StatusCode::from_u16) {
            Some(Ok(status)) => Some(status),
            _ => {
                diag.report(
                    &join(path, "status"),
                    IssueKind::TransportConfigError,
                    "'status' must be a valid HTTP status code",
                );
                return None;
            }
        },
    };
    Some(WebTransport {
        method,
        path: route,
        status,
    })
}

fn parse_events(raw: &Value, path: &str, diag: &mut DocDiagnostics<'_>) -> Option<BusTransport> {
    let map = diag.mapping(raw, path)?;
    diag.check_keys(map, EVENTS_KEYS, path);
    Some(BusTransport {
        subscribe_channel: diag.optional_str(map, "subscribe", path),
        publish_on_success_channel: diag.optional_str(map, "publish_on_success", path),
        publish_on_error_channel: diag.optional_str(map, "publish_on_error", path),
        message_model_override: diag.optional_str(map, "message_model", path),
    })
}

fn parse_param(
    raw: &Value,
    path: &str,
    placeholders: &[String],
    diag: &mut DocDiagnostics<'_>,
) -> Option<ParamSpec> {
    let inferred = |name: &str| {
        if placeholders.iter().any(|p| p == name) {
            ParamSource::Path
        } else {
            ParamSource::Query
        }
    };
    if let Value::String(name) = raw {
        return Some(ParamSpec::new(
            name.clone(),
            TypeSpec::Primitive(PrimitiveKind::String),
            inferred(name),
        ));
    }
    let map = diag.mapping(raw, path)?;
    diag.check_keys(map, PARAM_KEYS, path);
    let Some(name) = diag.optional_str(map, "name", path) else {
        diag.report(path, IssueKind::ParseError, "Param must have a 'name'");
        return None;
    };
    let type_spec = match map.get("type") {
        None | Some(Value::Null) => TypeSpec::Primitive(PrimitiveKind::String),
        Some(raw_type) => match TypeSpec::parse(raw_type) {
            Ok(t) => t,
            Err(e) => {
                diag.report(&join(path, "type"), IssueKind::TypeGrammarError, e.message);
                return None;
            }
        },
    };
    let source = match diag.optional_str(map, "in", path).as_deref() {
        None => inferred(&name),
        Some("path") => ParamSource::Path,
        Some("query") => ParamSource::Query,
        Some(other) => {
            diag.report(
                &join(path, "in"),
                IssueKind::ParseError,
                format!("Param location '{other}' must be 'path' or 'query'"),
            );
            return None;
        }
    };
    let explicit_required = match map.get("required") {
        None | Some(Value::Null) => None,
        Some(Value::Bool(b)) => Some(*b),
        Some(_) => {
            diag.report(&join(path, "required"), IssueKind::ParseError, "'required' must be a boolean");
            return None;
        }
    };
    let default = match map.get("default") {
        None | Some(Value::Null) => None,
        Some(v) => match yaml_to_json(v) {
            Some(j) if type_spec.accepts_default(&j) => Some(j),
            _ => {
                diag.report(
                    &join(path, "default"),
                    IssueKind::TypeGrammarError,
                    format!("Default does not match param type '{type_spec}'"),
                );
                return None;
            }
        },
    };
    // A default makes the param optional unless `required` says otherwise.
    let required = explicit_required.unwrap_or(default.is_none());
    Some(ParamSpec {
        name,
        type_spec,
        required,
        source,
        default,
    })
}
