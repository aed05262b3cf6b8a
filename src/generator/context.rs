//! Render-ready view of one operation.
//!
//! Every generator that needs an operation's signature goes through
//! [`OperationContextBuilder`], so the contract trait and the transport
//! bindings agree on names and types by construction.

use std::collections::BTreeSet;

use http::StatusCode;
use serde::Serialize;

use super::naming::{rust_default_literal, sanitize_rust_identifier};
use super::GenerateError;
use crate::spec::{path_placeholders, OperationSpec, ParamSource, ParamSpec};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParamContext {
    /// Name as written in the spec (wire name).
    pub name: String,
    /// Rust identifier.
    pub ident: String,
    /// Type in the contract signature.
    pub rust_type: String,
    /// Type of the field in a generated query struct.
    pub query_type: String,
    pub required: bool,
    /// `path` or `query`.
    pub source: &'static str,
    /// Rust expression filling in an absent optional param. Never set for
    /// `optional[...]` types, which pass `None` through.
    pub default_literal: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WebContext {
    /// Lowercase method, as used by axum routing functions.
    pub method: String,
    pub method_upper: String,
    /// Path relative to the domain prefix.
    pub path: String,
    pub status: u16,
    /// Rust expression of the status code.
    pub status_expr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BusContext {
    pub subscribe_channel: Option<String>,
    pub publish_on_success_channel: Option<String>,
    pub publish_on_error_channel: Option<String>,
    /// Type the bus payload deserializes into.
    pub message_model: Option<String>,
    /// True when the message type differs from the input model.
    pub converts_message: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperationContext {
    pub name: String,
    pub ident: String,
    pub params: Vec<ParamContext>,
    /// Path params in the order their placeholders appear in the path.
    pub path_params: Vec<ParamContext>,
    pub query_params: Vec<ParamContext>,
    pub input_model: Option<String>,
    /// Output model with any list wrapper removed.
    pub output_model: Option<String>,
    pub response_many: bool,
    /// Success type of the contract method.
    pub return_type: String,
    /// Model types referenced by the signature, sorted.
    pub imports: Vec<String>,
    /// `async fn name(&self, ...) -> Result<T, HandlerError>`, without a body.
    pub signature: String,
    pub web: Option<WebContext>,
    pub bus: Option<BusContext>,
}

impl OperationContext {
    /// Arguments of the contract call, in signature order.
    pub fn call_arguments(&self) -> Vec<String> {
        let mut args: Vec<String> = self.params.iter().map(|p| p.ident.clone()).collect();
        if self.input_model.is_some() {
            args.push("payload".to_string());
        }
        args
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct OperationContextBuilder;

impl OperationContextBuilder {
    pub fn new() -> Self {
        OperationContextBuilder
    }

    /// The shared routine every specialised builder restricts.
    pub fn build(
        &self,
        op: &OperationSpec,
        include_web: bool,
        include_bus: bool,
    ) -> OperationContext {
        let params: Vec<ParamContext> = op.params.iter().map(param_context).collect();

        let path_params = match (&op.web, include_web) {
            (Some(web), true) => path_placeholders(&web.path)
                .iter()
                .filter_map(|name| params.iter().find(|p| &p.name == name).cloned())
                .collect(),
            _ => params
                .iter()
                .filter(|p| p.source == ParamSource::Path.as_str())
                .cloned()
                .collect(),
        };
        let query_params = params
            .iter()
            .filter(|p| p.source == ParamSource::Query.as_str())
            .cloned()
            .collect();

        let output_model = op.base_output_model().map(str::to_string);
        let return_type = match &output_model {
            None => "()".to_string(),
            Some(model) if op.response_is_collection() => format!("Vec<{model}>"),
            Some(model) => model.clone(),
        };

        let mut imports: BTreeSet<String> = BTreeSet::new();
        imports.extend(op.input_model.clone());
        imports.extend(output_model.clone());

        let web = match (&op.web, include_web) {
            (Some(web), true) => {
                let status = web.effective_status();
                Some(WebContext {
                    method: web.method.as_str().to_lowercase(),
                    method_upper: web.method.as_str().to_uppercase(),
                    path: web.path.clone(),
                    status: status.as_u16(),
                    status_expr: status_expr(status),
                })
            }
            _ => None,
        };

        let bus = match (&op.bus, include_bus) {
            (Some(bus), true) => {
                let message_model = op.message_model().map(str::to_string);
                imports.extend(message_model.clone());
                Some(BusContext {
                    subscribe_channel: bus.subscribe_channel.clone(),
                    publish_on_success_channel: bus.publish_on_success_channel.clone(),
                    publish_on_error_channel: bus.publish_on_error_channel.clone(),
                    converts_message: message_model != op.input_model,
                    message_model,
                })
            }
            _ => None,
        };

        let ident = sanitize_rust_identifier(&op.name);
        let mut args: Vec<String> = params
            .iter()
            .map(|p| format!("{}: {}", p.ident, p.rust_type))
            .collect();
        if let Some(input) = &op.input_model {
            args.push(format!("payload: {input}"));
        }
        let signature = std::iter::once("&self".to_string())
            .chain(args)
            .collect::<Vec<_>>()
            .join(", ");
        let signature =
            format!("async fn {ident}({signature}) -> Result<{return_type}, HandlerError>");

        OperationContext {
            name: op.name.clone(),
            ident,
            params,
            path_params,
            query_params,
            input_model: op.input_model.clone(),
            output_model,
            response_many: op.response_is_collection(),
            return_type,
            imports: imports.into_iter().collect(),
            signature,
            web,
            bus,
        }
    }

    /// Transport-agnostic context for contract traits and handler stubs.
    pub fn for_contract(&self, op: &OperationSpec) -> OperationContext {
        self.build(op, false, false)
    }

    /// Context for web bindings, clients and OpenAPI output.
    pub fn for_web(&self, op: &OperationSpec) -> Result<OperationContext, GenerateError> {
        if op.web.is_none() {
            return Err(GenerateError::MissingTransport {
                operation: op.name.clone(),
                transport: "web",
            });
        }
        Ok(self.build(op, true, true))
    }

    /// Context for bus adapters.
    pub fn for_bus(&self, op: &OperationSpec) -> Result<OperationContext, GenerateError> {
        if op.bus.is_none() {
            return Err(GenerateError::MissingTransport {
                operation: op.name.clone(),
                transport: "bus",
            });
        }
        Ok(self.build(op, false, true))
    }
}

fn param_context(param: &ParamSpec) -> ParamContext {
    let inner = param.type_spec.to_target_type();
    let already_optional = param.type_spec.is_optional();
    let default_literal = if already_optional {
        None
    } else {
        param
            .default
            .as_ref()
            .and_then(|d| rust_default_literal(&param.type_spec, d, None))
    };
    let rust_type = if param.required || default_literal.is_some() || already_optional {
        inner.clone()
    } else {
        format!("Option<{inner}>")
    };
    let query_type = if already_optional || (param.required && default_literal.is_none()) {
        inner
    } else {
        format!("Option<{inner}>")
    };
    ParamContext {
        name: param.name.clone(),
        ident: sanitize_rust_identifier(&param.name),
        rust_type,
        query_type,
        required: param.must_be_supplied(),
        source: param.source.as_str(),
        default_literal,
    }
}

/// `StatusCode::CREATED` style constant for well-known codes.
fn status_expr(status: StatusCode) -> String {
    match status.canonical_reason() {
        Some(reason) => {
            let name: String = reason
                .chars()
                .filter(|c| *c != '\'')
                .map(|c| {
                    if c.is_ascii_alphanumeric() {
                        c.to_ascii_uppercase()
                    } else {
                        '_'
                    }
                })
                .collect();
            format!("StatusCode::{name}")
        }
        None => format!(
            "StatusCode::from_u16({}).expect(\"valid status code\")",
            status.as_u16()
        ),
    }
}
