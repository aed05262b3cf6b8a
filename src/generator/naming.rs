//! Identifier and literal rendering shared by every generator.

use serde_json::Value as Json;

use crate::spec::{PrimitiveKind, TypeSpec};

/// `user_profile` -> `UserProfile`
pub fn to_camel_case(s: &str) -> String {
    s.split(['_', '-', '.'])
        .map(|w| {
            let mut chars = w.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                None => String::new(),
            }
        })
        .collect()
}

/// `UserProfile` -> `user_profile`
pub fn to_snake_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 4);
    for (i, ch) in s.chars().enumerate() {
        if ch.is_uppercase() {
            if i > 0 && !out.ends_with('_') {
                out.push('_');
            }
            out.extend(ch.to_lowercase());
        } else if ch == '-' || ch == '.' || ch == ' ' {
            if !out.is_empty() && !out.ends_with('_') {
                out.push('_');
            }
        } else {
            out.push(ch);
        }
    }
    out
}

/// `user.created` -> `USER_CREATED`
pub fn to_screaming_snake(s: &str) -> String {
    to_snake_case(s).to_uppercase()
}

const KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "false", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move",
    "mut", "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "true",
    "type", "unsafe", "use", "where", "while", "yield",
];

/// Escapes keywords as raw identifiers (`type` -> `r#type`).
pub fn sanitize_rust_identifier(name: &str) -> String {
    if KEYWORDS.contains(&name) {
        format!("r#{name}")
    } else {
        name.to_string()
    }
}

/// Name of the enum emitted for `field` of `model`.
pub fn enum_type_name(model: &str, field: &str) -> String {
    format!("{model}{}", to_camel_case(field))
}

/// Trait name of a domain contract, e.g. `UsersContract`.
pub fn contract_name(domain: &str) -> String {
    format!("{}Contract", to_camel_case(domain))
}

/// Struct name of a domain's handler, e.g. `UsersHandler`.
pub fn handler_name(domain: &str) -> String {
    format!("{}Handler", to_camel_case(domain))
}

/// Struct name of a provider client, e.g. `BackendClient`.
pub fn client_name(provider: &str) -> String {
    format!("{}Client", to_camel_case(provider))
}

/// Renders a JSON default value as a Rust expression of type `ty`.
///
/// `enum_name` names the enum type for [`TypeSpec::Enum`] values. Returns
/// `None` when the value does not fit the type.
pub fn rust_default_literal(ty: &TypeSpec, value: &Json, enum_name: Option<&str>) -> Option<String> {
    match (ty, value) {
        (TypeSpec::Optional(_), Json::Null) => Some("None".to_string()),
        (TypeSpec::Optional(of), v) => {
            rust_default_literal(of, v, enum_name).map(|inner| format!("Some({inner})"))
        }
        (TypeSpec::Primitive(kind), v) => primitive_literal(*kind, v),
        (TypeSpec::List(of), Json::Array(items)) => {
            let rendered = items
                .iter()
                .map(|i| rust_default_literal(of, i, enum_name))
                .collect::<Option<Vec<_>>>()?;
            Some(format!("vec![{}]", rendered.join(", ")))
        }
        (TypeSpec::Dict { key, value: of }, Json::Object(entries)) => {
            if entries.is_empty() {
                return Some("std::collections::HashMap::new()".to_string());
            }
            let rendered = entries
                .iter()
                .map(|(k, v)| {
                    let key = dict_key_literal(*key, k)?;
                    let value = rust_default_literal(of, v, enum_name)?;
                    Some(format!("({key}, {value})"))
                })
                .collect::<Option<Vec<_>>>()?;
            Some(format!(
                "std::collections::HashMap::from([{}])",
                rendered.join(", ")
            ))
        }
        (TypeSpec::Enum(e), Json::String(s)) if e.values().contains(s) => {
            Some(format!("{}::{}", enum_name.unwrap_or("String"), to_camel_case(s)))
        }
        _ => None,
    }
}

fn primitive_literal(kind: PrimitiveKind, value: &Json) -> Option<String> {
    match (kind, value) {
        (PrimitiveKind::Int, Json::Number(n)) if n.is_i64() || n.is_u64() => Some(n.to_string()),
        (PrimitiveKind::Float, Json::Number(n)) => {
            let text = n.to_string();
            if text.contains(['.', 'e', 'E']) {
                Some(text)
            } else {
                Some(format!("{text}.0"))
            }
        }
        (PrimitiveKind::Bool, Json::Bool(b)) => Some(b.to_string()),
        (PrimitiveKind::String, Json::String(s)) => Some(format!("{s:?}.to_string()")),
        (PrimitiveKind::DateTime | PrimitiveKind::Uuid, Json::String(s)) => {
            Some(format!("{s:?}.parse().expect(\"valid default literal\")"))
        }
        _ => None,
    }
}

fn dict_key_literal(kind: PrimitiveKind, key: &str) -> Option<String> {
    match kind {
        PrimitiveKind::String => Some(format!("{key:?}.to_string()")),
        PrimitiveKind::Int => key.parse::<i64>().ok().map(|k| k.to_string()),
        PrimitiveKind::Bool => key.parse::<bool>().ok().map(|k| k.to_string()),
        PrimitiveKind::Float | PrimitiveKind::DateTime | PrimitiveKind::Uuid => {
            primitive_literal(kind, &Json::String(key.to_string()))
        }
    }
}
