use serde_json::{json, Map, Value};
use tracing::warn;
use url::Url;

use crate::analysis::{token_key, TokenData, VariableAnalysis};
use crate::parser::ParsedRequest;

pub(crate) const DEFAULT_DESCRIPTION: &str = "Auto-generated from cURL commands";
pub(crate) const DEFAULT_API_TITLE: &str = "API Specification";
pub(crate) const DEFAULT_API_VERSION: &str = "1.0.0";
pub(crate) const SUCCESS_DESCRIPTION: &str = "Successful response";
pub(crate) const JSON_MIME: &str = "application/json";

const AUTH_HEADERS: &[&str] = &["authorization", "x-auth-token", "x-api-key", "api-key"];
const STANDARD_HEADERS: &[&str] = &["content-type", "accept", "user-agent"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SecurityKind {
    Bearer,
    ApiKey,
}

pub(crate) fn security_kind(token: &TokenData) -> SecurityKind {
    if token.header.to_lowercase().contains("authorization") && token.value.starts_with("Bearer ")
    {
        SecurityKind::Bearer
    } else {
        SecurityKind::ApiKey
    }
}

/// Parses the request URL for path-based documents; logs and returns `None`
/// when the request cannot contribute an operation.
pub(crate) fn operation_url(request: &ParsedRequest, format: &str) -> Option<Url> {
    match Url::parse(&request.url) {
        Ok(url) if url.host_str().is_some() => Some(url),
        Ok(_) => {
            warn!(url = %request.url, format, "url has no host; skipping operation");
            None
        }
        Err(err) => {
            warn!(url = %request.url, format, error = %err, "unparsable url; skipping operation");
            None
        }
    }
}

pub(crate) fn operation_path(url: &Url) -> String {
    match url.path() {
        "" => "/".to_string(),
        path => path.to_string(),
    }
}

pub(crate) fn query_parameters(url: &Url) -> Vec<(String, &'static str)> {
    url.query_pairs()
        .map(|(key, value)| (key.into_owned(), infer_value_type(&value)))
        .collect()
}

/// Headers worth documenting: auth headers belong to security schemes and a
/// few standard headers are implied by the document itself.
pub(crate) fn header_parameters<'a>(
    request: &'a ParsedRequest,
    analysis: &VariableAnalysis,
) -> Vec<&'a str> {
    request
        .headers
        .iter()
        .map(|(name, _)| name.as_str())
        .filter(|name| {
            let lower = name.to_lowercase();
            let is_auth = AUTH_HEADERS.contains(&lower.as_str())
                || analysis.tokens.contains_key(&token_key(name));
            !is_auth && !STANDARD_HEADERS.contains(&lower.as_str())
        })
        .collect()
}

/// Best-effort type of a textual value such as a query parameter.
pub(crate) fn infer_value_type(value: &str) -> &'static str {
    if value == "true" || value == "false" {
        "boolean"
    } else if value.parse::<f64>().is_ok_and(f64::is_finite) {
        "number"
    } else {
        "string"
    }
}

/// JSON schema for a request body. Non-JSON bodies become a string schema,
/// carrying the raw body as example when `with_examples` is set.
pub(crate) fn body_schema(body: &str, with_examples: bool) -> Value {
    match serde_json::from_str::<Value>(body) {
        Ok(value) => schema_for(&value, with_examples),
        Err(_) if with_examples => json!({ "type": "string", "example": body }),
        Err(_) => json!({ "type": "string" }),
    }
}

fn schema_for(value: &Value, with_examples: bool) -> Value {
    match value {
        Value::Array(items) => json!({
            "type": "array",
            "items": items
                .first()
                .map(|first| schema_for(first, with_examples))
                .unwrap_or_else(|| json!({ "type": "string" })),
        }),
        Value::Object(fields) => {
            let properties: Map<String, Value> = fields
                .iter()
                .map(|(key, field)| (key.clone(), schema_for(field, with_examples)))
                .collect();
            json!({ "type": "object", "properties": properties })
        }
        Value::Null => json!({ "type": "string" }),
        scalar => {
            let kind = match scalar {
                Value::Bool(_) => "boolean",
                Value::Number(_) => "number",
                _ => "string",
            };
            if with_examples {
                json!({ "type": kind, "example": scalar })
            } else {
                json!({ "type": kind })
            }
        }
    }
}
