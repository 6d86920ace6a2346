use once_cell::sync::Lazy;
use regex::Regex;
use url::Url;

use super::model::VariableAnalysis;

static NON_KEY_CHARS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^a-z0-9]").expect("valid regex"));
static NON_HOST_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_-]").expect("valid regex"));

const AUTH_HEADER_MARKERS: &[&str] = &[
    "authorization",
    "x-auth-token",
    "x-api-key",
    "api-key",
    "token",
];
const AUTH_VALUE_PREFIXES: &[&str] = &["Bearer ", "Token "];

/// Key under which requests to the same server are grouped. Non-special
/// schemes have an opaque origin, so the key is spelled out from the parts.
pub fn origin_key(url: &Url) -> String {
    let origin = url.origin();
    if origin.is_tuple() {
        return origin.ascii_serialization();
    }
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}://{host}:{port}", url.scheme()),
        None => format!("{}://{host}", url.scheme()),
    }
}

pub fn placeholder(name: &str) -> String {
    format!("{{{{{name}}}}}")
}

/// Variable name for an origin: `https://api.example.com` becomes
/// `api_example_com_host`.
pub fn host_variable(origin: &str) -> String {
    match Url::parse(origin) {
        Ok(url) => match url.host_str() {
            Some(host) => format!("{}_host", NON_HOST_CHARS.replace_all(host, "_")),
            None => "host".to_string(),
        },
        Err(_) => "host".to_string(),
    }
}

pub fn token_key(header_name: &str) -> String {
    format!(
        "{}_token",
        NON_KEY_CHARS.replace_all(&header_name.to_lowercase(), "_")
    )
}

pub fn is_auth_header(name: &str, value: &str) -> bool {
    let lower = name.to_lowercase();
    AUTH_HEADER_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
        || AUTH_VALUE_PREFIXES
            .iter()
            .any(|prefix| value.starts_with(prefix))
}

/// Header value as it should be emitted: a `{{token}}` placeholder when the
/// header carries a token shared by several requests, otherwise the literal.
pub fn substitute_header(analysis: &VariableAnalysis, name: &str, value: &str) -> String {
    if !is_auth_header(name, value) {
        return value.to_string();
    }
    let key = token_key(name);
    match analysis.shared_token(&key) {
        Some(_) => placeholder(&key),
        None => value.to_string(),
    }
}

/// Host variable for `url` when its origin is shared by several requests.
pub fn shared_host_variable(analysis: &VariableAnalysis, url: &Url) -> Option<String> {
    let origin = origin_key(url);
    analysis
        .is_shared_host(&origin)
        .then(|| host_variable(&origin))
}
