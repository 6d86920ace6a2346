use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use super::{AuxiliaryFile, ExportError, ExportFormat, ExportInput, ExportProvider, ExportResult};
use crate::analysis::{
    host_variable, placeholder, shared_host_variable, substitute_header, VariableAnalysis,
};
use crate::naming::resolve_name;
use crate::parser::ParsedRequest;

const COLLECTION_SCHEMA: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";
const DEFAULT_COLLECTION_NAME: &str = "Converted from cURL";
const COLLECTION_DESCRIPTION: &str = "Auto-generated collection from cURL commands";

static FORMAT: ExportFormat = ExportFormat {
    id: "postman",
    name: "Postman Collection",
    version: "2.1.0",
    extension: "json",
    mime_type: "application/json",
    description: "Postman Collection v2.1.0 with environments",
};

static SCHEME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(https?)://").expect("valid regex"));
static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{[^}]+\}\}").expect("valid regex"));
static LOOSE_PATH: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\}\}|//[^/]+)(/[^?#]*)").expect("valid regex"));

#[derive(Debug, Serialize)]
struct PostmanCollection {
    info: PostmanInfo,
    item: Vec<PostmanItem>,
    variable: Vec<PostmanVariable>,
}

#[derive(Debug, Serialize)]
struct PostmanInfo {
    name: String,
    description: &'static str,
    schema: &'static str,
}

#[derive(Debug, Serialize)]
struct PostmanItem {
    name: String,
    request: PostmanRequest,
}

#[derive(Debug, Serialize)]
struct PostmanRequest {
    method: String,
    header: Vec<PostmanHeader>,
    url: PostmanUrl,
    #[serde(skip_serializing_if = "Option::is_none")]
    body: Option<PostmanBody>,
}

#[derive(Debug, Serialize)]
struct PostmanHeader {
    key: String,
    value: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct PostmanUrl {
    raw: String,
    protocol: String,
    host: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    port: Option<String>,
    path: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    query: Vec<PostmanQueryParam>,
}

#[derive(Debug, Serialize)]
struct PostmanQueryParam {
    key: String,
    value: String,
}

#[derive(Debug, Serialize)]
struct PostmanBody {
    mode: &'static str,
    raw: String,
    options: PostmanBodyOptions,
}

#[derive(Debug, Serialize)]
struct PostmanBodyOptions {
    raw: PostmanRawOptions,
}

#[derive(Debug, Serialize)]
struct PostmanRawOptions {
    language: &'static str,
}

#[derive(Debug, Serialize)]
struct PostmanVariable {
    key: String,
    value: String,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct PostmanEnvironment {
    name: String,
    values: Vec<PostmanEnvVariable>,
    #[serde(rename = "_postman_variable_scope")]
    scope: &'static str,
}

#[derive(Debug, Clone, Serialize)]
struct PostmanEnvVariable {
    key: String,
    value: String,
    #[serde(rename = "type")]
    kind: &'static str,
    enabled: bool,
}

/// Postman Collection v2.1 with one environment file per detected environment.
pub struct PostmanProvider;

impl ExportProvider for PostmanProvider {
    fn metadata(&self) -> &'static ExportFormat {
        &FORMAT
    }

    fn generate(&self, input: &ExportInput<'_>) -> Result<ExportResult, ExportError> {
        let collection = build_collection(input);
        let auxiliary_files = build_environments(input)
            .into_iter()
            .map(|environment| {
                Ok(AuxiliaryFile {
                    name: format!("{}.postman_environment.json", environment.name),
                    data: serde_json::to_value(&environment)?,
                    mime_type: FORMAT.mime_type.to_string(),
                })
            })
            .collect::<Result<Vec<_>, ExportError>>()?;

        Ok(ExportResult {
            document: serde_json::to_value(&collection)?,
            format: &FORMAT,
            auxiliary_files,
        })
    }
}

fn build_collection(input: &ExportInput<'_>) -> PostmanCollection {
    let variable = collection_variables(input.analysis);

    let item = input
        .requests
        .iter()
        .enumerate()
        .map(|(index, request)| PostmanItem {
            name: resolve_name(request, index, input.request_names),
            request: build_request(request, input.analysis),
        })
        .collect();

    PostmanCollection {
        info: PostmanInfo {
            name: input.title.unwrap_or(DEFAULT_COLLECTION_NAME).to_string(),
            description: COLLECTION_DESCRIPTION,
            schema: COLLECTION_SCHEMA,
        },
        item,
        variable,
    }
}

/// One variable per shared origin. Origins differing only by port derive the
/// same key; Postman resolves such a key to its first definition.
fn collection_variables(analysis: &VariableAnalysis) -> Vec<PostmanVariable> {
    let mut defined: HashMap<String, &str> = HashMap::new();
    analysis
        .hosts
        .iter()
        .filter(|(_, indices)| indices.len() > 1)
        .map(|(origin, _)| {
            let key = host_variable(origin);
            match defined.get(&key) {
                Some(first) => warn!(
                    variable = %key,
                    first = %first,
                    origin = %origin,
                    "host variable already defined for another origin"
                ),
                None => {
                    defined.insert(key.clone(), origin);
                }
            }
            PostmanVariable {
                key,
                value: origin.clone(),
                kind: "string",
            }
        })
        .collect()
}

fn build_request(request: &ParsedRequest, analysis: &VariableAnalysis) -> PostmanRequest {
    let header = request
        .headers
        .iter()
        .map(|(name, value)| PostmanHeader {
            key: name.clone(),
            value: substitute_header(analysis, name, value),
            kind: "text",
        })
        .collect();

    let body = request.body.as_ref().map(|raw| PostmanBody {
        mode: "raw",
        raw: raw.clone(),
        options: PostmanBodyOptions {
            raw: PostmanRawOptions { language: "json" },
        },
    });

    PostmanRequest {
        method: request.method.clone(),
        header,
        url: build_url(&request.url, analysis),
        body,
    }
}

fn build_url(raw: &str, analysis: &VariableAnalysis) -> PostmanUrl {
    let parsed = Url::parse(raw)
        .ok()
        .filter(|url| url.host_str().is_some());
    let Some(url) = parsed else {
        debug!(url = raw, "unparsable url; emitting it verbatim");
        return loose_url(raw);
    };

    let path = split_path(url.path());
    let query = query_params(url.query());

    match shared_host_variable(analysis, &url) {
        Some(variable) => {
            let mut substituted = format!("{}{}", placeholder(&variable), url.path());
            if let Some(query) = url.query() {
                substituted.push('?');
                substituted.push_str(query);
            }
            if let Some(fragment) = url.fragment() {
                substituted.push('#');
                substituted.push_str(fragment);
            }
            PostmanUrl {
                raw: substituted,
                protocol: url.scheme().to_string(),
                host: vec![placeholder(&variable)],
                port: None,
                path,
                query,
            }
        }
        None => PostmanUrl {
            raw: raw.to_string(),
            protocol: url.scheme().to_string(),
            host: url
                .host_str()
                .unwrap_or_default()
                .split('.')
                .map(str::to_string)
                .collect(),
            port: url.port().map(|port| port.to_string()),
            path,
            query,
        },
    }
}

fn loose_url(raw: &str) -> PostmanUrl {
    let protocol = SCHEME
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map_or("https", |found| found.as_str());
    let host = PLACEHOLDER
        .find(raw)
        .map(|found| vec![found.as_str().to_string()])
        .unwrap_or_default();
    let path = LOOSE_PATH
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|found| split_path(found.as_str()))
        .unwrap_or_default();

    PostmanUrl {
        raw: raw.to_string(),
        protocol: protocol.to_string(),
        host,
        port: None,
        path,
        query: Vec::new(),
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

fn query_params(query: Option<&str>) -> Vec<PostmanQueryParam> {
    query
        .unwrap_or_default()
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            PostmanQueryParam {
                key: key.to_string(),
                value: value.to_string(),
            }
        })
        .collect()
}

fn build_environments(input: &ExportInput<'_>) -> Vec<PostmanEnvironment> {
    let secrets: Vec<PostmanEnvVariable> = input
        .analysis
        .tokens
        .iter()
        .map(|(key, token)| PostmanEnvVariable {
            key: key.clone(),
            value: token.value.clone(),
            kind: "secret",
            enabled: true,
        })
        .collect();

    input
        .analysis
        .environments
        .iter()
        .map(|(name, environment)| {
            let final_name = input
                .environment_names
                .get(name)
                .map(|renamed| renamed.trim())
                .filter(|renamed| !renamed.is_empty())
                .unwrap_or(name.as_str());

            let values = environment
                .variables
                .iter()
                .map(|(key, value)| PostmanEnvVariable {
                    key: key.clone(),
                    value: value.clone(),
                    kind: "default",
                    enabled: true,
                })
                .chain(secrets.iter().cloned())
                .collect();

            PostmanEnvironment {
                name: final_name.to_string(),
                values,
                scope: "environment",
            }
        })
        .collect()
}
