//! `OpenAPI` 3.0 exporter.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::schema::{
    body_schema, header_parameters, operation_path, operation_url, query_parameters,
    security_kind, SecurityKind, DEFAULT_API_TITLE, DEFAULT_API_VERSION, DEFAULT_DESCRIPTION,
    JSON_MIME, SUCCESS_DESCRIPTION,
};
use super::{ExportError, ExportFormat, ExportInput, ExportProvider, ExportResult};
use crate::analysis::{EnvironmentData, VariableAnalysis};
use crate::naming::resolve_name;

static FORMAT: ExportFormat = ExportFormat {
    id: "openapi-3.0",
    name: "OpenAPI 3.0",
    version: "3.0.3",
    extension: "json",
    mime_type: "application/json",
    description: "OpenAPI 3.0.3 specification",
};

type SecurityRequirement = IndexMap<String, Vec<String>>;

#[derive(Debug, Serialize)]
struct OpenApiSpec {
    openapi: &'static str,
    info: Info,
    servers: Vec<Server>,
    paths: IndexMap<String, IndexMap<String, Operation>>,
    components: Components,
    #[serde(skip_serializing_if = "Option::is_none")]
    security: Option<Vec<SecurityRequirement>>,
}

#[derive(Debug, Serialize)]
struct Info {
    title: String,
    description: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct Server {
    url: &'static str,
    description: &'static str,
    variables: IndexMap<&'static str, ServerVariable>,
}

#[derive(Debug, Serialize)]
struct ServerVariable {
    default: String,
    description: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    summary: String,
    operation_id: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_body: Option<RequestBody>,
    responses: IndexMap<&'static str, Response>,
}

#[derive(Debug, Serialize)]
struct Parameter {
    name: String,
    #[serde(rename = "in")]
    location: &'static str,
    required: bool,
    schema: ParameterSchema,
}

#[derive(Debug, Serialize)]
struct ParameterSchema {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct RequestBody {
    content: IndexMap<&'static str, MediaType>,
}

#[derive(Debug, Serialize)]
struct MediaType {
    schema: Value,
}

#[derive(Debug, Serialize)]
struct Response {
    description: &'static str,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct Components {
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    security_schemes: IndexMap<String, SecurityScheme>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum SecurityScheme {
    #[serde(rename = "http")]
    Http {
        scheme: &'static str,
        #[serde(rename = "bearerFormat")]
        bearer_format: &'static str,
    },
    #[serde(rename = "apiKey")]
    ApiKey {
        #[serde(rename = "in")]
        location: &'static str,
        name: String,
    },
}

/// `OpenAPI` 3.0.3 document grouping requests by path.
pub struct OpenApiProvider;

impl ExportProvider for OpenApiProvider {
    fn metadata(&self) -> &'static ExportFormat {
        &FORMAT
    }

    fn generate(&self, input: &ExportInput<'_>) -> Result<ExportResult, ExportError> {
        let analysis = input.analysis;
        let mut paths: IndexMap<String, IndexMap<String, Operation>> = IndexMap::new();

        for (index, request) in input.requests.iter().enumerate() {
            let Some(url) = operation_url(request, FORMAT.id) else {
                continue;
            };
            let path = operation_path(&url);
            let method = request.method.to_lowercase();

            let mut parameters: Vec<Parameter> = query_parameters(&url)
                .into_iter()
                .map(|(name, kind)| Parameter {
                    name,
                    location: "query",
                    required: false,
                    schema: ParameterSchema { kind },
                })
                .collect();
            parameters.extend(header_parameters(request, analysis).into_iter().map(|name| {
                Parameter {
                    name: name.to_string(),
                    location: "header",
                    required: false,
                    schema: ParameterSchema { kind: "string" },
                }
            }));

            let request_body = request.body.as_deref().map(|body| RequestBody {
                content: IndexMap::from([(
                    JSON_MIME,
                    MediaType {
                        schema: body_schema(body, true),
                    },
                )]),
            });

            let operation = Operation {
                summary: format!("{} {}", request.method, path),
                operation_id: resolve_name(request, index, input.request_names),
                parameters,
                request_body,
                responses: IndexMap::from([(
                    "200",
                    Response {
                        description: SUCCESS_DESCRIPTION,
                    },
                )]),
            };

            let operations = paths.entry(path).or_default();
            if operations.insert(method, operation).is_some() {
                debug!(url = %request.url, "operation replaced by a later request");
            }
        }

        let spec = OpenApiSpec {
            openapi: FORMAT.version,
            info: Info {
                title: input.title.unwrap_or(DEFAULT_API_TITLE).to_string(),
                description: DEFAULT_DESCRIPTION,
                version: DEFAULT_API_VERSION,
            },
            servers: analysis.environments.values().map(server_for).collect(),
            paths,
            components: Components {
                security_schemes: security_schemes(analysis),
            },
            security: global_security(analysis),
        };

        Ok(ExportResult {
            document: serde_json::to_value(&spec)?,
            format: &FORMAT,
            auxiliary_files: Vec::new(),
        })
    }
}

fn server_for(environment: &EnvironmentData) -> Server {
    Server {
        url: "{protocol}://{host}",
        description: if environment.is_local {
            "Local environment"
        } else {
            "Remote environment"
        },
        variables: IndexMap::from([
            (
                "protocol",
                ServerVariable {
                    default: environment.protocol.clone(),
                    description: "Protocol (http or https)",
                },
            ),
            (
                "host",
                ServerVariable {
                    default: environment.host.clone(),
                    description: "Server host and port",
                },
            ),
        ]),
    }
}

fn security_schemes(analysis: &VariableAnalysis) -> IndexMap<String, SecurityScheme> {
    analysis
        .tokens
        .iter()
        .map(|(key, token)| {
            let scheme = match security_kind(token) {
                SecurityKind::Bearer => SecurityScheme::Http {
                    scheme: "bearer",
                    bearer_format: "JWT",
                },
                SecurityKind::ApiKey => SecurityScheme::ApiKey {
                    location: "header",
                    name: token.header.clone(),
                },
            };
            (key.clone(), scheme)
        })
        .collect()
}

pub(crate) fn global_security(analysis: &VariableAnalysis) -> Option<Vec<SecurityRequirement>> {
    if analysis.tokens.is_empty() {
        return None;
    }
    Some(
        analysis
            .tokens
            .keys()
            .map(|key| IndexMap::from([(key.clone(), Vec::new())]))
            .collect(),
    )
}
