use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::openapi::global_security;
use super::schema::{
    body_schema, header_parameters, operation_path, operation_url, query_parameters,
    security_kind, SecurityKind, DEFAULT_API_TITLE, DEFAULT_API_VERSION, DEFAULT_DESCRIPTION,
    JSON_MIME, SUCCESS_DESCRIPTION,
};
use super::{ExportError, ExportFormat, ExportInput, ExportProvider, ExportResult};
use crate::analysis::VariableAnalysis;
use crate::naming::resolve_name;

static FORMAT: ExportFormat = ExportFormat {
    id: "swagger-2.0",
    name: "Swagger 2.0",
    version: "2.0",
    extension: "json",
    mime_type: "application/json",
    description: "Swagger/OpenAPI 2.0 specification",
};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SwaggerSpec {
    swagger: &'static str,
    info: Info,
    #[serde(skip_serializing_if = "Option::is_none")]
    host: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    base_path: Option<&'static str>,
    schemes: Vec<String>,
    paths: IndexMap<String, IndexMap<String, Operation>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    security_definitions: Option<IndexMap<String, SecurityDefinition>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    security: Option<Vec<IndexMap<String, Vec<String>>>>,
}

#[derive(Debug, Serialize)]
struct Info {
    title: String,
    description: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Operation {
    summary: String,
    operation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    consumes: Option<Vec<&'static str>>,
    produces: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    parameters: Vec<Parameter>,
    responses: IndexMap<&'static str, Response>,
}

#[derive(Debug, Serialize)]
struct Parameter {
    name: String,
    #[serde(rename = "in")]
    location: &'static str,
    required: bool,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    kind: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<Value>,
}

#[derive(Debug, Serialize)]
struct Response {
    description: &'static str,
}

#[derive(Debug, Serialize)]
struct SecurityDefinition {
    #[serde(rename = "type")]
    kind: &'static str,
    name: String,
    #[serde(rename = "in")]
    location: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<&'static str>,
}

/// Swagger 2.0 document with a single global host taken from the first
/// detected environment.
pub struct SwaggerProvider;

impl ExportProvider for SwaggerProvider {
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

            let mut parameters: Vec<Parameter> = query_parameters(&url)
                .into_iter()
                .map(|(name, kind)| simple_parameter(name, "query", kind))
                .collect();
            parameters.extend(
                header_parameters(request, analysis)
                    .into_iter()
                    .map(|name| simple_parameter(name.to_string(), "header", "string")),
            );
            if let Some(body) = request.body.as_deref() {
                parameters.push(Parameter {
                    name: "body".to_string(),
                    location: "body",
                    required: true,
                    kind: None,
                    schema: Some(body_schema(body, false)),
                });
            }

            let operation = Operation {
                summary: format!("{} {}", request.method, path),
                operation_id: resolve_name(request, index, input.request_names),
                consumes: request.body.as_ref().map(|_| vec![JSON_MIME]),
                produces: vec![JSON_MIME],
                parameters,
                responses: IndexMap::from([(
                    "200",
                    Response {
                        description: SUCCESS_DESCRIPTION,
                    },
                )]),
            };

            let operations = paths.entry(path).or_default();
            if operations
                .insert(request.method.to_lowercase(), operation)
                .is_some()
            {
                debug!(url = %request.url, "operation replaced by a later request");
            }
        }

        let first_environment = analysis.environments.values().next();
        let spec = SwaggerSpec {
            swagger: FORMAT.version,
            info: Info {
                title: input.title.unwrap_or(DEFAULT_API_TITLE).to_string(),
                description: DEFAULT_DESCRIPTION,
                version: DEFAULT_API_VERSION,
            },
            host: first_environment.map(|environment| environment.host.clone()),
            base_path: first_environment.map(|_| "/"),
            schemes: schemes(analysis),
            paths,
            security_definitions: security_definitions(analysis),
            security: global_security(analysis),
        };

        Ok(ExportResult {
            document: serde_json::to_value(&spec)?,
            format: &FORMAT,
            auxiliary_files: Vec::new(),
        })
    }
}

fn simple_parameter(name: String, location: &'static str, kind: &'static str) -> Parameter {
    Parameter {
        name,
        location,
        required: false,
        kind: Some(kind),
        schema: None,
    }
}

fn schemes(analysis: &VariableAnalysis) -> Vec<String> {
    let mut schemes: Vec<String> = Vec::new();
    for environment in analysis.environments.values() {
        if !schemes.contains(&environment.protocol) {
            schemes.push(environment.protocol.clone());
        }
    }
    schemes
}

fn security_definitions(
    analysis: &VariableAnalysis,
) -> Option<IndexMap<String, SecurityDefinition>> {
    if analysis.tokens.is_empty() {
        return None;
    }
    let definitions = analysis
        .tokens
        .iter()
        .map(|(key, token)| {
            let definition = match security_kind(token) {
                SecurityKind::Bearer => SecurityDefinition {
                    kind: "apiKey",
                    name: "Authorization".to_string(),
                    location: "header",
                    description: Some("Bearer token authentication"),
                },
                SecurityKind::ApiKey => SecurityDefinition {
                    kind: "apiKey",
                    name: token.header.clone(),
                    location: "header",
                    description: None,
                },
            };
            (key.clone(), definition)
        })
        .collect();
    Some(definitions)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::analysis::analyze;
    use crate::parser::parse_multiple;
    use anyhow::Result;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn generate(commands: &str) -> Result<Value> {
        let requests = parse_multiple(commands);
        let analysis = analyze(&requests);
        let input = ExportInput {
            requests: &requests,
            analysis: &analysis,
            request_names: &HashMap::new(),
            environment_names: &HashMap::new(),
            title: Some("Shop"),
        };
        Ok(SwaggerProvider.generate(&input)?.document)
    }

    #[test]
    fn uses_first_environment_as_host() -> Result<()> {
        let doc = generate(
            "curl http://localhost:8080/health\ncurl https://api.example.com/users",
        )?;

        assert_eq!(doc["swagger"], "2.0");
        assert_eq!(doc["info"]["title"], "Shop");
        assert_eq!(doc["host"], "localhost:8080");
        assert_eq!(doc["basePath"], "/");
        assert_eq!(doc["schemes"], json!(["http", "https"]));
        Ok(())
    }

    #[test]
    fn omits_host_without_environments() -> Result<()> {
        let doc = generate("curl {{base}}/users")?;
        assert_eq!(doc.get("host"), None);
        assert_eq!(doc.get("basePath"), None);
        assert_eq!(doc["paths"], json!({}));
        Ok(())
    }

    #[test]
    fn body_becomes_body_parameter() -> Result<()> {
        let doc = generate(
            "curl -X PUT 'https://e.com/items/9?dry=false' -H 'X-Trace: t' --data '[{\"id\":1}]'",
        )?;
        let operation = &doc["paths"]["/items/9"]["put"];

        assert_eq!(operation["operationId"], "put_items");
        assert_eq!(operation["consumes"], json!(["application/json"]));
        assert_eq!(operation["produces"], json!(["application/json"]));
        assert_eq!(
            operation["parameters"],
            json!([
                { "name": "dry", "in": "query", "required": false, "type": "boolean" },
                { "name": "X-Trace", "in": "header", "required": false, "type": "string" },
                {
                    "name": "body",
                    "in": "body",
                    "required": true,
                    "schema": {
                        "type": "array",
                        "items": { "type": "object", "properties": { "id": { "type": "number" } } }
                    }
                }
            ])
        );
        Ok(())
    }

    #[test]
    fn bearer_tokens_become_authorization_api_keys() -> Result<()> {
        let doc = generate("curl https://e.com/me -H 'Authorization: Bearer abc'")?;

        assert_eq!(
            doc["securityDefinitions"],
            json!({
                "authorization_token": {
                    "type": "apiKey",
                    "name": "Authorization",
                    "in": "header",
                    "description": "Bearer token authentication"
                }
            })
        );
        assert_eq!(doc["security"], json!([{ "authorization_token": [] }]));
        assert_eq!(doc["paths"]["/me"]["get"].get("consumes"), None);
        Ok(())
    }
}
