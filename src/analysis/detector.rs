use indexmap::IndexMap;
use tracing::debug;
use url::Url;

use super::model::{EnvironmentData, TokenData, VariableAnalysis};
use super::variables::{host_variable, is_auth_header, origin_key, token_key};
use crate::parser::ParsedRequest;

const LOCAL_ENVIRONMENT: &str = "local";

/// Finds shared hosts, reusable auth tokens and environments across a batch.
///
/// Pure: the same requests always give the same maps in the same order. A
/// request whose URL does not parse still contributes its tokens.
pub fn analyze(requests: &[ParsedRequest]) -> VariableAnalysis {
    let mut hosts: IndexMap<String, Vec<usize>> = IndexMap::new();
    let mut tokens: IndexMap<String, TokenData> = IndexMap::new();
    let mut environments: IndexMap<String, EnvironmentData> = IndexMap::new();

    for (index, request) in requests.iter().enumerate() {
        match Url::parse(&request.url) {
            Ok(url) if url.host_str().is_some() => {
                let origin = origin_key(&url);
                hosts.entry(origin.clone()).or_default().push(index);

                let environment = environment_for(&url, origin);
                environments
                    .entry(environment.name.clone())
                    .or_insert(environment);
            }
            Ok(_) => debug!(url = %request.url, "url has no host; skipping host detection"),
            Err(err) => debug!(url = %request.url, error = %err, "unparsable url; skipping host detection"),
        }

        for (name, value) in &request.headers {
            if !is_auth_header(name, value) {
                continue;
            }
            let token = tokens.entry(token_key(name)).or_insert_with(|| TokenData {
                header: name.clone(),
                value: value.clone(),
                requests: Vec::new(),
            });
            if token.requests.last() != Some(&index) {
                token.requests.push(index);
            }
        }
    }

    VariableAnalysis {
        hosts,
        tokens,
        environments,
    }
}

fn environment_for(url: &Url, origin: String) -> EnvironmentData {
    let hostname = url.host_str().unwrap_or_default();
    let is_local = is_local_host(hostname);
    let name = if is_local {
        LOCAL_ENVIRONMENT.to_string()
    } else {
        hostname.replace('.', "_")
    };
    let protocol = url.scheme().to_string();
    let host = match url.port() {
        Some(port) => format!("{hostname}:{port}"),
        None => hostname.to_string(),
    };

    let mut variables = IndexMap::new();
    variables.insert(format!("{name}_protocol"), protocol.clone());
    variables.insert(host_variable(&origin), origin.clone());

    EnvironmentData {
        name,
        is_local,
        protocol,
        host,
        origin,
        variables,
    }
}

fn is_local_host(hostname: &str) -> bool {
    hostname == "localhost" || hostname == "127.0.0.1" || hostname.ends_with(".local")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn request(url: &str, headers: &[(&str, &str)]) -> ParsedRequest {
        ParsedRequest {
            url: url.to_string(),
            headers: headers
                .iter()
                .map(|(name, value)| (name.to_string(), value.to_string()))
                .collect(),
            ..ParsedRequest::default()
        }
    }

    #[test]
    fn groups_requests_by_origin() {
        let analysis = analyze(&[
            request("https://api.example.com/users", &[]),
            request("https://api.example.com/orders?page=2", &[]),
            request("http://localhost:3000/health", &[]),
        ]);

        assert_eq!(
            analysis.hosts.keys().collect::<Vec<_>>(),
            vec!["https://api.example.com", "http://localhost:3000"]
        );
        assert_eq!(analysis.hosts["https://api.example.com"], vec![0, 1]);
        assert_eq!(analysis.hosts["http://localhost:3000"], vec![2]);
        assert!(analysis.is_shared_host("https://api.example.com"));
        assert!(!analysis.is_shared_host("http://localhost:3000"));
    }

    #[test]
    fn non_special_schemes_keep_distinct_hosts() {
        let analysis = analyze(&[
            request("foo://a.com/x", &[]),
            request("bar://b.com/y", &[]),
            request("sftp://files.example.com:2222/in", &[]),
        ]);

        assert_eq!(
            analysis.hosts.keys().collect::<Vec<_>>(),
            vec!["foo://a.com", "bar://b.com", "sftp://files.example.com:2222"]
        );
        assert!(!analysis.is_shared_host("foo://a.com"));
        assert!(!analysis.hosts.contains_key("null"));
        assert_eq!(analysis.environments["files_example_com"].host, "files.example.com:2222");
    }

    #[test]
    fn derives_environments_from_hostnames() {
        let analysis = analyze(&[
            request("https://api.example.com/users", &[]),
            request("http://localhost:3000/health", &[]),
            request("http://127.0.0.1:8080/health", &[]),
            request("http://printer.local/status", &[]),
        ]);

        let names: Vec<_> = analysis.environments.keys().cloned().collect();
        assert_eq!(names, vec!["api_example_com", "local"]);

        let local = &analysis.environments["local"];
        assert!(local.is_local);
        assert_eq!(local.protocol, "http");
        assert_eq!(local.host, "localhost:3000");
        assert_eq!(local.origin, "http://localhost:3000");

        let remote = &analysis.environments["api_example_com"];
        assert!(!remote.is_local);
        assert_eq!(remote.host, "api.example.com");
        assert_eq!(
            remote.variables.iter().collect::<Vec<_>>(),
            vec![
                (&"api_example_com_protocol".to_string(), &"https".to_string()),
                (
                    &"api_example_com_host".to_string(),
                    &"https://api.example.com".to_string()
                ),
            ]
        );
    }

    #[test]
    fn collects_tokens_under_derived_keys() {
        let analysis = analyze(&[
            request("https://api.example.com/a", &[("Authorization", "Bearer abc123")]),
            request("https://api.example.com/b", &[("Accept", "*/*")]),
            request("https://api.example.com/c", &[("authorization", "Bearer other")]),
        ]);

        assert_eq!(analysis.tokens.len(), 1);
        let token = &analysis.tokens["authorization_token"];
        assert_eq!(token.header, "Authorization");
        assert_eq!(token.value, "Bearer abc123");
        assert_eq!(token.requests, vec![0, 2]);
    }

    #[test]
    fn tokens_survive_unparsable_urls() {
        let analysis = analyze(&[
            request("not a url", &[("X-Api-Key", "k1")]),
            request("{{base}}/users", &[("X-Api-Key", "k1")]),
        ]);

        assert!(analysis.hosts.is_empty());
        assert!(analysis.environments.is_empty());
        assert_eq!(analysis.tokens["x_api_key_token"].requests, vec![0, 1]);
    }

    #[test]
    fn repeated_header_in_one_request_counts_once() {
        let analysis = analyze(&[request(
            "https://api.example.com/a",
            &[("Authorization", "Bearer a"), ("Authorization", "Bearer b")],
        )]);
        assert_eq!(analysis.tokens["authorization_token"].requests, vec![0]);
    }

    #[test]
    fn analysis_is_deterministic() {
        let requests = vec![
            request("https://b.example.com/x", &[("Token", "t")]),
            request("https://a.example.com/y", &[("Authorization", "Bearer z")]),
            request("https://b.example.com/z", &[("Token", "t")]),
        ];
        assert_eq!(analyze(&requests), analyze(&requests));
        assert_eq!(
            analyze(&requests).tokens.keys().collect::<Vec<_>>(),
            vec!["token_token", "authorization_token"]
        );
    }
}
