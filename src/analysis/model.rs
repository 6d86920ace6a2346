use indexmap::IndexMap;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TokenData {
    /// Header name as first written.
    pub header: String,
    /// Header value captured at first occurrence.
    pub value: String,
    pub requests: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvironmentData {
    pub name: String,
    pub is_local: bool,
    pub protocol: String,
    /// Host plus explicit port, e.g. `localhost:3000`.
    pub host: String,
    pub origin: String,
    pub variables: IndexMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariableAnalysis {
    pub hosts: IndexMap<String, Vec<usize>>,
    pub tokens: IndexMap<String, TokenData>,
    pub environments: IndexMap<String, EnvironmentData>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisSummary {
    pub total_requests: usize,
    pub total_hosts: usize,
    pub total_tokens: usize,
    pub total_environments: usize,
}

impl VariableAnalysis {
    /// True when `origin` is referenced by more than one request.
    pub fn is_shared_host(&self, origin: &str) -> bool {
        self.hosts
            .get(origin)
            .is_some_and(|indices| indices.len() > 1)
    }

    /// The token stored under `key`, only if more than one request uses it.
    pub fn shared_token(&self, key: &str) -> Option<&TokenData> {
        self.tokens.get(key).filter(|token| token.requests.len() > 1)
    }

    pub fn summary(&self, total_requests: usize) -> AnalysisSummary {
        AnalysisSummary {
            total_requests,
            total_hosts: self.hosts.len(),
            total_tokens: self.tokens.len(),
            total_environments: self.environments.len(),
        }
    }
}
