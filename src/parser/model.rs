use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParsedRequest {
    pub method: String,
    pub url: String,
    /// Headers in the order they were written; repeated names are kept.
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Default for ParsedRequest {
    fn default() -> Self {
        Self {
            method: "GET".to_string(),
            url: String::new(),
            headers: Vec::new(),
            body: None,
        }
    }
}
