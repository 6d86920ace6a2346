//! Request naming.
//!
//! Names are derived from the last meaningful path segment and prefixed with
//! the lower-cased method, e.g. `GET https://api.example.com/users/42` becomes
//! `get_users`.

use std::collections::HashMap;

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use url::Url;

use crate::parser::ParsedRequest;

static AFTER_PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\}\}\s*(/[^?#]*)").expect("valid regex"));
static AFTER_HOST: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"//[^/]+(/[^?#]*)").expect("valid regex"));
static FILE_EXTENSION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\.(json|xml|html)$").expect("valid regex"));
static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9_-]+").expect("valid regex"));
static REPEATED_UNDERSCORES: Lazy<Regex> = Lazy::new(|| Regex::new(r"_+").expect("valid regex"));
static ID_LIKE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^[0-9a-f-]+$").expect("valid regex"));

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NamingReport {
    /// Final name per request, caller overrides applied.
    pub names: Vec<String>,
    /// Names shared by two or more requests, in first-seen order.
    pub duplicates: IndexMap<String, Vec<usize>>,
}

pub fn generate_name(request: &ParsedRequest, index: usize) -> String {
    let method = request.method.to_lowercase();
    let fallback = || format!("{method}_request_{}", index + 1);

    let Some(path) = extract_path(&request.url) else {
        return fallback();
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some(last) = segments.last() else {
        return format!("{method}_root");
    };

    let mut endpoint = sanitize(&FILE_EXTENSION.replace(last, ""));
    if ID_LIKE.is_match(&endpoint) && segments.len() >= 2 {
        endpoint = sanitize(segments[segments.len() - 2]);
    }

    if endpoint.is_empty() {
        fallback()
    } else {
        format!("{method}_{endpoint}")
    }
}

/// `overrides` wins over the generated name unless it is blank.
pub fn resolve_name(
    request: &ParsedRequest,
    index: usize,
    overrides: &HashMap<usize, String>,
) -> String {
    overrides
        .get(&index)
        .map(|name| name.trim())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| generate_name(request, index))
}

pub fn name_requests(
    requests: &[ParsedRequest],
    overrides: &HashMap<usize, String>,
) -> NamingReport {
    let names: Vec<String> = requests
        .iter()
        .enumerate()
        .map(|(index, request)| resolve_name(request, index, overrides))
        .collect();
    let duplicates = find_duplicates(&names);
    NamingReport { names, duplicates }
}

pub fn find_duplicates(names: &[String]) -> IndexMap<String, Vec<usize>> {
    let mut groups: IndexMap<String, Vec<usize>> = IndexMap::new();
    for (index, name) in names.iter().enumerate() {
        groups.entry(name.clone()).or_default().push(index);
    }
    groups.retain(|_, indices| indices.len() > 1);
    groups
}

fn extract_path(url: &str) -> Option<String> {
    if let Ok(parsed) = Url::parse(url) {
        return Some(parsed.path().to_string());
    }

    let recovered = AFTER_PLACEHOLDER
        .captures(url)
        .or_else(|| AFTER_HOST.captures(url))
        .and_then(|caps| caps.get(1))
        .map(|found| found.as_str().to_string());

    match recovered {
        Some(path) => Some(path),
        None if url.starts_with("http") => Some(String::new()),
        None => None,
    }
}

fn sanitize(candidate: &str) -> String {
    let replaced = UNSAFE_CHARS.replace_all(candidate, "_");
    REPEATED_UNDERSCORES
        .replace_all(&replaced, "_")
        .trim_matches('_')
        .to_string()
}
