//! Export providers.
//!
//! Each provider turns parsed requests plus their variable analysis into one
//! document (and optional auxiliary files). Providers are looked up by id
//! through [`ExportRegistry`].

mod openapi;
mod postman;
mod registry;
mod schema;
mod swagger;

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::analysis::VariableAnalysis;
use crate::parser::ParsedRequest;

pub use openapi::OpenApiProvider;
pub use postman::PostmanProvider;
pub use registry::{export, formats, ExportRegistry};
pub use swagger::SwaggerProvider;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Export provider not found: {0}")]
    UnknownFormat(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportFormat {
    pub id: &'static str,
    pub name: &'static str,
    pub version: &'static str,
    pub extension: &'static str,
    pub mime_type: &'static str,
    pub description: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuxiliaryFile {
    pub name: String,
    pub data: Value,
    pub mime_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportResult {
    pub document: Value,
    pub format: &'static ExportFormat,
    pub auxiliary_files: Vec<AuxiliaryFile>,
}

#[derive(Debug, Clone, Copy)]
pub struct ExportInput<'a> {
    pub requests: &'a [ParsedRequest],
    pub analysis: &'a VariableAnalysis,
    /// Request index to caller-chosen name.
    pub request_names: &'a HashMap<usize, String>,
    /// Detected environment name to caller-chosen name.
    pub environment_names: &'a HashMap<String, String>,
    pub title: Option<&'a str>,
}

pub trait ExportProvider: Send + Sync {
    fn metadata(&self) -> &'static ExportFormat;

    fn generate(&self, input: &ExportInput<'_>) -> Result<ExportResult, ExportError>;
}
