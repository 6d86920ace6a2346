//! End-to-end conversion: split, parse, analyze, name and export.

use std::collections::HashMap;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::debug;

use crate::analysis::{analyze, AnalysisSummary, VariableAnalysis};
use crate::export::{self, ExportError, ExportInput, ExportResult};
use crate::naming::name_requests;
use crate::parser::{parse_command, split_commands, ParsedRequest};

pub const DEFAULT_FORMAT: &str = "postman";

#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Please enter at least one cURL command")]
    EmptyInput,
    #[error("No valid cURL commands detected")]
    NoCommands,
    #[error(transparent)]
    Export(#[from] ExportError),
}

#[derive(Debug, Clone)]
pub struct ConversionOptions {
    pub input: String,
    pub format: String,
    pub request_names: HashMap<usize, String>,
    pub environment_names: HashMap<String, String>,
    pub title: Option<String>,
}

impl ConversionOptions {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            format: DEFAULT_FORMAT.to_string(),
            request_names: HashMap::new(),
            environment_names: HashMap::new(),
            title: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }
}

#[derive(Debug, Clone)]
pub struct Conversion {
    pub requests: Vec<ParsedRequest>,
    pub analysis: VariableAnalysis,
    pub names: Vec<String>,
    pub duplicates: IndexMap<String, Vec<usize>>,
    pub result: ExportResult,
    pub summary: AnalysisSummary,
}

pub fn convert(options: &ConversionOptions) -> Result<Conversion, ConversionError> {
    if options.input.trim().is_empty() {
        return Err(ConversionError::EmptyInput);
    }
    if !validate_input(&options.input) {
        return Err(ConversionError::NoCommands);
    }

    let requests: Vec<ParsedRequest> = split_commands(&options.input)
        .into_iter()
        .map(parse_command)
        .collect();
    if requests.is_empty() {
        return Err(ConversionError::NoCommands);
    }

    let analysis = analyze(&requests);
    let naming = name_requests(&requests, &options.request_names);
    for (name, indices) in &naming.duplicates {
        debug!(name = %name, ?indices, "duplicate request name");
    }

    let input = ExportInput {
        requests: &requests,
        analysis: &analysis,
        request_names: &options.request_names,
        environment_names: &options.environment_names,
        title: options.title.as_deref(),
    };
    let result = export::export(&options.format, &input)?;
    let summary = analysis.summary(requests.len());

    Ok(Conversion {
        requests,
        analysis,
        names: naming.names,
        duplicates: naming.duplicates,
        result,
        summary,
    })
}

/// Number of `curl` invocations found in `text`.
pub fn count_commands(text: &str) -> usize {
    split_commands(text).len()
}

pub fn validate_input(text: &str) -> bool {
    !text.trim().is_empty() && text.contains("curl")
}
