use once_cell::sync::Lazy;
use tracing::{debug, warn};

use super::{
    ExportError, ExportFormat, ExportInput, ExportProvider, ExportResult, OpenApiProvider,
    PostmanProvider, SwaggerProvider,
};

static REGISTRY: Lazy<ExportRegistry> = Lazy::new(ExportRegistry::with_defaults);

pub struct ExportRegistry {
    providers: Vec<Box<dyn ExportProvider>>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self {
            providers: Vec::new(),
        }
    }

    /// Registry holding every built-in provider.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(PostmanProvider));
        registry.register(Box::new(OpenApiProvider));
        registry.register(Box::new(SwaggerProvider));
        registry
    }

    pub fn global() -> &'static ExportRegistry {
        &REGISTRY
    }

    /// Adds `provider`, replacing any provider already registered under the
    /// same id.
    pub fn register(&mut self, provider: Box<dyn ExportProvider>) {
        let id = provider.metadata().id;
        if let Some(slot) = self
            .providers
            .iter_mut()
            .find(|existing| existing.metadata().id == id)
        {
            debug!(format = id, "replacing export provider");
            *slot = provider;
        } else {
            self.providers.push(provider);
        }
    }

    pub fn provider(&self, id: &str) -> Option<&dyn ExportProvider> {
        self.providers
            .iter()
            .find(|provider| provider.metadata().id == id)
            .map(|provider| provider.as_ref())
    }

    pub fn has_format(&self, id: &str) -> bool {
        self.provider(id).is_some()
    }

    /// Metadata of every provider, sorted by display name.
    pub fn formats(&self) -> Vec<&'static ExportFormat> {
        let mut formats: Vec<&'static ExportFormat> = self
            .providers
            .iter()
            .map(|provider| provider.metadata())
            .collect();
        formats.sort_by(|a, b| a.name.cmp(b.name));
        formats
    }

    pub fn export(&self, id: &str, input: &ExportInput<'_>) -> Result<ExportResult, ExportError> {
        let Some(provider) = self.provider(id) else {
            warn!(format = id, "export provider not found");
            return Err(ExportError::UnknownFormat(id.to_string()));
        };
        debug!(format = id, requests = input.requests.len(), "exporting");
        provider.generate(input)
    }
}

impl Default for ExportRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}

/// Formats offered by the built-in registry.
pub fn formats() -> Vec<&'static ExportFormat> {
    ExportRegistry::global().formats()
}

pub fn export(id: &str, input: &ExportInput<'_>) -> Result<ExportResult, ExportError> {
    ExportRegistry::global().export(id, input)
}
