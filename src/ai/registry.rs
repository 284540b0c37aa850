//! Provider registry built once from configuration at startup.

use std::sync::Arc;

use anyhow::{Error, Result, anyhow, bail};
use serde::Serialize;

use super::provider::{ChatProvider, ProviderDescriptor, ProviderKind};
use crate::anthropic::AnthropicMessages;
use crate::core::{AppConfig, ProviderConfig};
use crate::openai::OpenAiCompatible;

/// The provider and model a session sends its transcript to.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Selection {
    pub provider: ProviderKind,
    pub model: String,
}

struct Entry {
    descriptor: ProviderDescriptor,
    provider: Arc<dyn ChatProvider>,
}

/// Configured providers in priority order. Read-only after
/// construction and cheap to clone.
#[derive(Clone)]
pub struct ProviderRegistry {
    entries: Arc<Vec<Entry>>,
}

impl ProviderRegistry {
    pub fn from_config(config: &AppConfig) -> Result<Self, Error> {
        let providers = config
            .providers
            .iter()
            .map(|p| (p.clone(), connect(p)))
            .collect();
        Self::new(providers)
    }

    /// Build a registry from already constructed providers. Fails if
    /// there are none since no exchange could ever succeed.
    pub fn new(providers: Vec<(ProviderConfig, Arc<dyn ChatProvider>)>) -> Result<Self, Error> {
        if providers.is_empty() {
            bail!("No providers configured");
        }

        let mut entries: Vec<Entry> = Vec::new();
        for (config, provider) in providers {
            if entries.iter().any(|e| e.descriptor.name == config.kind) {
                bail!("Provider {} configured more than once", config.kind);
            }
            if config.models.is_empty() {
                bail!("Provider {} has no models", config.kind);
            }
            tracing::info!(
                "Registered {} provider with models {}",
                config.kind.display_name(),
                config.models.join(", ")
            );
            entries.push(Entry {
                descriptor: ProviderDescriptor {
                    name: config.kind,
                    display_name: config.kind.display_name().to_string(),
                    models: config.models,
                    credential_key: config.kind.credential_key().to_string(),
                },
                provider,
            });
        }

        Ok(Self {
            entries: Arc::new(entries),
        })
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ChatProvider>> {
        self.entries
            .iter()
            .find(|e| e.descriptor.name == kind)
            .map(|e| Arc::clone(&e.provider))
    }

    pub fn descriptors(&self) -> Vec<ProviderDescriptor> {
        self.entries.iter().map(|e| e.descriptor.clone()).collect()
    }

    pub fn descriptor(&self, kind: ProviderKind) -> Option<&ProviderDescriptor> {
        self.entries
            .iter()
            .map(|e| &e.descriptor)
            .find(|d| d.name == kind)
    }

    /// First configured provider with its first model
    pub fn default_selection(&self) -> Selection {
        // `new` guarantees at least one entry with at least one model
        let descriptor = &self.entries[0].descriptor;
        Selection {
            provider: descriptor.name,
            model: descriptor.models[0].clone(),
        }
    }

    /// Validate a provider and optional model. Without a model the
    /// provider's first model is used.
    pub fn resolve(&self, kind: ProviderKind, model: Option<&str>) -> Result<Selection, Error> {
        let descriptor = self
            .descriptor(kind)
            .ok_or(anyhow!("Provider {} is not configured", kind))?;
        let model = match model.map(str::trim).filter(|m| !m.is_empty()) {
            Some(m) => descriptor
                .models
                .iter()
                .find(|available| available.as_str() == m)
                .ok_or(anyhow!("Model {} is not available for {}", m, kind))?,
            None => &descriptor.models[0],
        };

        Ok(Selection {
            provider: kind,
            model: model.clone(),
        })
    }
}

fn connect(config: &ProviderConfig) -> Arc<dyn ChatProvider> {
    match config.kind {
        ProviderKind::Groq | ProviderKind::OpenAi => Arc::new(OpenAiCompatible::new(
            &config.api_hostname,
            &config.api_key,
        )),
        ProviderKind::Anthropic => Arc::new(AnthropicMessages::new(
            &config.api_hostname,
            &config.api_key,
        )),
    }
}
