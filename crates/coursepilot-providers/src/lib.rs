//! LLM provider backends.
//!
//! One HTTP implementation covers every supported backend; the registry
//! holds per-provider endpoint and auth details.

pub mod openai_compatible;
pub mod registry;

use std::sync::Arc;

use coursepilot_core::config::CoursePilotConfig;
use coursepilot_core::error::{CoursePilotError, Result};
use coursepilot_core::traits::Provider;

pub use openai_compatible::OpenAiCompatibleProvider;

/// Build the provider named by `config.default_provider`.
pub fn create_provider(config: &CoursePilotConfig) -> Result<Arc<dyn Provider>> {
    create_named_provider(&config.default_provider, config)
}

/// Build a provider by name.
pub fn create_named_provider(
    name: &str,
    config: &CoursePilotConfig,
) -> Result<Arc<dyn Provider>> {
    let entry = registry::get(name).ok_or_else(|| {
        CoursePilotError::ProviderNotFound(format!(
            "{name} (known: {})",
            registry::names().join(", ")
        ))
    })?;
    Ok(Arc::new(OpenAiCompatibleProvider::from_registry(entry, config)))
}
