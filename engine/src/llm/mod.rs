//! Model Provider Registry
//!
//! Maps each bot command to its resolved settings and the `ModelProvider`
//! that serves it. The relay looks providers up by command name only; which
//! backend sits behind a command is decided when the registry is built.

use crate::config::{Config, ProviderConfig};
use sdk::errors::RelayError;
use sdk::ModelProvider;
use std::sync::Arc;

pub mod echo;

/// A provider's settings together with its backend
#[derive(Clone)]
pub struct RegisteredProvider {
    pub config: ProviderConfig,
    pub backend: Arc<dyn ModelProvider>,
}

impl std::fmt::Debug for RegisteredProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredProvider")
            .field("config", &self.config)
            .field("backend", &self.backend.name())
            .finish()
    }
}

/// Providers in configuration order
#[derive(Debug, Default, Clone)]
pub struct ProviderRegistry {
    providers: Vec<RegisteredProvider>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry for every configured provider
    ///
    /// `connect` turns each resolved configuration into a backend; its
    /// error aborts the build.
    pub fn from_config<F>(config: &Config, mut connect: F) -> Result<Self, RelayError>
    where
        F: FnMut(&ProviderConfig) -> Result<Arc<dyn ModelProvider>, RelayError>,
    {
        let mut registry = Self::new();
        for provider in config.providers() {
            let backend = connect(&provider)?;
            registry.register(provider, backend)?;
        }
        Ok(registry)
    }

    /// Add a provider
    ///
    /// # Errors
    ///
    /// Returns `RelayError::Config` if the command is already registered.
    pub fn register(
        &mut self,
        config: ProviderConfig,
        backend: Arc<dyn ModelProvider>,
    ) -> Result<(), RelayError> {
        if self.get(config.command_name.as_str()).is_some() {
            return Err(RelayError::Config(format!(
                "Provider '{}' registered twice",
                config.command_name
            )));
        }

        tracing::debug!(
            "Registered provider '{}' (cmd: {}) backed by {}",
            config.display_name,
            config.command_name,
            backend.name()
        );
        self.providers.push(RegisteredProvider { config, backend });
        Ok(())
    }

    /// Look up a provider by command name
    pub fn get(&self, command: &str) -> Option<&RegisteredProvider> {
        self.providers
            .iter()
            .find(|p| p.config.command_name.as_str() == command)
    }

    pub fn iter(&self) -> impl Iterator<Item = &RegisteredProvider> {
        self.providers.iter()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}
