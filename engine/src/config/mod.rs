//! Configuration management
//!
//! This module handles loading, validation, and management of the relay
//! configuration. Configuration is stored in TOML format at
//! ~/.relaybot/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: log level
//! - **chat**: defaults shared by every provider (system prompt,
//!   temperature, memory settings)
//! - **providers**: one `[[providers]]` table per bot command; any `chat`
//!   key may be overridden per provider
//!
//! # Examples
//!
//! ```no_run
//! use relaybot_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load_or_create()?;
//!
//! for provider in config.providers() {
//!     println!("/{} -> {}", provider.command_name, provider.display_name);
//! }
//! # Ok(())
//! # }
//! ```

use crate::memory::MemoryPolicy;
use sdk::errors::RelayError;
use sdk::ProviderId;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Commands handled by the relay itself
pub const BUILTIN_COMMANDS: [&str; 2] = ["help", "id"];

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core settings
    #[serde(default)]
    pub core: CoreConfig,

    /// Defaults applied to every provider
    #[serde(default)]
    pub chat: ChatOptions,

    /// Configured providers, one per command
    #[serde(default)]
    pub providers: Vec<ProviderEntry>,
}

/// Core configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// The bot's own username; `/cmd@other_bot` commands are ignored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bot_username: Option<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            bot_username: None,
        }
    }
}

/// Chat defaults shared by every provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatOptions {
    /// System prompt sent ahead of every conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    /// Sampling temperature passed to the model
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Replay earlier exchanges to the model
    #[serde(default = "default_true")]
    pub memory_enabled: bool,

    /// Seconds before a stored exchange expires (0 = never)
    #[serde(default = "default_memory_expires")]
    pub memory_expires: u64,

    /// Maximum stored exchanges per conversation (0 = unbounded)
    #[serde(default = "default_memory_max_pairs")]
    pub memory_max_pairs: usize,

    /// Query prefix that erases the conversation's memory
    #[serde(default = "default_wipe_subcmd", skip_serializing_if = "Option::is_none")]
    pub memory_wipe_subcmd: Option<String>,
}

impl Default for ChatOptions {
    fn default() -> Self {
        Self {
            system_prompt: None,
            temperature: default_temperature(),
            memory_enabled: true,
            memory_expires: default_memory_expires(),
            memory_max_pairs: default_memory_max_pairs(),
            memory_wipe_subcmd: default_wipe_subcmd(),
        }
    }
}

/// One `[[providers]]` table as written in the file
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderEntry {
    /// Bot command, also the provider's memory key
    pub cmd: String,

    /// Display name used in replies (defaults to `cmd`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Backend label for the host's provider wiring (openai, gemini, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,

    /// Model name for the backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_enabled: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_expires: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_max_pairs: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memory_wipe_subcmd: Option<String>,
}

/// Resolved, read-only settings for one provider
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderConfig {
    pub command_name: ProviderId,
    pub display_name: String,
    pub backend: Option<String>,
    pub model: Option<String>,
    pub memory_enabled: bool,
    pub memory_ttl_seconds: u64,
    pub memory_max_pairs: usize,
    pub memory_wipe_token: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: f32,
}

impl ProviderConfig {
    /// Resolve an entry against the shared chat defaults
    pub fn resolve(entry: &ProviderEntry, chat: &ChatOptions) -> Self {
        let non_blank = |s: &String| !s.trim().is_empty();

        Self {
            command_name: ProviderId::new(entry.cmd.to_lowercase()),
            display_name: entry.name.clone().unwrap_or_else(|| entry.cmd.clone()),
            backend: entry.backend.clone(),
            model: entry.model.clone(),
            memory_enabled: entry.memory_enabled.unwrap_or(chat.memory_enabled),
            memory_ttl_seconds: entry.memory_expires.unwrap_or(chat.memory_expires),
            memory_max_pairs: entry.memory_max_pairs.unwrap_or(chat.memory_max_pairs),
            memory_wipe_token: entry
                .memory_wipe_subcmd
                .as_ref()
                .or(chat.memory_wipe_subcmd.as_ref())
                .filter(|s| non_blank(s))
                .cloned(),
            system_prompt: entry
                .system_prompt
                .as_ref()
                .or(chat.system_prompt.as_ref())
                .filter(|s| non_blank(s))
                .cloned(),
            temperature: entry.temperature.unwrap_or(chat.temperature),
        }
    }

    /// Memory bounds for this provider's conversations
    pub fn memory_policy(&self) -> MemoryPolicy {
        if !self.memory_enabled {
            return MemoryPolicy::disabled();
        }
        MemoryPolicy {
            enabled: true,
            ttl: Duration::from_secs(self.memory_ttl_seconds),
            max_pairs: self.memory_max_pairs,
        }
    }

    /// True when `query` asks for this provider's memory to be erased
    ///
    /// Case-insensitive prefix match on the trimmed query.
    pub fn is_wipe_request(&self, query: &str) -> bool {
        match &self.memory_wipe_token {
            Some(token) => query
                .trim()
                .to_lowercase()
                .starts_with(&token.to_lowercase()),
            None => false,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_temperature() -> f32 {
    0.7
}

fn default_memory_expires() -> u64 {
    3600
}

fn default_memory_max_pairs() -> usize {
    10
}

fn default_wipe_subcmd() -> Option<String> {
    Some("/reset".to_string())
}

impl Config {
    /// Load configuration from the default location (~/.relaybot/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, RelayError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_from_path(path: &Path) -> Result<Self, RelayError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| RelayError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration text
    pub fn from_toml_str(contents: &str) -> Result<Self, RelayError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| RelayError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    ///
    /// Creates the configuration directory if it doesn't exist.
    pub fn create_default(path: &Path) -> Result<Self, RelayError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                RelayError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default_config();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| RelayError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| RelayError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(config)
    }

    /// Get the default configuration file path (~/.relaybot/config.toml)
    pub fn default_config_path() -> Result<PathBuf, RelayError> {
        let home = dirs::home_dir()
            .ok_or_else(|| RelayError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".relaybot").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig::default(),
            chat: ChatOptions::default(),
            providers: vec![
                ProviderEntry {
                    cmd: "gpt".to_string(),
                    name: Some("GPT".to_string()),
                    backend: Some("openai".to_string()),
                    model: Some("gpt-4o-mini".to_string()),
                    ..Default::default()
                },
                ProviderEntry {
                    cmd: "gem".to_string(),
                    name: Some("Gemini".to_string()),
                    backend: Some("gemini".to_string()),
                    model: Some("gemini-1.5-flash".to_string()),
                    ..Default::default()
                },
            ],
        }
    }

    /// Resolved settings for every provider, in file order
    pub fn providers(&self) -> Vec<ProviderConfig> {
        self.providers
            .iter()
            .map(|entry| ProviderConfig::resolve(entry, &self.chat))
            .collect()
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The log level is unknown
    /// - No provider is configured
    /// - A command is malformed, duplicated, or shadows a built-in command
    /// - A temperature is outside 0.0..=2.0
    pub fn validate(&self) -> Result<(), RelayError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(RelayError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if self.providers.is_empty() {
            return Err(RelayError::Config(
                "At least one [[providers]] entry is required".to_string(),
            ));
        }

        validate_temperature(self.chat.temperature, "chat")?;

        let mut seen = HashSet::new();
        for entry in &self.providers {
            let cmd = entry.cmd.to_lowercase();

            let well_formed = !cmd.is_empty()
                && cmd.len() <= 32
                && cmd
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_');
            if !well_formed {
                return Err(RelayError::Config(format!(
                    "Invalid provider command '{}'. Use 1-32 letters, digits or underscores",
                    entry.cmd
                )));
            }

            if BUILTIN_COMMANDS.contains(&cmd.as_str()) {
                return Err(RelayError::Config(format!(
                    "Provider command '{}' is reserved",
                    entry.cmd
                )));
            }

            if !seen.insert(cmd) {
                return Err(RelayError::Config(format!(
                    "Duplicate provider command '{}'",
                    entry.cmd
                )));
            }

            if let Some(temperature) = entry.temperature {
                validate_temperature(temperature, &entry.cmd)?;
            }
        }

        Ok(())
    }
}

fn validate_temperature(value: f32, section: &str) -> Result<(), RelayError> {
    if !(0.0..=2.0).contains(&value) {
        return Err(RelayError::Config(format!(
            "temperature for '{}' must be between 0.0 and 2.0",
            section
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert!(config.chat.memory_enabled);
        assert_eq!(config.chat.memory_wipe_subcmd.as_deref(), Some("/reset"));
        assert_eq!(config.providers.len(), 2);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_provider_overrides_chat_defaults() {
        let chat = ChatOptions {
            system_prompt: Some("Be terse".to_string()),
            ..ChatOptions::default()
        };
        let entry = ProviderEntry {
            cmd: "Gem".to_string(),
            memory_enabled: Some(false),
            temperature: Some(0.2),
            ..Default::default()
        };

        let resolved = ProviderConfig::resolve(&entry, &chat);
        assert_eq!(resolved.command_name, ProviderId::new("gem"));
        assert_eq!(resolved.display_name, "Gem");
        assert!(!resolved.memory_enabled);
        assert_eq!(resolved.temperature, 0.2);
        assert_eq!(resolved.system_prompt.as_deref(), Some("Be terse"));
        assert_eq!(resolved.memory_max_pairs, 10);
        assert!(!resolved.memory_policy().enabled);
    }

    #[test]
    fn test_blank_overrides_disable() {
        let entry = ProviderEntry {
            cmd: "gpt".to_string(),
            memory_wipe_subcmd: Some(" ".to_string()),
            ..Default::default()
        };
        let resolved = ProviderConfig::resolve(&entry, &ChatOptions::default());
        assert_eq!(resolved.memory_wipe_token, None);
        assert!(!resolved.is_wipe_request("/reset"));
    }

    #[test]
    fn test_wipe_request_is_case_insensitive_prefix() {
        let entry = ProviderEntry {
            cmd: "gpt".to_string(),
            ..Default::default()
        };
        let resolved = ProviderConfig::resolve(&entry, &ChatOptions::default());
        assert!(resolved.is_wipe_request("/reset"));
        assert!(resolved.is_wipe_request("  /RESET please"));
        assert!(!resolved.is_wipe_request("please /reset"));
    }

    #[test]
    fn test_memory_policy_durations() {
        let entry = ProviderEntry {
            cmd: "gpt".to_string(),
            memory_expires: Some(0),
            memory_max_pairs: Some(3),
            ..Default::default()
        };
        let policy = ProviderConfig::resolve(&entry, &ChatOptions::default()).memory_policy();
        assert!(policy.enabled);
        assert!(policy.ttl.is_zero());
        assert_eq!(policy.max_pairs, 3);
    }

    #[test]
    fn test_validate_rejects_reserved_and_duplicate() {
        let mut config = Config::default_config();
        config.providers[0].cmd = "help".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.providers[1].cmd = "GPT".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default_config();
        config.core.log_level = "loud".to_string();
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.chat.temperature = 3.5;
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.providers.clear();
        assert!(config.validate().is_err());

        let mut config = Config::default_config();
        config.providers[0].cmd = "gpt-4".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = Config::default_config();
        let toml_string = toml::to_string(&config).unwrap();

        let deserialized = Config::from_toml_str(&toml_string).unwrap();
        assert_eq!(config.core.log_level, deserialized.core.log_level);
        assert_eq!(config.providers(), deserialized.providers());
    }
}
