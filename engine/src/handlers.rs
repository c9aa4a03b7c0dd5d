//! Command handlers for CLI operations
//!
//! This module implements the handlers for all CLI commands:
//! - check: Validate configuration and show the resolved providers
//! - init: Write the default configuration file
//! - console: Offline chat session on stdin/stdout

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

use crate::config::{Config, ProviderConfig};
use crate::console::{self, ConsoleTransport, MessageIds};
use crate::llm::echo::EchoProvider;
use crate::llm::ProviderRegistry;
use crate::relay::{self, Relay};
use sdk::{ChatId, ModelProvider, RelayError, RelayErrorExt};

/// Output format for command results
#[derive(Debug, Clone, Copy)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output for machine consumption
    Json,
}

/// Load the configuration from `path`, or from the default location
/// (creating it on first run)
pub fn load_config(path: Option<&Path>) -> Result<Config, RelayError> {
    match path {
        Some(path) => Config::load_from_path(path),
        None => Config::load_or_create(),
    }
}

/// Render an error for the terminal, followed by its hint
pub fn error_report(error: &RelayError) -> String {
    let severity = if error.is_recoverable() {
        "Error"
    } else {
        "Fatal"
    };
    format!("{}: {}\nHint: {}", severity, error, error.user_hint())
}

/// Show the resolved configuration
///
/// The configuration has already been validated when it was loaded, so this
/// reports what every provider command will do.
pub fn handle_check(config: &Config, format: OutputFormat) -> Result<()> {
    let providers = config.providers();
    let help = relay::help_text(&providers);

    match format {
        OutputFormat::Text => {
            println!("Relaybot Configuration");
            println!("======================");
            println!();
            println!("  {:<25} {}", "Log level:", config.core.log_level);
            println!(
                "  {:<25} {}",
                "Bot username:",
                config.core.bot_username.as_deref().unwrap_or("-")
            );
            println!("  {:<25} {}", "Providers:", providers.len());
            println!();

            for provider in &providers {
                println!("/{} ({})", provider.command_name, provider.display_name);
                for (label, value) in describe(provider) {
                    println!("  {:<25} {}", format!("{}:", label), value);
                }
                println!();
            }

            println!("Help reply:");
            for line in help.lines() {
                println!("  {}", line);
            }
            println!();
            println!("✓ Configuration is valid");
        }
        OutputFormat::Json => {
            let output = json!({
                "log_level": config.core.log_level,
                "bot_username": config.core.bot_username,
                "providers": providers,
                "help": help,
                "valid": true,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

fn describe(provider: &ProviderConfig) -> Vec<(&'static str, String)> {
    let or_dash = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());

    let mut rows = vec![
        ("Backend", or_dash(&provider.backend)),
        ("Model", or_dash(&provider.model)),
        ("Temperature", format!("{:.2}", provider.temperature)),
        (
            "System prompt",
            if provider.system_prompt.is_some() {
                "Set".to_string()
            } else {
                "None".to_string()
            },
        ),
    ];

    if provider.memory_enabled {
        let expiry = match provider.memory_ttl_seconds {
            0 => "Never".to_string(),
            secs => format!("{}s", secs),
        };
        let capacity = match provider.memory_max_pairs {
            0 => "Unbounded".to_string(),
            pairs => format!("{} exchanges", pairs),
        };
        rows.push(("Memory", "Enabled".to_string()));
        rows.push(("Memory expiry", expiry));
        rows.push(("Memory capacity", capacity));
        rows.push(("Wipe command", or_dash(&provider.memory_wipe_token)));
    } else {
        rows.push(("Memory", "Disabled".to_string()));
    }

    rows
}

/// Write the default configuration unless one already exists
pub fn handle_init(path: Option<&Path>, format: OutputFormat) -> Result<()> {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => Config::default_config_path()?,
    };

    let created = if path.exists() {
        tracing::info!("Configuration already present at {}", path.display());
        false
    } else {
        Config::create_default(&path)
            .with_context(|| format!("Failed to initialize {}", path.display()))?;
        tracing::info!("Wrote default configuration to {}", path.display());
        true
    };

    match format {
        OutputFormat::Text => {
            if created {
                println!("Created {}", path.display());
            } else {
                println!("{} already exists, left unchanged.", path.display());
            }
        }
        OutputFormat::Json => {
            let output = json!({
                "path": path.display().to_string(),
                "created": created,
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
    }

    Ok(())
}

/// Run an offline session in which every provider is served by the echo
/// backend
pub async fn handle_console(config: &Config, chat_id: i64) -> Result<()> {
    let registry = ProviderRegistry::from_config(config, |provider| {
        tracing::debug!(
            "Serving /{} with the echo backend instead of {}",
            provider.command_name,
            provider.backend.as_deref().unwrap_or("its configured backend")
        );
        Ok(Arc::new(EchoProvider::new()) as Arc<dyn ModelProvider>)
    })?;

    let ids = MessageIds::new();
    let transport = Arc::new(ConsoleTransport::new(ids.clone(), std::io::stdout()));
    let relay = Relay::new(registry, transport, relay::allow_all())
        .with_bot_username(config.core.bot_username.clone());

    console::run(&relay, ChatId(chat_id), &ids).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider(toml: &str) -> ProviderConfig {
        Config::from_toml_str(toml).unwrap().providers().remove(0)
    }

    #[test]
    fn test_describe_memory_rows() {
        let rows = describe(&provider(
            r#"
            [chat]
            memory_expires = 0
            memory_max_pairs = 4

            [[providers]]
            cmd = "gpt"
            "#,
        ));

        let get = |label: &str| {
            rows.iter()
                .find(|(l, _)| *l == label)
                .map(|(_, v)| v.clone())
        };
        assert_eq!(get("Memory"), Some("Enabled".to_string()));
        assert_eq!(get("Memory expiry"), Some("Never".to_string()));
        assert_eq!(get("Memory capacity"), Some("4 exchanges".to_string()));
        assert_eq!(get("Wipe command"), Some("/reset".to_string()));
        assert_eq!(get("Backend"), Some("-".to_string()));
    }

    #[test]
    fn test_describe_disabled_memory() {
        let rows = describe(&provider(
            r#"
            [[providers]]
            cmd = "gem"
            memory_enabled = false
            "#,
        ));
        assert!(rows.iter().any(|(l, v)| *l == "Memory" && v == "Disabled"));
        assert!(!rows.iter().any(|(l, _)| *l == "Wipe command"));
    }

    #[test]
    fn test_init_creates_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        handle_init(Some(&path), OutputFormat::Text).unwrap();
        assert!(path.exists());

        std::fs::write(&path, "[[providers]]\ncmd = \"mine\"\n").unwrap();
        handle_init(Some(&path), OutputFormat::Json).unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("mine"));
    }

    #[test]
    fn test_load_config_failure_has_hint() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[[providers]]\ncmd = \"help\"\n").unwrap();

        let error = load_config(Some(&path)).unwrap_err();
        let report = error_report(&error);
        let mut lines = report.lines();
        assert!(lines.next().unwrap().starts_with("Fatal: Configuration error:"));
        assert_eq!(
            lines.next(),
            Some("Hint: Check your config.toml file for errors")
        );
    }

    #[test]
    fn test_load_config_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[core]\nbot_username = \"relay_bot\"\n[[providers]]\ncmd = \"gpt\"\n").unwrap();

        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.core.bot_username.as_deref(), Some("relay_bot"));
    }

    #[test]
    fn test_recoverable_error_report() {
        let error: RelayError = sdk::ProviderError::Timeout.into();
        assert!(error_report(&error).starts_with("Error: Model provider error: Timeout\nHint: "));
    }

    #[test]
    fn test_check_accepts_default_config() {
        let config = Config::default_config();
        handle_check(&config, OutputFormat::Text).unwrap();
        handle_check(&config, OutputFormat::Json).unwrap();
    }
}
