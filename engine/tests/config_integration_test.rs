//! Integration tests for configuration management
//!
//! These tests verify that configuration files are loaded, validated and
//! resolved into per-provider settings, and that a default file can be
//! written and read back.

use relaybot_engine::config::Config;
use sdk::RelayError;
use std::time::Duration;

fn load(contents: &str) -> Result<Config, RelayError> {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, contents).unwrap();
    Config::load_from_path(&path)
}

fn config_error(contents: &str) -> String {
    match load(contents) {
        Err(RelayError::Config(message)) => message,
        other => panic!("Expected a config error, got {:?}", other),
    }
}

#[test]
fn test_full_config_resolves_overrides() {
    let config = load(
        r#"
[core]
log_level = "debug"

[chat]
system_prompt = "You are a helpful assistant."
temperature = 0.5
memory_enabled = true
memory_expires = 600
memory_max_pairs = 5
memory_wipe_subcmd = "/forget"

[[providers]]
cmd = "GPT"
name = "ChatGPT"
backend = "openai"
model = "gpt-4o-mini"

[[providers]]
cmd = "gem"
name = "Gemini"
backend = "gemini"
temperature = 1.2
memory_max_pairs = 2
system_prompt = ""
"#,
    )
    .unwrap();

    assert_eq!(config.core.log_level, "debug");

    let providers = config.providers();
    assert_eq!(providers.len(), 2);

    let gpt = &providers[0];
    assert_eq!(gpt.command_name.as_str(), "gpt");
    assert_eq!(gpt.display_name, "ChatGPT");
    assert_eq!(gpt.model.as_deref(), Some("gpt-4o-mini"));
    assert_eq!(gpt.temperature, 0.5);
    assert_eq!(gpt.memory_max_pairs, 5);
    assert_eq!(
        gpt.system_prompt.as_deref(),
        Some("You are a helpful assistant.")
    );
    assert_eq!(gpt.memory_wipe_token.as_deref(), Some("/forget"));

    let policy = gpt.memory_policy();
    assert!(policy.enabled);
    assert_eq!(policy.ttl, Duration::from_secs(600));
    assert_eq!(policy.max_pairs, 5);

    let gem = &providers[1];
    assert_eq!(gem.temperature, 1.2);
    assert_eq!(gem.memory_max_pairs, 2);
    assert_eq!(gem.memory_ttl_seconds, 600);
    // A blank override switches the shared prompt off
    assert_eq!(gem.system_prompt, None);
}

#[test]
fn test_minimal_config_uses_defaults() {
    let config = load("[[providers]]\ncmd = \"gpt\"\n").unwrap();
    let gpt = config.providers().remove(0);

    assert_eq!(config.core.log_level, "info");
    assert_eq!(gpt.display_name, "gpt");
    assert_eq!(gpt.temperature, 0.7);
    assert!(gpt.memory_enabled);
    assert_eq!(gpt.memory_ttl_seconds, 3600);
    assert_eq!(gpt.memory_max_pairs, 10);
    assert_eq!(gpt.memory_wipe_token.as_deref(), Some("/reset"));
    assert_eq!(gpt.system_prompt, None);
}

#[test]
fn test_disabled_memory_policy() {
    let config = load(
        r#"
[[providers]]
cmd = "gpt"
memory_enabled = false
"#,
    )
    .unwrap();

    let policy = config.providers()[0].memory_policy();
    assert!(!policy.enabled);
}

#[test]
fn test_invalid_configs_are_rejected() {
    assert!(config_error("").contains("At least one"));
    assert!(config_error("[core]\nlog_level = \"loud\"\n[[providers]]\ncmd = \"a\"\n")
        .contains("Invalid log level"));
    assert!(config_error("[[providers]]\ncmd = \"help\"\n").contains("reserved"));
    assert!(config_error("[[providers]]\ncmd = \"ID\"\n").contains("reserved"));
    assert!(config_error("[[providers]]\ncmd = \"has space\"\n").contains("Invalid provider"));
    assert!(
        config_error("[[providers]]\ncmd = \"gpt\"\n[[providers]]\ncmd = \"GPT\"\n")
            .contains("Duplicate")
    );
    assert!(config_error("[chat]\ntemperature = 3.5\n[[providers]]\ncmd = \"gpt\"\n")
        .contains("emperature"));
    assert!(config_error("[[providers]]\ncmd = \"gpt\"\ntemperature = -1.0\n")
        .contains("emperature"));
}

#[test]
fn test_unparseable_file() {
    assert!(config_error("[[providers]\ncmd = ").contains("Failed to parse"));
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    let result = Config::load_from_path(&dir.path().join("absent.toml"));
    assert!(matches!(result, Err(RelayError::Config(_))));
}

#[test]
fn test_create_default_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relaybot").join("config.toml");

    let created = Config::create_default(&path).unwrap();
    assert!(path.exists());

    let loaded = Config::load_from_path(&path).unwrap();
    assert_eq!(loaded.providers(), created.providers());

    let commands: Vec<String> = loaded
        .providers()
        .iter()
        .map(|p| p.command_name.to_string())
        .collect();
    assert_eq!(commands, vec!["gpt", "gem"]);
}
