//! Relaybot Engine Library
//!
//! This library provides the core functionality of the relaybot engine:
//! per-conversation memory, edit reconciliation and the turn orchestrator.
//! It is used by both the main binary and integration tests.

/// Configuration management module
pub mod config;

/// Conversation memory module
pub mod memory;

/// Prompt assembly from memory
pub mod context;

/// User message to bot reply bindings
pub mod replies;

/// Bot command parsing
pub mod command;

/// Model provider registry
pub mod llm;

/// Turn orchestration module
pub mod relay;

/// Offline stdin/stdout chat session
pub mod console;

/// Telemetry and Observability
pub mod telemetry;

/// CLI interface module
pub mod cli;

/// Command handlers module
pub mod handlers;
