//! Error types and handling
//!
//! This module provides the error types used throughout the relay.
//! `RelayError` implements the `RelayErrorExt` trait which provides
//! user-friendly hints and indicates whether errors are recoverable.
//!
//! Collaborator failures have their own enums: `ProviderError` for model
//! calls and `TransportError` for chat platform sends and edits. Both convert
//! into `RelayError`.

use thiserror::Error;

/// Trait for relay error extensions
pub trait RelayErrorExt {
    /// Returns a user-friendly hint for the error
    ///
    /// The hint is a static string that never echoes secrets or raw
    /// provider output.
    fn user_hint(&self) -> &str;

    /// Returns whether the error is recoverable
    ///
    /// Recoverable errors are isolated to a single turn; the next inbound
    /// message is processed normally.
    fn is_recoverable(&self) -> bool;
}

/// Main relay error type
///
/// # Examples
///
/// ```
/// use sdk::errors::{RelayError, RelayErrorExt};
///
/// use sdk::errors::ProviderError;
///
/// let error: RelayError = ProviderError::RateLimited.into();
/// println!("Hint: {}", error.user_hint());
/// assert!(error.is_recoverable());
///
/// let fatal_error = RelayError::Config("no providers".to_string());
/// assert!(!fatal_error.is_recoverable());
/// ```
#[derive(Debug, Error)]
pub enum RelayError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    // Model provider errors
    #[error("Model provider error: {0}")]
    Provider(#[from] ProviderError),

    // Chat platform errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    // Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayErrorExt for RelayError {
    fn user_hint(&self) -> &str {
        match self {
            Self::Config(_) => "Check your config.toml file for errors",
            Self::Provider(_) => "Model provider unavailable. Check your API keys and network",
            Self::Transport(_) => "Chat platform rejected the request. Try again",
            Self::Io(_) => "File system operation failed",
        }
    }

    fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}

/// Errors raised by a model provider call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("Provider unavailable: {0}")]
    Unavailable(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Timeout")]
    Timeout,

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("{0}")]
    Other(String),
}

/// Errors raised by the chat transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// The platform refused to edit the message (deleted, too old, unchanged)
    #[error("Edit rejected: {0}")]
    EditRejected(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Timeout")]
    Timeout,
}
