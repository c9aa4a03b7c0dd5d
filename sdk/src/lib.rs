//! Relaybot SDK
//!
//! Shared library providing traits, types, and error definitions for the
//! relay engine and the transports and model backends plugged into it.

/// Collaborator traits (transport, model provider, authorizer)
pub mod collaborators;

/// Error types and handling
pub mod errors;

/// Identifier and message types
pub mod types;

// Re-export commonly used types
pub use collaborators::{Authorizer, ChatTransport, ModelProvider};
pub use errors::{ProviderError, RelayError, RelayErrorExt, TransportError};
pub use types::{ChatId, InboundMessage, Message, MessageId, ProviderId, Role, TextFormat};
