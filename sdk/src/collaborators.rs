//! Collaborator traits
//!
//! The relay core never talks to a network directly. It is handed
//! implementations of these traits by the host process:
//!
//! - [`ChatTransport`] sends and edits messages on the chat platform
//! - [`ModelProvider`] runs one chat completion against a model backend
//! - [`Authorizer`] decides whether a chat may use the bot at all

use crate::errors::{ProviderError, TransportError};
use crate::types::{ChatId, Message, MessageId, TextFormat};
use async_trait::async_trait;

/// Outbound side of the chat platform
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send a new message, optionally as a reply to `reply_to`
    ///
    /// Returns the id the platform assigned to the new message.
    async fn send(
        &self,
        chat_id: ChatId,
        reply_to: Option<MessageId>,
        text: &str,
        format: TextFormat,
    ) -> Result<MessageId, TransportError>;

    /// Replace the text of a message the bot sent earlier
    ///
    /// Returns the id of the edited message. Platforms normally return
    /// `message_id` unchanged, but callers must use whatever comes back.
    async fn edit(
        &self,
        chat_id: ChatId,
        message_id: MessageId,
        text: &str,
        format: TextFormat,
    ) -> Result<MessageId, TransportError>;
}

/// A chat completion backend
///
/// Each backend (OpenAI-compatible, Gemini, ...) is one implementation. The
/// relay only ever sees `dyn ModelProvider` and never branches on which
/// backend it got.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Short backend name used in logs
    fn name(&self) -> &str;

    /// Generate a reply for the ordered message list
    ///
    /// `messages` starts with an optional system entry and ends with the
    /// new user query.
    async fn call(&self, messages: &[Message], temperature: f32) -> Result<String, ProviderError>;
}

/// Allow-list decision for inbound chats
pub trait Authorizer: Send + Sync {
    fn authorize(&self, chat_id: ChatId) -> bool;
}

impl<F> Authorizer for F
where
    F: Fn(ChatId) -> bool + Send + Sync,
{
    fn authorize(&self, chat_id: ChatId) -> bool {
        self(chat_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    #[async_trait]
    impl ModelProvider for Upper {
        fn name(&self) -> &str {
            "upper"
        }

        async fn call(
            &self,
            messages: &[Message],
            _temperature: f32,
        ) -> Result<String, ProviderError> {
            messages
                .last()
                .map(|m| m.content.to_uppercase())
                .ok_or_else(|| ProviderError::InvalidRequest("no messages".to_string()))
        }
    }

    #[test]
    fn test_closure_authorizer() {
        let only_one = |chat: ChatId| chat == ChatId(1);
        assert!(only_one.authorize(ChatId(1)));
        assert!(!only_one.authorize(ChatId(2)));
    }

    #[tokio::test]
    async fn test_provider_trait_object() {
        let provider: Box<dyn ModelProvider> = Box::new(Upper);
        let reply = provider.call(&[Message::user("hi")], 0.7).await.unwrap();
        assert_eq!(reply, "HI");
        assert!(provider.call(&[], 0.7).await.is_err());
    }
}
