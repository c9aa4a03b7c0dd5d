//! Offline echo backend
//!
//! Answers without any network access by repeating the query and reporting
//! how much history it was handed. Used by the console session to show what
//! the memory replays.

use async_trait::async_trait;
use sdk::{Message, ModelProvider, ProviderError, Role};

#[derive(Debug, Default)]
pub struct EchoProvider;

impl EchoProvider {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ModelProvider for EchoProvider {
    fn name(&self) -> &str {
        "echo"
    }

    async fn call(&self, messages: &[Message], _temperature: f32) -> Result<String, ProviderError> {
        let query = messages
            .last()
            .filter(|m| m.role == Role::User)
            .ok_or_else(|| ProviderError::InvalidRequest("last message is not a user query".into()))?;

        let remembered = messages
            .iter()
            .filter(|m| m.role == Role::Assistant)
            .count();

        Ok(format!(
            "{} (remembering {} earlier exchange{})",
            query.content,
            remembered,
            if remembered == 1 { "" } else { "s" }
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_echo_counts_history() {
        let provider = EchoProvider::new();
        let messages = vec![
            Message::system("sys"),
            Message::user("a"),
            Message::assistant("b"),
            Message::user("c"),
        ];
        let reply = provider.call(&messages, 0.7).await.unwrap();
        assert_eq!(reply, "c (remembering 1 earlier exchange)");
    }

    #[tokio::test]
    async fn test_echo_rejects_missing_query() {
        let provider = EchoProvider::new();
        assert!(provider.call(&[], 0.7).await.is_err());
        assert!(provider
            .call(&[Message::assistant("x")], 0.7)
            .await
            .is_err());
    }
}
