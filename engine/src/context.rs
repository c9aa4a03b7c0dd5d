//! Context Assembly
//!
//! Builds the ordered message list handed to a model provider:
//!
//! ```text
//! [system prompt]?  user₁ assistant₁  user₂ assistant₂ ...  query
//! ```
//!
//! The output depends only on the inputs; the same system prompt,
//! conversation and query always produce the same list.

use crate::memory::Conversation;
use sdk::Message;

/// Builds model input from stored memory
pub struct ContextAssembler;

impl ContextAssembler {
    /// System prompt, replayed history, then the new query
    pub fn build(
        system_prompt: Option<&str>,
        conversation: &Conversation,
        query: &str,
    ) -> Vec<Message> {
        let mut messages = Vec::with_capacity(conversation.len() * 2 + 2);
        Self::push_system(&mut messages, system_prompt);
        for record in conversation.records() {
            messages.extend(record.turn.iter().cloned());
        }
        messages.push(Message::user(query));
        messages
    }

    /// Input for a provider with memory switched off
    ///
    /// Only the system prompt and the query; whatever history may exist is
    /// ignored.
    pub fn build_stateless(system_prompt: Option<&str>, query: &str) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        Self::push_system(&mut messages, system_prompt);
        messages.push(Message::user(query));
        messages
    }

    fn push_system(messages: &mut Vec<Message>, system_prompt: Option<&str>) {
        if let Some(prompt) = system_prompt.filter(|p| !p.trim().is_empty()) {
            messages.push(Message::system(prompt));
        }
    }
}
