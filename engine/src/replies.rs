//! Reply Tracking
//!
//! Remembers which bot message answered which user message, so that when the
//! user edits their message the bot edits its answer instead of posting a
//! second one.

use sdk::{ChatId, MessageId};
use std::collections::HashMap;

/// Map from inbound user message to the bot's outbound reply
#[derive(Debug, Default)]
pub struct ReplyTracker {
    bindings: HashMap<(ChatId, MessageId), MessageId>,
}

impl ReplyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// The reply previously sent for `user_message_id`, if any
    pub fn lookup(&self, chat_id: ChatId, user_message_id: MessageId) -> Option<MessageId> {
        self.bindings.get(&(chat_id, user_message_id)).copied()
    }

    /// Record `reply_id` as the answer to `user_message_id`
    ///
    /// Overwrites an earlier binding; returns it when it differed.
    pub fn bind(
        &mut self,
        chat_id: ChatId,
        user_message_id: MessageId,
        reply_id: MessageId,
    ) -> Option<MessageId> {
        self.bindings
            .insert((chat_id, user_message_id), reply_id)
            .filter(|previous| *previous != reply_id)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_unknown_is_none() {
        let tracker = ReplyTracker::new();
        assert_eq!(tracker.lookup(ChatId(1), MessageId(10)), None);
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_bind_then_lookup() {
        let mut tracker = ReplyTracker::new();
        assert_eq!(tracker.bind(ChatId(1), MessageId(10), MessageId(11)), None);
        assert_eq!(tracker.lookup(ChatId(1), MessageId(10)), Some(MessageId(11)));
    }

    #[test]
    fn test_rebind_replaces() {
        let mut tracker = ReplyTracker::new();
        tracker.bind(ChatId(1), MessageId(10), MessageId(11));
        assert_eq!(
            tracker.bind(ChatId(1), MessageId(10), MessageId(15)),
            Some(MessageId(11))
        );
        assert_eq!(tracker.bind(ChatId(1), MessageId(10), MessageId(15)), None);
        assert_eq!(tracker.lookup(ChatId(1), MessageId(10)), Some(MessageId(15)));
        assert_eq!(tracker.len(), 1);
    }

    #[test]
    fn test_bindings_are_per_chat() {
        let mut tracker = ReplyTracker::new();
        tracker.bind(ChatId(1), MessageId(10), MessageId(11));
        assert_eq!(tracker.lookup(ChatId(2), MessageId(10)), None);
    }
}
