//! Conversation Memory
//!
//! Short-term memory for each (chat, provider) pair. A conversation is an
//! ordered sequence of completed exchanges; each exchange is the user's query
//! and the model's reply, tagged with the id of the user message that
//! produced it.
//!
//! Two bounds keep a conversation small:
//! - **expiry**: records older than the configured ttl are dropped, counting
//!   from when the record was created (replaying a record never renews it)
//! - **capacity**: at most `max_pairs` records are kept, oldest evicted first
//!
//! Records are never mutated in place. An edited user message is handled by
//! removing its record (see [`reconcile`]) and appending a fresh one.

use chrono::{DateTime, Utc};
use sdk::{ChatId, Message, MessageId, ProviderId};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::time::Duration;

pub mod reconcile;

pub use reconcile::EditReconciler;

/// Key of one conversation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationKey {
    pub chat_id: ChatId,
    pub provider_id: ProviderId,
}

impl ConversationKey {
    pub fn new(chat_id: ChatId, provider_id: ProviderId) -> Self {
        Self {
            chat_id,
            provider_id,
        }
    }
}

/// One stored user/assistant turn pair
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRecord {
    /// Inbound message that produced this record
    pub user_message_id: MessageId,

    /// Creation time
    pub timestamp: DateTime<Utc>,

    /// `[user, assistant]`
    pub turn: [Message; 2],
}

impl ExchangeRecord {
    pub fn new(
        user_message_id: MessageId,
        timestamp: DateTime<Utc>,
        query: impl Into<String>,
        reply: impl Into<String>,
    ) -> Self {
        Self {
            user_message_id,
            timestamp,
            turn: [Message::user(query), Message::assistant(reply)],
        }
    }

    /// Age of the record at `now`
    ///
    /// Records stamped later than `now` (clock adjustments) are treated as
    /// brand new.
    pub fn age(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.timestamp)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

/// Number of records removed by one prune pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Removed because they reached the ttl
    pub expired: usize,

    /// Removed to get back under `max_pairs`
    pub evicted: usize,
}

impl PruneReport {
    pub fn total(&self) -> usize {
        self.expired + self.evicted
    }
}

/// Ordered exchange records of one conversation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    records: VecDeque<ExchangeRecord>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Records in order, oldest first
    pub fn records(&self) -> impl Iterator<Item = &ExchangeRecord> {
        self.records.iter()
    }

    /// Drop expired records, then evict from the front down to `max_pairs`
    ///
    /// A zero `ttl` disables expiry and a zero `max_pairs` disables the
    /// capacity bound.
    pub fn prune(&mut self, now: DateTime<Utc>, ttl: Duration, max_pairs: usize) -> PruneReport {
        let mut report = PruneReport::default();

        if !ttl.is_zero() {
            let before = self.records.len();
            self.records.retain(|record| record.age(now) < ttl);
            report.expired = before - self.records.len();
        }

        if max_pairs > 0 {
            while self.records.len() > max_pairs {
                self.records.pop_front();
                report.evicted += 1;
            }
        }

        report
    }

    /// Add a record at the tail
    pub fn append(&mut self, record: ExchangeRecord) {
        self.records.push_back(record);
    }

    /// Remove every record, returning how many there were
    pub fn clear(&mut self) -> usize {
        let count = self.records.len();
        self.records.clear();
        count
    }

    /// Position of the record produced by `user_message_id`, if still held
    pub fn position_of(&self, user_message_id: MessageId) -> Option<usize> {
        self.records
            .iter()
            .position(|record| record.user_message_id == user_message_id)
    }

    pub(crate) fn remove_at(&mut self, index: usize) -> Option<ExchangeRecord> {
        self.records.remove(index)
    }
}

/// Expiry and capacity settings applied to a conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MemoryPolicy {
    pub enabled: bool,
    pub ttl: Duration,
    pub max_pairs: usize,
}

impl MemoryPolicy {
    /// Memory switched off entirely
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ttl: Duration::ZERO,
            max_pairs: 0,
        }
    }

    pub fn prune(&self, conversation: &mut Conversation, now: DateTime<Utc>) -> PruneReport {
        conversation.prune(now, self.ttl, self.max_pairs)
    }
}

/// Every conversation known to the process
///
/// The store is a plain structure; callers serialize access per chat.
#[derive(Debug, Default)]
pub struct MemoryStore {
    conversations: HashMap<ConversationKey, Conversation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The conversation for `key`, created empty on first use
    pub fn get_or_create(&mut self, key: &ConversationKey) -> &mut Conversation {
        self.conversations.entry(key.clone()).or_default()
    }

    pub fn get(&self, key: &ConversationKey) -> Option<&Conversation> {
        self.conversations.get(key)
    }

    /// Number of conversations that have been touched
    pub fn conversation_count(&self) -> usize {
        self.conversations.len()
    }
}
