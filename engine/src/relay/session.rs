//! Session state shared by all turns
//!
//! Holds the memory store and reply tracker for the whole process, plus one
//! async lock per chat. A turn takes its chat's lock for its entire duration,
//! so turns in the same chat run one after another while different chats
//! proceed independently. The store and tracker themselves sit behind short
//! synchronous locks that are never held across an `.await`.

use crate::memory::{Conversation, ConversationKey, MemoryStore};
use crate::replies::ReplyTracker;
use sdk::{ChatId, MessageId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// Process-wide conversation state
#[derive(Debug, Default)]
pub struct SessionStore {
    memory: Mutex<MemoryStore>,
    replies: Mutex<ReplyTracker>,
    chat_locks: Mutex<HashMap<ChatId, Arc<tokio::sync::Mutex<()>>>>,
}

/// Held for the duration of one turn in a chat
pub type ChatGuard = OwnedMutexGuard<()>;

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other turn is running in `chat_id`
    ///
    /// Locks that nobody holds or waits on are dropped along the way, so the
    /// table only grows with the number of chats that are busy at once.
    pub async fn lock_chat(&self, chat_id: ChatId) -> ChatGuard {
        let lock = {
            let mut locks = relock(&self.chat_locks);
            // Guards and waiters each own a clone; a count of one means idle
            locks.retain(|id, lock| *id == chat_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(chat_id).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of chats with a tracked turn lock
    pub fn tracked_chats(&self) -> usize {
        relock(&self.chat_locks).len()
    }

    /// Run `f` against the memory store
    pub fn with_memory<R>(&self, f: impl FnOnce(&mut MemoryStore) -> R) -> R {
        f(&mut relock(&self.memory))
    }

    /// Run `f` against the reply tracker
    pub fn with_replies<R>(&self, f: impl FnOnce(&mut ReplyTracker) -> R) -> R {
        f(&mut relock(&self.replies))
    }

    pub fn reply_for(&self, chat_id: ChatId, user_message_id: MessageId) -> Option<MessageId> {
        self.with_replies(|replies| replies.lookup(chat_id, user_message_id))
    }

    pub fn bind_reply(&self, chat_id: ChatId, user_message_id: MessageId, reply_id: MessageId) {
        if let Some(previous) =
            self.with_replies(|replies| replies.bind(chat_id, user_message_id, reply_id))
        {
            tracing::debug!(
                "Rebound reply for message {} in chat {}: {} -> {}",
                user_message_id,
                chat_id,
                previous,
                reply_id
            );
        }
    }

    /// Copy of a conversation's current records
    pub fn conversation(&self, key: &ConversationKey) -> Option<Conversation> {
        self.with_memory(|store| store.get(key).cloned())
    }
}

/// A panic inside a closure must not wedge every later turn
fn relock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
