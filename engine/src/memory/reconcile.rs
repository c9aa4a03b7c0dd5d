//! Edit reconciliation
//!
//! When a user edits a message the bot already answered, the stored exchange
//! for that message is stale. It is removed here before the new exchange is
//! produced, so the conversation never holds two records for one message and
//! an edit never counts twice against the capacity bound.

use super::Conversation;
use sdk::MessageId;
use tracing::debug;

/// Removes the record belonging to an edited user message
pub struct EditReconciler;

impl EditReconciler {
    /// Remove the record produced by `edited` and return how many went
    ///
    /// A miss (the message predates memory, or its record already expired or
    /// was evicted) is normal and returns 0.
    pub fn reconcile(conversation: &mut Conversation, edited: MessageId) -> usize {
        let mut removed = 0;

        // Normally at most one; the loop keeps the invariant even if a caller
        // appended without reconciling.
        while let Some(index) = conversation.position_of(edited) {
            conversation.remove_at(index);
            removed += 1;
        }

        if removed > 0 {
            debug!(
                "Removed {} stale memory pair(s) for edited message {}. Remaining: {}.",
                removed,
                edited,
                conversation.len()
            );
        }

        removed
    }
}
