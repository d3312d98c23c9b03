//! Streaming completion tracking
//!
//! Distinguishes an assistant message that is still receiving tokens from one
//! whose stream has terminated. Extraction only runs on the latter: a partial
//! message can hold one sentinel whose pair has not arrived yet.

use crate::message::{Message, MessageId, Role};
use std::collections::HashMap;

/// Per-message finalization flags for assistant messages
///
/// Owned by the conversation. The transition to finalized is one-way.
#[derive(Debug, Clone, Default)]
pub struct CompletionTracker {
    flags: HashMap<MessageId, bool>,
}

impl CompletionTracker {
    /// Create empty tracker
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Start tracking an assistant message as unfinalized
    ///
    /// Does nothing if the id is already tracked.
    pub fn begin(&mut self, id: MessageId) {
        self.flags.entry(id).or_insert(false);
    }

    /// Record a stream-completion signal for `message`
    ///
    /// Returns `true` only on the call that flips the flag. User messages are
    /// finalized at creation and are ignored here.
    pub fn finalize(&mut self, message: &Message) -> bool {
        if message.role != Role::Assistant {
            return false;
        }
        let flag = self.flags.entry(message.id).or_insert(false);
        if *flag {
            return false;
        }
        *flag = true;
        true
    }

    /// Whether the assistant message's stream completed
    #[inline]
    #[must_use]
    pub fn is_finalized(&self, id: MessageId) -> bool {
        self.flags.get(&id).copied().unwrap_or(false)
    }

    /// Number of tracked messages that never finalized
    #[must_use]
    pub fn pending(&self) -> usize {
        self.flags.values().filter(|done| !**done).count()
    }

    /// Number of finalized messages
    #[must_use]
    pub fn finalized_count(&self) -> usize {
        self.flags.values().filter(|done| **done).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finalize_is_idempotent() {
        let mut tracker = CompletionTracker::new();
        let message = Message::assistant();

        tracker.begin(message.id);
        assert!(!tracker.is_finalized(message.id));

        assert!(tracker.finalize(&message));
        assert!(!tracker.finalize(&message));
        assert!(!tracker.finalize(&message));

        assert!(tracker.is_finalized(message.id));
        assert_eq!(tracker.finalized_count(), 1);
        assert_eq!(tracker.pending(), 0);
    }

    #[test]
    fn begin_after_finalize_keeps_flag() {
        let mut tracker = CompletionTracker::new();
        let message = Message::assistant();

        tracker.finalize(&message);
        tracker.begin(message.id);
        assert!(tracker.is_finalized(message.id));
    }

    #[test]
    fn user_messages_are_not_tracked() {
        let mut tracker = CompletionTracker::new();
        let message = Message::user("hello");

        assert!(!tracker.finalize(&message));
        assert_eq!(tracker.finalized_count(), 0);
    }

    #[test]
    fn unknown_ids_are_unfinalized() {
        let tracker = CompletionTracker::new();
        assert!(!tracker.is_finalized(MessageId::new()));
    }
}
