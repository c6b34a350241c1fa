//! Update-suppression queue.
//!
//! When a watched feed mutates state through a REST call, the server's
//! broadcast of that same action later arrives over the push channel.
//! The REST response has already been applied locally, so the echo must
//! be discarded once. Keys are marked before the call is issued, which
//! keeps the mechanism correct under either arrival order
//! (REST-then-push or push-then-REST: in the latter case the push event
//! is consumed and the REST response becomes the no-op via idempotent
//! reconciliation).
//!
//! Keys are scoped to the feed handle that issued the mutation
//! ([`scoped_key`]): only that handle discards the echo, so a second
//! handle registered for the other endpoint of a follow still
//! reconciles the event.
//!
//! This is best-effort, at-most-one-in-flight coordination: rapid
//! repeated identical operations share one slot and may under- or
//! over-suppress. The set is owned per client session; sharing one
//! across independently authenticated sessions would leak suppression
//! state between users.

use feedsync_model::FeedId;
use parking_lot::Mutex;
use std::collections::HashSet;

/// Per-session dedup set for watched mutations.
#[derive(Debug, Default)]
pub struct SuppressionQueue {
    keys: Mutex<HashSet<String>>,
}

impl SuppressionQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks an operation key before its REST call is issued.
    pub fn mark(&self, key: impl Into<String>) {
        self.keys.lock().insert(key.into());
    }

    /// Removes a key marked for an operation whose REST call failed.
    pub fn unmark(&self, key: &str) {
        self.keys.lock().remove(key);
    }

    /// Consumes a key: returns true (and removes it) when present.
    ///
    /// True means the matching push event is an echo of an
    /// already-applied local mutation and must be discarded.
    pub fn consume(&self, key: &str) -> bool {
        self.keys.lock().remove(key)
    }

    /// Returns the number of marked keys.
    pub fn len(&self) -> usize {
        self.keys.lock().len()
    }

    /// True when nothing is marked.
    pub fn is_empty(&self) -> bool {
        self.keys.lock().is_empty()
    }
}

/// Key for a follow mutation between two feeds.
pub fn follow_key(source: &FeedId, target: &FeedId) -> String {
    format!("{}{}", source.fid(), target.fid())
}

/// Key for a reaction mutation on one activity.
pub fn reaction_key(activity_id: &str, kind: &str) -> String {
    format!("{activity_id}{kind}")
}

/// Scopes an operation key to the feed handle that issued the call.
///
/// A push event can concern several registered handles, but only the
/// issuing handle has already applied the REST response. Scoping keeps
/// the echo discard local to that handle; every other handle still
/// reconciles the event.
pub fn scoped_key(owner: &FeedId, operation_key: &str) -> String {
    format!("{}|{operation_key}", owner.fid())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_removes_once() {
        let queue = SuppressionQueue::new();
        let key = reaction_key("a1", "like");

        queue.mark(key.clone());
        assert!(queue.consume(&key));
        // Second echo is not suppressed.
        assert!(!queue.consume(&key));
    }

    #[test]
    fn unmark_after_failed_call() {
        let queue = SuppressionQueue::new();
        let key = follow_key(&FeedId::new("user", "a"), &FeedId::new("user", "b"));

        queue.mark(key.clone());
        queue.unmark(&key);
        assert!(!queue.consume(&key));
        assert!(queue.is_empty());
    }

    #[test]
    fn identical_operations_share_one_slot() {
        let queue = SuppressionQueue::new();
        let key = reaction_key("a1", "like");

        queue.mark(key.clone());
        queue.mark(key.clone());
        assert_eq!(queue.len(), 1);
        assert!(queue.consume(&key));
        assert!(!queue.consume(&key));
    }

    #[test]
    fn scoped_keys_isolate_handles() {
        let queue = SuppressionQueue::new();
        let op = reaction_key("a1", "like");
        queue.mark(scoped_key(&FeedId::new("user", "jane"), &op));

        assert!(!queue.consume(&scoped_key(&FeedId::new("user", "bob"), &op)));
        assert!(queue.consume(&scoped_key(&FeedId::new("user", "jane"), &op)));
    }

    #[test]
    fn distinct_operations_do_not_collide() {
        let queue = SuppressionQueue::new();
        queue.mark(reaction_key("a1", "like"));

        assert!(!queue.consume(&reaction_key("a1", "heart")));
        assert!(!queue.consume(&reaction_key("a2", "like")));
        assert!(queue.consume(&reaction_key("a1", "like")));
    }
}
