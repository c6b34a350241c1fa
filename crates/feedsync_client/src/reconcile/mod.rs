//! Per-entity reconciliation of push events into local feed state.
//!
//! Every function here is pure: `(event, current state, identity
//! context) -> StateUpdate`. Inputs are never mutated; `changed` is
//! computed by comparing the produced state against the input, so a
//! redelivered event that lands on already-reconciled state reports
//! `changed: false`.
//!
//! Reconciliation never fails. Events that reference unknown entities
//! or carry unknown types are logged and ignored.

mod activities;
mod comments;
mod follows;
mod reactions;

pub use activities::{activity_added, activity_deleted, activity_updated};
pub use comments::{comment_added, comment_deleted, comment_updated};
pub use follows::{follow_created, follow_deleted, follow_updated};
pub use reactions::{reaction_added, reaction_deleted};

use crate::config::InsertEdge;
use feedsync_model::{FeedEvent, FeedId, FeedState, UserId};

/// Result of reconciling one event.
#[derive(Debug, Clone, PartialEq)]
pub struct StateUpdate<T> {
    /// True when `data` differs from the input state.
    pub changed: bool,
    /// The resulting state.
    pub data: T,
}

impl<T> StateUpdate<T> {
    /// Marks `data` as unchanged.
    pub fn unchanged(data: T) -> Self {
        Self {
            changed: false,
            data,
        }
    }

    /// Computes `changed` by comparison.
    pub fn diff(previous: &T, data: T) -> Self
    where
        T: PartialEq,
    {
        Self {
            changed: data != *previous,
            data,
        }
    }
}

/// Identity context for reconciliation.
#[derive(Debug, Clone)]
pub struct ReconcileCtx {
    /// The feed this state belongs to.
    pub own_fid: FeedId,
    /// The locally connected user, when authenticated.
    pub connected_user: Option<UserId>,
    /// Where added activities are inserted.
    pub insert_edge: InsertEdge,
}

/// Routes one event to its reconciliation function.
///
/// The match is exhaustive over [`FeedEvent`]: adding a new event
/// variant without deciding its reconciliation is a compile error, not
/// a silently dropped event.
pub fn apply_event(
    event: &FeedEvent,
    state: &FeedState,
    ctx: &ReconcileCtx,
) -> StateUpdate<FeedState> {
    match event {
        FeedEvent::FollowCreated { follow, .. } => follow_created(follow, state, ctx),
        FeedEvent::FollowUpdated { follow, .. } => follow_updated(follow, state, ctx),
        FeedEvent::FollowDeleted { follow, .. } => follow_deleted(follow, state, ctx),
        FeedEvent::ActivityAdded { fid, activity, .. } => {
            if *fid != ctx.own_fid {
                return StateUpdate::unchanged(state.clone());
            }
            activity_added(activity, state, ctx.insert_edge)
        }
        FeedEvent::ActivityUpdated { fid, activity, .. } => {
            if *fid != ctx.own_fid {
                return StateUpdate::unchanged(state.clone());
            }
            activity_updated(activity, state)
        }
        FeedEvent::ActivityDeleted { fid, activity, .. } => {
            if *fid != ctx.own_fid {
                return StateUpdate::unchanged(state.clone());
            }
            activity_deleted(&activity.id, state)
        }
        FeedEvent::ReactionAdded { fid, reaction, .. } => {
            if *fid != ctx.own_fid {
                return StateUpdate::unchanged(state.clone());
            }
            reaction_added(reaction, state, ctx)
        }
        FeedEvent::ReactionDeleted { fid, reaction, .. } => {
            if *fid != ctx.own_fid {
                return StateUpdate::unchanged(state.clone());
            }
            reaction_deleted(reaction, state, ctx)
        }
        FeedEvent::CommentAdded { fid, comment, .. } => {
            if *fid != ctx.own_fid {
                return StateUpdate::unchanged(state.clone());
            }
            comment_added(comment, state)
        }
        FeedEvent::CommentUpdated { fid, comment, .. } => {
            if *fid != ctx.own_fid {
                return StateUpdate::unchanged(state.clone());
            }
            comment_updated(comment, state)
        }
        FeedEvent::CommentDeleted { fid, comment, .. } => {
            if *fid != ctx.own_fid {
                return StateUpdate::unchanged(state.clone());
            }
            comment_deleted(comment, state)
        }
        FeedEvent::Unknown => {
            tracing::debug!(fid = %ctx.own_fid, "ignoring unknown event type");
            StateUpdate::unchanged(state.clone())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use feedsync_model::Activity;

    fn ctx() -> ReconcileCtx {
        ReconcileCtx {
            own_fid: FeedId::new("user", "jane"),
            connected_user: Some(UserId::new("jane")),
            insert_edge: InsertEdge::Start,
        }
    }

    #[test]
    fn unknown_event_is_ignored() {
        let state = FeedState::default();
        let update = apply_event(&FeedEvent::Unknown, &state, &ctx());
        assert!(!update.changed);
        assert_eq!(update.data, state);
    }

    #[test]
    fn foreign_feed_event_is_ignored() {
        let state = FeedState::default();
        let event = FeedEvent::ActivityAdded {
            fid: FeedId::new("user", "someone-else"),
            activity: Activity::new("a1", "bob"),
            created_at: None,
        };

        let update = apply_event(&event, &state, &ctx());
        assert!(!update.changed);
        assert!(update.data.activities.is_empty());
    }

    #[test]
    fn matching_feed_event_applies() {
        let state = FeedState::default();
        let event = FeedEvent::ActivityAdded {
            fid: FeedId::new("user", "jane"),
            activity: Activity::new("a1", "bob"),
            created_at: None,
        };

        let update = apply_event(&event, &state, &ctx());
        assert!(update.changed);
        assert_eq!(update.data.activities.len(), 1);
    }
}
