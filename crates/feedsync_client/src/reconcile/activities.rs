//! Activity reconciliation.

use crate::config::InsertEdge;
use crate::reconcile::StateUpdate;
use feedsync_model::{Activity, FeedState};

/// Applies an activity-added event.
///
/// Append-if-absent: an activity already known by id is left untouched,
/// otherwise it is inserted at the configured edge.
pub fn activity_added(
    activity: &Activity,
    state: &FeedState,
    edge: InsertEdge,
) -> StateUpdate<FeedState> {
    if state.activities.iter().any(|a| a.id == activity.id) {
        return StateUpdate::unchanged(state.clone());
    }

    let mut next = state.clone();
    match edge {
        InsertEdge::Start => next.activities.insert(0, activity.clone()),
        InsertEdge::End => next.activities.push(activity.clone()),
    }
    StateUpdate::diff(state, next)
}

/// Applies an activity-updated event.
///
/// Replaces the activity by id; an update for an unknown activity must
/// never create a new entry.
pub fn activity_updated(activity: &Activity, state: &FeedState) -> StateUpdate<FeedState> {
    let Some(pos) = state.activities.iter().position(|a| a.id == activity.id) else {
        tracing::debug!(activity = %activity.id, "update for unknown activity ignored");
        return StateUpdate::unchanged(state.clone());
    };

    let mut next = state.clone();
    next.activities[pos] = activity.clone();
    StateUpdate::diff(state, next)
}

/// Applies an activity-deleted event.
///
/// Removes the activity and its comment thread; unknown ids are a
/// no-op.
pub fn activity_deleted(activity_id: &str, state: &FeedState) -> StateUpdate<FeedState> {
    if !state.activities.iter().any(|a| a.id == activity_id) {
        return StateUpdate::unchanged(state.clone());
    }

    let mut next = state.clone();
    next.activities.retain(|a| a.id != activity_id);
    next.comments.remove(activity_id);
    StateUpdate::diff(state, next)
}
