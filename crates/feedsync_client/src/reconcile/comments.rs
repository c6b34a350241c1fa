//! Comment reconciliation.

use crate::reconcile::StateUpdate;
use feedsync_model::{Comment, FeedState};

/// Applies a comment-added event.
///
/// Inserts the comment among its siblings (same activity, same parent)
/// in creation-time order, idempotent by id, and bumps the activity's
/// comment count when the activity is known locally.
pub fn comment_added(comment: &Comment, state: &FeedState) -> StateUpdate<FeedState> {
    let thread = state.comments.get(comment.activity_id.as_str());
    if thread.is_some_and(|list| list.iter().any(|c| c.id == comment.id)) {
        return StateUpdate::unchanged(state.clone());
    }

    let mut next = state.clone();
    let list = next
        .comments
        .entry(comment.activity_id.clone())
        .or_default();
    let pos = sibling_insert_position(list, comment);
    list.insert(pos, comment.clone());

    if let Some(activity) = next
        .activities
        .iter_mut()
        .find(|a| a.id == comment.activity_id)
    {
        activity.comment_count += 1;
    }

    StateUpdate::diff(state, next)
}

/// Applies a comment-updated event: replace by id, else no-op.
pub fn comment_updated(comment: &Comment, state: &FeedState) -> StateUpdate<FeedState> {
    let Some(list) = state.comments.get(comment.activity_id.as_str()) else {
        return StateUpdate::unchanged(state.clone());
    };
    let Some(pos) = list.iter().position(|c| c.id == comment.id) else {
        tracing::debug!(comment = %comment.id, "update for unknown comment ignored");
        return StateUpdate::unchanged(state.clone());
    };

    let mut next = state.clone();
    if let Some(list) = next.comments.get_mut(comment.activity_id.as_str()) {
        list[pos] = comment.clone();
    }
    StateUpdate::diff(state, next)
}

/// Applies a comment-deleted event.
///
/// Removes by id and decrements the activity's comment count without
/// going below zero.
pub fn comment_deleted(comment: &Comment, state: &FeedState) -> StateUpdate<FeedState> {
    let known = state
        .comments
        .get(comment.activity_id.as_str())
        .is_some_and(|list| list.iter().any(|c| c.id == comment.id));
    if !known {
        return StateUpdate::unchanged(state.clone());
    }

    let mut next = state.clone();
    if let Some(list) = next.comments.get_mut(comment.activity_id.as_str()) {
        list.retain(|c| c.id != comment.id);
    }
    if let Some(activity) = next
        .activities
        .iter_mut()
        .find(|a| a.id == comment.activity_id)
    {
        activity.comment_count = activity.comment_count.saturating_sub(1);
    }

    StateUpdate::diff(state, next)
}

/// Finds where `comment` belongs among its siblings.
///
/// Before the first sibling created later; after the last sibling
/// otherwise; at the end of the list when it has no siblings yet.
fn sibling_insert_position(list: &[Comment], comment: &Comment) -> usize {
    let mut after_last_sibling = None;
    for (i, existing) in list.iter().enumerate() {
        if existing.same_thread(comment) {
            if comment.created_at < existing.created_at {
                return i;
            }
            after_last_sibling = Some(i + 1);
        }
    }
    after_last_sibling.unwrap_or(list.len())
}
