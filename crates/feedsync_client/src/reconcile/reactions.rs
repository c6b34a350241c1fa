//! Reaction reconciliation.

use crate::reconcile::{ReconcileCtx, StateUpdate};
use feedsync_model::{FeedState, Reaction, ReactionGroup};

/// Applies a reaction-added event.
///
/// The target activity is located by id; an unknown activity is a
/// no-op (a placeholder activity is never created). The reaction lands
/// in `latest_reactions`, in `own_reactions` when authored by the
/// connected user, and bumps its `reaction_groups` entry.
pub fn reaction_added(
    reaction: &Reaction,
    state: &FeedState,
    ctx: &ReconcileCtx,
) -> StateUpdate<FeedState> {
    let Some(pos) = state
        .activities
        .iter()
        .position(|a| a.id == reaction.activity_id)
    else {
        tracing::debug!(activity = %reaction.activity_id, "reaction for unknown activity ignored");
        return StateUpdate::unchanged(state.clone());
    };

    // One user holds at most one reaction per type on an activity, so a
    // redelivered add is a no-op.
    if state.activities[pos]
        .latest_reactions
        .iter()
        .any(|r| r.same_reaction(reaction))
    {
        return StateUpdate::unchanged(state.clone());
    }

    let mut next = state.clone();
    let activity = &mut next.activities[pos];

    activity.latest_reactions.push(reaction.clone());
    if ctx.connected_user.as_ref() == Some(&reaction.user) {
        activity.own_reactions.push(reaction.clone());
    }

    let group = activity
        .reaction_groups
        .entry(reaction.kind.clone())
        .or_insert_with(ReactionGroup::default);
    group.count += 1;
    group.sum_score += reaction.score;
    if group.first_reaction_at.is_none() {
        group.first_reaction_at = reaction.created_at;
    }
    group.last_reaction_at = reaction.created_at.or(group.last_reaction_at);

    StateUpdate::diff(state, next)
}

/// Applies a reaction-deleted event.
///
/// Filters the reaction out of both lists by (activity, type, user)
/// identity and decrements the group, dropping the group entry once its
/// count reaches zero.
pub fn reaction_deleted(
    reaction: &Reaction,
    state: &FeedState,
    _ctx: &ReconcileCtx,
) -> StateUpdate<FeedState> {
    let Some(pos) = state
        .activities
        .iter()
        .position(|a| a.id == reaction.activity_id)
    else {
        return StateUpdate::unchanged(state.clone());
    };

    let mut next = state.clone();
    let activity = &mut next.activities[pos];

    let before = activity.latest_reactions.len();
    activity.latest_reactions.retain(|r| !r.same_reaction(reaction));
    let removed = before - activity.latest_reactions.len();
    activity.own_reactions.retain(|r| !r.same_reaction(reaction));

    if removed > 0 {
        if let Some(group) = activity.reaction_groups.get_mut(&reaction.kind) {
            group.count = group.count.saturating_sub(1);
            group.sum_score -= reaction.score;
            if group.count == 0 {
                activity.reaction_groups.remove(&reaction.kind);
            }
        }
    }

    StateUpdate::diff(state, next)
}
