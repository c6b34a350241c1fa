//! Follow reconciliation.

use crate::reconcile::{ReconcileCtx, StateUpdate};
use feedsync_model::{FeedState, Follow, FollowStatus};

/// Applies a follow-created event.
///
/// Non-accepted follows never touch state. For each endpoint matching
/// the local feed, the endpoint's public fields are merged; membership
/// lists are upserted by edge identity only when already materialized,
/// so a redelivered event cannot create a duplicate entry. A follow
/// initiated by the connected user additionally lands in `own_follows`.
pub fn follow_created(
    follow: &Follow,
    state: &FeedState,
    ctx: &ReconcileCtx,
) -> StateUpdate<FeedState> {
    if follow.status != FollowStatus::Accepted {
        return StateUpdate::unchanged(state.clone());
    }

    let mut next = state.clone();

    if follow.source_fid() == Some(&ctx.own_fid) {
        next.feed
            .get_or_insert_with(Default::default)
            .merge(&follow.source);

        if let Some(following) = next.following.as_mut() {
            if !following.iter().any(|f| f.same_edge(follow)) {
                following.insert(0, follow.clone());
                next.following_count += 1;
            }
        }
    }

    if follow.target_fid() == Some(&ctx.own_fid) {
        next.feed
            .get_or_insert_with(Default::default)
            .merge(&follow.target);

        if let Some(followers) = next.followers.as_mut() {
            if !followers.iter().any(|f| f.same_edge(follow)) {
                followers.insert(0, follow.clone());
                next.follower_count += 1;
            }
        }

        // `own_follows` only ever holds follows the connected user
        // initiated, even though this feed is the target.
        let initiated_by_self = ctx.connected_user.is_some()
            && follow.source.created_by.as_ref() == ctx.connected_user.as_ref();
        if initiated_by_self && !next.own_follows.iter().any(|f| f.same_edge(follow)) {
            next.own_follows.push(follow.clone());
        }
    }

    StateUpdate::diff(state, next)
}

/// Applies a follow-deleted event.
///
/// Removes the edge from whichever membership lists hold it, comparing
/// by the other side's feed identity, and decrements the matching count
/// without going below zero.
pub fn follow_deleted(
    follow: &Follow,
    state: &FeedState,
    ctx: &ReconcileCtx,
) -> StateUpdate<FeedState> {
    let mut next = state.clone();

    if follow.source_fid() == Some(&ctx.own_fid) {
        if let Some(following) = next.following.as_mut() {
            let before = following.len();
            following.retain(|f| f.target_fid() != follow.target_fid());
            let removed = (before - following.len()) as u64;
            next.following_count = next.following_count.saturating_sub(removed);
        }
    }

    if follow.target_fid() == Some(&ctx.own_fid) {
        if let Some(followers) = next.followers.as_mut() {
            let before = followers.len();
            followers.retain(|f| f.source_fid() != follow.source_fid());
            let removed = (before - followers.len()) as u64;
            next.follower_count = next.follower_count.saturating_sub(removed);
        }

        let initiated_by_self = ctx.connected_user.is_some()
            && follow.source.created_by.as_ref() == ctx.connected_user.as_ref();
        if initiated_by_self {
            next.own_follows.retain(|f| !f.same_edge(follow));
        }
    }

    StateUpdate::diff(state, next)
}

/// Applies a follow-updated event.
///
/// No-op: update semantics are not yet defined server-side.
pub fn follow_updated(
    _follow: &Follow,
    state: &FeedState,
    _ctx: &ReconcileCtx,
) -> StateUpdate<FeedState> {
    StateUpdate::unchanged(state.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InsertEdge;
    use feedsync_model::{FeedId, FeedInfo, UserId};

    fn ctx() -> ReconcileCtx {
        ReconcileCtx {
            own_fid: FeedId::new("user", "jane"),
            connected_user: Some(UserId::new("jane")),
            insert_edge: InsertEdge::Start,
        }
    }

    fn feed_info(fid: &str, created_by: Option<&str>) -> FeedInfo {
        FeedInfo {
            fid: FeedId::parse(fid),
            created_by: created_by.map(UserId::new),
            ..FeedInfo::default()
        }
    }

    fn follow(source: &str, target: &str, status: FollowStatus) -> Follow {
        Follow {
            source: feed_info(source, None),
            target: feed_info(target, None),
            status,
            created_at: None,
        }
    }

    #[test]
    fn non_accepted_follow_is_a_noop() {
        let state = FeedState {
            followers: Some(Vec::new()),
            ..FeedState::default()
        };
        let event = follow("user:bob", "user:jane", FollowStatus::Pending);

        let update = follow_created(&event, &state, &ctx());
        assert!(!update.changed);
        assert_eq!(update.data, state);
    }

    #[test]
    fn accepted_follow_lands_in_materialized_followers() {
        let state = FeedState {
            followers: Some(Vec::new()),
            ..FeedState::default()
        };
        let event = follow("user:bob", "user:jane", FollowStatus::Accepted);

        let update = follow_created(&event, &state, &ctx());
        assert!(update.changed);
        assert_eq!(update.data.followers.as_ref().unwrap().len(), 1);
        assert_eq!(update.data.follower_count, 1);
    }

    #[test]
    fn redelivered_follow_is_idempotent() {
        let state = FeedState {
            followers: Some(Vec::new()),
            ..FeedState::default()
        };
        let event = follow("user:bob", "user:jane", FollowStatus::Accepted);

        let once = follow_created(&event, &state, &ctx());
        let twice = follow_created(&event, &once.data, &ctx());

        assert!(!twice.changed);
        assert_eq!(twice.data.followers.as_ref().unwrap().len(), 1);
        assert_eq!(twice.data.follower_count, 1);
    }

    #[test]
    fn unmaterialized_list_is_left_alone() {
        let state = FeedState::default();
        let event = follow("user:bob", "user:jane", FollowStatus::Accepted);

        let update = follow_created(&event, &state, &ctx());
        // Feed info merged, but no list materialized and no count bump.
        assert!(update.data.followers.is_none());
        assert_eq!(update.data.follower_count, 0);
    }

    #[test]
    fn own_follow_tracked_only_for_connected_user() {
        let state = FeedState::default();

        // Another user follows jane's feed: not an own-follow.
        let event = follow("user:bob", "user:jane", FollowStatus::Accepted);
        let update = follow_created(&event, &state, &ctx());
        assert!(update.data.own_follows.is_empty());

        // A follow whose source feed was created by the connected user.
        let mut own = follow("timeline:jane", "user:jane", FollowStatus::Accepted);
        own.source = feed_info("timeline:jane", Some("jane"));
        let update = follow_created(&own, &state, &ctx());
        assert_eq!(update.data.own_follows.len(), 1);
    }

    #[test]
    fn source_side_updates_following() {
        let state = FeedState {
            following: Some(Vec::new()),
            ..FeedState::default()
        };
        let event = follow("user:jane", "user:bob", FollowStatus::Accepted);

        let update = follow_created(&event, &state, &ctx());
        assert_eq!(update.data.following.as_ref().unwrap().len(), 1);
        assert_eq!(update.data.following_count, 1);
        assert_eq!(update.data.follower_count, 0);
    }

    #[test]
    fn delete_removes_by_other_side_identity() {
        let state = FeedState {
            followers: Some(Vec::new()),
            ..FeedState::default()
        };
        let created = follow("user:bob", "user:jane", FollowStatus::Accepted);
        let with_follower = follow_created(&created, &state, &ctx()).data;
        assert_eq!(with_follower.follower_count, 1);

        let update = follow_deleted(&created, &with_follower, &ctx());
        assert!(update.changed);
        assert!(update.data.followers.as_ref().unwrap().is_empty());
        assert_eq!(update.data.follower_count, 0);
    }

    #[test]
    fn delete_never_underflows_counts() {
        let state = FeedState {
            followers: Some(Vec::new()),
            follower_count: 0,
            ..FeedState::default()
        };
        let event = follow("user:bob", "user:jane", FollowStatus::Accepted);

        let update = follow_deleted(&event, &state, &ctx());
        assert_eq!(update.data.follower_count, 0);
    }

    #[test]
    fn delete_own_follow_requires_connected_source() {
        let mut own = follow("timeline:jane", "user:jane", FollowStatus::Accepted);
        own.source = feed_info("timeline:jane", Some("jane"));
        let state = FeedState {
            own_follows: vec![own.clone()],
            ..FeedState::default()
        };

        // Deleting someone else's edge leaves own_follows alone.
        let foreign = follow("timeline:jane", "user:jane", FollowStatus::Accepted);
        let update = follow_deleted(&foreign, &state, &ctx());
        assert_eq!(update.data.own_follows.len(), 1);

        let update = follow_deleted(&own, &state, &ctx());
        assert!(update.data.own_follows.is_empty());
    }

    #[test]
    fn update_is_a_noop() {
        let state = FeedState::default();
        let event = follow("user:bob", "user:jane", FollowStatus::Accepted);
        let update = follow_updated(&event, &state, &ctx());
        assert!(!update.changed);
    }
}
