//! Feed operations.
//!
//! Each operation issues one REST call through the client's executor
//! and reconciles the response into the handle's state with the same
//! functions that process push events, so a REST response and its later
//! push echo converge on identical state.

use crate::client::FeedHandle;
use crate::error::ClientResult;
use crate::http::Method;
use crate::reconcile::{
    comment_added, comment_deleted, follow_created, follow_deleted, reaction_added,
    reaction_deleted,
};
use crate::request::{ApiResponse, QueryValue};
use crate::suppression::{follow_key, reaction_key, scoped_key};
use feedsync_model::{
    CommentResponse, FeedId, FollowResponse, GetFeedResponse, ReactionResponse,
};

/// Parameters of a feed read.
#[derive(Debug, Clone, Default)]
pub struct ReadQuery {
    /// Page size.
    pub limit: Option<u64>,
    /// Page offset.
    pub offset: Option<u64>,
    /// Subscribe this handle to live push events for the feed.
    pub watch: bool,
}

impl ReadQuery {
    /// Sets the page size.
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Sets the page offset.
    pub fn with_offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Requests live push events for the feed.
    pub fn with_watch(mut self) -> Self {
        self.watch = true;
        self
    }
}

/// Reads one page of a feed and merges it into the handle's state.
///
/// `is_loading` is raised for the duration of the call. Activities
/// already known by id are kept in place; new ones append, so re-read
/// pages never duplicate entries. A watched read latches `watch` on.
pub fn read_feed(
    handle: &FeedHandle,
    query: &ReadQuery,
) -> ClientResult<ApiResponse<GetFeedResponse>> {
    let client = handle.client()?;
    let fid = handle.fid().clone();

    handle.store().partial_update(|s| s.is_loading = true);

    let mut params = Vec::new();
    if let Some(limit) = query.limit {
        params.push(("limit", QueryValue::Int(limit as i64)));
    }
    if let Some(offset) = query.offset {
        params.push(("offset", QueryValue::Int(offset as i64)));
    }
    if query.watch {
        params.push(("watch", QueryValue::Bool(true)));
    }

    let result: ClientResult<ApiResponse<GetFeedResponse>> = client.executor.send(
        Method::Get,
        "feeds/{group}/{id}",
        &[("group", &fid.group), ("id", &fid.id)],
        &params,
        None::<&()>,
    );

    let resp = match result {
        Ok(resp) => resp,
        Err(err) => {
            handle.store().partial_update(|s| s.is_loading = false);
            return Err(err);
        }
    };

    let body = &resp.body;
    let watch = query.watch;
    handle.store().partial_update(|s| {
        s.is_loading = false;

        if let Some(info) = &body.feed {
            s.feed.get_or_insert_with(Default::default).merge(info);
            if let Some(n) = info.follower_count {
                s.follower_count = n;
            }
            if let Some(n) = info.following_count {
                s.following_count = n;
            }
        }

        for activity in &body.activities {
            if !s.activities.iter().any(|a| a.id == activity.id) {
                s.activities.push(activity.clone());
            }
        }

        if body.followers.is_some() {
            s.followers = body.followers.clone();
        }
        if body.following.is_some() {
            s.following = body.following.clone();
        }

        s.next = body.next.clone();
        s.prev = body.prev.clone();

        if !body.own_capabilities.is_empty() {
            s.own_capabilities = body.own_capabilities.clone();
        }
        if watch {
            s.watch = true;
        }
    });

    Ok(resp)
}

/// Follows `target` from this handle's feed.
///
/// On a watched feed the operation is marked in the suppression queue
/// before the call, keyed to this handle, so the push echo of the
/// server's broadcast is discarded here while other handles for the
/// same edge still reconcile it; a failed call unmarks it again.
pub fn follow(handle: &FeedHandle, target: &FeedId) -> ClientResult<ApiResponse<FollowResponse>> {
    let client = handle.client()?;
    let source = handle.fid().clone();
    let watching = handle.store().with(|s| s.watch);

    let key = scoped_key(&source, &follow_key(&source, target));
    if watching {
        client.suppression.mark(key.clone());
    }

    let body = serde_json::json!({
        "source": source.fid(),
        "target": target.fid(),
    });
    let result: ClientResult<ApiResponse<FollowResponse>> =
        client
            .executor
            .send(Method::Post, "follows", &[], &[], Some(&body));

    match result {
        Ok(resp) => {
            let ctx = handle.reconcile_ctx(&client);
            handle
                .store()
                .update(|s| follow_created(&resp.body.follow, s, &ctx).data);
            Ok(resp)
        }
        Err(err) => {
            if watching {
                client.suppression.unmark(&key);
            }
            Err(err)
        }
    }
}

/// Removes the follow from this handle's feed to `target`.
pub fn unfollow(handle: &FeedHandle, target: &FeedId) -> ClientResult<ApiResponse<FollowResponse>> {
    let client = handle.client()?;
    let source = handle.fid().clone();
    let watching = handle.store().with(|s| s.watch);

    let key = scoped_key(&source, &follow_key(&source, target));
    if watching {
        client.suppression.mark(key.clone());
    }

    let source_fid = source.fid();
    let target_fid = target.fid();
    let result: ClientResult<ApiResponse<FollowResponse>> = client.executor.send(
        Method::Delete,
        "follows/{source}/{target}",
        &[("source", &source_fid), ("target", &target_fid)],
        &[],
        None::<&()>,
    );

    match result {
        Ok(resp) => {
            let ctx = handle.reconcile_ctx(&client);
            handle
                .store()
                .update(|s| follow_deleted(&resp.body.follow, s, &ctx).data);
            Ok(resp)
        }
        Err(err) => {
            if watching {
                client.suppression.unmark(&key);
            }
            Err(err)
        }
    }
}

/// Adds a reaction to an activity on this handle's feed.
pub fn add_reaction(
    handle: &FeedHandle,
    activity_id: &str,
    kind: &str,
) -> ClientResult<ApiResponse<ReactionResponse>> {
    let client = handle.client()?;
    let watching = handle.store().with(|s| s.watch);

    let key = scoped_key(handle.fid(), &reaction_key(activity_id, kind));
    if watching {
        client.suppression.mark(key.clone());
    }

    let body = serde_json::json!({ "type": kind });
    let result: ClientResult<ApiResponse<ReactionResponse>> = client.executor.send(
        Method::Post,
        "feeds/activities/{activity_id}/reactions",
        &[("activity_id", activity_id)],
        &[],
        Some(&body),
    );

    match result {
        Ok(resp) => {
            let ctx = handle.reconcile_ctx(&client);
            handle
                .store()
                .update(|s| reaction_added(&resp.body.reaction, s, &ctx).data);
            Ok(resp)
        }
        Err(err) => {
            if watching {
                client.suppression.unmark(&key);
            }
            Err(err)
        }
    }
}

/// Removes a reaction from an activity on this handle's feed.
pub fn delete_reaction(
    handle: &FeedHandle,
    activity_id: &str,
    kind: &str,
) -> ClientResult<ApiResponse<ReactionResponse>> {
    let client = handle.client()?;
    let watching = handle.store().with(|s| s.watch);

    let key = scoped_key(handle.fid(), &reaction_key(activity_id, kind));
    if watching {
        client.suppression.mark(key.clone());
    }

    let result: ClientResult<ApiResponse<ReactionResponse>> = client.executor.send(
        Method::Delete,
        "feeds/activities/{activity_id}/reactions/{kind}",
        &[("activity_id", activity_id), ("kind", kind)],
        &[],
        None::<&()>,
    );

    match result {
        Ok(resp) => {
            let ctx = handle.reconcile_ctx(&client);
            handle
                .store()
                .update(|s| reaction_deleted(&resp.body.reaction, s, &ctx).data);
            Ok(resp)
        }
        Err(err) => {
            if watching {
                client.suppression.unmark(&key);
            }
            Err(err)
        }
    }
}

/// Adds a comment (or reply, via `parent_id`) to an activity.
///
/// Comments do not go through the suppression queue: reconciliation is
/// idempotent by comment id, so the push echo lands as a no-op.
pub fn add_comment(
    handle: &FeedHandle,
    activity_id: &str,
    text: &str,
    parent_id: Option<&str>,
) -> ClientResult<ApiResponse<CommentResponse>> {
    let client = handle.client()?;

    let body = serde_json::json!({
        "text": text,
        "parent_id": parent_id,
    });
    let result: ClientResult<ApiResponse<CommentResponse>> = client.executor.send(
        Method::Post,
        "feeds/activities/{activity_id}/comments",
        &[("activity_id", activity_id)],
        &[],
        Some(&body),
    );
    let resp = result?;

    handle
        .store()
        .update(|s| comment_added(&resp.body.comment, s).data);
    Ok(resp)
}

/// Deletes a comment by id.
pub fn delete_comment(
    handle: &FeedHandle,
    comment_id: &str,
) -> ClientResult<ApiResponse<CommentResponse>> {
    let client = handle.client()?;

    let result: ClientResult<ApiResponse<CommentResponse>> = client.executor.send(
        Method::Delete,
        "feeds/comments/{id}",
        &[("id", comment_id)],
        &[],
        None::<&()>,
    );
    let resp = result?;

    handle
        .store()
        .update(|s| comment_deleted(&resp.body.comment, s).data);
    Ok(resp)
}

/// Queues this feed for the next batched own-fields query.
///
/// Near-simultaneous calls across handles coalesce into one request;
/// the batch is issued by the client's throttle (leading edge, or a
/// later tick/flush for the trailing edge).
pub fn query_own_fields(handle: &FeedHandle) -> ClientResult<()> {
    let client = handle.client()?;
    client.enqueue_own_fields(handle.fid().fid());
    Ok(())
}
