//! Feed, follow, and locally materialized feed state.

use crate::activity::Activity;
use crate::comment::Comment;
use crate::ids::{FeedId, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Status of a follow edge.
///
/// Only [`FollowStatus::Accepted`] follows affect follower/following
/// counts and membership lists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FollowStatus {
    /// Follow requested, not yet accepted.
    Pending,
    /// Follow accepted by the target.
    Accepted,
    /// Follow rejected by the target.
    Rejected,
    /// A status this client version does not know about.
    Other(String),
}

impl From<String> for FollowStatus {
    fn from(value: String) -> Self {
        match value.as_str() {
            "pending" => FollowStatus::Pending,
            "accepted" => FollowStatus::Accepted,
            "rejected" => FollowStatus::Rejected,
            _ => FollowStatus::Other(value),
        }
    }
}

impl From<FollowStatus> for String {
    fn from(value: FollowStatus) -> Self {
        match value {
            FollowStatus::Pending => "pending".into(),
            FollowStatus::Accepted => "accepted".into(),
            FollowStatus::Rejected => "rejected".into(),
            FollowStatus::Other(s) => s,
        }
    }
}

/// Public fields of a feed as reported by the server.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct FeedInfo {
    /// The feed's id in `"group:id"` form.
    pub fid: Option<FeedId>,
    /// Display name.
    #[serde(default)]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// User that created the feed.
    #[serde(default)]
    pub created_by: Option<UserId>,
    /// Number of accepted followers.
    #[serde(default)]
    pub follower_count: Option<u64>,
    /// Number of accepted followings.
    #[serde(default)]
    pub following_count: Option<u64>,
    /// Number of members.
    #[serde(default)]
    pub member_count: Option<u64>,
    /// Application-defined payload.
    #[serde(default)]
    pub custom: serde_json::Value,
}

impl FeedInfo {
    /// Merges another snapshot into this one, field by field.
    ///
    /// `Some`/non-null fields of `other` win; `None` fields leave the
    /// current value untouched, so a partial server snapshot never erases
    /// locally known data.
    pub fn merge(&mut self, other: &FeedInfo) {
        if other.fid.is_some() {
            self.fid = other.fid.clone();
        }
        if other.name.is_some() {
            self.name = other.name.clone();
        }
        if other.description.is_some() {
            self.description = other.description.clone();
        }
        if other.created_by.is_some() {
            self.created_by = other.created_by.clone();
        }
        if other.follower_count.is_some() {
            self.follower_count = other.follower_count;
        }
        if other.following_count.is_some() {
            self.following_count = other.following_count;
        }
        if other.member_count.is_some() {
            self.member_count = other.member_count;
        }
        if !other.custom.is_null() {
            self.custom = other.custom.clone();
        }
    }
}

/// A directed follow edge between two feeds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    /// The feed that follows.
    pub source: FeedInfo,
    /// The feed being followed.
    pub target: FeedInfo,
    /// Status of the edge.
    pub status: FollowStatus,
    /// When the edge was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Follow {
    /// Returns the source feed's id, when known.
    pub fn source_fid(&self) -> Option<&FeedId> {
        self.source.fid.as_ref()
    }

    /// Returns the target feed's id, when known.
    pub fn target_fid(&self) -> Option<&FeedId> {
        self.target.fid.as_ref()
    }

    /// True when both endpoints match `other` by feed identity.
    pub fn same_edge(&self, other: &Follow) -> bool {
        self.source_fid() == other.source_fid() && self.target_fid() == other.target_fid()
    }
}

/// Locally materialized state of one feed handle.
///
/// Owned exclusively by the feed handle's state store; mutated only
/// through store writes. `followers`/`following` are `None` until a
/// query materializes them, which reconciliation uses to decide whether
/// membership lists should be maintained at all.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FeedState {
    /// Feed metadata, when known.
    pub feed: Option<FeedInfo>,
    /// Activities in display order.
    pub activities: Vec<Activity>,
    /// Accepted follows targeting this feed. `None` = not materialized.
    pub followers: Option<Vec<Follow>>,
    /// Accepted follows originating from this feed. `None` = not materialized.
    pub following: Option<Vec<Follow>>,
    /// Follows initiated by the connected user that target this feed.
    pub own_follows: Vec<Follow>,
    /// Count of accepted followers.
    pub follower_count: u64,
    /// Count of accepted followings.
    pub following_count: u64,
    /// Comments keyed by activity id.
    pub comments: HashMap<String, Vec<Comment>>,
    /// Pagination cursor for the next page.
    pub next: Option<String>,
    /// Pagination cursor for the previous page.
    pub prev: Option<String>,
    /// True while a read is in flight.
    pub is_loading: bool,
    /// True when this handle receives live push events for the feed.
    pub watch: bool,
    /// Per-connected-user capabilities, fetched via the batched
    /// own-fields query.
    pub own_capabilities: Vec<String>,
}

impl FeedState {
    /// Looks up an activity by id.
    pub fn activity(&self, id: &str) -> Option<&Activity> {
        self.activities.iter().find(|a| a.id == id)
    }
}
