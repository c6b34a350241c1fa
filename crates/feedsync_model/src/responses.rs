//! REST response bodies.
//!
//! Envelope bodies for the endpoints the client core drives. Metadata
//! (correlation id, rate limits) is attached by the request executor,
//! not part of these bodies.

use crate::activity::{Activity, Reaction};
use crate::comment::Comment;
use crate::feed::{FeedInfo, Follow};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Body of a feed read.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct GetFeedResponse {
    /// Feed metadata.
    #[serde(default)]
    pub feed: Option<FeedInfo>,
    /// One page of activities.
    #[serde(default)]
    pub activities: Vec<Activity>,
    /// Followers, present only when requested.
    #[serde(default)]
    pub followers: Option<Vec<Follow>>,
    /// Followings, present only when requested.
    #[serde(default)]
    pub following: Option<Vec<Follow>>,
    /// Cursor for the next page.
    #[serde(default)]
    pub next: Option<String>,
    /// Cursor for the previous page.
    #[serde(default)]
    pub prev: Option<String>,
    /// Capabilities of the connected user on this feed.
    #[serde(default)]
    pub own_capabilities: Vec<String>,
}

/// Body of a follow mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowResponse {
    /// The created or deleted follow.
    pub follow: Follow,
}

/// Body of a reaction mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReactionResponse {
    /// The created or deleted reaction.
    pub reaction: Reaction,
}

/// Body of a comment mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommentResponse {
    /// The created or deleted comment.
    pub comment: Comment,
}

/// Body of a batched own-fields query.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OwnFieldsResponse {
    /// Capabilities per feed, keyed by fid.
    #[serde(default)]
    pub capabilities: HashMap<String, Vec<String>>,
}
