//! # Feedsync Model
//!
//! Entity and push-event types for the feedsync client.
//!
//! This crate provides:
//! - Typed ids (`FeedId`, `UserId`)
//! - Entity types (`FeedInfo`, `Follow`, `Activity`, `Reaction`, `Comment`)
//! - `FeedState`, the locally materialized state of one feed handle
//! - `FeedEvent`, the discriminated union of push events, with its
//!   fieldless `EventKind` mirror
//!
//! This is a pure data crate with no I/O.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod activity;
mod comment;
mod events;
mod feed;
mod ids;
mod responses;

pub use activity::{Activity, Reaction, ReactionGroup};
pub use comment::Comment;
pub use events::{EventKind, FeedEvent};
pub use feed::{FeedInfo, FeedState, Follow, FollowStatus};
pub use ids::{FeedId, UserId};
pub use responses::{
    CommentResponse, FollowResponse, GetFeedResponse, OwnFieldsResponse, ReactionResponse,
};
