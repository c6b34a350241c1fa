//! Push events.
//!
//! Push events are delivered by the (external) WebSocket transport as a
//! discriminated union tagged by a string `type`. Each event carries a
//! snapshot of the affected entity plus the feed it concerns.

use crate::activity::{Activity, Reaction};
use crate::comment::Comment;
use crate::feed::Follow;
use crate::ids::FeedId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kind of a push event, without its payload.
///
/// Used to key dispatcher registrations. Kept as a fieldless mirror of
/// [`FeedEvent`] so routing is an exhaustive match instead of a
/// string-keyed table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// A follow edge was created.
    FollowCreated,
    /// A follow edge was updated.
    FollowUpdated,
    /// A follow edge was deleted.
    FollowDeleted,
    /// An activity was added to a feed.
    ActivityAdded,
    /// An activity was updated.
    ActivityUpdated,
    /// An activity was deleted.
    ActivityDeleted,
    /// A reaction was added to an activity.
    ReactionAdded,
    /// A reaction was deleted from an activity.
    ReactionDeleted,
    /// A comment was added to an activity.
    CommentAdded,
    /// A comment was updated.
    CommentUpdated,
    /// A comment was deleted.
    CommentDeleted,
    /// An event type this client version does not know about.
    Unknown,
}

/// A push event from the feed service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum FeedEvent {
    /// A follow edge was created.
    #[serde(rename = "feeds.follow.created")]
    FollowCreated {
        /// The created follow.
        follow: Follow,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// A follow edge was updated.
    #[serde(rename = "feeds.follow.updated")]
    FollowUpdated {
        /// The updated follow.
        follow: Follow,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// A follow edge was deleted.
    #[serde(rename = "feeds.follow.deleted")]
    FollowDeleted {
        /// The deleted follow.
        follow: Follow,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// An activity was added to a feed.
    #[serde(rename = "feeds.activity.added")]
    ActivityAdded {
        /// The feed the activity was added to.
        fid: FeedId,
        /// The added activity.
        activity: Activity,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// An activity was updated.
    #[serde(rename = "feeds.activity.updated")]
    ActivityUpdated {
        /// The feed the activity belongs to.
        fid: FeedId,
        /// The updated activity snapshot.
        activity: Activity,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// An activity was deleted.
    #[serde(rename = "feeds.activity.deleted")]
    ActivityDeleted {
        /// The feed the activity belonged to.
        fid: FeedId,
        /// Snapshot of the deleted activity.
        activity: Activity,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// A reaction was added to an activity.
    #[serde(rename = "feeds.reaction.added")]
    ReactionAdded {
        /// The feed the activity belongs to.
        fid: FeedId,
        /// The added reaction.
        reaction: Reaction,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// A reaction was deleted from an activity.
    #[serde(rename = "feeds.reaction.deleted")]
    ReactionDeleted {
        /// The feed the activity belongs to.
        fid: FeedId,
        /// The deleted reaction.
        reaction: Reaction,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// A comment was added to an activity.
    #[serde(rename = "feeds.comment.added")]
    CommentAdded {
        /// The feed the activity belongs to.
        fid: FeedId,
        /// The added comment.
        comment: Comment,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// A comment was updated.
    #[serde(rename = "feeds.comment.updated")]
    CommentUpdated {
        /// The feed the activity belongs to.
        fid: FeedId,
        /// The updated comment snapshot.
        comment: Comment,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// A comment was deleted.
    #[serde(rename = "feeds.comment.deleted")]
    CommentDeleted {
        /// The feed the activity belongs to.
        fid: FeedId,
        /// Snapshot of the deleted comment.
        comment: Comment,
        /// When the event was emitted.
        #[serde(default)]
        created_at: Option<DateTime<Utc>>,
    },
    /// An event type this client version does not know about.
    ///
    /// Decoded instead of failing so one unrecognized broadcast never
    /// breaks the push stream.
    #[serde(other)]
    Unknown,
}

impl FeedEvent {
    /// Returns the event's kind tag.
    pub fn kind(&self) -> EventKind {
        match self {
            FeedEvent::FollowCreated { .. } => EventKind::FollowCreated,
            FeedEvent::FollowUpdated { .. } => EventKind::FollowUpdated,
            FeedEvent::FollowDeleted { .. } => EventKind::FollowDeleted,
            FeedEvent::ActivityAdded { .. } => EventKind::ActivityAdded,
            FeedEvent::ActivityUpdated { .. } => EventKind::ActivityUpdated,
            FeedEvent::ActivityDeleted { .. } => EventKind::ActivityDeleted,
            FeedEvent::ReactionAdded { .. } => EventKind::ReactionAdded,
            FeedEvent::ReactionDeleted { .. } => EventKind::ReactionDeleted,
            FeedEvent::CommentAdded { .. } => EventKind::CommentAdded,
            FeedEvent::CommentUpdated { .. } => EventKind::CommentUpdated,
            FeedEvent::CommentDeleted { .. } => EventKind::CommentDeleted,
            FeedEvent::Unknown => EventKind::Unknown,
        }
    }

    /// Returns the feeds this event concerns.
    ///
    /// Follow events concern both endpoints; feed-scoped events carry
    /// their feed id explicitly; unknown events concern nothing.
    pub fn feed_ids(&self) -> Vec<FeedId> {
        match self {
            FeedEvent::FollowCreated { follow, .. }
            | FeedEvent::FollowUpdated { follow, .. }
            | FeedEvent::FollowDeleted { follow, .. } => {
                let mut fids = Vec::new();
                if let Some(fid) = follow.source_fid() {
                    fids.push(fid.clone());
                }
                if let Some(fid) = follow.target_fid() {
                    if !fids.contains(fid) {
                        fids.push(fid.clone());
                    }
                }
                fids
            }
            FeedEvent::ActivityAdded { fid, .. }
            | FeedEvent::ActivityUpdated { fid, .. }
            | FeedEvent::ActivityDeleted { fid, .. }
            | FeedEvent::ReactionAdded { fid, .. }
            | FeedEvent::ReactionDeleted { fid, .. }
            | FeedEvent::CommentAdded { fid, .. }
            | FeedEvent::CommentUpdated { fid, .. }
            | FeedEvent::CommentDeleted { fid, .. } => vec![fid.clone()],
            FeedEvent::Unknown => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::{FeedInfo, FollowStatus};
    use crate::ids::UserId;

    fn follow(source: &str, target: &str) -> Follow {
        Follow {
            source: FeedInfo {
                fid: FeedId::parse(source),
                ..FeedInfo::default()
            },
            target: FeedInfo {
                fid: FeedId::parse(target),
                ..FeedInfo::default()
            },
            status: FollowStatus::Accepted,
            created_at: None,
        }
    }

    #[test]
    fn tagged_deserialization() {
        let json = r#"{
            "type": "feeds.reaction.added",
            "fid": "user:jane",
            "reaction": {"activity_id": "a1", "type": "like", "user": "bob"}
        }"#;

        let event: FeedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), EventKind::ReactionAdded);
        match event {
            FeedEvent::ReactionAdded { fid, reaction, .. } => {
                assert_eq!(fid, FeedId::new("user", "jane"));
                assert_eq!(reaction.kind, "like");
                assert_eq!(reaction.user, UserId::new("bob"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn unknown_type_decodes_to_unknown() {
        let json = r#"{"type": "feeds.bookmark.added", "bookmark": {}}"#;
        let event: FeedEvent = serde_json::from_str(json).unwrap();
        assert_eq!(event.kind(), EventKind::Unknown);
    }

    #[test]
    fn follow_event_concerns_both_endpoints() {
        let event = FeedEvent::FollowCreated {
            follow: follow("user:a", "user:b"),
            created_at: None,
        };

        let fids = event.feed_ids();
        assert_eq!(fids.len(), 2);
        assert!(fids.contains(&FeedId::new("user", "a")));
        assert!(fids.contains(&FeedId::new("user", "b")));
    }

    #[test]
    fn self_follow_listed_once() {
        let event = FeedEvent::FollowCreated {
            follow: follow("user:a", "user:a"),
            created_at: None,
        };
        assert_eq!(event.feed_ids().len(), 1);
    }
}
