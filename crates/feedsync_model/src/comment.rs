//! Comments on activities.

use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A comment on an activity, optionally a reply to another comment.
///
/// Siblings (same activity, same parent) are ordered by creation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    /// Comment id.
    pub id: String,
    /// Id of the activity this comment belongs to.
    pub activity_id: String,
    /// Parent comment id for replies; `None` for top-level comments.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Authoring user.
    pub user: UserId,
    /// Comment text.
    #[serde(default)]
    pub text: Option<String>,
    /// When the comment was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    /// True when `other` is a sibling: same activity and same parent.
    pub fn same_thread(&self, other: &Comment) -> bool {
        self.activity_id == other.activity_id && self.parent_id == other.parent_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn siblings_share_activity_and_parent() {
        let comment = |id: &str, parent: Option<&str>| Comment {
            id: id.into(),
            activity_id: "a1".into(),
            parent_id: parent.map(Into::into),
            user: UserId::new("alice"),
            text: None,
            created_at: None,
        };

        assert!(comment("c1", None).same_thread(&comment("c2", None)));
        assert!(comment("c3", Some("c1")).same_thread(&comment("c4", Some("c1"))));
        assert!(!comment("c1", None).same_thread(&comment("c3", Some("c1"))));
    }
}
