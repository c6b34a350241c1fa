//! Activities and reactions.

use crate::ids::UserId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A typed, scored annotation attached to an activity by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reaction {
    /// Id of the activity this reaction belongs to.
    pub activity_id: String,
    /// Reaction type (e.g. `"like"`, `"heart"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Reacting user.
    pub user: UserId,
    /// Score contributed by this reaction.
    #[serde(default = "default_score")]
    pub score: i64,
    /// When the reaction was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Application-defined payload.
    #[serde(default)]
    pub custom: serde_json::Value,
}

fn default_score() -> i64 {
    1
}

impl Reaction {
    /// True when `other` denotes the same reaction: same activity, type,
    /// and user.
    pub fn same_reaction(&self, other: &Reaction) -> bool {
        self.activity_id == other.activity_id && self.kind == other.kind && self.user == other.user
    }
}

/// Per-type aggregate over an activity's reactions.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReactionGroup {
    /// Best-effort count of reactions of this type.
    pub count: u64,
    /// Sum of reaction scores.
    pub sum_score: i64,
    /// Earliest reaction time seen.
    #[serde(default)]
    pub first_reaction_at: Option<DateTime<Utc>>,
    /// Latest reaction time seen.
    #[serde(default)]
    pub last_reaction_at: Option<DateTime<Utc>>,
}

/// A single post within a feed.
///
/// Invariant: `own_reactions` holds exactly the members of
/// `latest_reactions` authored by the connected user. `latest_reactions`
/// is capped server-side, so `reaction_groups` counts are best-effort
/// aggregates rather than list lengths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity id.
    pub id: String,
    /// Authoring user.
    pub user: UserId,
    /// Text payload.
    #[serde(default)]
    pub text: Option<String>,
    /// When the activity was created.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Most recent reactions, capped server-side.
    #[serde(default)]
    pub latest_reactions: Vec<Reaction>,
    /// Reactions authored by the connected user.
    #[serde(default)]
    pub own_reactions: Vec<Reaction>,
    /// Per-type reaction aggregates.
    #[serde(default)]
    pub reaction_groups: HashMap<String, ReactionGroup>,
    /// Number of comments on this activity.
    #[serde(default)]
    pub comment_count: u64,
    /// Application-defined payload.
    #[serde(default)]
    pub custom: serde_json::Value,
}

impl Activity {
    /// Creates a minimal activity, useful in tests and fixtures.
    pub fn new(id: impl Into<String>, user: impl Into<UserId>) -> Self {
        Self {
            id: id.into(),
            user: user.into(),
            text: None,
            created_at: None,
            latest_reactions: Vec::new(),
            own_reactions: Vec::new(),
            reaction_groups: HashMap::new(),
            comment_count: 0,
            custom: serde_json::Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reaction_identity() {
        let like = Reaction {
            activity_id: "a1".into(),
            kind: "like".into(),
            user: UserId::new("alice"),
            score: 1,
            created_at: None,
            custom: serde_json::Value::Null,
        };

        let mut other = like.clone();
        assert!(like.same_reaction(&other));

        other.kind = "heart".into();
        assert!(!like.same_reaction(&other));
    }

    #[test]
    fn reaction_kind_uses_wire_name_type() {
        let json = r#"{"activity_id":"a1","type":"like","user":"alice"}"#;
        let reaction: Reaction = serde_json::from_str(json).unwrap();
        assert_eq!(reaction.kind, "like");
        assert_eq!(reaction.score, 1);
    }

    #[test]
    fn activity_deserializes_with_defaults() {
        let json = r#"{"id":"a1","user":"bob"}"#;
        let activity: Activity = serde_json::from_str(json).unwrap();
        assert!(activity.latest_reactions.is_empty());
        assert!(activity.reaction_groups.is_empty());
        assert_eq!(activity.comment_count, 0);
    }
}
