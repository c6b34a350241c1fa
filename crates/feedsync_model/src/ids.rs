//! Typed identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies a feed by its group and id, rendered on the wire as
/// `"group:id"` (the "fid" form).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct FeedId {
    /// Feed group (e.g. `"user"`, `"timeline"`).
    pub group: String,
    /// Feed id within the group.
    pub id: String,
}

impl FeedId {
    /// Creates a new feed id.
    pub fn new(group: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            group: group.into(),
            id: id.into(),
        }
    }

    /// Returns the `"group:id"` form.
    pub fn fid(&self) -> String {
        format!("{}:{}", self.group, self.id)
    }

    /// Parses a `"group:id"` string.
    ///
    /// Returns `None` when the separator is missing or either side is empty.
    pub fn parse(fid: &str) -> Option<Self> {
        let (group, id) = fid.split_once(':')?;
        if group.is_empty() || id.is_empty() {
            return None;
        }
        Some(Self::new(group, id))
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.group, self.id)
    }
}

impl TryFrom<String> for FeedId {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid fid: {value:?}"))
    }
}

impl From<FeedId> for String {
    fn from(value: FeedId) -> Self {
        value.fid()
    }
}

/// Identifies a user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(pub String);

impl UserId {
    /// Creates a new user id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(value: &str) -> Self {
        Self(value.to_owned())
    }
}

impl From<String> for UserId {
    fn from(value: String) -> Self {
        Self(value)
    }
}
