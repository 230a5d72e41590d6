use chrono::{DateTime, Utc};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// The account's current vote on an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoteState {
    Upvoted,
    Downvoted,
    #[default]
    None,
}

impl From<Option<bool>> for VoteState {
    /// Reddit reports votes as `likes`: `true`, `false` or `null`.
    fn from(likes: Option<bool>) -> Self {
        match likes {
            Some(true) => VoteState::Upvoted,
            Some(false) => VoteState::Downvoted,
            None => VoteState::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Post {
    pub id: String,
    pub subreddit: String,
    pub title: String,
    pub url: String,
    pub created_utc: DateTime<Utc>,
    pub vote: VoteState,
}

#[derive(Debug, Clone)]
pub struct Comment {
    pub id: String,
    pub subreddit: String,
    pub body: String,
    pub created_utc: DateTime<Utc>,
    pub vote: VoteState,
}

/// A post or comment authored by the tracked account.
#[derive(Debug, Clone)]
pub enum Item {
    Post(Post),
    Comment(Comment),
}

impl Item {
    pub fn id(&self) -> &str {
        match self {
            Item::Post(post) => &post.id,
            Item::Comment(comment) => &comment.id,
        }
    }

    pub fn subreddit(&self) -> &str {
        match self {
            Item::Post(post) => &post.subreddit,
            Item::Comment(comment) => &comment.subreddit,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            Item::Post(post) => post.created_utc,
            Item::Comment(comment) => comment.created_utc,
        }
    }

    pub fn vote(&self) -> VoteState {
        match self {
            Item::Post(post) => post.vote,
            Item::Comment(comment) => comment.vote,
        }
    }

    /// Reddit "fullname": the type prefix (`t1` comment, `t3` link) joined to the id.
    pub fn fullname(&self) -> String {
        match self {
            Item::Post(post) => format!("t3_{}", post.id),
            Item::Comment(comment) => format!("t1_{}", comment.id),
        }
    }

    pub fn is_comment(&self) -> bool {
        matches!(self, Item::Comment(_))
    }
}

/// Which slice of the account's history is pulled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemCategory {
    Comments,
    Submissions,
    Overview,
}

impl ItemCategory {
    /// Path segment under `/user/{name}/`.
    pub fn as_path(&self) -> &'static str {
        match self {
            ItemCategory::Comments => "comments",
            ItemCategory::Submissions => "submitted",
            ItemCategory::Overview => "overview",
        }
    }
}

impl FromStr for ItemCategory {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "comments" => Ok(ItemCategory::Comments),
            "submitted" => Ok(ItemCategory::Submissions),
            "overview" => Ok(ItemCategory::Overview),
            other => Err(ConfigError::InvalidValue {
                field: "item".to_string(),
                value: other.to_string(),
            }),
        }
    }
}

impl fmt::Display for ItemCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_path())
    }
}

/// Why the retention filter left an item alone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeepReason {
    TooRecent,
    PastEditWindow,
    WhitelistedSubreddit,
    WhitelistedId,
    NotEditable,
}

impl fmt::Display for KeepReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            KeepReason::TooRecent => "newer than the retention window",
            KeepReason::PastEditWindow => "older than the edit window",
            KeepReason::WhitelistedSubreddit => "subreddit is whitelisted",
            KeepReason::WhitelistedId => "id is whitelisted",
            KeepReason::NotEditable => "posts cannot be edited",
        };
        f.write_str(reason)
    }
}

/// Outcome of the retention filter for one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Keep(KeepReason),
    EditOnly(String),
    EditAndDelete(String),
    DeleteOnly,
}

impl Decision {
    pub fn is_keep(&self) -> bool {
        matches!(self, Decision::Keep(_))
    }

    pub fn replacement_text(&self) -> Option<&str> {
        match self {
            Decision::EditOnly(text) | Decision::EditAndDelete(text) => Some(text),
            Decision::Keep(_) | Decision::DeleteOnly => None,
        }
    }

    pub fn deletes(&self) -> bool {
        matches!(self, Decision::EditAndDelete(_) | Decision::DeleteOnly)
    }

    /// Same variant, ignoring payloads.
    pub fn same_kind(&self, other: &Decision) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }
}
