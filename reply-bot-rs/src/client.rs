use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::error::ClientError;

/// Author name used when a comment's author is missing or deleted
pub const DELETED_AUTHOR: &str = "[deleted]";

/// A comment delivered by the forum stream
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Unique within the forum's comment namespace
    pub id: String,
    pub author: Option<String>,
    pub body: String,
    /// Forum the comment was posted in
    pub forum: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl Comment {
    pub fn new(id: &str, author: Option<&str>, body: &str, forum: &str) -> Self {
        Self {
            id: id.to_string(),
            author: author.map(str::to_string),
            body: body.to_string(),
            forum: forum.to_string(),
            created_at: None,
        }
    }

    /// Author name, or the deleted sentinel
    pub fn author_name(&self) -> &str {
        match self.author.as_deref() {
            Some(name) if !name.is_empty() => name,
            _ => DELETED_AUTHOR,
        }
    }

    /// Time between posting and `now`, when the posting time is known
    pub fn age(&self, now: DateTime<Utc>) -> Option<Duration> {
        self.created_at.map(|created| now - created)
    }
}

/// A live, blocking sequence of new comments
#[async_trait]
pub trait CommentStream: Send {
    /// Wait for the next comment. `Ok(None)` means the stream has ended.
    async fn next_comment(&mut self) -> Result<Option<Comment>, ClientError>;
}

/// Trait for forum API clients (real HTTP or fake)
#[async_trait]
pub trait ForumClient: Send + Sync {
    /// Subscribe to new comments across a `+`-joined set of forums
    async fn subscribe(
        &self,
        subscription: &str,
        skip_existing: bool,
    ) -> Result<Box<dyn CommentStream>, ClientError>;

    /// Post `text` as a reply to `comment`
    async fn reply(&self, comment: &Comment, text: &str) -> Result<(), ClientError>;
}
