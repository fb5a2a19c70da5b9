//! JSON payloads exchanged with the forum API.
//!
//! Comment listings arrive as
//! `{"kind": "Listing", "data": {"children": [{"kind": "t1", "data": {...}}]}}`,
//! newest first. Write endpoints called with `api_type=json` answer with
//! `{"json": {"errors": [[type, message, field], ...], "ratelimit": seconds}}`.

use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::client::Comment;
use crate::error::{ApiErrorItem, ApiFailure, ClientError};

/// Raw comment fields as sent by the API
#[derive(Debug, Clone, Deserialize)]
pub struct CommentData {
    pub id: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub subreddit: String,
    #[serde(default)]
    pub created_utc: Option<f64>,
}

impl From<CommentData> for Comment {
    fn from(data: CommentData) -> Self {
        let created_at = data.created_utc.and_then(timestamp_to_datetime);
        Comment {
            id: data.id,
            author: data.author,
            body: data.body,
            forum: data.subreddit,
            created_at,
        }
    }
}

fn timestamp_to_datetime(secs: f64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs.trunc() as i64, 0).single()
}

#[derive(Debug, Deserialize)]
struct Thing {
    kind: String,
    data: Value,
}

#[derive(Debug, Deserialize)]
struct ListingData {
    #[serde(default)]
    children: Vec<Thing>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    data: ListingData,
}

/// Parse a comment listing, returning comments oldest first
pub fn parse_comment_listing(body: &str) -> Result<Vec<Comment>, ClientError> {
    let listing: Listing =
        serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))?;

    let mut comments: Vec<Comment> = listing
        .data
        .children
        .into_iter()
        .filter(|thing| thing.kind == "t1")
        .filter_map(|thing| serde_json::from_value::<CommentData>(thing.data).ok())
        .map(Comment::from)
        .collect();

    comments.reverse();
    Ok(comments)
}

/// Inspect a write response for structured API errors
pub fn check_api_response(body: &str) -> Result<(), ClientError> {
    let value: Value = serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))?;

    let json = match value.get("json") {
        Some(json) => json,
        None => return Ok(()),
    };

    let items: Vec<ApiErrorItem> = json
        .get("errors")
        .and_then(|e| e.as_array())
        .map(|errors| errors.iter().filter_map(parse_error_item).collect())
        .unwrap_or_default();

    if items.is_empty() {
        return Ok(());
    }

    let mut failure = ApiFailure::new(items);
    if let Some(secs) = json.get("ratelimit").and_then(|r| r.as_f64()) {
        if secs.is_finite() && secs > 0.0 {
            failure = failure.with_retry_after(Duration::from_secs_f64(secs));
        }
    }
    Err(ClientError::Api(failure))
}

fn parse_error_item(value: &Value) -> Option<ApiErrorItem> {
    let parts = value.as_array()?;
    let error_type = parts.first()?.as_str()?;
    let message = parts.get(1).and_then(|m| m.as_str()).unwrap_or("");
    let field = parts.get(2).and_then(|f| f.as_str());
    Some(ApiErrorItem::new(error_type, message, field))
}

/// Bearer token grant
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    /// A string code such as `invalid_grant`, or a bare HTTP status
    #[serde(default)]
    pub error: Option<Value>,
}

impl TokenResponse {
    pub fn parse(body: &str) -> Result<Self, ClientError> {
        serde_json::from_str(body).map_err(|e| ClientError::Decode(e.to_string()))
    }

    /// The access token and its lifetime, or the grant error
    pub fn into_token(self) -> Result<(String, Duration), ClientError> {
        match (self.access_token, self.error) {
            (Some(token), None) => Ok((
                token,
                Duration::from_secs(self.expires_in.unwrap_or(3600)),
            )),
            (_, Some(error)) => Err(ClientError::Auth(match error {
                Value::String(code) => code,
                other => other.to_string(),
            })),
            (None, None) => Err(ClientError::Auth("no access token in response".to_string())),
        }
    }
}
