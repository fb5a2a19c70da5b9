//! Production forum client speaking the Reddit OAuth API over HTTPS.

use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::client::{Comment, CommentStream, ForumClient};
use crate::config::Credentials;
use crate::error::{ApiErrorItem, ApiFailure, ClientError, RATE_LIMIT_ERROR_TYPE};
use crate::listing::{check_api_response, parse_comment_listing, TokenResponse};
use crate::sleeper::Sleeper;
use crate::stream::{ListingSource, PollingStream};

const TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";
const API_BASE: &str = "https://oauth.reddit.com";
const LISTING_LIMIT: u32 = 100;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// Refresh the token this long before it actually expires
const TOKEN_MARGIN: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

impl AccessToken {
    fn is_fresh(&self) -> bool {
        Instant::now() + TOKEN_MARGIN < self.expires_at
    }
}

/// Authenticated HTTP access to the API
pub struct RedditApi {
    http: Client,
    credentials: Credentials,
    api_base: String,
    token_url: String,
    token: Mutex<Option<AccessToken>>,
}

impl RedditApi {
    pub fn new(credentials: Credentials) -> Result<Self, ClientError> {
        Self::with_endpoints(credentials, API_BASE, TOKEN_URL)
    }

    /// Point the client at other endpoints (e.g. a local test server)
    pub fn with_endpoints(
        credentials: Credentials,
        api_base: &str,
        token_url: &str,
    ) -> Result<Self, ClientError> {
        let http = Client::builder()
            .user_agent(credentials.user_agent.clone())
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            credentials,
            api_base: api_base.trim_end_matches('/').to_string(),
            token_url: token_url.to_string(),
            token: Mutex::new(None),
        })
    }

    async fn access_token(&self) -> Result<String, ClientError> {
        let mut guard = self.token.lock().await;
        if let Some(token) = guard.as_ref().filter(|t| t.is_fresh()) {
            return Ok(token.value.clone());
        }

        let response = self
            .http
            .post(&self.token_url)
            .basic_auth(
                &self.credentials.client_id,
                Some(&self.credentials.client_secret),
            )
            .form(&[
                ("grant_type", "password"),
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
            ])
            .send()
            .await?;

        if !carries_grant_body(response.status()) {
            return Err(Self::error_for(response).await);
        }
        let body = response.text().await?;

        let (value, lifetime) = TokenResponse::parse(&body)?.into_token()?;
        info!(username = %self.credentials.username, "Obtained API access token");

        *guard = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    async fn invalidate_token(&self) {
        *self.token.lock().await = None;
    }

    /// Turn a non-success response into the matching client error
    async fn error_for(response: Response) -> ClientError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        let body = response.text().await.unwrap_or_default();
        status_error(status, retry_after, body)
    }

    /// Send an authorized request, re-authenticating once on 401
    async fn send_authorized<F>(&self, build: F) -> Result<String, ClientError>
    where
        F: Fn(&Client, &str) -> reqwest::RequestBuilder + Send + Sync,
    {
        for attempt in 0..2 {
            let token = self.access_token().await?;
            let response = build(&self.http, &token).send().await?;

            if response.status() == StatusCode::UNAUTHORIZED && attempt == 0 {
                debug!("Access token rejected, re-authenticating");
                self.invalidate_token().await;
                continue;
            }
            if !response.status().is_success() {
                return Err(Self::error_for(response).await);
            }
            return Ok(response.text().await?);
        }

        Err(ClientError::Auth("access token rejected twice".to_string()))
    }
}

#[async_trait]
impl ListingSource for RedditApi {
    async fn fetch_newest(&self, subscription: &str) -> Result<Vec<Comment>, ClientError> {
        let url = format!("{}/r/{}/comments", self.api_base, subscription);
        let limit = LISTING_LIMIT.to_string();

        let body = self
            .send_authorized(|http, token| {
                http.get(&url)
                    .bearer_auth(token)
                    .query(&[("limit", limit.as_str()), ("raw_json", "1")])
            })
            .await?;

        parse_comment_listing(&body)
    }
}

/// Token grants answer 400/401 with a JSON error body worth decoding;
/// anything else unsuccessful is a plain HTTP failure
fn carries_grant_body(status: StatusCode) -> bool {
    status.is_success() || status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED
}

/// 429 becomes a rate-limit failure so the loop waits it out
fn status_error(status: StatusCode, retry_after: Option<Duration>, body: String) -> ClientError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let mut failure =
            ApiFailure::new(vec![ApiErrorItem::new(RATE_LIMIT_ERROR_TYPE, &body, None)]);
        if let Some(wait) = retry_after {
            failure = failure.with_retry_after(wait);
        }
        return ClientError::Api(failure);
    }

    ClientError::Status {
        status: status.as_u16(),
        body,
    }
}

/// [`ForumClient`] backed by [`RedditApi`]
pub struct RedditClient {
    api: Arc<RedditApi>,
    sleeper: Arc<dyn Sleeper>,
    poll_max_delay: Duration,
}

impl RedditClient {
    pub fn new(api: RedditApi, sleeper: Arc<dyn Sleeper>, poll_max_delay: Duration) -> Self {
        Self {
            api: Arc::new(api),
            sleeper,
            poll_max_delay,
        }
    }
}

#[async_trait]
impl ForumClient for RedditClient {
    async fn subscribe(
        &self,
        subscription: &str,
        skip_existing: bool,
    ) -> Result<Box<dyn CommentStream>, ClientError> {
        // Authenticate up front so credential problems surface on subscribe
        self.api.access_token().await?;
        info!(subscription, "Subscribed to comment stream");

        Ok(Box::new(PollingStream::new(
            Arc::clone(&self.api),
            Arc::clone(&self.sleeper),
            subscription,
            skip_existing,
            self.poll_max_delay,
        )))
    }

    async fn reply(&self, comment: &Comment, text: &str) -> Result<(), ClientError> {
        let url = format!("{}/api/comment", self.api.api_base);
        let thing_id = format!("t1_{}", comment.id);

        let body = self
            .api
            .send_authorized(|http, token| {
                http.post(&url).bearer_auth(token).form(&[
                    ("api_type", "json"),
                    ("thing_id", thing_id.as_str()),
                    ("text", text),
                ])
            })
            .await?;

        check_api_response(&body)
    }
}
