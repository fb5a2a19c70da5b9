//! Turns a polled "newest comments" listing into a stream of unseen comments.
//!
//! The listing endpoint only ever returns the latest page, so the stream keeps
//! a bounded window of ids it has already yielded and backs off while a forum
//! is quiet.

use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::client::{Comment, CommentStream};
use crate::error::ClientError;
use crate::sleeper::Sleeper;

/// How many recent comment ids are remembered
pub const SEEN_WINDOW: usize = 301;

const INITIAL_POLL_DELAY: Duration = Duration::from_secs(1);

/// Anything that can return the newest comments for a subscription
#[async_trait]
pub trait ListingSource: Send + Sync {
    /// Newest comments, oldest first
    async fn fetch_newest(&self, subscription: &str) -> Result<Vec<Comment>, ClientError>;
}

/// Fixed-capacity set that forgets the oldest id first
#[derive(Debug, Default)]
struct SeenIds {
    order: VecDeque<String>,
    ids: HashSet<String>,
}

impl SeenIds {
    /// Returns false if `id` was already present
    fn insert(&mut self, id: &str) -> bool {
        if self.ids.contains(id) {
            return false;
        }
        if self.order.len() >= SEEN_WINDOW {
            if let Some(oldest) = self.order.pop_front() {
                self.ids.remove(&oldest);
            }
        }
        self.order.push_back(id.to_string());
        self.ids.insert(id.to_string());
        true
    }
}

/// Comment stream built on repeated listing polls
pub struct PollingStream<S: ListingSource> {
    source: Arc<S>,
    sleeper: Arc<dyn Sleeper>,
    subscription: String,
    seen: SeenIds,
    pending: VecDeque<Comment>,
    skip_next_batch: bool,
    delay: Duration,
    max_delay: Duration,
}

impl<S: ListingSource> PollingStream<S> {
    pub fn new(
        source: Arc<S>,
        sleeper: Arc<dyn Sleeper>,
        subscription: &str,
        skip_existing: bool,
        max_delay: Duration,
    ) -> Self {
        Self {
            source,
            sleeper,
            subscription: subscription.to_string(),
            seen: SeenIds::default(),
            pending: VecDeque::new(),
            skip_next_batch: skip_existing,
            delay: INITIAL_POLL_DELAY,
            max_delay: max_delay.max(INITIAL_POLL_DELAY),
        }
    }

    fn reset_delay(&mut self) {
        self.delay = INITIAL_POLL_DELAY;
    }

    fn grow_delay(&mut self) {
        self.delay = (self.delay * 2).min(self.max_delay);
    }
}

#[async_trait]
impl<S: ListingSource + 'static> CommentStream for PollingStream<S> {
    async fn next_comment(&mut self) -> Result<Option<Comment>, ClientError> {
        loop {
            if let Some(comment) = self.pending.pop_front() {
                return Ok(Some(comment));
            }

            let batch = self.source.fetch_newest(&self.subscription).await?;
            let fresh: Vec<Comment> = batch
                .into_iter()
                .filter(|c| self.seen.insert(&c.id))
                .collect();

            if self.skip_next_batch {
                self.skip_next_batch = false;
                debug!(count = fresh.len(), "Skipping existing comments");
                continue;
            }

            if fresh.is_empty() {
                debug!(delay_ms = self.delay.as_millis() as u64, "No new comments");
                self.sleeper.sleep(self.delay).await;
                self.grow_delay();
            } else {
                debug!(count = fresh.len(), "Fetched new comments");
                self.reset_delay();
                self.pending.extend(fresh);
            }
        }
    }
}
