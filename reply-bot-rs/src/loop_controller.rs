use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use crate::backoff::BackoffPolicy;
use crate::client::{Comment, ForumClient};
use crate::config::BotConfig;
use crate::error::{BotError, ClientError, Result};
use crate::ledger::DedupLedger;
use crate::matcher::TriggerMatcher;
use crate::sleeper::{Sleeper, TokioSleeper};
use crate::state::{LoopState, LoopStats};

/// Result of the loop execution
#[derive(Debug, Clone)]
pub enum LoopResult {
    /// Cancellation was requested
    Shutdown {
        /// Counters accumulated before shutdown
        stats: LoopStats,
    },
}

/// What happened to a single comment
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommentOutcome {
    BlockedAuthor,
    AlreadyReplied,
    NoTrigger,
    Replied { reply: String },
}

/// Why streaming stopped without a client failure
enum StreamEnd {
    Cancelled,
    Exhausted,
}

/// Main loop that watches the comment stream and dispatches replies
pub struct ReplyLoop<C: ForumClient> {
    config: Arc<BotConfig>,
    client: C,
    ledger: DedupLedger,
    matcher: TriggerMatcher,
    sleeper: Arc<dyn Sleeper>,
    policy: BackoffPolicy,
    rng: StdRng,
    state: LoopState,
    stats: LoopStats,
}

impl<C: ForumClient> ReplyLoop<C> {
    /// Create a new ReplyLoop; fails if the configuration does not validate
    pub fn new(config: BotConfig, client: C, ledger: DedupLedger) -> Result<Self> {
        config.validate()?;
        let matcher = TriggerMatcher::new(&config.triggers)?;
        let policy = BackoffPolicy::from(&config.settings);

        Ok(Self {
            config: Arc::new(config),
            client,
            ledger,
            matcher,
            sleeper: Arc::new(TokioSleeper),
            policy,
            rng: StdRng::from_entropy(),
            state: LoopState::default(),
            stats: LoopStats::default(),
        })
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_policy(mut self, policy: BackoffPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn config(&self) -> &Arc<BotConfig> {
        &self.config
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> &LoopStats {
        &self.stats
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }

    /// Run until `cancel` fires. Client failures are absorbed with a wait;
    /// any other error ends the loop.
    pub async fn run(&mut self, cancel: &CancellationToken) -> Result<LoopResult> {
        let subscription = self.config.subscription_key();

        loop {
            if cancel.is_cancelled() {
                return Ok(self.terminate());
            }
            self.state = LoopState::Streaming;

            match self.stream(&subscription, cancel).await {
                Ok(StreamEnd::Cancelled) => return Ok(self.terminate()),
                Ok(StreamEnd::Exhausted) => {
                    debug!("Comment stream ended, resubscribing");
                }
                Err(BotError::Client(err)) => {
                    if self.back_off(&err, cancel).await {
                        return Ok(self.terminate());
                    }
                }
                Err(other) => return Err(other),
            }
        }
    }

    /// Subscribe and process comments until the stream fails, ends, or is cancelled
    async fn stream(&mut self, subscription: &str, cancel: &CancellationToken) -> Result<StreamEnd> {
        // Only the first subscription skips the backlog; after a failure the
        // listing is read again and the ledger filters what was answered
        let skip_existing = self.config.settings.skip_existing && self.stats.subscriptions == 0;
        let mut stream = self.client.subscribe(subscription, skip_existing).await?;
        self.stats.subscriptions += 1;

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(StreamEnd::Cancelled),
                next = stream.next_comment() => next?,
            };

            let Some(comment) = next else {
                return Ok(StreamEnd::Exhausted);
            };
            self.stats.comments_seen += 1;
            self.process_comment(&comment).await?;
        }
    }

    /// Apply the author, dedup and trigger filters, replying on a match
    pub async fn process_comment(&mut self, comment: &Comment) -> Result<CommentOutcome> {
        let author = comment.author_name();

        if self.config.is_blocked(author) {
            debug!(comment_id = %comment.id, author, "Blocked author, skipping");
            self.stats.skipped_blocked += 1;
            return Ok(CommentOutcome::BlockedAuthor);
        }

        if self.ledger.contains(&comment.id) {
            debug!(comment_id = %comment.id, "Already replied, skipping");
            self.stats.skipped_replied += 1;
            return Ok(CommentOutcome::AlreadyReplied);
        }

        let Some(trigger) = self.matcher.first_match(&comment.body) else {
            self.stats.skipped_no_trigger += 1;
            return Ok(CommentOutcome::NoTrigger);
        };
        let trigger = trigger.to_string();

        let reply = self
            .config
            .quotes
            .choose(&mut self.rng)
            .cloned()
            .ok_or(BotError::EmptyReplyPool)?;

        self.client.reply(comment, &reply).await?;
        self.stats.replies_sent += 1;
        info!(
            forum = %comment.forum,
            comment_id = %comment.id,
            author,
            trigger = %trigger,
            age_secs = comment.age(Utc::now()).map(|age| age.num_seconds()),
            "Replied to comment"
        );

        self.ledger.add(&comment.id)?;
        Ok(CommentOutcome::Replied { reply })
    }

    /// Sleep off a client failure. Returns true if cancelled while waiting.
    async fn back_off(&mut self, err: &ClientError, cancel: &CancellationToken) -> bool {
        let (state, wait) = self.policy.wait_for(err);
        self.state = state;

        match state {
            LoopState::RateLimitWait => {
                self.stats.rate_limits += 1;
                error!(error = %err, detail = ?err, wait_secs = wait.as_secs(), "Rate limited, backing off");
            }
            _ => {
                self.stats.transient_failures += 1;
                error!(error = %err, detail = ?err, wait_secs = wait.as_secs(), "Client failure, retrying");
            }
        }

        self.wait(wait, cancel).await
    }

    async fn wait(&self, duration: Duration, cancel: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => true,
            _ = self.sleeper.sleep(duration) => false,
        }
    }

    fn terminate(&mut self) -> LoopResult {
        self.state = LoopState::Terminated;
        error!(
            replies_sent = self.stats.replies_sent,
            comments_seen = self.stats.comments_seen,
            "Termination received. Bye!"
        );
        LoopResult::Shutdown {
            stats: self.stats.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::CommentStream;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::Mutex;

    use crate::error::{ApiErrorItem, ApiFailure};
    use crate::stream::{ListingSource, PollingStream};

    /// One step of a scripted stream
    enum Event {
        Comment(Comment),
        Fail(ClientError),
        /// Never yields, like a quiet forum
        Stall,
    }

    /// Mock forum: each subscription replays the next script, and the
    /// cancellation token fires once every script has been consumed
    struct MockForum {
        scripts: Mutex<VecDeque<Vec<Event>>>,
        replies: Arc<Mutex<Vec<(String, String)>>>,
        reply_failures: Mutex<VecDeque<ClientError>>,
        cancel: CancellationToken,
    }

    impl MockForum {
        fn new(scripts: Vec<Vec<Event>>, cancel: CancellationToken) -> Self {
            Self {
                scripts: Mutex::new(scripts.into()),
                replies: Arc::new(Mutex::new(Vec::new())),
                reply_failures: Mutex::new(VecDeque::new()),
                cancel,
            }
        }

        fn failing_replies(self, failures: Vec<ClientError>) -> Self {
            *self.reply_failures.lock().unwrap() = failures.into();
            self
        }
    }

    struct MockStream {
        events: VecDeque<Event>,
        cancel_when_done: Option<CancellationToken>,
    }

    #[async_trait]
    impl CommentStream for MockStream {
        async fn next_comment(&mut self) -> std::result::Result<Option<Comment>, ClientError> {
            match self.events.pop_front() {
                Some(Event::Comment(c)) => Ok(Some(c)),
                Some(Event::Fail(e)) => Err(e),
                Some(Event::Stall) => {
                    std::future::pending::<()>().await;
                    Ok(None)
                }
                None => {
                    if let Some(cancel) = &self.cancel_when_done {
                        cancel.cancel();
                    }
                    Ok(None)
                }
            }
        }
    }

    #[async_trait]
    impl ForumClient for MockForum {
        async fn subscribe(
            &self,
            _subscription: &str,
            _skip_existing: bool,
        ) -> std::result::Result<Box<dyn CommentStream>, ClientError> {
            let mut scripts = self.scripts.lock().unwrap();
            let events = scripts.pop_front().unwrap_or_default();
            let last = scripts.is_empty();
            Ok(Box::new(MockStream {
                events: events.into(),
                cancel_when_done: last.then(|| self.cancel.clone()),
            }))
        }

        async fn reply(
            &self,
            comment: &Comment,
            text: &str,
        ) -> std::result::Result<(), ClientError> {
            if let Some(err) = self.reply_failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.replies
                .lock()
                .unwrap()
                .push((comment.id.clone(), text.to_string()));
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        slept: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.slept.lock().unwrap().push(duration);
        }
    }

    fn rate_limited() -> ClientError {
        ClientError::Api(ApiFailure::new(vec![ApiErrorItem::new(
            "RATELIMIT",
            "you are doing that too much. try again in 5 minutes.",
            Some("ratelimit"),
        )]))
    }

    /// Listing that holds one stale comment, then gains a greeting
    #[derive(Default)]
    struct GrowingListing {
        fetches: Mutex<usize>,
    }

    #[async_trait]
    impl ListingSource for GrowingListing {
        async fn fetch_newest(&self, _subscription: &str) -> std::result::Result<Vec<Comment>, ClientError> {
            let mut fetches = self.fetches.lock().unwrap();
            *fetches += 1;
            let stale = comment("c0", "bob", "old news");
            if *fetches == 1 {
                Ok(vec![stale])
            } else {
                Ok(vec![stale, comment("c1", "alice", "hello")])
            }
        }
    }

    /// Forum whose subscriptions poll a real listing; cancels after the first
    /// successful reply
    struct PollingForum {
        listing: Arc<GrowingListing>,
        sleeper: Arc<RecordingSleeper>,
        skip_flags: Mutex<Vec<bool>>,
        replies: Mutex<Vec<String>>,
        reply_failures: Mutex<VecDeque<ClientError>>,
        cancel: CancellationToken,
    }

    #[async_trait]
    impl ForumClient for PollingForum {
        async fn subscribe(
            &self,
            subscription: &str,
            skip_existing: bool,
        ) -> std::result::Result<Box<dyn CommentStream>, ClientError> {
            self.skip_flags.lock().unwrap().push(skip_existing);
            Ok(Box::new(PollingStream::new(
                Arc::clone(&self.listing),
                self.sleeper.clone(),
                subscription,
                skip_existing,
                Duration::from_secs(16),
            )))
        }

        async fn reply(
            &self,
            comment: &Comment,
            _text: &str,
        ) -> std::result::Result<(), ClientError> {
            if let Some(err) = self.reply_failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            self.replies.lock().unwrap().push(comment.id.clone());
            self.cancel.cancel();
            Ok(())
        }
    }

    fn config(triggers: &[&str], quotes: &[&str], blocked: &[&str]) -> BotConfig {
        BotConfig {
            blocked_users: blocked.iter().map(|s| s.to_string()).collect::<HashSet<_>>(),
            subreddits: vec!["rust".to_string()],
            triggers: triggers.iter().map(|s| s.to_string()).collect(),
            quotes: quotes.iter().map(|s| s.to_string()).collect(),
            settings: Default::default(),
        }
    }

    fn comment(id: &str, author: &str, body: &str) -> Comment {
        Comment::new(id, Some(author), body, "rust")
    }

    fn new_loop(forum: MockForum, config: BotConfig) -> (ReplyLoop<MockForum>, Arc<RecordingSleeper>) {
        let sleeper = Arc::new(RecordingSleeper::default());
        let reply_loop = ReplyLoop::new(config, forum, DedupLedger::in_memory())
            .unwrap()
            .with_sleeper(sleeper.clone())
            .with_rng(StdRng::seed_from_u64(7));
        (reply_loop, sleeper)
    }

    #[tokio::test]
    async fn test_replies_to_matching_comment() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(
            vec![vec![Event::Comment(comment("c1", "alice", "hello world"))]],
            cancel.clone(),
        );
        let replies = Arc::clone(&forum.replies);
        let (mut reply_loop, _) = new_loop(forum, config(&["hello"], &["hi there"], &[]));

        let result = reply_loop.run(&cancel).await.unwrap();

        assert_eq!(
            *replies.lock().unwrap(),
            vec![("c1".to_string(), "hi there".to_string())]
        );
        assert!(reply_loop.ledger().contains("c1"));
        assert_eq!(reply_loop.state(), LoopState::Terminated);
        let LoopResult::Shutdown { stats } = result;
        assert_eq!(stats.replies_sent, 1);
        assert_eq!(stats.comments_seen, 1);
    }

    #[tokio::test]
    async fn test_blocked_author_never_answered() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(
            vec![vec![Event::Comment(comment("c1", "alice", "hello world"))]],
            cancel.clone(),
        );
        let replies = Arc::clone(&forum.replies);
        let (mut reply_loop, _) = new_loop(forum, config(&["hello"], &["hi there"], &["alice"]));

        reply_loop.run(&cancel).await.unwrap();

        assert!(replies.lock().unwrap().is_empty());
        assert!(!reply_loop.ledger().contains("c1"));
        assert_eq!(reply_loop.stats().skipped_blocked, 1);
    }

    #[tokio::test]
    async fn test_deleted_author_matches_sentinel() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(Vec::new(), cancel.clone());
        let (mut reply_loop, _) = new_loop(forum, config(&["hello"], &["hi"], &["[deleted]"]));

        let deleted = Comment::new("c1", None, "hello", "rust");
        assert_eq!(
            reply_loop.process_comment(&deleted).await.unwrap(),
            CommentOutcome::BlockedAuthor
        );
    }

    #[tokio::test]
    async fn test_non_matching_comment_ignored() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(Vec::new(), cancel.clone());
        let (mut reply_loop, _) = new_loop(forum, config(&["hello"], &["hi"], &[]));

        let outcome = reply_loop
            .process_comment(&comment("c1", "bob", "goodbye"))
            .await
            .unwrap();
        assert_eq!(outcome, CommentOutcome::NoTrigger);
        assert!(reply_loop.ledger().is_empty());
    }

    #[tokio::test]
    async fn test_same_comment_answered_once() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(
            vec![vec![
                Event::Comment(comment("c1", "alice", "Hello")),
                Event::Comment(comment("c1", "alice", "Hello")),
            ]],
            cancel.clone(),
        );
        let replies = Arc::clone(&forum.replies);
        let (mut reply_loop, _) = new_loop(forum, config(&["hello"], &["hi"], &[]));

        reply_loop.run(&cancel).await.unwrap();

        assert_eq!(replies.lock().unwrap().len(), 1);
        assert_eq!(reply_loop.stats().skipped_replied, 1);
    }

    #[tokio::test]
    async fn test_failed_reply_not_recorded() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(Vec::new(), cancel.clone())
            .failing_replies(vec![ClientError::Transport("reset".into())]);
        let (mut reply_loop, _) = new_loop(forum, config(&["hello"], &["hi"], &[]));

        let result = reply_loop
            .process_comment(&comment("c1", "alice", "hello"))
            .await;

        assert!(matches!(result, Err(BotError::Client(ClientError::Transport(_)))));
        assert!(!reply_loop.ledger().contains("c1"));
    }

    #[tokio::test]
    async fn test_transient_failure_retries_after_two_seconds() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(
            vec![
                vec![Event::Fail(ClientError::Transport("connection reset".into()))],
                vec![Event::Comment(comment("c2", "bob", "hello again"))],
            ],
            cancel.clone(),
        );
        let replies = Arc::clone(&forum.replies);
        let (mut reply_loop, sleeper) = new_loop(forum, config(&["hello"], &["hi"], &[]));

        reply_loop.run(&cancel).await.unwrap();

        assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(2)]);
        assert_eq!(replies.lock().unwrap().len(), 1);
        assert_eq!(reply_loop.stats().transient_failures, 1);
        assert_eq!(reply_loop.stats().subscriptions, 2);
    }

    #[tokio::test]
    async fn test_rate_limit_waits_parsed_duration() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(
            vec![
                vec![Event::Comment(comment("c1", "alice", "hello"))],
                vec![Event::Comment(comment("c1", "alice", "hello"))],
            ],
            cancel.clone(),
        )
        .failing_replies(vec![rate_limited()]);
        let replies = Arc::clone(&forum.replies);
        let (mut reply_loop, sleeper) = new_loop(forum, config(&["hello"], &["hi"], &[]));

        reply_loop.run(&cancel).await.unwrap();

        assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(360)]);
        assert_eq!(reply_loop.stats().rate_limits, 1);
        // Redelivered after the wait, answered exactly once
        assert_eq!(replies.lock().unwrap().len(), 1);
        assert!(reply_loop.ledger().contains("c1"));
    }

    #[tokio::test]
    async fn test_rate_limit_without_hint_waits_default() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(
            vec![
                vec![Event::Fail(ClientError::Api(ApiFailure::new(vec![
                    ApiErrorItem::new("RATELIMIT", "slow down", None),
                ])))],
                Vec::new(),
            ],
            cancel.clone(),
        );
        let (mut reply_loop, sleeper) = new_loop(forum, config(&["hello"], &["hi"], &[]));

        reply_loop.run(&cancel).await.unwrap();

        assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(60)]);
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let forum = MockForum::new(Vec::new(), cancel.clone());
        let (mut reply_loop, _) = new_loop(forum, config(&["hello"], &["hi"], &[]));

        let LoopResult::Shutdown { stats } = reply_loop.run(&cancel).await.unwrap();
        assert_eq!(stats.subscriptions, 0);
        assert_eq!(reply_loop.state(), LoopState::Terminated);
    }

    #[tokio::test]
    async fn test_ledger_failure_propagates() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("replied.txt");
        let ledger = DedupLedger::load(&path).unwrap();
        // Replace the file with a directory so the append fails
        std::fs::remove_file(&path).unwrap();
        std::fs::create_dir(&path).unwrap();

        let cancel = CancellationToken::new();
        let forum = MockForum::new(
            vec![vec![Event::Comment(comment("c1", "alice", "hello"))]],
            cancel.clone(),
        );
        let mut reply_loop = ReplyLoop::new(config(&["hello"], &["hi"], &[]), forum, ledger)
            .unwrap()
            .with_sleeper(Arc::new(RecordingSleeper::default()));

        let result = reply_loop.run(&cancel).await;
        assert!(matches!(result, Err(BotError::LedgerError(_))));
    }

    #[tokio::test]
    async fn test_reply_selection_covers_pool() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(Vec::new(), cancel.clone());
        let replies = Arc::clone(&forum.replies);
        let (mut reply_loop, _) = new_loop(forum, config(&["hello"], &["a", "b", "c"], &[]));

        for i in 0..300 {
            reply_loop
                .process_comment(&comment(&format!("c{}", i), "alice", "hello"))
                .await
                .unwrap();
        }

        let mut counts: HashMap<String, usize> = HashMap::new();
        for (_, text) in replies.lock().unwrap().iter() {
            *counts.entry(text.clone()).or_default() += 1;
        }
        for quote in ["a", "b", "c"] {
            assert!(counts.get(quote).copied().unwrap_or(0) > 0, "never picked {}", quote);
        }
    }

    #[test]
    fn test_rejects_empty_reply_pool() {
        let forum = MockForum::new(Vec::new(), CancellationToken::new());
        let result = ReplyLoop::new(config(&["hello"], &[], &[]), forum, DedupLedger::in_memory());
        assert!(matches!(result, Err(BotError::EmptyReplyPool)));
    }
    #[tokio::test]
    async fn test_rate_limited_comment_redelivered_after_resubscribe() {
        let cancel = CancellationToken::new();
        let sleeper = Arc::new(RecordingSleeper::default());
        let forum = PollingForum {
            listing: Arc::new(GrowingListing::default()),
            sleeper: sleeper.clone(),
            skip_flags: Mutex::new(Vec::new()),
            replies: Mutex::new(Vec::new()),
            reply_failures: Mutex::new(vec![rate_limited()].into()),
            cancel: cancel.clone(),
        };
        let mut reply_loop = ReplyLoop::new(
            config(&["hello"], &["hi"], &[]),
            forum,
            DedupLedger::in_memory(),
        )
        .unwrap()
        .with_sleeper(sleeper.clone());

        reply_loop.run(&cancel).await.unwrap();

        assert_eq!(*reply_loop.client.replies.lock().unwrap(), vec!["c1".to_string()]);
        // Backlog is skipped once per process, not once per subscription
        assert_eq!(*reply_loop.client.skip_flags.lock().unwrap(), vec![true, false]);
        assert_eq!(*sleeper.slept.lock().unwrap(), vec![Duration::from_secs(360)]);
        assert_eq!(reply_loop.stats().rate_limits, 1);
        assert_eq!(reply_loop.stats().subscriptions, 2);
        assert!(reply_loop.ledger().contains("c1"));
        assert!(!reply_loop.ledger().contains("c0"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_rate_limit_wait() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(
            vec![vec![Event::Comment(comment("c1", "alice", "hello"))]],
            cancel.clone(),
        )
        .failing_replies(vec![rate_limited()]);
        let mut reply_loop =
            ReplyLoop::new(config(&["hello"], &["hi"], &[]), forum, DedupLedger::in_memory())
                .unwrap();

        let start = tokio::time::Instant::now();
        let (result, _) = tokio::join!(reply_loop.run(&cancel), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            cancel.cancel();
        });

        let LoopResult::Shutdown { stats } = result.unwrap();
        assert_eq!(stats.rate_limits, 1);
        assert_eq!(stats.replies_sent, 0);
        assert!(start.elapsed() < Duration::from_secs(360));
        assert_eq!(reply_loop.state(), LoopState::Terminated);
        assert!(!reply_loop.ledger().contains("c1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_interrupts_quiet_stream() {
        let cancel = CancellationToken::new();
        let forum = MockForum::new(vec![vec![Event::Stall]], cancel.clone());
        let mut reply_loop =
            ReplyLoop::new(config(&["hello"], &["hi"], &[]), forum, DedupLedger::in_memory())
                .unwrap();

        let (result, _) = tokio::join!(reply_loop.run(&cancel), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel.cancel();
        });

        let LoopResult::Shutdown { stats } = result.unwrap();
        assert_eq!(stats.comments_seen, 0);
        assert_eq!(stats.subscriptions, 1);
        assert_eq!(reply_loop.state(), LoopState::Terminated);
    }
}
