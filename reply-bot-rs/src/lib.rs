//! Reply Bot: watches forum comment streams and answers comments that
//! mention a trigger phrase with a randomly chosen canned reply.
//!
//! This crate provides the reply loop and its collaborators: configuration,
//! trigger matching, the replied-comment ledger, and the forum API client.

pub mod backoff;
pub mod client;
pub mod config;
pub mod error;
pub mod ledger;
pub mod listing;
pub mod loop_controller;
pub mod matcher;
pub mod reddit;
pub mod sleeper;
pub mod state;
pub mod stream;

pub use client::{Comment, CommentStream, ForumClient};
pub use config::{BotConfig, Credentials, LoggingConfig};
pub use error::{BotError, ClientError, Result};
pub use ledger::DedupLedger;
pub use loop_controller::{CommentOutcome, LoopResult, ReplyLoop};
pub use matcher::TriggerMatcher;
