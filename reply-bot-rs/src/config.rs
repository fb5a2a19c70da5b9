use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{BotError, Result};
use crate::matcher::TriggerMatcher;

/// Default location of the bot configuration
pub const DEFAULT_BOT_CONFIG_PATH: &str = "./bot_config.json";

/// Default location of the logging configuration
pub const DEFAULT_LOGGING_CONFIG_PATH: &str = "./logging.toml";

/// Timing knobs for the reply loop and the comment stream
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoopSettings {
    /// Seconds to wait after a transient client failure
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: u64,
    /// Seconds to wait after a rate limit with no usable hint
    #[serde(default = "default_rate_limit_default_secs")]
    pub rate_limit_default_secs: u64,
    /// Do not reply to comments already present when subscribing
    #[serde(default = "default_skip_existing")]
    pub skip_existing: bool,
    /// Upper bound of the idle poll delay
    #[serde(default = "default_poll_max_delay_secs")]
    pub poll_max_delay_secs: u64,
}

fn default_retry_delay_secs() -> u64 {
    2
}

fn default_rate_limit_default_secs() -> u64 {
    60
}

fn default_skip_existing() -> bool {
    true
}

fn default_poll_max_delay_secs() -> u64 {
    16
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            retry_delay_secs: default_retry_delay_secs(),
            rate_limit_default_secs: default_rate_limit_default_secs(),
            skip_existing: default_skip_existing(),
            poll_max_delay_secs: default_poll_max_delay_secs(),
        }
    }
}

impl LoopSettings {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_secs(self.retry_delay_secs)
    }

    pub fn rate_limit_default(&self) -> Duration {
        Duration::from_secs(self.rate_limit_default_secs)
    }

    pub fn poll_max_delay(&self) -> Duration {
        Duration::from_secs(self.poll_max_delay_secs)
    }
}

/// Bot configuration: who to ignore, where to listen, what to look for,
/// and what to answer with. Immutable once loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Authors whose comments are never answered
    #[serde(alias = "blocked_authors")]
    pub blocked_users: HashSet<String>,
    /// Forums to monitor
    #[serde(alias = "forums")]
    pub subreddits: Vec<String>,
    /// Case-insensitive regular expressions
    pub triggers: Vec<String>,
    /// Reply pool, one is picked at random per match
    #[serde(alias = "replies")]
    pub quotes: Vec<String>,
    #[serde(default)]
    pub settings: LoopSettings,
}

impl BotConfig {
    /// Load configuration from a JSON file, or TOML if the extension says so
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BotError::ConfigError(format!("{}: {}", path.display(), e)))?;

        let is_toml = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("toml"));
        if is_toml {
            Self::from_toml_str(&content)
        } else {
            Self::from_json_str(&content)
        }
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(content).map_err(|e| BotError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| BotError::ConfigError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the reply loop cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.quotes.is_empty() {
            return Err(BotError::EmptyReplyPool);
        }
        if self.subreddits.iter().all(|s| s.trim().is_empty()) {
            return Err(BotError::ConfigError(
                "at least one forum must be configured".to_string(),
            ));
        }
        TriggerMatcher::new(&self.triggers)?;
        Ok(())
    }

    /// Forum names combined into one subscription, e.g. `rust+programming`
    pub fn subscription_key(&self) -> String {
        self.subreddits
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn is_blocked(&self, author: &str) -> bool {
        self.blocked_users.contains(author)
    }
}

/// Log output settings, read from a small TOML file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive; `RUST_LOG` wins when set
    #[serde(default = "default_filter")]
    pub filter: String,
    #[serde(default)]
    pub with_target: bool,
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

fn default_filter() -> String {
    "reply_bot=info,warn".to_string()
}

fn default_ansi() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_filter(),
            with_target: false,
            ansi: default_ansi(),
        }
    }
}

impl LoggingConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BotError::LoggingConfigError(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&content).map_err(|e| BotError::LoggingConfigError(e.to_string()))
    }

    /// Load `path` if given; otherwise use the default file when it exists
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => {
                let default = PathBuf::from(DEFAULT_LOGGING_CONFIG_PATH);
                if default.exists() {
                    Self::from_file(&default)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }
}

/// Account credentials for the forum API
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
    pub client_id: String,
    pub client_secret: String,
    pub user_agent: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("client_id", &self.client_id)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl Credentials {
    /// Read credentials from the process environment (and `.env`, if present)
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build credentials from any variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |name: &str| {
            lookup(name)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| BotError::MissingCredential(name.to_string()))
        };

        Ok(Self {
            username: required("reddit_username")?,
            password: required("reddit_password")?,
            client_id: required("client_id")?,
            client_secret: required("client_secret")?,
            user_agent: lookup("user_agent")
                .filter(|v| !v.is_empty())
                .unwrap_or_else(|| format!("reply-bot/{}", env!("CARGO_PKG_VERSION"))),
        })
    }
}
