use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use reply_bot::config::{BotConfig, Credentials, LoggingConfig, DEFAULT_BOT_CONFIG_PATH};
use reply_bot::error::BotError;
use reply_bot::ledger::DedupLedger;
use reply_bot::loop_controller::{LoopResult, ReplyLoop};
use reply_bot::reddit::{RedditApi, RedditClient};
use reply_bot::sleeper::{Sleeper, TokioSleeper};

/// Reply Bot: answer forum comments that mention a trigger phrase
#[derive(Parser, Debug)]
#[command(name = "reply-bot")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Bot configuration file (JSON, or TOML by extension)
    #[arg(short = 'c', long = "bot-config", default_value = DEFAULT_BOT_CONFIG_PATH)]
    bot_config: PathBuf,

    /// Logging configuration file (TOML; default: ./logging.toml if present)
    #[arg(short = 'l', long = "logging-config")]
    logging_config: Option<PathBuf>,

    /// Ledger of replied comment ids to load and append to
    /// (default: start a fresh ./posts_replied_to.txt)
    #[arg(long = "ledger")]
    ledger: Option<PathBuf>,
}

fn setup_logging(config: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(config.with_target)
        .with_ansi(config.ansi)
        .init();
}

async fn run(cli: &Cli, cancel: CancellationToken) -> Result<LoopResult, BotError> {
    let config = BotConfig::from_file(&cli.bot_config)?;
    info!(
        forums = %config.subscription_key(),
        triggers = config.triggers.len(),
        replies = config.quotes.len(),
        blocked = config.blocked_users.len(),
        "Loaded bot configuration"
    );

    let credentials = Credentials::from_env()?;
    let sleeper: Arc<dyn Sleeper> = Arc::new(TokioSleeper);
    let api = RedditApi::new(credentials)?;
    let client = RedditClient::new(api, Arc::clone(&sleeper), config.settings.poll_max_delay());
    info!("Instantiated forum client");

    let ledger = DedupLedger::open(cli.ledger.as_deref())?;

    let mut reply_loop = ReplyLoop::new(config, client, ledger)?.with_sleeper(sleeper);
    info!("Started reply bot");

    reply_loop.run(&cancel).await
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let logging = match LoggingConfig::load(cli.logging_config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{} {}", "ERROR:".red().bold(), e);
            std::process::exit(1);
        }
    };
    setup_logging(&logging);

    // Setup shutdown signal handling
    let cancel = CancellationToken::new();
    let cancel_on_signal = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            return;
        }
        info!("Received Ctrl+C, shutting down...");
        cancel_on_signal.cancel();
    });

    match run(&cli, cancel).await {
        Ok(LoopResult::Shutdown { stats }) => {
            println!(
                "\n{} {} replies sent, {} comments seen, {} skipped",
                "STOPPED:".yellow().bold(),
                stats.replies_sent.to_string().cyan(),
                stats.comments_seen,
                stats.skipped()
            );
        }
        Err(e) => {
            error!("{}", e);
            std::process::exit(1);
        }
    }
}
