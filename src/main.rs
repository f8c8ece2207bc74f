use anyhow::{bail, Context, Result};
use clap::Parser;
use std::path::PathBuf;
use teloxide::Bot;
use tracing::{error, info};

use homework_watchbot::config::{self, Config, LogSettings};
use homework_watchbot::logging;
use homework_watchbot::notifier::Notifier;
use homework_watchbot::poller::{Poller, TickOutcome};
use homework_watchbot::practicum::PracticumClient;

#[derive(Debug, Parser)]
#[command(author, version, about = "Watch homework review status and report changes to Telegram")]
struct Args {
    /// Load environment variables from this file instead of `./.env`
    #[arg(long)]
    env_file: Option<PathBuf>,

    /// Run a single poll iteration and exit
    #[arg(long)]
    once: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();
    match &args.env_file {
        Some(path) => {
            dotenv::from_path(path)
                .with_context(|| format!("failed to load env file {}", path.display()))?;
        }
        None => {
            dotenv::dotenv().ok();
        }
    }

    let env_var = |name: &str| std::env::var(name).ok();
    logging::init(&LogSettings::from_lookup(env_var)?)?;
    config::ensure_tokens(env_var)?;

    let cfg = Config::from_env().map_err(|err| {
        error!(fatal = true, "{}", err);
        err
    })?;
    info!(endpoint = %cfg.endpoint, chat = %cfg.telegram_chat_id, "configuration loaded");

    let source = PracticumClient::from_config(&cfg)?;
    let bot = Bot::new(cfg.telegram_token.clone());
    let notifier = Notifier::new(bot, cfg.telegram_chat_id.clone());
    let mut poller = Poller::new(source, notifier);

    if args.once {
        if let TickOutcome::Failed(reason) = poller.tick().await {
            bail!("poll iteration failed: {}", reason);
        }
        return Ok(());
    }

    poller.run(cfg.retry_interval).await;
    Ok(())
}
