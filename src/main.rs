mod logging;

use anyhow::Context;
use bot_core::{BotConfig, Mode};
use bot_service::{
    PatternLibrary, ResponseTemplate, Supervisor, SupervisorOutcome, SupervisorSettings,
};
use clap::Parser;
use reddit_client::RedditConnector;
use reply_ledger::AnyLedger;
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[command(name = "sushi-grade-bot")]
#[command(about = "Replies to raw-fish food safety questions on Reddit")]
#[command(version)]
struct Cli {
    #[arg(short = 'c', long, env = "REDDIT_CLIENT_ID")]
    client_id: Option<String>,

    #[arg(short = 's', long, env = "REDDIT_CLIENT_SECRET", hide_env_values = true)]
    client_secret: Option<String>,

    #[arg(short = 'u', long, env = "REDDIT_USERNAME")]
    username: Option<String>,

    #[arg(short = 'p', long, env = "REDDIT_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Directory for the log file
    #[arg(short = 'l', long)]
    logdir: Option<PathBuf>,

    /// Evaluate events but never post, upvote, delete or touch the ledger
    #[arg(long)]
    dry_run: bool,

    /// Reply to matching comments
    #[arg(long)]
    comments: bool,

    /// Reply to matching submissions
    #[arg(long)]
    submissions: bool,

    /// Delete the bot's downvoted replies
    #[arg(long)]
    cleanup: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

impl Cli {
    fn modes(&self) -> Vec<Mode> {
        [
            (self.comments, Mode::Comments),
            (self.submissions, Mode::Submissions),
            (self.cleanup, Mode::Cleanup),
        ]
        .into_iter()
        .filter_map(|(selected, mode)| selected.then_some(mode))
        .collect()
    }

    /// File configuration (or defaults) with command-line values on top.
    fn resolve_config(&self) -> anyhow::Result<BotConfig> {
        let mut config = match &self.config {
            Some(path) => BotConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => BotConfig::default(),
        };

        let overrides = [
            (&self.client_id, &mut config.reddit.client_id),
            (&self.client_secret, &mut config.reddit.client_secret),
            (&self.username, &mut config.reddit.username),
            (&self.password, &mut config.reddit.password),
        ];
        for (flag, field) in overrides {
            if flag.is_some() {
                field.clone_from(flag);
            }
        }

        if let Some(dir) = &self.logdir {
            config.logging.dir = dir.clone();
        }
        if self.dry_run {
            config.behavior.dry_run = true;
        }

        Ok(config)
    }
}

async fn run(config: BotConfig, modes: Vec<Mode>) -> anyhow::Result<SupervisorOutcome> {
    config.validate()?;

    let patterns = PatternLibrary::from_config(&config.patterns)?;
    let template = ResponseTemplate::from_path(config.behavior.response_path.as_deref())?;
    let ledger = AnyLedger::from_config(&config.ledger).await?;
    let connector = RedditConnector::from_config(&config.reddit)?;

    let cancel = CancellationToken::new();
    let stop = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Stop signal received");
            stop.cancel();
        }
    });

    if config.behavior.dry_run {
        tracing::info!("Dry-run: nothing will be posted, upvoted or deleted");
    }

    let settings = SupervisorSettings::from_config(&config, modes);
    let mut supervisor = Supervisor::new(connector, ledger, patterns, template, settings);
    Ok(supervisor.run(&cancel).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.resolve_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("sushi-grade-bot: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    let _logging = match logging::init_tracing(&config.logging) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("sushi-grade-bot: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    tracing::info!("Starting sushi-grade-bot");
    match run(config, cli.modes()).await {
        Ok(outcome) => {
            tracing::info!("Exiting: {:?}", outcome);
            ExitCode::from(outcome.exit_code() as u8)
        }
        Err(e) => {
            tracing::error!("Fatal: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_select_modes_in_fixed_order() {
        let cli = Cli::try_parse_from(["sushi-grade-bot", "--cleanup", "--comments"]).unwrap();
        assert_eq!(cli.modes(), vec![Mode::Comments, Mode::Cleanup]);

        let cli = Cli::try_parse_from(["sushi-grade-bot"]).unwrap();
        assert!(cli.modes().is_empty());
    }

    #[test]
    fn test_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "sushi-grade-bot",
            "-c",
            "id",
            "-s",
            "secret",
            "-u",
            "sushi-grade-bot",
            "-p",
            "hunter2",
            "-l",
            "/var/log/bot",
            "--dry-run",
        ])
        .unwrap();

        let config = cli.resolve_config().unwrap();
        assert_eq!(config.reddit.client_id.as_deref(), Some("id"));
        assert_eq!(config.reddit.username.as_deref(), Some("sushi-grade-bot"));
        assert_eq!(config.logging.dir, PathBuf::from("/var/log/bot"));
        assert!(config.behavior.dry_run);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_config_file() {
        let cli =
            Cli::try_parse_from(["sushi-grade-bot", "--config", "/nonexistent/bot.toml"]).unwrap();
        assert!(cli.resolve_config().is_err());
    }
}
