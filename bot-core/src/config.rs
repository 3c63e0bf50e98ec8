use crate::{ConfigError, CoreError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Longest comment body Reddit accepts.
pub const REDDIT_COMMENT_LIMIT: usize = 10_000;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotConfig {
    pub reddit: RedditConfig,
    pub behavior: BehaviorConfig,
    pub cleanup: CleanupConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
    pub patterns: PatternConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RedditConfig {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub user_agent: Option<String>,
    pub subreddit: String,
    /// Drop whatever the first poll returns and only act on newer items.
    pub skip_existing: bool,
}

impl Default for RedditConfig {
    fn default() -> Self {
        Self {
            client_id: None,
            client_secret: None,
            username: None,
            password: None,
            user_agent: None,
            subreddit: "all".to_string(),
            skip_existing: false,
        }
    }
}

impl RedditConfig {
    pub fn user_agent(&self) -> String {
        match (&self.user_agent, &self.username) {
            (Some(agent), _) => agent.clone(),
            (None, Some(username)) => format!("/u/{} sushi-grade-bot", username),
            (None, None) => "sushi-grade-bot".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BehaviorConfig {
    pub dry_run: bool,
    pub max_replies_per_thread: u32,
    pub cooldown_secs: u64,
    pub restart_delay_secs: u64,
    /// Replacement for the built-in response document.
    pub response_path: Option<PathBuf>,
}

impl Default for BehaviorConfig {
    fn default() -> Self {
        Self {
            dry_run: false,
            max_replies_per_thread: 1,
            cooldown_secs: 120,
            restart_delay_secs: 5,
            response_path: None,
        }
    }
}

impl BehaviorConfig {
    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_secs(self.restart_delay_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CleanupConfig {
    pub interval_secs: u64,
    pub batch_size: u32,
    /// Replies scoring strictly below this are retracted.
    pub min_score: i64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval_secs: 30 * 60,
            batch_size: 100,
            min_score: -1,
        }
    }
}

impl CleanupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    File,
    Http,
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub backend: LedgerBackend,
    pub bucket: String,
    pub key: String,
    /// Root directory of the file backend.
    pub root: PathBuf,
    /// Base URL of the HTTP object server.
    pub base_url: Option<String>,
    /// Bearer token sent to the HTTP object server.
    pub token: Option<String>,
    pub database_url: String,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            backend: LedgerBackend::File,
            bucket: "reddit-sushi-grade-bot".to_string(),
            key: "cache.json".to_string(),
            root: PathBuf::from("./ledger"),
            base_url: None,
            token: None,
            database_url: "sqlite://sushi-grade-bot.db?mode=rwc".to_string(),
        }
    }
}

/// Replacement pattern lists. An empty list keeps the built-in set.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternConfig {
    pub triggers: Vec<String>,
    pub suppressions: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub dir: PathBuf,
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("/tmp"),
            filter: "info".to_string(),
        }
    }
}

impl BotConfig {
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound {
                path: path.display().to_string(),
            }
            .into());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, CoreError> {
        let config: BotConfig = toml::from_str(raw).map_err(ConfigError::from)?;
        Ok(config)
    }

    /// Checks everything that can be checked before talking to Reddit.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("reddit.client_id", &self.reddit.client_id),
            ("reddit.client_secret", &self.reddit.client_secret),
            ("reddit.username", &self.reddit.username),
            ("reddit.password", &self.reddit.password),
        ] {
            if value.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::MissingField {
                    field: field.to_string(),
                });
            }
        }

        if self.behavior.max_replies_per_thread == 0 {
            return Err(ConfigError::InvalidValue {
                field: "behavior.max_replies_per_thread".to_string(),
                value: "0".to_string(),
            });
        }

        if !(1..=100).contains(&self.cleanup.batch_size) {
            return Err(ConfigError::InvalidValue {
                field: "cleanup.batch_size".to_string(),
                value: self.cleanup.batch_size.to_string(),
            });
        }

        if self.cleanup.interval_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "cleanup.interval_secs".to_string(),
                value: "0".to_string(),
            });
        }

        match self.ledger.backend {
            LedgerBackend::Http if self.ledger.base_url.is_none() => {
                return Err(ConfigError::MissingField {
                    field: "ledger.base_url".to_string(),
                });
            }
            _ => {}
        }

        Ok(())
    }
}
