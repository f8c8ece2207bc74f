//! Runtime configuration sourced from the process environment.
use reqwest::Url;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::error;

pub const PRACTICUM_TOKEN: &str = "PRACTICUM_TOKEN";
pub const TELEGRAM_TOKEN: &str = "TELEGRAM_TOKEN";
pub const TELEGRAM_CHAT_ID: &str = "TELEGRAM_CHAT_ID";

/// Required variables in the order they are checked.
pub const REQUIRED_VARS: [&str; 3] = [PRACTICUM_TOKEN, TELEGRAM_TOKEN, TELEGRAM_CHAT_ID];

pub const DEFAULT_ENDPOINT: &str = "https://practicum.yandex.ru/api/user_api/homework_statuses/";
pub const DEFAULT_RETRY_SECS: u64 = 600;
pub const DEFAULT_LOG_FILE: &str = "homework.log";
pub const DEFAULT_LOG_MAX_BYTES: usize = 50_000_000;
pub const DEFAULT_LOG_BACKUPS: usize = 5;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}; shutting down")]
    MissingVar(&'static str),
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Everything the agent needs, resolved once at startup.
#[derive(Clone, PartialEq, Eq)]
pub struct Config {
    pub practicum_token: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,
    pub endpoint: Url,
    pub retry_interval: Duration,
    pub log: LogSettings,
}

/// Where and how the rotating log file is written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogSettings {
    pub path: PathBuf,
    pub max_bytes: usize,
    pub backups: usize,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_LOG_FILE),
            max_bytes: DEFAULT_LOG_MAX_BYTES,
            backups: DEFAULT_LOG_BACKUPS,
        }
    }
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("practicum_token", &"[REDACTED]")
            .field("telegram_token", &"[REDACTED]")
            .field("telegram_chat_id", &self.telegram_chat_id)
            .field("endpoint", &self.endpoint)
            .field("retry_interval", &self.retry_interval)
            .field("log", &self.log)
            .finish()
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// True iff every required variable is present and non-empty.
pub fn check_tokens<F>(lookup: F) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    first_missing(lookup).is_none()
}

/// Startup gate. Logs a fatal error naming the first missing variable.
pub fn ensure_tokens<F>(lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if check_tokens(&lookup) {
        return Ok(());
    }
    let name = first_missing(&lookup).unwrap_or(REQUIRED_VARS[0]);
    let err = ConfigError::MissingVar(name);
    error!(fatal = true, "{}", err);
    Err(err)
}

/// Name of the first required variable that is absent or blank.
pub fn first_missing<F>(lookup: F) -> Option<&'static str>
where
    F: Fn(&str) -> Option<String>,
{
    REQUIRED_VARS
        .iter()
        .copied()
        .find(|name| non_empty(lookup(name)).is_none())
}

fn parse_number<T, F>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match non_empty(lookup(name)) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
        }),
    }
}

impl LogSettings {
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let settings = Self {
            path: non_empty(lookup("HOMEWORK_LOG_FILE"))
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_FILE)),
            max_bytes: parse_number(&lookup, "HOMEWORK_LOG_MAX_BYTES", DEFAULT_LOG_MAX_BYTES)?,
            backups: parse_number(&lookup, "HOMEWORK_LOG_BACKUPS", DEFAULT_LOG_BACKUPS)?,
        };
        if settings.max_bytes == 0 {
            return Err(ConfigError::Invalid {
                name: "HOMEWORK_LOG_MAX_BYTES",
                reason: "must be > 0".into(),
            });
        }
        Ok(settings)
    }
}

impl Config {
    /// Build the configuration from the current process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = first_missing(&lookup) {
            return Err(ConfigError::MissingVar(name));
        }
        let required = |name: &'static str| {
            non_empty(lookup(name))
                .map(|v| v.trim().to_string())
                .ok_or(ConfigError::MissingVar(name))
        };

        let endpoint_raw =
            non_empty(lookup("PRACTICUM_ENDPOINT")).unwrap_or_else(|| DEFAULT_ENDPOINT.into());
        let endpoint = Url::parse(endpoint_raw.trim()).map_err(|e| ConfigError::Invalid {
            name: "PRACTICUM_ENDPOINT",
            reason: e.to_string(),
        })?;

        let retry_secs: u64 = parse_number(&lookup, "RETRY_TIME", DEFAULT_RETRY_SECS)?;
        if retry_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "RETRY_TIME",
                reason: "must be > 0".into(),
            });
        }

        let log = LogSettings::from_lookup(&lookup)?;

        Ok(Self {
            practicum_token: required(PRACTICUM_TOKEN)?,
            telegram_token: required(TELEGRAM_TOKEN)?,
            telegram_chat_id: required(TELEGRAM_CHAT_ID)?,
            endpoint,
            retry_interval: Duration::from_secs(retry_secs),
            log,
        })
    }
}
