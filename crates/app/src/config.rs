use std::path::PathBuf;
use std::str::FromStr;

use quiz_core::model::{
    DEFAULT_PAGE_SIZE, DEFAULT_TIME_LIMIT_SECS, QuizSettings, RollNumberRule, SettingsError,
};
use thiserror::Error;

const DEFAULT_RESULTS_DB_URL: &str = "sqlite://quiz_results.sqlite3";
const DEFAULT_LOCAL_DB_URL: &str = "sqlite://quiz_local.sqlite3";
const DEFAULT_ROLL_LEN: usize = 8;
const DEFAULT_LOG_DIR: &str = "logs";
const DEFAULT_RUST_LOG: &str = "info";

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("{key} must be true or false, got {raw:?}")]
    InvalidBool { key: &'static str, raw: String },

    #[error("{key} must be a non-negative integer, got {raw:?}")]
    InvalidNumber { key: &'static str, raw: String },

    #[error("{key} cannot be empty")]
    Empty { key: &'static str },

    #[error(transparent)]
    Settings(#[from] SettingsError),
}

/// Runtime configuration read from the environment (and `.env`).
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub results_db_url: String,
    pub local_db_url: String,
    pub settings: QuizSettings,
    pub roll_rule: RollNumberRule,
    pub questions_file: Option<PathBuf>,
    pub admin_key: Option<String>,
    pub rust_log: String,
    pub log_dir: PathBuf,
}

impl AppConfig {
    /// Load `.env` if present, then read the process environment.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for malformed or inconsistent values.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    ///
    /// Unset and blank variables fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for malformed or inconsistent values.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };

        let results_db_url = get("QUIZ_RESULTS_DB_URL").unwrap_or_else(|| DEFAULT_RESULTS_DB_URL.into());
        let local_db_url = get("QUIZ_LOCAL_DB_URL").unwrap_or_else(|| DEFAULT_LOCAL_DB_URL.into());

        let settings = QuizSettings::new(
            parse_bool("QUIZ_ENABLE_TIMER", get("QUIZ_ENABLE_TIMER"))?.unwrap_or(false),
            parse_number("QUIZ_TIME_LIMIT_SECS", get("QUIZ_TIME_LIMIT_SECS"))?
                .unwrap_or(DEFAULT_TIME_LIMIT_SECS),
            parse_number("QUIZ_PAGE_SIZE", get("QUIZ_PAGE_SIZE"))?.unwrap_or(DEFAULT_PAGE_SIZE),
            parse_bool("QUIZ_RECORD_TIMESTAMP", get("QUIZ_RECORD_TIMESTAMP"))?.unwrap_or(false),
        )?;

        let roll_rule = RollNumberRule::new(
            Some(parse_number("QUIZ_ROLL_MIN_LEN", get("QUIZ_ROLL_MIN_LEN"))?.unwrap_or(DEFAULT_ROLL_LEN)),
            Some(parse_number("QUIZ_ROLL_MAX_LEN", get("QUIZ_ROLL_MAX_LEN"))?.unwrap_or(DEFAULT_ROLL_LEN)),
            parse_bool("QUIZ_ROLL_DIGITS_ONLY", get("QUIZ_ROLL_DIGITS_ONLY"))?.unwrap_or(true),
        )?;

        Ok(Self {
            results_db_url,
            local_db_url,
            settings,
            roll_rule,
            questions_file: get("QUIZ_QUESTIONS_FILE").map(PathBuf::from),
            admin_key: get("QUIZ_ADMIN_KEY"),
            rust_log: get("RUST_LOG").unwrap_or_else(|| DEFAULT_RUST_LOG.into()),
            log_dir: get("QUIZ_LOG_DIR").map_or_else(|| PathBuf::from(DEFAULT_LOG_DIR), PathBuf::from),
        })
    }
}

fn parse_bool(key: &'static str, raw: Option<String>) -> Result<Option<bool>, ConfigError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(Some(true)),
        "0" | "false" | "no" | "off" => Ok(Some(false)),
        _ => Err(ConfigError::InvalidBool { key, raw }),
    }
}

fn parse_number<T: FromStr>(key: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError> {
    raw.map(|raw| {
        raw.parse()
            .map_err(|_| ConfigError::InvalidNumber { key, raw })
    })
    .transpose()
}

/// Check a value given explicitly on the command line.
///
/// # Errors
///
/// Returns `ConfigError::Empty` for a blank value.
pub fn require_non_empty(key: &'static str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Empty { key });
    }
    Ok(value)
}
