// Runtime configuration loaded from the environment
//
// dotenvy reads an optional .env first, then every setting falls back to a
// default that matches a local development backend. Config is immutable after
// loading and cheap to clone.

use crate::error::{ChatError, Result};
use crate::transport::RetryPolicy;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api/v1";
pub const DEFAULT_FALLBACK_URL: &str = "http://localhost:8008/api/v1";
pub const DEFAULT_PERSONA: &str = "transformation_analyst";

/// Settings for the transport, the pipeline and session storage
///
/// Environment Variables:
/// - CHAT_API_URL: primary API base
/// - CHAT_FALLBACK_URL: base tried once when the primary returns 404 (empty disables)
/// - CHAT_PERSONA: persona sent with every message (empty disables)
/// - CHAT_MAX_RETRIES, CHAT_RETRY_BASE_MS: retry policy for network failures
/// - CHAT_TIMEOUT_SECS: per-request timeout
/// - CHAT_USER_ID, CHAT_HISTORY_LIMIT: conversation list query
/// - CHAT_DATA_DIR: where session.json lives
///
/// Usage:
///     let config = ChatConfig::load()?;
///     let transport = HttpTransport::from_config(&config)?;
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    pub api_url: String,
    pub fallback_url: Option<String>,
    pub persona: Option<String>,
    pub max_retries: u32,
    pub retry_base: Duration,
    pub timeout: Duration,
    pub user_id: i64,
    pub history_limit: u32,
    pub data_dir: PathBuf,
}

impl ChatConfig {
    /// Load `.env` (ignored if absent), then read the environment
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_env()
    }

    /// Read the environment without touching `.env`
    ///
    /// # Errors
    /// - A numeric variable that does not parse
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            api_url: env_string("CHAT_API_URL")
                .map(|url| trim_url(&url))
                .unwrap_or(defaults.api_url),
            fallback_url: match std::env::var("CHAT_FALLBACK_URL") {
                Ok(url) => Some(trim_url(&url)).filter(|url| !url.is_empty()),
                Err(_) => defaults.fallback_url,
            },
            persona: match std::env::var("CHAT_PERSONA") {
                Ok(persona) => Some(persona.trim().to_string()).filter(|p| !p.is_empty()),
                Err(_) => defaults.persona,
            },
            max_retries: env_parse("CHAT_MAX_RETRIES", defaults.max_retries)?,
            retry_base: Duration::from_millis(env_parse(
                "CHAT_RETRY_BASE_MS",
                defaults.retry_base.as_millis() as u64,
            )?),
            timeout: Duration::from_secs(env_parse(
                "CHAT_TIMEOUT_SECS",
                defaults.timeout.as_secs(),
            )?),
            user_id: env_parse("CHAT_USER_ID", defaults.user_id)?,
            history_limit: env_parse("CHAT_HISTORY_LIMIT", defaults.history_limit)?,
            data_dir: env_string("CHAT_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
        })
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_base)
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            fallback_url: Some(DEFAULT_FALLBACK_URL.to_string()),
            persona: Some(DEFAULT_PERSONA.to_string()),
            max_retries: 2,
            retry_base: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            user_id: 1,
            history_limit: 50,
            data_dir: dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("chatcanvas"),
        }
    }
}

fn trim_url(url: &str) -> String {
    url.trim().trim_end_matches('/').to_string()
}

/// Non-blank value of a variable
fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn env_parse<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env_string(key) {
        None => Ok(default),
        Some(raw) => raw
            .parse()
            .map_err(|e| ChatError::Config(format!("{} has invalid value '{}': {}", key, raw, e))),
    }
}
