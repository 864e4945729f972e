//! Runtime configuration resolved from the environment.
//!
//! Every value is trimmed and an empty variable counts as unset. Only the
//! consumer key has no default, and it is checked lazily so that cache-only
//! commands keep working without it.

use std::path::PathBuf;
use std::time::Duration;

use crate::util::{is_http_url, non_blank};
use crate::{Error, Result};

pub const CONSUMER_KEY_ENV: &str = "POCKET_CONSUMER_KEY";
pub const API_URL_ENV: &str = "POCKET_API_URL";
pub const DB_PATH_ENV: &str = "POCKET_DB_PATH";
pub const HTTP_TIMEOUT_ENV: &str = "POCKET_HTTP_TIMEOUT_SECS";
pub const CALLBACK_PORT_ENV: &str = "POCKET_CALLBACK_PORT";

pub const DEFAULT_API_URL: &str = "https://getpocket.com";
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CALLBACK_PORT: u16 = 8124;

const CACHE_DIR_NAME: &str = "pocket-cli";
const CACHE_FILE_NAME: &str = "cache.db";

/// Resolved client configuration.
#[derive(Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub consumer_key: Option<String>,
    pub api_base_url: String,
    pub db_path: PathBuf,
    pub http_timeout: Duration,
    pub callback_port: u16,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("AppConfig")
            .field(
                "consumer_key",
                &self.consumer_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_base_url", &self.api_base_url)
            .field("db_path", &self.db_path)
            .field("http_timeout", &self.http_timeout)
            .field("callback_port", &self.callback_port)
            .finish()
    }
}

impl AppConfig {
    /// Resolve configuration from process environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let read = |key: &str| lookup(key).as_deref().and_then(non_blank).map(str::to_string);

        let api_base_url = match read(API_URL_ENV) {
            Some(url) if is_http_url(&url) => url.trim_end_matches('/').to_string(),
            Some(url) => {
                return Err(Error::Config(format!(
                    "{API_URL_ENV} must include http:// or https:// (got '{url}')"
                )));
            }
            None => DEFAULT_API_URL.to_string(),
        };

        let db_path = match read(DB_PATH_ENV) {
            Some(path) => PathBuf::from(path),
            None => default_db_path()?,
        };

        let http_timeout = match read(HTTP_TIMEOUT_ENV) {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    return Err(Error::Config(format!(
                        "{HTTP_TIMEOUT_ENV} must be a positive number of seconds (got '{raw}')"
                    )));
                }
            },
            None => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        let callback_port = match read(CALLBACK_PORT_ENV) {
            Some(raw) => raw.parse::<u16>().map_err(|_| {
                Error::Config(format!("{CALLBACK_PORT_ENV} must be a port number (got '{raw}')"))
            })?,
            None => DEFAULT_CALLBACK_PORT,
        };

        Ok(Self {
            consumer_key: read(CONSUMER_KEY_ENV),
            api_base_url,
            db_path,
            http_timeout,
            callback_port,
        })
    }

    /// Replace the cache location, e.g. from a command-line flag.
    #[must_use]
    pub fn with_db_path(mut self, db_path: impl Into<PathBuf>) -> Self {
        self.db_path = db_path.into();
        self
    }

    /// The consumer key, required by every remote call.
    pub fn require_consumer_key(&self) -> Result<&str> {
        self.consumer_key.as_deref().ok_or_else(|| {
            Error::Config(format!(
                "{CONSUMER_KEY_ENV} is not set; create an app at https://getpocket.com/developer/ and export its consumer key"
            ))
        })
    }
}

/// Default cache location under the user cache directory.
pub fn default_db_path() -> Result<PathBuf> {
    let base = dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .ok_or_else(|| {
            Error::Config(format!(
                "could not determine a cache directory; set {DB_PATH_ENV}"
            ))
        })?;
    Ok(base.join(CACHE_DIR_NAME).join(CACHE_FILE_NAME))
}
