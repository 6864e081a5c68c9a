use std::time::Duration;

use anyhow::bail;

const DEFAULT_PORT: u16 = 8089;
const DEFAULT_UPSTREAM_TIMEOUT_SECS: u64 = 8;
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 8;

/// Output format for the tracing subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `json` selects JSON lines; anything else, or unset, is the pretty format.
    pub fn parse(value: Option<&str>) -> LogFormat {
        match value {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the upstream objects API, without a trailing slash.
    pub base_api_url: String,
    /// HMAC secret used to sign and verify auth tokens.
    pub auth_secret_key: String,
    pub port: u16,
    /// Deadline applied to every upstream call made on behalf of a request.
    /// Set via UPSTREAM_TIMEOUT_SECS. Default: 8.
    pub request_timeout: Duration,
    /// How long in-flight requests may drain after a shutdown signal.
    /// Set via SHUTDOWN_GRACE_SECS. Default: 8.
    pub shutdown_grace: Duration,
}

impl Config {
    /// Build a config from an arbitrary key lookup. `load()` passes the
    /// process environment; tests pass a map.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Config>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_api_url = match lookup("BASE_API_URL").map(|v| v.trim().to_string()) {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => bail!("BASE_API_URL is required but was not set"),
        };

        let auth_secret_key = match lookup("AUTH_SECRET_KEY") {
            Some(key) if !key.is_empty() => key,
            _ => bail!("AUTH_SECRET_KEY is required but was not set"),
        };

        Ok(Config {
            base_api_url,
            auth_secret_key,
            port: lookup("PORT")
                .and_then(|v| v.parse().ok())
                .unwrap_or(DEFAULT_PORT),
            request_timeout: Duration::from_secs(
                lookup("UPSTREAM_TIMEOUT_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_UPSTREAM_TIMEOUT_SECS),
            ),
            shutdown_grace: Duration::from_secs(
                lookup("SHUTDOWN_GRACE_SECS")
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_GRACE_SECS),
            ),
        })
    }
}

/// Read the process environment. A `.env` file, if any, must already have
/// been loaded by the caller.
pub fn load() -> anyhow::Result<Config> {
    Config::from_lookup(|key| std::env::var(key).ok())
}

/// Log format is needed before the rest of the config is validated, so that
/// config errors themselves get logged in the right format.
pub fn log_format_from_env() -> LogFormat {
    LogFormat::parse(std::env::var("LOG_FORMAT").ok().as_deref())
}
