//! Client configuration parsed from environment variables.

use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8003/api/v1";
pub const DEFAULT_ASSET_BASE_URL: &str = "http://localhost:8003";
pub const DEFAULT_RENDER_POLL_INTERVAL_MS: u64 = 2000;
pub const DEFAULT_RENDER_POLL_TIMEOUT_SECS: u64 = 120;
pub const DEFAULT_HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// How the render job client polls an asynchronous job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    pub interval_ms: u64,
    /// Polling is abandoned after this long with a timeout failure.
    pub timeout_secs: u64,
}

impl PollConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms.max(1))
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self { interval_ms: DEFAULT_RENDER_POLL_INTERVAL_MS, timeout_secs: DEFAULT_RENDER_POLL_TIMEOUT_SECS }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Prefix for the template and render endpoints, without a trailing `/`.
    pub api_base_url: String,
    /// Origin that relative image and result references resolve against.
    pub asset_base_url: String,
    /// Opaque bearer credential. Requests go out unauthenticated without one.
    pub auth_token: Option<String>,
    pub poll: PollConfig,
    pub timeouts: HttpTimeouts,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_owned(),
            asset_base_url: DEFAULT_ASSET_BASE_URL.to_owned(),
            auth_token: None,
            poll: PollConfig::default(),
            timeouts: HttpTimeouts {
                request_secs: DEFAULT_HTTP_REQUEST_TIMEOUT_SECS,
                connect_secs: DEFAULT_HTTP_CONNECT_TIMEOUT_SECS,
            },
        }
    }
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `RESUME_API_BASE_URL`: default `http://localhost:8003/api/v1`
    /// - `RESUME_ASSET_BASE_URL`: default `http://localhost:8003`
    /// - `RESUME_AUTH_TOKEN_ENV`: names the env var containing the bearer token
    /// - `RENDER_POLL_INTERVAL_MS`: default 2000
    /// - `RENDER_POLL_TIMEOUT_SECS`: default 120
    /// - `HTTP_REQUEST_TIMEOUT_SECS`: default 30
    /// - `HTTP_CONNECT_TIMEOUT_SECS`: default 10
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if either base URL does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`Self::from_env`], reading values through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if either base URL does not parse.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let api_base_url = base_url(
            "RESUME_API_BASE_URL",
            lookup("RESUME_API_BASE_URL").as_deref().unwrap_or(DEFAULT_API_BASE_URL),
        )?;
        let asset_base_url = base_url(
            "RESUME_ASSET_BASE_URL",
            lookup("RESUME_ASSET_BASE_URL").as_deref().unwrap_or(DEFAULT_ASSET_BASE_URL),
        )?;
        let auth_token = lookup("RESUME_AUTH_TOKEN_ENV")
            .and_then(|var| lookup(&var))
            .filter(|token| !token.trim().is_empty());

        let parse_u64 = |key: &str, default: u64| lookup(key).and_then(|v| v.trim().parse::<u64>().ok()).unwrap_or(default);
        let poll = PollConfig {
            interval_ms: parse_u64("RENDER_POLL_INTERVAL_MS", DEFAULT_RENDER_POLL_INTERVAL_MS),
            timeout_secs: parse_u64("RENDER_POLL_TIMEOUT_SECS", DEFAULT_RENDER_POLL_TIMEOUT_SECS),
        };
        let timeouts = HttpTimeouts {
            request_secs: parse_u64("HTTP_REQUEST_TIMEOUT_SECS", DEFAULT_HTTP_REQUEST_TIMEOUT_SECS),
            connect_secs: parse_u64("HTTP_CONNECT_TIMEOUT_SECS", DEFAULT_HTTP_CONNECT_TIMEOUT_SECS),
        };

        Ok(Self { api_base_url, asset_base_url, auth_token, poll, timeouts })
    }

    /// Replace the API base URL, validating it the same way `from_env` does.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `url` does not parse.
    pub fn with_api_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.api_base_url = base_url("RESUME_API_BASE_URL", url)?;
        Ok(self)
    }

    /// Replace the asset base URL.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidUrl`] if `url` does not parse.
    pub fn with_asset_base_url(mut self, url: &str) -> Result<Self, ConfigError> {
        self.asset_base_url = base_url("RESUME_ASSET_BASE_URL", url)?;
        Ok(self)
    }

    /// Resolve an image or result reference against the asset origin.
    #[must_use]
    pub fn resolve_asset(&self, reference: &str) -> String {
        crate::net::resolve_reference(&self.asset_base_url, reference)
    }
}

fn base_url(var: &'static str, raw: &str) -> Result<String, ConfigError> {
    let trimmed = raw.trim().trim_end_matches('/');
    match reqwest::Url::parse(trimmed) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(trimmed.to_owned()),
        _ => Err(ConfigError::InvalidUrl { var, value: raw.to_owned() }),
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
