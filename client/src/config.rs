//! Client configuration parsed from environment variables.

use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_SESSION_STALE_SECS: u64 = 300;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue { var: &'static str, value: String },
    #[error("{var} must not be empty")]
    Empty { var: &'static str },
}

/// Transport timeouts. `None` leaves the HTTP client's default in place.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Timeouts {
    pub request: Option<Duration>,
    pub connect: Option<Duration>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub base_url: String,
    pub session_stale_after: Duration,
    pub timeouts: Timeouts,
    pub session_cookie: Option<String>,
}

impl ClientConfig {
    /// Build typed client config from environment variables.
    ///
    /// Optional:
    /// - `EMUSE_BASE_URL`: default `http://127.0.0.1:8000`
    /// - `EMUSE_SESSION_STALE_SECS`: default 300
    /// - `EMUSE_REQUEST_TIMEOUT_SECS`: unset means no request timeout
    /// - `EMUSE_CONNECT_TIMEOUT_SECS`: unset means no connect timeout
    /// - `EMUSE_SESSION_COOKIE`: existing session cookie value
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric variable does not parse or the base URL is blank.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base_url = match lookup("EMUSE_BASE_URL") {
            Some(raw) => normalize_base_url(&raw).ok_or(ConfigError::Empty { var: "EMUSE_BASE_URL" })?,
            None => DEFAULT_BASE_URL.to_owned(),
        };

        let stale_secs =
            parse_secs(&lookup, "EMUSE_SESSION_STALE_SECS")?.unwrap_or(DEFAULT_SESSION_STALE_SECS);
        let timeouts = Timeouts {
            request: parse_secs(&lookup, "EMUSE_REQUEST_TIMEOUT_SECS")?.map(Duration::from_secs),
            connect: parse_secs(&lookup, "EMUSE_CONNECT_TIMEOUT_SECS")?.map(Duration::from_secs),
        };
        let session_cookie = lookup("EMUSE_SESSION_COOKIE")
            .map(|value| value.trim().to_owned())
            .filter(|value| !value.is_empty());

        Ok(Self {
            base_url,
            session_stale_after: Duration::from_secs(stale_secs),
            timeouts,
            session_cookie,
        })
    }

    /// Replace the base URL, trimming trailing slashes.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is blank.
    pub fn with_base_url(mut self, raw: &str) -> Result<Self, ConfigError> {
        self.base_url = normalize_base_url(raw).ok_or(ConfigError::Empty { var: "EMUSE_BASE_URL" })?;
        Ok(self)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_owned(),
            session_stale_after: Duration::from_secs(DEFAULT_SESSION_STALE_SECS),
            timeouts: Timeouts::default(),
            session_cookie: None,
        }
    }
}

// The session cookie is a bearer credential.
impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("session_stale_after", &self.session_stale_after)
            .field("timeouts", &self.timeouts)
            .field("session_cookie", &self.session_cookie.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

fn normalize_base_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return None;
    }
    Some(trimmed.to_owned())
}

fn parse_secs<F>(lookup: &F, var: &'static str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(var) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|_| ConfigError::InvalidValue { var, value: raw })
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
