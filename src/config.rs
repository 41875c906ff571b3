//! Feed configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`), each with a fallback default so a local backend works with no
//! configuration at all.

use std::time::Duration;

use url::Url;

use crate::error::FeedError;
use crate::ws::ClientOptions;

/// Default HTTP base address of the backend API.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";

/// Default WebSocket address of the real-time feed.
pub const DEFAULT_WS_BASE_URL: &str = "ws://localhost:8080/ws";

/// URL schemes accepted for the feed endpoint.
pub const WS_SCHEMES: &[&str] = &["ws", "wss"];

/// URL schemes accepted for the API base address.
pub const HTTP_SCHEMES: &[&str] = &["http", "https"];

/// Top-level feed configuration.
///
/// Loaded once at startup via [`FeedConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedConfig {
    /// HTTP base address of the backend (e.g. `http://localhost:8080`).
    pub api_base_url: String,

    /// WebSocket address the feed client connects to.
    pub ws_base_url: String,

    /// Seconds allowed for the WebSocket handshake.
    pub connect_timeout_secs: u64,

    /// Capacity of the connection-state broadcast channel.
    pub state_channel_capacity: usize,

    /// Emit logs as JSON lines instead of human-readable text.
    pub log_json: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            ws_base_url: DEFAULT_WS_BASE_URL.to_string(),
            connect_timeout_secs: 10,
            state_channel_capacity: 64,
            log_json: false,
        }
    }
}

impl FeedConfig {
    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file, then
    /// defers to [`FeedConfig::from_lookup`].
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::InvalidEndpoint`] if `API_BASE_URL` or
    /// `WS_BASE_URL` is set but is not a valid URL of the right scheme, and
    /// [`FeedError::Config`] if `CONNECT_TIMEOUT_SECS` is zero.
    pub fn from_env() -> Result<Self, FeedError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup.
    ///
    /// Numeric and boolean keys fall back to their default when missing or
    /// unparsable; URL keys must be valid when present.
    ///
    /// # Errors
    ///
    /// - [`FeedError::InvalidEndpoint`] if a URL key is set to an invalid value.
    /// - [`FeedError::Config`] if `CONNECT_TIMEOUT_SECS` is zero.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, FeedError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let api_base_url = lookup("API_BASE_URL").unwrap_or(defaults.api_base_url);
        parse_endpoint(&api_base_url, HTTP_SCHEMES)?;

        let ws_base_url = lookup("WS_BASE_URL").unwrap_or(defaults.ws_base_url);
        parse_endpoint(&ws_base_url, WS_SCHEMES)?;

        let connect_timeout_secs = parse_value(
            lookup("CONNECT_TIMEOUT_SECS"),
            defaults.connect_timeout_secs,
        );
        if connect_timeout_secs == 0 {
            return Err(FeedError::Config(
                "CONNECT_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }
        let state_channel_capacity = parse_value(
            lookup("STATE_CHANNEL_CAPACITY"),
            defaults.state_channel_capacity,
        );
        let log_json = parse_bool(lookup("LOG_JSON"), defaults.log_json);

        Ok(Self {
            api_base_url,
            ws_base_url,
            connect_timeout_secs,
            state_channel_capacity,
            log_json,
        })
    }

    /// Builds the feed client options described by this configuration.
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            connect_timeout: Duration::from_secs(self.connect_timeout_secs),
            state_channel_capacity: self.state_channel_capacity,
        }
    }
}

/// Parses `raw` as an absolute URL whose scheme is one of `schemes`.
///
/// # Errors
///
/// Returns [`FeedError::InvalidEndpoint`] if `raw` does not parse, uses a
/// different scheme, or has no host.
pub fn parse_endpoint(raw: &str, schemes: &[&str]) -> Result<Url, FeedError> {
    let invalid = |reason: String| FeedError::InvalidEndpoint {
        endpoint: raw.to_string(),
        reason,
    };
    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !schemes.contains(&url.scheme()) {
        return Err(invalid(format!(
            "scheme {:?} is not one of {schemes:?}",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("missing host".to_string()));
    }
    Ok(url)
}

/// Parses an optional value as `T`, returning `default` on missing or
/// invalid values.
fn parse_value<T: std::str::FromStr>(raw: Option<String>, default: T) -> T {
    raw.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

/// Parses an optional value as a boolean. Accepts `"true"`, `"1"`,
/// `"false"`, `"0"` (case-insensitive). Returns `default` otherwise.
fn parse_bool(raw: Option<String>, default: bool) -> bool {
    match raw.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true" | "1") => true,
        Some("false" | "0") => false,
        _ => default,
    }
}
