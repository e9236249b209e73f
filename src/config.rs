//! Configuration types.

use std::time::Duration;

use reqwest::Url;

use crate::error::ConfigError;

/// Base URL of the streaming query endpoint.
pub const DEFAULT_STREAM_URL: &str = "http://localhost:8000";

/// Runtime configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the server-push endpoint; queries go to `{base}/stream?q=`.
    pub stream_url: Url,
    /// Interval between synthetic progress ticks.
    pub tick_interval: Duration,
    /// Pause between reaching 100% and the hand-off.
    pub handoff_delay: Duration,
    /// Longest a stream may stay open without a terminal event.
    pub stream_timeout: Duration,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            stream_url: Url::parse(DEFAULT_STREAM_URL).expect("default stream URL is valid"),
            tick_interval: Duration::from_millis(75),
            handoff_delay: Duration::from_millis(800),
            stream_timeout: Duration::from_secs(120),
        }
    }
}

impl AppConfig {
    /// Load from `EDU_RECO_*` environment variables, falling back to
    /// defaults for anything unset or unparsable (except the URL, which
    /// must be valid when given).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let stream_url = match lookup("EDU_RECO_STREAM_URL") {
            Some(raw) => Url::parse(raw.trim()).map_err(|e| ConfigError::InvalidValue {
                key: "EDU_RECO_STREAM_URL".to_string(),
                message: e.to_string(),
            })?,
            None => defaults.stream_url,
        };

        let millis = |key: &str, fallback: Duration| {
            lookup(key)
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_millis)
                .unwrap_or(fallback)
        };

        let tick_interval = millis("EDU_RECO_TICK_MS", defaults.tick_interval);
        let handoff_delay = millis("EDU_RECO_HANDOFF_DELAY_MS", defaults.handoff_delay);

        let stream_timeout = lookup("EDU_RECO_STREAM_TIMEOUT_SECS")
            .and_then(|s| s.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(defaults.stream_timeout);

        Ok(Self {
            stream_url,
            tick_interval,
            handoff_delay,
            stream_timeout,
        })
    }
}
