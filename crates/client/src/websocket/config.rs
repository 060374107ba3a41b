//! Transport configuration.

use std::time::Duration;

use url::Url;

use super::shared::{DEFAULT_MAX_RETRIES, DEFAULT_RECONNECT_DELAY_MS};

pub const ENV_WS_URL: &str = "RANDOMTALK_WS_URL";
pub const ENV_WS_PROTOCOLS: &str = "RANDOMTALK_WS_PROTOCOLS";
pub const ENV_WS_MAX_RETRIES: &str = "RANDOMTALK_WS_MAX_RETRIES";
pub const ENV_WS_RECONNECT_DELAY_MS: &str = "RANDOMTALK_WS_RECONNECT_DELAY_MS";

// App-root defaults used when loading from the environment
const ENV_DEFAULT_URL: &str = "ws://localhost:51000";
const ENV_DEFAULT_MAX_RETRIES: u32 = 3;
const ENV_DEFAULT_RECONNECT_DELAY_MS: u64 = 1_500;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid endpoint URL {url:?}: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("unsupported endpoint scheme {0:?} (expected ws or wss)")]
    UnsupportedScheme(String),

    #[error("invalid value {value:?} for {var}")]
    InvalidNumber { var: &'static str, value: String },
}

/// Configuration for the transport client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    endpoint: Url,
    protocols: Vec<String>,
    max_retries: u32,
    reconnect_delay: Duration,
}

impl ClientConfig {
    /// Create a configuration for `endpoint` with default retry settings.
    pub fn new(endpoint: &str) -> Result<Self, ConfigError> {
        let url = Url::parse(endpoint).map_err(|source| ConfigError::InvalidUrl {
            url: endpoint.to_string(),
            source,
        })?;
        match url.scheme() {
            "ws" | "wss" => {}
            other => return Err(ConfigError::UnsupportedScheme(other.to_string())),
        }

        Ok(Self {
            endpoint: url,
            protocols: Vec::new(),
            max_retries: DEFAULT_MAX_RETRIES,
            reconnect_delay: Duration::from_millis(DEFAULT_RECONNECT_DELAY_MS),
        })
    }

    /// Load from `RANDOMTALK_WS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let url = lookup(ENV_WS_URL).unwrap_or_else(|| ENV_DEFAULT_URL.to_string());
        let protocols: Vec<String> = lookup(ENV_WS_PROTOCOLS)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let max_retries = parse_var(&lookup, ENV_WS_MAX_RETRIES)?.unwrap_or(ENV_DEFAULT_MAX_RETRIES);
        let delay_ms = parse_var(&lookup, ENV_WS_RECONNECT_DELAY_MS)?
            .unwrap_or(ENV_DEFAULT_RECONNECT_DELAY_MS);

        Ok(Self::new(&url)?
            .with_protocols(protocols)
            .with_max_retries(max_retries)
            .with_reconnect_delay(Duration::from_millis(delay_ms)))
    }

    pub fn with_protocols<I, S>(mut self, protocols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.protocols = protocols.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Base delay; the n-th consecutive retry waits `n * reconnect_delay`.
    pub fn with_reconnect_delay(mut self, delay: Duration) -> Self {
        self.reconnect_delay = delay;
        self
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn protocols(&self) -> &[String] {
        &self.protocols
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn reconnect_delay(&self) -> Duration {
        self.reconnect_delay
    }
}

fn parse_var<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_finite() {
        let config = ClientConfig::new("ws://localhost:51000").expect("valid");
        assert_eq!(config.max_retries(), 5);
        assert_eq!(config.reconnect_delay(), Duration::from_millis(1_000));
        assert!(config.protocols().is_empty());
    }

    #[test]
    fn rejects_non_websocket_endpoints() {
        assert!(matches!(
            ClientConfig::new("http://localhost"),
            Err(ConfigError::UnsupportedScheme(s)) if s == "http"
        ));
        assert!(matches!(
            ClientConfig::new("not a url"),
            Err(ConfigError::InvalidUrl { .. })
        ));
    }

    #[test]
    fn env_defaults_match_app_root() {
        let config = ClientConfig::from_lookup(lookup_from(&[])).expect("defaults");
        assert_eq!(config.endpoint().as_str(), "ws://localhost:51000/");
        assert_eq!(config.max_retries(), 3);
        assert_eq!(config.reconnect_delay(), Duration::from_millis(1_500));
    }

    #[test]
    fn env_overrides_are_applied() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            (ENV_WS_URL, "wss://chat.example.com/ws"),
            (ENV_WS_PROTOCOLS, "chat.v1, json ,"),
            (ENV_WS_MAX_RETRIES, "7"),
            (ENV_WS_RECONNECT_DELAY_MS, "250"),
        ]))
        .expect("valid");

        assert_eq!(config.endpoint().host_str(), Some("chat.example.com"));
        assert_eq!(config.protocols(), ["chat.v1", "json"]);
        assert_eq!(config.max_retries(), 7);
        assert_eq!(config.reconnect_delay(), Duration::from_millis(250));
    }

    #[test]
    fn env_rejects_garbage_numbers() {
        let result = ClientConfig::from_lookup(lookup_from(&[(ENV_WS_MAX_RETRIES, "lots")]));
        assert!(matches!(
            result,
            Err(ConfigError::InvalidNumber { var: ENV_WS_MAX_RETRIES, .. })
        ));
    }
}
