//! Engine configuration loaded from the environment.

use std::str::FromStr;
use std::time::Duration;

/// Number of candidate species rolled per species-selection berry.
pub const DEFAULT_SPECIES_ROLL_COUNT: usize = 10;

/// How long a batch may sit in species selection before it is dropped.
pub const DEFAULT_SELECTION_TTL_SECONDS: u64 = 30 * 60;

pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

pub const DEFAULT_CLEANUP_INTERVAL_SECONDS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Base URL of the community site's REST API
    pub api_base_url: String,
    /// Bearer token sent with every API request
    pub api_token: Option<String>,
    pub server_host: String,
    pub server_port: u16,
    pub species_roll_count: usize,
    pub selection_ttl: Duration,
    pub request_timeout: Duration,
    pub cleanup_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:4890/api".to_string(),
            api_token: None,
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            species_roll_count: DEFAULT_SPECIES_ROLL_COUNT,
            selection_ttl: Duration::from_secs(DEFAULT_SELECTION_TTL_SECONDS),
            request_timeout: Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS),
            cleanup_interval: Duration::from_secs(DEFAULT_CLEANUP_INTERVAL_SECONDS),
        }
    }
}

impl EngineConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup. Missing keys keep their defaults;
    /// unparseable values are logged and ignored.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        let get = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let api_base_url = get("TRAINERHUB_API_URL")
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_base_url);
        let server_port = get("SERVER_PORT")
            .or_else(|| get("PORT"))
            .and_then(|raw| parse_or_warn("SERVER_PORT", &raw))
            .unwrap_or(defaults.server_port);
        let species_roll_count = get("SPECIES_ROLL_COUNT")
            .and_then(|raw| parse_or_warn::<usize>("SPECIES_ROLL_COUNT", &raw))
            .filter(|count| *count > 0)
            .unwrap_or(defaults.species_roll_count);

        Self {
            api_base_url,
            api_token: get("TRAINERHUB_API_TOKEN"),
            server_host: get("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port,
            species_roll_count,
            selection_ttl: seconds(&get, "SPECIES_SELECTION_TTL_SECONDS")
                .unwrap_or(defaults.selection_ttl),
            request_timeout: seconds(&get, "HTTP_REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout),
            cleanup_interval: seconds(&get, "SESSION_CLEANUP_INTERVAL_SECONDS")
                .unwrap_or(defaults.cleanup_interval),
        }
    }
}

fn seconds(get: &impl Fn(&str) -> Option<String>, key: &str) -> Option<Duration> {
    get(key)
        .and_then(|raw| parse_or_warn::<u64>(key, &raw))
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

fn parse_or_warn<T: FromStr>(key: &str, raw: &str) -> Option<T> {
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(key, value = raw, "Ignoring unparseable configuration value");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> EngineConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        EngineConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn empty_environment_uses_defaults() {
        assert_eq!(config_from(&[]), EngineConfig::default());
    }

    #[test]
    fn reads_overrides() {
        let config = config_from(&[
            ("TRAINERHUB_API_URL", "https://example.test/api/"),
            ("TRAINERHUB_API_TOKEN", "secret"),
            ("SERVER_PORT", "8080"),
            ("SPECIES_ROLL_COUNT", "6"),
            ("SPECIES_SELECTION_TTL_SECONDS", "120"),
        ]);

        assert_eq!(config.api_base_url, "https://example.test/api");
        assert_eq!(config.api_token.as_deref(), Some("secret"));
        assert_eq!(config.server_port, 8080);
        assert_eq!(config.species_roll_count, 6);
        assert_eq!(config.selection_ttl, Duration::from_secs(120));
    }

    #[test]
    fn invalid_values_fall_back_to_defaults() {
        let config = config_from(&[
            ("SERVER_PORT", "not-a-port"),
            ("SPECIES_ROLL_COUNT", "0"),
            ("HTTP_REQUEST_TIMEOUT_SECONDS", "-5"),
            ("TRAINERHUB_API_TOKEN", "   "),
        ]);

        assert_eq!(config.server_port, 3000);
        assert_eq!(config.species_roll_count, DEFAULT_SPECIES_ROLL_COUNT);
        assert_eq!(
            config.request_timeout,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECONDS)
        );
        assert_eq!(config.api_token, None);
    }

    #[test]
    fn port_falls_back_to_generic_port_variable() {
        let config = config_from(&[("PORT", "9000")]);
        assert_eq!(config.server_port, 9000);
    }
}
