//! Configuration management for the health aggregator

use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Name of the service reporting its dependencies
    pub service_name: String,

    /// Budget given to each individual probe
    pub probe_timeout: Duration,

    /// Timeout of the shared HTTP client used by probes
    pub http_timeout: Duration,

    /// Delay between aggregation cycles in monitor mode
    pub check_interval: Duration,

    /// Maps / geocoding health endpoint
    pub maps_url: Option<String>,

    /// AI inference health endpoint
    pub ai_url: Option<String>,

    /// Auth provider health endpoint
    pub auth_url: Option<String>,

    /// Object storage health endpoint
    pub storage_url: Option<String>,

    /// Metrics backend health endpoint
    pub metrics_url: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_name: "oddiya".to_string(),
            probe_timeout: Duration::from_secs(5),
            http_timeout: Duration::from_secs(10),
            check_interval: Duration::from_secs(30),
            maps_url: None,
            ai_url: None,
            auth_url: None,
            storage_url: None,
            metrics_url: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();

        if let Some(service_name) = lookup("SERVICE_NAME") {
            config.service_name = service_name;
        }

        if let Some(timeout) = lookup("HEALTH_CHECK_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse::<u64>() {
                config.probe_timeout = Duration::from_millis(ms);
            }
        }

        if let Some(timeout) = lookup("HTTP_TIMEOUT_SECONDS") {
            if let Ok(seconds) = timeout.parse::<u64>() {
                config.http_timeout = Duration::from_secs(seconds);
            }
        }

        if let Some(interval) = lookup("HEALTH_CHECK_INTERVAL_SECONDS") {
            if let Ok(seconds) = interval.parse::<u64>() {
                config.check_interval = Duration::from_secs(seconds);
            }
        }

        config.maps_url = endpoint(&lookup, "MAPS_HEALTH_URL");
        config.ai_url = endpoint(&lookup, "AI_HEALTH_URL");
        config.auth_url = endpoint(&lookup, "AUTH_HEALTH_URL");
        config.storage_url = endpoint(&lookup, "STORAGE_HEALTH_URL");
        config.metrics_url = endpoint(&lookup, "METRICS_HEALTH_URL");

        config
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.service_name.is_empty() {
            return Err("service_name cannot be empty".to_string());
        }

        if self.probe_timeout.is_zero() {
            return Err("probe_timeout must be greater than 0".to_string());
        }

        if self.http_timeout.is_zero() {
            return Err("http_timeout must be greater than 0".to_string());
        }

        if self.check_interval.is_zero() {
            return Err("check_interval must be greater than 0".to_string());
        }

        let endpoints = [
            ("maps_url", &self.maps_url),
            ("ai_url", &self.ai_url),
            ("auth_url", &self.auth_url),
            ("storage_url", &self.storage_url),
            ("metrics_url", &self.metrics_url),
        ];

        for (field, url) in endpoints {
            if let Some(url) = url {
                if !url.starts_with("http://") && !url.starts_with("https://") {
                    return Err(format!("{} must be an http(s) URL, got '{}'", field, url));
                }
            }
        }

        Ok(())
    }
}

/// Blank values count as "not configured"
fn endpoint<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key)
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert!(config.maps_url.is_none());
    }

    #[test]
    fn test_lookup_overrides() {
        let config = Config::from_lookup(lookup_from(&[
            ("SERVICE_NAME", "travel-api"),
            ("HEALTH_CHECK_TIMEOUT_MS", "250"),
            ("MAPS_HEALTH_URL", "http://maps.internal/health"),
            ("AI_HEALTH_URL", "   "),
        ]));

        assert_eq!(config.service_name, "travel-api");
        assert_eq!(config.probe_timeout, Duration::from_millis(250));
        assert_eq!(config.maps_url.as_deref(), Some("http://maps.internal/health"));
        assert!(config.ai_url.is_none());
    }

    #[test]
    fn test_unparseable_values_keep_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("HEALTH_CHECK_TIMEOUT_MS", "soon"),
            ("HTTP_TIMEOUT_SECONDS", "-1"),
        ]));

        assert_eq!(config.probe_timeout, Duration::from_secs(5));
        assert_eq!(config.http_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = Config::default();
        config.probe_timeout = Duration::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.storage_url = Some("s3://bucket".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.contains("storage_url"));

        let mut config = Config::default();
        config.service_name.clear();
        assert!(config.validate().is_err());
    }
}
