//! HTTP probes for the external services the travel backend depends on

use crate::config::Config;
use crate::errors::{HealthError, Result};
use crate::probe::{Probe, ProbeRegistration};
use crate::report::ProbeOutcome;

use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Address geocoded by the maps probe (Seoul City Hall)
pub const MAPS_TEST_ADDRESS: &str = "서울특별시 중구 세종대로 110";

/// External dependencies monitored by the aggregator
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Dependency {
    Maps,
    Ai,
    Auth,
    Storage,
    Metrics,
}

impl Dependency {
    pub const ALL: [Dependency; 5] = [
        Dependency::Maps,
        Dependency::Ai,
        Dependency::Auth,
        Dependency::Storage,
        Dependency::Metrics,
    ];

    /// Key used in the health report
    pub fn name(&self) -> &'static str {
        match self {
            Dependency::Maps => "naverMaps",
            Dependency::Ai => "awsBedrock",
            Dependency::Auth => "supabaseAuth",
            Dependency::Storage => "awsS3",
            Dependency::Metrics => "awsCloudWatch",
        }
    }

    pub fn service(&self) -> &'static str {
        match self {
            Dependency::Maps => "Naver Maps Geocoding API",
            Dependency::Ai => "AWS Bedrock AI",
            Dependency::Auth => "Supabase Authentication",
            Dependency::Storage => "AWS S3 Storage",
            Dependency::Metrics => "AWS CloudWatch Monitoring",
        }
    }

    /// Lightweight operation exercised by the probe
    pub fn operation(&self) -> &'static str {
        match self {
            Dependency::Maps => "geocode",
            Dependency::Ai => "listFoundationModels",
            Dependency::Auth => "health check",
            Dependency::Storage => "listBuckets",
            Dependency::Metrics => "listMetrics",
        }
    }

    fn endpoint<'a>(&self, config: &'a Config) -> Option<&'a str> {
        match self {
            Dependency::Maps => config.maps_url.as_deref(),
            Dependency::Ai => config.ai_url.as_deref(),
            Dependency::Auth => config.auth_url.as_deref(),
            Dependency::Storage => config.storage_url.as_deref(),
            Dependency::Metrics => config.metrics_url.as_deref(),
        }
    }
}

/// GETs a health URL; any 2xx answer counts as healthy
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    url: String,
    operation: String,
}

impl HttpProbe {
    pub fn new(client: Client, url: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            operation: operation.into(),
        }
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn check(&self) -> Result<ProbeOutcome> {
        debug!("Probing {} ({})", self.url, self.operation);

        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(HealthError::Http)?;

        let status = response.status();
        let outcome = if status.is_success() {
            ProbeOutcome::healthy()
        } else {
            ProbeOutcome::unhealthy()
        };

        Ok(outcome
            .with_detail("endpoint", self.url.clone())
            .with_detail("operation", self.operation.clone())
            .with_detail("httpStatus", status.as_u16()))
    }
}

/// Build the shared HTTP client used by every probe
pub fn build_client(http_timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(http_timeout)
        .user_agent(format!("service_health/{}", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(HealthError::Http)
}

/// One registration per dependency; those without an endpoint are disabled
pub fn registrations_from_config(config: &Config) -> Result<Vec<ProbeRegistration>> {
    let client = build_client(config.http_timeout)?;

    let registrations = Dependency::ALL
        .iter()
        .map(|dependency| {
            let registration = match dependency.endpoint(config) {
                Some(url) => {
                    let probe: Arc<dyn Probe> =
                        Arc::new(HttpProbe::new(client.clone(), url, dependency.operation()));
                    ProbeRegistration::new(dependency.name(), probe)
                }
                None => {
                    info!("{} is not configured, its probe is disabled", dependency.service());
                    ProbeRegistration::unconfigured(dependency.name())
                }
            };

            let registration = registration.with_detail("service", dependency.service());
            match dependency {
                Dependency::Maps => registration.with_detail("testAddress", MAPS_TEST_ADDRESS),
                _ => registration,
            }
        })
        .collect();

    Ok(registrations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregator::HealthAggregator;
    use crate::report::ProbeStatus;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client() -> Client {
        build_client(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_dependency_names_are_unique() {
        let mut names: Vec<&str> = Dependency::ALL.iter().map(Dependency::name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 5);
    }

    #[tokio::test]
    async fn test_http_probe_healthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(client(), format!("{}/health", server.uri()), "listBuckets");
        let outcome = probe.check().await.unwrap();

        assert!(outcome.healthy);
        assert_eq!(outcome.detail["httpStatus"], 200);
        assert_eq!(outcome.detail["operation"], "listBuckets");
    }

    #[tokio::test]
    async fn test_http_probe_server_error_is_unhealthy() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let probe = HttpProbe::new(client(), format!("{}/health", server.uri()), "health check");
        let outcome = probe.check().await.unwrap();

        assert!(!outcome.healthy);
        assert_eq!(outcome.detail["httpStatus"], 503);
    }

    #[tokio::test]
    async fn test_http_probe_connection_error() {
        // Port 1 on localhost is not expected to accept connections.
        let probe = HttpProbe::new(client(), "http://127.0.0.1:1/health", "geocode");
        let err = probe.check().await.unwrap_err();
        assert!(matches!(err, HealthError::Http(_)));
    }

    #[test]
    fn test_registrations_follow_configured_endpoints() {
        let mut config = Config::default();
        config.maps_url = Some("http://maps.internal/health".to_string());
        config.storage_url = Some("http://storage.internal/health".to_string());

        let registrations = registrations_from_config(&config).unwrap();

        assert_eq!(registrations.len(), 5);
        let enabled: Vec<&str> = registrations
            .iter()
            .filter(|r| r.is_enabled())
            .map(ProbeRegistration::name)
            .collect();
        assert_eq!(enabled, vec!["naverMaps", "awsS3"]);
        assert_eq!(registrations[0].detail()["testAddress"], MAPS_TEST_ADDRESS);
    }

    #[tokio::test]
    async fn test_aggregates_mock_dependencies() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/maps"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/auth"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
            .mount(&server)
            .await;

        let mut config = Config::default();
        config.maps_url = Some(format!("{}/maps", server.uri()));
        config.auth_url = Some(format!("{}/auth", server.uri()));

        let aggregator = HealthAggregator::new(
            registrations_from_config(&config).unwrap(),
            Duration::from_millis(300),
        )
        .unwrap();
        let report = aggregator.check_health().await;

        assert_eq!(report.total_count(), 5);
        assert_eq!(report.healthy_count(), 1);

        let maps = report.result("naverMaps").unwrap();
        assert_eq!(maps.status(), ProbeStatus::Up);
        assert_eq!(maps.detail()["service"], "Naver Maps Geocoding API");

        assert_eq!(report.result("supabaseAuth").unwrap().error(), Some("timeout"));
        assert_eq!(report.result("awsS3").unwrap().error(), Some("not configured"));
    }
}
