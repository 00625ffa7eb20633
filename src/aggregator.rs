//! Concurrent fan-out of dependency probes into one health report

use crate::errors::{HealthError, Result};
use crate::probe::{ProbeRegistration, panic_message};
use crate::report::{HealthReport, ProbeResult};

use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Runs every registered probe concurrently, each bounded by its own timeout.
///
/// A failing, hung or unconfigured dependency only degrades its own entry in
/// the report; `check_health` itself never fails.
#[derive(Debug)]
pub struct HealthAggregator {
    registrations: Vec<ProbeRegistration>,
    timeout: Duration,
}

impl HealthAggregator {
    /// Validate the registrations and build the aggregator.
    ///
    /// Rejects an empty registration list, blank or duplicate names and a
    /// zero timeout. No probe runs during construction.
    pub fn new(registrations: Vec<ProbeRegistration>, timeout: Duration) -> Result<Self> {
        if registrations.is_empty() {
            return Err(HealthError::Config("at least one probe must be registered".to_string()));
        }

        if timeout.is_zero() {
            return Err(HealthError::Config("probe timeout must be greater than 0".to_string()));
        }

        let mut seen = HashSet::new();
        for registration in &registrations {
            if registration.name().trim().is_empty() {
                return Err(HealthError::Config("probe name cannot be empty".to_string()));
            }
            if !seen.insert(registration.name()) {
                return Err(HealthError::Config(format!(
                    "duplicate probe name: {}",
                    registration.name()
                )));
            }
        }

        Ok(Self {
            registrations,
            timeout,
        })
    }

    /// Per-probe timeout
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn probe_names(&self) -> impl Iterator<Item = &str> {
        self.registrations.iter().map(ProbeRegistration::name)
    }

    /// Run one aggregation cycle.
    ///
    /// Every enabled probe is spawned with `tokio::spawn`, so the returned
    /// future must be polled inside a tokio runtime; polling it from another
    /// executor (e.g. `futures::executor::block_on`) panics.
    #[instrument(skip(self), fields(probes = self.registrations.len()))]
    pub async fn check_health(&self) -> HealthReport {
        let cycle_id = Uuid::new_v4().to_string();
        let checked_at = Utc::now();
        let started = Instant::now();

        debug!("Starting health check cycle {}", cycle_id);

        let checks = self
            .registrations
            .iter()
            .map(|registration| self.run_probe(registration));
        let results = join_all(checks).await;

        let report = HealthReport::new(cycle_id, checked_at, started.elapsed(), results);

        if report.overall() {
            info!(
                "Health check cycle {} at {} complete - {}/{} dependencies healthy in {}ms",
                report.cycle_id(),
                report.checked_at().to_rfc3339(),
                report.healthy_count(),
                report.total_count(),
                report.elapsed().as_millis()
            );
        } else {
            warn!(
                "Health check cycle {} at {} degraded - {}/{} dependencies healthy in {}ms",
                report.cycle_id(),
                report.checked_at().to_rfc3339(),
                report.healthy_count(),
                report.total_count(),
                report.elapsed().as_millis()
            );
        }

        report
    }

    /// Run a single probe on its own task and wait at most `self.timeout`
    async fn run_probe(&self, registration: &ProbeRegistration) -> ProbeResult {
        let name = registration.name();

        let Some(probe) = registration.active_probe() else {
            debug!("Probe {} is not configured, skipping", name);
            return ProbeResult::not_configured(name).with_static_detail(registration.detail());
        };

        let probe = Arc::clone(probe);
        let start = Instant::now();
        let mut handle = tokio::spawn(async move { probe.check().await });

        let result = match timeout(self.timeout, &mut handle).await {
            Ok(Ok(Ok(outcome))) => {
                let result = ProbeResult::from_outcome(name, outcome, start.elapsed());
                if !result.healthy() {
                    warn!("Probe {} reported unhealthy", name);
                }
                result
            }
            Ok(Ok(Err(e))) => {
                warn!("Probe {} failed: {}", name, e);
                ProbeResult::failed(name, e.to_string(), start.elapsed())
            }
            Ok(Err(join_error)) => {
                warn!("Probe {} task did not complete: {}", name, join_error);
                let message = if join_error.is_panic() {
                    let payload = join_error.into_panic();
                    format!("probe panicked: {}", panic_message(payload.as_ref()))
                } else {
                    format!("probe task cancelled: {}", join_error)
                };
                ProbeResult::failed(name, message, start.elapsed())
            }
            Err(_) => {
                // Signal cancellation; the task may still run until its next await point.
                handle.abort();
                warn!(
                    "Probe {} timed out after {}ms",
                    name,
                    self.timeout.as_millis()
                );
                ProbeResult::timed_out(name, start.elapsed())
            }
        };

        result.with_static_detail(registration.detail())
    }
}
