//! Periodic health checking of the configured dependencies

use crate::aggregator::HealthAggregator;
use crate::config::Config;
use crate::errors::{HealthError, Result};
use crate::probes::registrations_from_config;
use crate::report::HealthReport;

use std::io::Write;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{error, info, instrument};

/// Drives aggregation cycles and renders each report as a JSON line
pub struct HealthMonitor {
    config: Config,
    aggregator: HealthAggregator,
    pretty: bool,
    stats: Arc<RwLock<MonitorStats>>,
}

/// Counters across all cycles run by a monitor
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitorStats {
    pub cycles: u64,
    pub unhealthy_cycles: u64,
    pub last_overall: Option<bool>,
}

impl HealthMonitor {
    /// Create a monitor over the dependencies named in `config`
    pub fn new(config: Config) -> Result<Self> {
        config.validate().map_err(HealthError::Config)?;

        let registrations = registrations_from_config(&config)?;
        let aggregator = HealthAggregator::new(registrations, config.probe_timeout)?;

        Self::with_aggregator(config, aggregator)
    }

    /// Create a monitor around an already assembled aggregator
    pub fn with_aggregator(config: Config, aggregator: HealthAggregator) -> Result<Self> {
        config.validate().map_err(HealthError::Config)?;

        Ok(Self {
            config,
            aggregator,
            pretty: false,
            stats: Arc::new(RwLock::new(MonitorStats::default())),
        })
    }

    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    /// Run one aggregation cycle and record it
    pub async fn check_once(&self) -> HealthReport {
        let report = self.aggregator.check_health().await;

        let mut stats = self.stats.write().await;
        stats.cycles += 1;
        if !report.overall() {
            stats.unhealthy_cycles += 1;
        }
        stats.last_overall = Some(report.overall());

        report
    }

    /// Check on an interval, writing every report to stdout, until Ctrl-C
    #[instrument(skip(self), fields(service = %self.config.service_name))]
    pub async fn start(&self) -> Result<()> {
        info!(
            "Monitoring {} dependencies every {}s with a {}ms probe timeout",
            self.aggregator.probe_names().count(),
            self.config.check_interval.as_secs(),
            self.aggregator.timeout().as_millis()
        );

        let mut ticker = interval(self.config.check_interval);
        // A slow cycle pushes the schedule back instead of bursting to catch up.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let report = self.check_once().await;
                    if let Err(e) = self.emit(&report) {
                        error!("Failed to write health report: {}", e);
                    }
                }
                signal = tokio::signal::ctrl_c() => {
                    signal.map_err(|e| {
                        HealthError::Other(format!("Failed to wait for shutdown signal: {}", e))
                    })?;
                    break;
                }
            }
        }

        let stats = self.stats().await;
        info!(
            "Health monitor shutting down after {} cycles ({} unhealthy)",
            stats.cycles, stats.unhealthy_cycles
        );
        Ok(())
    }

    /// Write a report to stdout as one JSON document
    pub fn emit(&self, report: &HealthReport) -> Result<()> {
        let rendered = self.render(report)?;
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", rendered)?;
        stdout.flush()?;
        Ok(())
    }

    pub fn render(&self, report: &HealthReport) -> Result<String> {
        let response = report.to_response();
        let rendered = if self.pretty {
            serde_json::to_string_pretty(&response)?
        } else {
            serde_json::to_string(&response)?
        };
        Ok(rendered)
    }

    pub async fn stats(&self) -> MonitorStats {
        self.stats.read().await.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::{ProbeRegistration, probe_fn};
    use crate::report::ProbeOutcome;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[test]
    fn test_new_rejects_invalid_config() {
        let mut config = Config::default();
        config.probe_timeout = Duration::ZERO;

        assert!(matches!(HealthMonitor::new(config), Err(HealthError::Config(_))));
    }

    #[test]
    fn test_with_aggregator_rejects_zero_interval() {
        let aggregator = HealthAggregator::new(
            vec![ProbeRegistration::new(
                "naverMaps",
                probe_fn(|| async { Ok(ProbeOutcome::healthy()) }),
            )],
            Duration::from_secs(1),
        )
        .unwrap();
        let mut config = Config::default();
        config.check_interval = Duration::ZERO;

        let err = HealthMonitor::with_aggregator(config, aggregator).err().unwrap();
        assert!(err.to_string().contains("check_interval"));
    }

    #[tokio::test]
    async fn test_unconfigured_deployment_reports_down() {
        let monitor = HealthMonitor::new(Config::default()).unwrap();
        let report = monitor.check_once().await;

        assert_eq!(report.total_count(), 5);
        assert_eq!(report.healthy_count(), 0);
        assert_eq!(report.http_status(), 503);
    }

    #[tokio::test]
    async fn test_stats_track_cycles() {
        let up = Arc::new(AtomicBool::new(true));
        let probe = {
            let up = Arc::clone(&up);
            probe_fn(move || {
                let healthy = up.load(Ordering::SeqCst);
                async move {
                    Ok(if healthy {
                        ProbeOutcome::healthy()
                    } else {
                        ProbeOutcome::unhealthy()
                    })
                }
            })
        };
        let aggregator = HealthAggregator::new(
            vec![ProbeRegistration::new("naverMaps", probe)],
            Duration::from_secs(1),
        )
        .unwrap();
        let monitor = HealthMonitor::with_aggregator(Config::default(), aggregator).unwrap();

        assert!(monitor.check_once().await.overall());
        up.store(false, Ordering::SeqCst);
        assert!(!monitor.check_once().await.overall());

        let stats = monitor.stats().await;
        assert_eq!(stats.cycles, 2);
        assert_eq!(stats.unhealthy_cycles, 1);
        assert_eq!(stats.last_overall, Some(false));
    }

    #[tokio::test]
    async fn test_render_json() {
        let aggregator = HealthAggregator::new(
            vec![ProbeRegistration::new(
                "naverMaps",
                probe_fn(|| async { Ok(ProbeOutcome::healthy()) }),
            )],
            Duration::from_secs(1),
        )
        .unwrap();
        let monitor = HealthMonitor::with_aggregator(Config::default(), aggregator).unwrap();

        let report = monitor.check_once().await;
        let compact = monitor.render(&report).unwrap();
        assert!(!compact.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&compact).unwrap();
        assert_eq!(value["status"], "UP");
        assert_eq!(value["details"]["naverMaps"]["status"], "UP");

        let monitor = monitor.pretty(true);
        assert!(monitor.render(&report).unwrap().contains('\n'));
    }
}
