//! Probe results and the composite health report

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::time::Duration;

/// Free-form diagnostic fields attached to a probe result
pub type Detail = Map<String, Value>;

pub const TIMEOUT_ERROR: &str = "timeout";
pub const NOT_CONFIGURED_ERROR: &str = "not configured";

/// What a probe returns when it completes
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProbeOutcome {
    pub healthy: bool,
    pub detail: Detail,
}

impl ProbeOutcome {
    pub fn healthy() -> Self {
        Self {
            healthy: true,
            detail: Detail::new(),
        }
    }

    pub fn unhealthy() -> Self {
        Self {
            healthy: false,
            detail: Detail::new(),
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail.insert(key.into(), value.into());
        self
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProbeStatus {
    Up,
    Down,
    Timeout,
    NotConfigured,
}

impl std::fmt::Display for ProbeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProbeStatus::Up => write!(f, "UP"),
            ProbeStatus::Down => write!(f, "DOWN"),
            ProbeStatus::Timeout => write!(f, "TIMEOUT"),
            ProbeStatus::NotConfigured => write!(f, "NOT_CONFIGURED"),
        }
    }
}

/// Outcome of one dependency check within a cycle
#[derive(Clone, Debug, PartialEq)]
pub struct ProbeResult {
    name: String,
    healthy: bool,
    status: ProbeStatus,
    latency: Duration,
    detail: Detail,
    error: Option<String>,
}

impl ProbeResult {
    /// Result for a probe that ran to completion
    pub fn from_outcome(name: impl Into<String>, outcome: ProbeOutcome, latency: Duration) -> Self {
        let status = if outcome.healthy {
            ProbeStatus::Up
        } else {
            ProbeStatus::Down
        };
        Self::build(name.into(), outcome.healthy, status, latency, outcome.detail, None)
    }

    /// Result for a probe that returned an error
    pub fn failed(name: impl Into<String>, message: impl Into<String>, latency: Duration) -> Self {
        Self::build(
            name.into(),
            false,
            ProbeStatus::Down,
            latency,
            Detail::new(),
            Some(message.into()),
        )
    }

    /// Result for a probe abandoned after its timeout elapsed
    pub fn timed_out(name: impl Into<String>, latency: Duration) -> Self {
        Self::build(
            name.into(),
            false,
            ProbeStatus::Timeout,
            latency,
            Detail::new(),
            Some(TIMEOUT_ERROR.to_string()),
        )
    }

    /// Result for a registration whose collaborator is absent
    pub fn not_configured(name: impl Into<String>) -> Self {
        let mut detail = Detail::new();
        detail.insert("operation".to_string(), Value::from(NOT_CONFIGURED_ERROR));
        Self::build(
            name.into(),
            false,
            ProbeStatus::NotConfigured,
            Duration::ZERO,
            detail,
            Some(NOT_CONFIGURED_ERROR.to_string()),
        )
    }

    fn build(
        name: String,
        healthy: bool,
        status: ProbeStatus,
        latency: Duration,
        mut detail: Detail,
        error: Option<String>,
    ) -> Self {
        detail.insert("status".to_string(), Value::from(status.to_string()));
        Self {
            name,
            healthy,
            status,
            latency,
            detail,
            error,
        }
    }

    /// Merge static fields from the registration without overriding the probe's own
    pub(crate) fn with_static_detail(mut self, fields: &Detail) -> Self {
        for (key, value) in fields {
            self.detail.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn healthy(&self) -> bool {
        self.healthy
    }

    pub fn status(&self) -> ProbeStatus {
        self.status
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn detail(&self) -> &Detail {
        &self.detail
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Composite outcome of one aggregation cycle
#[derive(Clone, Debug)]
pub struct HealthReport {
    cycle_id: String,
    checked_at: DateTime<Utc>,
    elapsed: Duration,
    results: BTreeMap<String, ProbeResult>,
}

impl HealthReport {
    pub fn new(
        cycle_id: String,
        checked_at: DateTime<Utc>,
        elapsed: Duration,
        results: Vec<ProbeResult>,
    ) -> Self {
        let results = results
            .into_iter()
            .map(|result| (result.name.clone(), result))
            .collect();

        Self {
            cycle_id,
            checked_at,
            elapsed,
            results,
        }
    }

    /// True iff every probe is healthy
    pub fn overall(&self) -> bool {
        self.results.values().all(ProbeResult::healthy)
    }

    pub fn healthy_count(&self) -> usize {
        self.results.values().filter(|r| r.healthy).count()
    }

    pub fn total_count(&self) -> usize {
        self.results.len()
    }

    pub fn results(&self) -> &BTreeMap<String, ProbeResult> {
        &self.results
    }

    pub fn result(&self, name: &str) -> Option<&ProbeResult> {
        self.results.get(name)
    }

    pub fn cycle_id(&self) -> &str {
        &self.cycle_id
    }

    pub fn checked_at(&self) -> DateTime<Utc> {
        self.checked_at
    }

    /// Wall-clock time the cycle took
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Status code a health endpoint would answer with
    pub fn http_status(&self) -> u16 {
        if self.overall() { 200 } else { 503 }
    }

    pub fn to_response(&self) -> HealthResponse {
        HealthResponse::from(self)
    }
}

/// Wire rendering of a [`HealthReport`]
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub checked_at: String,
    pub details: BTreeMap<String, Detail>,
    pub summary: HealthSummary,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HealthSummary {
    pub total_services: usize,
    pub healthy_services: usize,
    pub all_healthy: bool,
    pub last_checked: String,
}

impl From<&HealthReport> for HealthResponse {
    fn from(report: &HealthReport) -> Self {
        let checked_at = report.checked_at.to_rfc3339_opts(SecondsFormat::Millis, true);
        let overall = report.overall();

        let details = report
            .results
            .iter()
            .map(|(name, result)| {
                let mut entry = Detail::new();
                entry.insert("status".to_string(), Value::from(result.status.to_string()));
                entry.insert(
                    "responseTime".to_string(),
                    Value::from(format!("{}ms", result.latency.as_millis())),
                );
                if let Some(error) = &result.error {
                    entry.insert("error".to_string(), Value::from(error.clone()));
                }
                for (key, value) in &result.detail {
                    entry.entry(key.clone()).or_insert_with(|| value.clone());
                }
                (name.clone(), entry)
            })
            .collect();

        Self {
            status: if overall { "UP" } else { "DOWN" }.to_string(),
            checked_at: checked_at.clone(),
            details,
            summary: HealthSummary {
                total_services: report.total_count(),
                healthy_services: report.healthy_count(),
                all_healthy: overall,
                last_checked: checked_at,
            },
        }
    }
}
