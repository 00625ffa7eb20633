//! External Service Health Aggregator
//!
//! This library fans out health probes to the external services a travel
//! planning backend depends on, bounds each probe with its own timeout and
//! folds the partial results into one composite report.

pub mod config;
pub mod aggregator;
pub mod probe;
pub mod probes;
pub mod report;
pub mod monitor;
pub mod errors;

pub use config::Config;
pub use aggregator::HealthAggregator;
pub use probe::{Probe, ProbeRegistration, probe_fn};
pub use report::{HealthReport, HealthResponse, ProbeOutcome, ProbeResult, ProbeStatus};
pub use monitor::HealthMonitor;
pub use errors::{HealthError, Result};
