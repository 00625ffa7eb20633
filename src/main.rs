//! External service health check binary

use clap::Parser;
use service_health::{Config, HealthMonitor, Result};
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(version, about = "Aggregate health probes for external dependencies")]
struct Args {
    /// Run a single check cycle and exit with 0 when healthy, 1 otherwise
    #[arg(long)]
    once: bool,

    /// Pretty-print JSON reports
    #[arg(long)]
    pretty: bool,

    /// Seconds between cycles, overriding HEALTH_CHECK_INTERVAL_SECONDS
    #[arg(long)]
    interval_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize tracing
    initialize_tracing();

    info!("Starting service health aggregator v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let mut config = Config::from_env();
    if let Some(seconds) = args.interval_secs {
        config.check_interval = Duration::from_secs(seconds);
    }

    // Validate configuration
    if let Err(e) = config.validate() {
        error!("Configuration validation failed: {}", e);
        std::process::exit(1);
    }

    info!(
        "Health configuration - Service: {}, Probe timeout: {}ms, Interval: {}s",
        config.service_name,
        config.probe_timeout.as_millis(),
        config.check_interval.as_secs()
    );

    let monitor = HealthMonitor::new(config)?.pretty(args.pretty);

    if args.once {
        let report = monitor.check_once().await;
        monitor.emit(&report)?;
        std::process::exit(if report.overall() { 0 } else { 1 });
    }

    if let Err(e) = monitor.start().await {
        error!("Health monitor failed: {}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Initialize structured logging on stderr, leaving stdout for reports
fn initialize_tracing() {
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_file(false)
        .with_line_number(false)
        .json();

    let filter_layer = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| tracing_subscriber::EnvFilter::try_new(&log_level))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter_layer)
        .with(fmt_layer)
        .init();
}
