//! Probe seam and static probe registrations

use crate::errors::{HealthError, Result};
use crate::report::{Detail, ProbeOutcome};
use async_trait::async_trait;
use serde_json::Value;
use std::any::Any;
use std::future::Future;
use std::sync::Arc;

/// A health check against one external dependency.
///
/// Implementations may be dropped at any await point once the aggregator's
/// per-probe timeout elapses, so they must not leave half-applied side
/// effects behind. Clients shared between probes must be safe for
/// concurrent use. Probes that block the calling thread (synchronous SDK
/// clients) must be wrapped with [`blocking_probe_fn`], otherwise they stall
/// the runtime thread that drives the timeout.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn check(&self) -> Result<ProbeOutcome>;
}

/// Adapts an async closure into a [`Probe`]
pub struct FnProbe<F> {
    f: F,
}

impl<F> FnProbe<F> {
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

#[async_trait]
impl<F, Fut> Probe for FnProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ProbeOutcome>> + Send + 'static,
{
    async fn check(&self) -> Result<ProbeOutcome> {
        (self.f)().await
    }
}

/// Shorthand for wrapping a closure as a shared probe
pub fn probe_fn<F, Fut>(f: F) -> Arc<dyn Probe>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<ProbeOutcome>> + Send + 'static,
{
    Arc::new(FnProbe::new(f))
}

/// Adapts a synchronous closure into a [`Probe`] that runs on tokio's blocking pool.
///
/// Once the aggregator stops waiting, the closure keeps running on its
/// blocking thread until it returns; its result is discarded.
pub struct BlockingFnProbe<F> {
    f: Arc<F>,
}

impl<F> BlockingFnProbe<F> {
    pub fn new(f: F) -> Self {
        Self { f: Arc::new(f) }
    }
}

#[async_trait]
impl<F> Probe for BlockingFnProbe<F>
where
    F: Fn() -> Result<ProbeOutcome> + Send + Sync + 'static,
{
    async fn check(&self) -> Result<ProbeOutcome> {
        let f = Arc::clone(&self.f);
        match tokio::task::spawn_blocking(move || f()).await {
            Ok(result) => result,
            // Re-raise so the panic is reported like one from an async probe.
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(e) => Err(HealthError::Other(format!("blocking task cancelled: {}", e))),
        }
    }
}

/// Shorthand for wrapping a blocking closure as a shared probe
pub fn blocking_probe_fn<F>(f: F) -> Arc<dyn Probe>
where
    F: Fn() -> Result<ProbeOutcome> + Send + Sync + 'static,
{
    Arc::new(BlockingFnProbe::new(f))
}

/// Best-effort text of a panic payload
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Name, probe and enabled flag, assembled once at startup
#[derive(Clone)]
pub struct ProbeRegistration {
    name: String,
    probe: Option<Arc<dyn Probe>>,
    enabled: bool,
    detail: Detail,
}

impl ProbeRegistration {
    pub fn new(name: impl Into<String>, probe: Arc<dyn Probe>) -> Self {
        Self {
            name: name.into(),
            probe: Some(probe),
            enabled: true,
            detail: Detail::new(),
        }
    }

    /// Registration for a collaborator that could not be constructed
    pub fn unconfigured(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            probe: None,
            enabled: false,
            detail: Detail::new(),
        }
    }

    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.detail.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Probe to invoke, or `None` when the registration is disabled
    pub fn active_probe(&self) -> Option<&Arc<dyn Probe>> {
        if self.enabled { self.probe.as_ref() } else { None }
    }

    pub fn is_enabled(&self) -> bool {
        self.active_probe().is_some()
    }

    pub fn detail(&self) -> &Detail {
        &self.detail
    }
}

impl std::fmt::Debug for ProbeRegistration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProbeRegistration")
            .field("name", &self.name)
            .field("enabled", &self.is_enabled())
            .field("detail", &self.detail)
            .finish()
    }
}
