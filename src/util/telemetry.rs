//! Tracing/logging bootstrap.
//!
//! No external collector is wired up here — this service emits structured
//! logs via `tracing` and leaves shipping them (to an OTLP collector, a log
//! aggregator, etc.) to the deployment environment. `RUST_LOG` controls
//! verbosity the usual way (`tracing_subscriber::EnvFilter`).

use tracing_subscriber::EnvFilter;

/// Builder for process-wide tracing initialization.
///
/// Mirrors the shape of a fuller OpenTelemetry-backed telemetry bootstrap
/// (service name/version tagging) without requiring an OTLP endpoint.
pub struct Telemetry {
    name: &'static str,
    version: &'static str,
}

impl Telemetry {
    pub fn new() -> Self {
        Telemetry {
            name: "sponsor-relay",
            version: env!("CARGO_PKG_VERSION"),
        }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    pub fn with_version(mut self, version: &'static str) -> Self {
        self.version = version;
        self
    }

    /// Installs the global `tracing` subscriber. Returns `self` so callers
    /// can keep it alive for the duration of the process if they later add
    /// shutdown hooks.
    pub fn register(self) -> Self {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .init();
        tracing::info!(service = self.name, version = self.version, "tracing initialized");
        self
    }

    /// HTTP tracing layer for the axum router, matching the teacher's
    /// `TraceLayer::new_for_http()` usage.
    pub fn http_tracing(&self) -> tower_http::trace::TraceLayer<tower_http::classify::SharedClassifier<tower_http::classify::ServerErrorsAsFailures>> {
        tower_http::trace::TraceLayer::new_for_http()
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}
