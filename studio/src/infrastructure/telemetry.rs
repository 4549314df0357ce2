//! Structured logging setup.

use anyhow::{Context, Result};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer, Registry,
};

/// Builder for setting up telemetry (structured JSON logging).
pub struct TelemetryBuilder {
    service_name: String,
    service_version: String,
    log_level: String,
}

impl TelemetryBuilder {
    /// Create a builder for the given service identity.
    pub fn new(service_name: impl Into<String>, service_version: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
            service_version: service_version.into(),
            log_level: "info".to_string(),
        }
    }

    /// Set the default log level used when `RUST_LOG` is unset.
    #[must_use]
    pub fn with_log_level(mut self, level: impl Into<String>) -> Self {
        self.log_level = level.into();
        self
    }

    /// Initializes the global tracing subscriber.
    ///
    /// # Errors
    ///
    /// Returns an error if a global subscriber has already been installed.
    pub fn init(self) -> Result<()> {
        let env_filter =
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&self.log_level));

        let fmt_layer = fmt::layer().json().with_span_events(FmtSpan::CLOSE).boxed();

        Registry::default()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .context("Failed to init subscriber")?;

        tracing::info!(
            service = %self.service_name,
            version = %self.service_version,
            "telemetry initialized"
        );

        Ok(())
    }
}
