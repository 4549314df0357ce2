//! Runtime configuration for the studio core.

use config::{Config, ConfigError, Environment};
use secrecy::SecretString;
use serde::Deserialize;

/// Top-level settings, loaded from the environment.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    /// HTTP server bind settings.
    pub server: ServerSettings,
    /// Logging settings.
    pub telemetry: TelemetrySettings,
    /// Record store settings.
    pub database: DatabaseSettings,
    /// Shared filesystem layout settings.
    pub layout: LayoutSettings,
    /// Background provisioning settings.
    pub provisioner: ProvisionerSettings,
}

/// HTTP server bind settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    /// Interface to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Logging settings.
#[derive(Debug, Deserialize, Clone)]
pub struct TelemetrySettings {
    /// Service name reported in log output.
    pub service_name: String,
    /// Default log level when `RUST_LOG` is unset.
    pub log_level: String,
}

/// Record store settings.
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    /// SQLite connection URL.
    pub url: SecretString,
}

/// Shared filesystem layout settings.
///
/// Both directories are externally configured: the assets root holds
/// instance icons, and the default tool directory is the bundle copied
/// for instances created without a template.
#[derive(Debug, Deserialize, Clone)]
pub struct LayoutSettings {
    /// Root directory for dynamic assets (instance icons live beneath it).
    pub assets_dir: String,
    /// Source directory of the built-in default tool bundle.
    pub default_tool_dir: String,
}

/// Background provisioning settings.
#[derive(Debug, Deserialize, Clone)]
pub struct ProvisionerSettings {
    /// Number of provisioning worker tasks.
    pub workers: usize,
    /// Python interpreter used to build isolated environments.
    pub python_bin: String,
}

impl Settings {
    /// Load settings from `STUDIO__`-prefixed environment variables,
    /// falling back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the environment contains values that fail to
    /// deserialize into the settings structs.
    pub fn new() -> Result<Self, ConfigError> {
        let s = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 9095)?
            .set_default("telemetry.service_name", "studio-core")?
            .set_default("telemetry.log_level", "info")?
            .set_default("database.url", "sqlite:studio.db?mode=rwc")?
            .set_default("layout.assets_dir", "studio-data/assets")?
            .set_default("layout.default_tool_dir", "data/default_tool")?
            .set_default("provisioner.workers", 4)?
            .set_default("provisioner.python_bin", "python3")?
            // Merge in Environment variables
            .add_source(Environment::with_prefix("STUDIO").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
