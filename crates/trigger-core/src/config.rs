use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for the trigger widget and its fulfillment server.
///
/// Loaded from `~/.trigger/config.toml` by default. Each section corresponds
/// to one part of the system.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub widget: WidgetConfig,
    #[serde(default)]
    pub submission: SubmissionConfig,
    #[serde(default)]
    pub server: ServerConfig,
}

impl TriggerConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TriggerConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Widget presentation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WidgetConfig {
    /// Render with the dark theme.
    pub darkmode: bool,
    /// How far ahead of widget construction a datetime field may reach.
    pub datetime_horizon_days: u32,
}

impl Default for WidgetConfig {
    fn default() -> Self {
        Self {
            darkmode: false,
            datetime_horizon_days: 30,
        }
    }
}

/// Outbound submission settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionConfig {
    /// Hard budget for one submission round trip, in milliseconds.
    pub timeout_ms: u64,
    /// Base used to resolve relative action URLs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    /// Acknowledge transport failures to the user instead of only logging them.
    pub surface_transport_errors: bool,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 6000,
            base_url: None,
            surface_transport_errors: false,
        }
    }
}

impl SubmissionConfig {
    pub fn timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.timeout_ms)
    }
}

/// Fulfillment server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind.
    pub host: String,
    /// Listen port. The `PORT` environment variable takes precedence.
    pub port: u16,
    /// Directory served under `/public`.
    pub public_dir: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            public_dir: "public".to_string(),
        }
    }
}

impl ServerConfig {
    /// Socket address string in `host:port` form.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
