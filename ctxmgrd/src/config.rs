//! # Daemon Configuration
//!
//! Everything is defaulted, so an empty file (or no file) is a valid
//! configuration. Command-line flags are applied on top in `main`.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use transport::CallRestriction;

/// Configuration error types
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Invalid configuration: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// What to do when the transport refuses to make this process its context
/// manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the process
    #[default]
    Fatal,
    /// Log the failure and keep serving
    Log,
}

/// Which timer source drives the liveness sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerBackend {
    /// A kernel timer descriptor (Linux only)
    #[serde(rename = "timerfd")]
    #[default]
    TimerFd,
    /// A deadline driven by the reactor's wait timeout
    Interval,
}

/// Settings the bootstrap sequence consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapConfig {
    /// Instance name the built-in services are registered under
    pub service_name: String,
    /// Readiness property key
    pub readiness_key: String,
    /// Readiness property value
    pub readiness_value: String,
    /// Liveness sweep period; also the delay before the first sweep
    pub sweep_period: Duration,
    pub context_manager_failure: FailurePolicy,
    pub call_restriction: CallRestriction,
    pub timer: TimerBackend,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        DaemonConfig::default().bootstrap()
    }
}

/// Daemon configuration file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub service_name: String,
    pub readiness_key: String,
    pub readiness_value: String,
    pub sweep_period_ms: u64,
    pub context_manager_failure: FailurePolicy,
    pub call_restriction: CallRestriction,
    pub timer: TimerBackend,
    /// Well-known socket clients connect to
    pub socket_path: PathBuf,
    /// Directory the readiness property is written to
    pub property_dir: PathBuf,
    /// Default log filter; `RUST_LOG` takes precedence
    pub log_filter: String,
    /// Per-connection read and write timeout
    pub request_timeout_ms: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            service_name: core_types::DEFAULT_INSTANCE.to_string(),
            readiness_key: core_types::READY_PROPERTY.to_string(),
            readiness_value: "true".to_string(),
            sweep_period_ms: 5000,
            context_manager_failure: FailurePolicy::default(),
            call_restriction: CallRestriction::default(),
            timer: TimerBackend::default(),
            socket_path: PathBuf::from("/run/ctxmgr/ctxmgr.sock"),
            property_dir: PathBuf::from("/run/ctxmgr/properties"),
            log_filter: "info".to_string(),
            request_timeout_ms: 250,
        }
    }
}

impl DaemonConfig {
    /// Loads and validates a configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: DaemonConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service_name.is_empty() {
            return Err(ConfigError::Invalid {
                field: "service_name",
                reason: "must not be empty".to_string(),
            });
        }
        if self.readiness_key.is_empty() {
            return Err(ConfigError::Invalid {
                field: "readiness_key",
                reason: "must not be empty".to_string(),
            });
        }
        if self.sweep_period_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "sweep_period_ms",
                reason: "must be positive".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    /// Extracts the part of the configuration the bootstrap sequence uses.
    pub fn bootstrap(&self) -> BootstrapConfig {
        BootstrapConfig {
            service_name: self.service_name.clone(),
            readiness_key: self.readiness_key.clone(),
            readiness_value: self.readiness_value.clone(),
            sweep_period: Duration::from_millis(self.sweep_period_ms),
            context_manager_failure: self.context_manager_failure,
            call_restriction: self.call_restriction,
            timer: self.timer,
        }
    }
}
