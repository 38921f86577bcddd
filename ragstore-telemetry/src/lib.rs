//! # ragstore-telemetry
//!
//! Logging setup for ragstore services and tests.
//!
//! - [`init_telemetry`] installs a global `tracing` subscriber with an
//!   [`EnvFilter`] and a human or JSON `fmt` layer.
//! - [`CapturedEvents`] records events in memory so tests can assert on
//!   what the library logged.
//!
//! ```rust,no_run
//! use ragstore_telemetry::{TelemetryConfig, init_telemetry};
//!
//! init_telemetry(&TelemetryConfig { json: true, ..Default::default() })?;
//! # Ok::<(), ragstore_telemetry::TelemetryError>(())
//! ```

mod capture;

pub use capture::{CaptureLayer, CapturedEvent, CapturedEvents};

use serde::{Deserialize, Serialize};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TelemetryConfig {
    pub service_name: String,
    /// `EnvFilter` directive used when `RUST_LOG` is unset, e.g. `info` or `ragstore=debug`.
    pub log_level: String,
    /// Emit one JSON object per line instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self { service_name: "ragstore".to_string(), log_level: "info".to_string(), json: false }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("a global tracing subscriber is already installed")]
    AlreadyInitialized,

    #[error("invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },
}

fn level_filter(log_level: &str) -> Result<EnvFilter, TelemetryError> {
    EnvFilter::try_new(log_level).map_err(|e| TelemetryError::InvalidFilter {
        filter: log_level.to_string(),
        message: e.to_string(),
    })
}

/// Install the global subscriber described by `config`.
///
/// `RUST_LOG`, when set and valid, takes precedence over `config.log_level`.
///
/// # Errors
///
/// Returns [`TelemetryError::AlreadyInitialized`] if a global subscriber is
/// already set, and [`TelemetryError::InvalidFilter`] if `log_level` is not
/// a valid filter directive.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<(), TelemetryError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => level_filter(&config.log_level)?,
    };

    let installed = if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_current_span(true))
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .try_init()
    };
    installed.map_err(|_| TelemetryError::AlreadyInitialized)?;

    tracing::info!(
        service = %config.service_name,
        level = %config.log_level,
        json = config.json,
        "telemetry initialized"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "ragstore");
        assert_eq!(config.log_level, "info");
        assert!(!config.json);

        let partial: TelemetryConfig = serde_json::from_str(r#"{"json": true}"#).unwrap();
        assert!(partial.json);
        assert_eq!(partial.log_level, "info");
    }

    #[test]
    fn invalid_level_is_reported() {
        assert!(level_filter("ragstore=debug,info").is_ok());
        let err = level_filter("ragstore=loud").unwrap_err();
        assert!(matches!(
            err,
            TelemetryError::InvalidFilter { ref filter, .. } if filter == "ragstore=loud"
        ));
    }

    #[test]
    fn second_initialisation_fails() {
        // The first call may lose to another test's global subscriber; the second never succeeds.
        let _ = init_telemetry(&TelemetryConfig::default());
        let err = init_telemetry(&TelemetryConfig::default()).unwrap_err();
        assert!(matches!(err, TelemetryError::AlreadyInitialized));
    }
}
