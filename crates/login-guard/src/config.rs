// ============================
// aidlink-login-guard/src/config.rs
// ============================
//! Configuration management with validation.
//!
//! Settings merge a TOML file with `AIDLINK_`-prefixed environment
//! variables, environment winning. Every field has a default so an
//! empty deployment still gets the stock limiter policy.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::Deserialize;
use thiserror::Error;

/// Configuration error with validation details
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("limiter.max_failures must be at least 1")]
    ZeroMaxFailures,

    #[error("limiter.window_minutes must be at least 1")]
    ZeroWindow,

    #[error("sweep.interval_minutes must be at least 1")]
    ZeroSweepInterval,

    #[error("unknown log level: {0}")]
    UnknownLogLevel(String),
}

/// Top-level settings for the login-guard service
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Log verbosity (trace, debug, info, warn, error)
    pub log_level: String,
    /// Failure counting and lockout policy
    pub limiter: LimiterSettings,
    /// Background sweep of stale attempt records
    pub sweep: SweepSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            limiter: LimiterSettings::default(),
            sweep: SweepSettings::default(),
        }
    }
}

/// Lockout policy for failed logins
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LimiterSettings {
    /// Failures inside one window before the identifier is limited
    pub max_failures: u32,
    /// Length of the counting window in minutes
    pub window_minutes: u64,
    /// Minutes past window expiry before the sweep drops a record
    pub sweep_grace_minutes: u64,
}

impl Default for LimiterSettings {
    fn default() -> Self {
        Self {
            max_failures: 5,
            window_minutes: 15,
            sweep_grace_minutes: 30,
        }
    }
}

impl LimiterSettings {
    /// Counting window as a duration
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_minutes * 60)
    }

    /// Sweep grace as a duration
    pub fn sweep_grace(&self) -> Duration {
        Duration::from_secs(self.sweep_grace_minutes * 60)
    }
}

/// Schedule for the background sweeper
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SweepSettings {
    /// Minutes between sweep passes
    pub interval_minutes: u64,
}

impl Default for SweepSettings {
    fn default() -> Self {
        Self {
            interval_minutes: 60,
        }
    }
}

impl SweepSettings {
    /// Sweep interval as a duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes * 60)
    }
}

impl Settings {
    /// Load settings from `config.toml` and the environment
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from("config.toml")
    }

    /// Load settings from an explicit TOML path and the environment
    pub fn load_from(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let settings: Settings = Figment::new()
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed("AIDLINK_").split("__"))
            .extract()
            .context("failed to load settings")?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the limiter cannot run with.
    ///
    /// A zero grace period is fine, it just means the sweep drops
    /// records the moment their window expires.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.log_level.as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => return Err(ConfigError::UnknownLogLevel(other.to_string())),
        }

        if self.limiter.max_failures == 0 {
            return Err(ConfigError::ZeroMaxFailures);
        }
        if self.limiter.window_minutes == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        if self.sweep.interval_minutes == 0 {
            return Err(ConfigError::ZeroSweepInterval);
        }

        Ok(())
    }
}
