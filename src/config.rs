//! Session configuration parsing, validation, and companion path resolution.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::{AppError, Result};

/// Order in which queued commands leave the backlog.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BacklogOrder {
    /// Most recently enqueued first.
    #[default]
    Lifo,
    /// Oldest first.
    Fifo,
}

/// Retry and poll timing for the dispatcher.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct RetryConfig {
    /// Send attempts before a still-connected channel counts as failed.
    #[serde(default = "default_max_send_attempts")]
    pub max_send_attempts: u32,
    /// Pause between send attempts and between connect attempts.
    #[serde(default = "default_retry_interval_ms")]
    pub retry_interval_ms: u64,
    /// Connect attempts after spawning the companion.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
}

fn default_max_send_attempts() -> u32 {
    20
}

fn default_retry_interval_ms() -> u64 {
    250
}

fn default_connect_attempts() -> u32 {
    120
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_send_attempts: default_max_send_attempts(),
            retry_interval_ms: default_retry_interval_ms(),
            connect_attempts: default_connect_attempts(),
        }
    }
}

impl RetryConfig {
    /// Pause between attempts.
    #[must_use]
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

fn default_updater_location() -> String {
    if cfg!(windows) {
        "updater.exe".into()
    } else {
        "updater".into()
    }
}

/// Session configuration, usually parsed from a TOML file.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionConfig {
    /// Companion executable, absolute or relative to the running executable.
    #[serde(default = "default_updater_location")]
    pub updater_location: String,
    /// Arguments appended verbatim after the autoupdate flag.
    #[serde(default)]
    pub extra_arguments: Vec<String>,
    /// Backlog ordering policy.
    #[serde(default)]
    pub backlog_order: BacklogOrder,
    /// Dispatcher timing.
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            updater_location: default_updater_location(),
            extra_arguments: Vec::new(),
            backlog_order: BacklogOrder::default(),
            retry: RetryConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.retry.max_send_attempts == 0 {
            return Err(AppError::Config(
                "retry.max_send_attempts must be greater than zero".into(),
            ));
        }

        if self.retry.connect_attempts == 0 {
            return Err(AppError::Config(
                "retry.connect_attempts must be greater than zero".into(),
            ));
        }

        if self.retry.retry_interval_ms == 0 {
            return Err(AppError::Config(
                "retry.retry_interval_ms must be greater than zero".into(),
            ));
        }

        Ok(())
    }
}

/// Resolve the companion location to an absolute path.
///
/// Relative locations are taken relative to the directory of the running
/// executable. The file does not have to exist yet.
///
/// # Errors
///
/// Returns `AppError::Config` if the location is empty or cannot be made
/// absolute.
pub fn resolve_updater_path(location: &str) -> Result<PathBuf> {
    if location.trim().is_empty() {
        return Err(AppError::Config("updater location is empty".into()));
    }

    let candidate = Path::new(location);
    let joined = if candidate.is_absolute() {
        candidate.to_path_buf()
    } else {
        let exe = std::env::current_exe()
            .map_err(|err| AppError::Config(format!("cannot locate running executable: {err}")))?;
        let dir = exe
            .parent()
            .ok_or_else(|| AppError::Config("running executable has no parent directory".into()))?;
        dir.join(candidate)
    };

    std::path::absolute(&joined).map_err(|err| {
        AppError::Config(format!(
            "updater location '{}' is not valid: {err}",
            joined.display()
        ))
    })
}
