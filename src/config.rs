//! Run configuration.
//!
//! One explicit [`Settings`] struct threaded from the CLI through the
//! orchestrator into each worker — there is no process-wide mutable state.
//! Values load in two layers: an optional TOML file (`--config`), then CLI
//! flag overrides on top. Every option has a documented default; run
//! `photo-shrink gen-config` to print a stock file.
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! target_size_mb = 2.0   # Per-image size budget, in MB
//! min_quality = 50       # JPEG quality floor (1-100)
//! quality_step = 5       # Quality decrease per attempt
//! start_quality = 95     # First attempt's quality
//! timeout_secs = 30.0    # Per-image compression budget (wall clock)
//! parallel = true        # Process images across a worker pool
//! # max_workers = 4      # Pool size (omit for auto = CPU cores)
//! # sample = 50          # Only process the first N images (test runs)
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::compress::CompressionSettings;

/// Size budgets are interpreted in binary megabytes (1 MB = 1024 × 1024
/// bytes), the unit file managers report photo sizes in.
pub const BYTES_PER_MB: f64 = (1024 * 1024) as f64;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("invalid setting: {0}")]
    Invalid(String),
}

/// All knobs for one batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Per-image size budget, in (binary) megabytes.
    pub target_size_mb: f64,
    /// Quality floor of the search loop (1–100).
    pub min_quality: u8,
    /// Quality decrease per attempt.
    pub quality_step: u8,
    /// First attempt's quality (1–100).
    pub start_quality: u8,
    /// Per-image wall-clock budget, in seconds.
    pub timeout_secs: f64,
    /// Process images across a worker pool.
    pub parallel: bool,
    /// Pool size; None means all available cores.
    pub max_workers: Option<usize>,
    /// Only process the first N images of the sorted scan (test runs).
    pub sample: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            target_size_mb: 2.0,
            min_quality: 50,
            quality_step: 5,
            start_quality: 95,
            timeout_secs: 30.0,
            parallel: true,
            max_workers: None,
            sample: None,
        }
    }
}

impl Settings {
    /// Load settings from a TOML file, or defaults when no file is given.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        if !path.is_file() {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.target_size_mb.is_finite() && self.target_size_mb > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "target_size_mb must be positive, got {}",
                self.target_size_mb
            )));
        }
        for (name, value) in [
            ("min_quality", self.min_quality),
            ("start_quality", self.start_quality),
        ] {
            if !(1..=100).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be in 1..=100, got {value}"
                )));
            }
        }
        if self.start_quality < self.min_quality {
            return Err(ConfigError::Invalid(format!(
                "start_quality ({}) must not be below min_quality ({})",
                self.start_quality, self.min_quality
            )));
        }
        if self.quality_step == 0 {
            return Err(ConfigError::Invalid(
                "quality_step must be at least 1".to_string(),
            ));
        }
        if !(self.timeout_secs.is_finite() && self.timeout_secs >= 0.0) {
            return Err(ConfigError::Invalid(format!(
                "timeout_secs must be non-negative, got {}",
                self.timeout_secs
            )));
        }
        if self.max_workers == Some(0) {
            return Err(ConfigError::Invalid(
                "max_workers must be at least 1".to_string(),
            ));
        }
        if self.sample == Some(0) {
            return Err(ConfigError::Invalid(
                "sample must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn target_bytes(&self) -> u64 {
        (self.target_size_mb * BYTES_PER_MB) as u64
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs_f64(self.timeout_secs)
    }

    pub fn compression(&self) -> CompressionSettings {
        CompressionSettings {
            target_bytes: self.target_bytes(),
            min_quality: self.min_quality,
            quality_step: self.quality_step,
            start_quality: self.start_quality,
            timeout: self.timeout(),
        }
    }
}

/// Worker-pool size: configured value capped at the number of available
/// cores — users can constrain down, not up.
pub fn effective_workers(settings: &Settings) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    settings.max_workers.map(|n| n.min(cores)).unwrap_or(cores)
}

/// A documented config file with every option at its default.
pub fn stock_config_toml() -> String {
    "\
# photo-shrink configuration. All options are optional - defaults shown.

# Per-image size budget, in MB (1 MB = 1024 * 1024 bytes).
target_size_mb = 2.0

# JPEG quality floor of the search loop (1-100). The loop never encodes
# below this, even when the budget is unreachable.
min_quality = 50

# Quality decrease per attempt.
quality_step = 5

# Quality of the first attempt (1-100).
start_quality = 95

# Per-image wall-clock budget, in seconds. Images that exceed it keep their
# original bytes in the library and park the partial encode in
# problem-photos/.
timeout_secs = 30.0

# Process images across a worker pool.
parallel = true

# Pool size. Omit for auto (all available cores); capped at core count.
#max_workers = 4

# Only process the first N images of the sorted scan - handy for test runs.
#sample = 50
"
    .to_string()
}
