//! Engine configuration, loaded once at startup.

#![allow(clippy::unwrap_used)] // Tests use unwrap for brevity

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::volume::FadeCurve;
use crate::{Error, Result};

/// File name looked up inside the platform config directory.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub pool: PoolConfig,
    pub music: MusicConfig,
    pub output: OutputConfig,
}

impl EngineConfig {
    /// Platform default location of the config file.
    pub fn default_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "resound", "Resound")
            .map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
    }

    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json(&json)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load from the platform config directory, or defaults if there is none.
    pub fn load_default() -> Result<Self> {
        match Self::default_path() {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.pool.validate()?;
        self.music.validate()?;
        self.output.validate()
    }
}

/// Playback pool sizing and admission control.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Handles created up front.
    pub initial_capacity: usize,
    /// Upper bound on handles in existence (idle + active).
    pub max_capacity: usize,
    /// Maximum simultaneous instances of any one profile.
    pub concurrency_ceiling: usize,
    /// Seed for pitch/volume jitter. `None` seeds from the OS.
    pub jitter_seed: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 10,
            max_capacity: 100,
            concurrency_ceiling: 30,
            jitter_seed: None,
        }
    }
}

impl PoolConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_capacity == 0 {
            return Err(Error::invalid_config("pool.max_capacity must be at least 1"));
        }
        if self.initial_capacity > self.max_capacity {
            return Err(Error::invalid_config(format!(
                "pool.initial_capacity ({}) exceeds pool.max_capacity ({})",
                self.initial_capacity, self.max_capacity
            )));
        }
        if self.concurrency_ceiling == 0 {
            return Err(Error::invalid_config(
                "pool.concurrency_ceiling must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Music crossfade settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MusicConfig {
    /// Crossfade length in seconds.
    pub crossfade_secs: f32,
    /// Perceptual curve used for the fade.
    pub curve: FadeCurve,
}

impl Default for MusicConfig {
    fn default() -> Self {
        Self {
            crossfade_secs: 1.0,
            curve: FadeCurve::Logarithmic,
        }
    }
}

impl MusicConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.crossfade_secs.is_finite() || self.crossfade_secs <= 0.0 {
            return Err(Error::invalid_config(format!(
                "music.crossfade_secs must be a positive number, got {}",
                self.crossfade_secs
            )));
        }
        Ok(())
    }
}

/// Output device and routing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Render without an output device (the host advances the mixer).
    pub headless: bool,
    /// Master gain (0.0 to 1.0).
    pub master_volume: f32,
    /// Per-route gain in decibels.
    pub routes: HashMap<String, f32>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            headless: false,
            master_volume: 1.0,
            routes: HashMap::new(),
        }
    }
}

impl OutputConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.master_volume) {
            return Err(Error::invalid_config(format!(
                "output.master_volume must be within 0..=1, got {}",
                self.master_volume
            )));
        }
        Ok(())
    }
}
