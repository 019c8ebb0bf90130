//! # Configuration Module
//!
//! Runtime tuning for the engine and the platform-appropriate data directory
//! where Awed keeps its optional `config.json` and its log file.
//!
//! ## Data Storage
//!
//! - Linux: `~/.local/share/awed/`
//! - macOS: `~/Library/Application Support/awed/`
//! - Windows: `%APPDATA%\awed\`
//!
//! Weights themselves never live here; they are stored next to the music in
//! one sidecar file per folder (see [`crate::weight_store`]).

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the per-folder weight file.
pub const SIDECAR_FILE_NAME: &str = "awed.txt";

/// Name of the log file inside the data directory.
pub const LOG_FILE_NAME: &str = "awed.log";

const CONFIG_FILE_NAME: &str = "config.json";

/// Returns the platform-appropriate data directory for Awed, creating it if
/// needed.
///
/// # Errors
///
/// Fails when the system data directory cannot be determined or the `awed`
/// subdirectory cannot be created.
pub fn get_data_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir()
        .ok_or_else(|| anyhow::anyhow!(
            "Could not determine system data directory. Please ensure your platform supports standard data directories."
        ))?;

    let awed_dir = data_dir.join("awed");
    fs::create_dir_all(&awed_dir)
        .with_context(|| format!(
            "Failed to create Awed data directory at {}. Please check file permissions.",
            awed_dir.display()
        ))?;

    Ok(awed_dir)
}

/// Returns the path of the append-only log file, `awed.log` in the data
/// directory.
///
/// # Platform Behavior
///
/// - **Linux**: `~/.local/share/awed/awed.log`
/// - **macOS**: `~/Library/Application Support/awed/awed.log`
/// - **Windows**: `%APPDATA%\awed\awed.log`
///
/// The file itself is not created here; the logger opens it in append mode.
///
/// # Errors
///
/// Fails for the same reasons as [`get_data_dir`]:
/// - The system data directory cannot be determined
/// - The `awed` subdirectory cannot be created
///
/// # Examples
///
/// ```no_run
/// use awed::config::get_log_path;
///
/// let log = get_log_path()?;
/// println!("Logging to {}", log.display());
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn get_log_path() -> Result<PathBuf> {
    Ok(get_data_dir()?.join(LOG_FILE_NAME))
}

/// Tuning knobs for the engine and the sequencer.
///
/// Every field has a default so a partial `config.json` is accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// File name of the per-folder weight table
    pub sidecar_name: String,
    /// A folder needs at least this many playable tracks to be selectable
    pub min_selectable: usize,
    /// How many tracks "previous" can walk back through
    pub history_size: usize,
    /// Redraws allowed when a pick repeats one of the last two picks
    pub max_repeat_retries: usize,
    pub favorite_multiplier: f64,
    pub skip_multiplier: f64,
    pub never_play_multiplier: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sidecar_name: SIDECAR_FILE_NAME.to_string(),
            min_selectable: 3,
            history_size: 100,
            max_repeat_retries: 64,
            favorite_multiplier: 2.0,
            skip_multiplier: 0.5,
            never_play_multiplier: 0.0,
        }
    }
}

impl EngineConfig {
    /// Load `config.json` from the data directory, falling back to defaults
    /// when the file does not exist.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The data directory cannot be determined or created
    /// - The file exists but cannot be read or is not valid JSON
    /// - A value is out of range (see [`EngineConfig::load_from`])
    pub fn load() -> Result<Self> {
        let path = get_data_dir()?.join(CONFIG_FILE_NAME);
        Self::load_from(&path)
    }

    /// Load from an explicit path. A missing file yields the defaults.
    ///
    /// Fields left out of the file keep their default values.
    ///
    /// # Errors
    ///
    /// This function will return an error if:
    /// - The file exists but cannot be read
    /// - The contents are not valid JSON for this struct
    /// - `sidecar_name` is empty or contains a path separator
    /// - A multiplier is negative, infinite or NaN
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use awed::config::EngineConfig;
    /// use std::path::Path;
    ///
    /// let config = EngineConfig::load_from(Path::new("/etc/awed/config.json"))?;
    /// assert!(config.min_selectable > 0);
    /// # Ok::<(), anyhow::Error>(())
    /// ```
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sidecar_name.is_empty() || self.sidecar_name.contains(['/', '\\']) {
            anyhow::bail!("sidecar_name must be a plain file name, got {:?}", self.sidecar_name);
        }
        for (name, value) in [
            ("favorite_multiplier", self.favorite_multiplier),
            ("skip_multiplier", self.skip_multiplier),
            ("never_play_multiplier", self.never_play_multiplier),
        ] {
            if !value.is_finite() || value < 0.0 {
                anyhow::bail!("{name} must be a finite non-negative number, got {value}");
            }
        }
        Ok(())
    }
}
