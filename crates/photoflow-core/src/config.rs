use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::fetch::FetchLimits;

/// Global configuration loaded from `~/.config/photoflow/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhotoflowConfig {
    /// Sepia tone intensity in `[0, 1]` applied by the filter stage.
    pub filter_intensity: f32,
    /// Optional connect timeout for the blocking fetch, in seconds.
    /// Absent = no limit (single attempt, unbounded).
    #[serde(default)]
    pub connect_timeout_secs: Option<u64>,
    /// Optional whole-transfer timeout for the blocking fetch, in seconds.
    #[serde(default)]
    pub fetch_timeout_secs: Option<u64>,
    /// Optional default photo list location for the CLI.
    #[serde(default)]
    pub source_url: Option<String>,
}

impl Default for PhotoflowConfig {
    fn default() -> Self {
        Self {
            filter_intensity: 0.8,
            connect_timeout_secs: None,
            fetch_timeout_secs: None,
            source_url: None,
        }
    }
}

impl PhotoflowConfig {
    /// Transfer limits for the download stage.
    pub fn fetch_limits(&self) -> FetchLimits {
        FetchLimits {
            connect_timeout: self.connect_timeout_secs.map(Duration::from_secs),
            timeout: self.fetch_timeout_secs.map(Duration::from_secs),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("photoflow")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<PhotoflowConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = PhotoflowConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: PhotoflowConfig = toml::from_str(&data)?;
    Ok(cfg)
}
