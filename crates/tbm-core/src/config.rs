use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::pacing::DelayTuning;
use crate::retry::RetryPolicy;
use crate::runner::RunOptions;

/// Engine tuning parameters (optional section in config.toml).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Lowest per-item delay in milliseconds.
    pub floor_ms: u64,
    /// Per-item delay at the start of a run, in milliseconds.
    pub start_ms: u64,
    /// Initial peak delay in milliseconds.
    pub peak_ms: u64,
    /// Transient failures allowed per item before it is recorded as failed.
    pub max_retries: u32,
    /// Base delay in milliseconds for transient exponential backoff.
    pub transient_base_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            floor_ms: 200,
            start_ms: 1000,
            peak_ms: 3000,
            max_retries: 6,
            transient_base_ms: 100,
        }
    }
}

impl EngineConfig {
    pub fn delay_tuning(&self) -> DelayTuning {
        DelayTuning {
            floor_ms: self.floor_ms,
            start_ms: self.start_ms,
            peak_ms: self.peak_ms,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            transient_base: Duration::from_millis(self.transient_base_ms),
        }
    }
}

/// Global configuration loaded from `~/.config/tbm/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TbmConfig {
    /// Abort a run at the first unrecoverable item failure.
    pub stop_on_failure: bool,
    /// Base URL of the tasks API.
    pub api_base_url: String,
    /// Environment variable holding the API bearer token.
    pub token_env: String,
    /// Optional engine tuning; if missing, built-in defaults are used.
    #[serde(default)]
    pub engine: Option<EngineConfig>,
}

impl Default for TbmConfig {
    fn default() -> Self {
        Self {
            stop_on_failure: true,
            api_base_url: "https://api.tasks.example/v1".into(),
            token_env: "TBM_API_TOKEN".into(),
            engine: None,
        }
    }
}

impl TbmConfig {
    /// Run options derived from this config; engine defaults fill the gaps.
    pub fn run_options(&self) -> RunOptions {
        let engine = self.engine.clone().unwrap_or_default();
        RunOptions {
            stop_on_failure: self.stop_on_failure,
            tuning: engine.delay_tuning(),
            retry: engine.retry_policy(),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("tbm")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<TbmConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = TbmConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: TbmConfig = toml::from_str(&data)?;
    Ok(cfg)
}
