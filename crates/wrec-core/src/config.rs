use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

use crate::sort::SortSpec;

/// HTTP timeouts for the session size endpoint (optional section in config.toml).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Whole-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 5,
            timeout_secs: 10,
        }
    }
}

impl HttpConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Global configuration loaded from `~/.config/wrec/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WrecConfig {
    /// Base of the archive API; the size endpoint is `{api_prefix}/c/{session}`.
    pub api_prefix: String,
    /// Delay between size fetches while a recording is live, in milliseconds.
    pub poll_interval_ms: u64,
    /// Optional HTTP timeouts; if missing, built-in defaults are used.
    #[serde(default)]
    pub http: Option<HttpConfig>,
    /// Optional initial ordering for `wrec list`; defaults to ascending URL.
    #[serde(default)]
    pub default_sort: Option<SortSpec>,
}

impl Default for WrecConfig {
    fn default() -> Self {
        Self {
            api_prefix: "http://localhost:9990/api".to_string(),
            poll_interval_ms: 3000,
            http: None,
            default_sort: None,
        }
    }
}

impl WrecConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn http_or_default(&self) -> HttpConfig {
        self.http.clone().unwrap_or_default()
    }

    pub fn sort_or_default(&self) -> SortSpec {
        self.default_sort.unwrap_or_default()
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("wrec")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<WrecConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = WrecConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)
        .with_context(|| format!("read config {}", path.display()))?;
    let cfg: WrecConfig = toml::from_str(&data)
        .with_context(|| format!("parse config {}", path.display()))?;
    Ok(cfg)
}
