use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::duration::deserialize_duration;

/// Default pause before each outbound listing fetch (1 second).
fn default_request_delay() -> std::time::Duration {
    std::time::Duration::from_secs(1)
}

/// Default outbound fetch timeout (30 seconds).
fn default_fetch_timeout() -> std::time::Duration {
    std::time::Duration::from_secs(30)
}

/// Default pause between properties during a sweep (2 seconds).
fn default_sweep_delay() -> std::time::Duration {
    std::time::Duration::from_secs(2)
}

/// Listing-harvest pacing configuration.
///
/// Outbound fetches are deliberately slow and serial: listing sites rate-limit
/// aggressively, and a sweep that hammers them just turns every record into an
/// error. These knobs control how polite the harvester is.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Pause before every outbound fetch.
    #[serde(
        default = "default_request_delay",
        deserialize_with = "deserialize_duration"
    )]
    pub request_delay: std::time::Duration,

    /// Hard timeout on each outbound fetch. Exceeding it marks the property
    /// `error` rather than failing the caller.
    #[serde(
        default = "default_fetch_timeout",
        deserialize_with = "deserialize_duration"
    )]
    pub fetch_timeout: std::time::Duration,

    /// Pause between consecutive properties during a sweep.
    #[serde(
        default = "default_sweep_delay",
        deserialize_with = "deserialize_duration"
    )]
    pub sweep_delay: std::time::Duration,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            request_delay: default_request_delay(),
            fetch_timeout: default_fetch_timeout(),
            sweep_delay: default_sweep_delay(),
        }
    }
}

/// Default trailing window for history and time-series reports (30 days).
fn default_window_days() -> u32 {
    30
}

/// Reporting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Trailing window, in days, used when a report does not specify one.
    #[serde(default = "default_window_days")]
    pub window_days: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            window_days: default_window_days(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Path to data directory. If relative, resolved from config file location.
    /// If not specified, defaults to the config file's directory.
    pub data_dir: Option<PathBuf>,

    /// Listing-harvest pacing settings.
    #[serde(default)]
    pub harvest: HarvestConfig,

    /// Reporting settings.
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: None,
            harvest: HarvestConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl Config {
    /// Load config from a TOML file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load config from a file, or return default config if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the data directory path.
    ///
    /// If `data_dir` is set and relative, it's resolved relative to `config_dir`.
    /// If `data_dir` is not set, returns `config_dir`.
    pub fn resolve_data_dir(&self, config_dir: &Path) -> PathBuf {
        match &self.data_dir {
            Some(data_dir) if data_dir.is_absolute() => data_dir.clone(),
            Some(data_dir) => config_dir.join(data_dir),
            None => config_dir.to_path_buf(),
        }
    }
}

/// Loaded configuration with resolved paths.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// The resolved data directory path.
    pub data_dir: PathBuf,

    /// Listing-harvest pacing settings.
    pub harvest: HarvestConfig,

    /// Reporting settings.
    pub report: ReportConfig,
}

/// Returns the default config file path.
///
/// Resolution order:
/// 1. `./propfolio.toml` if it exists in current directory
/// 2. `~/.local/share/propfolio/propfolio.toml` (XDG data directory)
pub fn default_config_path() -> PathBuf {
    let local_config = PathBuf::from("propfolio.toml");
    if local_config.exists() {
        return local_config;
    }

    // XDG data directory fallback
    if let Some(data_dir) = dirs::data_dir() {
        return data_dir.join("propfolio").join("propfolio.toml");
    }

    // Final fallback to local
    local_config
}

impl ResolvedConfig {
    /// Load and resolve config from a file path.
    ///
    /// The data directory is resolved relative to the config file's parent directory.
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_path = config_path
            .canonicalize()
            .with_context(|| format!("Config file not found: {}", config_path.display()))?;

        let config_dir = config_path
            .parent()
            .context("Config file has no parent directory")?;

        let config = Config::load(&config_path)?;
        let data_dir = config.resolve_data_dir(config_dir);

        Ok(Self {
            data_dir,
            harvest: config.harvest,
            report: config.report,
        })
    }

    /// Load config, creating a default if the file doesn't exist.
    ///
    /// If the config file doesn't exist, uses the config file's intended
    /// parent directory as the data directory.
    pub fn load_or_default(config_path: &Path) -> Result<Self> {
        if config_path.exists() {
            Self::load(config_path)
        } else {
            // Resolve the config path relative to current directory
            let config_path = if config_path.is_relative() {
                std::env::current_dir()
                    .context("Failed to get current directory")?
                    .join(config_path)
            } else {
                config_path.to_path_buf()
            };

            // Use the intended config directory as data dir
            let config_dir = config_path
                .parent()
                .context("Config path has no parent directory")?;

            Ok(Self {
                data_dir: config_dir.to_path_buf(),
                harvest: HarvestConfig::default(),
                report: ReportConfig::default(),
            })
        }
    }
}
