//! Application configuration.
//!
//! Values are layered: built-in defaults, then
//! `~/.config/boxoffice/config.toml`, then `BOXOFFICE_*` environment
//! variables.

use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};

use anyhow::{Context, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Directory under the user's config dir holding our files.
pub const CONFIG_DIR: &str = "boxoffice";
const CONFIG_FILE: &str = "config.toml";
const ENV_PREFIX: &str = "BOXOFFICE";

const DEFAULT_CONFIG: &str = r#"# Box office settings.

# Event catalog shown on the main screen. Relative paths resolve against
# this directory.
catalog_path = "catalog.json"

# Simulated gateway latency in milliseconds.
settlement_delay_ms = 1500

# How long inline form errors stay visible, in milliseconds.
notice_duration_ms = 3000

# Make the simulated gateway decline every payment.
decline_payments = false
decline_reason = "Card declined by issuer"
"#;

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Event catalog file.
    pub catalog_path: PathBuf,
    /// Simulated settlement latency.
    pub settlement_delay_ms: u64,
    /// Lifetime of inline error messages.
    pub notice_duration_ms: u64,
    /// Force the simulated gateway and mailer to fail.
    pub decline_payments: bool,
    /// Reason reported when declining.
    pub decline_reason: String,
}

impl AppConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(config_dir())
    }

    /// Load configuration rooted at `dir`.
    pub fn load_from(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        let path = dir.join(CONFIG_FILE);
        let settings = Config::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.clone()).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true))
            .build()
            .with_context(|| format!("failed to read config {}", path.display()))?;
        let mut config: AppConfig = settings
            .try_deserialize()
            .with_context(|| format!("invalid config {}", path.display()))?;
        if config.catalog_path.is_relative() {
            config.catalog_path = dir.join(&config.catalog_path);
        }
        Ok(config)
    }

    /// Simulated settlement latency.
    pub fn settlement_delay(&self) -> Duration {
        Duration::from_millis(self.settlement_delay_ms)
    }

    /// Lifetime of inline error messages.
    pub fn notice_duration(&self) -> Duration {
        Duration::from_millis(self.notice_duration_ms)
    }
}

/// `~/.config/boxoffice`, or `./boxoffice` when no config dir is known.
pub fn config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIR)
}

/// Write the default config file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf> {
    ensure_default_config_in(config_dir())
}

/// Write the default config file under `dir` if none exists yet.
pub fn ensure_default_config_in(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let dir = dir.as_ref();
    let path = dir.join(CONFIG_FILE);
    if path.exists() {
        return Ok(path);
    }
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create config directory {}", dir.display()))?;
    fs::write(&path, DEFAULT_CONFIG)
        .with_context(|| format!("failed to write default config {}", path.display()))?;
    info!(path = %path.display(), "Wrote default config");
    Ok(path)
}
