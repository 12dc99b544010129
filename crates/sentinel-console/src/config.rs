//! Console configuration.
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. `<config_dir>/sentinel/console.toml`, or the file given by `--config`
//! 3. `SENTINEL_API_URL`
//! 4. Command-line flags

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use sentinel_refresh::{RefreshConfig, DEFAULT_INTERVAL_MS};
use sentinel_telemetry::{ViewId, DEFAULT_BASE_URL};

pub const API_URL_ENV: &str = "SENTINEL_API_URL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading config '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{}': {message}", path.display())]
    Parse { path: PathBuf, message: String },

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Per-request timeout. Unset means requests may hang until stopped.
    pub request_timeout_secs: Option<u64>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefreshSection {
    pub interval_ms: u64,
    pub live: bool,
}

impl Default for RefreshSection {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_INTERVAL_MS,
            live: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    pub initial_view: String,
    /// Redraw period of the console.
    pub frame_ms: u64,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            initial_view: ViewId::Dashboard.as_str().to_string(),
            frame_ms: 250,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    pub api: ApiConfig,
    pub refresh: RefreshSection,
    pub ui: UiConfig,
    pub log: LogConfig,
}

/// Values given on the command line. `None`/`false` leaves the config alone.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub base_url: Option<String>,
    pub interval_ms: Option<u64>,
    pub paused: bool,
    pub view: Option<String>,
}

/// `<config_dir>/sentinel/console.toml`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("sentinel").join("console.toml"))
}

impl ConsoleConfig {
    /// Load from `explicit` if given (it must exist), otherwise from the
    /// default location (a missing file means defaults).
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        match explicit {
            Some(path) => Self::load_file(path),
            None => match default_config_path() {
                Some(path) if path.exists() => Self::load_file(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_toml(&content, path)?;
        tracing::debug!(path = %path.display(), "Loaded console config");
        Ok(config)
    }

    pub fn from_toml(content: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Apply environment overrides through `lookup` (normally `std::env::var`).
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|u| !u.trim().is_empty()) {
            self.api.base_url = url.trim().to_string();
        }
    }

    pub fn apply_overrides(&mut self, overrides: &CliOverrides) {
        if let Some(url) = &overrides.base_url {
            self.api.base_url = url.clone();
        }
        if let Some(ms) = overrides.interval_ms {
            self.refresh.interval_ms = ms;
        }
        if overrides.paused {
            self.refresh.live = false;
        }
        if let Some(view) = &overrides.view {
            self.ui.initial_view = view.clone();
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = self.api.base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(ConfigError::Invalid {
                message: format!("api.base_url must be an http(s) URL, got '{url}'"),
            });
        }
        if self.api.request_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid {
                message: "api.request_timeout_secs must be greater than zero".to_string(),
            });
        }
        self.refresh_config()?;
        self.initial_view()?;
        if self.ui.frame_ms == 0 {
            return Err(ConfigError::Invalid {
                message: "ui.frame_ms must be greater than zero".to_string(),
            });
        }
        tracing_subscriber::EnvFilter::try_new(&self.log.level).map_err(|e| {
            ConfigError::Invalid {
                message: format!("log.level '{}': {e}", self.log.level),
            }
        })?;
        Ok(())
    }

    pub fn refresh_config(&self) -> Result<RefreshConfig, ConfigError> {
        RefreshConfig::new(self.refresh.interval_ms, self.refresh.live).map_err(|e| {
            ConfigError::Invalid {
                message: e.to_string(),
            }
        })
    }

    pub fn initial_view(&self) -> Result<ViewId, ConfigError> {
        self.ui
            .initial_view
            .parse::<ViewId>()
            .map_err(|message| ConfigError::Invalid { message })
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.api.request_timeout_secs.map(Duration::from_secs)
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.ui.frame_ms)
    }
}
