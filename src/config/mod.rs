//! Configuration module for gridlines-rs
//!
//! This module handles the persisted viewer settings:
//! - Connection string and filter expression last used
//! - Graph, subscription, scale and status sections (see [`settings`])
//!
//! # App Data Location
//!
//! Settings are stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.hxyulin.gridlines-rs/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.gridlines-rs/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.gridlines-rs\`
//!
//! # Files
//!
//! - `settings.toml` - All viewer settings; missing keys fall back to defaults
//!   and are written back on the next save
//! - `logs/` - Daily rolling log files
//!
//! # Example
//!
//! ```ignore
//! use gridlines_rs::config::AppConfig;
//!
//! let mut config = AppConfig::load_or_default();
//! config.filter_expression = "FILTER ActiveMeasurements WHERE SignalType='FREQ'".into();
//! config.save_default()?;
//! ```

pub mod settings;

pub use settings::*;

use crate::error::{GridLinesError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.gridlines-rs";

/// Settings filename
pub const SETTINGS_FILE: &str = "settings.toml";

/// Log directory name inside the app data directory
pub const LOG_DIR: &str = "logs";

/// Default connection string
pub const DEFAULT_CONNECTION_STRING: &str = "server=localhost:7165;";

/// Default filter expression
pub const DEFAULT_FILTER_EXPRESSION: &str =
    "FILTER TOP 10 ActiveMeasurements WHERE SignalType='FREQ' OR SignalType LIKE 'VPH*'";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Ensure the app data directory exists
pub fn ensure_app_data_dir() -> Result<PathBuf> {
    let dir = app_data_dir().ok_or_else(|| {
        GridLinesError::Config("Could not determine app data directory".to_string())
    })?;

    if !dir.exists() {
        std::fs::create_dir_all(&dir).map_err(|e| {
            GridLinesError::Config(format!("Failed to create app data directory: {}", e))
        })?;
    }

    Ok(dir)
}

/// Get the path to the settings file
pub fn settings_path() -> Option<PathBuf> {
    app_data_dir().map(|p| p.join(SETTINGS_FILE))
}

// ==================== App Config ====================

/// Persisted viewer configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Window title
    #[serde(default = "default_title")]
    pub title: String,

    /// Publisher connection string, e.g. `server=localhost:7165;`
    #[serde(default = "default_connection_string")]
    pub connection_string: String,

    /// Subscription filter expression
    #[serde(default = "default_filter_expression")]
    pub filter_expression: String,

    /// Trace buffering and rendering
    #[serde(default)]
    pub graph: GraphConfig,

    /// Subscription defaults
    #[serde(default)]
    pub subscription: SubscriptionConfig,

    /// Auto-shrink tuning
    #[serde(default)]
    pub scale: ScaleTuning,

    /// Status log
    #[serde(default)]
    pub status: StatusConfig,
}

fn default_title() -> String {
    "STTP Connection Tester".to_string()
}

fn default_connection_string() -> String {
    DEFAULT_CONNECTION_STRING.to_string()
}

fn default_filter_expression() -> String {
    DEFAULT_FILTER_EXPRESSION.to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            title: default_title(),
            connection_string: default_connection_string(),
            filter_expression: default_filter_expression(),
            graph: GraphConfig::default(),
            subscription: SubscriptionConfig::default(),
            scale: ScaleTuning::default(),
            status: StatusConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load settings from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            GridLinesError::Config(format!("Failed to read settings {:?}: {}", path, e))
        })?;

        let config: AppConfig = toml::from_str(&content).map_err(|e| {
            GridLinesError::Config(format!("Failed to parse settings {:?}: {}", path, e))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Load settings from the default location, returning defaults on any error
    pub fn load_or_default() -> Self {
        let Some(path) = settings_path() else {
            tracing::warn!("Could not determine settings path, using defaults");
            return Self::default();
        };

        if !path.exists() {
            return Self::default();
        }

        Self::load(&path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load settings, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save settings to a TOML file
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                GridLinesError::Config(format!("Failed to create settings directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| GridLinesError::Serialization(format!("Failed to serialize settings: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            GridLinesError::Config(format!("Failed to write settings {:?}: {}", path, e))
        })
    }

    /// Save settings to the default location
    pub fn save_default(&self) -> Result<()> {
        let dir = ensure_app_data_dir()?;
        self.save(dir.join(SETTINGS_FILE))
    }

    /// Check that every section holds usable values
    pub fn validate(&self) -> Result<()> {
        if self.graph.points_in_line < 2 {
            return Err(GridLinesError::Config(format!(
                "points_in_line must be at least 2 (got {})",
                self.graph.points_in_line
            )));
        }

        if !self.graph.graph_scale.is_finite() || self.graph.graph_scale <= 0.0 {
            return Err(GridLinesError::Config(format!(
                "graph_scale must be positive (got {})",
                self.graph.graph_scale
            )));
        }

        if self.subscription.max_signals == 0 {
            return Err(GridLinesError::Config(
                "max_signals must be at least 1".to_string(),
            ));
        }

        if self.status.rows == 0 || self.status.wrap_width == 0 {
            return Err(GridLinesError::Config(
                "status rows and wrap width must be at least 1".to_string(),
            ));
        }

        self.scale.validate()
    }
}
