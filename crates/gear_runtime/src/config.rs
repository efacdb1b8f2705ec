//! Runtime Configuration
//!
//! # Configuration Sources (in priority order)
//!
//! 1. Environment variables: `GEAR_ENDPOINT`, `GEAR_CSRF_TOKEN`, `GEAR_ITEMS`,
//!    `GEAR_ORIENTATION`, `GEAR_SYNC_DISABLED`
//! 2. Config file: `--config <path>`, else the first of `gear.toml`,
//!    `/etc/gear/gear.toml`
//! 3. Built-in defaults
//!
//! # Example Config File
//!
//! ```toml
//! [inventory]
//! size = 9
//! orientation = "horizontal"  # horizontal, vertical
//! cell_size = 75
//! items = "items.json"
//!
//! [sync]
//! enabled = true
//! endpoint = "http://127.0.0.1:8000/character/update_item"
//! csrf_token = ""
//! timeout_ms = 5000
//! ```

use std::path::Path;
use std::time::Duration;

use gear_grid::{GridLayout, Orientation};
use gear_inventory::ViewMetrics;
use gear_sync::SyncSettings;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Files tried when no `--config` is given
const CONFIG_PATHS: [&str; 2] = ["gear.toml", "/etc/gear/gear.toml"];

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot read {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Cannot parse {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
}

/// Inventory configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InventoryConfig {
    /// Usable cells; odd sizes get one blocked cell
    pub size: usize,
    pub orientation: Orientation,
    /// Pixels per cell
    pub cell_size: f32,
    /// Pixel height of the character panel
    pub panel_height: f32,
    /// JSON file with the store's item records
    pub items: Option<String>,
}

impl Default for InventoryConfig {
    fn default() -> Self {
        Self {
            size: 9,
            orientation: Orientation::Horizontal,
            cell_size: 75.0,
            panel_height: 300.0,
            items: None,
        }
    }
}

/// Sync configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub enabled: bool,
    pub endpoint: String,
    /// Sent as `X-CSRFToken` when not empty
    pub csrf_token: String,
    pub timeout_ms: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://127.0.0.1:8000/character/update_item".to_string(),
            csrf_token: String::new(),
            timeout_ms: 5000,
        }
    }
}

/// Complete runtime configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GearConfig {
    pub inventory: InventoryConfig,
    pub sync: SyncConfig,
    /// File this was loaded from
    #[serde(skip)]
    pub config_path: Option<String>,
}

impl GearConfig {
    /// Load configuration from all sources.
    ///
    /// An explicit path must be readable; the default paths are skipped
    /// when missing or broken.
    pub fn load(explicit: Option<&str>) -> Result<Self, ConfigError> {
        let mut config = match explicit {
            Some(path) => {
                let mut config = Self::load_from_file(path)?;
                config.config_path = Some(path.to_string());
                config
            }
            None => Self::load_default_paths(),
        };

        if let Some(path) = &config.config_path {
            log::info!("Loaded config from {}", path);
        }

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    fn load_default_paths() -> Self {
        for path in CONFIG_PATHS {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::load_from_file(path) {
                Ok(mut config) => {
                    config.config_path = Some(path.to_string());
                    return config;
                }
                Err(e) => log::warn!("Ignoring config: {}", e),
            }
        }
        Self::default()
    }

    /// Load configuration from a TOML file
    pub fn load_from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_string(),
            source,
        })?;

        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_string(),
            source,
        })
    }

    /// Override fields from environment-style variables
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(endpoint) = var("GEAR_ENDPOINT").filter(|v| !v.is_empty()) {
            log::info!("Sync endpoint from env: {}", endpoint);
            self.sync.endpoint = endpoint;
        }

        if let Some(token) = var("GEAR_CSRF_TOKEN") {
            self.sync.csrf_token = token;
        }

        if let Some(items) = var("GEAR_ITEMS").filter(|v| !v.is_empty()) {
            self.inventory.items = Some(items);
        }

        if let Some(orientation) = var("GEAR_ORIENTATION") {
            match orientation.parse() {
                Ok(o) => self.inventory.orientation = o,
                Err(e) => log::warn!("Ignoring GEAR_ORIENTATION: {}", e),
            }
        }

        if var("GEAR_SYNC_DISABLED")
            .map(|v| v == "1" || v == "true")
            .unwrap_or(false)
        {
            self.sync.enabled = false;
        }
    }

    pub fn layout(&self) -> GridLayout {
        GridLayout::new(self.inventory.size, self.inventory.orientation)
    }

    pub fn metrics(&self) -> ViewMetrics {
        ViewMetrics {
            cell_size: self.inventory.cell_size,
            panel_height: self.inventory.panel_height,
        }
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings::new(self.sync.endpoint.as_str())
            .with_csrf_token(self.sync.csrf_token.as_str())
            .with_timeout(Duration::from_millis(self.sync.timeout_ms))
    }

    /// Print configuration summary
    pub fn print_summary(&self) {
        log::info!("Gear Configuration:");
        log::info!(
            "  Inventory: {} cells, {}",
            self.inventory.size,
            self.inventory.orientation
        );
        match &self.inventory.items {
            Some(items) => log::info!("  Items: {}", items),
            None => log::info!("  Items: none"),
        }
        if self.sync.enabled {
            log::info!("  Sync: {}", self.sync.endpoint);
        } else {
            log::info!("  Sync: disabled");
        }
        if let Some(path) = &self.config_path {
            log::info!("  Config: {}", path);
        }
    }
}
