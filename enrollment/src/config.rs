//! Runtime configuration.
//!
//! Values come from built-in defaults, then an optional YAML file named by
//! `SCHOOL_CONFIG`, then individual environment overrides.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::backend::domain::media_service::DEFAULT_UPLOAD_LIMIT;
use crate::backend::domain::validation::AgeBounds;

pub const CONFIG_PATH_ENV: &str = "SCHOOL_CONFIG";
pub const DATA_DIR_ENV: &str = "SCHOOL_DATA_DIR";
pub const BIND_ADDR_ENV: &str = "SCHOOL_BIND_ADDR";
pub const API_URL_ENV: &str = "SCHOOL_API_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of the records store
    pub data_dir: PathBuf,
    /// Address the records API listens on
    pub bind_addr: String,
    /// Base URL enrollment sessions use to reach the records API
    pub api_url: String,
    /// Largest accepted photo, in bytes
    pub upload_limit: usize,
    pub age_bounds: AgeBounds,
    /// Origin allowed to call the API from a browser
    pub cors_origin: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("school-data"),
            bind_addr: "127.0.0.1:3000".to_string(),
            api_url: "http://127.0.0.1:3000".to_string(),
            upload_limit: DEFAULT_UPLOAD_LIMIT,
            age_bounds: AgeBounds::default(),
            cors_origin: "http://localhost:8080".to_string(),
        }
    }
}

impl AppConfig {
    /// Defaults, then the `SCHOOL_CONFIG` file if set, then environment overrides
    pub fn load() -> Result<Self> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        info!("Configuration: data_dir={}, bind_addr={}", config.data_dir.display(), config.bind_addr);
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Parse YAML; keys left out keep their defaults
    pub fn from_yaml(content: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// A default configuration rooted at `data_dir`
    pub fn for_data_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(data_dir) = lookup(DATA_DIR_ENV) {
            self.data_dir = PathBuf::from(data_dir);
        }
        if let Some(bind_addr) = lookup(BIND_ADDR_ENV) {
            self.bind_addr = bind_addr;
        }
        if let Some(api_url) = lookup(API_URL_ENV) {
            self.api_url = api_url;
        }
    }
}
