//! Configuration management for cinetui
//!
//! Handles config file loading/saving and API key lookup.
//! Config is stored at ~/.config/cinetui/config.toml

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::api::tmdb::DEFAULT_BASE_URL;
use crate::stream::servers::{Catalog, DEFAULT_SERVER_ID};

/// Environment variable that overrides the configured TMDB key
pub const API_KEY_ENV: &str = "TMDB_API_KEY";

/// Watchlist owner when none is configured
pub const DEFAULT_USER: &str = "local";

/// Application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// TMDB API read access token
    pub tmdb_api_key: Option<String>,
    /// Override for the TMDB API root (tests, proxies)
    pub tmdb_base_url: Option<String>,
    /// Server selected when a session starts
    pub default_server: Option<String>,
    /// Watchlist owner
    pub user: Option<String>,
    /// Watchlist file location
    pub watchlist_path: Option<PathBuf>,
}

impl Config {
    /// Get config file path (~/.config/cinetui/config.toml)
    pub fn path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cinetui").join("config.toml"))
    }

    /// Load config from the default location, or return defaults
    pub fn load() -> Self {
        Self::path().map(|p| Self::load_from(&p)).unwrap_or_default()
    }

    /// Load config from `path`. A missing file gives defaults; an
    /// unreadable one is logged and gives defaults too.
    pub fn load_from(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        match toml::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "ignoring invalid config file");
                Self::default()
            }
        }
    }

    /// Save config to `path`
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, toml::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Save config to the default location
    pub fn save(&self) -> Result<()> {
        let path = Self::path().ok_or_else(|| anyhow::anyhow!("Could not determine config path"))?;
        self.save_to(&path)
    }

    /// TMDB key: environment variable first, then the config file
    pub fn tmdb_api_key(&self) -> Option<String> {
        resolve_key(std::env::var(API_KEY_ENV).ok(), self.tmdb_api_key.as_deref())
    }

    pub fn tmdb_base_url(&self) -> &str {
        self.tmdb_base_url.as_deref().unwrap_or(DEFAULT_BASE_URL)
    }

    /// Configured server, normalized against the built-in catalog
    pub fn default_server(&self) -> &'static str {
        Catalog::shared().normalize(self.default_server.as_deref().unwrap_or(DEFAULT_SERVER_ID))
    }

    pub fn user(&self) -> &str {
        self.user.as_deref().unwrap_or(DEFAULT_USER)
    }

    /// Watchlist file (~/.local/share/cinetui/watchlist.json by default)
    pub fn watchlist_path(&self) -> PathBuf {
        self.watchlist_path.clone().unwrap_or_else(|| {
            dirs::data_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("cinetui")
                .join("watchlist.json")
        })
    }
}

fn resolve_key(env: Option<String>, file: Option<&str>) -> Option<String> {
    env.or_else(|| file.map(str::to_string))
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
