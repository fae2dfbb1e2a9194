//! Configuration file support for moor.
//!
//! Two locations are consulted:
//! - Global: `~/.moor/config.toml` - user-wide defaults
//! - Project: `.moor/config.toml` - project-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Moor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Repository settings
    pub repository: RepositoryConfig,

    /// Environment-building settings
    pub environment: EnvironmentConfig,
}

/// Where packages come from and what they may reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Root directory of the package repository
    pub path: Option<PathBuf>,

    /// Allowed URL prefixes for archive/resource statements.
    /// `None` means no restriction.
    pub url_whitelist: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Config applied when a descriptor names none
    pub default_config: Option<String>,

    /// Where retrieved files land, relative to the working directory
    pub retrieve_directory: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if the file
    /// doesn't exist or fails to parse.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create config directory: {}", parent.display()))?;
        }

        let contents =
            toml::to_string_pretty(self).context("failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config: {}", path.display()))?;

        Ok(())
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: AppConfig) {
        if other.repository.path.is_some() {
            self.repository.path = other.repository.path;
        }
        if other.repository.url_whitelist.is_some() {
            self.repository.url_whitelist = other.repository.url_whitelist;
        }
        if other.environment.default_config.is_some() {
            self.environment.default_config = other.environment.default_config;
        }
        if other.environment.retrieve_directory.is_some() {
            self.environment.retrieve_directory = other.environment.retrieve_directory;
        }
    }
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (.moor/config.toml)
/// 2. Global config (~/.moor/config.toml)
/// 3. Defaults
pub fn load_app_config(global_path: Option<&Path>, project_path: &Path) -> AppConfig {
    let mut config = AppConfig::default();

    if let Some(global_path) = global_path {
        if global_path.exists() {
            config.merge(AppConfig::load_or_default(global_path));
        }
    }

    if project_path.exists() {
        config.merge(AppConfig::load_or_default(project_path));
    }

    config
}

/// Get the global moor config directory (~/.moor).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(".moor"))
}

/// Get the global config path (~/.moor/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (.moor/config.toml).
pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(".moor").join("config.toml")
}
