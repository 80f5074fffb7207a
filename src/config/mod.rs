//! Configuration management for trellis

pub mod schema;

pub use schema::{CacheConfig, ComponentConfig, Config, MarkupConfig};

use crate::error::{TrellisError, TrellisResult};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Name of the project-local config file
pub const LOCAL_CONFIG_FILE: &str = ".trellis.toml";

/// Configuration manager
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new config manager with default path
    pub fn new() -> Self {
        Self {
            config_path: Self::default_config_path(),
        }
    }

    /// Create a config manager with a custom path
    pub fn with_path(path: PathBuf) -> Self {
        Self { config_path: path }
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("trellis")
            .join("config.toml")
    }

    /// Walk up from `start` looking for a project-local config file
    pub fn find_local_config(start: &Path) -> Option<PathBuf> {
        start
            .ancestors()
            .map(|dir| dir.join(LOCAL_CONFIG_FILE))
            .find(|candidate| candidate.is_file())
    }

    /// Load configuration, creating default if not exists
    pub async fn load(&self) -> TrellisResult<Config> {
        if !self.config_path.exists() {
            debug!("Config file not found, using defaults");
            return Ok(Config::default());
        }

        self.load_from_file(&self.config_path).await
    }

    /// Load the global config and overlay a project-local one on top.
    ///
    /// Relative resource roots in the local file are resolved against the
    /// directory that contains it.
    pub async fn load_merged(&self, local: Option<&Path>) -> TrellisResult<Config> {
        let base = self.load().await?;
        let Some(local_path) = local else {
            return Ok(base);
        };

        let content = fs::read_to_string(local_path).await.map_err(|e| {
            TrellisError::io(format!("reading config from {}", local_path.display()), e)
        })?;
        let mut merged = toml::Value::try_from(&base)?;
        let overlay: toml::Value =
            content
                .parse()
                .map_err(|e: toml::de::Error| TrellisError::ConfigInvalid {
                    path: local_path.to_path_buf(),
                    reason: e.to_string(),
                })?;
        merge_toml(&mut merged, overlay);

        let mut config: Config =
            merged
                .try_into()
                .map_err(|e: toml::de::Error| TrellisError::ConfigInvalid {
                    path: local_path.to_path_buf(),
                    reason: e.to_string(),
                })?;

        if let Some(dir) = local_path.parent() {
            for root in &mut config.resources.roots {
                if root.is_relative() {
                    *root = dir.join(&*root);
                }
            }
        }

        debug!("Merged local config from {}", local_path.display());
        Ok(config)
    }

    /// Load configuration from a specific file
    pub async fn load_from_file(&self, path: &Path) -> TrellisResult<Config> {
        let content = fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TrellisError::ConfigNotFound(path.to_path_buf())
            } else {
                TrellisError::io(format!("reading config from {}", path.display()), e)
            }
        })?;

        toml::from_str(&content).map_err(|e| TrellisError::ConfigInvalid {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Save configuration to file
    pub async fn save(&self, config: &Config) -> TrellisResult<()> {
        self.ensure_config_dir().await?;

        let content = toml::to_string_pretty(config)?;
        fs::write(&self.config_path, content).await.map_err(|e| {
            TrellisError::io(
                format!("writing config to {}", self.config_path.display()),
                e,
            )
        })?;

        info!("Configuration saved to {}", self.config_path.display());
        Ok(())
    }

    /// Ensure the config directory exists
    async fn ensure_config_dir(&self) -> TrellisResult<()> {
        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| TrellisError::ConfigDirCreate {
                    path: parent.to_path_buf(),
                    source: e,
                })?;
        }
        Ok(())
    }

    /// Get the config file path
    pub fn path(&self) -> &Path {
        &self.config_path
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

/// Recursively merge `overlay` into `base`. Tables merge, everything else replaces.
fn merge_toml(base: &mut toml::Value, overlay: toml::Value) {
    match (base, overlay) {
        (toml::Value::Table(base), toml::Value::Table(overlay)) => {
            for (key, value) in overlay {
                match base.get_mut(&key) {
                    Some(existing) => merge_toml(existing, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, overlay) => *base = overlay,
    }
}
