use crate::types::EngineConfig;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during config management
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("TOML serialization error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    #[error("TOML deserialization error: {0}")]
    TomlDe(#[from] toml::de::Error),

    #[error("Config file not found at {0}")]
    ConfigNotFound(PathBuf),

    #[error("Config file already exists at {0}")]
    ConfigExists(PathBuf),

    #[error("Invalid config: {0}")]
    Invalid(String),

    #[error("Config directory not found")]
    ConfigDirNotFound,
}

/// Manager for logtriage configuration
///
/// The config lives in `<config dir>/logtriage/config.toml`
/// (`~/.config/logtriage/config.toml` on Linux).
#[derive(Debug)]
pub struct ConfigManager {
    config_path: PathBuf,
    config: EngineConfig,
}

impl ConfigManager {
    /// Get the default config path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dir = dirs::config_dir().ok_or(ConfigError::ConfigDirNotFound)?;
        Ok(dir.join("logtriage").join("config.toml"))
    }

    /// Load config from default location
    pub async fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path).await
    }

    /// Load config from specific path
    pub async fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !tokio::fs::try_exists(path).await? {
            return Err(ConfigError::ConfigNotFound(path.to_path_buf()));
        }

        let contents = tokio::fs::read_to_string(path).await?;
        let config: EngineConfig = toml::from_str(&contents)?;
        config.validate()?;

        debug!(path = %path.display(), "loaded config");

        Ok(Self {
            config_path: path.to_path_buf(),
            config,
        })
    }

    /// Load `path` if given, otherwise the default location, falling back
    /// to defaults when no file exists there.
    ///
    /// An explicitly given path must exist.
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load_from(path).await;
        }

        let config_path = Self::config_path()?;
        match Self::load_from(&config_path).await {
            Err(ConfigError::ConfigNotFound(_)) => {
                debug!(path = %config_path.display(), "no config file, using defaults");
                Ok(Self {
                    config_path,
                    config: EngineConfig::default(),
                })
            }
            other => other,
        }
    }

    /// Initialize a new config file
    pub async fn init() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;
        Self::init_at(&config_path).await
    }

    /// Initialize config at specific path; an existing file is left alone
    pub async fn init_at(path: &Path) -> Result<Self, ConfigError> {
        if tokio::fs::try_exists(path).await? {
            return Err(ConfigError::ConfigExists(path.to_path_buf()));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let manager = Self {
            config_path: path.to_path_buf(),
            config: EngineConfig::default(),
        };
        manager.save().await?;

        Ok(manager)
    }

    /// Save config to disk atomically
    ///
    /// Uses a temporary file and atomic rename to prevent corruption
    pub async fn save(&self) -> Result<(), ConfigError> {
        self.config.validate()?;
        let toml_str = toml::to_string_pretty(&self.config)?;

        let temp_path = self.config_path.with_extension("toml.tmp");
        tokio::fs::write(&temp_path, toml_str).await?;
        tokio::fs::rename(&temp_path, &self.config_path).await?;

        Ok(())
    }

    /// Path this manager loads from and saves to
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Get reference to config
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Get mutable reference to config (caller must call save())
    pub fn config_mut(&mut self) -> &mut EngineConfig {
        &mut self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn create_test_manager() -> (ConfigManager, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("config.toml");
        let manager = ConfigManager::init_at(&config_path).await.unwrap();
        (manager, temp_dir)
    }

    #[tokio::test]
    async fn test_init_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("nested").join("config.toml");

        let manager = ConfigManager::init_at(&config_path).await.unwrap();
        assert_eq!(manager.config(), &EngineConfig::default());

        let loaded = ConfigManager::load_from(&config_path).await.unwrap();
        assert_eq!(loaded.config(), manager.config());
        assert_eq!(loaded.path(), config_path.as_path());
    }

    #[tokio::test]
    async fn test_init_refuses_to_overwrite() {
        let (manager, _temp_dir) = create_test_manager().await;
        let result = ConfigManager::init_at(manager.path()).await;
        assert!(matches!(result, Err(ConfigError::ConfigExists(_))));
    }

    #[tokio::test]
    async fn test_save_persists_changes() {
        let (mut manager, temp_dir) = create_test_manager().await;
        manager.config_mut().analysis.context_window = 7;
        manager.config_mut().rules.paths.push(temp_dir.path().join("rules"));
        manager.save().await.unwrap();

        let loaded = ConfigManager::load_from(manager.path()).await.unwrap();
        assert_eq!(loaded.config().analysis.context_window, 7);
        assert_eq!(loaded.config().rules.paths.len(), 1);
        assert!(!manager.path().with_extension("toml.tmp").exists());
    }

    #[tokio::test]
    async fn test_save_rejects_invalid_config() {
        let (mut manager, _temp_dir) = create_test_manager().await;
        manager.config_mut().bulk.max_concurrent = 0;
        assert!(matches!(
            manager.save().await,
            Err(ConfigError::Invalid(_))
        ));
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing.toml");
        assert!(matches!(
            ConfigManager::load_from(&path).await,
            Err(ConfigError::ConfigNotFound(_))
        ));
        assert!(matches!(
            ConfigManager::load_or_default(Some(&path)).await,
            Err(ConfigError::ConfigNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_load_rejects_bad_values() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        std::fs::write(&path, "[analysis]\ncontext_window = \"wide\"\n").unwrap();
        assert!(matches!(
            ConfigManager::load_from(&path).await,
            Err(ConfigError::TomlDe(_))
        ));

        std::fs::write(&path, "[bulk]\nmax_concurrent = 0\n").unwrap();
        assert!(matches!(
            ConfigManager::load_from(&path).await,
            Err(ConfigError::Invalid(_))
        ));
    }
}
