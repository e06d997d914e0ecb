use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::backend::normalize_base_url;
use crate::controller::progress::ProgressConfig;

const APP_DIR: &str = "video-text-extractor";
const HISTORY_FILE: &str = "transcriptions.json";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Transcription backend settings
    pub backend: BackendConfig,

    /// Progress display settings
    #[serde(default)]
    pub progress: ProgressSettings,

    /// Local history settings
    #[serde(default)]
    pub history: HistoryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Base URL of the transcription service
    pub base_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressSettings {
    /// Interval between progress ticks
    pub tick_interval_ms: u64,

    /// Time after which the progress display is forced to 100%
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// History file location (platform data directory if unset)
    pub path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendConfig {
                base_url: "http://localhost:8000".to_string(),
                timeout_secs: 600,
            },
            progress: ProgressSettings::default(),
            history: HistoryConfig::default(),
        }
    }
}

impl Default for ProgressSettings {
    fn default() -> Self {
        Self {
            tick_interval_ms: 800,
            timeout_ms: 10_000,
        }
    }
}

impl Config {
    /// Load configuration from file or create default
    pub async fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            let config = Self::default();
            config.save().await?;
            Ok(config)
        }
    }

    /// Load and validate a configuration file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs_err::read_to_string(path)
            .context("Failed to read config file")?;

        let config: Config = serde_yaml::from_str(&content)
            .context("Failed to parse config file")?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self)
            .context("Failed to serialize config")?;

        fs_err::write(&config_path, content)
            .context("Failed to write config file")?;

        Ok(())
    }

    /// Get configuration file path
    pub fn config_path() -> Result<PathBuf> {
        // First try current directory for easy testing
        let local_config = PathBuf::from("config.yaml");
        if local_config.exists() {
            return Ok(local_config);
        }

        let config_dir = dirs::config_dir()
            .context("Could not determine config directory")?;

        Ok(config_dir.join(APP_DIR).join("config.yaml"))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        normalize_base_url(&self.backend.base_url)?;

        if self.backend.timeout_secs == 0 {
            anyhow::bail!("Backend timeout must be greater than zero");
        }

        if self.progress.tick_interval_ms == 0 || self.progress.timeout_ms == 0 {
            anyhow::bail!("Progress intervals must be greater than zero");
        }

        Ok(())
    }

    /// Override the backend URL (command line or environment)
    pub fn with_backend_url(mut self, base_url: Option<String>) -> Result<Self> {
        if let Some(base_url) = base_url {
            self.backend.base_url = base_url;
            self.validate()?;
        }
        Ok(self)
    }

    /// Resolve where the history file lives
    pub fn history_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.history.path {
            return Ok(path.clone());
        }

        let data_dir = dirs::data_dir()
            .context("Could not determine data directory")?;

        Ok(data_dir.join(APP_DIR).join(HISTORY_FILE))
    }

    /// Progress feed settings for the controller
    pub fn progress_config(&self) -> ProgressConfig {
        ProgressConfig {
            tick_interval: Duration::from_millis(self.progress.tick_interval_ms),
            timeout: Duration::from_millis(self.progress.timeout_ms),
            ..ProgressConfig::default()
        }
    }

    /// Display current configuration
    pub fn display(&self) {
        println!("Current Configuration:");
        println!("  Backend URL: {}", self.backend.base_url);
        println!("  Request Timeout: {}s", self.backend.timeout_secs);
        println!("  Progress Tick: {}ms", self.progress.tick_interval_ms);
        println!("  Progress Timeout: {}ms", self.progress.timeout_ms);
        match self.history_path() {
            Ok(path) => println!("  History File: {}", path.display()),
            Err(_) => println!("  History File: (unavailable)"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.backend.base_url, "http://localhost:8000");
        assert_eq!(config.progress.tick_interval_ms, 800);
        assert_eq!(config.progress.timeout_ms, 10_000);
    }

    #[test]
    fn test_load_from_yaml_with_missing_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(
            &path,
            "backend:\n  base_url: http://127.0.0.1:9000\n  timeout_secs: 30\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.backend.base_url, "http://127.0.0.1:9000");
        assert_eq!(config.backend.timeout_secs, 30);
        assert_eq!(config.progress.tick_interval_ms, 800);
        assert!(config.history.path.is_none());
    }

    #[test]
    fn test_invalid_backend_url_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        fs_err::write(&path, "backend:\n  base_url: not-a-url\n  timeout_secs: 30\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_backend_url_override() {
        let config = Config::default()
            .with_backend_url(Some("https://transcribe.internal:8443".to_string()))
            .unwrap();
        assert_eq!(config.backend.base_url, "https://transcribe.internal:8443");

        assert!(Config::default()
            .with_backend_url(Some("bogus".to_string()))
            .is_err());
    }

    #[test]
    fn test_explicit_history_path() {
        let mut config = Config::default();
        config.history.path = Some(PathBuf::from("/tmp/history.json"));
        assert_eq!(config.history_path().unwrap(), PathBuf::from("/tmp/history.json"));
    }

    #[test]
    fn test_progress_config_conversion() {
        let mut config = Config::default();
        config.progress.tick_interval_ms = 100;
        config.progress.timeout_ms = 2_000;

        let progress = config.progress_config();
        assert_eq!(progress.tick_interval, Duration::from_millis(100));
        assert_eq!(progress.timeout, Duration::from_millis(2_000));
        assert_eq!(progress.cap, 90.0);
    }
}
