use crate::error::{Result, SubtransError};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "https://api-free.deepl.com/v2/translate";

/// Monthly character allowance of the DeepL free tier.
pub const DEFAULT_QUOTA_LIMIT: u64 = 500_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: String,
    pub threads: usize,
    pub quota_limit: u64,
    pub pacing_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: DEFAULT_API_URL.to_string(),
            threads: 4,
            quota_limit: DEFAULT_QUOTA_LIMIT,
            pacing_ms: 100,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_file_path() {
            Some(config_path) => Self::from_file(&config_path)?,
            None => Self::default(),
        };

        // Override with environment variables
        if let Ok(key) = std::env::var("DEEPL_API_KEY") {
            config.api_key = Some(key);
        }
        if let Ok(url) = std::env::var("SUBTRANS_API_URL") {
            config.api_url = url;
        }
        if let Ok(threads) = std::env::var("SUBTRANS_THREADS") {
            if let Ok(t) = threads.parse() {
                config.threads = t;
            }
        }

        Ok(config)
    }

    /// Read a config file. A missing file yields the defaults; a malformed
    /// one is an error so it is never silently overwritten.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<Config>(&contents)?)
    }

    /// Persist the configuration to the per-user config file.
    pub fn save(&self) -> Result<PathBuf> {
        let path = Self::config_file_path().ok_or_else(|| {
            SubtransError::Config("Could not determine the user config directory".to_string())
        })?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, toml::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(SubtransError::Config(
                "Thread count must be greater than 0".to_string(),
            ));
        }
        if self.api_url.trim().is_empty() {
            return Err(SubtransError::Config("API URL must not be empty".to_string()));
        }
        Ok(())
    }

    /// True when a non-blank API key is configured.
    pub fn has_credential(&self) -> bool {
        self.api_key
            .as_deref()
            .is_some_and(|key| !key.trim().is_empty())
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }

    pub fn config_file_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("subtrans").join("config.toml"))
    }
}
