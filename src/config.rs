use crate::retry::RetryConfig;
use crate::{HarvestError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

const ENV_MAX_RETRIES: &str = "LYRICS_HARVEST_MAX_RETRIES";
const ENV_BACKOFF_SECS: &str = "LYRICS_HARVEST_BACKOFF_SECS";
const ENV_RATE_LIMIT_SECS: &str = "LYRICS_HARVEST_RATE_LIMIT_SECS";
const ENV_CONCURRENCY: &str = "LYRICS_HARVEST_CONCURRENCY";
const ENV_DEBUG_SAVE_RESPONSES: &str = "LYRICS_HARVEST_DEBUG_SAVE_RESPONSES";

/// Settings for one harvesting run.
///
/// Every field has a default, so a config file only needs the values it
/// changes:
///
/// ```json
/// { "rate_limit_cap_secs": 5, "retry": { "max_retries": 2 } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarvestConfig {
    /// Site root that discography and lyrics links are resolved against
    pub base_url: String,
    /// Artist search endpoint
    pub search_url: String,
    /// Retry budget and backoff for every remote operation
    pub retry: RetryConfig,
    /// Upper bound (exclusive) of the random pause between song fetches
    pub rate_limit_cap_secs: u64,
    /// Maximum number of lyrics fetches in flight
    pub concurrency: usize,
    /// Optional song allow-list, matched case-insensitively against song keys
    pub songs: Option<Vec<String>>,
    /// Write every fetched page to `debug_responses/`
    pub save_debug_responses: bool,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            base_url: "https://www.azlyrics.com".to_string(),
            search_url: "https://search.azlyrics.com/search.php".to_string(),
            retry: RetryConfig::default(),
            rate_limit_cap_secs: 15,
            concurrency: 1,
            songs: None,
            save_debug_responses: false,
        }
    }
}

impl HarvestConfig {
    /// Default config file location: `<config dir>/lyrics-harvest/config.json`.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| HarvestError::Config("Cannot determine config directory".to_string()))?;
        Ok(config_dir.join("lyrics-harvest").join("config.json"))
    }

    /// Read a config from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&contents).map_err(|e| {
            HarvestError::Config(format!("Failed to parse {}: {e}", path.display()))
        })?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load `path` (or the default location if it exists), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => match Self::default_path() {
                Ok(default) if default.exists() => Self::from_file(&default)?,
                _ => Self::default(),
            },
        };
        config.with_env_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides looked up through `lookup` (normally the process
    /// environment).
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_RETRIES) {
            self.retry.max_retries = parse_env(ENV_MAX_RETRIES, &value)?;
        }
        if let Some(value) = lookup(ENV_BACKOFF_SECS) {
            self.retry.backoff_unit_secs = parse_env(ENV_BACKOFF_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_RATE_LIMIT_SECS) {
            self.rate_limit_cap_secs = parse_env(ENV_RATE_LIMIT_SECS, &value)?;
        }
        if let Some(value) = lookup(ENV_CONCURRENCY) {
            self.concurrency = parse_env(ENV_CONCURRENCY, &value)?;
        }
        if lookup(ENV_DEBUG_SAVE_RESPONSES).is_some() {
            self.save_debug_responses = true;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(HarvestError::Config(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.base_url.is_empty() {
            return Err(HarvestError::Config("base_url must not be empty".to_string()));
        }
        Ok(())
    }

    /// Whether a song key passes the allow-list.
    pub fn wants_song(&self, key: &str) -> bool {
        match &self.songs {
            None => true,
            Some(songs) => {
                let key = key.to_lowercase();
                songs.iter().any(|wanted| wanted.to_lowercase() == key)
            }
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| HarvestError::Config(format!("{key}={value:?} is not a valid number")))
}
