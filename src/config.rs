// Engine configuration
// All tunables in one serde struct; every field has a default so partial files are valid

use crate::matching::Script;
use crate::progression::sequential::{
    SequentialConfig, DEFAULT_SEQUENTIAL_THRESHOLD, DEFAULT_SETTLE_DELAY_MS,
};
use crate::progression::single::DEFAULT_SINGLE_TARGET_THRESHOLD;
use crate::progression::timeout::DEFAULT_TOKEN_TIMEOUT_MS;
use crate::recognition::supervisor::{
    DEFAULT_GUARD_DELAY_MS, DEFAULT_MAX_RESTART_ATTEMPTS, DEFAULT_RESTART_DELAY_MS,
    DEFAULT_STABLE_TURN_MS,
};
use crate::recognition::{RecognizerConfig, SupervisorConfig};
use crate::speech::SpeechOptions;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File name of the engine config inside the app config directory
pub const CONFIG_FILE_NAME: &str = "engine.json";

/// Errors that can occur while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,
    #[error("Failed to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Tunables for recognition, scoring and progression
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    pub language_tag: String,
    pub script: Script,
    pub continuous: bool,
    pub interim_results: bool,
    pub max_alternatives: u32,
    pub guard_delay_ms: u64,
    pub restart_delay_ms: u64,
    pub max_restart_attempts: u32,
    pub stable_turn_ms: u64,
    pub single_target_threshold: f64,
    pub sequential_threshold: f64,
    pub token_timeout_ms: u64,
    pub settle_delay_ms: u64,
    pub speech_rate: f32,
    pub speech_pitch: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            language_tag: "te-IN".to_string(),
            script: Script::Telugu,
            continuous: true,
            interim_results: true,
            max_alternatives: 1,
            guard_delay_ms: DEFAULT_GUARD_DELAY_MS,
            restart_delay_ms: DEFAULT_RESTART_DELAY_MS,
            max_restart_attempts: DEFAULT_MAX_RESTART_ATTEMPTS,
            stable_turn_ms: DEFAULT_STABLE_TURN_MS,
            single_target_threshold: DEFAULT_SINGLE_TARGET_THRESHOLD,
            sequential_threshold: DEFAULT_SEQUENTIAL_THRESHOLD,
            token_timeout_ms: DEFAULT_TOKEN_TIMEOUT_MS,
            settle_delay_ms: DEFAULT_SETTLE_DELAY_MS,
            speech_rate: 0.8,
            speech_pitch: 1.0,
        }
    }
}

impl EngineConfig {
    /// Default config location: `<config_dir>/recite/engine.json`
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join("recite").join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load config from `path`
    ///
    /// A missing file yields the defaults. The loaded config is validated.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            crate::debug!("No config file at {:?}, using defaults", path);
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;

        crate::info!("Loaded engine config from {:?}", path);
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("singleTargetThreshold", self.single_target_threshold),
            ("sequentialThreshold", self.sequential_threshold),
        ] {
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!(
                    "{} must be in [0, 1), got {}",
                    name, value
                )));
            }
        }
        if self.token_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "tokenTimeoutMs must be greater than zero".to_string(),
            ));
        }
        if self.max_alternatives == 0 {
            return Err(ConfigError::Invalid(
                "maxAlternatives must be at least 1".to_string(),
            ));
        }
        if self.language_tag.trim().is_empty() {
            return Err(ConfigError::Invalid("languageTag cannot be empty".to_string()));
        }
        Ok(())
    }

    pub fn recognizer(&self) -> RecognizerConfig {
        RecognizerConfig {
            continuous: self.continuous,
            interim_results: self.interim_results,
            language_tag: self.language_tag.clone(),
            max_alternatives: self.max_alternatives,
        }
    }

    pub fn supervisor(&self) -> SupervisorConfig {
        SupervisorConfig {
            recognizer: self.recognizer(),
            guard_delay: Duration::from_millis(self.guard_delay_ms),
            restart_delay: Duration::from_millis(self.restart_delay_ms),
            max_restart_attempts: self.max_restart_attempts,
            stable_turn: Duration::from_millis(self.stable_turn_ms),
        }
    }

    pub fn sequential(&self) -> SequentialConfig {
        SequentialConfig {
            threshold: self.sequential_threshold,
            token_timeout: Duration::from_millis(self.token_timeout_ms),
            settle_delay: Duration::from_millis(self.settle_delay_ms),
        }
    }

    pub fn speech(&self) -> SpeechOptions {
        SpeechOptions {
            language_tag: self.language_tag.clone(),
            rate: self.speech_rate,
            pitch: self.speech_pitch,
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
