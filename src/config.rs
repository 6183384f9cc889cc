use crate::defaults;
use crate::error::{Result, SeqscribeError};
use crate::pipeline::orchestrator::PipelineConfig;
use crate::pipeline::reorder::StallPolicy;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub audio: AudioConfig,
    pub pipeline: PipelineSection,
}

/// Audio capture and segmentation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub window_ms: u32,
    pub vad_threshold: f32,
}

/// Worker pool and ordering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineSection {
    pub workers: usize,
    /// Work queue bound; 0 means unbounded.
    pub queue_capacity: usize,
    /// Stall timeout for the reordering sink in milliseconds; 0 disables the
    /// timeout (wait forever on a missing sequence).
    pub stall_timeout_ms: u64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: defaults::SAMPLE_RATE,
            window_ms: defaults::WINDOW_MS,
            vad_threshold: defaults::VAD_THRESHOLD,
        }
    }
}

impl Default for PipelineSection {
    fn default() -> Self {
        Self {
            workers: defaults::WORKERS,
            queue_capacity: defaults::QUEUE_CAPACITY,
            stall_timeout_ms: defaults::STALL_TIMEOUT_MS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        match Self::load(path) {
            Ok(config) => Ok(config),
            Err(e) => {
                if e.downcast_ref::<std::io::Error>()
                    .map(|io_err| io_err.kind() == std::io::ErrorKind::NotFound)
                    .unwrap_or(false)
                {
                    Ok(Self::default())
                } else {
                    Err(e)
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - SEQSCRIBE_WORKERS → pipeline.workers
    /// - SEQSCRIBE_WINDOW_MS → audio.window_ms
    /// - SEQSCRIBE_STALL_TIMEOUT_MS → pipeline.stall_timeout_ms
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(workers) = std::env::var("SEQSCRIBE_WORKERS")
            && let Ok(workers) = workers.parse()
        {
            self.pipeline.workers = workers;
        }

        if let Ok(window_ms) = std::env::var("SEQSCRIBE_WINDOW_MS")
            && let Ok(window_ms) = window_ms.parse()
        {
            self.audio.window_ms = window_ms;
        }

        if let Ok(timeout) = std::env::var("SEQSCRIBE_STALL_TIMEOUT_MS")
            && let Ok(timeout) = timeout.parse()
        {
            self.pipeline.stall_timeout_ms = timeout;
        }

        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.workers == 0 {
            return Err(SeqscribeError::ConfigInvalidValue {
                key: "pipeline.workers".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.audio.window_ms == 0 {
            return Err(SeqscribeError::ConfigInvalidValue {
                key: "audio.window_ms".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.audio.sample_rate == 0 {
            return Err(SeqscribeError::ConfigInvalidValue {
                key: "audio.sample_rate".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.audio.vad_threshold) {
            return Err(SeqscribeError::ConfigInvalidValue {
                key: "audio.vad_threshold".to_string(),
                message: "must be between 0.0 and 1.0".to_string(),
            });
        }
        Ok(())
    }

    /// Convert into the runtime pipeline configuration.
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            sample_rate: self.audio.sample_rate,
            window_ms: self.audio.window_ms,
            workers: self.pipeline.workers,
            queue_capacity: match self.pipeline.queue_capacity {
                0 => None,
                n => Some(n),
            },
            stall_policy: match self.pipeline.stall_timeout_ms {
                0 => StallPolicy::Unbounded,
                ms => StallPolicy::SkipAfter(Duration::from_millis(ms)),
            },
        }
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/seqscribe/config.toml on Linux
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("seqscribe").join("config.toml"))
    }
}
