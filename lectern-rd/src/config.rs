//! Configuration management for lectern-rd
//!
//! Single-tier TOML bootstrap configuration with CLI overrides. All values
//! have built-in defaults so the daemon runs with zero setup; a missing
//! config file is not an error.
//!
//! # Settings sources priority
//!
//! 1. Command-line arguments (--port)
//! 2. Environment variables (LECTERN_RD_PORT)
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Narration tuning (optional)
    #[serde(default)]
    pub narration: NarrationConfig,

    /// Content fetching limits (optional)
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            narration: NarrationConfig::default(),
            fetch: FetchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Narration tuning knobs
///
/// The settle delays exist because the speech engine's cancellation is
/// asynchronous: a cancel and an immediately-following speak can race inside
/// the engine. `cancel_settle_ms` may be set to 0 on engines verified not to
/// need it; the intent-flag guard alone still absorbs stray callbacks.
#[derive(Debug, Clone, Deserialize)]
pub struct NarrationConfig {
    /// Delay between issuing a cancel and the next speak (milliseconds)
    #[serde(default = "default_cancel_settle_ms")]
    pub cancel_settle_ms: u64,

    /// Delay between a natural utterance end and the next utterance
    #[serde(default = "default_advance_delay_ms")]
    pub advance_delay_ms: u64,

    /// How long a pause/stop intent flag outlives its cancel before being
    /// dropped, absorbing late callbacks from the cancelled utterance
    #[serde(default = "default_stop_settle_ms")]
    pub stop_settle_ms: u64,

    /// Segments whose sanitized text is shorter than this are skipped
    #[serde(default = "default_min_segment_chars")]
    pub min_segment_chars: usize,

    /// Sanitized segment text is truncated to this many characters
    #[serde(default = "default_max_utterance_chars")]
    pub max_utterance_chars: usize,

    /// Preferred voice language prefix (e.g. "en")
    #[serde(default = "default_preferred_language")]
    pub preferred_language: String,
}

impl Default for NarrationConfig {
    fn default() -> Self {
        Self {
            cancel_settle_ms: default_cancel_settle_ms(),
            advance_delay_ms: default_advance_delay_ms(),
            stop_settle_ms: default_stop_settle_ms(),
            min_segment_chars: default_min_segment_chars(),
            max_utterance_chars: default_max_utterance_chars(),
            preferred_language: default_preferred_language(),
        }
    }
}

impl NarrationConfig {
    pub fn cancel_settle(&self) -> Duration {
        Duration::from_millis(self.cancel_settle_ms)
    }

    pub fn advance_delay(&self) -> Duration {
        Duration::from_millis(self.advance_delay_ms)
    }

    pub fn stop_settle(&self) -> Duration {
        Duration::from_millis(self.stop_settle_ms)
    }
}

/// Content fetching limits
#[derive(Debug, Clone, Deserialize)]
pub struct FetchConfig {
    /// Per-request timeout in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum response body size in bytes
    #[serde(default = "default_fetch_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_fetch_timeout_secs(),
            max_body_bytes: default_fetch_max_body_bytes(),
        }
    }
}

impl FetchConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    5750
}

fn default_cancel_settle_ms() -> u64 {
    100
}

fn default_advance_delay_ms() -> u64 {
    100
}

fn default_stop_settle_ms() -> u64 {
    200
}

fn default_min_segment_chars() -> usize {
    10
}

fn default_max_utterance_chars() -> usize {
    400
}

fn default_preferred_language() -> String {
    "en".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    15
}

fn default_fetch_max_body_bytes() -> usize {
    2 * 1024 * 1024
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Complete application configuration after applying overrides
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub narration: NarrationConfig,
    pub fetch: FetchConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from an optional TOML file plus CLI overrides
    ///
    /// A missing file yields pure defaults; a malformed file is an error.
    pub async fn load(toml_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match toml_path {
            Some(path) => {
                let toml_str = tokio::fs::read_to_string(path).await.map_err(|e| {
                    Error::Config(format!("Failed to read config file {:?}: {}", path, e))
                })?;
                let parsed: TomlConfig = toml::from_str(&toml_str)
                    .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
                info!("Loaded TOML configuration from {:?}", path);
                parsed
            }
            None => TomlConfig::default(),
        };

        let port = overrides.port.unwrap_or(toml_config.port);

        Ok(Config {
            port,
            narration: toml_config.narration,
            fetch: toml_config.fetch,
            logging: toml_config.logging,
        })
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
}
