//! Bootstrap configuration for lsc-server
//!
//! Sources, highest priority first:
//! 1. Command-line arguments
//! 2. Environment variables (`LSC_*`, read by clap)
//! 3. TOML configuration file (`--config`, else the per-user config dir)
//! 4. Built-in defaults
//!
//! A missing default config file is not an error; the server starts on
//! built-in defaults. An explicitly requested file must exist.

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Command-line arguments for lsc-server
#[derive(Parser, Debug, Default)]
#[command(name = "lsc-server")]
#[command(about = "Lung sound classification service (HTTP upload + PCM streaming)")]
#[command(version)]
pub struct CliArgs {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "LSC_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "LSC_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "LSC_PORT")]
    pub port: Option<u16>,

    /// Model artifact (.mpk) produced by lsc-train
    #[arg(short, long, env = "LSC_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// WAV file receiving the raw stream capture
    #[arg(long, env = "LSC_CAPTURE_PATH")]
    pub capture_path: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LSC_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Load the TOML layer and apply argument/environment overrides
    pub fn resolve(&self) -> Result<(ServerConfig, ConfigSource), ConfigError> {
        let (mut config, source) = ServerConfig::load(self.config.as_deref())?;

        if let Some(host) = &self.host {
            config.host = host.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(model_path) = &self.model_path {
            config.model_path = model_path.clone();
        }
        if let Some(capture_path) = &self.capture_path {
            config.stream.capture_path = capture_path.clone();
        }
        if let Some(level) = &self.log_level {
            config.logging.level = level.clone();
        }

        Ok((config, source))
    }
}

/// Where the TOML layer came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,

    /// Model artifact loaded once at startup
    pub model_path: PathBuf,

    /// Upper bound on `/predict` request bodies
    pub max_upload_bytes: usize,

    pub stream: StreamConfig,
    pub logging: LoggingConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            model_path: PathBuf::from("lung_cnn_model.mpk"),
            max_upload_bytes: 10 * 1024 * 1024,
            stream: StreamConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Streaming endpoint settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    /// Dump every received PCM chunk to `capture_path`
    pub capture_enabled: bool,

    /// Raw stream dump, rewritten by each producer connection. Only one
    /// producer writes it at a time; producers connecting while it is held
    /// run without capture.
    pub capture_path: PathBuf,

    /// Send each chunk's result back on the producer socket
    pub reply_to_producer: bool,

    /// Per-listener queue depth before updates are dropped
    pub listener_buffer: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capture_enabled: true,
            capture_path: PathBuf::from("stream_capture.wav"),
            reply_to_producer: true,
            listener_buffer: 16,
        }
    }
}

impl StreamConfig {
    /// Capture file when capture is enabled
    pub fn capture_target(&self) -> Option<&Path> {
        self.capture_enabled.then_some(self.capture_path.as_path())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error); `RUST_LOG` wins when set
    pub level: String,

    /// Log file path (optional, logs to stdout only if not specified)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: None,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, else the default location, else built-in defaults
    pub fn load(path: Option<&Path>) -> Result<(Self, ConfigSource), ConfigError> {
        if let Some(path) = path {
            return Ok((Self::from_file(path)?, ConfigSource::File(path.to_path_buf())));
        }

        match default_config_path() {
            Some(path) if path.exists() => {
                let config = Self::from_file(&path)?;
                Ok((config, ConfigSource::File(path)))
            }
            _ => Ok((Self::default(), ConfigSource::Defaults)),
        }
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// `<config dir>/lsc/config.toml` for the current platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lsc").join("config.toml"))
}
