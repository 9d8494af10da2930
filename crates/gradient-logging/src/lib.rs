//! Structured logging for gradient routing nodes
//!
//! This crate sets up `tracing` output for simulations and live runs where
//! many nodes log through one process.
//!
//! # Features
//!
//! - **Pretty console output**: Human-readable, the default
//! - **JSONL output**: Structured JSON lines for post-processing delivery logs
//! - **Node context**: Every event inside a [`NodeContextGuard`] carries the node id
//! - **File rotation**: Daily/hourly log rotation via tracing-appender
//!
//! # Quick Start
//!
//! ```ignore
//! use gradient_logging::{GradientSubscriberBuilder, LogConfig};
//!
//! // Pretty console output at info
//! GradientSubscriberBuilder::new().init()?;
//!
//! // JSONL to stdout for machine consumption
//! GradientSubscriberBuilder::new()
//!     .with_json_console(true)
//!     .init()?;
//! ```

pub mod config;
pub mod context;
pub mod layers;

pub use config::{ConsoleConfig, FileConfig, JsonlConfig, LogConfig, RotationStrategy};
pub use context::{NodeContextData, NodeContextGuard};

use std::fs::{self, File};

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::layers::{BoxedLayer, jsonl_layer, pretty_layer};

/// Errors initializing the global subscriber
#[derive(Debug, Error)]
pub enum LogInitError {
    #[error("Failed to open log file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Global subscriber already set: {0}")]
    AlreadySet(String),
}

/// Builder for configuring and initializing the logging subscriber
///
/// `RUST_LOG` overrides the configured default level when set.
pub struct GradientSubscriberBuilder {
    config: LogConfig,
}

impl GradientSubscriberBuilder {
    /// Create a new subscriber builder with default configuration
    pub fn new() -> Self {
        Self {
            config: LogConfig::default(),
        }
    }

    /// Use a specific configuration
    pub fn with_config(mut self, config: LogConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the default log level
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.config.default_level = level.into();
        self
    }

    /// Enable or disable console output
    pub fn with_console(mut self, enabled: bool) -> Self {
        self.config.console.enabled = enabled;
        self
    }

    /// Switch console output between JSONL and pretty
    pub fn with_json_console(mut self, json: bool) -> Self {
        self.config.console.pretty = !json;
        self
    }

    /// Configure file output
    pub fn with_file_output(mut self, config: FileConfig) -> Self {
        self.config.file = Some(config);
        self
    }

    /// The configuration that will be applied
    pub fn config(&self) -> &LogConfig {
        &self.config
    }

    /// Install the subscriber globally
    ///
    /// Returns a guard that must be kept alive while logging to a file.
    pub fn init(self) -> Result<Option<WorkerGuard>, LogInitError> {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.config.default_level));

        let mut layers: Vec<BoxedLayer<Registry>> = Vec::new();
        let mut guard = None;

        if self.config.console.enabled {
            layers.push(if self.config.console.pretty {
                pretty_layer(self.config.console.ansi)
            } else {
                jsonl_layer(std::io::stdout, &self.config.jsonl)
            });
        }

        if let Some(file_config) = &self.config.file {
            let (writer, file_guard) = file_writer(file_config)?;
            guard = Some(file_guard);
            layers.push(jsonl_layer(writer, &self.config.jsonl));
        }

        Registry::default()
            .with(layers)
            .with(env_filter)
            .try_init()
            .map_err(|e| LogInitError::AlreadySet(e.to_string()))?;

        Ok(guard)
    }
}

impl Default for GradientSubscriberBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blocking writer for file output; `Never` truncates a single file
fn file_writer(config: &FileConfig) -> Result<(NonBlocking, WorkerGuard), LogInitError> {
    let rotation = match config.rotation {
        RotationStrategy::Never => {
            fs::create_dir_all(&config.directory)?;
            let path = config.directory.join(format!("{}.log", config.prefix));
            return Ok(tracing_appender::non_blocking(File::create(path)?));
        }
        RotationStrategy::Daily => Rotation::DAILY,
        RotationStrategy::Hourly => Rotation::HOURLY,
    };
    let appender = RollingFileAppender::new(rotation, &config.directory, &config.prefix);
    Ok(tracing_appender::non_blocking(appender))
}

/// Initialize logging with default settings (pretty console at info)
pub fn init_default() -> Result<(), LogInitError> {
    GradientSubscriberBuilder::new().init().map(|_| ())
}

/// Initialize logging for development (debug, pretty console output)
pub fn init_development() -> Result<(), LogInitError> {
    GradientSubscriberBuilder::new()
        .with_config(LogConfig::development())
        .init()
        .map(|_| ())
}

/// Initialize logging for tests (warnings only); ignores a second call
pub fn init_testing() {
    let _ = GradientSubscriberBuilder::new()
        .with_config(LogConfig::testing())
        .init();
}
