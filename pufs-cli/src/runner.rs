//! CLI runner for common setup and operations.
//!
//! Encapsulates config loading, logging initialization and runtime creation
//! to reduce duplication across command handlers.

use std::path::Path;

use pufs::config::{config_file_path, ConfigFile};
use pufs::logging::{init_logging, LoggingGuard, LoggingOptions};
use tracing::info;

use crate::commands::common::CommonArgs;
use crate::error::CliError;

/// Runner that manages CLI lifecycle and common operations.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    _logging_guard: LoggingGuard,
    /// Configuration after command-line overrides
    config: ConfigFile,
}

impl CliRunner {
    /// Load config, apply command-line overrides and initialize logging.
    pub fn new(common: &CommonArgs) -> Result<Self, CliError> {
        let mut config = load_config(common.config.as_deref())?;
        common.apply(&mut config)?;

        let mut logging = LoggingOptions::for_path(&config.logging.file);
        logging.debug = common.debug;

        let logging_guard =
            init_logging(&logging).map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            _logging_guard: logging_guard,
            config,
        })
    }

    /// Get the effective configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("PUFS v{}", pufs::VERSION);
        info!(
            threads_per_root = self.config.mount.threads_per_root,
            trace = self.config.trace.enabled,
            "PUFS CLI: {} command",
            command
        );
    }

    /// Build the multi-threaded runtime the filesystem is served on.
    pub fn runtime(&self) -> Result<tokio::runtime::Runtime, CliError> {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .map_err(CliError::Runtime)
    }
}

/// Load the config file from `path`, or from ~/.pufs/config.ini.
pub fn load_config(path: Option<&Path>) -> Result<ConfigFile, CliError> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(config_file_path);
    Ok(ConfigFile::load_from(&path)?)
}
