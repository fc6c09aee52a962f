//! Default values and constants for all configuration settings.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::dispatch::DEFAULT_THREADS_PER_ROOT;

/// Default log directory name under the config directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "pufs.log";

/// Default artificial delay of the tracing middleware.
pub const DEFAULT_TRACE_DELAY_MS: u64 = 1000;

/// Default log file path (~/.pufs/logs/pufs.log).
pub fn default_log_path() -> PathBuf {
    config_directory().join(DEFAULT_LOG_DIR).join(DEFAULT_LOG_FILE)
}

impl Default for MountSettings {
    fn default() -> Self {
        Self {
            threads_per_root: DEFAULT_THREADS_PER_ROOT,
            read_only: true,
            allow_other: false,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: default_log_path(),
        }
    }
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            delay_ms: DEFAULT_TRACE_DELAY_MS,
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            mount: MountSettings::default(),
            logging: LoggingSettings::default(),
            trace: TraceSettings::default(),
        }
    }
}
