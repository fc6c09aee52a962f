//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file.
//! These are pure data types with no parsing or serialization logic.

use std::path::PathBuf;

/// Complete configuration loaded from config.ini.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigFile {
    /// Mount settings
    pub mount: MountSettings,
    /// Logging settings
    pub logging: LoggingSettings,
    /// Tracing middleware settings
    pub trace: TraceSettings,
}

/// Mount configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountSettings {
    /// Concurrent sub-calls allowed per backing root.
    /// Default: 10
    pub threads_per_root: usize,
    /// Mount the union read-only.
    /// Default: true
    pub read_only: bool,
    /// Allow other users to access the mount.
    /// Default: false
    pub allow_other: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

/// Tracing middleware configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceSettings {
    /// Log every backing call with its arguments and result.
    /// Default: false
    pub enabled: bool,
    /// Artificial delay before each traced call, in milliseconds.
    /// Default: 1000
    pub delay_ms: u64,
}
