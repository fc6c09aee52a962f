//! User configuration for PUFS.
//!
//! Settings are read from `~/.pufs/config.ini` (or a path given on the
//! command line) and overlaid on built-in defaults. Command-line flags
//! override file values in the CLI.
//!
//! # Example
//!
//! ```
//! use pufs::config::ConfigFile;
//!
//! let config = ConfigFile::default();
//! assert_eq!(config.mount.threads_per_root, 10);
//! assert!(config.mount.read_only);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod writer;

pub use defaults::{default_log_path, DEFAULT_LOG_DIR, DEFAULT_LOG_FILE, DEFAULT_TRACE_DELAY_MS};
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{ConfigFile, LoggingSettings, MountSettings, TraceSettings};
