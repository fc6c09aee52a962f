//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;

use pufs::config::ConfigFileError;
use pufs::fuse::Fuse3Error;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Invalid setting from flags or config
    Config(String),
    /// Config file could not be read or written
    ConfigFile(ConfigFileError),
    /// A root or mountpoint is unusable
    InvalidPath { path: PathBuf, reason: String },
    /// Failed to start the async runtime or wait for a signal
    Runtime(std::io::Error),
    /// FUSE mount error
    Mount(Fuse3Error),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Mount(_) = self {
            eprintln!();
            eprintln!("Common issues:");
            eprintln!("  1. FUSE not installed: sudo apt install fuse3 (Linux)");
            eprintln!("  2. allow_other needs user_allow_other in /etc/fuse.conf");
            eprintln!("  3. Mountpoint in use: Try unmounting with: fusermount3 -u <mountpoint>");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::ConfigFile(e) => write!(f, "Configuration error: {}", e),
            CliError::InvalidPath { path, reason } => {
                write!(f, "Invalid path '{}': {}", path.display(), reason)
            }
            CliError::Runtime(e) => write!(f, "Runtime error: {}", e),
            CliError::Mount(e) => write!(f, "FUSE mount error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::ConfigFile(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::Mount(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::ConfigFile(e)
    }
}

impl From<Fuse3Error> for CliError {
    fn from(e: Fuse3Error) -> Self {
        CliError::Mount(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_invalid_path_message() {
        let err = CliError::InvalidPath {
            path: PathBuf::from("/nope"),
            reason: "does not exist".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid path '/nope': does not exist");
        assert!(err.source().is_none());
    }

    #[test]
    fn test_mount_error_has_source() {
        let err: CliError = Fuse3Error::MountFailed("busy".to_string()).into();
        assert!(err.to_string().contains("busy"));
        assert!(err.source().is_some());
    }
}
