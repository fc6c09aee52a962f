//! Logging infrastructure for PUFS.
//!
//! Provides structured logging with file output and optional console output:
//! - Writes to `~/.pufs/logs/pufs.log` (cleared on session start)
//! - Also prints to stdout when running in the foreground
//! - Configurable via RUST_LOG environment variable

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::{config_directory, DEFAULT_LOG_DIR, DEFAULT_LOG_FILE};

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Logging options chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    /// Directory holding the log file
    pub log_dir: PathBuf,
    /// Log filename
    pub log_file: String,
    /// Mirror log lines to stdout
    pub stdout: bool,
    /// Default to DEBUG level instead of INFO when RUST_LOG is unset
    pub debug: bool,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_file: default_log_file().to_string(),
            stdout: true,
            debug: false,
        }
    }
}

impl LoggingOptions {
    /// Options writing to the given log file path.
    pub fn for_path(path: &Path) -> Self {
        let mut options = Self::default();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            options.log_dir = parent.to_path_buf();
        }
        if let Some(name) = path.file_name() {
            options.log_file = name.to_string_lossy().into_owned();
        }
        options
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir.join(&self.log_file)
    }

    fn default_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }
}

/// Initialize logging system.
///
/// Creates the log directory if needed, clears the previous log file,
/// and sets up output to the file and, optionally, stdout.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created, the log file
/// cannot be cleared, or a global subscriber is already installed.
pub fn init_logging(options: &LoggingOptions) -> Result<LoggingGuard, io::Error> {
    let (non_blocking_file, file_guard) = prepare_log_file(options)?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_span_events(FmtSpan::CLOSE);

    let stdout_layer = options.stdout.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(io::stdout)
            .with_ansi(true)
            .with_span_events(FmtSpan::CLOSE)
    });

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(options.default_filter()));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| io::Error::other(e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

fn prepare_log_file(
    options: &LoggingOptions,
) -> Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard), io::Error> {
    fs::create_dir_all(&options.log_dir)?;
    fs::write(options.log_path(), "")?;

    let file_appender = tracing_appender::rolling::never(&options.log_dir, &options.log_file);
    Ok(tracing_appender::non_blocking(file_appender))
}

/// Get default log directory path (~/.pufs/logs).
pub fn default_log_dir() -> PathBuf {
    config_directory().join(DEFAULT_LOG_DIR)
}

/// Get default log file name.
pub fn default_log_file() -> &'static str {
    DEFAULT_LOG_FILE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_paths() {
        assert!(default_log_dir().ends_with(".pufs/logs"));
        assert_eq!(default_log_file(), "pufs.log");
        assert_eq!(
            LoggingOptions::default().log_path(),
            default_log_dir().join("pufs.log")
        );
    }

    #[test]
    fn test_options_for_path() {
        let options = LoggingOptions::for_path(Path::new("/var/log/pufs/mount.log"));
        assert_eq!(options.log_dir, PathBuf::from("/var/log/pufs"));
        assert_eq!(options.log_file, "mount.log");
        assert_eq!(options.log_path(), PathBuf::from("/var/log/pufs/mount.log"));
    }

    #[test]
    fn test_default_filter_follows_debug_flag() {
        let mut options = LoggingOptions::default();
        assert_eq!(options.default_filter(), "info");
        options.debug = true;
        assert_eq!(options.default_filter(), "debug");
    }

    #[test]
    fn test_prepare_creates_and_clears_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let options = LoggingOptions {
            log_dir: temp_dir.path().join("deep").join("logs"),
            log_file: "test.log".to_string(),
            stdout: false,
            debug: false,
        };
        fs::create_dir_all(&options.log_dir).unwrap();
        fs::write(options.log_path(), "old log data").unwrap();

        let (_writer, _guard) = prepare_log_file(&options).unwrap();

        assert_eq!(fs::read_to_string(options.log_path()).unwrap(), "");
    }

    #[test]
    fn test_prepare_fails_when_dir_is_a_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let blocker = temp_dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let options = LoggingOptions {
            log_dir: blocker.join("logs"),
            ..LoggingOptions::default()
        };
        assert!(prepare_log_file(&options).is_err());
    }
}
