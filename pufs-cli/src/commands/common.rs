//! Common types and utilities shared across CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use pufs::backend::{BackingFs, HostFs, TracedFs};
use pufs::config::{ConfigFile, TraceSettings};
use pufs::fuse::{MountConfig, MountHandle};
use tracing::info;

use crate::error::CliError;

/// Flags accepted by every mounting command.
#[derive(Debug, Clone, Default, Args)]
pub struct CommonArgs {
    /// Config file to use instead of ~/.pufs/config.ini
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(long)]
    pub debug: bool,

    /// Log and delay every backing call
    #[arg(long)]
    pub trace: bool,

    /// Delay before each traced call, in milliseconds
    #[arg(long, value_name = "MS")]
    pub trace_delay_ms: Option<u64>,

    /// Concurrent backing calls allowed per root
    #[arg(long, value_name = "N")]
    pub threads_per_root: Option<usize>,

    /// Allow other users to access the mount
    #[arg(long)]
    pub allow_other: bool,
}

impl CommonArgs {
    /// Overlay command-line flags on the loaded config.
    pub fn apply(&self, config: &mut ConfigFile) -> Result<(), CliError> {
        if let Some(threads) = self.threads_per_root {
            if threads == 0 {
                return Err(CliError::Config(
                    "--threads-per-root must be at least 1".to_string(),
                ));
            }
            config.mount.threads_per_root = threads;
        }
        if self.trace {
            config.trace.enabled = true;
        }
        if let Some(delay) = self.trace_delay_ms {
            config.trace.delay_ms = delay;
        }
        if self.allow_other {
            config.mount.allow_other = true;
        }
        Ok(())
    }
}

/// Check that `path` exists and is a directory.
pub fn require_directory(path: &Path) -> Result<PathBuf, CliError> {
    let invalid = |reason: &str| CliError::InvalidPath {
        path: path.to_path_buf(),
        reason: reason.to_string(),
    };
    let metadata = std::fs::metadata(path).map_err(|_| invalid("does not exist"))?;
    if !metadata.is_dir() {
        return Err(invalid("not a directory"));
    }
    std::fs::canonicalize(path).map_err(|e| invalid(&e.to_string()))
}

/// Host adapter for `root`, wrapped in the tracing middleware when enabled.
pub fn backing_for(root: &Path, trace: &TraceSettings) -> Arc<dyn BackingFs> {
    let host = HostFs::new(root);
    if trace.enabled {
        Arc::new(TracedFs::new(host, Duration::from_millis(trace.delay_ms)))
    } else {
        Arc::new(host)
    }
}

/// Kernel mount options from the effective config.
pub fn mount_config(config: &ConfigFile, read_only: bool) -> MountConfig {
    MountConfig {
        read_only,
        allow_other: config.mount.allow_other,
    }
}

/// Serve until the filesystem is unmounted externally or Ctrl+C arrives.
pub async fn serve_until_unmounted(mut handle: MountHandle) -> Result<(), CliError> {
    let unmounted = tokio::select! {
        result = &mut handle => Some(result),
        signal = tokio::signal::ctrl_c() => {
            signal.map_err(CliError::Runtime)?;
            None
        }
    };

    match unmounted {
        Some(result) => {
            info!("Filesystem unmounted externally");
            result.map_err(CliError::Runtime)
        }
        None => {
            info!("Interrupt received, unmounting");
            handle.unmount().await.map_err(CliError::Runtime)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_apply_overrides() {
        let args = CommonArgs {
            trace: true,
            trace_delay_ms: Some(0),
            threads_per_root: Some(3),
            allow_other: true,
            ..CommonArgs::default()
        };
        let mut config = ConfigFile::default();
        args.apply(&mut config).unwrap();

        assert_eq!(config.mount.threads_per_root, 3);
        assert!(config.mount.allow_other);
        assert!(config.trace.enabled);
        assert_eq!(config.trace.delay_ms, 0);
    }

    #[test]
    fn test_apply_without_flags_keeps_config() {
        let mut config = ConfigFile::default();
        config.trace.enabled = true;
        CommonArgs::default().apply(&mut config).unwrap();
        assert!(config.trace.enabled);
        assert_eq!(config.mount.threads_per_root, 10);
    }

    #[test]
    fn test_zero_threads_rejected() {
        let args = CommonArgs {
            threads_per_root: Some(0),
            ..CommonArgs::default()
        };
        assert!(matches!(
            args.apply(&mut ConfigFile::default()),
            Err(CliError::Config(_))
        ));
    }

    #[test]
    fn test_require_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let file = temp.path().join("file");
        std::fs::write(&file, "x").unwrap();

        assert!(require_directory(temp.path()).is_ok());
        assert!(matches!(
            require_directory(&file),
            Err(CliError::InvalidPath { .. })
        ));
        assert!(require_directory(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_backing_for_uses_root() {
        let temp = tempfile::TempDir::new().unwrap();
        let trace = TraceSettings {
            enabled: true,
            delay_ms: 0,
        };
        let backing = backing_for(temp.path(), &trace);
        assert_eq!(backing.root(), temp.path());
    }
}
