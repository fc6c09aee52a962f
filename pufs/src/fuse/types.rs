//! Errors and mount handles for the fuse3 filesystems.

use fuse3::raw::MountHandle as Fuse3MountHandle;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::process::Command;
use std::task::{Context, Poll};
use thiserror::Error;
use tracing::{debug, warn};

/// Result type for fuse3 mount plumbing.
pub type Fuse3Result<T> = Result<T, Fuse3Error>;

/// Errors that can occur while mounting or unmounting.
#[derive(Debug, Error)]
pub enum Fuse3Error {
    /// I/O error during filesystem operations
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Mount operation failed
    #[error("Mount failed: {0}")]
    MountFailed(String),

    /// Invalid path
    #[error("Invalid path: {0}")]
    InvalidPath(String),
}

/// Handle to a mounted filesystem.
///
/// The handle resolves when the filesystem is unmounted externally
/// (`fusermount -u`). Dropping it unmounts the filesystem.
pub struct MountHandle {
    inner: Fuse3MountHandle,
    mountpoint: PathBuf,
}

impl MountHandle {
    pub(crate) fn new(inner: Fuse3MountHandle, mountpoint: PathBuf) -> Self {
        Self { inner, mountpoint }
    }

    /// Where the filesystem is mounted.
    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }

    /// Unmount the filesystem.
    pub async fn unmount(self) -> io::Result<()> {
        debug!(mountpoint = %self.mountpoint.display(), "Unmounting");
        self.inner.unmount().await
    }
}

/// Resolves when the filesystem is unmounted.
impl Future for MountHandle {
    type Output = io::Result<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.inner).poll(cx)
    }
}

/// Check whether `path` appears as a mountpoint in `/proc/mounts`.
pub fn is_mounted(path: &Path) -> bool {
    let Ok(mounts) = std::fs::read_to_string("/proc/mounts") else {
        return false;
    };
    let path_str = path.to_string_lossy();
    mounts.lines().any(|line| {
        let parts: Vec<&str> = line.split_whitespace().collect();
        parts.len() >= 2 && parts[1] == path_str
    })
}

/// Unmount `path` with `fusermount3`, falling back to `fusermount`.
///
/// Used to clean up a stale mount left behind by a crashed session.
pub fn force_unmount(path: &Path) {
    if !is_mounted(path) {
        debug!(mountpoint = %path.display(), "Not mounted, skipping fusermount");
        return;
    }

    let mountpoint = path.to_string_lossy();
    let result = Command::new("fusermount3")
        .args(["-u", &mountpoint])
        .output()
        .or_else(|_| Command::new("fusermount").args(["-u", &mountpoint]).output());

    match result {
        Ok(output) if !output.status.success() => {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(mountpoint = %mountpoint, stderr = %stderr, "fusermount -u failed");
        }
        Ok(_) => debug!(mountpoint = %mountpoint, "Unmounted via fusermount"),
        Err(e) => warn!(mountpoint = %mountpoint, error = %e, "Failed to run fusermount"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fuse3_error_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err: Fuse3Error = io_err.into();
        assert!(err.to_string().contains("I/O error"));
    }

    #[test]
    fn test_fuse3_error_mount_failed() {
        let err = Fuse3Error::MountFailed("permission denied".to_string());
        assert!(err.to_string().contains("Mount failed"));
        assert!(err.to_string().contains("permission denied"));
    }

    #[test]
    fn test_temp_dir_is_not_mounted() {
        let temp = tempfile::tempdir().unwrap();
        assert!(!is_mounted(temp.path()));
        // No-op on a path that is not a mountpoint.
        force_unmount(temp.path());
    }
}
