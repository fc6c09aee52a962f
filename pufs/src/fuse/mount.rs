//! Mounting a path filesystem.

use std::path::Path;

use fuse3::path::{PathFilesystem, Session};
use fuse3::MountOptions;
use tracing::info;

use super::types::{Fuse3Error, Fuse3Result, MountHandle};

/// Filesystem name reported in `/proc/mounts`.
pub const FS_NAME: &str = "pufs";

/// Kernel-facing mount settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountConfig {
    /// Mount read-only
    pub read_only: bool,
    /// Let other users access the mount (needs `user_allow_other`)
    pub allow_other: bool,
}

impl Default for MountConfig {
    fn default() -> Self {
        Self {
            read_only: true,
            allow_other: false,
        }
    }
}

impl MountConfig {
    pub fn mount_options(&self) -> MountOptions {
        let mut mount_options = MountOptions::default();
        mount_options
            .fs_name(FS_NAME)
            .read_only(self.read_only)
            .allow_other(self.allow_other)
            .force_readdir_plus(false);
        mount_options
    }
}

/// Mount `fs` at `mountpoint`.
pub(crate) async fn mount_filesystem<FS>(
    fs: FS,
    mountpoint: &Path,
    config: &MountConfig,
) -> Fuse3Result<MountHandle>
where
    FS: PathFilesystem + Send + Sync + 'static,
{
    if !mountpoint.is_dir() {
        return Err(Fuse3Error::InvalidPath(mountpoint.display().to_string()));
    }

    let mount_options = config.mount_options();

    // Use unprivileged mount on Linux
    #[cfg(target_os = "linux")]
    let handle = Session::new(mount_options)
        .mount_with_unprivileged(fs, mountpoint)
        .await
        .map_err(|e| Fuse3Error::MountFailed(e.to_string()))?;

    #[cfg(not(target_os = "linux"))]
    let handle = Session::new(mount_options)
        .mount(fs, mountpoint)
        .await
        .map_err(|e| Fuse3Error::MountFailed(e.to_string()))?;

    info!(
        mountpoint = %mountpoint.display(),
        read_only = config.read_only,
        "Filesystem mounted"
    );
    Ok(MountHandle::new(handle, mountpoint.to_path_buf()))
}
