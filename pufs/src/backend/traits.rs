//! The backing adapter capability interface.

use std::ffi::{OsStr, OsString};
use std::io;
use std::path::Path;
use std::time::SystemTime;

use super::types::{DirEntry, Stat, StatFs};

/// Capability interface for a filesystem scoped to one root.
///
/// All paths are mount-relative (they start with `/`). Every method is
/// synchronous and may block on host I/O; callers run them on a worker
/// pool. Errors carry the host errno in [`io::Error::raw_os_error`].
///
/// File handles returned by [`open`](Self::open) and
/// [`create`](Self::create) are private to the adapter that issued them.
pub trait BackingFs: Send + Sync {
    /// Root directory this adapter is scoped to.
    fn root(&self) -> &Path;

    /// Whether an entry exists at `path` (dangling symlinks exist).
    fn exists(&self, path: &Path) -> bool;

    /// Filesystem initialization hook.
    fn init(&self) -> io::Result<()> {
        Ok(())
    }

    /// Filesystem teardown hook.
    fn destroy(&self) -> io::Result<()> {
        Ok(())
    }

    fn getattr(&self, path: &Path) -> io::Result<Stat>;

    /// Attributes of a file opened through this adapter.
    ///
    /// Adapters that keep no per-handle state answer `EBADF`.
    fn fgetattr(&self, _fh: u64) -> io::Result<Stat> {
        Err(io::Error::from_raw_os_error(libc::EBADF))
    }

    /// Check `mask` (`R_OK`, `W_OK`, `X_OK`, `F_OK`) against `path`.
    ///
    /// Returns `Ok(false)` when the host denies the access.
    fn access(&self, path: &Path, mask: u32) -> io::Result<bool>;

    fn readlink(&self, path: &Path) -> io::Result<OsString>;

    fn open(&self, path: &Path, flags: u32) -> io::Result<u64>;

    fn read(&self, fh: u64, offset: u64, size: u32) -> io::Result<Vec<u8>>;

    fn write(&self, fh: u64, offset: u64, data: &[u8]) -> io::Result<u32>;

    fn flush(&self, fh: u64) -> io::Result<()>;

    fn fsync(&self, fh: u64, datasync: bool) -> io::Result<()>;

    fn release(&self, fh: u64) -> io::Result<()>;

    fn opendir(&self, path: &Path) -> io::Result<u64>;

    /// List a directory. The listing starts with `.` and `..`.
    fn readdir(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    fn releasedir(&self, _fh: u64) -> io::Result<()> {
        Ok(())
    }

    fn fsyncdir(&self, _fh: u64, _datasync: bool) -> io::Result<()> {
        Ok(())
    }

    fn statfs(&self, path: &Path) -> io::Result<StatFs>;

    fn getxattr(&self, path: &Path, name: &OsStr) -> io::Result<Vec<u8>>;

    /// Attribute names, NUL-separated.
    fn listxattr(&self, path: &Path) -> io::Result<Vec<u8>>;

    fn create(&self, path: &Path, mode: u32, flags: u32) -> io::Result<u64>;

    fn mkdir(&self, path: &Path, mode: u32) -> io::Result<()>;

    fn mknod(&self, path: &Path, mode: u32, rdev: u32) -> io::Result<()>;

    fn unlink(&self, path: &Path) -> io::Result<()>;

    fn rmdir(&self, path: &Path) -> io::Result<()>;

    fn symlink(&self, target: &OsStr, link: &Path) -> io::Result<()>;

    fn link(&self, target: &Path, link: &Path) -> io::Result<()>;

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()>;

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> io::Result<()>;

    fn truncate(&self, path: &Path, size: u64) -> io::Result<()>;

    fn utimens(
        &self,
        path: &Path,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> io::Result<()>;

    fn setxattr(&self, path: &Path, name: &OsStr, value: &[u8], flags: i32) -> io::Result<()>;

    fn removexattr(&self, path: &Path, name: &OsStr) -> io::Result<()>;
}
