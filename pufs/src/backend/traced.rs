//! Tracing middleware for backing adapters.
//!
//! [`TracedFs`] wraps any [`BackingFs`] and, for every call, logs the call
//! with its arguments, sleeps for a fixed delay, forwards to the wrapped
//! adapter and logs the returned value. The delay makes the parallelism of
//! the union engine visible in the log: overlapping "called" lines from
//! different roots show sub-calls running side by side.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::Path;
use std::thread;
use std::time::{Duration, SystemTime};

use tracing::info;

use super::traits::BackingFs;
use super::types::{DirEntry, Stat, StatFs};

/// Default artificial delay applied before each forwarded call.
pub const DEFAULT_TRACE_DELAY: Duration = Duration::from_millis(1000);

/// Decorator that logs and delays every call to the wrapped adapter.
pub struct TracedFs<B> {
    inner: B,
    delay: Duration,
}

impl<B: BackingFs> TracedFs<B> {
    /// Wrap `inner`, delaying every call by `delay`.
    pub fn new(inner: B, delay: Duration) -> Self {
        Self { inner, delay }
    }

    /// The wrapped adapter.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    fn traced<T: fmt::Debug>(
        &self,
        op: &str,
        args: fmt::Arguments<'_>,
        call: impl FnOnce(&B) -> io::Result<T>,
    ) -> io::Result<T> {
        self.traced_with(op, args, call, |value| format!("{:?}", value))
    }

    /// Byte payloads are logged by length only.
    fn traced_bytes(
        &self,
        op: &str,
        args: fmt::Arguments<'_>,
        call: impl FnOnce(&B) -> io::Result<Vec<u8>>,
    ) -> io::Result<Vec<u8>> {
        self.traced_with(op, args, call, |bytes| format!("<{} bytes>", bytes.len()))
    }

    fn traced_with<T>(
        &self,
        op: &str,
        args: fmt::Arguments<'_>,
        call: impl FnOnce(&B) -> io::Result<T>,
        show: impl FnOnce(&T) -> String,
    ) -> io::Result<T> {
        let root = self.inner.root().display();
        info!(root = %root, "{}({}) called", op, args);
        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let result = call(&self.inner);
        match &result {
            Ok(value) => info!(root = %root, "{} returned {}", op, show(value)),
            Err(e) => info!(root = %root, "{} returned error: {}", op, e),
        }
        result
    }
}

impl<B: BackingFs> BackingFs for TracedFs<B> {
    fn root(&self) -> &Path {
        self.inner.root()
    }

    // The gate's probe is not traced.
    fn exists(&self, path: &Path) -> bool {
        self.inner.exists(path)
    }

    fn init(&self) -> io::Result<()> {
        self.traced("init", format_args!(""), |b| b.init())
    }

    fn destroy(&self) -> io::Result<()> {
        self.traced("destroy", format_args!(""), |b| b.destroy())
    }

    fn getattr(&self, path: &Path) -> io::Result<Stat> {
        self.traced("getattr", format_args!("{:?}", path), |b| b.getattr(path))
    }

    fn fgetattr(&self, fh: u64) -> io::Result<Stat> {
        self.traced("fgetattr", format_args!("fh={}", fh), |b| b.fgetattr(fh))
    }

    fn access(&self, path: &Path, mask: u32) -> io::Result<bool> {
        self.traced("access", format_args!("{:?}, {:#o}", path, mask), |b| {
            b.access(path, mask)
        })
    }

    fn readlink(&self, path: &Path) -> io::Result<OsString> {
        self.traced("readlink", format_args!("{:?}", path), |b| b.readlink(path))
    }

    fn open(&self, path: &Path, flags: u32) -> io::Result<u64> {
        self.traced("open", format_args!("{:?}, {:#x}", path, flags), |b| {
            b.open(path, flags)
        })
    }

    fn read(&self, fh: u64, offset: u64, size: u32) -> io::Result<Vec<u8>> {
        self.traced_bytes(
            "read",
            format_args!("fh={}, offset={}, size={}", fh, offset, size),
            |b| b.read(fh, offset, size),
        )
    }

    fn write(&self, fh: u64, offset: u64, data: &[u8]) -> io::Result<u32> {
        self.traced(
            "write",
            format_args!("fh={}, offset={}, <{} bytes>", fh, offset, data.len()),
            |b| b.write(fh, offset, data),
        )
    }

    fn flush(&self, fh: u64) -> io::Result<()> {
        self.traced("flush", format_args!("fh={}", fh), |b| b.flush(fh))
    }

    fn fsync(&self, fh: u64, datasync: bool) -> io::Result<()> {
        self.traced(
            "fsync",
            format_args!("fh={}, datasync={}", fh, datasync),
            |b| b.fsync(fh, datasync),
        )
    }

    fn release(&self, fh: u64) -> io::Result<()> {
        self.traced("release", format_args!("fh={}", fh), |b| b.release(fh))
    }

    fn opendir(&self, path: &Path) -> io::Result<u64> {
        self.traced("opendir", format_args!("{:?}", path), |b| b.opendir(path))
    }

    fn readdir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        self.traced_with(
            "readdir",
            format_args!("{:?}", path),
            |b| b.readdir(path),
            |entries| {
                let names: Vec<_> = entries.iter().map(|e| e.name.to_string_lossy()).collect();
                format!("{:?}", names)
            },
        )
    }

    fn releasedir(&self, fh: u64) -> io::Result<()> {
        self.traced("releasedir", format_args!("fh={}", fh), |b| b.releasedir(fh))
    }

    fn fsyncdir(&self, fh: u64, datasync: bool) -> io::Result<()> {
        self.traced(
            "fsyncdir",
            format_args!("fh={}, datasync={}", fh, datasync),
            |b| b.fsyncdir(fh, datasync),
        )
    }

    fn statfs(&self, path: &Path) -> io::Result<StatFs> {
        self.traced("statfs", format_args!("{:?}", path), |b| b.statfs(path))
    }

    fn getxattr(&self, path: &Path, name: &OsStr) -> io::Result<Vec<u8>> {
        self.traced_bytes("getxattr", format_args!("{:?}, {:?}", path, name), |b| {
            b.getxattr(path, name)
        })
    }

    fn listxattr(&self, path: &Path) -> io::Result<Vec<u8>> {
        self.traced_bytes("listxattr", format_args!("{:?}", path), |b| {
            b.listxattr(path)
        })
    }

    fn create(&self, path: &Path, mode: u32, flags: u32) -> io::Result<u64> {
        self.traced(
            "create",
            format_args!("{:?}, {:#o}, {:#x}", path, mode, flags),
            |b| b.create(path, mode, flags),
        )
    }

    fn mkdir(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.traced("mkdir", format_args!("{:?}, {:#o}", path, mode), |b| {
            b.mkdir(path, mode)
        })
    }

    fn mknod(&self, path: &Path, mode: u32, rdev: u32) -> io::Result<()> {
        self.traced(
            "mknod",
            format_args!("{:?}, {:#o}, {}", path, mode, rdev),
            |b| b.mknod(path, mode, rdev),
        )
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        self.traced("unlink", format_args!("{:?}", path), |b| b.unlink(path))
    }

    fn rmdir(&self, path: &Path) -> io::Result<()> {
        self.traced("rmdir", format_args!("{:?}", path), |b| b.rmdir(path))
    }

    fn symlink(&self, target: &OsStr, link: &Path) -> io::Result<()> {
        self.traced("symlink", format_args!("{:?}, {:?}", target, link), |b| {
            b.symlink(target, link)
        })
    }

    fn link(&self, target: &Path, link: &Path) -> io::Result<()> {
        self.traced("link", format_args!("{:?}, {:?}", target, link), |b| {
            b.link(target, link)
        })
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.traced("rename", format_args!("{:?}, {:?}", from, to), |b| {
            b.rename(from, to)
        })
    }

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        self.traced("chmod", format_args!("{:?}, {:#o}", path, mode), |b| {
            b.chmod(path, mode)
        })
    }

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> io::Result<()> {
        self.traced(
            "chown",
            format_args!("{:?}, {:?}, {:?}", path, uid, gid),
            |b| b.chown(path, uid, gid),
        )
    }

    fn truncate(&self, path: &Path, size: u64) -> io::Result<()> {
        self.traced("truncate", format_args!("{:?}, {}", path, size), |b| {
            b.truncate(path, size)
        })
    }

    fn utimens(
        &self,
        path: &Path,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> io::Result<()> {
        self.traced(
            "utimens",
            format_args!("{:?}, {:?}, {:?}", path, atime, mtime),
            |b| b.utimens(path, atime, mtime),
        )
    }

    fn setxattr(&self, path: &Path, name: &OsStr, value: &[u8], flags: i32) -> io::Result<()> {
        self.traced(
            "setxattr",
            format_args!("{:?}, {:?}, <{} bytes>, {}", path, name, value.len(), flags),
            |b| b.setxattr(path, name, value, flags),
        )
    }

    fn removexattr(&self, path: &Path, name: &OsStr) -> io::Result<()> {
        self.traced("removexattr", format_args!("{:?}, {:?}", path, name), |b| {
            b.removexattr(path, name)
        })
    }
}
