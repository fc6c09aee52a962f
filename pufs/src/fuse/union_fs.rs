//! Parallel union FUSE filesystem.
//!
//! Presents N backing roots as one read-only tree. Every kernel request is
//! forwarded to [`UnionOps`], which fans it out across the roots and reduces
//! the per-root outcomes.
//!
//! # Architecture
//!
//! ```text
//! /srv/a ─┐
//! /srv/b ─┼── Mount (roots + DispatchPool) ── UnionOps ── Fuse3UnionFS
//! /srv/c ─┘                                                   │
//!                                                             ▼
//!                                                     FUSE Mount Point
//! ```
//!
//! Mutating requests (create, write, rename, setattr, ...) are answered with
//! `ENOTSUP` and never reach a backing root.

use std::ffi::OsStr;
use std::os::unix::ffi::OsStringExt;
use std::path::Path;
use std::sync::Arc;

use bytes::Bytes;
use fuse3::path::prelude::*;
use fuse3::path::reply::{DirectoryEntryPlus, ReplyXAttr};
use fuse3::{Errno, SetAttr};
use tracing::{debug, trace, warn};

use super::mount::{mount_filesystem, MountConfig};
use super::shared::{
    child_path, directory_entries, file_attr, statfs_reply, to_path, xattr_reply, DirEntries,
    MAX_WRITE, TTL,
};
use super::types::{Fuse3Result, MountHandle};
use crate::ops::{Operation, UnionOps};

/// Union FUSE filesystem over a set of backing roots.
pub struct Fuse3UnionFS {
    ops: Arc<UnionOps>,
}

impl Fuse3UnionFS {
    /// Create a filesystem serving `ops`.
    ///
    /// The caller may keep its own clone of `ops` to drain the worker pool
    /// after the filesystem is unmounted.
    pub fn new(ops: Arc<UnionOps>) -> Self {
        debug!(
            roots = ops.mount().root_count(),
            capacity = ops.mount().pool().capacity(),
            "Union FUSE filesystem initialized"
        );
        Self { ops }
    }

    pub fn ops(&self) -> &Arc<UnionOps> {
        &self.ops
    }

    /// Mount the filesystem at the given path.
    ///
    /// The returned [`MountHandle`] must be awaited (or kept alive) to keep
    /// the filesystem running.
    pub async fn mount(self, mountpoint: &Path, config: &MountConfig) -> Fuse3Result<MountHandle> {
        mount_filesystem(self, mountpoint, config).await
    }

    fn reject<T>(&self, op: Operation) -> Result<T, Errno> {
        self.ops.reject(op).map_err(Errno::from)
    }
}

/// Operation a `setattr` request stands for.
fn setattr_operation(size: Option<u64>, mode: Option<u32>, owner_changed: bool) -> Operation {
    if size.is_some() {
        Operation::Truncate
    } else if mode.is_some() {
        Operation::Chmod
    } else if owner_changed {
        Operation::Chown
    } else {
        Operation::Utimens
    }
}

impl PathFilesystem for Fuse3UnionFS {
    type DirEntryStream<'a>
        = DirEntries
    where
        Self: 'a;
    type DirEntryPlusStream<'a>
        = futures::stream::Iter<std::vec::IntoIter<fuse3::Result<DirectoryEntryPlus>>>
    where
        Self: 'a;

    async fn init(&self, _req: Request) -> Result<ReplyInit, Errno> {
        self.ops.init().await?;
        Ok(ReplyInit {
            max_write: MAX_WRITE,
        })
    }

    async fn destroy(&self, _req: Request) {
        if let Err(e) = self.ops.destroy().await {
            warn!(error = %e, "Union destroy failed");
        }
    }

    async fn lookup(&self, _req: Request, parent: &OsStr, name: &OsStr) -> Result<ReplyEntry, Errno> {
        let path = child_path(parent, name);
        trace!(path = %path.display(), "fuse3: lookup");
        let stat = self.ops.getattr(&path).await?;
        Ok(ReplyEntry {
            ttl: TTL,
            attr: file_attr(&stat),
        })
    }

    async fn getattr(
        &self,
        _req: Request,
        path: Option<&OsStr>,
        fh: Option<u64>,
        _flags: u32,
    ) -> Result<ReplyAttr, Errno> {
        let stat = match (path, fh) {
            (Some(path), _) => self.ops.getattr(to_path(path)).await?,
            (None, Some(fh)) => self.ops.getattr_handle(fh).await?,
            (None, None) => return Err(Errno::new_not_exist()),
        };
        Ok(ReplyAttr {
            ttl: TTL,
            attr: file_attr(&stat),
        })
    }

    async fn setattr(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        _fh: Option<u64>,
        set_attr: SetAttr,
    ) -> Result<ReplyAttr, Errno> {
        let owner_changed = set_attr.uid.is_some() || set_attr.gid.is_some();
        self.reject(setattr_operation(
            set_attr.size,
            set_attr.mode,
            owner_changed,
        ))
    }

    async fn readlink(&self, _req: Request, path: &OsStr) -> Result<ReplyData, Errno> {
        let target = self.ops.readlink(to_path(path)).await?;
        Ok(Bytes::from(target.into_vec()).into())
    }

    async fn symlink(
        &self,
        _req: Request,
        _parent: &OsStr,
        _name: &OsStr,
        _link_path: &OsStr,
    ) -> Result<ReplyEntry, Errno> {
        self.reject(Operation::Symlink)
    }

    async fn mknod(
        &self,
        _req: Request,
        _parent: &OsStr,
        _name: &OsStr,
        _mode: u32,
        _rdev: u32,
    ) -> Result<ReplyEntry, Errno> {
        self.reject(Operation::Mknod)
    }

    async fn mkdir(
        &self,
        _req: Request,
        _parent: &OsStr,
        _name: &OsStr,
        _mode: u32,
        _umask: u32,
    ) -> Result<ReplyEntry, Errno> {
        self.reject(Operation::Mkdir)
    }

    async fn unlink(&self, _req: Request, _parent: &OsStr, _name: &OsStr) -> Result<(), Errno> {
        self.reject(Operation::Unlink)
    }

    async fn rmdir(&self, _req: Request, _parent: &OsStr, _name: &OsStr) -> Result<(), Errno> {
        self.reject(Operation::Rmdir)
    }

    async fn rename(
        &self,
        _req: Request,
        _origin_parent: &OsStr,
        _origin_name: &OsStr,
        _parent: &OsStr,
        _name: &OsStr,
    ) -> Result<(), Errno> {
        self.reject(Operation::Rename)
    }

    async fn link(
        &self,
        _req: Request,
        _path: &OsStr,
        _new_parent: &OsStr,
        _new_name: &OsStr,
    ) -> Result<ReplyEntry, Errno> {
        self.reject(Operation::Link)
    }

    async fn open(&self, _req: Request, path: &OsStr, flags: u32) -> Result<ReplyOpen, Errno> {
        let fh = self.ops.open(to_path(path), flags).await?;
        Ok(ReplyOpen { fh, flags: 0 })
    }

    async fn read(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        fh: u64,
        offset: u64,
        size: u32,
    ) -> Result<ReplyData, Errno> {
        let data = self.ops.read(fh, offset, size).await?;
        Ok(Bytes::from(data).into())
    }

    async fn write(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        _fh: u64,
        _offset: u64,
        _data: &[u8],
        _write_flags: u32,
        _flags: u32,
    ) -> Result<ReplyWrite, Errno> {
        self.reject(Operation::Write)
    }

    async fn release(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        fh: u64,
        _flags: u32,
        _lock_owner: u64,
        _flush: bool,
    ) -> Result<(), Errno> {
        Ok(self.ops.release(fh).await?)
    }

    async fn fsync(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        fh: u64,
        datasync: bool,
    ) -> Result<(), Errno> {
        Ok(self.ops.fsync(fh, datasync).await?)
    }

    async fn setxattr(
        &self,
        _req: Request,
        _path: &OsStr,
        _name: &OsStr,
        _value: &[u8],
        _flags: u32,
        _position: u32,
    ) -> Result<(), Errno> {
        self.reject(Operation::Setxattr)
    }

    async fn getxattr(
        &self,
        _req: Request,
        path: &OsStr,
        name: &OsStr,
        size: u32,
    ) -> Result<ReplyXAttr, Errno> {
        let value = self.ops.getxattr(to_path(path), name).await?;
        xattr_reply(value, size)
    }

    async fn listxattr(&self, _req: Request, path: &OsStr, size: u32) -> Result<ReplyXAttr, Errno> {
        let names = self.ops.listxattr(to_path(path)).await?;
        xattr_reply(names, size)
    }

    async fn removexattr(&self, _req: Request, _path: &OsStr, _name: &OsStr) -> Result<(), Errno> {
        self.reject(Operation::Removexattr)
    }

    async fn flush(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        fh: u64,
        _lock_owner: u64,
    ) -> Result<(), Errno> {
        Ok(self.ops.flush(fh).await?)
    }

    async fn access(&self, _req: Request, path: &OsStr, mask: u32) -> Result<(), Errno> {
        Ok(self.ops.access(to_path(path), mask).await?)
    }

    async fn create(
        &self,
        _req: Request,
        _parent: &OsStr,
        _name: &OsStr,
        _mode: u32,
        _flags: u32,
    ) -> Result<ReplyCreated, Errno> {
        self.reject(Operation::Create)
    }

    async fn opendir(&self, _req: Request, path: &OsStr, flags: u32) -> Result<ReplyOpen, Errno> {
        let fh = self.ops.opendir(to_path(path)).await?;
        Ok(ReplyOpen { fh, flags })
    }

    async fn readdir<'a>(
        &'a self,
        _req: Request,
        path: &'a OsStr,
        _fh: u64,
        offset: i64,
    ) -> Result<ReplyDirectory<Self::DirEntryStream<'a>>, Errno> {
        trace!(path = ?path, offset, "fuse3: readdir");
        let listing = self.ops.readdir(to_path(path)).await?;
        Ok(ReplyDirectory {
            entries: directory_entries(listing, offset),
        })
    }

    async fn releasedir(
        &self,
        _req: Request,
        path: &OsStr,
        fh: u64,
        _flags: u32,
    ) -> Result<(), Errno> {
        Ok(self.ops.releasedir(to_path(path), fh).await?)
    }

    async fn fsyncdir(
        &self,
        _req: Request,
        path: &OsStr,
        fh: u64,
        datasync: bool,
    ) -> Result<(), Errno> {
        Ok(self.ops.fsyncdir(to_path(path), fh, datasync).await?)
    }

    async fn statfs(&self, _req: Request, path: &OsStr) -> Result<ReplyStatFs, Errno> {
        let stats = self.ops.statfs(to_path(path)).await?;
        Ok(statfs_reply(&stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BackingFs, HostFs};
    use crate::dispatch::Mount;

    fn union_fs() -> (tempfile::TempDir, Fuse3UnionFS) {
        let dir = tempfile::TempDir::new().unwrap();
        let roots: Vec<Arc<dyn BackingFs>> = vec![Arc::new(HostFs::new(dir.path()))];
        let ops = Arc::new(UnionOps::new(Mount::new(roots, 1)));
        (dir, Fuse3UnionFS::new(ops))
    }

    #[tokio::test]
    async fn test_reject_answers_unbound_requests_with_enotsup() {
        let (_dir, fs) = union_fs();
        for op in [
            Operation::Create,
            Operation::Write,
            Operation::Mkdir,
            Operation::Setxattr,
            setattr_operation(Some(0), None, false),
        ] {
            assert_eq!(fs.reject::<()>(op), Err(Errno::from(libc::ENOTSUP)));
        }
    }

    #[tokio::test]
    async fn test_reject_refuses_wired_requests() {
        let (_dir, fs) = union_fs();
        assert_eq!(
            fs.reject::<()>(Operation::Getattr),
            Err(Errno::from(libc::EIO))
        );
    }

    #[test]
    fn test_setattr_operation() {
        assert_eq!(setattr_operation(None, None, false), Operation::Utimens);
        assert_eq!(setattr_operation(None, None, true), Operation::Chown);
        assert_eq!(setattr_operation(None, Some(0o644), true), Operation::Chmod);
        assert_eq!(
            setattr_operation(Some(0), Some(0o644), true),
            Operation::Truncate
        );
    }
}
