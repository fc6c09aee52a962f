//! Single-root pass-through FUSE filesystem.
//!
//! Mounts one backing adapter 1:1, with full read/write support. There is no
//! worker pool and no aggregation: each request runs the adapter call on
//! tokio's blocking pool and returns its result unchanged.

use std::ffi::OsStr;
use std::io;
use std::os::unix::ffi::OsStringExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::Bytes;
use fuse3::path::prelude::*;
use fuse3::path::reply::{DirectoryEntryPlus, ReplyXAttr};
use fuse3::{Errno, SetAttr};
use tracing::{debug, trace, warn};

use super::mount::{mount_filesystem, MountConfig};
use super::shared::{
    child_path, directory_entries, file_attr, statfs_reply, system_time, to_path, xattr_reply,
    DirEntries, MAX_WRITE, TTL,
};
use super::types::{Fuse3Result, MountHandle};
use crate::backend::{BackingFs, Stat};

/// Pass-through FUSE filesystem over a single backing adapter.
pub struct Fuse3PassthroughFS {
    fs: Arc<dyn BackingFs>,
}

impl Fuse3PassthroughFS {
    pub fn new(fs: impl BackingFs + 'static) -> Self {
        debug!(root = %fs.root().display(), "Passthrough FUSE filesystem initialized");
        Self { fs: Arc::new(fs) }
    }

    /// Mount the filesystem at the given path.
    pub async fn mount(self, mountpoint: &Path, config: &MountConfig) -> Fuse3Result<MountHandle> {
        mount_filesystem(self, mountpoint, config).await
    }

    /// Run a blocking adapter call off the async runtime.
    async fn blocking<T, F>(&self, call: F) -> Result<T, Errno>
    where
        T: Send + 'static,
        F: FnOnce(&dyn BackingFs) -> io::Result<T> + Send + 'static,
    {
        let fs = Arc::clone(&self.fs);
        match tokio::task::spawn_blocking(move || call(fs.as_ref())).await {
            Ok(result) => result.map_err(Errno::from),
            Err(e) => {
                warn!(error = %e, "Passthrough call panicked");
                Err(Errno::from(libc::EIO))
            }
        }
    }

    async fn stat(&self, path: PathBuf) -> Result<Stat, Errno> {
        self.blocking(move |fs| fs.getattr(&path)).await
    }

    /// Attributes by path, or by open handle when the kernel sends no path
    /// (the file was unlinked while open).
    async fn attributes(&self, path: Option<&OsStr>, fh: Option<u64>) -> Result<Stat, Errno> {
        match (path, fh) {
            (Some(path), _) => self.stat(to_path(path).to_path_buf()).await,
            (None, Some(fh)) => self.blocking(move |fs| fs.fgetattr(fh)).await,
            (None, None) => Err(Errno::new_not_exist()),
        }
    }

    async fn entry(&self, path: PathBuf) -> Result<ReplyEntry, Errno> {
        let stat = self.stat(path).await?;
        Ok(ReplyEntry {
            ttl: TTL,
            attr: file_attr(&stat),
        })
    }
}

impl PathFilesystem for Fuse3PassthroughFS {
    type DirEntryStream<'a>
        = DirEntries
    where
        Self: 'a;
    type DirEntryPlusStream<'a>
        = futures::stream::Iter<std::vec::IntoIter<fuse3::Result<DirectoryEntryPlus>>>
    where
        Self: 'a;

    async fn init(&self, _req: Request) -> Result<ReplyInit, Errno> {
        self.blocking(|fs| fs.init()).await?;
        Ok(ReplyInit {
            max_write: MAX_WRITE,
        })
    }

    async fn destroy(&self, _req: Request) {
        if let Err(e) = self.blocking(|fs| fs.destroy()).await {
            warn!(error = ?e, "Passthrough destroy failed");
        }
    }

    async fn lookup(&self, _req: Request, parent: &OsStr, name: &OsStr) -> Result<ReplyEntry, Errno> {
        let path = child_path(parent, name);
        trace!(path = %path.display(), "fuse3: lookup");
        self.entry(path).await
    }

    async fn getattr(
        &self,
        _req: Request,
        path: Option<&OsStr>,
        fh: Option<u64>,
        _flags: u32,
    ) -> Result<ReplyAttr, Errno> {
        let stat = self.attributes(path, fh).await?;
        Ok(ReplyAttr {
            ttl: TTL,
            attr: file_attr(&stat),
        })
    }

    async fn setattr(
        &self,
        _req: Request,
        path: Option<&OsStr>,
        _fh: Option<u64>,
        set_attr: SetAttr,
    ) -> Result<ReplyAttr, Errno> {
        let path = to_path(path.ok_or_else(Errno::new_not_exist)?).to_path_buf();
        let atime = set_attr.atime.map(system_time);
        let mtime = set_attr.mtime.map(system_time);

        let target = path.clone();
        self.blocking(move |fs| {
            if let Some(mode) = set_attr.mode {
                fs.chmod(&target, mode)?;
            }
            if set_attr.uid.is_some() || set_attr.gid.is_some() {
                fs.chown(&target, set_attr.uid, set_attr.gid)?;
            }
            if let Some(size) = set_attr.size {
                fs.truncate(&target, size)?;
            }
            if atime.is_some() || mtime.is_some() {
                fs.utimens(&target, atime, mtime)?;
            }
            Ok(())
        })
        .await?;

        let stat = self.stat(path).await?;
        Ok(ReplyAttr {
            ttl: TTL,
            attr: file_attr(&stat),
        })
    }

    async fn readlink(&self, _req: Request, path: &OsStr) -> Result<ReplyData, Errno> {
        let path = to_path(path).to_path_buf();
        let target = self.blocking(move |fs| fs.readlink(&path)).await?;
        Ok(Bytes::from(target.into_vec()).into())
    }

    async fn symlink(
        &self,
        _req: Request,
        parent: &OsStr,
        name: &OsStr,
        link_path: &OsStr,
    ) -> Result<ReplyEntry, Errno> {
        let link = child_path(parent, name);
        let target = link_path.to_os_string();
        let created = link.clone();
        self.blocking(move |fs| fs.symlink(&target, &created)).await?;
        self.entry(link).await
    }

    async fn mknod(
        &self,
        _req: Request,
        parent: &OsStr,
        name: &OsStr,
        mode: u32,
        rdev: u32,
    ) -> Result<ReplyEntry, Errno> {
        let path = child_path(parent, name);
        let created = path.clone();
        self.blocking(move |fs| fs.mknod(&created, mode, rdev)).await?;
        self.entry(path).await
    }

    async fn mkdir(
        &self,
        _req: Request,
        parent: &OsStr,
        name: &OsStr,
        mode: u32,
        umask: u32,
    ) -> Result<ReplyEntry, Errno> {
        let path = child_path(parent, name);
        let created = path.clone();
        self.blocking(move |fs| fs.mkdir(&created, mode & !umask))
            .await?;
        self.entry(path).await
    }

    async fn unlink(&self, _req: Request, parent: &OsStr, name: &OsStr) -> Result<(), Errno> {
        let path = child_path(parent, name);
        self.blocking(move |fs| fs.unlink(&path)).await
    }

    async fn rmdir(&self, _req: Request, parent: &OsStr, name: &OsStr) -> Result<(), Errno> {
        let path = child_path(parent, name);
        self.blocking(move |fs| fs.rmdir(&path)).await
    }

    async fn rename(
        &self,
        _req: Request,
        origin_parent: &OsStr,
        origin_name: &OsStr,
        parent: &OsStr,
        name: &OsStr,
    ) -> Result<(), Errno> {
        let from = child_path(origin_parent, origin_name);
        let to = child_path(parent, name);
        self.blocking(move |fs| fs.rename(&from, &to)).await
    }

    async fn link(
        &self,
        _req: Request,
        path: &OsStr,
        new_parent: &OsStr,
        new_name: &OsStr,
    ) -> Result<ReplyEntry, Errno> {
        let target = to_path(path).to_path_buf();
        let link = child_path(new_parent, new_name);
        let created = link.clone();
        self.blocking(move |fs| fs.link(&target, &created)).await?;
        self.entry(link).await
    }

    async fn open(&self, _req: Request, path: &OsStr, flags: u32) -> Result<ReplyOpen, Errno> {
        let path = to_path(path).to_path_buf();
        let fh = self.blocking(move |fs| fs.open(&path, flags)).await?;
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
        let data = self.blocking(move |fs| fs.read(fh, offset, size)).await?;
        Ok(Bytes::from(data).into())
    }

    async fn write(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        fh: u64,
        offset: u64,
        data: &[u8],
        _write_flags: u32,
        _flags: u32,
    ) -> Result<ReplyWrite, Errno> {
        let data = data.to_vec();
        let written = self
            .blocking(move |fs| fs.write(fh, offset, &data))
            .await?;
        Ok(ReplyWrite { written })
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
        self.blocking(move |fs| fs.release(fh)).await
    }

    async fn fsync(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        fh: u64,
        datasync: bool,
    ) -> Result<(), Errno> {
        self.blocking(move |fs| fs.fsync(fh, datasync)).await
    }

    async fn setxattr(
        &self,
        _req: Request,
        path: &OsStr,
        name: &OsStr,
        value: &[u8],
        flags: u32,
        _position: u32,
    ) -> Result<(), Errno> {
        let path = to_path(path).to_path_buf();
        let name = name.to_os_string();
        let value = value.to_vec();
        self.blocking(move |fs| fs.setxattr(&path, &name, &value, flags as i32))
            .await
    }

    async fn getxattr(
        &self,
        _req: Request,
        path: &OsStr,
        name: &OsStr,
        size: u32,
    ) -> Result<ReplyXAttr, Errno> {
        let path = to_path(path).to_path_buf();
        let name = name.to_os_string();
        let value = self.blocking(move |fs| fs.getxattr(&path, &name)).await?;
        xattr_reply(value, size)
    }

    async fn listxattr(&self, _req: Request, path: &OsStr, size: u32) -> Result<ReplyXAttr, Errno> {
        let path = to_path(path).to_path_buf();
        let names = self.blocking(move |fs| fs.listxattr(&path)).await?;
        xattr_reply(names, size)
    }

    async fn removexattr(&self, _req: Request, path: &OsStr, name: &OsStr) -> Result<(), Errno> {
        let path = to_path(path).to_path_buf();
        let name = name.to_os_string();
        self.blocking(move |fs| fs.removexattr(&path, &name)).await
    }

    async fn flush(
        &self,
        _req: Request,
        _path: Option<&OsStr>,
        fh: u64,
        _lock_owner: u64,
    ) -> Result<(), Errno> {
        self.blocking(move |fs| fs.flush(fh)).await
    }

    async fn access(&self, _req: Request, path: &OsStr, mask: u32) -> Result<(), Errno> {
        let path = to_path(path).to_path_buf();
        if self.blocking(move |fs| fs.access(&path, mask)).await? {
            Ok(())
        } else {
            Err(Errno::from(libc::EACCES))
        }
    }

    async fn create(
        &self,
        _req: Request,
        parent: &OsStr,
        name: &OsStr,
        mode: u32,
        flags: u32,
    ) -> Result<ReplyCreated, Errno> {
        let path = child_path(parent, name);
        let created = path.clone();
        let fh = self
            .blocking(move |fs| fs.create(&created, mode, flags))
            .await?;
        let stat = self.stat(path).await?;
        Ok(ReplyCreated {
            ttl: TTL,
            attr: file_attr(&stat),
            generation: 0,
            fh,
            flags: 0,
        })
    }

    async fn opendir(&self, _req: Request, path: &OsStr, flags: u32) -> Result<ReplyOpen, Errno> {
        let path = to_path(path).to_path_buf();
        let fh = self.blocking(move |fs| fs.opendir(&path)).await?;
        Ok(ReplyOpen { fh, flags })
    }

    async fn readdir<'a>(
        &'a self,
        _req: Request,
        path: &'a OsStr,
        _fh: u64,
        offset: i64,
    ) -> Result<ReplyDirectory<Self::DirEntryStream<'a>>, Errno> {
        let path = to_path(path).to_path_buf();
        let listing = self.blocking(move |fs| fs.readdir(&path)).await?;
        Ok(ReplyDirectory {
            entries: directory_entries(listing, offset),
        })
    }

    async fn releasedir(
        &self,
        _req: Request,
        _path: &OsStr,
        fh: u64,
        _flags: u32,
    ) -> Result<(), Errno> {
        self.blocking(move |fs| fs.releasedir(fh)).await
    }

    async fn fsyncdir(
        &self,
        _req: Request,
        _path: &OsStr,
        fh: u64,
        datasync: bool,
    ) -> Result<(), Errno> {
        self.blocking(move |fs| fs.fsyncdir(fh, datasync)).await
    }

    async fn statfs(&self, _req: Request, path: &OsStr) -> Result<ReplyStatFs, Errno> {
        let path = to_path(path).to_path_buf();
        let stats = self.blocking(move |fs| fs.statfs(&path)).await?;
        Ok(statfs_reply(&stats))
    }
}
