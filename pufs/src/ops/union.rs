//! Union operations: one method per wired filesystem operation.
//!
//! Every request is first routed through the operation table
//! ([`UnionOps::route`]): unbound operations are refused before any root is
//! touched. Wired methods then dispatch through the [`Mount`] with the bound
//! gate and reduce with the bound policy. Mutating operations never reach a
//! backing root; they are answered by [`UnionOps::reject`].

use std::ffi::{OsStr, OsString};
use std::path::Path;

use tracing::{debug, info, warn};

use super::handles::HandleTable;
use super::operation::{Binding, Operation};
use crate::backend::{DirEntry, Stat, StatFs};
use crate::dispatch::{Mount, Outcome};
use crate::error::{UnionError, UnionResult};
use crate::policy::{first_success, require_all_or_fail, union_concat};

/// Read-only union view over a [`Mount`].
pub struct UnionOps {
    mount: Mount,
    handles: HandleTable,
}

impl UnionOps {
    pub fn new(mount: Mount) -> Self {
        Self {
            mount,
            handles: HandleTable::new(),
        }
    }

    pub fn mount(&self) -> &Mount {
        &self.mount
    }

    /// Open union file handles.
    pub fn handles(&self) -> &HandleTable {
        &self.handles
    }

    /// Look up the binding a request is served with.
    ///
    /// Operations without a binding fail with [`UnionError::Unsupported`];
    /// once the pool is closed every request fails with
    /// [`UnionError::PoolClosed`]. Neither case reaches a backing root.
    pub fn route(&self, op: Operation) -> UnionResult<Binding> {
        let Some(binding) = op.binding() else {
            debug!(op = %op, "Rejected unsupported operation");
            return Err(UnionError::Unsupported(op));
        };
        if self.mount.pool().is_closed() {
            debug!(op = %op, "Rejected request after shutdown");
            return Err(UnionError::PoolClosed);
        }
        Ok(binding)
    }

    /// Answer a request the facade has no method for.
    ///
    /// The operation table decides the answer. A wired operation never ends
    /// up here, and one that does fails with [`UnionError::Misrouted`].
    pub fn reject<T>(&self, op: Operation) -> UnionResult<T> {
        self.route(op)?;
        warn!(op = %op, "Wired operation reached the rejection path");
        Err(UnionError::Misrouted(op))
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub async fn init(&self) -> UnionResult<()> {
        let binding = self.route(Operation::Init)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Init, binding.gate, Path::new("/"), |fs, _| fs.init())
            .await;
        first_success(Operation::Init, outcomes)
    }

    pub async fn destroy(&self) -> UnionResult<()> {
        let binding = self.route(Operation::Destroy)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Destroy, binding.gate, Path::new("/"), |fs, _| fs.destroy())
            .await;
        first_success(Operation::Destroy, outcomes)
    }

    /// Close handles left open by the kernel and drain the worker pool.
    pub async fn shutdown(&self) {
        let leftover = self.handles.open_handles();
        for fh in leftover {
            if let Err(e) = self.release(fh).await {
                debug!(fh, error = %e, "Failed to release handle on shutdown");
            }
        }
        self.mount.shutdown().await;
        info!("Union mount shut down");
    }

    // =========================================================================
    // Metadata
    // =========================================================================

    pub async fn getattr(&self, path: &Path) -> UnionResult<Stat> {
        let binding = self.route(Operation::Getattr)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Getattr, binding.gate, path, |fs, path| fs.getattr(path))
            .await;
        first_success(Operation::Getattr, outcomes)
    }

    /// Attributes of an open file, looked up by the path it was opened at.
    pub async fn getattr_handle(&self, fh: u64) -> UnionResult<Stat> {
        let file = self.handles.get(fh).ok_or(UnionError::BadHandle(fh))?;
        self.getattr(&file.path).await
    }

    pub async fn access(&self, path: &Path, mask: u32) -> UnionResult<()> {
        let binding = self.route(Operation::Access)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Access, binding.gate, path, move |fs, path| fs.access(path, mask))
            .await;
        require_all_or_fail(Operation::Access, outcomes)
    }

    pub async fn readlink(&self, path: &Path) -> UnionResult<OsString> {
        let binding = self.route(Operation::Readlink)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Readlink, binding.gate, path, |fs, path| fs.readlink(path))
            .await;
        first_success(Operation::Readlink, outcomes)
    }

    pub async fn statfs(&self, path: &Path) -> UnionResult<StatFs> {
        let binding = self.route(Operation::Statfs)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Statfs, binding.gate, path, |fs, path| fs.statfs(path))
            .await;
        first_success(Operation::Statfs, outcomes)
    }

    pub async fn getxattr(&self, path: &Path, name: &OsStr) -> UnionResult<Vec<u8>> {
        let name = name.to_os_string();
        let binding = self.route(Operation::Getxattr)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Getxattr, binding.gate, path, move |fs, path| {
                fs.getxattr(path, &name)
            })
            .await;
        first_success(Operation::Getxattr, outcomes)
    }

    pub async fn listxattr(&self, path: &Path) -> UnionResult<Vec<u8>> {
        let binding = self.route(Operation::Listxattr)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Listxattr, binding.gate, path, |fs, path| fs.listxattr(path))
            .await;
        first_success(Operation::Listxattr, outcomes)
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Open `path` in every root that has it and return a union handle.
    ///
    /// Only read-only opens are accepted. Backing handles opened in roots
    /// after the first are kept until [`release`](Self::release).
    pub async fn open(&self, path: &Path, flags: u32) -> UnionResult<u64> {
        let access_mode = flags as i32 & libc::O_ACCMODE;
        if access_mode != libc::O_RDONLY || flags as i32 & libc::O_TRUNC != 0 {
            return self.reject(Operation::Write);
        }

        let binding = self.route(Operation::Open)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Open, binding.gate, path, move |fs, path| fs.open(path, flags))
            .await;

        let slots: Vec<Option<u64>> = outcomes
            .iter()
            .map(|outcome| match outcome {
                Outcome::Success(fh) => Some(*fh),
                _ => None,
            })
            .collect();

        if slots.iter().all(Option::is_none) {
            return match first_success(Operation::Open, outcomes) {
                Err(e) => Err(e),
                Ok(_) => Err(UnionError::NotFound),
            };
        }

        let fh = self.handles.insert(path, slots);
        debug!(path = %path.display(), fh, "Opened union handle");
        Ok(fh)
    }

    pub async fn read(&self, fh: u64, offset: u64, size: u32) -> UnionResult<Vec<u8>> {
        let binding = self.route(Operation::Read)?;
        let file = self.handles.get(fh).ok_or(UnionError::BadHandle(fh))?;
        let outcomes = self
            .mount
            .dispatch_handles(Operation::Read, binding.gate, &file.slots, move |fs, bfh| {
                fs.read(bfh, offset, size)
            })
            .await;
        first_success(Operation::Read, outcomes)
    }

    pub async fn flush(&self, fh: u64) -> UnionResult<()> {
        let binding = self.route(Operation::Flush)?;
        let file = self.handles.get(fh).ok_or(UnionError::BadHandle(fh))?;
        let outcomes = self
            .mount
            .dispatch_handles(Operation::Flush, binding.gate, &file.slots, |fs, bfh| fs.flush(bfh))
            .await;
        first_success(Operation::Flush, outcomes)
    }

    pub async fn fsync(&self, fh: u64, datasync: bool) -> UnionResult<()> {
        let binding = self.route(Operation::Fsync)?;
        let file = self.handles.get(fh).ok_or(UnionError::BadHandle(fh))?;
        let outcomes = self
            .mount
            .dispatch_handles(Operation::Fsync, binding.gate, &file.slots, move |fs, bfh| {
                fs.fsync(bfh, datasync)
            })
            .await;
        first_success(Operation::Fsync, outcomes)
    }

    /// Close every backing handle behind `fh`.
    pub async fn release(&self, fh: u64) -> UnionResult<()> {
        let binding = self.route(Operation::Release)?;
        let file = self.handles.remove(fh).ok_or(UnionError::BadHandle(fh))?;
        let outcomes = self
            .mount
            .dispatch_handles(Operation::Release, binding.gate, &file.slots, |fs, bfh| {
                fs.release(bfh)
            })
            .await;
        first_success(Operation::Release, outcomes)
    }

    // =========================================================================
    // Directories
    // =========================================================================

    pub async fn opendir(&self, path: &Path) -> UnionResult<u64> {
        let binding = self.route(Operation::Opendir)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Opendir, binding.gate, path, |fs, path| fs.opendir(path))
            .await;
        first_success(Operation::Opendir, outcomes)
    }

    /// Concatenated listings of every root that has `path`.
    pub async fn readdir(&self, path: &Path) -> UnionResult<Vec<DirEntry>> {
        let binding = self.route(Operation::Readdir)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Readdir, binding.gate, path, |fs, path| fs.readdir(path))
            .await;
        union_concat(Operation::Readdir, outcomes)
    }

    pub async fn releasedir(&self, path: &Path, fh: u64) -> UnionResult<()> {
        let binding = self.route(Operation::Releasedir)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Releasedir, binding.gate, path, move |fs, _| fs.releasedir(fh))
            .await;
        first_success(Operation::Releasedir, outcomes)
    }

    pub async fn fsyncdir(&self, path: &Path, fh: u64, datasync: bool) -> UnionResult<()> {
        let binding = self.route(Operation::Fsyncdir)?;
        let outcomes = self
            .mount
            .dispatch(Operation::Fsyncdir, binding.gate, path, move |fs, _| {
                fs.fsyncdir(fh, datasync)
            })
            .await;
        first_success(Operation::Fsyncdir, outcomes)
    }
}
