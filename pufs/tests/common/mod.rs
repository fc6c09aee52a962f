//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::collections::HashSet;
use std::ffi::{OsStr, OsString};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pufs::backend::{BackingFs, DirEntry, FileKind, Stat, StatFs};
use pufs::dispatch::Mount;
use pufs::ops::UnionOps;
use tempfile::TempDir;

// =============================================================================
// Real directory fixtures
// =============================================================================

/// Create a temp root holding `files` (relative path, contents).
pub fn temp_root(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
    dir
}

/// Union over the given backing adapters.
pub fn union_of(roots: Vec<Arc<dyn BackingFs>>, factor: usize) -> UnionOps {
    UnionOps::new(Mount::new(roots, factor))
}

// =============================================================================
// Scripted adapter
// =============================================================================

/// A backing adapter whose answers are scripted by the test.
///
/// Every call except `exists` is counted in `calls`; `exists` probes are
/// counted separately in `probes`.
pub struct ScriptedFs {
    root: PathBuf,
    entries: HashSet<PathBuf>,
    listing: Vec<&'static str>,
    grants_access: bool,
    fail_with: Option<i32>,
    size: u64,
    delay: Duration,
    pub calls: AtomicUsize,
    pub probes: AtomicUsize,
    in_flight: AtomicUsize,
    pub peak: AtomicUsize,
}

impl ScriptedFs {
    pub fn new(root: &str) -> Self {
        Self {
            root: PathBuf::from(root),
            entries: HashSet::new(),
            listing: Vec::new(),
            grants_access: true,
            fail_with: None,
            size: 0,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// Make `path` exist in this root.
    pub fn with_entry(mut self, path: &str) -> Self {
        self.entries.insert(PathBuf::from(path));
        self
    }

    /// Children listed by `readdir`, after the dot entries.
    pub fn with_listing(mut self, names: &[&'static str]) -> Self {
        self.listing = names.to_vec();
        self
    }

    /// Size reported by `getattr`, used to tell roots apart.
    pub fn with_size(mut self, size: u64) -> Self {
        self.size = size;
        self
    }

    pub fn with_delay(mut self, millis: u64) -> Self {
        self.delay = Duration::from_millis(millis);
        self
    }

    /// Fail every call with `errno`.
    pub fn failing(mut self, errno: i32) -> Self {
        self.fail_with = Some(errno);
        self
    }

    pub fn denying_access(mut self) -> Self {
        self.grants_access = false;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    fn record<T>(&self, answer: impl FnOnce() -> io::Result<T>) -> io::Result<T> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        if !self.delay.is_zero() {
            thread::sleep(self.delay);
        }
        let result = match self.fail_with {
            Some(errno) => Err(io::Error::from_raw_os_error(errno)),
            None => answer(),
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn stat(&self) -> Stat {
        Stat {
            kind: FileKind::RegularFile,
            perm: 0o644,
            nlink: 1,
            uid: 0,
            gid: 0,
            rdev: 0,
            size: self.size,
            blocks: 0,
            blksize: 4096,
            atime: UNIX_EPOCH,
            mtime: UNIX_EPOCH,
            ctime: UNIX_EPOCH,
        }
    }
}

impl BackingFs for ScriptedFs {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.entries.contains(path)
    }

    fn init(&self) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn getattr(&self, _path: &Path) -> io::Result<Stat> {
        self.record(|| Ok(self.stat()))
    }

    fn access(&self, _path: &Path, _mask: u32) -> io::Result<bool> {
        self.record(|| Ok(self.grants_access))
    }

    fn readlink(&self, _path: &Path) -> io::Result<OsString> {
        self.record(|| Ok(OsString::from("target")))
    }

    fn open(&self, _path: &Path, _flags: u32) -> io::Result<u64> {
        self.record(|| Ok(7))
    }

    fn read(&self, _fh: u64, _offset: u64, size: u32) -> io::Result<Vec<u8>> {
        self.record(|| Ok(vec![self.size as u8; size as usize]))
    }

    fn write(&self, _fh: u64, _offset: u64, data: &[u8]) -> io::Result<u32> {
        self.record(|| Ok(data.len() as u32))
    }

    fn flush(&self, _fh: u64) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn fsync(&self, _fh: u64, _datasync: bool) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn release(&self, _fh: u64) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn opendir(&self, _path: &Path) -> io::Result<u64> {
        self.record(|| Ok(0))
    }

    fn readdir(&self, _path: &Path) -> io::Result<Vec<DirEntry>> {
        self.record(|| {
            let mut entries = DirEntry::dot_entries().to_vec();
            entries.extend(
                self.listing
                    .iter()
                    .map(|name| DirEntry::new(*name, FileKind::RegularFile)),
            );
            Ok(entries)
        })
    }

    fn statfs(&self, _path: &Path) -> io::Result<StatFs> {
        self.record(|| Ok(StatFs::default()))
    }

    fn getxattr(&self, _path: &Path, _name: &OsStr) -> io::Result<Vec<u8>> {
        self.record(|| Ok(b"value".to_vec()))
    }

    fn listxattr(&self, _path: &Path) -> io::Result<Vec<u8>> {
        self.record(|| Ok(Vec::new()))
    }

    fn create(&self, _path: &Path, _mode: u32, _flags: u32) -> io::Result<u64> {
        self.record(|| Ok(8))
    }

    fn mkdir(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn mknod(&self, _path: &Path, _mode: u32, _rdev: u32) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn unlink(&self, _path: &Path) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn rmdir(&self, _path: &Path) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn symlink(&self, _target: &OsStr, _link: &Path) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn link(&self, _target: &Path, _link: &Path) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn rename(&self, _from: &Path, _to: &Path) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn chmod(&self, _path: &Path, _mode: u32) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn chown(&self, _path: &Path, _uid: Option<u32>, _gid: Option<u32>) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn truncate(&self, _path: &Path, _size: u64) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn utimens(
        &self,
        _path: &Path,
        _atime: Option<SystemTime>,
        _mtime: Option<SystemTime>,
    ) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn setxattr(&self, _path: &Path, _name: &OsStr, _value: &[u8], _flags: i32) -> io::Result<()> {
        self.record(|| Ok(()))
    }

    fn removexattr(&self, _path: &Path, _name: &OsStr) -> io::Result<()> {
        self.record(|| Ok(()))
    }
}

/// Coerce scripted adapters into the mount's root list.
pub fn roots(adapters: &[&Arc<ScriptedFs>]) -> Vec<Arc<dyn BackingFs>> {
    adapters
        .iter()
        .map(|fs| Arc::clone(fs) as Arc<dyn BackingFs>)
        .collect()
}

/// Names of a listing, in order.
pub fn names(entries: &[DirEntry]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.name.to_string_lossy().into_owned())
        .collect()
}
