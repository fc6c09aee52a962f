//! Union file handle table.
//!
//! An `open` on the mount may succeed in several roots at once. The union
//! handle returned to the kernel maps to one backing handle per root that
//! opened the file, so that later handle-based calls reach exactly those
//! roots and `release` closes every one of them.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Backing handles behind one union file handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenFile {
    /// Mount-relative path the file was opened at
    pub path: PathBuf,
    /// `slots[i]` is root `i`'s backing handle
    pub slots: Vec<Option<u64>>,
}

impl OpenFile {
    /// Number of roots holding a backing handle.
    pub fn holders(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }
}

/// Concurrent map from union file handle to backing handles.
#[derive(Debug)]
pub struct HandleTable {
    files: DashMap<u64, OpenFile>,
    next_fh: AtomicU64,
}

impl Default for HandleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl HandleTable {
    pub fn new() -> Self {
        Self {
            files: DashMap::new(),
            // 0 is the directory handle
            next_fh: AtomicU64::new(1),
        }
    }

    /// Register the backing handles of a newly opened file.
    pub fn insert(&self, path: &Path, slots: Vec<Option<u64>>) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.files.insert(
            fh,
            OpenFile {
                path: path.to_path_buf(),
                slots,
            },
        );
        fh
    }

    pub fn get(&self, fh: u64) -> Option<OpenFile> {
        self.files.get(&fh).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, fh: u64) -> Option<OpenFile> {
        self.files.remove(&fh).map(|(_, file)| file)
    }

    /// Union handles currently open.
    pub fn open_handles(&self) -> Vec<u64> {
        self.files.iter().map(|entry| *entry.key()).collect()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
