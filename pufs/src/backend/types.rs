//! Native result types returned by backing adapters.
//!
//! These mirror the POSIX `stat`/`statvfs` structures and are independent of
//! the FUSE library so that the dispatch engine and its reducers can be
//! exercised without a mounted filesystem.

use std::ffi::OsString;
use std::fs::Metadata;
use std::os::unix::fs::{FileTypeExt, MetadataExt};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Kind of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    RegularFile,
    Directory,
    Symlink,
    NamedPipe,
    CharDevice,
    BlockDevice,
    Socket,
}

impl FileKind {
    /// Classify a `std::fs::FileType`.
    pub fn from_file_type(ft: std::fs::FileType) -> Self {
        if ft.is_dir() {
            Self::Directory
        } else if ft.is_symlink() {
            Self::Symlink
        } else if ft.is_fifo() {
            Self::NamedPipe
        } else if ft.is_char_device() {
            Self::CharDevice
        } else if ft.is_block_device() {
            Self::BlockDevice
        } else if ft.is_socket() {
            Self::Socket
        } else {
            Self::RegularFile
        }
    }
}

/// Attributes of a single entry, as returned by `lstat`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stat {
    pub kind: FileKind,
    /// Permission bits (`st_mode & 0o7777`).
    pub perm: u16,
    pub nlink: u32,
    pub uid: u32,
    pub gid: u32,
    pub rdev: u32,
    pub size: u64,
    pub blocks: u64,
    pub blksize: u32,
    pub atime: SystemTime,
    pub mtime: SystemTime,
    pub ctime: SystemTime,
}

impl From<&Metadata> for Stat {
    fn from(metadata: &Metadata) -> Self {
        Self {
            kind: FileKind::from_file_type(metadata.file_type()),
            perm: (metadata.mode() & 0o7777) as u16,
            nlink: metadata.nlink() as u32,
            uid: metadata.uid(),
            gid: metadata.gid(),
            rdev: metadata.rdev() as u32,
            size: metadata.size(),
            blocks: metadata.blocks(),
            blksize: metadata.blksize() as u32,
            atime: unix_time(metadata.atime(), metadata.atime_nsec()),
            mtime: unix_time(metadata.mtime(), metadata.mtime_nsec()),
            ctime: unix_time(metadata.ctime(), metadata.ctime_nsec()),
        }
    }
}

fn unix_time(secs: i64, nsecs: i64) -> SystemTime {
    if secs >= 0 {
        UNIX_EPOCH + Duration::new(secs as u64, nsecs as u32)
    } else {
        UNIX_EPOCH - Duration::from_secs(secs.unsigned_abs())
    }
}

/// Filesystem statistics, as returned by `statvfs`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StatFs {
    pub blocks: u64,
    pub bfree: u64,
    pub bavail: u64,
    pub files: u64,
    pub ffree: u64,
    pub favail: u64,
    pub bsize: u32,
    pub frsize: u32,
    pub namelen: u32,
    pub flag: u64,
}

/// One entry of a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: OsString,
    pub kind: FileKind,
}

impl DirEntry {
    pub fn new(name: impl Into<OsString>, kind: FileKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }

    /// The `.` and `..` entries every listing starts with.
    pub fn dot_entries() -> [DirEntry; 2] {
        [
            DirEntry::new(".", FileKind::Directory),
            DirEntry::new("..", FileKind::Directory),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stat_from_metadata() {
        let temp = tempfile::tempdir().unwrap();
        let file = temp.path().join("f");
        std::fs::write(&file, b"hello").unwrap();

        let stat = Stat::from(&std::fs::symlink_metadata(&file).unwrap());
        assert_eq!(stat.kind, FileKind::RegularFile);
        assert_eq!(stat.size, 5);
        assert_eq!(stat.nlink, 1);
    }

    #[test]
    fn test_file_kind_symlink_and_dir() {
        let temp = tempfile::tempdir().unwrap();
        let link = temp.path().join("link");
        std::os::unix::fs::symlink("nowhere", &link).unwrap();

        let link_meta = std::fs::symlink_metadata(&link).unwrap();
        assert_eq!(
            FileKind::from_file_type(link_meta.file_type()),
            FileKind::Symlink
        );

        let dir_meta = std::fs::symlink_metadata(temp.path()).unwrap();
        assert_eq!(
            FileKind::from_file_type(dir_meta.file_type()),
            FileKind::Directory
        );
    }

    #[test]
    fn test_unix_time_negative() {
        assert_eq!(unix_time(-10, 0), UNIX_EPOCH - Duration::from_secs(10));
        assert_eq!(unix_time(0, 5), UNIX_EPOCH + Duration::from_nanos(5));
    }
}
