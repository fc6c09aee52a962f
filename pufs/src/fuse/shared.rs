//! Conversions shared by the fuse3 filesystems.

use std::ffi::OsStr;
use std::num::NonZeroU32;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use fuse3::path::reply::{DirectoryEntry, FileAttr, ReplyStatFs, ReplyXAttr};
use fuse3::{Errno, FileType, Timestamp};

use crate::backend::{DirEntry, FileKind, Stat, StatFs};

/// Time-to-live for FUSE attribute caching.
pub const TTL: Duration = Duration::from_secs(1);

/// Largest write the kernel may send in one request.
pub const MAX_WRITE: NonZeroU32 = match NonZeroU32::new(1024 * 1024) {
    Some(size) => size,
    None => panic!("max write must be non-zero"),
};

/// Mount-relative path of the kernel-supplied `path`.
pub fn to_path(path: &OsStr) -> &Path {
    Path::new(path)
}

/// Path of entry `name` inside directory `parent`.
pub fn child_path(parent: &OsStr, name: &OsStr) -> PathBuf {
    Path::new(parent).join(name)
}

pub fn file_type(kind: FileKind) -> FileType {
    match kind {
        FileKind::RegularFile => FileType::RegularFile,
        FileKind::Directory => FileType::Directory,
        FileKind::Symlink => FileType::Symlink,
        FileKind::NamedPipe => FileType::NamedPipe,
        FileKind::CharDevice => FileType::CharDevice,
        FileKind::BlockDevice => FileType::BlockDevice,
        FileKind::Socket => FileType::Socket,
    }
}

pub fn file_attr(stat: &Stat) -> FileAttr {
    FileAttr {
        size: stat.size,
        blocks: stat.blocks,
        atime: stat.atime.into(),
        mtime: stat.mtime.into(),
        ctime: stat.ctime.into(),
        kind: file_type(stat.kind),
        perm: stat.perm,
        nlink: stat.nlink,
        uid: stat.uid,
        gid: stat.gid,
        rdev: stat.rdev,
        blksize: stat.blksize,
    }
}

pub fn statfs_reply(stats: &StatFs) -> ReplyStatFs {
    ReplyStatFs {
        blocks: stats.blocks,
        bfree: stats.bfree,
        bavail: stats.bavail,
        files: stats.files,
        ffree: stats.ffree,
        bsize: stats.bsize,
        namelen: stats.namelen,
        frsize: stats.frsize,
    }
}

/// Kernel stream type for directory listings.
pub type DirEntries = futures::stream::Iter<std::vec::IntoIter<fuse3::Result<DirectoryEntry>>>;

/// Turn a listing into kernel entries, skipping the first `offset` ones.
///
/// Entry offsets are 1-based positions, so a listing may contain the same
/// name more than once.
pub fn directory_entries(listing: Vec<DirEntry>, offset: i64) -> DirEntries {
    let entries: Vec<fuse3::Result<DirectoryEntry>> = listing
        .into_iter()
        .enumerate()
        .map(|(index, entry)| {
            Ok(DirectoryEntry {
                kind: file_type(entry.kind),
                name: entry.name,
                offset: index as i64 + 1,
            })
        })
        .skip(offset.max(0) as usize)
        .collect();
    futures::stream::iter(entries)
}

/// Answer an xattr request: the size when `size` is 0, else the data.
pub fn xattr_reply(value: Vec<u8>, size: u32) -> Result<ReplyXAttr, Errno> {
    if size == 0 {
        Ok(ReplyXAttr::Size(value.len() as u32))
    } else if value.len() > size as usize {
        Err(Errno::from(libc::ERANGE))
    } else {
        Ok(ReplyXAttr::Data(Bytes::from(value)))
    }
}

/// Convert a kernel timestamp.
pub fn system_time(ts: Timestamp) -> SystemTime {
    if ts.sec >= 0 {
        UNIX_EPOCH + Duration::new(ts.sec as u64, ts.nsec)
    } else {
        UNIX_EPOCH - Duration::from_secs(ts.sec.unsigned_abs())
    }
}
