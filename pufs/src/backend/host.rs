//! Host pass-through adapter.
//!
//! [`HostFs`] forwards every filesystem call to the host operating system,
//! with all paths resolved under a single root directory. Open files are
//! kept in a handle table keyed by the `fh` value returned to callers.

use std::ffi::{OsStr, OsString};
use std::fs::{self, File, OpenOptions, Permissions};
use std::io;
use std::os::unix::ffi::OsStrExt;
use std::os::unix::fs::{DirBuilderExt, FileExt, OpenOptionsExt, PermissionsExt};
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use nix::sys::stat::{Mode, SFlag, UtimensatFlags};
use nix::sys::time::TimeSpec;
use nix::unistd::AccessFlags;
use tracing::trace;

use super::resolve_under;
use super::traits::BackingFs;
use super::types::{DirEntry, FileKind, Stat, StatFs};

/// Handle returned by [`HostFs::opendir`]. Directory I/O is stateless.
pub const DIR_HANDLE: u64 = 0;

/// Adapter that forwards filesystem calls to the host under one root.
pub struct HostFs {
    /// Root directory all paths are resolved under
    root: PathBuf,
    /// Open files by handle
    files: DashMap<u64, Arc<File>>,
    /// Next handle to hand out (0 is reserved for directories)
    next_fh: AtomicU64,
}

impl HostFs {
    /// Create an adapter scoped to `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            files: DashMap::new(),
            next_fh: AtomicU64::new(1),
        }
    }

    /// Resolve a mount-relative path to the host path under this root.
    pub fn full_path(&self, partial: &Path) -> PathBuf {
        resolve_under(&self.root, partial)
    }

    /// Number of files currently open through this adapter.
    pub fn open_files(&self) -> usize {
        self.files.len()
    }

    fn insert_file(&self, file: File) -> u64 {
        let fh = self.next_fh.fetch_add(1, Ordering::Relaxed);
        self.files.insert(fh, Arc::new(file));
        fh
    }

    fn file(&self, fh: u64) -> io::Result<Arc<File>> {
        self.files
            .get(&fh)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EBADF))
    }
}

/// Build `OpenOptions` from `open(2)` flags.
fn open_options(flags: u32) -> OpenOptions {
    let flags = flags as i32;
    let mut options = OpenOptions::new();
    let writable = match flags & libc::O_ACCMODE {
        libc::O_WRONLY => {
            options.write(true);
            true
        }
        libc::O_RDWR => {
            options.read(true).write(true);
            true
        }
        _ => {
            options.read(true);
            false
        }
    };
    if writable && flags & libc::O_TRUNC != 0 {
        options.truncate(true);
    }
    options.custom_flags(flags & !(libc::O_ACCMODE | libc::O_CREAT | libc::O_EXCL | libc::O_TRUNC));
    options
}

/// Error for a missing extended attribute.
fn no_attribute() -> io::Error {
    #[cfg(target_os = "macos")]
    return io::Error::from_raw_os_error(libc::ENOATTR);
    #[cfg(not(target_os = "macos"))]
    io::Error::from_raw_os_error(libc::ENODATA)
}

fn time_spec(time: Option<SystemTime>) -> TimeSpec {
    match time.map(|t| t.duration_since(UNIX_EPOCH)) {
        Some(Ok(since_epoch)) => TimeSpec::from_duration(since_epoch),
        Some(Err(_)) => TimeSpec::new(0, 0),
        None => TimeSpec::UTIME_OMIT,
    }
}

/// Express `target` relative to `base`, the way `os.path.relpath` does.
pub fn relative_to(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<Component> = target.components().collect();
    let base: Vec<Component> = base.components().collect();
    let common = target
        .iter()
        .zip(base.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut relative = PathBuf::new();
    for _ in common..base.len() {
        relative.push("..");
    }
    for component in &target[common..] {
        relative.push(component.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

impl BackingFs for HostFs {
    fn root(&self) -> &Path {
        &self.root
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(self.full_path(path)).is_ok()
    }

    fn getattr(&self, path: &Path) -> io::Result<Stat> {
        let metadata = fs::symlink_metadata(self.full_path(path))?;
        Ok(Stat::from(&metadata))
    }

    fn fgetattr(&self, fh: u64) -> io::Result<Stat> {
        let metadata = self.file(fh)?.metadata()?;
        Ok(Stat::from(&metadata))
    }

    fn access(&self, path: &Path, mask: u32) -> io::Result<bool> {
        let flags = AccessFlags::from_bits_truncate(mask as libc::c_int);
        Ok(nix::unistd::access(&self.full_path(path), flags).is_ok())
    }

    fn readlink(&self, path: &Path) -> io::Result<OsString> {
        let target = fs::read_link(self.full_path(path))?;
        if target.is_absolute() {
            Ok(relative_to(&target, &self.root).into_os_string())
        } else {
            Ok(target.into_os_string())
        }
    }

    fn open(&self, path: &Path, flags: u32) -> io::Result<u64> {
        let file = open_options(flags).open(self.full_path(path))?;
        let fh = self.insert_file(file);
        trace!(root = %self.root.display(), path = %path.display(), fh, "host: open");
        Ok(fh)
    }

    fn read(&self, fh: u64, offset: u64, size: u32) -> io::Result<Vec<u8>> {
        let file = self.file(fh)?;
        let mut buf = vec![0u8; size as usize];
        let mut filled = 0usize;
        while filled < buf.len() {
            match file.read_at(&mut buf[filled..], offset + filled as u64) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        buf.truncate(filled);
        Ok(buf)
    }

    fn write(&self, fh: u64, offset: u64, data: &[u8]) -> io::Result<u32> {
        let file = self.file(fh)?;
        file.write_all_at(data, offset)?;
        Ok(data.len() as u32)
    }

    fn flush(&self, fh: u64) -> io::Result<()> {
        self.file(fh)?.sync_all()
    }

    fn fsync(&self, fh: u64, datasync: bool) -> io::Result<()> {
        let file = self.file(fh)?;
        if datasync {
            file.sync_data()
        } else {
            file.sync_all()
        }
    }

    fn release(&self, fh: u64) -> io::Result<()> {
        trace!(root = %self.root.display(), fh, "host: release");
        self.files
            .remove(&fh)
            .map(|_| ())
            .ok_or_else(|| io::Error::from_raw_os_error(libc::EBADF))
    }

    fn opendir(&self, path: &Path) -> io::Result<u64> {
        let metadata = fs::symlink_metadata(self.full_path(path))?;
        if !metadata.is_dir() {
            return Err(io::Error::from_raw_os_error(libc::ENOTDIR));
        }
        Ok(DIR_HANDLE)
    }

    fn readdir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let full_path = self.full_path(path);
        let mut entries = DirEntry::dot_entries().to_vec();
        if full_path.is_dir() {
            for entry in fs::read_dir(&full_path)? {
                let entry = entry?;
                let kind = entry
                    .file_type()
                    .map(FileKind::from_file_type)
                    .unwrap_or(FileKind::RegularFile);
                entries.push(DirEntry::new(entry.file_name(), kind));
            }
        }
        Ok(entries)
    }

    fn statfs(&self, path: &Path) -> io::Result<StatFs> {
        let stats = nix::sys::statvfs::statvfs(&self.full_path(path))?;
        Ok(StatFs {
            blocks: stats.blocks() as u64,
            bfree: stats.blocks_free() as u64,
            bavail: stats.blocks_available() as u64,
            files: stats.files() as u64,
            ffree: stats.files_free() as u64,
            favail: stats.files_available() as u64,
            bsize: stats.block_size() as u32,
            frsize: stats.fragment_size() as u32,
            namelen: stats.name_max() as u32,
            flag: stats.flags().bits() as u64,
        })
    }

    fn getxattr(&self, path: &Path, name: &OsStr) -> io::Result<Vec<u8>> {
        xattr::get(self.full_path(path), name)?.ok_or_else(no_attribute)
    }

    fn listxattr(&self, path: &Path) -> io::Result<Vec<u8>> {
        let mut names = Vec::new();
        for attr in xattr::list(self.full_path(path))? {
            names.extend_from_slice(attr.as_bytes());
            names.push(0);
        }
        Ok(names)
    }

    fn create(&self, path: &Path, mode: u32, flags: u32) -> io::Result<u64> {
        let mut options = open_options(flags);
        options.write(true).mode(mode);
        if flags as i32 & libc::O_EXCL != 0 {
            options.create_new(true);
        } else {
            options.create(true);
        }
        let file = options.open(self.full_path(path))?;
        Ok(self.insert_file(file))
    }

    fn mkdir(&self, path: &Path, mode: u32) -> io::Result<()> {
        fs::DirBuilder::new()
            .mode(mode)
            .create(self.full_path(path))
    }

    fn mknod(&self, path: &Path, mode: u32, rdev: u32) -> io::Result<()> {
        let kind = SFlag::from_bits_truncate(mode as libc::mode_t & libc::S_IFMT);
        let perm = Mode::from_bits_truncate(mode as libc::mode_t & 0o7777);
        nix::sys::stat::mknod(&self.full_path(path), kind, perm, rdev as libc::dev_t)?;
        Ok(())
    }

    fn unlink(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(self.full_path(path))
    }

    fn rmdir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(self.full_path(path))
    }

    fn symlink(&self, target: &OsStr, link: &Path) -> io::Result<()> {
        std::os::unix::fs::symlink(target, self.full_path(link))
    }

    fn link(&self, target: &Path, link: &Path) -> io::Result<()> {
        fs::hard_link(self.full_path(target), self.full_path(link))
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(self.full_path(from), self.full_path(to))
    }

    fn chmod(&self, path: &Path, mode: u32) -> io::Result<()> {
        fs::set_permissions(self.full_path(path), Permissions::from_mode(mode & 0o7777))
    }

    fn chown(&self, path: &Path, uid: Option<u32>, gid: Option<u32>) -> io::Result<()> {
        std::os::unix::fs::lchown(self.full_path(path), uid, gid)
    }

    fn truncate(&self, path: &Path, size: u64) -> io::Result<()> {
        OpenOptions::new()
            .write(true)
            .open(self.full_path(path))?
            .set_len(size)
    }

    fn utimens(
        &self,
        path: &Path,
        atime: Option<SystemTime>,
        mtime: Option<SystemTime>,
    ) -> io::Result<()> {
        nix::sys::stat::utimensat(
            None,
            &self.full_path(path),
            &time_spec(atime),
            &time_spec(mtime),
            UtimensatFlags::NoFollowSymlink,
        )?;
        Ok(())
    }

    fn setxattr(&self, path: &Path, name: &OsStr, value: &[u8], flags: i32) -> io::Result<()> {
        let full = self.full_path(path);
        if flags & (libc::XATTR_CREATE | libc::XATTR_REPLACE) != 0 {
            let present = xattr::get(&full, name)?.is_some();
            if flags & libc::XATTR_CREATE != 0 && present {
                return Err(io::Error::from_raw_os_error(libc::EEXIST));
            }
            if flags & libc::XATTR_REPLACE != 0 && !present {
                return Err(no_attribute());
            }
        }
        xattr::set(full, name, value)
    }

    fn removexattr(&self, path: &Path, name: &OsStr) -> io::Result<()> {
        xattr::remove(self.full_path(path), name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn host_with_file(name: &str, content: &[u8]) -> (TempDir, HostFs) {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join(name), content).unwrap();
        let host = HostFs::new(temp.path());
        (temp, host)
    }

    #[test]
    fn test_exists_and_getattr() {
        let (_temp, host) = host_with_file("f", b"data");

        assert!(host.exists(Path::new("/f")));
        assert!(!host.exists(Path::new("/missing")));

        let stat = host.getattr(Path::new("/f")).unwrap();
        assert_eq!(stat.size, 4);
        assert_eq!(stat.kind, FileKind::RegularFile);
    }

    #[test]
    fn test_getattr_missing_is_enoent() {
        let (_temp, host) = host_with_file("f", b"");
        let err = host.getattr(Path::new("/missing")).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn test_exists_dangling_symlink() {
        let temp = TempDir::new().unwrap();
        std::os::unix::fs::symlink("/nonexistent/target", temp.path().join("dangling")).unwrap();
        let host = HostFs::new(temp.path());
        assert!(host.exists(Path::new("/dangling")));
    }

    #[test]
    fn test_open_read_release() {
        let (_temp, host) = host_with_file("f", b"hello world");

        let fh = host.open(Path::new("/f"), libc::O_RDONLY as u32).unwrap();
        assert_eq!(host.open_files(), 1);
        assert_eq!(host.read(fh, 6, 100).unwrap(), b"world");
        assert_eq!(host.read(fh, 0, 5).unwrap(), b"hello");
        assert!(host.read(fh, 50, 10).unwrap().is_empty());

        host.release(fh).unwrap();
        assert_eq!(host.open_files(), 0);
        let err = host.read(fh, 0, 1).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }

    #[test]
    fn test_create_write_truncate() {
        let temp = TempDir::new().unwrap();
        let host = HostFs::new(temp.path());

        let fh = host
            .create(Path::new("/new"), 0o644, libc::O_WRONLY as u32)
            .unwrap();
        assert_eq!(host.write(fh, 0, b"abcdef").unwrap(), 6);
        host.flush(fh).unwrap();
        host.release(fh).unwrap();
        assert_eq!(std::fs::read(temp.path().join("new")).unwrap(), b"abcdef");

        host.truncate(Path::new("/new"), 3).unwrap();
        assert_eq!(std::fs::read(temp.path().join("new")).unwrap(), b"abc");
    }

    #[test]
    fn test_readdir_starts_with_dots() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("x"), b"").unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        let host = HostFs::new(temp.path());

        let entries = host.readdir(Path::new("/")).unwrap();
        assert_eq!(entries.len(), 4);
        assert_eq!(entries[0].name, ".");
        assert_eq!(entries[1].name, "..");

        let sub = entries.iter().find(|e| e.name == "sub").unwrap();
        assert_eq!(sub.kind, FileKind::Directory);
    }

    #[test]
    fn test_readdir_of_file_lists_only_dots() {
        let (_temp, host) = host_with_file("f", b"");
        let entries = host.readdir(Path::new("/f")).unwrap();
        assert_eq!(entries.len(), 2);
    }

    #[test]
    fn test_opendir_rejects_file() {
        let (_temp, host) = host_with_file("f", b"");
        assert_eq!(host.opendir(Path::new("/")).unwrap(), DIR_HANDLE);
        let err = host.opendir(Path::new("/f")).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOTDIR));
    }

    #[test]
    fn test_readlink_sanitizes_absolute_target() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("dir/target");
        std::os::unix::fs::symlink(&target, temp.path().join("abs")).unwrap();
        std::os::unix::fs::symlink("relative/t", temp.path().join("rel")).unwrap();
        let host = HostFs::new(temp.path());

        assert_eq!(host.readlink(Path::new("/abs")).unwrap(), "dir/target");
        assert_eq!(host.readlink(Path::new("/rel")).unwrap(), "relative/t");
    }

    #[test]
    fn test_relative_to() {
        assert_eq!(
            relative_to(Path::new("/a/b/c"), Path::new("/a")),
            PathBuf::from("b/c")
        );
        assert_eq!(
            relative_to(Path::new("/x/y"), Path::new("/a/b")),
            PathBuf::from("../../x/y")
        );
        assert_eq!(relative_to(Path::new("/a"), Path::new("/a")), PathBuf::from("."));
    }

    #[test]
    fn test_mkdir_rename_rmdir_unlink() {
        let temp = TempDir::new().unwrap();
        let host = HostFs::new(temp.path());

        host.mkdir(Path::new("/d"), 0o755).unwrap();
        host.rename(Path::new("/d"), Path::new("/e")).unwrap();
        assert!(host.exists(Path::new("/e")));
        host.rmdir(Path::new("/e")).unwrap();
        assert!(!host.exists(Path::new("/e")));

        std::fs::write(temp.path().join("f"), b"").unwrap();
        host.link(Path::new("/f"), Path::new("/g")).unwrap();
        assert_eq!(host.getattr(Path::new("/f")).unwrap().nlink, 2);
        host.unlink(Path::new("/g")).unwrap();
        assert_eq!(host.getattr(Path::new("/f")).unwrap().nlink, 1);
    }

    #[test]
    fn test_chmod_and_utimens() {
        let (_temp, host) = host_with_file("f", b"");
        host.chmod(Path::new("/f"), 0o600).unwrap();
        assert_eq!(host.getattr(Path::new("/f")).unwrap().perm, 0o600);

        let when = UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        host.utimens(Path::new("/f"), None, Some(when)).unwrap();
        assert_eq!(host.getattr(Path::new("/f")).unwrap().mtime, when);
    }

    #[test]
    fn test_access_existing_file() {
        let (_temp, host) = host_with_file("f", b"");
        assert!(host.access(Path::new("/f"), libc::F_OK as u32).unwrap());
        assert!(!host.access(Path::new("/missing"), libc::F_OK as u32).unwrap());
    }

    #[test]
    fn test_statfs() {
        let (_temp, host) = host_with_file("f", b"");
        let stats = host.statfs(Path::new("/")).unwrap();
        assert!(stats.bsize > 0);
        assert!(stats.namelen > 0);
    }

    #[test]
    fn test_xattr_lifecycle() {
        let (_temp, host) = host_with_file("f", b"");
        let path = Path::new("/f");
        let name = OsStr::new("user.pufs.origin");

        if let Err(e) = host.setxattr(path, name, b"a", 0) {
            // Backing filesystem without user xattrs
            assert_eq!(e.raw_os_error(), Some(libc::ENOTSUP));
            return;
        }

        assert_eq!(host.getxattr(path, name).unwrap(), b"a");
        let listing = host.listxattr(path).unwrap();
        assert!(listing
            .split(|b| *b == 0)
            .any(|entry| entry == b"user.pufs.origin"));
        assert_eq!(listing.last(), Some(&0));

        let exists = host.setxattr(path, name, b"b", libc::XATTR_CREATE).unwrap_err();
        assert_eq!(exists.raw_os_error(), Some(libc::EEXIST));
        host.setxattr(path, name, b"b", libc::XATTR_REPLACE).unwrap();
        assert_eq!(host.getxattr(path, name).unwrap(), b"b");

        host.removexattr(path, name).unwrap();
        let missing = host.getxattr(path, name).unwrap_err();
        assert_eq!(missing.raw_os_error(), Some(libc::ENODATA));
        let replace = host.setxattr(path, name, b"c", libc::XATTR_REPLACE).unwrap_err();
        assert_eq!(replace.raw_os_error(), Some(libc::ENODATA));
    }

    #[test]
    fn test_getxattr_missing_entry() {
        let (_temp, host) = host_with_file("f", b"");
        let err = host
            .getxattr(Path::new("/missing"), OsStr::new("user.any"))
            .unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::ENOENT));
    }

    #[test]
    fn test_fgetattr_follows_open_handle() {
        let (temp, host) = host_with_file("f", b"four");
        let fh = host.open(Path::new("/f"), libc::O_RDONLY as u32).unwrap();

        // The handle keeps answering after its path is gone.
        std::fs::remove_file(temp.path().join("f")).unwrap();
        let stat = host.fgetattr(fh).unwrap();
        assert_eq!(stat.size, 4);
        assert_eq!(stat.nlink, 0);

        host.release(fh).unwrap();
        let err = host.fgetattr(fh).unwrap_err();
        assert_eq!(err.raw_os_error(), Some(libc::EBADF));
    }
}
