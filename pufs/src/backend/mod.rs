//! Backing adapters: one filesystem call, one root.
//!
//! A backing adapter forwards each filesystem operation to the host,
//! scoped to a single root directory. The union engine never touches
//! paths itself; it only calls through the [`BackingFs`] capability
//! interface.
//!
//! # Implementations
//!
//! - [`HostFs`] - Forwards every call to the host filesystem under one root
//! - [`TracedFs`] - Decorator that logs every call and delays it

mod host;
mod traced;
mod traits;
mod types;

pub use host::HostFs;
pub use traced::TracedFs;
pub use traits::BackingFs;
pub use types::{DirEntry, FileKind, Stat, StatFs};

use std::path::{Component, Path, PathBuf};

/// Resolve a mount-relative path against a root directory.
///
/// The leading `/` of the mount-relative path is dropped so that the result
/// always stays under `root`. `..` components cannot climb above the root.
pub fn resolve_under(root: &Path, partial: &Path) -> PathBuf {
    let mut full = root.to_path_buf();
    let mut depth = 0usize;
    for component in partial.components() {
        match component {
            Component::Normal(name) => {
                full.push(name);
                depth += 1;
            }
            Component::ParentDir if depth > 0 => {
                full.pop();
                depth -= 1;
            }
            _ => {}
        }
    }
    full
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_strips_leading_slash() {
        let full = resolve_under(Path::new("/srv/a"), Path::new("/dir/file"));
        assert_eq!(full, PathBuf::from("/srv/a/dir/file"));
    }

    #[test]
    fn test_resolve_root() {
        let full = resolve_under(Path::new("/srv/a"), Path::new("/"));
        assert_eq!(full, PathBuf::from("/srv/a"));
    }

    #[test]
    fn test_resolve_cannot_escape_root() {
        let full = resolve_under(Path::new("/srv/a"), Path::new("/../../etc/passwd"));
        assert_eq!(full, PathBuf::from("/srv/a/etc/passwd"));

        let full = resolve_under(Path::new("/srv/a"), Path::new("/x/../y"));
        assert_eq!(full, PathBuf::from("/srv/a/y"));
    }
}
