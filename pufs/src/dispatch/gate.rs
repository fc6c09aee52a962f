//! Existence gate: which roots a call is sent to.

use std::path::Path;

use crate::backend::BackingFs;

/// How candidate roots are chosen for an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// Only roots that have an entry at the call's path.
    Exists,
    /// Every root (lifecycle hooks).
    Exempt,
    /// Only roots holding a backing handle for the call's union file handle.
    Handle,
}

/// Whether `root` is a candidate for a call on `path`.
pub fn candidate(root: &dyn BackingFs, path: &Path) -> bool {
    root.exists(path)
}
