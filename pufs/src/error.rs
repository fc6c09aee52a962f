//! Error taxonomy for union operations.
//!
//! Every error surfaced by the union layer maps onto a single errno value
//! through [`UnionError::errno`], which is what the FUSE layer reports to
//! the calling process.

use std::io;
use thiserror::Error;

use crate::ops::Operation;

/// Result type for union operations.
pub type UnionResult<T> = Result<T, UnionError>;

/// Errors produced by the dispatch-and-aggregation engine.
///
/// `NotApplicable` is deliberately absent: a root that fails the existence
/// gate is represented by [`Outcome::NotApplicable`](crate::dispatch::Outcome)
/// and never escalates to an error.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UnionError {
    /// No candidate root produced a result.
    #[error("No such file or directory")]
    NotFound,

    /// No candidate root granted the requested access.
    #[error("Permission denied")]
    PermissionDenied,

    /// Host error raised by a single backing root, propagated verbatim.
    #[error("Backing filesystem error: {message} (errno {code})")]
    Backing { code: i32, message: String },

    /// Operation is not wired through the union facade.
    #[error("Operation not supported: {0}")]
    Unsupported(Operation),

    /// A wired operation was answered as if it had no binding.
    #[error("Operation is wired and cannot be rejected: {0}")]
    Misrouted(Operation),

    /// Union file handle is not known to the mount.
    #[error("Bad file handle: {0}")]
    BadHandle(u64),

    /// The worker pool has been shut down.
    #[error("Worker pool is closed")]
    PoolClosed,

    /// A worker task panicked before producing an outcome.
    #[error("Worker task panicked: {0}")]
    TaskPanicked(String),
}

impl UnionError {
    /// Create a backing error from a raw errno value.
    pub fn backing(code: i32) -> Self {
        Self::Backing {
            code,
            message: io::Error::from_raw_os_error(code).to_string(),
        }
    }

    /// The errno reported to the mounting layer.
    pub fn errno(&self) -> i32 {
        match self {
            Self::NotFound => libc::ENOENT,
            Self::PermissionDenied => libc::EACCES,
            Self::Backing { code, .. } => *code,
            Self::Unsupported(_) => libc::ENOTSUP,
            Self::Misrouted(_) => libc::EIO,
            Self::BadHandle(_) => libc::EBADF,
            Self::PoolClosed => libc::ESHUTDOWN,
            Self::TaskPanicked(_) => libc::EIO,
        }
    }
}

impl From<io::Error> for UnionError {
    fn from(e: io::Error) -> Self {
        match e.raw_os_error() {
            Some(code) => Self::backing(code),
            None => Self::Backing {
                code: libc::EIO,
                message: e.to_string(),
            },
        }
    }
}

impl From<UnionError> for fuse3::Errno {
    fn from(e: UnionError) -> Self {
        fuse3::Errno::from(e.errno())
    }
}
