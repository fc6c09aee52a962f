//! Async FUSE filesystems built on fuse3's path-based API.
//!
//! Two filesystems share the conversions in [`shared`] and the mount
//! plumbing in [`mount`](mod@mount):
//!
//! - [`Fuse3UnionFS`] - N roots, parallel dispatch, read-only
//! - [`Fuse3PassthroughFS`] - one root, 1:1, read/write
//!
//! # Architecture
//!
//! ```text
//! kernel                  Tokio runtime (multi-threaded)
//!    │                              │
//!    ├── getattr(/f) ──────────────►├── Fuse3UnionFS ──► UnionOps ──► roots in parallel
//!    ├── readdir(/) ───────────────►├── Fuse3UnionFS ──► UnionOps ──► roots in parallel
//!    │   [requests run concurrently]│
//!    │◄── responses ────────────────┤
//! ```

mod mount;
mod passthrough_fs;
pub mod shared;
mod types;
mod union_fs;

pub use mount::{MountConfig, FS_NAME};
pub use passthrough_fs::Fuse3PassthroughFS;
pub use shared::TTL;
pub use types::{force_unmount, is_mounted, Fuse3Error, Fuse3Result, MountHandle};
pub use union_fs::Fuse3UnionFS;
