//! PUFS - Parallel union filesystem
//!
//! This library joins several independently mounted directory trees
//! ("backing roots") into one read-only FUSE view. Every filesystem request
//! is fanned out to the roots concurrently on a bounded worker pool, and the
//! per-root outcomes are reduced into one answer in root order.
//!
//! # Layers
//!
//! - [`backend`]: the [`BackingFs`](backend::BackingFs) capability trait, the
//!   host pass-through adapter and the tracing middleware
//! - [`dispatch`]: existence gate, worker pool and fan-out over a [`Mount`](dispatch::Mount)
//! - [`policy`]: reducers folding per-root outcomes into one result
//! - [`ops`]: the operation table and the union facade, [`UnionOps`](ops::UnionOps)
//! - [`fuse`]: fuse3 path filesystems for union and pass-through mounts
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use pufs::backend::{BackingFs, HostFs};
//! use pufs::dispatch::Mount;
//! use pufs::fuse::{Fuse3UnionFS, MountConfig};
//! use pufs::ops::UnionOps;
//!
//! let roots: Vec<Arc<dyn BackingFs>> = vec![
//!     Arc::new(HostFs::new("/srv/a")),
//!     Arc::new(HostFs::new("/srv/b")),
//! ];
//! let ops = Arc::new(UnionOps::new(Mount::new(roots, 10)));
//! let handle = Fuse3UnionFS::new(ops.clone())
//!     .mount("/mnt/union".as_ref(), &MountConfig::default())
//!     .await?;
//! handle.await?;
//! ops.shutdown().await;
//! ```

pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fuse;
pub mod logging;
pub mod ops;
pub mod policy;

/// Version of the PUFS library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
