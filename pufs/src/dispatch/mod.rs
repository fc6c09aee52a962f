//! Dispatch engine: gate, fan out, collect.
//!
//! A call on the mount flows through three stages:
//!
//! ```text
//!   call ──► Gate ──────► DispatchPool ──────► Vec<Outcome<T>> ──► policy
//!            (which        (one blocking        (one per root,
//!             roots)        sub-call per         in root order)
//!                           candidate root)
//! ```
//!
//! This module covers the first two stages and the [`Mount`] that owns them.
//! Reduction lives in [`crate::policy`].

mod gate;
mod mount;
mod outcome;
mod pool;

pub use gate::{candidate, Gate};
pub use mount::Mount;
pub use outcome::Outcome;
pub use pool::{DispatchPool, DEFAULT_THREADS_PER_ROOT};
