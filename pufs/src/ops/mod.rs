//! Operation facade.
//!
//! Binds every filesystem operation to a gate and an aggregation policy
//! ([`Operation::binding`]) and exposes the wired ones as async methods on
//! [`UnionOps`]. Operations without a binding surface
//! [`UnionError::Unsupported`](crate::error::UnionError::Unsupported)
//! without dispatching to any root.

mod handles;
mod operation;
mod union;

pub use handles::{HandleTable, OpenFile};
pub use operation::{Binding, Operation};
pub use union::UnionOps;
