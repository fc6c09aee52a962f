//! The mount: ordered backing roots plus the pool that serves them.

use std::io;
use std::path::Path;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{trace, warn};

use super::gate::{candidate, Gate};
use super::outcome::Outcome;
use super::pool::DispatchPool;
use crate::backend::BackingFs;
use crate::error::UnionError;
use crate::ops::Operation;

/// An ordered, immutable set of backing roots served by one worker pool.
///
/// Root order is the tie-break precedence of every reduction: outcomes are
/// always returned in this order, whatever order the sub-calls finish in.
pub struct Mount {
    roots: Vec<Arc<dyn BackingFs>>,
    pool: DispatchPool,
}

impl Mount {
    /// Create a mount over `roots` with `factor` concurrent sub-calls per root.
    pub fn new(roots: Vec<Arc<dyn BackingFs>>, factor: usize) -> Self {
        let pool = DispatchPool::new(roots.len(), factor);
        Self { roots, pool }
    }

    pub fn roots(&self) -> &[Arc<dyn BackingFs>] {
        &self.roots
    }

    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    pub fn pool(&self) -> &DispatchPool {
        &self.pool
    }

    /// Fan a path-based call out to every root and collect the outcomes.
    ///
    /// Under [`Gate::Exists`] the existence check runs on the worker, just
    /// before the call; roots without an entry at `path` yield
    /// [`Outcome::NotApplicable`]. Under [`Gate::Exempt`] every root is called.
    /// [`Gate::Handle`] calls belong to [`dispatch_handles`](Self::dispatch_handles);
    /// here they fail on every root with [`UnionError::Misrouted`] and no root
    /// is called.
    pub async fn dispatch<T, F>(
        &self,
        op: Operation,
        gate: Gate,
        path: &Path,
        call: F,
    ) -> Vec<Outcome<T>>
    where
        T: Send + 'static,
        F: Fn(&dyn BackingFs, &Path) -> io::Result<T> + Send + Sync + 'static,
    {
        let gated = match gate {
            Gate::Exists => true,
            Gate::Exempt => false,
            Gate::Handle => return self.misrouted(op, gate),
        };
        let call = Arc::new(call);
        trace!(op = %op, path = %path.display(), roots = self.roots.len(), "dispatch");

        let tasks = self.roots.iter().map(|root| {
            let root = Arc::clone(root);
            let call = Arc::clone(&call);
            let path = path.to_path_buf();
            self.pool.run(move || {
                if gated && !candidate(root.as_ref(), &path) {
                    return Outcome::NotApplicable;
                }
                call(root.as_ref(), &path).into()
            })
        });

        let outcomes = join_all(tasks).await;
        self.trace_outcomes(op, &outcomes);
        outcomes
    }

    /// Fan a handle-based call out to the roots holding a backing handle.
    ///
    /// `handles[i]` is root `i`'s backing handle; roots without one yield
    /// [`Outcome::NotApplicable`] and are not called. Only [`Gate::Handle`]
    /// operations are served; any other gate fails on every root.
    pub async fn dispatch_handles<T, F>(
        &self,
        op: Operation,
        gate: Gate,
        handles: &[Option<u64>],
        call: F,
    ) -> Vec<Outcome<T>>
    where
        T: Send + 'static,
        F: Fn(&dyn BackingFs, u64) -> io::Result<T> + Send + Sync + 'static,
    {
        if gate != Gate::Handle {
            return self.misrouted(op, gate);
        }
        let call = Arc::new(call);
        trace!(op = %op, handles = ?handles, "dispatch");

        let tasks = self.roots.iter().enumerate().map(|(index, root)| {
            let root = Arc::clone(root);
            let call = Arc::clone(&call);
            let handle = handles.get(index).copied().flatten();
            async move {
                match handle {
                    Some(fh) => self.pool.run(move || call(root.as_ref(), fh).into()).await,
                    None => Outcome::NotApplicable,
                }
            }
        });

        let outcomes = join_all(tasks).await;
        self.trace_outcomes(op, &outcomes);
        outcomes
    }

    /// Stop the pool, waiting for in-flight sub-calls.
    pub async fn shutdown(&self) {
        self.pool.shutdown().await;
    }

    fn misrouted<T>(&self, op: Operation, gate: Gate) -> Vec<Outcome<T>> {
        warn!(op = %op, gate = ?gate, "Dispatched through the wrong gate");
        self.roots
            .iter()
            .map(|_| Outcome::Failure(UnionError::Misrouted(op)))
            .collect()
    }

    fn trace_outcomes<T>(&self, op: Operation, outcomes: &[Outcome<T>]) {
        for (root, outcome) in self.roots.iter().zip(outcomes) {
            trace!(
                op = %op,
                root = %root.root().display(),
                outcome = outcome.label(),
                "sub-call finished"
            );
        }
    }
}
