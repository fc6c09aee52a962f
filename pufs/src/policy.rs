//! Aggregation policies.
//!
//! A policy reduces the per-root outcomes of one dispatched call, in root
//! order, to the single result the caller sees. Reducers are pure apart from
//! logging: every outcome a reducer does not use (a trailing success, a
//! swallowed failure) is logged at debug level rather than dropped silently.

use tracing::debug;

use crate::dispatch::Outcome;
use crate::error::{UnionError, UnionResult};
use crate::ops::Operation;

/// Reduction rule bound to an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Value of the first success in root order.
    FirstSuccess,
    /// Concatenation of every success in root order.
    UnionConcat,
    /// Succeeds when at least one root answered `true`.
    RequireAllOrFail,
}

/// Whether the operation table reduces `op` with `policy`.
pub const fn bound_to(op: Operation, policy: Policy) -> bool {
    match op.binding() {
        Some(binding) => binding.policy as u8 == policy as u8,
        None => false,
    }
}

/// Value of the first [`Outcome::Success`] in root order.
///
/// Failures before the first success do not short-circuit. Later outcomes are
/// ignored (and logged). With no success at all the result is
/// [`UnionError::NotFound`]; swallowed failures are logged.
pub fn first_success<T>(op: Operation, outcomes: Vec<Outcome<T>>) -> UnionResult<T> {
    debug_assert!(bound_to(op, Policy::FirstSuccess), "{op} is not bound to first_success");
    let mut chosen: Option<(usize, T)> = None;
    let mut first_failure: Option<UnionError> = None;

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Outcome::NotApplicable => {}
            Outcome::Success(value) => {
                if let Some((winner, _)) = &chosen {
                    debug!(op = %op, root = index, winner = *winner, "Discarded trailing success");
                } else {
                    chosen = Some((index, value));
                }
            }
            Outcome::Failure(error) => {
                if chosen.is_some() {
                    debug!(op = %op, root = index, error = %error, "Ignored trailing failure");
                } else if first_failure.is_none() {
                    first_failure = Some(error);
                } else {
                    debug!(op = %op, root = index, error = %error, "Ignored failure");
                }
            }
        }
    }

    match (chosen, first_failure) {
        (Some((_, value)), failure) => {
            if let Some(error) = failure {
                debug!(op = %op, error = %error, "Failure superseded by a later success");
            }
            Ok(value)
        }
        (None, Some(error)) => {
            debug!(op = %op, error = %error, "No root succeeded");
            Err(UnionError::NotFound)
        }
        (None, None) => Err(UnionError::NotFound),
    }
}

/// Concatenation of every [`Outcome::Success`] sequence in root order.
///
/// No deduplication. Failures are skipped (and logged) unless no root
/// succeeded, in which case the first failure's error is returned. With no
/// active root the result is an empty sequence.
pub fn union_concat<T>(op: Operation, outcomes: Vec<Outcome<Vec<T>>>) -> UnionResult<Vec<T>> {
    debug_assert!(bound_to(op, Policy::UnionConcat), "{op} is not bound to union_concat");
    let mut merged = Vec::new();
    let mut any_success = false;
    let mut first_failure: Option<UnionError> = None;

    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Outcome::NotApplicable => {}
            Outcome::Success(items) => {
                any_success = true;
                merged.extend(items);
            }
            Outcome::Failure(error) => {
                debug!(op = %op, root = index, error = %error, "Skipped failed root");
                first_failure.get_or_insert(error);
            }
        }
    }

    match first_failure {
        Some(error) if !any_success => Err(error),
        _ => Ok(merged),
    }
}

/// Succeeds when at least one active outcome is `Success(true)`.
///
/// Failures count as denials. Zero active roots, or no truthy outcome, yields
/// [`UnionError::PermissionDenied`].
pub fn require_all_or_fail(op: Operation, outcomes: Vec<Outcome<bool>>) -> UnionResult<()> {
    debug_assert!(
        bound_to(op, Policy::RequireAllOrFail),
        "{op} is not bound to require_all_or_fail"
    );
    let mut granted = false;
    for (index, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Outcome::Success(true) => granted = true,
            Outcome::Success(false) => debug!(op = %op, root = index, "Root denied access"),
            Outcome::Failure(error) => {
                debug!(op = %op, root = index, error = %error, "Access check failed")
            }
            Outcome::NotApplicable => {}
        }
    }

    if granted {
        Ok(())
    } else {
        Err(UnionError::PermissionDenied)
    }
}
