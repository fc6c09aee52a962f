//! Per-root outcome of a dispatched call.

use std::io;

use crate::error::UnionError;

/// What one backing root contributed to a dispatched call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The root was filtered out before dispatch (it has no entry at the path,
    /// or holds no handle for the file).
    NotApplicable,
    /// The root's call returned a value.
    Success(T),
    /// The root's call raised an error.
    Failure(UnionError),
}

impl<T> Outcome<T> {
    /// Whether the root took part in the call.
    pub fn is_active(&self) -> bool {
        !matches!(self, Self::NotApplicable)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// The success value, if any.
    pub fn success(self) -> Option<T> {
        match self {
            Self::Success(value) => Some(value),
            _ => None,
        }
    }

    /// Short label used in log events.
    pub fn label(&self) -> &'static str {
        match self {
            Self::NotApplicable => "not_applicable",
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
        }
    }
}

impl<T> From<io::Result<T>> for Outcome<T> {
    fn from(result: io::Result<T>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(e) => Self::Failure(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_result() {
        let ok: Outcome<u32> = Ok(3).into();
        assert_eq!(ok, Outcome::Success(3));

        let err: Outcome<u32> = Err(io::Error::from_raw_os_error(libc::EIO)).into();
        assert_eq!(err, Outcome::Failure(UnionError::backing(libc::EIO)));
    }

    #[test]
    fn test_unit_success_is_active() {
        let done: Outcome<()> = Outcome::Success(());
        assert!(done.is_active());
        assert!(done.is_success());
        assert!(!Outcome::<()>::NotApplicable.is_active());
    }
}
