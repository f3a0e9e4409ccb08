//! Error types.
//!
//! Malformed input (a bad completion date, a corrupt override blob) never
//! shows up here: it degrades to an empty result instead. The errors below
//! cover the three places a caller has to branch:
//!
//! - [`CatalogError`]: a catalog failed structural validation
//! - [`DragRejection`]: a drag could not be picked up or finished
//! - [`PersistenceError`]: the override patch could not be saved

use thiserror::Error;

use crate::validation::ValidationError;

/// A catalog failed validation.
#[derive(Debug, Clone, Error, PartialEq)]
#[error("invalid phase catalog: {} problem(s), first: {}", .errors.len(), first_message(.errors))]
pub struct CatalogError {
    errors: Vec<ValidationError>,
}

impl CatalogError {
    /// Every problem found.
    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }
}

impl From<Vec<ValidationError>> for CatalogError {
    fn from(errors: Vec<ValidationError>) -> Self {
        Self { errors }
    }
}

fn first_message(errors: &[ValidationError]) -> &str {
    errors.first().map_or("none", |e| e.message.as_str())
}

/// Why a drag gesture was refused by the reconciler.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DragRejection {
    /// The task's title is marked complete.
    #[error("task '{0}' is completed and locked")]
    Locked(String),

    /// The task is not on the board.
    #[error("task '{0}' is not on the board")]
    UnknownTask(String),

    /// Another drag is already in progress.
    #[error("a drag of '{0}' is already in progress")]
    AlreadyDragging(String),

    /// A drop or move was issued with no drag in progress.
    #[error("no drag in progress")]
    NotDragging,
}

/// Persistence failures.
///
/// Reported to the caller and logged; the board is never rolled back and
/// the save is not retried automatically.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PersistenceError {
    /// Transport-level failure (network, storage).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The save did not resolve within the configured timeout.
    #[error("save timed out after {timeout_ms} ms")]
    Timeout {
        /// Configured timeout.
        timeout_ms: u64,
    },

    /// The patch could not be serialized.
    #[error("patch encoding failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::ValidationErrorKind;

    #[test]
    fn test_catalog_error_message() {
        let err = CatalogError::from(vec![ValidationError {
            kind: ValidationErrorKind::DuplicateKey,
            message: "Duplicate phase key: A".into(),
        }]);
        assert_eq!(
            err.to_string(),
            "invalid phase catalog: 1 problem(s), first: Duplicate phase key: A"
        );
    }

    #[test]
    fn test_persistence_error_display() {
        let err = PersistenceError::Timeout { timeout_ms: 500 };
        assert_eq!(err.to_string(), "save timed out after 500 ms");
        assert_eq!(
            DragRejection::Locked("a1".into()).to_string(),
            "task 'a1' is completed and locked"
        );
    }
}
