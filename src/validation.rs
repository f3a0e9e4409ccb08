//! Structural validation for catalogs and override patches.
//!
//! Checks integrity before the calculator or reconciler trust the data.
//! Detects:
//! - Duplicate or empty phase keys
//! - Task keys used by more than one phase
//! - A sink phase that does not exist
//! - Patch entries pointing at unknown phases or tasks
//! - Sink tasks reassigned out of the sink
//!
//! Catalog problems are fatal (the catalog is refused). Patch problems are
//! advisory: the calculator ignores the offending entries and the
//! reconciler logs them.

use crate::models::{OverridePatch, Phase, PhaseCatalog};
use std::collections::HashSet;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same key.
    DuplicateKey,
    /// A phase or task has an empty key.
    EmptyKey,
    /// The sink phase is not in the catalog.
    UnknownSink,
    /// A patch entry references a phase that doesn't exist.
    UnknownPhase,
    /// A patch entry references a task that doesn't exist.
    UnknownTask,
    /// A task native to the sink phase is assigned out of it.
    SinkRelease,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// Validates a phase list before it becomes a catalog.
///
/// Checks:
/// 1. No empty phase or task keys
/// 2. No duplicate phase keys
/// 3. No task key shared between (or within) phases
/// 4. The sink, if named, is one of the phases
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_catalog(phases: &[Phase], sink: Option<&str>) -> ValidationResult {
    let mut errors = Vec::new();
    let mut phase_keys = HashSet::new();
    let mut task_keys = HashSet::new();

    for phase in phases {
        if phase.key.is_empty() {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyKey,
                format!("Phase '{}' has an empty key", phase.title),
            ));
        }
        if !phase_keys.insert(phase.key.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateKey,
                format!("Duplicate phase key: {}", phase.key),
            ));
        }

        for task in &phase.tasks {
            if task.key.is_empty() {
                errors.push(ValidationError::new(
                    ValidationErrorKind::EmptyKey,
                    format!("Task '{}' in phase '{}' has an empty key", task.title, phase.key),
                ));
            }
            if !task_keys.insert(task.key.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::DuplicateKey,
                    format!("Duplicate task key: {}", task.key),
                ));
            }
        }
    }

    if let Some(sink) = sink {
        if !phase_keys.contains(sink) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownSink,
                format!("Sink phase '{sink}' is not in the catalog"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validates an override patch against a catalog.
///
/// Checks:
/// 1. Every phase entry names a catalog phase
/// 2. Ordered, skipped, custom-duration and fixed-date keys name catalog tasks
/// 3. Every reassignment names a catalog task and a catalog phase
/// 4. No task native to the sink phase is assigned elsewhere
pub fn validate_patch(catalog: &PhaseCatalog, patch: &OverridePatch) -> ValidationResult {
    let mut errors = Vec::new();

    for (phase_key, entry) in &patch.phases {
        if catalog.phase(phase_key).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownPhase,
                format!("Override for unknown phase '{phase_key}'"),
            ));
        }

        let referenced = entry
            .sub_phase_order
            .iter()
            .flatten()
            .chain(entry.skipped_sub_phases.iter())
            .chain(entry.custom_durations.keys())
            .chain(entry.fixed_dates.keys());
        let mut seen = HashSet::new();
        for task_key in referenced {
            if catalog.task(task_key).is_none() && seen.insert(task_key.as_str()) {
                errors.push(ValidationError::new(
                    ValidationErrorKind::UnknownTask,
                    format!("Override for phase '{phase_key}' references unknown task '{task_key}'"),
                ));
            }
        }
    }

    for (task_key, phase_key) in &patch.task_assignments {
        let Some(native) = catalog.native_phase_of(task_key) else {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownTask,
                format!("Assignment of unknown task '{task_key}'"),
            ));
            continue;
        };
        if catalog.phase(phase_key).is_none() {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownPhase,
                format!("Task '{task_key}' assigned to unknown phase '{phase_key}'"),
            ));
            continue;
        }
        if catalog.is_sink(native) && native != phase_key {
            errors.push(ValidationError::new(
                ValidationErrorKind::SinkRelease,
                format!("Task '{task_key}' assigned out of sink phase '{native}'"),
            ));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
