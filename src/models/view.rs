//! Computed timeline views.
//!
//! Views are derived on every read from the catalog, the completion date
//! and the override patch. They are never persisted and never mutated in
//! place by the calculator; the reconciler only reorders them between
//! columns.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};

use super::TaskDuration;

/// Progress status of a phase.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum PhaseStatus {
    /// No task completed.
    #[default]
    Pending,
    /// Some, but not all, tasks completed.
    InProgress,
    /// Every task completed.
    Completed,
}

impl PhaseStatus {
    /// Derives the status from task counts.
    pub fn from_counts(completed: usize, total: usize) -> Self {
        if completed == 0 {
            Self::Pending
        } else if completed >= total {
            Self::Completed
        } else {
            Self::InProgress
        }
    }
}

/// Titles of tasks and phases marked complete elsewhere in the system.
///
/// A task whose title is in the set is locked for drag/drop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompletionMarkers {
    titles: HashSet<String>,
}

impl CompletionMarkers {
    /// Creates an empty marker set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a completed title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.titles.insert(title.into());
        self
    }

    /// Marks a title as complete.
    pub fn insert(&mut self, title: impl Into<String>) {
        self.titles.insert(title.into());
    }

    /// Whether a title is marked complete.
    pub fn contains(&self, title: &str) -> bool {
        self.titles.contains(title)
    }

    /// Number of marked titles.
    pub fn len(&self) -> usize {
        self.titles.len()
    }

    /// Whether nothing is marked.
    pub fn is_empty(&self) -> bool {
        self.titles.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CompletionMarkers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self {
            titles: iter.into_iter().map(Into::into).collect(),
        }
    }
}

/// A task as displayed in a phase column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskView {
    /// Task key.
    pub key: String,
    /// Display title.
    pub title: String,
    /// Phase the task belongs to in the catalog.
    pub native_phase: String,
    /// Phase the task is shown under.
    pub phase: String,
    /// Computed start date.
    pub start: NaiveDate,
    /// Computed end date.
    pub end: NaiveDate,
    /// Effective duration (custom duration applied).
    pub duration: TaskDuration,
    /// Responsible roles.
    pub roles: BTreeSet<String>,
    /// Template note.
    pub note: Option<String>,
    /// Whether the title is marked complete.
    pub completed: bool,
    /// Whether the end date is pinned by an override.
    pub pinned: bool,
}

impl TaskView {
    /// Whether the task sits outside its native phase.
    pub fn is_reassigned(&self) -> bool {
        self.phase != self.native_phase
    }

    /// Completed tasks cannot be dragged.
    pub fn is_locked(&self) -> bool {
        self.completed
    }
}

/// A phase with concrete dates, tasks and progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhaseView {
    /// Phase key.
    pub key: String,
    /// Display title.
    pub title: String,
    /// Ordinal position in the catalog.
    pub position: usize,
    /// Start date (override applied).
    pub start: NaiveDate,
    /// End date (override applied).
    pub end: NaiveDate,
    /// Operator note from the override.
    pub note: Option<String>,
    /// Tasks in display order.
    pub tasks: Vec<TaskView>,
    /// Progress status.
    pub status: PhaseStatus,
    /// Completed task count (implicit task included).
    pub completed_count: usize,
    /// Total task count (at least one).
    pub total_count: usize,
    /// Not completed and ended before today.
    pub overdue: bool,
    /// Not completed, not overdue, ends within the lookahead window.
    pub upcoming: bool,
    /// Whether a non-empty override entry exists for the phase.
    pub has_override: bool,
}

impl PhaseView {
    /// Looks up a task by key.
    pub fn task(&self, key: &str) -> Option<&TaskView> {
        self.tasks.iter().find(|t| t.key == key)
    }

    /// Task keys in display order.
    pub fn task_keys(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.key.as_str()).collect()
    }

    /// Fraction of completed tasks (0.0..1.0).
    pub fn progress(&self) -> f64 {
        if self.total_count == 0 {
            0.0
        } else {
            self.completed_count as f64 / self.total_count as f64
        }
    }
}
