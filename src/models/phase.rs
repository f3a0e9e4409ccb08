//! Phase and task template models.
//!
//! A phase is one stage of the fixed project workflow. It may be broken
//! down into an ordered list of task templates, each with a nominal
//! duration and the roles responsible for it.
//!
//! # Duration Model
//!
//! Durations are whole days in one of two units:
//! - **Business days**: weekends and calendar holidays are skipped
//! - **Calendar days**: every day counts

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Unit of a task duration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "camelCase")]
pub enum DurationUnit {
    /// Monday to Friday, minus holidays.
    #[default]
    BusinessDays,
    /// Every day.
    CalendarDays,
}

/// Nominal length of a task or phase.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TaskDuration {
    /// Number of days.
    pub amount: u32,
    /// How the days are counted.
    pub unit: DurationUnit,
}

impl TaskDuration {
    /// Creates a duration.
    pub fn new(amount: u32, unit: DurationUnit) -> Self {
        Self { amount, unit }
    }

    /// Creates a duration counted in business days.
    pub fn business_days(amount: u32) -> Self {
        Self::new(amount, DurationUnit::BusinessDays)
    }

    /// Creates a duration counted in calendar days.
    pub fn calendar_days(amount: u32) -> Self {
        Self::new(amount, DurationUnit::CalendarDays)
    }

    /// Same unit, different amount.
    pub fn with_amount(self, amount: u32) -> Self {
        Self { amount, ..self }
    }
}

/// A sub-task belonging to exactly one phase of the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskTemplate {
    /// Unique task key (unique across the whole catalog).
    pub key: String,
    /// Display title. Completion markers match against this.
    pub title: String,
    /// Nominal duration.
    pub duration: TaskDuration,
    /// Responsible role tags.
    pub roles: BTreeSet<String>,
    /// Free-text guidance.
    pub note: Option<String>,
}

impl TaskTemplate {
    /// Creates a task template with a zero duration.
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            duration: TaskDuration::default(),
            roles: BTreeSet::new(),
            note: None,
        }
    }

    /// Sets the duration.
    pub fn with_duration(mut self, duration: TaskDuration) -> Self {
        self.duration = duration;
        self
    }

    /// Adds a responsible role.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.roles.insert(role.into());
        self
    }

    /// Sets the note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

/// One stage of the workflow.
///
/// The position of a phase is its index in the owning
/// [`PhaseCatalog`](super::PhaseCatalog); it is not stored here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Phase {
    /// Unique phase key.
    pub key: String,
    /// Display title.
    pub title: String,
    /// Ordered sub-tasks. Empty for phases without a breakdown.
    pub tasks: Vec<TaskTemplate>,
    /// Length used when the phase ends up with no tasks.
    pub duration: TaskDuration,
}

impl Phase {
    /// Creates a phase with no tasks and a zero duration.
    pub fn new(key: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            title: title.into(),
            tasks: Vec::new(),
            duration: TaskDuration::default(),
        }
    }

    /// Adds a task template.
    pub fn with_task(mut self, task: TaskTemplate) -> Self {
        self.tasks.push(task);
        self
    }

    /// Sets the fallback duration.
    pub fn with_duration(mut self, duration: TaskDuration) -> Self {
        self.duration = duration;
        self
    }

    /// Looks up a task template by key.
    pub fn task(&self, key: &str) -> Option<&TaskTemplate> {
        self.tasks.iter().find(|t| t.key == key)
    }

    /// Task keys in catalog order.
    pub fn task_keys(&self) -> impl Iterator<Item = &str> {
        self.tasks.iter().map(|t| t.key.as_str())
    }

    /// Whether the phase has a sub-task breakdown.
    pub fn has_tasks(&self) -> bool {
        !self.tasks.is_empty()
    }
}
