//! Timeline progress summary.
//!
//! Rolls the per-phase views up into the numbers a project dashboard
//! shows.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Phase counts | Phases per status |
//! | Overdue / Upcoming | Phases carrying each alert flag |
//! | Task progress | Completed tasks / total tasks (implicit tasks included) |
//! | Current phase | First phase, in catalog order, that is not completed |
//! | Span | Earliest start to latest end |

use chrono::NaiveDate;

use crate::models::{PhaseStatus, PhaseView};

/// Project-level progress indicators.
#[derive(Debug, Clone, PartialEq)]
pub struct TimelineSummary {
    /// Number of phases.
    pub total_phases: usize,
    /// Phases with no completed task.
    pub pending_phases: usize,
    /// Phases partially completed.
    pub in_progress_phases: usize,
    /// Phases fully completed.
    pub completed_phases: usize,
    /// Phases flagged overdue.
    pub overdue_phases: usize,
    /// Phases flagged upcoming.
    pub upcoming_phases: usize,
    /// Completed tasks across all phases.
    pub completed_tasks: usize,
    /// Tasks across all phases.
    pub total_tasks: usize,
    /// Fraction of completed tasks (0.0..1.0).
    pub progress: f64,
    /// Key of the first phase that is not completed.
    pub current_phase: Option<String>,
    /// Earliest phase start.
    pub start: Option<NaiveDate>,
    /// Latest phase end.
    pub end: Option<NaiveDate>,
}

impl TimelineSummary {
    /// Computes the summary of a timeline.
    ///
    /// An empty timeline (no completion date) yields zero counts and no
    /// current phase.
    pub fn calculate(views: &[PhaseView]) -> Self {
        let mut pending = 0;
        let mut in_progress = 0;
        let mut completed = 0;
        for view in views {
            match view.status {
                PhaseStatus::Pending => pending += 1,
                PhaseStatus::InProgress => in_progress += 1,
                PhaseStatus::Completed => completed += 1,
            }
        }

        let completed_tasks: usize = views.iter().map(|v| v.completed_count).sum();
        let total_tasks: usize = views.iter().map(|v| v.total_count).sum();
        let progress = if total_tasks == 0 {
            0.0
        } else {
            completed_tasks as f64 / total_tasks as f64
        };

        Self {
            total_phases: views.len(),
            pending_phases: pending,
            in_progress_phases: in_progress,
            completed_phases: completed,
            overdue_phases: views.iter().filter(|v| v.overdue).count(),
            upcoming_phases: views.iter().filter(|v| v.upcoming).count(),
            completed_tasks,
            total_tasks,
            progress,
            current_phase: views
                .iter()
                .find(|v| v.status != PhaseStatus::Completed)
                .map(|v| v.key.clone()),
            start: views.iter().map(|v| v.start).min(),
            end: views.iter().map(|v| v.end).max(),
        }
    }

    /// Whether no phase is overdue.
    pub fn is_on_track(&self) -> bool {
        self.overdue_phases == 0
    }

    /// Whether every phase is completed.
    pub fn is_finished(&self) -> bool {
        self.total_phases > 0 && self.completed_phases == self.total_phases
    }
}
