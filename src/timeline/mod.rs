//! Timeline computation and progress summaries.
//!
//! Turns a completion date and an override patch into concrete phase and
//! task dates, then attaches progress (status, overdue/upcoming flags)
//! relative to "today".
//!
//! # Usage
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use u_timeline::models::{CompletionMarkers, PhaseCatalog};
//! use u_timeline::store;
//! use u_timeline::timeline::{ProgressContext, TimelineCalculator, TimelineSummary};
//!
//! let calculator = TimelineCalculator::new(Arc::new(PhaseCatalog::standard()));
//! let patch = store::parse(Some(r#"{"design":{"note":"client abroad in May"}}"#));
//! let context = ProgressContext::at(NaiveDate::from_ymd_opt(2026, 5, 1).unwrap())
//!     .with_markers(CompletionMarkers::new().with_title("Requirements hearing"));
//!
//! let views = calculator.compute("2027-03", &patch, &context);
//! let summary = TimelineSummary::calculate(&views);
//! assert_eq!(summary.total_phases, 5);
//! ```

mod calculator;
mod completion;
mod summary;

pub use calculator::TimelineCalculator;
pub use completion::parse_completion_date;
pub use summary::TimelineSummary;

use chrono::{Local, NaiveDate};

use crate::models::CompletionMarkers;

/// Progress inputs that change independently of the schedule.
#[derive(Debug, Clone)]
pub struct ProgressContext {
    /// The date alerts are evaluated against.
    pub today: NaiveDate,
    /// Titles marked complete.
    pub completed: CompletionMarkers,
}

impl ProgressContext {
    /// Creates a context for the given day with nothing completed.
    pub fn at(today: NaiveDate) -> Self {
        Self {
            today,
            completed: CompletionMarkers::new(),
        }
    }

    /// Creates a context for the local current date.
    pub fn today() -> Self {
        Self::at(Local::now().date_naive())
    }

    /// Sets the completion markers.
    pub fn with_markers(mut self, completed: CompletionMarkers) -> Self {
        self.completed = completed;
        self
    }
}
