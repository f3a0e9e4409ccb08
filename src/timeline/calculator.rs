//! Backward timeline calculator.
//!
//! # Algorithm
//!
//! 1. Anchor the end of the last phase at the completion date.
//! 2. Walk the catalog in reverse. For each phase, resolve its task list
//!    and walk the tasks in reverse, subtracting each duration to get the
//!    task start; that start is the next (earlier) task's end.
//! 3. The phase spans the envelope of its tasks, or its fallback duration
//!    when it has none. Its computed start is the end of the previous
//!    phase.
//! 4. On top of the chain: pinned task end dates, then explicit phase
//!    start/end dates. Neither shifts the chain, so neighbours of an
//!    overridden phase keep their computed dates.
//!
//! # Task Set Resolution
//!
//! catalog tasks − tasks reassigned away + tasks reassigned in, ordered by
//! `subPhaseOrder` (unlisted tasks keep their relative order at the end),
//! minus `skippedSubPhases`.
//!
//! # Complexity
//! O(p · t) where p=phases, t=tasks per phase (plus the order lookups).

use chrono::{Days, NaiveDate};
use std::sync::Arc;
use tracing::{debug, warn};

use super::{parse_completion_date, ProgressContext};
use crate::config::PlannerConfig;
use crate::models::{
    Calendar, OverridePatch, Phase, PhaseCatalog, PhaseStatus, PhaseView, TaskDuration,
    TaskTemplate, TaskView,
};

/// Derives phase and task dates from a completion date and an override
/// patch.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use u_timeline::models::{OverridePatch, PhaseCatalog};
/// use u_timeline::timeline::{ProgressContext, TimelineCalculator};
///
/// let calculator = TimelineCalculator::new(Arc::new(PhaseCatalog::standard()));
/// let context = ProgressContext::at(chrono::NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
/// let views = calculator.compute("2026-12-25", &OverridePatch::new(), &context);
/// assert_eq!(views.last().unwrap().key, "construction");
/// assert!(calculator.compute("someday", &OverridePatch::new(), &context).is_empty());
/// ```
#[derive(Debug, Clone)]
pub struct TimelineCalculator {
    catalog: Arc<PhaseCatalog>,
    calendar: Calendar,
    config: PlannerConfig,
}

/// Task with its dates, before progress is attached.
struct TaskSpan<'a> {
    template: &'a TaskTemplate,
    native_phase: &'a str,
    duration: TaskDuration,
    start: NaiveDate,
    end: NaiveDate,
    pinned: bool,
}

impl TimelineCalculator {
    /// Creates a calculator with the weekday calendar and default config.
    pub fn new(catalog: Arc<PhaseCatalog>) -> Self {
        Self {
            catalog,
            calendar: Calendar::weekdays(),
            config: PlannerConfig::default(),
        }
    }

    /// Sets the business-day calendar.
    pub fn with_calendar(mut self, calendar: Calendar) -> Self {
        self.calendar = calendar;
        self
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// The catalog this calculator walks.
    pub fn catalog(&self) -> &Arc<PhaseCatalog> {
        &self.catalog
    }

    /// Computes the timeline from a raw completion date.
    ///
    /// An unparsable date yields an empty timeline.
    pub fn compute(
        &self,
        completion: &str,
        patch: &OverridePatch,
        context: &ProgressContext,
    ) -> Vec<PhaseView> {
        match parse_completion_date(completion) {
            Some(date) => self.compute_from(date, patch, context),
            None => {
                warn!(completion = %completion, "Unparsable completion date, no timeline");
                Vec::new()
            }
        }
    }

    /// Computes the timeline from a completion date.
    pub fn compute_from(
        &self,
        completion: NaiveDate,
        patch: &OverridePatch,
        context: &ProgressContext,
    ) -> Vec<PhaseView> {
        let mut views = Vec::with_capacity(self.catalog.len());
        let mut cursor = completion;

        for (position, phase) in self.catalog.phases().iter().enumerate().rev() {
            let tasks = self.resolve_tasks(phase, patch);
            let phase_end = cursor;

            // Backward chain through the tasks
            let mut spans: Vec<TaskSpan<'_>> = Vec::with_capacity(tasks.len());
            let mut task_cursor = phase_end;
            for (template, native_phase) in tasks.into_iter().rev() {
                let duration = self.effective_duration(template, &phase.key, native_phase, patch);
                let start = self.calendar.start_for(task_cursor, duration);
                spans.push(TaskSpan {
                    template,
                    native_phase,
                    duration,
                    start,
                    end: task_cursor,
                    pinned: false,
                });
                task_cursor = start;
            }
            spans.reverse();

            let chained_start = if spans.is_empty() {
                self.calendar.start_for(phase_end, phase.duration)
            } else {
                task_cursor
            };
            cursor = chained_start;

            // Pinned task dates on top of the chain
            for span in &mut spans {
                if let Some(fixed) =
                    fixed_date(patch, &span.template.key, &phase.key, span.native_phase)
                {
                    span.end = fixed;
                    span.start = self.calendar.start_for(fixed, span.duration);
                    span.pinned = true;
                }
            }

            let (mut start, mut end) = envelope(&spans).unwrap_or((chained_start, phase_end));

            let entry = patch.phase(&phase.key);
            if let Some(entry) = entry {
                if let Some(date) = entry.start_date {
                    start = date;
                }
                if let Some(date) = entry.end_date {
                    end = date;
                }
            }

            views.push(self.build_view(position, phase, start, end, spans, patch, context));
        }

        views.reverse();
        debug!(
            completion = %completion,
            phases = views.len(),
            "Computed timeline"
        );
        views
    }

    /// Resolves the tasks shown under a phase, paired with each task's
    /// native phase key.
    pub fn resolve_tasks<'a>(
        &'a self,
        phase: &'a Phase,
        patch: &OverridePatch,
    ) -> Vec<(&'a TaskTemplate, &'a str)> {
        // Native tasks that stay, then tasks moved in (catalog order)
        let mut members: Vec<(&TaskTemplate, &str)> = Vec::new();
        for owner in self.catalog.phases() {
            for task in &owner.tasks {
                if self.destination(&task.key, &owner.key, patch) == phase.key {
                    members.push((task, owner.key.as_str()));
                }
            }
        }
        members.sort_by_key(|(_, owner)| *owner != phase.key);

        let Some(entry) = patch.phase(&phase.key) else {
            return members;
        };

        if let Some(order) = &entry.sub_phase_order {
            members.sort_by_key(|(task, _)| {
                order
                    .iter()
                    .position(|k| *k == task.key)
                    .unwrap_or(usize::MAX)
            });
        }
        members.retain(|(task, _)| !entry.is_skipped(&task.key));
        members
    }

    /// Phase a task is shown under: its assignment when that names a
    /// catalog phase, its native phase otherwise.
    fn destination<'a>(
        &'a self,
        task_key: &str,
        native: &'a str,
        patch: &OverridePatch,
    ) -> &'a str {
        patch
            .assignment(task_key)
            .and_then(|dest| self.catalog.phase(dest))
            .map_or(native, |p| p.key.as_str())
    }

    fn effective_duration(
        &self,
        template: &TaskTemplate,
        resident: &str,
        native: &str,
        patch: &OverridePatch,
    ) -> TaskDuration {
        [resident, native]
            .iter()
            .filter_map(|key| patch.phase(key))
            .find_map(|entry| entry.custom_durations.get(&template.key))
            .map_or(template.duration, |&amount| template.duration.with_amount(amount))
    }

    #[allow(clippy::too_many_arguments)]
    fn build_view(
        &self,
        position: usize,
        phase: &Phase,
        start: NaiveDate,
        end: NaiveDate,
        spans: Vec<TaskSpan<'_>>,
        patch: &OverridePatch,
        context: &ProgressContext,
    ) -> PhaseView {
        let tasks: Vec<TaskView> = spans
            .into_iter()
            .map(|span| TaskView {
                key: span.template.key.clone(),
                title: span.template.title.clone(),
                native_phase: span.native_phase.to_string(),
                phase: phase.key.clone(),
                start: span.start,
                end: span.end,
                duration: span.duration,
                roles: span.template.roles.clone(),
                note: span.template.note.clone(),
                completed: context.completed.contains(&span.template.title),
                pinned: span.pinned,
            })
            .collect();

        // A phase without tasks counts as one task titled like the phase
        let (completed_count, total_count) = if tasks.is_empty() {
            (usize::from(context.completed.contains(&phase.title)), 1)
        } else {
            (tasks.iter().filter(|t| t.completed).count(), tasks.len())
        };
        let status = PhaseStatus::from_counts(completed_count, total_count);

        let open = status != PhaseStatus::Completed;
        let overdue = open && end < context.today;
        let horizon = context
            .today
            .checked_add_days(Days::new(u64::from(self.config.upcoming_window_days)))
            .unwrap_or(NaiveDate::MAX);
        let upcoming = open && !overdue && end <= horizon;

        let entry = patch.phase(&phase.key);
        PhaseView {
            key: phase.key.clone(),
            title: phase.title.clone(),
            position,
            start,
            end,
            note: entry
                .and_then(|e| e.note.clone())
                .filter(|n| !n.is_empty()),
            tasks,
            status,
            completed_count,
            total_count,
            overdue,
            upcoming,
            has_override: entry.is_some_and(|e| !e.is_empty()),
        }
    }
}

fn fixed_date(
    patch: &OverridePatch,
    task_key: &str,
    resident: &str,
    native: &str,
) -> Option<NaiveDate> {
    [resident, native]
        .iter()
        .filter_map(|key| patch.phase(key))
        .find_map(|entry| entry.fixed_dates.get(task_key).copied())
}

fn envelope(spans: &[TaskSpan<'_>]) -> Option<(NaiveDate, NaiveDate)> {
    let start = spans.iter().map(|s| s.start).min()?;
    let end = spans.iter().map(|s| s.end).max()?;
    Some((start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CompletionMarkers, PhaseOverride};
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// A(a1: 5bd, a2: 3bd), B(b1: 2cd)
    fn sample_catalog() -> Arc<PhaseCatalog> {
        Arc::new(
            PhaseCatalog::new(
                vec![
                    Phase::new("A", "Phase A")
                        .with_task(
                            TaskTemplate::new("a1", "A one")
                                .with_duration(TaskDuration::business_days(5)),
                        )
                        .with_task(
                            TaskTemplate::new("a2", "A two")
                                .with_duration(TaskDuration::business_days(3)),
                        ),
                    Phase::new("B", "Phase B").with_task(
                        TaskTemplate::new("b1", "B one")
                            .with_duration(TaskDuration::calendar_days(2)),
                    ),
                ],
                None,
            )
            .unwrap(),
        )
    }

    fn context() -> ProgressContext {
        ProgressContext::at(date(2026, 1, 1))
    }

    #[test]
    fn test_backward_pass_example() {
        let calc = TimelineCalculator::new(sample_catalog());
        let views = calc.compute("2026-03-31", &OverridePatch::new(), &context());
        assert_eq!(views.len(), 2);
        let (a, b) = (&views[0], &views[1]);

        assert_eq!(b.end, date(2026, 3, 31));
        assert_eq!(b.start, date(2026, 3, 29));
        assert_eq!(a.end, b.start);

        let a2 = a.task("a2").unwrap();
        let a1 = a.task("a1").unwrap();
        assert_eq!(a2.end, a.end);
        assert_eq!(a2.start, date(2026, 3, 25));
        assert_eq!(a1.end, a2.start);
        assert_eq!(a1.start, date(2026, 3, 18));
        assert_eq!(a.start, a1.start);
        assert_eq!(a.position, 0);
        assert_eq!(b.position, 1);
    }

    #[test]
    fn test_unparsable_completion_is_empty() {
        let calc = TimelineCalculator::new(sample_catalog());
        assert!(calc.compute("not a date", &OverridePatch::new(), &context()).is_empty());
        assert!(calc.compute("", &OverridePatch::new(), &context()).is_empty());
    }

    #[test]
    fn test_completion_month() {
        let calc = TimelineCalculator::new(sample_catalog());
        let views = calc.compute("2026-03", &OverridePatch::new(), &context());
        assert_eq!(views[1].end, date(2026, 3, 31));
    }

    #[test]
    fn test_task_order_override() {
        let calc = TimelineCalculator::new(sample_catalog());
        let patch = OverridePatch::new().with_phase("A", PhaseOverride::new().with_order(["a2", "a1"]));
        let views = calc.compute("2026-03-31", &patch, &context());
        assert_eq!(views[0].task_keys(), vec!["a2", "a1"]);
        assert_eq!(views[1].task_keys(), vec!["b1"]);
        assert!(views[0].has_override);
        assert!(!views[1].has_override);
        // a1 is now last: 3/29 minus 5 business days
        assert_eq!(views[0].task("a1").unwrap().start, date(2026, 3, 23));
    }

    #[test]
    fn test_partial_order_appends_unlisted() {
        let catalog = Arc::new(
            PhaseCatalog::new(
                vec![Phase::new("A", "A")
                    .with_task(TaskTemplate::new("x", "x"))
                    .with_task(TaskTemplate::new("y", "y"))
                    .with_task(TaskTemplate::new("z", "z"))],
                None,
            )
            .unwrap(),
        );
        let calc = TimelineCalculator::new(catalog);
        let patch = OverridePatch::new().with_phase(
            "A",
            PhaseOverride::new().with_order(["z", "ghost", "x"]),
        );
        let views = calc.compute("2026-03-31", &patch, &context());
        assert_eq!(views[0].task_keys(), vec!["z", "x", "y"]);
    }

    #[test]
    fn test_skipped_tasks_removed() {
        let calc = TimelineCalculator::new(sample_catalog());
        let patch = OverridePatch::new().with_phase(
            "A",
            PhaseOverride::new().with_order(["a2", "a1"]).with_skipped("a1"),
        );
        let views = calc.compute("2026-03-31", &patch, &context());
        assert_eq!(views[0].task_keys(), vec!["a2"]);
        assert_eq!(views[0].start, date(2026, 3, 25));
    }

    #[test]
    fn test_reassignment_moves_task() {
        let calc = TimelineCalculator::new(sample_catalog());
        let patch = OverridePatch::new().with_assignment("b1", "A");
        let views = calc.compute("2026-03-31", &patch, &context());
        assert_eq!(views[0].task_keys(), vec!["a1", "a2", "b1"]);
        assert!(views[1].tasks.is_empty());

        let b1 = views[0].task("b1").unwrap();
        assert_eq!(b1.phase, "A");
        assert_eq!(b1.native_phase, "B");
        assert!(b1.is_reassigned());
    }

    #[test]
    fn test_reassignment_with_order() {
        let calc = TimelineCalculator::new(sample_catalog());
        let patch = OverridePatch::new()
            .with_assignment("b1", "A")
            .with_phase("A", PhaseOverride::new().with_order(["a1", "b1", "a2"]));
        let views = calc.compute("2026-03-31", &patch, &context());
        assert_eq!(views[0].task_keys(), vec!["a1", "b1", "a2"]);
    }

    #[test]
    fn test_assignment_to_unknown_phase_ignored() {
        let calc = TimelineCalculator::new(sample_catalog());
        let patch = OverridePatch::new().with_assignment("b1", "nowhere");
        let views = calc.compute("2026-03-31", &patch, &context());
        assert_eq!(views[1].task_keys(), vec!["b1"]);
    }

    #[test]
    fn test_phase_without_tasks_uses_fallback_duration() {
        let catalog = Arc::new(
            PhaseCatalog::new(
                vec![
                    Phase::new("P", "Prep").with_duration(TaskDuration::calendar_days(10)),
                    Phase::new("B", "Build").with_duration(TaskDuration::calendar_days(30)),
                ],
                Some("B"),
            )
            .unwrap(),
        );
        let calc = TimelineCalculator::new(catalog);
        let views = calc.compute("2026-03-31", &OverridePatch::new(), &context());
        assert_eq!(views[1].start, date(2026, 3, 1));
        assert_eq!(views[0].end, date(2026, 3, 1));
        assert_eq!(views[0].start, date(2026, 2, 19));
        assert_eq!(views[0].total_count, 1);
    }

    #[test]
    fn test_phase_date_override_does_not_cascade() {
        let calc = TimelineCalculator::new(sample_catalog());
        let patch = OverridePatch::new().with_phase(
            "B",
            PhaseOverride::new()
                .with_start_date(date(2026, 3, 10))
                .with_end_date(date(2026, 4, 15)),
        );
        let views = calc.compute("2026-03-31", &patch, &context());
        assert_eq!(views[1].start, date(2026, 3, 10));
        assert_eq!(views[1].end, date(2026, 4, 15));
        // A still ends where B would have started
        assert_eq!(views[0].end, date(2026, 3, 29));
    }

    #[test]
    fn test_custom_duration() {
        let calc = TimelineCalculator::new(sample_catalog());
        let patch = OverridePatch::new()
            .with_phase("B", PhaseOverride::new().with_custom_duration("b1", 10));
        let views = calc.compute("2026-03-31", &patch, &context());
        let b1 = views[1].task("b1").unwrap();
        assert_eq!(b1.duration, TaskDuration::calendar_days(10));
        assert_eq!(views[1].start, date(2026, 3, 21));
        assert_eq!(views[0].end, date(2026, 3, 21));
    }

    #[test]
    fn test_custom_duration_follows_reassigned_task() {
        let calc = TimelineCalculator::new(sample_catalog());
        let patch = OverridePatch::new()
            .with_assignment("b1", "A")
            .with_phase("B", PhaseOverride::new().with_custom_duration("b1", 4));
        let views = calc.compute("2026-03-31", &patch, &context());
        assert_eq!(views[0].task("b1").unwrap().duration.amount, 4);
    }

    #[test]
    fn test_fixed_date_pins_task_without_shifting_chain() {
        let calc = TimelineCalculator::new(sample_catalog());
        let patch = OverridePatch::new()
            .with_phase("A", PhaseOverride::new().with_fixed_date("a1", date(2026, 3, 13)));
        let views = calc.compute("2026-03-31", &patch, &context());
        let a = &views[0];
        let a1 = a.task("a1").unwrap();
        assert!(a1.pinned);
        assert_eq!(a1.end, date(2026, 3, 13));
        assert_eq!(a1.start, date(2026, 3, 6));
        // a2 keeps its chained dates
        assert_eq!(a.task("a2").unwrap().start, date(2026, 3, 25));
        assert_eq!(a.start, date(2026, 3, 6));
        assert_eq!(a.end, date(2026, 3, 29));
    }

    #[test]
    fn test_status_and_alerts() {
        let calc = TimelineCalculator::new(sample_catalog());
        // today = 3/26: A ends 3/29 (within 7 days), B ends 3/31
        let ctx = ProgressContext::at(date(2026, 3, 26))
            .with_markers(CompletionMarkers::new().with_title("A one"));
        let views = calc.compute("2026-03-31", &OverridePatch::new(), &ctx);
        let (a, b) = (&views[0], &views[1]);
        assert_eq!(a.status, PhaseStatus::InProgress);
        assert_eq!((a.completed_count, a.total_count), (1, 2));
        assert!(a.upcoming);
        assert!(!a.overdue);
        assert_eq!(b.status, PhaseStatus::Pending);
        assert!(b.upcoming);
        assert!(a.task("a1").unwrap().is_locked());
    }

    #[test]
    fn test_overdue_and_completed_phases() {
        let calc = TimelineCalculator::new(sample_catalog());
        let ctx = ProgressContext::at(date(2026, 4, 20))
            .with_markers(CompletionMarkers::new().with_title("B one"));
        let views = calc.compute("2026-03-31", &OverridePatch::new(), &ctx);
        assert!(views[0].overdue);
        assert!(!views[0].upcoming);
        assert_eq!(views[1].status, PhaseStatus::Completed);
        assert!(!views[1].overdue);
    }

    #[test]
    fn test_far_future_is_neither_overdue_nor_upcoming() {
        let calc = TimelineCalculator::new(sample_catalog());
        let views = calc.compute("2026-03-31", &OverridePatch::new(), &context());
        assert!(views.iter().all(|v| !v.overdue && !v.upcoming));
    }

    #[test]
    fn test_upcoming_window_from_config() {
        let calc = TimelineCalculator::new(sample_catalog())
            .with_config(PlannerConfig::default().with_upcoming_window_days(120));
        let views = calc.compute("2026-03-31", &OverridePatch::new(), &context());
        assert!(views.iter().all(|v| v.upcoming));
    }

    #[test]
    fn test_implicit_task_uses_phase_title() {
        let catalog = Arc::new(
            PhaseCatalog::new(vec![Phase::new("C", "Construction")], None).unwrap(),
        );
        let calc = TimelineCalculator::new(catalog);
        let ctx = context().with_markers(CompletionMarkers::new().with_title("Construction"));
        let views = calc.compute("2026-03-31", &OverridePatch::new(), &ctx);
        assert_eq!(views[0].status, PhaseStatus::Completed);
        assert_eq!((views[0].completed_count, views[0].total_count), (1, 1));
    }

    #[test]
    fn test_note_surfaces() {
        let calc = TimelineCalculator::new(sample_catalog());
        let patch = OverridePatch::new()
            .with_phase("A", PhaseOverride::new().with_note("waiting on bank"))
            .with_phase("B", PhaseOverride::new().with_note(""));
        let views = calc.compute("2026-03-31", &patch, &context());
        assert_eq!(views[0].note.as_deref(), Some("waiting on bank"));
        assert_eq!(views[1].note, None);
        assert!(!views[1].has_override);
    }

    #[test]
    fn test_holiday_calendar() {
        let calc = TimelineCalculator::new(sample_catalog())
            .with_calendar(Calendar::weekdays().with_holiday(date(2026, 3, 26)));
        let views = calc.compute("2026-03-31", &OverridePatch::new(), &context());
        assert_eq!(views[0].task("a2").unwrap().start, date(2026, 3, 24));
    }

    #[test]
    fn test_end_dates_follow_catalog_order() {
        let mut rng = SmallRng::seed_from_u64(7);
        for _ in 0..200 {
            let phases: Vec<Phase> = (0..rng.random_range(1..6))
                .map(|p| {
                    let mut phase = Phase::new(format!("P{p}"), format!("Phase {p}"))
                        .with_duration(TaskDuration::calendar_days(rng.random_range(0..40)));
                    for t in 0..rng.random_range(0..4) {
                        let duration = if rng.random_bool(0.5) {
                            TaskDuration::business_days(rng.random_range(0..20))
                        } else {
                            TaskDuration::calendar_days(rng.random_range(0..20))
                        };
                        phase = phase.with_task(
                            TaskTemplate::new(format!("P{p}T{t}"), format!("Task {p}.{t}"))
                                .with_duration(duration),
                        );
                    }
                    phase
                })
                .collect();
            let calc = TimelineCalculator::new(Arc::new(PhaseCatalog::new(phases, None).unwrap()));
            let completion = date(2026, 1, 1) + Days::new(rng.random_range(0..1500));

            let views = calc.compute_from(completion, &OverridePatch::new(), &context());
            assert_eq!(views.last().unwrap().end, completion);
            for pair in views.windows(2) {
                assert!(pair[0].end <= pair[1].end);
                assert_eq!(pair[0].end, pair[1].start);
                assert!(pair[0].position < pair[1].position);
            }
            for view in &views {
                assert!(view.start <= view.end);
            }
        }
    }
}
