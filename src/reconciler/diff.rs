//! Board → override patch diff.
//!
//! Only the columns a drop touched (the card's origin and final column)
//! are diffed. Two independent records come out of each:
//!
//! - **Order**: a column whose card keys differ (membership or sequence)
//!   from the catalog's default order for that phase gets the full key
//!   list as `subPhaseOrder`; a column back at its default order loses it.
//! - **Assignment**: every card in the column sitting outside its native
//!   phase gets a `taskAssignments` entry; cards back home lose theirs.
//!
//! Everything else in the previous patch (dates, notes, skips, durations,
//! pins, entries and assignments of untouched phases) is carried over
//! untouched.

use crate::models::{OverridePatch, PhaseCatalog};

use super::Board;

/// Derives the next override patch from a settled board, diffing only the
/// `touched` columns.
///
/// The default order of a phase excludes the tasks its override skips,
/// since skipped tasks never reach the board.
pub fn commit_diff(
    catalog: &PhaseCatalog,
    board: &Board,
    previous: &OverridePatch,
    touched: &[&str],
) -> OverridePatch {
    let mut next = previous.clone();
    let columns = board
        .columns()
        .iter()
        .filter(|c| touched.contains(&c.phase_key.as_str()));

    for column in columns {
        let Some(phase) = catalog.phase(&column.phase_key) else {
            continue;
        };
        let skipped = previous.phase(&phase.key);
        let default: Vec<&str> = phase
            .task_keys()
            .filter(|key| !skipped.is_some_and(|entry| entry.is_skipped(key)))
            .collect();
        let current = column.task_keys();

        let order = (current != default)
            .then(|| current.iter().map(|key| key.to_string()).collect::<Vec<_>>());
        if order.is_some() || next.phase(&phase.key).is_some() {
            next.phases.entry(phase.key.clone()).or_default().sub_phase_order = order;
        }

        for task in &column.tasks {
            match catalog.native_phase_of(&task.key) {
                Some(native) if native != column.phase_key => {
                    next.task_assignments
                        .insert(task.key.clone(), column.phase_key.clone());
                }
                Some(_) => {
                    next.task_assignments.remove(&task.key);
                }
                None => {}
            }
        }
    }

    next.prune();
    next
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Phase, PhaseOverride, TaskDuration, TaskTemplate};
    use crate::reconciler::{preview_move, reorder_within, DropTarget};
    use crate::store;
    use crate::timeline::{ProgressContext, TimelineCalculator};
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn catalog() -> Arc<PhaseCatalog> {
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
                    Phase::new("C", "Phase C")
                        .with_task(
                            TaskTemplate::new("c1", "C one")
                                .with_duration(TaskDuration::business_days(2)),
                        )
                        .with_task(
                            TaskTemplate::new("c2", "C two")
                                .with_duration(TaskDuration::business_days(1)),
                        ),
                ],
                None,
            )
            .unwrap(),
        )
    }

    fn board(catalog: &Arc<PhaseCatalog>, patch: &OverridePatch) -> Board {
        let ctx = ProgressContext::at(NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        let views =
            TimelineCalculator::new(Arc::clone(catalog)).compute("2026-03-31", patch, &ctx);
        Board::from_views(&views)
    }

    #[test]
    fn test_unchanged_board_keeps_empty_patch() {
        let catalog = catalog();
        let patch = OverridePatch::new();
        let next = commit_diff(&catalog, &board(&catalog, &patch), &patch, &["A", "B", "C"]);
        assert!(next.is_empty());
        assert!(next.phases.is_empty());
    }

    #[test]
    fn test_reorder_records_only_that_phase() {
        let catalog = catalog();
        let patch = OverridePatch::new();
        let moved = reorder_within(
            &board(&catalog, &patch),
            "a2",
            &DropTarget::Task("a1".into()),
        )
        .unwrap();
        let next = commit_diff(&catalog, &moved, &patch, &["A"]);
        assert_eq!(
            next.phase("A").unwrap().sub_phase_order,
            Some(vec!["a2".to_string(), "a1".to_string()])
        );
        assert!(next.phase("B").is_none());
        assert!(next.task_assignments.is_empty());
    }

    #[test]
    fn test_cross_phase_move_records_assignment() {
        let catalog = catalog();
        let patch = OverridePatch::new();
        let moved = preview_move(
            &catalog,
            &board(&catalog, &patch),
            "b1",
            &DropTarget::Column("A".into()),
        )
        .unwrap();
        let next = commit_diff(&catalog, &moved, &patch, &["B", "A"]);
        assert_eq!(next.assignment("b1"), Some("A"));
        assert_eq!(
            next.phase("A").unwrap().sub_phase_order,
            Some(vec!["a1".to_string(), "a2".to_string(), "b1".to_string()])
        );
        // B is empty now; an empty order is pruned
        assert!(next.phase("B").is_none());

        // The computed view follows the patch
        let recomputed = board(&catalog, &next);
        assert_eq!(recomputed.column_keys("A"), vec!["a1", "a2", "b1"]);
        assert!(recomputed.column_keys("B").is_empty());
    }

    #[test]
    fn test_moving_back_home_clears_assignment_and_order() {
        let catalog = catalog();
        let patch = OverridePatch::new()
            .with_assignment("b1", "A")
            .with_phase("A", PhaseOverride::new().with_order(["a1", "a2", "b1"]));
        let moved = preview_move(
            &catalog,
            &board(&catalog, &patch),
            "b1",
            &DropTarget::Column("B".into()),
        )
        .unwrap();
        let next = commit_diff(&catalog, &moved, &patch, &["A", "B"]);
        assert!(next.is_empty());
        assert_eq!(store::serialize(&next).unwrap(), None);
    }

    #[test]
    fn test_unrelated_overrides_survive() {
        let catalog = catalog();
        let start = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let patch = OverridePatch::new()
            .with_phase("B", PhaseOverride::new().with_start_date(start).with_note("rain"))
            .with_phase("Z", PhaseOverride::new().with_note("legacy"));
        let moved = reorder_within(
            &board(&catalog, &patch),
            "a2",
            &DropTarget::Task("a1".into()),
        )
        .unwrap();
        let next = commit_diff(&catalog, &moved, &patch, &["A"]);
        assert_eq!(next.phase("B").unwrap().start_date, Some(start));
        assert_eq!(next.phase("B").unwrap().note.as_deref(), Some("rain"));
        assert_eq!(next.phase("B").unwrap().sub_phase_order, None);
        assert!(next.phase("Z").is_some());
    }

    #[test]
    fn test_skipped_tasks_do_not_force_an_order() {
        let catalog = catalog();
        let patch =
            OverridePatch::new().with_phase("A", PhaseOverride::new().with_skipped("a1"));
        let next = commit_diff(&catalog, &board(&catalog, &patch), &patch, &["A"]);
        assert_eq!(next, patch);
    }

    #[test]
    fn test_untouched_phases_keep_stored_entries() {
        let catalog = catalog();
        // b1 lives in A without an order for A; B keeps a redundant order
        let patch = OverridePatch::new()
            .with_phase("B", PhaseOverride::new().with_order(["b1"]))
            .with_assignment("b1", "A");
        let moved = reorder_within(
            &board(&catalog, &patch),
            "c2",
            &DropTarget::Task("c1".into()),
        )
        .unwrap();
        let next = commit_diff(&catalog, &moved, &patch, &["C"]);

        assert!(next.phase("A").is_none());
        assert_eq!(next.phase("B"), patch.phase("B"));
        assert_eq!(next.assignment("b1"), Some("A"));
        assert_eq!(
            next.phase("C").unwrap().sub_phase_order,
            Some(vec!["c2".to_string(), "c1".to_string()])
        );
        assert_eq!(next.phases.len(), 2);
    }
}
