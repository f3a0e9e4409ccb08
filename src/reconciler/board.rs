//! Live board state and the pure move operations on it.
//!
//! A [`Board`] is one column per phase, in catalog order, holding the task
//! cards currently shown there. The two operations below never mutate
//! their input; they return the candidate board or the reason the move
//! does not take:
//!
//! - [`preview_move`]: hover over another column (cross-phase move)
//! - [`reorder_within`]: drop inside the card's own column
//!
//! # Locked Cards
//! A completed card keeps its index in its column. Insertions land after
//! the last locked card of the destination; a move or reorder that would
//! still shift a locked card is rejected.

use serde::{Deserialize, Serialize};

use crate::models::{PhaseCatalog, PhaseView, TaskView};

/// One phase column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    /// Phase key.
    pub phase_key: String,
    /// Cards in display order.
    pub tasks: Vec<TaskView>,
}

impl Column {
    /// Card keys in display order.
    pub fn task_keys(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.key.as_str()).collect()
    }

    /// Index right after the last locked card.
    fn first_free_slot(&self) -> usize {
        self.tasks
            .iter()
            .rposition(TaskView::is_locked)
            .map_or(0, |i| i + 1)
    }
}

/// Where a card is dropped or hovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// Over another card: take its index.
    Task(String),
    /// Over a column's empty area: go to its end.
    Column(String),
}

/// Why a move does not take. Never surfaced as an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveRejection {
    /// The dragged card is not on the board.
    UnknownTask,
    /// The target card or column is not on the board.
    UnknownTarget,
    /// The dragged card is locked.
    Locked,
    /// The target column is not next to the card's current column.
    NotAdjacent {
        /// Current column.
        from: String,
        /// Requested column.
        to: String,
    },
    /// Cards only enter the sink from its predecessor.
    SinkInbound {
        /// Current column.
        from: String,
    },
    /// Cards never leave the sink.
    SinkOutbound,
    /// The move would shift a locked card.
    DisplacesLocked,
    /// Cross-column move requested inside one column.
    SameColumn,
    /// Reorder requested across columns.
    DifferentColumn,
}

/// Live per-phase card lists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Board {
    columns: Vec<Column>,
}

impl Board {
    /// Projects computed views onto a board.
    pub fn from_views(views: &[PhaseView]) -> Self {
        Self {
            columns: views
                .iter()
                .map(|v| Column {
                    phase_key: v.key.clone(),
                    tasks: v.tasks.clone(),
                })
                .collect(),
        }
    }

    /// All columns in catalog order.
    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Whether the board has no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Looks up a column by phase key.
    pub fn column(&self, phase_key: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.phase_key == phase_key)
    }

    /// Card keys of a column (empty if the column doesn't exist).
    pub fn column_keys(&self, phase_key: &str) -> Vec<&str> {
        self.column(phase_key)
            .map(Column::task_keys)
            .unwrap_or_default()
    }

    /// Finds a card: (column index, card index).
    pub fn locate(&self, task_key: &str) -> Option<(usize, usize)> {
        self.columns.iter().enumerate().find_map(|(c, column)| {
            column
                .tasks
                .iter()
                .position(|t| t.key == task_key)
                .map(|i| (c, i))
        })
    }

    /// Looks up a card.
    pub fn task(&self, task_key: &str) -> Option<&TaskView> {
        let (c, i) = self.locate(task_key)?;
        Some(&self.columns[c].tasks[i])
    }

    /// Phase key of the column a card sits in.
    pub fn phase_of(&self, task_key: &str) -> Option<&str> {
        let (c, _) = self.locate(task_key)?;
        Some(self.columns[c].phase_key.as_str())
    }

    /// Sets the completed flag of every card from a predicate on its title.
    pub(crate) fn mark_completed(&mut self, is_completed: impl Fn(&str) -> bool) {
        for task in self.columns.iter_mut().flat_map(|c| c.tasks.iter_mut()) {
            task.completed = is_completed(&task.title);
        }
    }

    /// Resolves a target to (column index, insertion index).
    fn resolve(&self, target: &DropTarget) -> Option<(usize, usize)> {
        match target {
            DropTarget::Task(key) => self.locate(key),
            DropTarget::Column(phase_key) => self
                .columns
                .iter()
                .position(|c| c.phase_key == *phase_key)
                .map(|c| (c, self.columns[c].tasks.len())),
        }
    }

    /// Whether every locked card sits at the same place on both boards.
    fn pins_preserved(&self, before: &Board) -> bool {
        before
            .columns
            .iter()
            .enumerate()
            .flat_map(|(c, column)| {
                column
                    .tasks
                    .iter()
                    .enumerate()
                    .filter(|(_, t)| t.is_locked())
                    .map(move |(i, t)| (c, i, t.key.as_str()))
            })
            .all(|(c, i, key)| self.locate(key) == Some((c, i)))
    }
}

/// Moves a card into an adjacent column.
///
/// Adjacency is checked against the column the card is in *now*, so a card
/// can keep walking one phase per hover.
pub fn preview_move(
    catalog: &PhaseCatalog,
    board: &Board,
    task_key: &str,
    target: &DropTarget,
) -> Result<Board, MoveRejection> {
    let (from_col, from_idx) = board.locate(task_key).ok_or(MoveRejection::UnknownTask)?;
    if board.columns[from_col].tasks[from_idx].is_locked() {
        return Err(MoveRejection::Locked);
    }
    let (to_col, to_idx) = board.resolve(target).ok_or(MoveRejection::UnknownTarget)?;
    if to_col == from_col {
        return Err(MoveRejection::SameColumn);
    }

    let from_key = board.columns[from_col].phase_key.as_str();
    let to_key = board.columns[to_col].phase_key.as_str();
    if catalog.is_sink(from_key) {
        return Err(MoveRejection::SinkOutbound);
    }
    if !catalog.are_adjacent(from_key, to_key) {
        return Err(MoveRejection::NotAdjacent {
            from: from_key.to_string(),
            to: to_key.to_string(),
        });
    }
    if catalog.is_sink(to_key) {
        let predecessor = catalog
            .position(to_key)
            .and_then(|p| p.checked_sub(1))
            .map(|p| catalog.phases()[p].key.as_str());
        if predecessor != Some(from_key) {
            return Err(MoveRejection::SinkInbound {
                from: from_key.to_string(),
            });
        }
    }

    let mut next = board.clone();
    let mut card = next.columns[from_col].tasks.remove(from_idx);
    card.phase = to_key.to_string();
    let destination = &mut next.columns[to_col];
    let insert_at = to_idx
        .max(destination.first_free_slot())
        .min(destination.tasks.len());
    destination.tasks.insert(insert_at, card);

    if !next.pins_preserved(board) {
        return Err(MoveRejection::DisplacesLocked);
    }
    Ok(next)
}

/// Moves a card to the target's index inside its own column.
///
/// Dropping on the column itself moves the card to the end.
pub fn reorder_within(
    board: &Board,
    task_key: &str,
    target: &DropTarget,
) -> Result<Board, MoveRejection> {
    let (col, from_idx) = board.locate(task_key).ok_or(MoveRejection::UnknownTask)?;
    if board.columns[col].tasks[from_idx].is_locked() {
        return Err(MoveRejection::Locked);
    }
    let (to_col, to_idx) = board.resolve(target).ok_or(MoveRejection::UnknownTarget)?;
    if to_col != col {
        return Err(MoveRejection::DifferentColumn);
    }

    let mut next = board.clone();
    let tasks = &mut next.columns[col].tasks;
    let to_idx = to_idx.min(tasks.len() - 1);
    if to_idx != from_idx {
        let card = tasks.remove(from_idx);
        tasks.insert(to_idx, card);
    }

    if !next.pins_preserved(board) {
        return Err(MoveRejection::DisplacesLocked);
    }
    Ok(next)
}
