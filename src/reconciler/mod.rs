//! Drag/drop reconciliation.
//!
//! Turns board gestures into override patches in two separate pure steps,
//! driven by an explicit state machine:
//!
//! - **`board`**: live per-phase card lists and the move rules
//!   ([`preview_move`], [`reorder_within`])
//! - **`diff`**: settled board → next [`OverridePatch`](crate::models::OverridePatch)
//!   ([`commit_diff`])
//! - **`machine`**: [`Reconciler`] (idle → dragging → settling → idle)
//!
//! # Move Rules
//!
//! | Rule | Effect |
//! |------|--------|
//! | Adjacency | A card moves one column at a time, measured from the column it is in now |
//! | Sink | The sink accepts cards only from its predecessor and never releases them |
//! | Locked | Completed cards cannot be picked up and keep their index |
//! | Reorder | Always allowed inside a column, unless it shifts a locked card |
//!
//! A move that breaks a rule simply does not take: the board stays as it
//! was and no error is raised.

mod board;
mod diff;
mod machine;

pub use board::{preview_move, reorder_within, Board, Column, DropTarget, MoveRejection};
pub use diff::commit_diff;
pub use machine::{DragSession, MoveOutcome, Reconciler, ReconcilerState};
