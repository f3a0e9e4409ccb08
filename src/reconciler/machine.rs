//! Drag/drop state machine.
//!
//! # States
//!
//! | State | Board | Upstream resync |
//! |-------|-------|-----------------|
//! | `Idle` | projection of the computed view | applied |
//! | `Dragging` | mutated by hover previews | ignored |
//! | `Settling` | committed arrangement, save in flight | ignored |
//!
//! The [`Reconciler`] is the single owner of the board, the current patch
//! and the save bookkeeping. A drop derives the next patch and returns a
//! [`SaveRequest`] built from it; the caller runs the save (directly or via
//! [`Reconciler::drop_and_persist`]) and reports back with
//! [`Reconciler::complete_save`].

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::{commit_diff, Board, DropTarget, MoveRejection};
use crate::error::DragRejection;
use crate::models::{CompletionMarkers, OverridePatch, PhaseCatalog, PhaseView, TaskView};
use crate::persistence::{SaveOutcome, SaveQueue, SaveRequest};
use crate::validation::validate_patch;

/// Source of session ids; each reconciler gets its own.
static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

/// A drag in progress.
#[derive(Debug, Clone, PartialEq)]
pub struct DragSession {
    /// Dragged card.
    pub task_key: String,
    /// Column the card was picked up from.
    pub origin_phase: String,
    /// Column the card sits in now.
    pub current_phase: String,
    /// Board before the drag, restored on cancel.
    pub snapshot: Board,
}

/// Reconciler state.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcilerState {
    /// No drag; the board follows upstream.
    Idle,
    /// A card is being dragged.
    Dragging(DragSession),
    /// Dropped; waiting for saves to resolve.
    Settling {
        /// Newest save issued.
        generation: u64,
    },
}

/// Result of a hover over a drop target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The card moved to another column.
    Moved {
        /// Previous column.
        from: String,
        /// New column.
        to: String,
    },
    /// Hovering inside the card's own column; nothing to preview.
    Unchanged,
    /// The move does not take; the board is left as it was.
    Rejected(MoveRejection),
}

/// Turns drag gestures into override patches for one project.
#[derive(Debug)]
pub struct Reconciler {
    project_id: String,
    session: u64,
    catalog: Arc<PhaseCatalog>,
    patch: OverridePatch,
    markers: Option<CompletionMarkers>,
    board: Board,
    state: ReconcilerState,
    generation: u64,
    in_flight: BTreeMap<u64, SaveRequest>,
    last_failed: Option<SaveRequest>,
}

impl Reconciler {
    /// Creates an idle reconciler with an empty board.
    ///
    /// Call [`sync`](Self::sync) with the first computed view.
    pub fn new(project_id: impl Into<String>, catalog: Arc<PhaseCatalog>) -> Self {
        Self {
            project_id: project_id.into(),
            session: NEXT_SESSION.fetch_add(1, Ordering::Relaxed),
            catalog,
            patch: OverridePatch::new(),
            markers: None,
            board: Board::default(),
            state: ReconcilerState::Idle,
            generation: 0,
            in_flight: BTreeMap::new(),
            last_failed: None,
        }
    }

    /// Project id.
    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Session id stamped on every save this reconciler issues.
    pub fn session(&self) -> u64 {
        self.session
    }

    /// The catalog moves are checked against.
    pub fn catalog(&self) -> &Arc<PhaseCatalog> {
        &self.catalog
    }

    /// Current state.
    pub fn state(&self) -> &ReconcilerState {
        &self.state
    }

    /// Live board.
    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Current override patch.
    pub fn patch(&self) -> &OverridePatch {
        &self.patch
    }

    /// Whether a drag is in progress.
    pub fn is_dragging(&self) -> bool {
        matches!(self.state, ReconcilerState::Dragging(_))
    }

    /// Whether the reconciler is idle.
    pub fn is_idle(&self) -> bool {
        self.state == ReconcilerState::Idle
    }

    /// Number of saves issued but not yet reported.
    pub fn pending_saves(&self) -> usize {
        self.in_flight.len()
    }

    /// The newest save that failed and has not been overtaken since.
    pub fn last_failed(&self) -> Option<&SaveRequest> {
        self.last_failed.as_ref()
    }

    /// Replaces the board and patch with a fresh upstream projection.
    ///
    /// Ignored (returns `false`) unless idle, so a background refresh
    /// never discards a drag or an unsaved drop.
    pub fn sync(&mut self, patch: OverridePatch, views: &[PhaseView]) -> bool {
        if !self.is_idle() {
            debug!(
                project_id = %self.project_id,
                state = ?self.state,
                "Ignoring resync while a drag is active"
            );
            return false;
        }

        if let Err(errors) = validate_patch(&self.catalog, &patch) {
            for error in &errors {
                warn!(
                    project_id = %self.project_id,
                    kind = ?error.kind,
                    "{}",
                    error.message
                );
            }
        }

        self.patch = patch.pruned();
        self.board = Board::from_views(views);
        if let Some(markers) = &self.markers {
            self.board.mark_completed(|title| markers.contains(title));
        }
        true
    }

    /// Applies a fresh set of completion markers to the board.
    ///
    /// Markers are refreshed independently of the patch, so they apply in
    /// every state; a drag snapshot is updated too.
    pub fn set_markers(&mut self, markers: CompletionMarkers) {
        self.board.mark_completed(|title| markers.contains(title));
        if let ReconcilerState::Dragging(session) = &mut self.state {
            session
                .snapshot
                .mark_completed(|title| markers.contains(title));
        }
        self.markers = Some(markers);
    }

    /// Picks up a card.
    ///
    /// Allowed while idle or settling. Locked cards are refused here,
    /// before any hover happens.
    ///
    /// # Errors
    /// [`DragRejection::AlreadyDragging`], [`DragRejection::UnknownTask`] or
    /// [`DragRejection::Locked`].
    pub fn begin_drag(&mut self, task_key: &str) -> Result<(), DragRejection> {
        if let ReconcilerState::Dragging(session) = &self.state {
            return Err(DragRejection::AlreadyDragging(session.task_key.clone()));
        }
        let task = self
            .board
            .task(task_key)
            .ok_or_else(|| DragRejection::UnknownTask(task_key.to_string()))?;
        if task.is_locked() {
            return Err(DragRejection::Locked(task_key.to_string()));
        }

        let phase = task.phase.clone();
        debug!(project_id = %self.project_id, task = %task_key, phase = %phase, "Drag started");
        self.state = ReconcilerState::Dragging(DragSession {
            task_key: task_key.to_string(),
            origin_phase: phase.clone(),
            current_phase: phase,
            snapshot: self.board.clone(),
        });
        Ok(())
    }

    /// Previews a hover over a target.
    ///
    /// A move that does not take leaves the board untouched and is reported
    /// as [`MoveOutcome::Rejected`], never as an error.
    ///
    /// # Errors
    /// [`DragRejection::NotDragging`] if no drag is in progress.
    pub fn drag_over(&mut self, target: &DropTarget) -> Result<MoveOutcome, DragRejection> {
        let ReconcilerState::Dragging(session) = &mut self.state else {
            return Err(DragRejection::NotDragging);
        };

        match super::preview_move(&self.catalog, &self.board, &session.task_key, target) {
            Ok(next) => {
                let to = next
                    .phase_of(&session.task_key)
                    .unwrap_or(&session.current_phase)
                    .to_string();
                let from = std::mem::replace(&mut session.current_phase, to.clone());
                self.board = next;
                Ok(MoveOutcome::Moved { from, to })
            }
            Err(MoveRejection::SameColumn) => Ok(MoveOutcome::Unchanged),
            Err(rejection) => {
                debug!(
                    project_id = %self.project_id,
                    task = %session.task_key,
                    target = ?target,
                    reason = ?rejection,
                    "Move rejected"
                );
                Ok(MoveOutcome::Rejected(rejection))
            }
        }
    }

    /// Drops the dragged card and derives the next patch.
    ///
    /// A target inside the card's current column reorders it; a target in
    /// another column is one last cross-column move. With no target, the
    /// moves previewed so far stand. If the card was marked complete during
    /// the drag, the board goes back to its pickup state instead. Either way
    /// the patch is recomputed for the origin and final columns and a save
    /// is issued, even if nothing changed.
    ///
    /// # Errors
    /// [`DragRejection::NotDragging`] if no drag is in progress.
    pub fn end_drag(&mut self, target: Option<&DropTarget>) -> Result<SaveRequest, DragRejection> {
        let ReconcilerState::Dragging(session) = &self.state else {
            return Err(DragRejection::NotDragging);
        };
        let task_key = session.task_key.clone();
        let origin = session.origin_phase.clone();

        if self.board.task(&task_key).is_some_and(TaskView::is_locked) {
            self.board = session.snapshot.clone();
            debug!(
                project_id = %self.project_id,
                task = %task_key,
                "Card completed during drag, restoring pickup position"
            );
        } else if let Some(target) = target {
            let target_phase = match target {
                DropTarget::Task(key) => self.board.phase_of(key),
                DropTarget::Column(phase_key) => Some(phase_key.as_str()),
            };
            let result = if target_phase == self.board.phase_of(&task_key) {
                super::reorder_within(&self.board, &task_key, target)
            } else {
                super::preview_move(&self.catalog, &self.board, &task_key, target)
            };
            match result {
                Ok(next) => self.board = next,
                Err(rejection) => debug!(
                    project_id = %self.project_id,
                    task = %task_key,
                    reason = ?rejection,
                    "Drop did not take"
                ),
            }
        }

        let landed = self
            .board
            .phase_of(&task_key)
            .unwrap_or(origin.as_str())
            .to_string();
        self.patch = commit_diff(
            &self.catalog,
            &self.board,
            &self.patch,
            &[origin.as_str(), landed.as_str()],
        );
        let request = self.issue();
        info!(
            project_id = %self.project_id,
            task = %task_key,
            from = %origin,
            to = %landed,
            generation = request.generation,
            "Drop committed"
        );
        Ok(request)
    }

    /// Abandons the drag and restores the board as it was at pickup.
    ///
    /// # Errors
    /// [`DragRejection::NotDragging`] if no drag is in progress.
    pub fn cancel_drag(&mut self) -> Result<(), DragRejection> {
        let state = std::mem::replace(&mut self.state, ReconcilerState::Idle);
        let ReconcilerState::Dragging(session) = state else {
            self.state = state;
            return Err(DragRejection::NotDragging);
        };
        self.board = session.snapshot;
        if !self.in_flight.is_empty() {
            self.state = ReconcilerState::Settling {
                generation: self.generation,
            };
        }
        debug!(project_id = %self.project_id, task = %session.task_key, "Drag cancelled");
        Ok(())
    }

    /// Records how a save ended.
    ///
    /// A failure keeps the board as dropped and is retained for
    /// [`retry_request`](Self::retry_request). Once nothing is in flight, a
    /// settling reconciler returns to idle. Unknown generations are ignored.
    pub fn complete_save(&mut self, generation: u64, outcome: &SaveOutcome) {
        let Some(request) = self.in_flight.remove(&generation) else {
            return;
        };

        match outcome {
            SaveOutcome::Failed(error) => {
                warn!(
                    project_id = %self.project_id,
                    generation = generation,
                    error = %error,
                    "Override patch not persisted; keeping local arrangement"
                );
                if self
                    .last_failed
                    .as_ref()
                    .map_or(true, |failed| failed.generation < generation)
                {
                    self.last_failed = Some(request);
                }
            }
            SaveOutcome::Saved | SaveOutcome::Superseded => {
                if self
                    .last_failed
                    .as_ref()
                    .is_some_and(|failed| failed.generation < generation)
                {
                    self.last_failed = None;
                }
            }
        }

        if self.in_flight.is_empty() && matches!(self.state, ReconcilerState::Settling { .. }) {
            self.state = ReconcilerState::Idle;
        }
    }

    /// Issues a fresh save of the current patch after a failure.
    ///
    /// Returns `None` when no failed save is pending or a drag is active.
    pub fn retry_request(&mut self) -> Option<SaveRequest> {
        if self.last_failed.is_none() || self.is_dragging() {
            return None;
        }
        let request = self.issue();
        info!(
            project_id = %self.project_id,
            generation = request.generation,
            "Retrying override save"
        );
        Some(request)
    }

    /// Drops the card, saves through the queue and records the outcome.
    ///
    /// # Errors
    /// [`DragRejection::NotDragging`] if no drag is in progress.
    pub async fn drop_and_persist(
        &mut self,
        target: Option<&DropTarget>,
        queue: &SaveQueue,
    ) -> Result<SaveOutcome, DragRejection> {
        let request = self.end_drag(target)?;
        let outcome = queue.submit(&request).await;
        self.complete_save(request.generation, &outcome);
        Ok(outcome)
    }

    /// Retries the last failed save through the queue.
    pub async fn retry(&mut self, queue: &SaveQueue) -> Option<SaveOutcome> {
        let request = self.retry_request()?;
        let outcome = queue.submit(&request).await;
        self.complete_save(request.generation, &outcome);
        Some(outcome)
    }

    /// Registers a save of the current patch and enters settling.
    fn issue(&mut self) -> SaveRequest {
        self.generation += 1;
        let request = SaveRequest {
            project_id: self.project_id.clone(),
            session: self.session,
            generation: self.generation,
            patch: self.patch.clone(),
        };
        self.in_flight.insert(self.generation, request.clone());
        self.state = ReconcilerState::Settling {
            generation: self.generation,
        };
        request
    }
}
