//! Phase timeline planning for construction projects.
//!
//! Computes a project's phase and task dates backward from a completion
//! date, layers per-project manual overrides on top, and reconciles
//! drag/drop rearrangements of the task board into a persisted override
//! patch.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `PhaseCatalog`, `Phase`, `TaskTemplate`,
//!   `Calendar`, `OverridePatch`, `PhaseView`, `TaskView`
//! - **`timeline`**: `TimelineCalculator` (backward pass, overrides,
//!   status and alerts) and `TimelineSummary`
//! - **`store`**: Override patch parsing and serialization (bare and
//!   envelope shapes)
//! - **`reconciler`**: Board state, move rules, board → patch diff and the
//!   drag/drop state machine
//! - **`persistence`**: Async storage seam, serialized save queue and an
//!   in-memory adapter
//! - **`validation`**: Catalog and patch integrity checks
//! - **`config`**: Planner settings
//! - **`error`**: Error types
//!
//! # Failure Model
//!
//! Nothing here is fatal. Malformed input degrades to an empty result, a
//! move that breaks a rule does not take, and a failed save keeps the
//! local arrangement and can be retried.

pub mod config;
pub mod error;
pub mod models;
pub mod persistence;
pub mod reconciler;
pub mod store;
pub mod timeline;
pub mod validation;
