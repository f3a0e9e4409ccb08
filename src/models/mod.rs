//! Timeline domain models.
//!
//! Provides the static workflow definition (phases and task templates),
//! the per-project override patch, and the computed views handed to the
//! board.
//!
//! # Layers
//!
//! | Layer | Types | Lifetime |
//! |-------|-------|----------|
//! | Catalog | `PhaseCatalog`, `Phase`, `TaskTemplate` | immutable, shared |
//! | Patch | `OverridePatch`, `PhaseOverride` | persisted per project |
//! | View | `PhaseView`, `TaskView` | recomputed on every read |

mod calendar;
mod catalog;
mod overrides;
mod phase;
mod view;

pub use calendar::Calendar;
pub use catalog::PhaseCatalog;
pub use overrides::{OverridePatch, PhaseOverride};
pub use phase::{DurationUnit, Phase, TaskDuration, TaskTemplate};
pub use view::{CompletionMarkers, PhaseStatus, PhaseView, TaskView};
