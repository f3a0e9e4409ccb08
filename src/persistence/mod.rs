//! Persistence of override patches.
//!
//! The core does not pick a transport. It hands a [`SaveRequest`] to a
//! [`PersistenceAdapter`] (usually through a [`SaveQueue`]) and gets back a
//! [`SaveOutcome`]. A `None` payload means "clear every override of this
//! project".
//!
//! # Concurrency
//! Saves are not arbitrated across writers: two sessions on the same
//! project race and the last write wins. Within one queue, saves run one at
//! a time and a save older than one already written by the same session is
//! dropped. A different session always gets through (last write wins).

mod memory;
mod queue;

pub use memory::InMemoryAdapter;
pub use queue::SaveQueue;

use async_trait::async_trait;
use tracing::warn;

use crate::error::PersistenceError;
use crate::models::OverridePatch;
use crate::store;

/// Storage for serialized override patches, one per project.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Stores a payload; `None` clears the project's overrides.
    async fn save(&self, project_id: &str, payload: Option<&str>) -> Result<(), PersistenceError>;

    /// Reads the stored payload, if any.
    async fn load(&self, project_id: &str) -> Result<Option<String>, PersistenceError>;
}

/// A save issued by the reconciler after a drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveRequest {
    /// Project whose overrides are written.
    pub project_id: String,
    /// Id of the reconciler session that issued the save.
    pub session: u64,
    /// Monotonic per-session counter; higher is newer.
    pub generation: u64,
    /// Patch to write.
    pub patch: OverridePatch,
}

impl SaveRequest {
    /// Serializes the patch for the adapter.
    ///
    /// # Errors
    /// [`PersistenceError::Encode`] if the patch cannot be serialized.
    pub fn payload(&self) -> Result<Option<String>, PersistenceError> {
        store::serialize(&self.patch).map_err(|e| PersistenceError::Encode(e.to_string()))
    }
}

/// How a save ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// Written.
    Saved,
    /// Not sent: a newer save of the same project was already written.
    Superseded,
    /// Failed; the board keeps the unsaved arrangement.
    Failed(PersistenceError),
}

impl SaveOutcome {
    /// Whether the store now holds this save or a newer one.
    pub fn is_persisted(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

/// Reads a project's overrides, degrading to an empty patch when the
/// store fails or the blob is corrupt.
pub async fn load_patch(adapter: &dyn PersistenceAdapter, project_id: &str) -> OverridePatch {
    match adapter.load(project_id).await {
        Ok(raw) => store::parse(raw.as_deref()),
        Err(e) => {
            warn!(project_id = %project_id, error = %e, "Loading overrides failed");
            OverridePatch::new()
        }
    }
}
