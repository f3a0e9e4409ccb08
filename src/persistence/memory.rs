//! In-process adapter.
//!
//! Keeps payloads in a map. Used by tests and by embedders that persist
//! elsewhere on their own schedule. Failures and latency can be injected.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Mutex;

use super::PersistenceAdapter;
use crate::error::PersistenceError;

/// Map-backed [`PersistenceAdapter`].
#[derive(Debug, Default)]
pub struct InMemoryAdapter {
    records: Mutex<HashMap<String, String>>,
    history: Mutex<Vec<(String, Option<String>)>>,
    failing_saves: AtomicUsize,
    failing_loads: AtomicUsize,
    save_delay: Option<Duration>,
}

impl InMemoryAdapter {
    /// Creates an empty adapter.
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every save.
    pub fn with_save_delay(mut self, delay: Duration) -> Self {
        self.save_delay = Some(delay);
        self
    }

    /// Makes the next `n` saves fail with a transport error.
    pub fn fail_next_saves(&self, n: usize) {
        self.failing_saves.store(n, Ordering::SeqCst);
    }

    /// Makes the next `n` loads fail with a transport error.
    pub fn fail_next_loads(&self, n: usize) {
        self.failing_loads.store(n, Ordering::SeqCst);
    }

    /// Stores a raw blob directly, bypassing history.
    pub async fn insert_raw(&self, project_id: &str, raw: &str) {
        self.records
            .lock()
            .await
            .insert(project_id.to_string(), raw.to_string());
    }

    /// Currently stored blob.
    pub async fn stored(&self, project_id: &str) -> Option<String> {
        self.records.lock().await.get(project_id).cloned()
    }

    /// Every successful save, oldest first.
    pub async fn history(&self) -> Vec<(String, Option<String>)> {
        self.history.lock().await.clone()
    }

    fn take_failure(counter: &AtomicUsize) -> bool {
        counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl PersistenceAdapter for InMemoryAdapter {
    async fn save(&self, project_id: &str, payload: Option<&str>) -> Result<(), PersistenceError> {
        if let Some(delay) = self.save_delay {
            tokio::time::sleep(delay).await;
        }
        if Self::take_failure(&self.failing_saves) {
            return Err(PersistenceError::Transport("injected save failure".into()));
        }

        let mut records = self.records.lock().await;
        match payload {
            Some(raw) => {
                records.insert(project_id.to_string(), raw.to_string());
            }
            None => {
                records.remove(project_id);
            }
        }
        self.history
            .lock()
            .await
            .push((project_id.to_string(), payload.map(str::to_string)));
        Ok(())
    }

    async fn load(&self, project_id: &str) -> Result<Option<String>, PersistenceError> {
        if Self::take_failure(&self.failing_loads) {
            return Err(PersistenceError::Transport("injected load failure".into()));
        }
        Ok(self.records.lock().await.get(project_id).cloned())
    }
}
