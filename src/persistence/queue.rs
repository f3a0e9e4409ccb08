//! Serialized save queue.
//!
//! A new drop may be issued before the previous save resolves. Sending
//! both straight to the adapter lets them land out of order, so an older
//! arrangement could overwrite a newer one. The queue runs saves one at a
//! time and remembers, per project, the session and generation of the
//! newest save written. A request from that same session at or below it
//! is reported [`SaveOutcome::Superseded`] and not sent. Generations are
//! only comparable within a session, so a request from another session
//! (a rebuilt reconciler, a second one on the same project) is always
//! sent and becomes the new mark.
//!
//! With `serialize_saves` off, requests go straight to the adapter (only
//! the timeout applies).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::{PersistenceAdapter, SaveOutcome, SaveRequest};
use crate::config::PlannerConfig;
use crate::error::PersistenceError;

/// Runs saves through one adapter, one at a time.
pub struct SaveQueue {
    adapter: Arc<dyn PersistenceAdapter>,
    written: Mutex<HashMap<String, (u64, u64)>>,
    config: PlannerConfig,
}

impl SaveQueue {
    /// Creates a queue with default config.
    pub fn new(adapter: Arc<dyn PersistenceAdapter>) -> Self {
        Self {
            adapter,
            written: Mutex::new(HashMap::new()),
            config: PlannerConfig::default(),
        }
    }

    /// Sets the configuration.
    pub fn with_config(mut self, config: PlannerConfig) -> Self {
        self.config = config;
        self
    }

    /// The adapter behind the queue.
    pub fn adapter(&self) -> &Arc<dyn PersistenceAdapter> {
        &self.adapter
    }

    /// Submits a save and waits for it.
    ///
    /// Never retries: a failure is logged and returned.
    pub async fn submit(&self, request: &SaveRequest) -> SaveOutcome {
        let payload = match request.payload() {
            Ok(payload) => payload,
            Err(e) => return self.failed(request, e),
        };

        if !self.config.serialize_saves {
            return match self.send(request, payload.as_deref()).await {
                Ok(()) => SaveOutcome::Saved,
                Err(e) => self.failed(request, e),
            };
        }

        // Held across the save: saves run one at a time
        let mut written = self.written.lock().await;
        if let Some(&(session, newest)) = written.get(&request.project_id) {
            if session == request.session && newest >= request.generation {
                debug!(
                    project_id = %request.project_id,
                    session = request.session,
                    generation = request.generation,
                    newest = newest,
                    "Dropping superseded save"
                );
                return SaveOutcome::Superseded;
            }
        }

        match self.send(request, payload.as_deref()).await {
            Ok(()) => {
                written.insert(
                    request.project_id.clone(),
                    (request.session, request.generation),
                );
                SaveOutcome::Saved
            }
            Err(e) => self.failed(request, e),
        }
    }

    async fn send(
        &self,
        request: &SaveRequest,
        payload: Option<&str>,
    ) -> Result<(), PersistenceError> {
        let timeout_ms = self.config.save_timeout_ms;
        let save = self.adapter.save(&request.project_id, payload);
        match tokio::time::timeout(Duration::from_millis(timeout_ms), save).await {
            Ok(result) => {
                if result.is_ok() {
                    info!(
                        project_id = %request.project_id,
                        generation = request.generation,
                        cleared = payload.is_none(),
                        "Saved override patch"
                    );
                }
                result
            }
            Err(_) => Err(PersistenceError::Timeout { timeout_ms }),
        }
    }

    fn failed(&self, request: &SaveRequest, error: PersistenceError) -> SaveOutcome {
        warn!(
            project_id = %request.project_id,
            session = request.session,
            generation = request.generation,
            error = %error,
            "Saving override patch failed"
        );
        SaveOutcome::Failed(error)
    }
}
