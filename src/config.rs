//! Planner configuration.
//!
//! All fields have defaults, so an empty JSON object (or no config at all)
//! yields a working setup.

use serde::{Deserialize, Serialize};
use tracing::warn;

/// Tunables for the calculator and the save path.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PlannerConfig {
    /// Days ahead of today that count as "upcoming".
    pub upcoming_window_days: u32,
    /// Per-save timeout (ms).
    pub save_timeout_ms: u64,
    /// Route saves through one queue so an older save can't land after a
    /// newer one.
    pub serialize_saves: bool,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            upcoming_window_days: 7,
            save_timeout_ms: 10_000,
            serialize_saves: true,
        }
    }
}

impl PlannerConfig {
    /// Parses a JSON config, falling back to defaults when it is malformed.
    pub fn from_json(raw: &str) -> Self {
        match serde_json::from_str(raw) {
            Ok(config) => config,
            Err(e) => {
                warn!(error = %e, "Malformed planner config, using defaults");
                Self::default()
            }
        }
    }

    /// Sets the upcoming window.
    pub fn with_upcoming_window_days(mut self, days: u32) -> Self {
        self.upcoming_window_days = days;
        self
    }

    /// Sets the save timeout.
    pub fn with_save_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.save_timeout_ms = timeout_ms;
        self
    }
}
