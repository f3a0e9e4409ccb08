//! Override patch serialization.
//!
//! Two on-disk shapes are accepted:
//!
//! - **Bare**: `{ "<phaseKey>": { ...override... }, ... }`
//! - **Envelope**: `{ "phases": { ... }, "taskAssignments": { "<task>": "<phase>" } }`
//!
//! Parsing always yields an [`OverridePatch`]; anything unreadable becomes
//! an empty patch so that a corrupt blob never blocks the timeline.
//! Serialization writes the bare shape when there are no task
//! assignments and returns `None` (the "clear all overrides" sentinel)
//! when nothing is left after pruning.
//!
//! An object with a top-level `phases` or `taskAssignments` key is read as
//! an envelope, so neither name can be used as a phase key in the bare
//! shape.

use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::models::{OverridePatch, PhaseOverride};

const ENVELOPE_KEYS: [&str; 2] = ["phases", "taskAssignments"];

/// Reads a stored blob into a pruned patch.
///
/// `None`, blank input and JSON `null` mean "no overrides".
pub fn parse(raw: Option<&str>) -> OverridePatch {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return OverridePatch::new();
    };

    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Override blob is not valid JSON, ignoring it");
            return OverridePatch::new();
        }
    };

    let is_envelope = matches!(
        &value,
        Value::Object(map) if ENVELOPE_KEYS.iter().any(|k| map.contains_key(*k))
    );

    let mut patch = match value {
        Value::Null => return OverridePatch::new(),
        Value::Object(_) if is_envelope => serde_json::from_value::<OverridePatch>(value),
        Value::Object(_) => serde_json::from_value::<BTreeMap<String, PhaseOverride>>(value)
            .map(|phases| OverridePatch {
                phases,
                task_assignments: BTreeMap::new(),
            }),
        other => {
            warn!(kind = json_kind(&other), "Override blob is not an object, ignoring it");
            return OverridePatch::new();
        }
    }
    .unwrap_or_else(|e| {
        warn!(error = %e, "Override blob has an unexpected shape, ignoring it");
        OverridePatch::new()
    });

    patch.prune();
    debug!(
        phases = patch.phases.len(),
        assignments = patch.task_assignments.len(),
        "Parsed override patch"
    );
    patch
}

/// Writes a patch in its most compact shape.
///
/// # Returns
/// - `Ok(None)` when the pruned patch is empty (clear all overrides)
/// - `Ok(Some(bare))` when there are no task assignments
/// - `Ok(Some(envelope))` otherwise
pub fn serialize(patch: &OverridePatch) -> Result<Option<String>, serde_json::Error> {
    let pruned = patch.pruned();
    if pruned.is_empty() {
        return Ok(None);
    }
    let raw = if pruned.task_assignments.is_empty() {
        serde_json::to_string(&pruned.phases)?
    } else {
        serde_json::to_string(&pruned)?
    };
    Ok(Some(raw))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
