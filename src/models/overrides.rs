//! Override patch model.
//!
//! An override patch records the manual deviations an operator made from
//! the catalog-computed schedule of one project. It is persisted as a
//! single JSON blob (see [`crate::store`]).
//!
//! # Pruning
//! An override entry whose fields are all unset or empty carries no
//! information and is dropped by [`OverridePatch::prune`]. An empty note
//! string counts as unset.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Manual adjustments for one phase.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct PhaseOverride {
    /// Replaces the computed phase start date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<NaiveDate>,
    /// Replaces the computed phase end date.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
    /// Operator note.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// Authoritative task order for the column.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sub_phase_order: Option<Vec<String>>,
    /// Task keys hidden from this phase.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped_sub_phases: Vec<String>,
    /// Task key → duration amount (unit of the template is kept).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub custom_durations: BTreeMap<String, u32>,
    /// Task key → pinned end date.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fixed_dates: BTreeMap<String, NaiveDate>,
}

impl PhaseOverride {
    /// Creates an empty override.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the start date.
    pub fn with_start_date(mut self, date: NaiveDate) -> Self {
        self.start_date = Some(date);
        self
    }

    /// Sets the end date.
    pub fn with_end_date(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Sets the note.
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Sets the task order.
    pub fn with_order<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.sub_phase_order = Some(keys.into_iter().map(Into::into).collect());
        self
    }

    /// Marks a task as skipped.
    pub fn with_skipped(mut self, task_key: impl Into<String>) -> Self {
        self.skipped_sub_phases.push(task_key.into());
        self
    }

    /// Sets a custom duration amount.
    pub fn with_custom_duration(mut self, task_key: impl Into<String>, amount: u32) -> Self {
        self.custom_durations.insert(task_key.into(), amount);
        self
    }

    /// Pins a task's end date.
    pub fn with_fixed_date(mut self, task_key: impl Into<String>, date: NaiveDate) -> Self {
        self.fixed_dates.insert(task_key.into(), date);
        self
    }

    /// Whether the task is skipped in this phase.
    pub fn is_skipped(&self, task_key: &str) -> bool {
        self.skipped_sub_phases.iter().any(|k| k == task_key)
    }

    /// Clears fields that hold no information (empty note, empty order).
    pub fn normalize(&mut self) {
        if self.note.as_deref().is_some_and(str::is_empty) {
            self.note = None;
        }
        if self.sub_phase_order.as_ref().is_some_and(Vec::is_empty) {
            self.sub_phase_order = None;
        }
    }

    /// Whether no field carries information.
    pub fn is_empty(&self) -> bool {
        self.start_date.is_none()
            && self.end_date.is_none()
            && self.note.as_deref().map_or(true, str::is_empty)
            && self.sub_phase_order.as_ref().map_or(true, Vec::is_empty)
            && self.skipped_sub_phases.is_empty()
            && self.custom_durations.is_empty()
            && self.fixed_dates.is_empty()
    }
}

/// The full per-project override patch.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct OverridePatch {
    /// Phase key → override.
    pub phases: BTreeMap<String, PhaseOverride>,
    /// Task key → destination phase key, for tasks moved off their
    /// native phase.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub task_assignments: BTreeMap<String, String>,
}

impl OverridePatch {
    /// Creates an empty patch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the override of a phase.
    pub fn with_phase(mut self, phase_key: impl Into<String>, entry: PhaseOverride) -> Self {
        self.phases.insert(phase_key.into(), entry);
        self
    }

    /// Reassigns a task to another phase.
    pub fn with_assignment(
        mut self,
        task_key: impl Into<String>,
        phase_key: impl Into<String>,
    ) -> Self {
        self.task_assignments
            .insert(task_key.into(), phase_key.into());
        self
    }

    /// Override of a phase, if any.
    pub fn phase(&self, phase_key: &str) -> Option<&PhaseOverride> {
        self.phases.get(phase_key)
    }

    /// Destination phase of a reassigned task.
    pub fn assignment(&self, task_key: &str) -> Option<&str> {
        self.task_assignments.get(task_key).map(String::as_str)
    }

    /// Normalizes every entry and drops the empty ones.
    pub fn prune(&mut self) {
        for entry in self.phases.values_mut() {
            entry.normalize();
        }
        self.phases.retain(|_, entry| !entry.is_empty());
    }

    /// Returns a pruned copy.
    pub fn pruned(&self) -> Self {
        let mut copy = self.clone();
        copy.prune();
        copy
    }

    /// Whether the patch carries no information at all.
    pub fn is_empty(&self) -> bool {
        self.task_assignments.is_empty() && self.phases.values().all(PhaseOverride::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_empty_note_is_empty() {
        assert!(PhaseOverride::new().with_note("").is_empty());
        assert!(!PhaseOverride::new().with_note("call the client").is_empty());
        assert!(PhaseOverride::new()
            .with_order(Vec::<String>::new())
            .is_empty());
    }

    #[test]
    fn test_prune_drops_empty_entries() {
        let mut patch = OverridePatch::new()
            .with_phase("A", PhaseOverride::new().with_note(""))
            .with_phase("B", PhaseOverride::new().with_end_date(date(2026, 3, 1)));
        patch.prune();
        assert!(patch.phase("A").is_none());
        assert!(patch.phase("B").is_some());
    }

    #[test]
    fn test_prune_normalizes_kept_entries() {
        let mut patch = OverridePatch::new().with_phase(
            "A",
            PhaseOverride::new().with_note("").with_skipped("a1"),
        );
        patch.prune();
        let entry = patch.phase("A").unwrap();
        assert_eq!(entry.note, None);
        assert!(entry.is_skipped("a1"));
    }

    #[test]
    fn test_patch_is_empty() {
        assert!(OverridePatch::new().is_empty());
        assert!(OverridePatch::new()
            .with_phase("A", PhaseOverride::new())
            .is_empty());
        assert!(!OverridePatch::new().with_assignment("b1", "A").is_empty());
    }

    #[test]
    fn test_wire_field_names() {
        let entry = PhaseOverride::new()
            .with_order(["a2", "a1"])
            .with_fixed_date("a1", date(2026, 2, 2))
            .with_custom_duration("a2", 4);
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["subPhaseOrder"][0], "a2");
        assert_eq!(json["fixedDates"]["a1"], "2026-02-02");
        assert_eq!(json["customDurations"]["a2"], 4);
        assert!(json.get("skippedSubPhases").is_none());
        assert!(json.get("note").is_none());
    }
}
