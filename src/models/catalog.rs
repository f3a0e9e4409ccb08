//! Phase catalog.
//!
//! The catalog is the immutable, totally-ordered list of workflow phases.
//! It is constructed explicitly and shared by reference (usually behind an
//! `Arc`) so that the calculator and the reconciler can run against any
//! catalog, not just the built-in one.
//!
//! # Adjacency
//! Two phases are adjacent iff their positions differ by exactly one.
//! The optional sink phase is the terminal stage: it only receives cards
//! from its predecessor and never releases them.

use std::collections::HashMap;

use super::{Phase, TaskDuration, TaskTemplate};
use crate::error::CatalogError;
use crate::validation::validate_catalog;

/// Immutable ordered phase catalog.
#[derive(Debug, Clone)]
pub struct PhaseCatalog {
    phases: Vec<Phase>,
    sink: Option<String>,
    phase_index: HashMap<String, usize>,
    task_index: HashMap<String, (usize, usize)>,
}

impl PhaseCatalog {
    /// Builds a catalog after validating it.
    ///
    /// # Errors
    /// Returns every structural problem found (duplicate keys, unknown
    /// sink, ...) as a [`CatalogError`].
    pub fn new(phases: Vec<Phase>, sink: Option<&str>) -> Result<Self, CatalogError> {
        validate_catalog(&phases, sink).map_err(CatalogError::from)?;
        Ok(Self::indexed(phases, sink.map(str::to_string)))
    }

    fn indexed(phases: Vec<Phase>, sink: Option<String>) -> Self {
        let mut phase_index = HashMap::new();
        let mut task_index = HashMap::new();
        for (p, phase) in phases.iter().enumerate() {
            phase_index.insert(phase.key.clone(), p);
            for (t, task) in phase.tasks.iter().enumerate() {
                task_index.insert(task.key.clone(), (p, t));
            }
        }
        Self {
            phases,
            sink,
            phase_index,
            task_index,
        }
    }

    /// The built-in residential development workflow.
    ///
    /// `construction` is the sink phase.
    pub fn standard() -> Self {
        let bd = TaskDuration::business_days;
        let cd = TaskDuration::calendar_days;
        let phases = vec![
            Phase::new("consultation", "Consultation")
                .with_duration(bd(10))
                .with_task(
                    TaskTemplate::new("hearing", "Requirements hearing")
                        .with_duration(bd(5))
                        .with_role("sales"),
                )
                .with_task(
                    TaskTemplate::new("budget", "Budget planning")
                        .with_duration(bd(5))
                        .with_role("sales")
                        .with_role("finance"),
                ),
            Phase::new("land_contract", "Land contract")
                .with_duration(cd(30))
                .with_task(
                    TaskTemplate::new("land_survey", "Land survey")
                        .with_duration(bd(10))
                        .with_role("surveyor"),
                )
                .with_task(
                    TaskTemplate::new("important_matters", "Important matters briefing")
                        .with_duration(bd(3))
                        .with_role("broker")
                        .with_note("Must precede the contract signing"),
                )
                .with_task(
                    TaskTemplate::new("land_signing", "Land contract signing")
                        .with_duration(cd(1))
                        .with_role("broker")
                        .with_role("sales"),
                ),
            Phase::new("design", "Design")
                .with_duration(bd(30))
                .with_task(
                    TaskTemplate::new("floor_plan", "Floor plan")
                        .with_duration(bd(15))
                        .with_role("architect"),
                )
                .with_task(
                    TaskTemplate::new("spec_meeting", "Specification meetings")
                        .with_duration(bd(10))
                        .with_role("architect")
                        .with_role("coordinator"),
                )
                .with_task(
                    TaskTemplate::new("estimate", "Final estimate")
                        .with_duration(bd(5))
                        .with_role("sales"),
                ),
            Phase::new("permit", "Building permit")
                .with_duration(cd(35))
                .with_task(
                    TaskTemplate::new("permit_application", "Permit application")
                        .with_duration(bd(5))
                        .with_role("architect"),
                )
                .with_task(
                    TaskTemplate::new("permit_review", "Permit review")
                        .with_duration(cd(21))
                        .with_role("architect")
                        .with_note("Reviewing authority sets the pace"),
                )
                .with_task(
                    TaskTemplate::new("loan_approval", "Loan approval")
                        .with_duration(bd(10))
                        .with_role("finance"),
                ),
            Phase::new("construction", "Construction").with_duration(cd(120)),
        ];
        Self::indexed(phases, Some("construction".to_string()))
    }

    /// All phases in order.
    pub fn phases(&self) -> &[Phase] {
        &self.phases
    }

    /// Number of phases.
    pub fn len(&self) -> usize {
        self.phases.len()
    }

    /// Whether the catalog has no phases.
    pub fn is_empty(&self) -> bool {
        self.phases.is_empty()
    }

    /// Looks up a phase by key.
    pub fn phase(&self, key: &str) -> Option<&Phase> {
        self.position(key).map(|i| &self.phases[i])
    }

    /// Ordinal position of a phase.
    pub fn position(&self, key: &str) -> Option<usize> {
        self.phase_index.get(key).copied()
    }

    /// Looks up a task template and the phase that owns it.
    pub fn task(&self, key: &str) -> Option<(&Phase, &TaskTemplate)> {
        let &(p, t) = self.task_index.get(key)?;
        let phase = &self.phases[p];
        Some((phase, &phase.tasks[t]))
    }

    /// Key of the phase a task belongs to in the catalog.
    pub fn native_phase_of(&self, task_key: &str) -> Option<&str> {
        self.task(task_key).map(|(phase, _)| phase.key.as_str())
    }

    /// The designated sink phase, if any.
    pub fn sink(&self) -> Option<&str> {
        self.sink.as_deref()
    }

    /// Whether `key` is the sink phase.
    pub fn is_sink(&self, key: &str) -> bool {
        self.sink.as_deref() == Some(key)
    }

    /// Whether two phases sit next to each other in the catalog order.
    pub fn are_adjacent(&self, a: &str, b: &str) -> bool {
        match (self.position(a), self.position(b)) {
            (Some(x), Some(y)) => x.abs_diff(y) == 1,
            _ => false,
        }
    }

    /// Default task order of a phase (catalog order).
    pub fn default_order(&self, phase_key: &str) -> Vec<&str> {
        self.phase(phase_key)
            .map(|p| p.task_keys().collect())
            .unwrap_or_default()
    }
}
