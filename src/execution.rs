//! Ordered record of step outcomes for one reconciliation pass.

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};
use serde_json::{json, Value};
use tracing::warn;

use crate::error::StepError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    RemapToTemporary,
    Remap,
    IndexPattern,
    Dashboard,
    Destination,
    DeleteDocuments,
    Monitor,
    Delete,
}

impl Step {
    pub fn name(self) -> &'static str {
        match self {
            Step::RemapToTemporary => "set_reindex_temporary",
            Step::Remap => "set_reindex",
            Step::IndexPattern => "set_index_pattern",
            Step::Dashboard => "set_dashboard",
            Step::Destination => "set_destination",
            Step::DeleteDocuments => "delete_document",
            Step::Monitor => "set_alert",
            Step::Delete => "delete",
        }
    }
}

impl std::fmt::Display for Step {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// What a step did when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// A mutation was issued and accepted.
    Applied,
    /// Desired state was already present; nothing was sent.
    AlreadySatisfied,
    /// The step's preconditions were absent; it leaves no trace.
    NotApplicable,
}

pub type StepResult = Result<StepStatus, StepError>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Execution {
    pub step: Step,
    pub succeeded: bool,
}

impl Serialize for Execution {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(1))?;
        map.serialize_entry(self.step.name(), &self.succeeded)?;
        map.end()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionLog {
    entries: Vec<Execution>,
    skipped: Vec<Step>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, step: Step, succeeded: bool) {
        self.entries.push(Execution { step, succeeded });
    }

    /// Fold a step result into the log.
    pub fn record(&mut self, step: Step, result: StepResult) {
        match result {
            Ok(StepStatus::Applied) => self.push(step, true),
            Ok(StepStatus::AlreadySatisfied) => self.skipped.push(step),
            Ok(StepStatus::NotApplicable) => {}
            Err(err) => {
                warn!("execution: step {} failed: {}", step, err);
                self.push(step, false);
            }
        }
    }

    pub fn entries(&self) -> &[Execution] {
        &self.entries
    }

    pub fn skipped(&self) -> &[Step] {
        &self.skipped
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Logical AND of all recorded outcomes; empty is success.
    pub fn succeeded(&self) -> bool {
        self.entries.iter().all(|e| e.succeeded)
    }

    pub fn outcome_of(&self, step: Step) -> Option<bool> {
        self.entries
            .iter()
            .find(|e| e.step == step)
            .map(|e| e.succeeded)
    }

    pub fn failed_steps(&self) -> Vec<Step> {
        self.entries
            .iter()
            .filter(|e| !e.succeeded)
            .map(|e| e.step)
            .collect()
    }

    /// Payload for the callback `Data` field.
    pub fn to_data(&self) -> Value {
        let skipped: Vec<&str> = self.skipped.iter().map(|s| s.name()).collect();
        json!({
            "executions": self.entries,
            "skipped": skipped,
        })
    }
}

impl std::fmt::Display for ExecutionLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self
            .entries
            .iter()
            .map(|e| format!("{}={}", e.step, e.succeeded))
            .collect();
        write!(f, "[{}]", parts.join(", "))?;
        if !self.skipped.is_empty() {
            let skipped: Vec<&str> = self.skipped.iter().map(|s| s.name()).collect();
            write!(f, " skipped=[{}]", skipped.join(", "))?;
        }
        Ok(())
    }
}
