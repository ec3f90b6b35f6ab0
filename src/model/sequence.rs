//! Ordered step sequences and the persisted document shape.

use serde::{Deserialize, Serialize};

use super::step::{Step, StepStatus};

/// Whether a sequence belongs to the embedded product or to a custom
/// (operator-installed) extension. Decided at store construction, never
/// inferred from file paths; it changes where derived log paths point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SequenceKind {
    #[default]
    Embedded,
    Custom,
}

/// The ordered, persisted list of steps for one installable unit.
///
/// Order is semantically meaningful: it is both the default execution order
/// and the dependency order used by positional edits.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    #[serde(default)]
    pub steps: Vec<Step>,
}

impl Sequence {
    /// Create a sequence from a list of steps.
    pub fn new(steps: Vec<Step>) -> Self {
        Self { steps }
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Find a step by name.
    pub fn find(&self, name: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.name == name)
    }

    /// Find a step by name, mutable.
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Step> {
        self.steps.iter_mut().find(|s| s.name == name)
    }

    /// 1-based position of a step by name.
    pub fn position(&self, name: &str) -> Option<usize> {
        self.steps.iter().position(|s| s.name == name).map(|i| i + 1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    /// The first RUNNING step, if any. Mutations and execution treat a
    /// RUNNING step anywhere in the sequence as a conflict.
    pub fn running_step(&self) -> Option<&Step> {
        self.steps.iter().find(|s| s.status == StepStatus::Running)
    }

    /// Drop every step flagged `deleted`. Returns how many were removed.
    pub fn drop_deleted(&mut self) -> usize {
        let before = self.steps.len();
        self.steps.retain(|s| !s.deleted);
        before - self.steps.len()
    }

    /// Steps filtered by status, preserving order.
    pub fn filtered(&self, status: StepStatus) -> Sequence {
        Sequence {
            steps: self
                .steps
                .iter()
                .filter(|s| s.status == status)
                .cloned()
                .collect(),
        }
    }
}
