//! Step entity and status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Phase tag that forces a step back to READY before every execution pass.
pub const AT_EACH_RUN: &str = "AtEachRun";

/// Status of a step in the workflow.
///
/// Transitions: READY → RUNNING → SUCCEEDED | FAILED. FAILED and SUCCEEDED
/// return to READY via an operator reset. SKIP is entered and left only by
/// explicit operator action, never by the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    #[default]
    Ready,
    Running,
    Succeeded,
    Failed,
    Skip,
}

impl StepStatus {
    /// Parse an operator-supplied status string.
    ///
    /// Returns `None` for anything outside the five enumerated values.
    /// Matching is case-insensitive since this is CLI-facing input.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "READY" => Some(StepStatus::Ready),
            "RUNNING" => Some(StepStatus::Running),
            "SUCCEEDED" => Some(StepStatus::Succeeded),
            "FAILED" => Some(StepStatus::Failed),
            "SKIP" => Some(StepStatus::Skip),
            _ => None,
        }
    }

    /// Check if this is a terminal state (no more changes expected from
    /// the current pass).
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            StepStatus::Succeeded | StepStatus::Failed | StepStatus::Skip
        )
    }
}

impl std::fmt::Display for StepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            StepStatus::Ready => "READY",
            StepStatus::Running => "RUNNING",
            StepStatus::Succeeded => "SUCCEEDED",
            StepStatus::Failed => "FAILED",
            StepStatus::Skip => "SKIP",
        };
        write!(f, "{}", s)
    }
}

/// A single unit of work within a sequence.
///
/// Only `name` is required in the persisted document; every other field has
/// a default derived on load (see `SequenceStore::apply_defaults`), never
/// baked into the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// Unique key within the sequence.
    pub name: String,

    /// Optional phase tag. [`AT_EACH_RUN`] makes the step re-run on every pass.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phase: Option<String>,

    /// Display name, defaults to `name`.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub label: String,

    /// Where the step's script output is written.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log_path: String,

    #[serde(default)]
    pub status: StepStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Failure explanation; cleared unless status is FAILED.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub reason: String,

    /// Shell command line for this step.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub script: String,

    /// Script timeout in minutes; 0 means no timeout.
    #[serde(default = "default_script_timeout")]
    pub script_timeout: i64,

    /// Protected steps refuse deletion.
    #[serde(default, skip_serializing_if = "is_false")]
    pub protected: bool,

    /// Transient marker: a merge removes steps flagged deleted. Never
    /// persists past the merge that consumed it.
    #[serde(default, skip_serializing_if = "is_false")]
    pub deleted: bool,

    /// Names of steps forced back to READY whenever this step runs, and
    /// flipped SUCCEEDED→FAILED when this step ends FAILED.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub states_to_rerun: Vec<String>,
}

/// Default timeout applied when a step does not specify one.
pub const DEFAULT_SCRIPT_TIMEOUT_MINUTES: i64 = 60;

fn default_script_timeout() -> i64 {
    DEFAULT_SCRIPT_TIMEOUT_MINUTES
}

fn is_false(v: &bool) -> bool {
    !*v
}

impl Step {
    /// Create a step with just a name; all other fields take their
    /// load-time defaults.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            phase: None,
            label: String::new(),
            log_path: String::new(),
            status: StepStatus::Ready,
            start_time: None,
            end_time: None,
            reason: String::new(),
            script: String::new(),
            script_timeout: DEFAULT_SCRIPT_TIMEOUT_MINUTES,
            protected: false,
            deleted: false,
            states_to_rerun: Vec::new(),
        }
    }

    /// Reset run history: status back to READY, timestamps and reason cleared.
    pub fn reset(&mut self) {
        self.status = StepStatus::Ready;
        self.start_time = None;
        self.end_time = None;
        self.reason.clear();
    }

    /// Whether this step re-runs on every execution pass.
    pub fn runs_at_each_pass(&self) -> bool {
        self.phase.as_deref() == Some(AT_EACH_RUN)
    }

    /// Copy run-history fields (status, timestamps, failure reason) from
    /// another step record. Used by the merge to retain history for steps
    /// present in both the new and current sequences.
    pub fn retain_history_from(&mut self, current: &Step) {
        self.status = current.status;
        self.start_time = current.start_time;
        self.end_time = current.end_time;
        self.reason = current.reason.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_all_five_values() {
        assert_eq!(StepStatus::parse("READY"), Some(StepStatus::Ready));
        assert_eq!(StepStatus::parse("RUNNING"), Some(StepStatus::Running));
        assert_eq!(StepStatus::parse("SUCCEEDED"), Some(StepStatus::Succeeded));
        assert_eq!(StepStatus::parse("FAILED"), Some(StepStatus::Failed));
        assert_eq!(StepStatus::parse("SKIP"), Some(StepStatus::Skip));
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(StepStatus::parse("skip"), Some(StepStatus::Skip));
        assert_eq!(StepStatus::parse("Ready"), Some(StepStatus::Ready));
    }

    #[test]
    fn status_rejects_unknown_values() {
        assert_eq!(StepStatus::parse("DONE"), None);
        assert_eq!(StepStatus::parse(""), None);
    }

    #[test]
    fn status_serializes_uppercase() {
        let yaml = serde_yaml::to_string(&StepStatus::Succeeded).unwrap();
        assert!(yaml.contains("SUCCEEDED"));
    }

    #[test]
    fn status_terminal_states() {
        assert!(!StepStatus::Ready.is_terminal());
        assert!(!StepStatus::Running.is_terminal());
        assert!(StepStatus::Succeeded.is_terminal());
        assert!(StepStatus::Failed.is_terminal());
        assert!(StepStatus::Skip.is_terminal());
    }

    #[test]
    fn reset_clears_run_history() {
        let mut step = Step::named("director");
        step.status = StepStatus::Failed;
        step.start_time = Some(Utc::now());
        step.end_time = Some(Utc::now());
        step.reason = "exit 1".into();

        step.reset();

        assert_eq!(step.status, StepStatus::Ready);
        assert!(step.start_time.is_none());
        assert!(step.end_time.is_none());
        assert!(step.reason.is_empty());
    }

    #[test]
    fn at_each_run_phase_detected() {
        let mut step = Step::named("prepare");
        assert!(!step.runs_at_each_pass());

        step.phase = Some(AT_EACH_RUN.to_string());
        assert!(step.runs_at_each_pass());

        step.phase = Some("install".to_string());
        assert!(!step.runs_at_each_pass());
    }

    #[test]
    fn retain_history_copies_only_run_fields() {
        let mut incoming = Step::named("director");
        incoming.script = "sh new.sh".into();

        let mut current = Step::named("director");
        current.status = StepStatus::Succeeded;
        current.start_time = Some(Utc::now());
        current.end_time = Some(Utc::now());
        current.script = "sh old.sh".into();

        incoming.retain_history_from(&current);

        assert_eq!(incoming.status, StepStatus::Succeeded);
        assert!(incoming.start_time.is_some());
        assert_eq!(incoming.script, "sh new.sh");
    }

    #[test]
    fn step_deserializes_with_only_name() {
        let step: Step = serde_yaml::from_str("name: director").unwrap();
        assert_eq!(step.name, "director");
        assert_eq!(step.status, StepStatus::Ready);
        assert_eq!(step.script_timeout, DEFAULT_SCRIPT_TIMEOUT_MINUTES);
        assert!(!step.protected);
        assert!(step.states_to_rerun.is_empty());
    }

    #[test]
    fn transient_deleted_flag_not_serialized_when_clear() {
        let step = Step::named("director");
        let yaml = serde_yaml::to_string(&step).unwrap();
        assert!(!yaml.contains("deleted"));
    }
}
