//! Execution engine.
//!
//! Walks a sequence in order, running each runnable step's script under
//! supervision and recording the status transition after every stage. Each
//! transition is its own locked read-modify-write cycle, so status pollers
//! observe intermediate per-step state during a long pass.

pub mod script;

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;

use crate::error::{Result, StagehandError};
use crate::model::{Sequence, SequenceKind, StepStatus};
use crate::store::SequenceStore;

use script::{append_failure_trailer, last_log_line, run_script};

/// What one walked step asks the engine to do next.
struct RunPlan {
    script: String,
    timeout: i64,
    log_path: PathBuf,
}

impl SequenceStore {
    /// Set one step's status and optionally overwrite its script or
    /// timeout.
    ///
    /// An empty `status` leaves the status unchanged. READY resets the
    /// step's run history; with `recursive`, a step that names a
    /// registered extension unit also resets that unit's own nested
    /// sequence, looked up by name through the catalog. `reason` is kept
    /// only for FAILED. `script` (empty = not provided) and `timeout`
    /// (negative = not provided) are overwritten only when given.
    pub fn set_status(
        &self,
        name: &str,
        status: &str,
        reason: &str,
        script: &str,
        timeout: i64,
        recursive: bool,
    ) -> Result<()> {
        let new_status = match status {
            "" => None,
            other => Some(StepStatus::parse(other).ok_or_else(|| {
                StagehandError::Validation {
                    message: format!("invalid status '{}'", other),
                }
            })?),
        };

        {
            let _guard = self.guard();
            let mut sequence = self.load_steps()?;
            let step = sequence
                .find_mut(name)
                .ok_or_else(|| StagehandError::StepNotFound {
                    name: name.to_string(),
                })?;

            if let Some(wanted) = new_status {
                if wanted == StepStatus::Ready {
                    step.reset();
                } else {
                    step.status = wanted;
                    step.reason = if wanted == StepStatus::Failed {
                        reason.to_string()
                    } else {
                        String::new()
                    };
                }
            }
            if !script.is_empty() {
                step.script = script.to_string();
            }
            if timeout >= 0 {
                step.script_timeout = timeout;
            }
            self.persist(&sequence)?;
        }

        if new_status == Some(StepStatus::Ready)
            && recursive
            && self.catalog().is_registered(name)
        {
            self.reset_nested_unit(name)?;
        }
        Ok(())
    }

    /// Run the sequence from `from` through `to`, both inclusive; empty
    /// names mean the first and last step.
    ///
    /// SUCCEEDED and SKIP steps are passed over; FAILED and READY steps
    /// run again. A step failure is recorded as its FAILED status, its
    /// rerun dependents are flipped, and the pass halts with the error. A
    /// panic inside the supervision path is recovered into a FAILED
    /// status instead of tearing the engine down.
    pub fn execute(&self, from: &str, to: &str) -> Result<()> {
        let order: Vec<String> = {
            let _guard = self.guard();
            let sequence = self.load_steps()?;
            if let Some(step) = sequence.running_step() {
                return Err(StagehandError::Conflict {
                    message: format!("step '{}' is already running", step.name),
                });
            }
            for bound in [from, to] {
                if !bound.is_empty() && !sequence.contains(bound) {
                    return Err(StagehandError::StepNotFound {
                        name: bound.to_string(),
                    });
                }
            }
            sequence.steps.iter().map(|s| s.name.clone()).collect()
        };

        let mut in_window = from.is_empty();
        for name in order {
            if name == from {
                in_window = true;
            }

            let plan = self.stage_step(&name, in_window)?;
            if let Some(plan) = plan {
                tracing::info!(step = %name, script = %plan.script, "executing step");
                self.run_staged_step(&name, &plan)?;
            }

            if !to.is_empty() && name == to {
                break;
            }
        }
        Ok(())
    }

    /// Reset every step to READY, cascading into registered units'
    /// nested sequences.
    pub fn reset_all(&self) -> Result<()> {
        let nested_units = {
            let _guard = self.guard();
            let mut sequence = self.load_steps()?;
            if let Some(step) = sequence.running_step() {
                return Err(StagehandError::Conflict {
                    message: format!("cannot reset: step '{}' is running", step.name),
                });
            }

            let mut units = Vec::new();
            for step in &mut sequence.steps {
                step.reset();
                if self.catalog().is_registered(&step.name) {
                    units.push(step.name.clone());
                }
            }
            self.persist(&sequence)?;
            units
        };

        for unit in nested_units {
            self.reset_nested_unit(&unit)?;
        }
        Ok(())
    }

    /// Evaluate one walked step and, if it should run, mark it RUNNING
    /// and reset its rerun dependencies — all in one locked cycle.
    fn stage_step(&self, name: &str, in_window: bool) -> Result<Option<RunPlan>> {
        let _guard = self.guard();
        let mut sequence = self.load_steps()?;

        let Some(step) = sequence.find_mut(name) else {
            // The step vanished mid-pass (concurrent edit); walk on.
            return Ok(None);
        };

        if step.status == StepStatus::Running {
            return Err(StagehandError::Conflict {
                message: format!("step '{}' is already running", name),
            });
        }

        let mut dirty = false;
        if step.runs_at_each_pass() && step.status != StepStatus::Ready {
            step.reset();
            dirty = true;
        }

        let runnable = in_window
            && !matches!(step.status, StepStatus::Succeeded | StepStatus::Skip)
            && !step.script.trim().is_empty();

        let plan = if runnable {
            step.status = StepStatus::Running;
            step.start_time = Some(Utc::now());
            step.end_time = None;
            step.reason.clear();
            let plan = RunPlan {
                script: step.script.clone(),
                timeout: step.script_timeout,
                log_path: PathBuf::from(&step.log_path),
            };
            let rerun = step.states_to_rerun.clone();

            for dep in &rerun {
                if dep == name {
                    continue;
                }
                if let Some(target) = sequence.find_mut(dep) {
                    if target.status != StepStatus::Skip {
                        target.reset();
                    }
                }
            }
            dirty = true;
            Some(plan)
        } else {
            None
        };

        if dirty {
            self.persist(&sequence)?;
        }
        Ok(plan)
    }

    /// Supervise the staged script and record the outcome. Returns the
    /// error that halts the pass when the step fails.
    fn run_staged_step(&self, name: &str, plan: &RunPlan) -> Result<()> {
        let supervised = catch_unwind(AssertUnwindSafe(|| {
            run_script(&plan.script, &plan.log_path, plan.timeout)
        }));

        let failure = match supervised {
            Ok(Ok(outcome)) if outcome.success => None,
            Ok(Ok(outcome)) => {
                let mut detail = outcome.message.clone();
                if let Some(line) = last_log_line(&plan.log_path) {
                    detail = format!("{}: {}", detail, line);
                }
                let halt = StagehandError::ScriptFailed {
                    step: name.to_string(),
                    message: detail.clone(),
                };
                Some((detail, halt))
            }
            Ok(Err(e)) => {
                let detail = e.to_string();
                let halt = StagehandError::ScriptFailed {
                    step: name.to_string(),
                    message: detail.clone(),
                };
                Some((detail, halt))
            }
            Err(_) => {
                tracing::error!(step = %name, "panic during step execution, recovering");
                Some((
                    "unexpected crash during execution".to_string(),
                    StagehandError::CrashRecovered {
                        step: name.to_string(),
                    },
                ))
            }
        };

        match failure {
            None => {
                self.finish_step(name, StepStatus::Succeeded, "")?;
                Ok(())
            }
            Some((detail, halt)) => {
                let _ = append_failure_trailer(&plan.log_path, name, &plan.script, &detail);
                self.finish_step(name, StepStatus::Failed, &detail)?;
                Err(halt)
            }
        }
    }

    /// Final status transition for one executed step, including rerun
    /// dependency propagation on failure.
    fn finish_step(&self, name: &str, status: StepStatus, reason: &str) -> Result<()> {
        let _guard = self.guard();
        let mut sequence = self.load_steps()?;

        if let Some(step) = sequence.find_mut(name) {
            step.status = status;
            step.end_time = Some(Utc::now());
            step.reason = if status == StepStatus::Failed {
                reason.to_string()
            } else {
                String::new()
            };
        }

        if status == StepStatus::Failed {
            propagate_failure(&mut sequence, name);
        }
        self.persist(&sequence)
    }

    /// Reset another unit's own nested sequence, resolved by name through
    /// the extension catalog. A unit with no sequence file yet has nothing
    /// to reset.
    fn reset_nested_unit(&self, name: &str) -> Result<()> {
        let path = self.catalog().nested_sequence_path(name)?;
        let nested = SequenceStore::open(
            path,
            SequenceKind::Custom,
            self.config().clone(),
            Arc::clone(self.catalog()),
        );
        match nested.reset_all() {
            Err(StagehandError::SequenceNotFound { .. }) => Ok(()),
            other => other,
        }
    }
}

/// Flip every SUCCEEDED rerun dependency of the failed step to FAILED,
/// recursively: an artifact produced for a step that failed is no longer
/// trustworthy, and neither are artifacts produced for it.
fn propagate_failure(sequence: &mut Sequence, failed: &str) {
    let mut worklist = vec![failed.to_string()];
    while let Some(current) = worklist.pop() {
        let targets = sequence
            .find(&current)
            .map(|s| s.states_to_rerun.clone())
            .unwrap_or_default();
        for target in targets {
            if let Some(step) = sequence.find_mut(&target) {
                if step.status == StepStatus::Succeeded {
                    step.status = StepStatus::Failed;
                    step.reason = format!("dependency of failed step '{}'", current);
                    tracing::warn!(step = %target, failed = %current, "failure propagated");
                    worklist.push(target);
                }
            }
        }
    }
}
