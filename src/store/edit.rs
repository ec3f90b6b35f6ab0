//! Positional sequence editing.
//!
//! Insert, delete, and range-status operations. Positions are 1-based.
//! Every operation is one locked read-modify-write cycle and refuses to
//! touch a sequence with a RUNNING step.

use crate::error::{Result, StagehandError};
use crate::model::{Sequence, Step, StepStatus};

use super::SequenceStore;

impl SequenceStore {
    /// Insert a new step.
    ///
    /// The slot is the 1-based `position`, or the anchor's position + 1
    /// when `anchor` is given. `before` shifts the insertion one slot
    /// earlier, ahead of the resolved slot. The step name must be a
    /// registered extension unit and must not already exist.
    pub fn insert_step(
        &self,
        step: Step,
        position: Option<usize>,
        anchor: Option<&str>,
        before: bool,
    ) -> Result<()> {
        if !self.catalog().is_registered(&step.name) {
            return Err(StagehandError::Validation {
                message: format!("'{}' is not a registered extension", step.name),
            });
        }

        let _guard = self.guard();
        let mut sequence = self.load_steps()?;

        if sequence.contains(&step.name) {
            return Err(StagehandError::Validation {
                message: format!("step '{}' already exists", step.name),
            });
        }
        ensure_idle(&sequence, "insert")?;

        let slot = match anchor {
            Some(name) => {
                sequence
                    .position(name)
                    .ok_or_else(|| StagehandError::StepNotFound {
                        name: name.to_string(),
                    })?
                    + 1
            }
            None => {
                let p = position.ok_or_else(|| StagehandError::Validation {
                    message: "insert needs a position or an anchor step".to_string(),
                })?;
                if p < 1 || p > sequence.len() {
                    return Err(StagehandError::Validation {
                        message: format!(
                            "position {} out of bounds for {} steps",
                            p,
                            sequence.len()
                        ),
                    });
                }
                p
            }
        };

        let index = if before { slot - 1 } else { slot };
        if index > sequence.len() {
            return Err(StagehandError::Validation {
                message: format!(
                    "position {} out of bounds for {} steps",
                    slot,
                    sequence.len()
                ),
            });
        }

        tracing::info!(step = %step.name, index, "inserting step");
        sequence.steps.insert(index, step);
        self.apply_defaults(&mut sequence);
        self.persist(&sequence)
    }

    /// Delete a step by 1-based position or by name. Protected steps
    /// refuse deletion.
    pub fn delete_step(&self, position: Option<usize>, name: Option<&str>) -> Result<()> {
        let _guard = self.guard();
        let mut sequence = self.load_steps()?;

        ensure_idle(&sequence, "delete")?;

        let slot = match name {
            Some(n) => sequence
                .position(n)
                .ok_or_else(|| StagehandError::StepNotFound { name: n.to_string() })?,
            None => {
                let p = position.ok_or_else(|| StagehandError::Validation {
                    message: "delete needs a position or a step name".to_string(),
                })?;
                if p < 1 || p > sequence.len() {
                    return Err(StagehandError::Validation {
                        message: format!(
                            "position {} out of bounds for {} steps",
                            p,
                            sequence.len()
                        ),
                    });
                }
                p
            }
        };

        let target = &sequence.steps[slot - 1];
        if target.protected {
            return Err(StagehandError::Validation {
                message: format!("step '{}' is protected and cannot be deleted", target.name),
            });
        }

        let removed = sequence.steps.remove(slot - 1);
        tracing::info!(step = %removed.name, slot, "deleted step");
        self.persist(&sequence)
    }

    /// Set the status of every step in a name-bounded range, in order.
    ///
    /// `from`/`to` default to the first and last step; the `included`
    /// flags shift the boundary inward by one when false. An inverted
    /// range is an error.
    pub fn set_status_range(
        &self,
        status: &str,
        from: Option<&str>,
        from_included: bool,
        to: Option<&str>,
        to_included: bool,
    ) -> Result<()> {
        if StepStatus::parse(status).is_none() {
            return Err(StagehandError::Validation {
                message: format!("invalid status '{}'", status),
            });
        }

        let names = {
            let _guard = self.guard();
            let sequence = self.load_steps()?;

            let mut start = match from {
                Some(n) => sequence
                    .position(n)
                    .ok_or_else(|| StagehandError::StepNotFound { name: n.to_string() })?,
                None => 1,
            };
            let mut end = match to {
                Some(n) => sequence
                    .position(n)
                    .ok_or_else(|| StagehandError::StepNotFound { name: n.to_string() })?,
                None => sequence.len(),
            };

            if !from_included {
                start += 1;
            }
            if !to_included {
                end = end.saturating_sub(1);
            }
            if start > end {
                return Err(StagehandError::Validation {
                    message: format!("inverted range: {} > {}", start, end),
                });
            }

            sequence.steps[start - 1..end]
                .iter()
                .map(|s| s.name.clone())
                .collect::<Vec<_>>()
        };

        // Each step transition is its own locked cycle, same as execution,
        // so pollers observe the range being applied step by step.
        for name in names {
            self.set_status(&name, status, "", "", -1, false)?;
        }
        Ok(())
    }
}

/// Mutations are rejected while anything is RUNNING.
fn ensure_idle(sequence: &Sequence, operation: &str) -> Result<()> {
    if let Some(step) = sequence.running_step() {
        return Err(StagehandError::Conflict {
            message: format!("cannot {}: step '{}' is running", operation, step.name),
        });
    }
    Ok(())
}
