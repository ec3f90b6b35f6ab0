//! Core workflow entities.
//!
//! This module defines the persisted data model: a [`Step`] is one named,
//! scriptable unit of work; a [`Sequence`] is the ordered list of steps for
//! one installable unit.

pub mod sequence;
pub mod step;

pub use sequence::{Sequence, SequenceKind};
pub use step::{Step, StepStatus, AT_EACH_RUN, DEFAULT_SCRIPT_TIMEOUT_MINUTES};
