//! Error types for Stagehand operations.
//!
//! This module defines [`StagehandError`], the primary error type used
//! throughout the engine, and a [`Result`] type alias for convenience.
//!
//! # Error Handling Strategy
//!
//! - Use `StagehandError` for domain-specific errors that need distinct handling
//! - Use `anyhow::Error` (via `StagehandError::Other`) for unexpected errors
//! - All errors should provide actionable messages for operators

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for Stagehand operations.
#[derive(Debug, Error)]
pub enum StagehandError {
    /// A step with the given name does not exist in the sequence.
    #[error("Unknown step: {name}")]
    StepNotFound { name: String },

    /// The sequence file could not be found.
    #[error("Sequence file not found: {path}")]
    SequenceNotFound { path: PathBuf },

    /// A step's log file is missing or its log path is unset.
    #[error("No log available for step '{name}': {message}")]
    LogNotFound { name: String, message: String },

    /// A running step blocks the requested mutation or execution.
    #[error("Conflict: {message}")]
    Conflict { message: String },

    /// Invalid input: bad status value, inverted range, out-of-bounds
    /// position, unregistered extension name, or protected-step deletion.
    #[error("Invalid request: {message}")]
    Validation { message: String },

    /// The merge graph contains a dependency cycle.
    #[error("Circular dependency detected: {cycle}")]
    CircularDependency { cycle: String },

    /// A step's script failed: nonzero exit, timeout kill, or spawn failure.
    #[error("Step '{step}' failed: {message}")]
    ScriptFailed { step: String, message: String },

    /// A panic during step execution was recovered and recorded as FAILED.
    #[error("Step '{step}' crashed during execution")]
    CrashRecovered { step: String },

    /// Failed to parse a persisted sequence file.
    #[error("Failed to parse sequence at {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic wrapped error for anyhow interop.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias for Stagehand operations.
pub type Result<T> = std::result::Result<T, StagehandError>;
