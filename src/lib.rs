//! Stagehand - scriptable installation workflow engine.
//!
//! Stagehand drives a multi-step installation or deployment: an ordered,
//! named sequence of steps, each backed by an external script, executed
//! with dependency tracking, timeout enforcement, failure propagation, and
//! status persisted across restarts.
//!
//! # Modules
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`engine`] - Sequence execution and script supervision
//! - [`error`] - Error types and result aliases
//! - [`extension`] - Extension catalog boundary
//! - [`logs`] - Range reads over step logs
//! - [`merge`] - Reconciliation of a new sequence with the persisted one
//! - [`model`] - Step and sequence entities
//! - [`store`] - Persistent sequence storage and positional editing
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use stagehand::extension::EmptyCatalog;
//! use stagehand::model::SequenceKind;
//! use stagehand::store::{SequenceStore, StoreConfig};
//!
//! let store = SequenceStore::open(
//!     "/usr/local/stagehand/steps.yml",
//!     SequenceKind::Embedded,
//!     StoreConfig::default(),
//!     Arc::new(EmptyCatalog),
//! );
//! store.execute("", "")?;
//! # Ok::<(), stagehand::StagehandError>(())
//! ```

pub mod cli;
pub mod engine;
pub mod error;
pub mod extension;
pub mod logs;
pub mod merge;
pub mod model;
pub mod store;

pub use error::{Result, StagehandError};
