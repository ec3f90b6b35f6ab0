//! Persistent sequence storage.
//!
//! A [`SequenceStore`] owns one sequence file and the mutual-exclusion lock
//! guarding every read-modify-write cycle against concurrent in-process
//! callers. It does not protect against other processes touching the same
//! file. Steps are re-read and defaults re-applied on every operation;
//! nothing is cached across calls, so the file is always the source of
//! truth.

pub mod edit;
pub mod registry;

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, StagehandError};
use crate::extension::ExtensionCatalog;
use crate::model::{Sequence, SequenceKind, Step, StepStatus, DEFAULT_SCRIPT_TIMEOUT_MINUTES};

pub use registry::StoreRegistry;

/// Paths the store derives step defaults from.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory step log files default into.
    pub log_dir: PathBuf,
    /// Directory the generated default script invocation points at.
    pub scripts_dir: PathBuf,
    /// The control-plane's own log file, served by the `pcm` virtual
    /// log source.
    pub shared_log_path: PathBuf,
    /// Where the `pcm` source keeps its snapshot copy.
    pub scratch_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            log_dir: PathBuf::from("/var/log/stagehand"),
            scripts_dir: PathBuf::from("/usr/share/stagehand/scripts"),
            shared_log_path: PathBuf::from("/var/log/stagehand/stagehand.log"),
            scratch_dir: std::env::temp_dir(),
        }
    }
}

/// One sequence file plus the lock serializing access to it.
pub struct SequenceStore {
    path: PathBuf,
    kind: SequenceKind,
    config: StoreConfig,
    catalog: Arc<dyn ExtensionCatalog>,
    lock: Mutex<()>,
}

impl std::fmt::Debug for SequenceStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SequenceStore")
            .field("path", &self.path)
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl SequenceStore {
    /// Bind a store to a sequence file. The file is not read until the
    /// first operation.
    pub fn open(
        path: impl Into<PathBuf>,
        kind: SequenceKind,
        config: StoreConfig,
        catalog: Arc<dyn ExtensionCatalog>,
    ) -> Self {
        Self {
            path: path.into(),
            kind,
            config,
            catalog,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> SequenceKind {
        self.kind
    }

    pub(crate) fn config(&self) -> &StoreConfig {
        &self.config
    }

    pub(crate) fn catalog(&self) -> &Arc<dyn ExtensionCatalog> {
        &self.catalog
    }

    /// Take the store lock. A poisoned lock is recovered rather than
    /// propagated: the on-disk file always reflects the last completed
    /// write, so the state behind the lock is consistent.
    pub(crate) fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Read the sequence file and apply defaults. Callers must hold the
    /// store lock.
    pub(crate) fn load_steps(&self) -> Result<Sequence> {
        let content = std::fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StagehandError::SequenceNotFound {
                    path: self.path.clone(),
                }
            } else {
                StagehandError::Io(e)
            }
        })?;

        let mut sequence: Sequence =
            serde_yaml::from_str(&content).map_err(|e| StagehandError::ParseError {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        self.apply_defaults(&mut sequence);
        Ok(sequence)
    }

    /// Persist the sequence with a write-to-temp-then-rename so the file is
    /// never left partially written. Callers must hold the store lock.
    pub(crate) fn persist(&self, sequence: &Sequence) -> Result<()> {
        if let Some(dir) = self.path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let content =
            serde_yaml::to_string(sequence).map_err(|e| StagehandError::ParseError {
                path: self.path.clone(),
                message: e.to_string(),
            })?;

        let temp_path = self.path.with_extension("yml.tmp");
        std::fs::write(&temp_path, &content)?;
        std::fs::rename(&temp_path, &self.path)?;

        tracing::debug!(path = %self.path.display(), steps = sequence.len(), "sequence persisted");
        Ok(())
    }

    /// Fill empty step fields in place. Applied on every load, never baked
    /// into the file; applying twice yields the same result as once.
    pub fn apply_defaults(&self, sequence: &mut Sequence) {
        for step in &mut sequence.steps {
            if step.label.is_empty() {
                step.label = step.name.clone();
            }
            if step.log_path.is_empty() {
                step.log_path = self.default_log_path(&step.name);
            }
            if step.script.is_empty() {
                step.script = format!(
                    "sh {}",
                    self.config.scripts_dir.join(format!("{}.sh", step.name)).display()
                );
            }
            if step.script_timeout < 0 {
                step.script_timeout = DEFAULT_SCRIPT_TIMEOUT_MINUTES;
            }
        }
    }

    fn default_log_path(&self, step_name: &str) -> String {
        let dir = match self.kind {
            SequenceKind::Embedded => self.config.log_dir.clone(),
            SequenceKind::Custom => self.config.log_dir.join("custom"),
        };
        dir.join(format!("{}.log", step_name)).display().to_string()
    }

    /// All steps, optionally filtered by status.
    pub fn get_all(&self, status: Option<StepStatus>) -> Result<Sequence> {
        let _guard = self.guard();
        let sequence = self.load_steps()?;
        Ok(match status {
            Some(wanted) => sequence.filtered(wanted),
            None => sequence,
        })
    }

    /// One step by name.
    pub fn get(&self, name: &str) -> Result<Step> {
        let _guard = self.guard();
        let sequence = self.load_steps()?;
        sequence
            .find(name)
            .cloned()
            .ok_or_else(|| StagehandError::StepNotFound {
                name: name.to_string(),
            })
    }

    /// Whether any step is currently RUNNING.
    pub fn is_running(&self) -> Result<bool> {
        let _guard = self.guard();
        Ok(self.load_steps()?.running_step().is_some())
    }

    /// Apply a newly supplied sequence.
    ///
    /// With `overwrite` the (delete-filtered) new sequence replaces the
    /// current one outright and a missing file counts as an empty current
    /// sequence. Without it the new sequence is merged with the persisted
    /// one through the dependency graph; on a cycle nothing is written.
    pub fn replace_all(&self, incoming: &Sequence, overwrite: bool) -> Result<()> {
        let _guard = self.guard();

        let merged = if overwrite {
            // Overwrite never reads the current file, so a missing file is
            // simply an empty current sequence.
            let mut replacement = incoming.clone();
            replacement.drop_deleted();
            replacement
        } else {
            let current = self.load_steps()?;
            crate::merge::merge_sequences(incoming, &current)?
        };

        let mut merged = merged;
        self.apply_defaults(&mut merged);
        self.persist(&merged)?;
        tracing::info!(
            path = %self.path.display(),
            steps = merged.len(),
            overwrite,
            "sequence replaced"
        );
        Ok(())
    }
}
