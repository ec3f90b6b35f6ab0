//! Extension catalog boundary.
//!
//! Packaging, manifests, and registration of extensions live outside this
//! crate. The engine only ever asks two questions: is a name a valid,
//! registered unit, and where does that unit's own nested sequence file
//! live. Both are answered through [`ExtensionCatalog`], looked up by name
//! so sequences never hold handles into each other.

use std::path::{Path, PathBuf};

use crate::error::{Result, StagehandError};

/// File name of a unit's nested sequence document inside its catalog entry.
pub const SEQUENCE_FILE: &str = "steps.yml";

/// Name-based lookup into the extension registration subsystem.
pub trait ExtensionCatalog: Send + Sync {
    /// Whether `name` is a valid, registered unit.
    fn is_registered(&self, name: &str) -> bool;

    /// Path of the unit's own nested sequence file.
    fn nested_sequence_path(&self, name: &str) -> Result<PathBuf>;
}

/// Catalog backed by a directory: each registered unit is a subdirectory
/// holding its own sequence file.
#[derive(Debug, Clone)]
pub struct DirectoryCatalog {
    root: PathBuf,
}

impl DirectoryCatalog {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn entry_dir(&self, name: &str) -> Option<PathBuf> {
        // Unit names are plain identifiers, never path fragments.
        if name.is_empty() || name.contains(['/', '\\']) || name == "." || name == ".." {
            return None;
        }
        Some(self.root.join(name))
    }
}

impl ExtensionCatalog for DirectoryCatalog {
    fn is_registered(&self, name: &str) -> bool {
        self.entry_dir(name).is_some_and(|dir| dir.is_dir())
    }

    fn nested_sequence_path(&self, name: &str) -> Result<PathBuf> {
        let dir = self
            .entry_dir(name)
            .filter(|d| d.is_dir())
            .ok_or_else(|| StagehandError::StepNotFound {
                name: name.to_string(),
            })?;
        Ok(dir.join(SEQUENCE_FILE))
    }
}

/// Catalog with nothing registered. Stores for units that never recurse
/// into other units (and most tests) use this.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyCatalog;

impl ExtensionCatalog for EmptyCatalog {
    fn is_registered(&self, _name: &str) -> bool {
        false
    }

    fn nested_sequence_path(&self, name: &str) -> Result<PathBuf> {
        Err(StagehandError::StepNotFound {
            name: name.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn registered_unit_is_a_subdirectory() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("monitoring")).unwrap();

        let catalog = DirectoryCatalog::new(temp.path());
        assert!(catalog.is_registered("monitoring"));
        assert!(!catalog.is_registered("absent"));
    }

    #[test]
    fn nested_path_points_into_the_unit_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join("monitoring")).unwrap();

        let catalog = DirectoryCatalog::new(temp.path());
        let path = catalog.nested_sequence_path("monitoring").unwrap();
        assert_eq!(path, temp.path().join("monitoring").join(SEQUENCE_FILE));
    }

    #[test]
    fn unknown_unit_is_not_found() {
        let temp = TempDir::new().unwrap();
        let catalog = DirectoryCatalog::new(temp.path());
        assert!(catalog.nested_sequence_path("absent").is_err());
    }

    #[test]
    fn path_fragments_are_rejected_as_names() {
        let temp = TempDir::new().unwrap();
        let catalog = DirectoryCatalog::new(temp.path());
        assert!(!catalog.is_registered("../escape"));
        assert!(!catalog.is_registered("a/b"));
        assert!(!catalog.is_registered(""));
    }

    #[test]
    fn empty_catalog_registers_nothing() {
        let catalog = EmptyCatalog;
        assert!(!catalog.is_registered("anything"));
        assert!(catalog.nested_sequence_path("anything").is_err());
    }
}
