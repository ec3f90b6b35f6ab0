//! Registry of live sequence stores.
//!
//! Maps a unit identifier to its [`SequenceStore`], creating stores on
//! demand. The registry is an explicit value owned by the composition
//! root (the CLI builds one per invocation), never a module-level
//! singleton, so tests can run independent registries side by side.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::error::Result;
use crate::extension::ExtensionCatalog;
use crate::model::SequenceKind;

use super::{SequenceStore, StoreConfig};

/// Identifier of the main product's sequence.
pub const MAIN_UNIT: &str = "main";

/// Unit-identifier → live store map.
pub struct StoreRegistry {
    main_path: PathBuf,
    config: StoreConfig,
    catalog: Arc<dyn ExtensionCatalog>,
    stores: Mutex<HashMap<String, Arc<SequenceStore>>>,
}

impl StoreRegistry {
    pub fn new(
        main_path: impl Into<PathBuf>,
        config: StoreConfig,
        catalog: Arc<dyn ExtensionCatalog>,
    ) -> Self {
        Self {
            main_path: main_path.into(),
            config,
            catalog,
            stores: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a unit identifier to its store, creating and caching one on
    /// demand. `None` or [`MAIN_UNIT`] is the main product; any other name
    /// must be a registered extension, whose nested sequence file the
    /// catalog locates.
    pub fn store_for(&self, unit: Option<&str>) -> Result<Arc<SequenceStore>> {
        let key = unit.unwrap_or(MAIN_UNIT);

        let mut stores = self
            .stores
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(store) = stores.get(key) {
            return Ok(Arc::clone(store));
        }

        let store = if key == MAIN_UNIT {
            SequenceStore::open(
                self.main_path.clone(),
                SequenceKind::Embedded,
                self.config.clone(),
                Arc::clone(&self.catalog),
            )
        } else {
            let path = self.catalog.nested_sequence_path(key)?;
            SequenceStore::open(
                path,
                SequenceKind::Custom,
                self.config.clone(),
                Arc::clone(&self.catalog),
            )
        };

        let store = Arc::new(store);
        stores.insert(key.to_string(), Arc::clone(&store));
        Ok(store)
    }

    /// Drop a cached store. Its file-based state is untouched; the next
    /// lookup simply builds a fresh instance.
    pub fn evict(&self, unit: &str) {
        self.stores
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .remove(unit);
    }
}
