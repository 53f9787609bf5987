use crate::error::DataLoadError;
use crate::loader;
use crate::record::Table;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Lazily loaded, read-only copy of the shipment dataset.
///
/// The first successful `load` reads the file; later calls hand out the same
/// `Arc<Table>`. A failed read leaves the cache empty so the next call tries
/// again. `invalidate` forces a re-read on the next `load`.
#[derive(Debug)]
pub struct DatasetCache {
    path: PathBuf,
    table: RwLock<Option<Arc<Table>>>,
}

impl DatasetCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DatasetCache {
            path: path.into(),
            table: RwLock::new(None),
        }
    }

    /// A cache that already holds `table` and never touches the filesystem
    /// unless invalidated.
    pub fn preloaded(path: impl Into<PathBuf>, table: Table) -> Self {
        DatasetCache {
            path: path.into(),
            table: RwLock::new(Some(Arc::new(table))),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Arc<Table>, DataLoadError> {
        if let Some(table) = self.read_slot().as_ref() {
            return Ok(Arc::clone(table));
        }

        let mut slot = self.table.write().unwrap_or_else(|e| e.into_inner());
        // Another request may have filled the slot while we waited
        if let Some(table) = slot.as_ref() {
            return Ok(Arc::clone(table));
        }

        match loader::load_dataset(&self.path) {
            Ok(table) => {
                log::info!(
                    "loaded {} shipment records from {}",
                    table.len(),
                    self.path.display()
                );
                let table = Arc::new(table);
                *slot = Some(Arc::clone(&table));
                Ok(table)
            }
            Err(e) => {
                log::error!("dataset load failed: {}", e);
                Err(e)
            }
        }
    }

    pub fn invalidate(&self) {
        let mut slot = self.table.write().unwrap_or_else(|e| e.into_inner());
        if slot.take().is_some() {
            log::info!("dataset cache invalidated");
        }
    }

    pub fn is_loaded(&self) -> bool {
        self.read_slot().is_some()
    }

    fn read_slot(&self) -> std::sync::RwLockReadGuard<'_, Option<Arc<Table>>> {
        self.table.read().unwrap_or_else(|e| e.into_inner())
    }
}
