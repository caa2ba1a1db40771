//! JSON file-backed catalog.
//!
//! The whole catalog is one JSON document:
//!
//! ```text
//! { "entities": [ { "id": "...", "name": "...", "workspace": "...",
//!                   "kind": "layer", "bounds": { ... }, "metadata": { ... } } ] }
//! ```
//!
//! Metadata writes rewrite the document through a temporary file and a
//! rename, so a concurrent reader of the file never sees half a catalog.
//! Writers are serialized from snapshot to rename; a failed save rolls the
//! in-memory entity back so memory and disk agree.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

use crate::catalog::memory::MemoryCatalog;
use crate::catalog::r#trait::{Catalog, CatalogError};
use crate::catalog::types::{Entity, EntityId, EntityKind};
use crate::thumbnail::ThumbnailRecord;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CatalogDocument {
    #[serde(default)]
    entities: Vec<Entity>,
}

/// Distinguishes temp files of concurrent writers within one process.
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Catalog persisted as a JSON file.
#[derive(Debug)]
pub struct JsonCatalog {
    path: PathBuf,
    entities: MemoryCatalog,
    /// Held from snapshot through rename.
    save_lock: Mutex<()>,
}

impl JsonCatalog {
    /// Open a catalog file. A missing file is an empty catalog.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CatalogError> {
        let path = path.into();
        let document = match std::fs::read(&path) {
            Ok(bytes) => serde_json::from_slice::<CatalogDocument>(&bytes)
                .map_err(|e| CatalogError::Parse(format!("{}: {}", path.display(), e)))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => CatalogDocument::default(),
            Err(e) => return Err(CatalogError::Io(format!("{}: {}", path.display(), e))),
        };

        info!(
            path = %path.display(),
            entities = document.entities.len(),
            "Catalog loaded"
        );

        Ok(Self {
            path,
            entities: MemoryCatalog::with_entities(document.entities),
            save_lock: Mutex::new(()),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Add or replace an entity and save the catalog.
    pub fn insert(&self, entity: Entity) -> Result<(), CatalogError> {
        let _guard = self.save_lock.lock();
        let previous = self.entities.resolve(&entity.id)?;
        let id = entity.id.clone();
        self.entities.insert(entity);
        self.write_or_rollback(&id, previous)
    }

    /// Snapshot of all entities.
    pub fn entities(&self) -> Vec<Entity> {
        self.entities.entities()
    }

    /// Write the catalog to disk.
    pub fn save(&self) -> Result<(), CatalogError> {
        let _guard = self.save_lock.lock();
        self.write_document()
    }

    /// Save with `save_lock` held; on failure restore `id` to `previous`.
    fn write_or_rollback(
        &self,
        id: &EntityId,
        previous: Option<Entity>,
    ) -> Result<(), CatalogError> {
        let result = self.write_document();
        if let Err(e) = &result {
            warn!(entity = %id, error = %e, "Catalog save failed, reverting entity");
            match previous {
                Some(entity) => self.entities.insert(entity),
                None => {
                    self.entities.remove(id);
                }
            }
        }
        result
    }

    /// Snapshot, serialize and publish the document. Caller holds `save_lock`.
    fn write_document(&self) -> Result<(), CatalogError> {
        let document = CatalogDocument {
            entities: self.entities.entities(),
        };
        let json = serde_json::to_vec_pretty(&document)
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| CatalogError::Io(e.to_string()))?;
            }
        }

        let temp_path = {
            let mut name = self.path.file_name().unwrap_or_default().to_os_string();
            name.push(format!(
                ".{}.{}.tmp",
                std::process::id(),
                TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
            ));
            self.path.with_file_name(name)
        };
        let result = std::fs::write(&temp_path, &json)
            .and_then(|()| std::fs::rename(&temp_path, &self.path));
        if let Err(e) = result {
            let _ = std::fs::remove_file(&temp_path);
            return Err(CatalogError::Io(format!("{}: {}", self.path.display(), e)));
        }

        debug!(path = %self.path.display(), bytes = json.len(), "Catalog saved");
        Ok(())
    }
}

impl Catalog for JsonCatalog {
    fn resolve(&self, id: &EntityId) -> Result<Option<Entity>, CatalogError> {
        self.entities.resolve(id)
    }

    fn find(
        &self,
        workspace: &str,
        name: &str,
        kind: EntityKind,
    ) -> Result<Option<Entity>, CatalogError> {
        self.entities.find(workspace, name, kind)
    }

    fn persist_metadata(
        &self,
        id: &EntityId,
        record: &ThumbnailRecord,
    ) -> Result<(), CatalogError> {
        let _guard = self.save_lock.lock();
        let previous = self.entities.resolve(id)?;
        self.entities.persist_metadata(id, record)?;
        self.write_or_rollback(id, previous)
    }
}
