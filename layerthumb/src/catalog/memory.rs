//! In-memory catalog.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::catalog::r#trait::{Catalog, CatalogError};
use crate::catalog::types::{BoundingBox, Entity, EntityId, EntityKind};
use crate::thumbnail::ThumbnailRecord;

/// Catalog held entirely in memory.
///
/// Used by tests and by embedders that mirror an external catalog. Every
/// mutation stamps `modified` with the current time, and `insert` stamps
/// `created` for entities that do not carry one.
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entities: RwLock<HashMap<EntityId, Entity>>,
}

impl MemoryCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog pre-populated with entities.
    pub fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let catalog = Self::new();
        for entity in entities {
            catalog.insert(entity);
        }
        catalog
    }

    /// Add or replace an entity.
    pub fn insert(&self, mut entity: Entity) {
        let now = Utc::now();
        let metadata = &mut entity.metadata;
        if metadata.created.is_none() {
            metadata.created = Some(now);
        }
        if metadata.modified.is_none() {
            metadata.modified = metadata.created;
        }
        self.entities.write().insert(entity.id.clone(), entity);
    }

    /// Delete an entity. Returns the removed entity, if any.
    pub fn remove(&self, id: &EntityId) -> Option<Entity> {
        self.entities.write().remove(id)
    }

    /// Replace the natural bounds of an entity, marking it modified.
    pub fn update_bounds(&self, id: &EntityId, bounds: BoundingBox) -> Result<(), CatalogError> {
        self.modify(id, |entity| entity.bounds = bounds)
    }

    /// Force the `modified` timestamp of an entity.
    pub fn set_modified(&self, id: &EntityId, modified: DateTime<Utc>) -> Result<(), CatalogError> {
        let mut entities = self.entities.write();
        let entity = entities
            .get_mut(id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        entity.metadata.modified = Some(modified);
        Ok(())
    }

    /// Snapshot of all entities.
    pub fn entities(&self) -> Vec<Entity> {
        let mut all: Vec<_> = self.entities.read().values().cloned().collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    /// Number of entities.
    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    /// True if the catalog holds no entities.
    pub fn is_empty(&self) -> bool {
        self.entities.read().is_empty()
    }

    fn modify(&self, id: &EntityId, f: impl FnOnce(&mut Entity)) -> Result<(), CatalogError> {
        let mut entities = self.entities.write();
        let entity = entities
            .get_mut(id)
            .ok_or_else(|| CatalogError::NotFound(id.clone()))?;
        f(entity);
        entity.metadata.modified = Some(Utc::now());
        Ok(())
    }
}

impl Catalog for MemoryCatalog {
    fn resolve(&self, id: &EntityId) -> Result<Option<Entity>, CatalogError> {
        Ok(self.entities.read().get(id).cloned())
    }

    fn find(
        &self,
        workspace: &str,
        name: &str,
        kind: EntityKind,
    ) -> Result<Option<Entity>, CatalogError> {
        Ok(self
            .entities
            .read()
            .values()
            .find(|e| e.kind == kind && e.name == name && e.workspace.as_deref() == Some(workspace))
            .cloned())
    }

    fn persist_metadata(
        &self,
        id: &EntityId,
        record: &ThumbnailRecord,
    ) -> Result<(), CatalogError> {
        self.modify(id, |entity| {
            entity.metadata.thumbnail = Some(record.key.clone());
            entity.metadata.bbox = Some(record.bounding_box_used.clone());
        })
    }
}
