//! Thumbnail provenance stored as entity metadata.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::debug;

use crate::catalog::{BoundingBox, Catalog, CatalogError, Entity, EntityId};
use crate::thumbnail::types::ThumbnailRecord;

/// Reads and writes [`ThumbnailRecord`]s through the catalog.
///
/// The ledger holds no state of its own. A record exists only when the
/// entity carries both a thumbnail key and the bounding box it was rendered
/// from.
#[derive(Clone)]
pub struct MetadataLedger {
    catalog: Arc<dyn Catalog>,
}

impl MetadataLedger {
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Provenance recorded on an entity, if complete.
    pub fn record(&self, entity: &Entity) -> Option<ThumbnailRecord> {
        let key = entity.metadata.thumbnail.as_ref()?;
        let bbox = entity.metadata.bbox.as_ref()?;
        Some(ThumbnailRecord::new(key.clone(), bbox.clone()))
    }

    /// Bounding box the entity's thumbnail was last rendered from.
    pub fn last_bounding_box(&self, entity: &Entity) -> Option<BoundingBox> {
        entity.metadata.bbox.clone()
    }

    /// Persist a record for `id`.
    pub fn write(&self, id: &EntityId, record: &ThumbnailRecord) -> Result<(), CatalogError> {
        self.catalog.persist_metadata(id, record)?;
        debug!(entity = %id, key = %record.key, bbox = %record.bounding_box_used, "Thumbnail record written");
        Ok(())
    }

    /// Current modification time of the entity, read through the catalog.
    pub fn modified(&self, id: &EntityId) -> Result<Option<DateTime<Utc>>, CatalogError> {
        self.catalog.modified_at(id)
    }
}

impl std::fmt::Debug for MetadataLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetadataLedger").finish_non_exhaustive()
    }
}
