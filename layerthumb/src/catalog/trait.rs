//! Catalog trait definition for dependency injection.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::catalog::types::{BoundingBox, Entity, EntityId, EntityKind};
use crate::thumbnail::ThumbnailRecord;

/// Catalog-related errors.
#[derive(Debug, Clone, Error)]
pub enum CatalogError {
    /// The entity does not exist (or was deleted).
    #[error("Entity not found: {0}")]
    NotFound(EntityId),

    /// Backing storage could not be read or written.
    #[error("Catalog I/O error: {0}")]
    Io(String),

    /// Stored catalog content is malformed.
    #[error("Catalog parse error: {0}")]
    Parse(String),
}

/// Source of entity identity, bounds and metadata.
///
/// The catalog owns entities; the thumbnail subsystem only reads them and
/// writes back its provenance record. Implementations must give the calling
/// process read-your-writes consistency: a `resolve` after
/// `persist_metadata` observes the new record.
pub trait Catalog: Send + Sync {
    /// Look up an entity by id. `Ok(None)` if it does not exist.
    fn resolve(&self, id: &EntityId) -> Result<Option<Entity>, CatalogError>;

    /// Look up an entity by workspace, name and kind.
    fn find(
        &self,
        workspace: &str,
        name: &str,
        kind: EntityKind,
    ) -> Result<Option<Entity>, CatalogError>;

    /// Record thumbnail provenance on the entity.
    ///
    /// Saving metadata is an entity modification: implementations advance
    /// the entity's `modified` timestamp, exactly as any other edit would.
    fn persist_metadata(&self, id: &EntityId, record: &ThumbnailRecord)
        -> Result<(), CatalogError>;

    /// Current natural bounds of the entity.
    fn current_bounding_box(&self, id: &EntityId) -> Result<Option<BoundingBox>, CatalogError> {
        Ok(self.resolve(id)?.map(|e| e.bounds))
    }

    /// Last modification time of the entity.
    fn modified_at(&self, id: &EntityId) -> Result<Option<DateTime<Utc>>, CatalogError> {
        Ok(self.resolve(id)?.and_then(|e| e.metadata.modified))
    }
}
