//! Catalog of published layers and layer groups.
//!
//! The catalog is an external collaborator: it owns entity identity, bounds
//! and metadata. This module defines the [`Catalog`] seam plus two
//! implementations, an in-memory one and a JSON file-backed one.

mod file;
mod memory;
mod r#trait;
mod types;

pub use file::JsonCatalog;
pub use memory::MemoryCatalog;
pub use r#trait::{Catalog, CatalogError};
pub use types::{BoundingBox, Entity, EntityId, EntityKind, EntityMetadata};
