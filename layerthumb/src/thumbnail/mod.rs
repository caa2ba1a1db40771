//! Thumbnail cache-and-generate subsystem.
//!
//! [`ThumbnailService`] serves cached preview images of layers and layer
//! groups and regenerates them when the entity changed:
//!
//! - [`transform`] scales and square-crops a raw render into both tiers
//! - [`naming`] maps an entity and tier to a storage key
//! - [`ThumbnailStore`] holds the image bytes with atomic publish
//! - [`MetadataLedger`] records provenance on the entity through the catalog
//! - [`InvalidationPolicy`] decides between fresh, stale and absent
//! - [`GenerationCoordinator`] runs at most one generation per entity

mod coordinator;
mod ledger;
pub mod naming;
mod policy;
mod service;
mod store;
pub mod transform;
mod types;

pub use coordinator::{CoordinatorStats, GenerationCoordinator, GenerationResult};
pub use ledger::MetadataLedger;
pub use naming::{paired_key, storage_key, thumbnail_key};
pub use policy::{is_stale, CacheState, InvalidationPolicy, GRACE_WINDOW};
pub use service::{
    render_dimensions, ServiceConfig, ServiceStats, ThumbnailService, DEFAULT_TARGET_SIZE,
    MAX_RENDER_DIMENSION,
};
pub use store::{DiskThumbnailStore, MemoryThumbnailStore, ThumbnailStore};
pub use types::{Thumbnail, ThumbnailError, ThumbnailPair, ThumbnailRecord, Tier, MIME_TYPE};
