//! Core types for the thumbnail cache.

use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

use crate::catalog::{BoundingBox, CatalogError, EntityId};
use crate::render::RenderError;

/// MIME type of every cached thumbnail.
pub const MIME_TYPE: &str = "image/png";

/// Resolution variant of a cached thumbnail.
///
/// `High` is exactly twice the linear pixel size of `Standard` and is always
/// produced from the same render pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Tier {
    #[default]
    Standard,
    High,
}

impl Tier {
    /// Linear scale of this tier relative to `Standard`.
    pub fn multiplier(&self) -> u32 {
        match self {
            Tier::Standard => 1,
            Tier::High => 2,
        }
    }

    /// Map the `hiRes` request flag onto a tier.
    pub fn from_hi_res(hi_res: bool) -> Self {
        if hi_res {
            Tier::High
        } else {
            Tier::Standard
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Tier::Standard => write!(f, "standard"),
            Tier::High => write!(f, "high"),
        }
    }
}

/// Thumbnail provenance persisted as entity metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailRecord {
    /// Storage key of the `Standard` image. The `High` key is derived from it.
    pub key: String,
    /// Bounding box the cached images were rendered from.
    pub bounding_box_used: BoundingBox,
}

impl ThumbnailRecord {
    pub fn new(key: impl Into<String>, bounding_box_used: BoundingBox) -> Self {
        Self {
            key: key.into(),
            bounding_box_used,
        }
    }
}

/// A thumbnail ready to hand to a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    pub tier: Tier,
    pub data: Arc<Vec<u8>>,
    pub mime_type: &'static str,
    /// Last write time of the image in the store.
    pub last_modified: DateTime<Utc>,
}

/// Both tiers produced by one generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ThumbnailPair {
    pub standard: Arc<Vec<u8>>,
    pub high: Arc<Vec<u8>>,
    pub record: ThumbnailRecord,
    pub written_at: DateTime<Utc>,
}

impl ThumbnailPair {
    /// Select one tier of the pair.
    pub fn thumbnail(&self, tier: Tier) -> Thumbnail {
        let data = match tier {
            Tier::Standard => Arc::clone(&self.standard),
            Tier::High => Arc::clone(&self.high),
        };
        Thumbnail {
            tier,
            data,
            mime_type: MIME_TYPE,
            last_modified: self.written_at,
        }
    }
}

/// Thumbnail-related errors.
///
/// Errors are `Clone` because a single generation failure is delivered to
/// every caller that was waiting on the same generation slot.
#[derive(Debug, Clone, Error)]
pub enum ThumbnailError {
    /// The entity does not exist in the catalog.
    #[error("Entity not found: {0}")]
    NotFound(String),

    /// Bytes produced by the renderer (or supplied for capture) are not a
    /// decodable image.
    #[error("Image decode error: {0}")]
    ImageDecode(String),

    /// The renderer failed.
    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    /// Any failure inside a generation slot.
    #[error("Thumbnail generation failed for {entity}: {cause}")]
    GenerationFailed {
        entity: EntityId,
        #[source]
        cause: Box<ThumbnailError>,
    },

    /// The generation task ended without producing a result.
    #[error("Generation aborted: {0}")]
    Aborted(String),

    /// The backing store is unavailable for read or write.
    #[error("Thumbnail store I/O error: {0}")]
    StoreIo(String),

    /// The catalog could not be read or updated.
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),
}

impl ThumbnailError {
    /// Wrap an error raised while generating thumbnails for `entity`.
    ///
    /// Already wrapped errors are passed through unchanged.
    pub fn generation(entity: &EntityId, cause: ThumbnailError) -> Self {
        match cause {
            ThumbnailError::GenerationFailed { .. } => cause,
            cause => ThumbnailError::GenerationFailed {
                entity: entity.clone(),
                cause: Box::new(cause),
            },
        }
    }

    /// True for entity-not-found failures.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ThumbnailError::NotFound(_))
    }
}

impl From<std::io::Error> for ThumbnailError {
    fn from(e: std::io::Error) -> Self {
        ThumbnailError::StoreIo(e.to_string())
    }
}

impl From<image::ImageError> for ThumbnailError {
    fn from(e: image::ImageError) -> Self {
        ThumbnailError::ImageDecode(e.to_string())
    }
}
