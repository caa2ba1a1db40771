//! Renderer trait and request types.

use futures::future::BoxFuture;
use thiserror::Error;

use crate::catalog::{BoundingBox, Entity};

/// Errors that can occur while rendering a map image.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RenderError {
    /// The entity cannot be rendered as requested (e.g. several unrelated
    /// layers without a group).
    #[error("Unsupported entity composition: {0}")]
    UnsupportedEntity(String),

    /// The request to the rendering backend failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// The backend answered with something other than an image.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// A single map render: what to draw, where, and at which pixel size.
#[derive(Debug, Clone)]
pub struct RenderRequest {
    pub entity: Entity,
    pub bbox: BoundingBox,
    pub width: u32,
    pub height: u32,
}

/// Turns an entity, bounding box and pixel size into an encoded raster image.
///
/// Rendering is the expensive step the thumbnail cache exists to avoid; the
/// service only ever calls it from inside a generation slot.
pub trait Renderer: Send + Sync {
    /// Render the request, returning encoded image bytes (PNG or JPEG).
    fn render<'a>(
        &'a self,
        request: &'a RenderRequest,
    ) -> BoxFuture<'a, Result<Vec<u8>, RenderError>>;

    /// Name for logging.
    fn name(&self) -> &str;
}
