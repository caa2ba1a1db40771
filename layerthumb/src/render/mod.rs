//! Map rendering backends.
//!
//! The thumbnail service depends only on the [`Renderer`] trait; [`WmsRenderer`]
//! is the production implementation talking to a WMS server.

mod r#trait;
mod wms;

pub use r#trait::{RenderError, RenderRequest, Renderer};
pub use wms::{WmsRenderer, DEFAULT_SRS};
