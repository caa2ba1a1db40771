//! layerthumb - cached preview thumbnails for map layers and layer groups
//!
//! This library serves small preview images of published map resources,
//! rendering them once and reusing them until the resource changes.
//!
//! # High-Level API
//!
//! The [`thumbnail`] module provides the [`ThumbnailService`](thumbnail::ThumbnailService)
//! facade:
//!
//! ```ignore
//! use layerthumb::catalog::{EntityId, JsonCatalog};
//! use layerthumb::render::WmsRenderer;
//! use layerthumb::thumbnail::{DiskThumbnailStore, ServiceConfig, ThumbnailService, Tier};
//!
//! let service = ThumbnailService::new(
//!     Arc::new(JsonCatalog::open("catalog.json")?),
//!     Arc::new(WmsRenderer::new("http://localhost:8080/geoserver/wms", timeout)?),
//!     Arc::new(DiskThumbnailStore::new("cache")?),
//!     ServiceConfig::default(),
//! );
//!
//! let thumbnail = service.get(&EntityId::new("foo:one"), Tier::High).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod logging;
pub mod render;
pub mod thumbnail;

/// Version of the layerthumb library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
