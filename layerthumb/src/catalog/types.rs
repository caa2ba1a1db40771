//! Core catalog types: entity identity, bounds and metadata.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable, opaque identity of a published layer or layer group.
///
/// The id never changes for the lifetime of the entity, which makes it the
/// only safe input for cache keys. Names and workspaces can be renamed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    /// Create an entity id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for EntityId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Kind of published resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// A single layer.
    Layer,
    /// A layer group ("map").
    LayerGroup,
}

impl EntityKind {
    /// Path segment used when addressing entities by workspace and name.
    pub fn path_segment(&self) -> &'static str {
        match self {
            EntityKind::Layer => "layers",
            EntityKind::LayerGroup => "maps",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Layer => write!(f, "layer"),
            EntityKind::LayerGroup => write!(f, "layer group"),
        }
    }
}

/// Axis-aligned geographic bounding box.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
    /// Coordinate reference system code, e.g. `EPSG:4326`.
    pub crs: String,
}

impl BoundingBox {
    /// Create a bounding box in the given CRS.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64, crs: impl Into<String>) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
            crs: crs.into(),
        }
    }

    /// Geographic width in CRS units.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Geographic height in CRS units.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// True if the box has no positive, finite area.
    pub fn is_empty(&self) -> bool {
        let (w, h) = (self.width(), self.height());
        !(w.is_finite() && h.is_finite() && w > 0.0 && h > 0.0)
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{},{},{},{} ({})",
            self.min_x, self.min_y, self.max_x, self.max_y, self.crs
        )
    }
}

/// Metadata attached to an entity by the catalog.
///
/// `thumbnail` and `bbox` are written by this crate; `created` and
/// `modified` are maintained by the catalog itself.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
    /// Storage key of the STANDARD thumbnail.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    /// Bounding box the current thumbnail (or last composed view) used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BoundingBox>,
}

/// A published layer or layer group as seen by the thumbnail subsystem.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workspace: Option<String>,
    pub kind: EntityKind,
    /// Natural bounds of the underlying data.
    pub bounds: BoundingBox,
    #[serde(default)]
    pub metadata: EntityMetadata,
}

impl Entity {
    /// Create an entity with empty metadata.
    pub fn new(
        id: impl Into<EntityId>,
        name: impl Into<String>,
        workspace: Option<String>,
        kind: EntityKind,
        bounds: BoundingBox,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            workspace,
            kind,
            bounds,
            metadata: EntityMetadata::default(),
        }
    }

    /// Qualified `workspace:name`, or the bare name outside a workspace.
    pub fn qualified_name(&self) -> String {
        match &self.workspace {
            Some(ws) => format!("{}:{}", ws, self.name),
            None => self.name.clone(),
        }
    }
}
