//! Common types and utilities shared across CLI commands.

use clap::{Args, ValueEnum};
use layerthumb::catalog::{BoundingBox, EntityId, EntityKind};
use layerthumb::thumbnail::ThumbnailService;

use crate::error::CliError;

/// Entity kind selection for CLI arguments.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum KindArg {
    /// A single layer
    Layer,
    /// A layer group
    Map,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Layer => EntityKind::Layer,
            KindArg::Map => EntityKind::LayerGroup,
        }
    }
}

/// Identifies a layer or map, either by catalog id or by workspace and name.
#[derive(Debug, Clone, Args)]
pub struct EntityArgs {
    /// Workspace the entity is published in
    #[arg(required_unless_present = "id")]
    pub workspace: Option<String>,

    /// Layer or map name
    #[arg(required_unless_present = "id")]
    pub name: Option<String>,

    /// Whether the name refers to a layer or a map
    #[arg(long, value_enum, default_value = "layer")]
    pub kind: KindArg,

    /// Catalog id (instead of workspace and name)
    #[arg(long, conflicts_with_all = ["workspace", "name"])]
    pub id: Option<String>,
}

impl EntityArgs {
    /// Resolve the arguments to a catalog id.
    pub fn resolve(&self, service: &ThumbnailService) -> Result<EntityId, CliError> {
        if let Some(id) = &self.id {
            return Ok(EntityId::new(id.clone()));
        }
        match (&self.workspace, &self.name) {
            (Some(workspace), Some(name)) => {
                Ok(service.find(workspace, name, self.kind.into())?.id)
            }
            _ => Err(CliError::Config(
                "either --id or a workspace and name are required".to_string(),
            )),
        }
    }
}

/// Parse `min_x,min_y,max_x,max_y`.
pub fn parse_extent(value: &str) -> Result<[f64; 4], String> {
    let parts = value
        .split(',')
        .map(|p| p.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| format!("invalid number: {}", e))?;

    match parts.as_slice() {
        [min_x, min_y, max_x, max_y] => Ok([*min_x, *min_y, *max_x, *max_y]),
        _ => Err(format!(
            "expected 4 comma-separated values, got {}",
            parts.len()
        )),
    }
}

/// Build a bounding box from a parsed extent.
pub fn bounding_box(extent: [f64; 4], crs: &str) -> BoundingBox {
    let [min_x, min_y, max_x, max_y] = extent;
    BoundingBox::new(min_x, min_y, max_x, max_y, crs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_maps_to_entity_kind() {
        assert_eq!(EntityKind::from(KindArg::Layer), EntityKind::Layer);
        assert_eq!(EntityKind::from(KindArg::Map), EntityKind::LayerGroup);
    }

    #[test]
    fn test_parse_extent() {
        assert_eq!(
            parse_extent("-10, 20.5,30,40").unwrap(),
            [-10.0, 20.5, 30.0, 40.0]
        );
    }

    #[test]
    fn test_parse_extent_rejects_wrong_arity() {
        assert!(parse_extent("1,2,3").is_err());
        assert!(parse_extent("1,2,3,4,5").is_err());
    }

    #[test]
    fn test_parse_extent_rejects_garbage() {
        assert!(parse_extent("a,b,c,d").is_err());
    }

    #[test]
    fn test_bounding_box() {
        let bbox = bounding_box([0.0, 0.0, 300.0, 150.0], "EPSG:3857");
        assert_eq!(bbox.width(), 300.0);
        assert_eq!(bbox.height(), 150.0);
        assert_eq!(bbox.crs, "EPSG:3857");
    }
}
