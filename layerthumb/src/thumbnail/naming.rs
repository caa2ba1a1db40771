//! Thumbnail storage key construction.
//!
//! Keys are derived only from the entity id and tier, so they survive
//! renames and process restarts:
//! ```text
//! [<workspace>/]<entity id>.png       (standard)
//! [<workspace>/]<entity id>@2x.png    (high)
//! ```

use crate::catalog::{Entity, EntityId};
use crate::thumbnail::types::Tier;

/// File extension of cached thumbnails.
pub const EXTENSION: &str = "png";

/// Suffix that marks the high resolution variant.
pub const HIGH_RES_SUFFIX: &str = "@2x";

/// File name for an entity's thumbnail at the given tier.
///
/// # Example
///
/// ```
/// use layerthumb::catalog::EntityId;
/// use layerthumb::thumbnail::{thumbnail_key, Tier};
///
/// let id = EntityId::new("foo:one");
/// assert_eq!(thumbnail_key(&id, Tier::Standard), "foo:one.png");
/// assert_eq!(thumbnail_key(&id, Tier::High), "foo:one@2x.png");
/// ```
pub fn thumbnail_key(id: &EntityId, tier: Tier) -> String {
    match tier {
        Tier::Standard => format!("{}.{}", id, EXTENSION),
        Tier::High => format!("{}{}.{}", id, HIGH_RES_SUFFIX, EXTENSION),
    }
}

/// Storage key for an entity's thumbnail, placed under its workspace.
pub fn storage_key(entity: &Entity, tier: Tier) -> String {
    let file = thumbnail_key(&entity.id, tier);
    match entity.workspace.as_deref() {
        Some(ws) if !ws.is_empty() => format!("{}/{}", ws, file),
        _ => file,
    }
}

/// Derive the key of `tier` from a recorded standard key.
///
/// Returns `None` if `base_key` does not look like a standard key.
pub fn paired_key(base_key: &str, tier: Tier) -> Option<String> {
    let stem = base_key.strip_suffix(&format!(".{}", EXTENSION))?;
    if stem.is_empty() {
        return None;
    }
    Some(match tier {
        Tier::Standard => base_key.to_string(),
        Tier::High => format!("{}{}.{}", stem, HIGH_RES_SUFFIX, EXTENSION),
    })
}
