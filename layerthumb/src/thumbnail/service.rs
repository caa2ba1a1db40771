//! Cache-or-generate orchestration.
//!
//! # Request flow
//!
//! ```text
//! get(id, tier)
//!   │
//!   ├─ Catalog::resolve ──────────── missing ──► NotFound
//!   │
//!   ├─ InvalidationPolicy::evaluate
//!   │     Fresh ──► store.get(tier) ──► Thumbnail         (no coordinator)
//!   │     Stale / Absent, or Fresh with vanished bytes
//!   │
//!   └─ GenerationCoordinator::run_exclusive(id)
//!         re-check freshness
//!         Renderer::render(bbox, w, h)
//!         transform::derive_pair        (blocking pool)
//!         store.put(high), store.put(standard)
//!         MetadataLedger::write(record)
//! ```
//!
//! Everything inside the coordinator slot either completes or leaves the
//! entity without a usable thumbnail; a failed generation never records
//! provenance.

use chrono::{DateTime, Duration, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::catalog::{BoundingBox, Catalog, Entity, EntityId, EntityKind};
use crate::render::{RenderError, RenderRequest, Renderer};
use crate::thumbnail::coordinator::{GenerationCoordinator, GenerationResult};
use crate::thumbnail::ledger::MetadataLedger;
use crate::thumbnail::naming::{paired_key, storage_key};
use crate::thumbnail::policy::{CacheState, InvalidationPolicy, GRACE_WINDOW};
use crate::thumbnail::store::ThumbnailStore;
use crate::thumbnail::transform::{self, DerivedPair};
use crate::thumbnail::types::{
    Thumbnail, ThumbnailError, ThumbnailPair, ThumbnailRecord, Tier, MIME_TYPE,
};

/// Default side length of a standard thumbnail, in pixels.
pub const DEFAULT_TARGET_SIZE: u32 = 175;

/// Largest raw render the service will request along either axis.
pub const MAX_RENDER_DIMENSION: u32 = 8192;

/// Tunables for [`ThumbnailService`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Side length of the standard tier. The high tier is twice this.
    pub target_size: u32,
    /// Allowed lag of the thumbnail write behind the entity's `modified`.
    pub grace: Duration,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            target_size: DEFAULT_TARGET_SIZE,
            grace: GRACE_WINDOW,
        }
    }
}

/// Counters describing how requests were served.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ServiceStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Renders that produced and stored a new pair.
    pub generations: u64,
    /// Generations or captures that failed.
    pub failures: u64,
    pub captures: u64,
}

impl ServiceStats {
    /// Fraction of requests served from cache (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.cache_hits + self.cache_misses;
        if total == 0 {
            0.0
        } else {
            self.cache_hits as f64 / total as f64
        }
    }
}

/// Compute raw render dimensions for `bbox`.
///
/// The shorter geographic side maps to `target` pixels and the longer side
/// scales proportionally, so non-square bounds produce a non-square render.
pub fn render_dimensions(bbox: &BoundingBox, target: u32) -> Result<(u32, u32), RenderError> {
    if bbox.is_empty() {
        return Err(RenderError::UnsupportedEntity(format!(
            "empty bounding box {}",
            bbox
        )));
    }

    let (width, height) = (bbox.width(), bbox.height());
    let target_px = target as f64;
    let (px_width, px_height) = if width < height {
        (target_px, (target_px * height / width).round())
    } else {
        ((target_px * width / height).round(), target_px)
    };

    let limit = MAX_RENDER_DIMENSION as f64;
    if px_width > limit || px_height > limit {
        return Err(RenderError::UnsupportedEntity(format!(
            "bounding box {} needs a {}x{} render",
            bbox, px_width, px_height
        )));
    }

    Ok((px_width as u32, px_height as u32))
}

/// The public thumbnail operation: serve from cache, or generate once.
///
/// Cloning is cheap; clones share caches, slots and statistics.
#[derive(Clone)]
pub struct ThumbnailService {
    inner: Arc<Inner>,
}

struct Inner {
    catalog: Arc<dyn Catalog>,
    renderer: Arc<dyn Renderer>,
    store: Arc<dyn ThumbnailStore>,
    ledger: MetadataLedger,
    policy: InvalidationPolicy,
    coordinator: Arc<GenerationCoordinator>,
    config: ServiceConfig,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    generations: AtomicU64,
    failures: AtomicU64,
    captures: AtomicU64,
}

impl ThumbnailService {
    pub fn new(
        catalog: Arc<dyn Catalog>,
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn ThumbnailStore>,
        config: ServiceConfig,
    ) -> Self {
        let inner = Inner {
            ledger: MetadataLedger::new(Arc::clone(&catalog)),
            policy: InvalidationPolicy::new(Arc::clone(&store), config.grace),
            coordinator: Arc::new(GenerationCoordinator::new()),
            catalog,
            renderer,
            store,
            config,
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            generations: AtomicU64::new(0),
            failures: AtomicU64::new(0),
            captures: AtomicU64::new(0),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.inner.config
    }

    /// Fetch the thumbnail of `id` at `tier`, generating it if needed.
    pub async fn get(&self, id: &EntityId, tier: Tier) -> Result<Thumbnail, ThumbnailError> {
        let entity = self.inner.resolve(id)?;
        let record = self.inner.ledger.record(&entity);
        let state = self.inner.evaluate(&entity, record.as_ref()).await?;

        if let (CacheState::Fresh { written_at }, Some(record)) = (state, record.as_ref()) {
            if let Some(key) = paired_key(&record.key, tier) {
                if let Some(data) = self.inner.store.get(&key).await? {
                    self.inner.cache_hits.fetch_add(1, Ordering::Relaxed);
                    debug!(entity = %id, tier = %tier, key = %key, "Thumbnail cache hit");
                    return Ok(Thumbnail {
                        tier,
                        data: Arc::new(data),
                        mime_type: MIME_TYPE,
                        last_modified: written_at,
                    });
                }
                warn!(entity = %id, key = %key, "Cached thumbnail vanished, regenerating");
            }
        }

        self.inner.cache_misses.fetch_add(1, Ordering::Relaxed);
        debug!(entity = %id, state = %state, "Thumbnail cache miss");

        let inner = Arc::clone(&self.inner);
        let slot_id = id.clone();
        let pair = self
            .inner
            .coordinator
            .run_exclusive(id.clone(), move || inner.regenerate(slot_id))
            .await?;
        Ok(pair.thumbnail(tier))
    }

    /// Resolve a layer or layer group by workspace and name.
    pub fn find(
        &self,
        workspace: &str,
        name: &str,
        kind: EntityKind,
    ) -> Result<Entity, ThumbnailError> {
        self.inner
            .catalog
            .find(workspace, name, kind)?
            .ok_or_else(|| {
                ThumbnailError::NotFound(format!("{}/{}/{}", kind.path_segment(), workspace, name))
            })
    }

    /// Current cache state of `id`, without generating anything.
    pub async fn status(&self, id: &EntityId) -> Result<CacheState, ThumbnailError> {
        let entity = self.inner.resolve(id)?;
        let record = self.inner.ledger.record(&entity);
        self.inner.evaluate(&entity, record.as_ref()).await
    }

    /// Store thumbnails derived from an image rendered elsewhere.
    ///
    /// `bbox` becomes the recorded bounding box, so later generations render
    /// the same view. The capture runs in the entity's generation slot; if a
    /// generation is already in flight, the capture joins it and returns its
    /// result instead; the supplied image is then discarded.
    pub async fn capture(
        &self,
        id: &EntityId,
        bbox: BoundingBox,
        image: Vec<u8>,
    ) -> Result<Arc<ThumbnailPair>, ThumbnailError> {
        let entity = self.inner.resolve(id)?;
        let inner = Arc::clone(&self.inner);
        let mut claimed = false;
        let claimed_slot = &mut claimed;
        let result = self
            .inner
            .coordinator
            .run_exclusive(entity.id.clone(), move || {
                *claimed_slot = true;
                inner.capture(entity, bbox, image)
            })
            .await;

        if !claimed {
            debug!(entity = %id, "Capture superseded by in-flight generation");
        }
        result
    }

    /// Returns a snapshot of the service counters.
    pub fn stats(&self) -> ServiceStats {
        let inner = &self.inner;
        ServiceStats {
            cache_hits: inner.cache_hits.load(Ordering::Relaxed),
            cache_misses: inner.cache_misses.load(Ordering::Relaxed),
            generations: inner.generations.load(Ordering::Relaxed),
            failures: inner.failures.load(Ordering::Relaxed),
            captures: inner.captures.load(Ordering::Relaxed),
        }
    }

    /// The coordinator shared by all requests of this service.
    pub fn coordinator(&self) -> &GenerationCoordinator {
        &self.inner.coordinator
    }

    /// Logs service and coordinator statistics.
    pub fn log_stats(&self) {
        let stats = self.stats();
        info!(
            renderer = self.inner.renderer.name(),
            hits = stats.cache_hits,
            misses = stats.cache_misses,
            generations = stats.generations,
            failures = stats.failures,
            captures = stats.captures,
            hit_rate = format!("{:.1}%", stats.hit_rate() * 100.0),
            "Thumbnail cache statistics"
        );
        self.inner.coordinator.log_stats();
    }
}

impl Inner {
    fn resolve(&self, id: &EntityId) -> Result<Entity, ThumbnailError> {
        self.catalog
            .resolve(id)?
            .ok_or_else(|| ThumbnailError::NotFound(id.to_string()))
    }

    /// Cache state of `entity`, judged against its current `modified` time.
    async fn evaluate(
        &self,
        entity: &Entity,
        record: Option<&ThumbnailRecord>,
    ) -> Result<CacheState, ThumbnailError> {
        let modified = self.ledger.modified(&entity.id)?;
        self.policy.evaluate(&entity.id, record, modified).await
    }

    /// Body of a generation slot.
    async fn regenerate(self: Arc<Self>, id: EntityId) -> GenerationResult {
        // The entity may have changed or vanished since the caller looked.
        let entity = self.resolve(&id)?;

        match self.cached_pair(&entity).await {
            Ok(Some(pair)) => {
                debug!(entity = %id, "Thumbnail already regenerated");
                return Ok(pair);
            }
            Ok(None) => {}
            Err(e) => return Err(self.fail(&id, e)),
        }

        let bbox = match self.ledger.last_bounding_box(&entity) {
            Some(bbox) => bbox,
            None => match self.catalog.current_bounding_box(&id) {
                Ok(Some(bounds)) => bounds,
                Ok(None) => return Err(ThumbnailError::NotFound(id.to_string())),
                Err(e) => return Err(self.fail(&id, e.into())),
            },
        };

        match self.render_and_store(&entity, bbox).await {
            Ok(pair) => {
                self.generations.fetch_add(1, Ordering::Relaxed);
                Ok(pair)
            }
            Err(e) => Err(self.fail(&id, e)),
        }
    }

    /// Body of a capture slot.
    async fn capture(
        self: Arc<Self>,
        entity: Entity,
        bbox: BoundingBox,
        image: Vec<u8>,
    ) -> GenerationResult {
        if bbox.is_empty() {
            let cause = RenderError::UnsupportedEntity(format!("empty bounding box {}", bbox));
            return Err(self.fail(&entity.id, cause.into()));
        }

        let result = match self.derive(image).await {
            Ok(derived) => self.store_pair(&entity, bbox, derived).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(pair) => {
                self.captures.fetch_add(1, Ordering::Relaxed);
                info!(entity = %entity.id, key = %pair.record.key, "Thumbnail captured");
                Ok(pair)
            }
            Err(e) => Err(self.fail(&entity.id, e)),
        }
    }

    fn fail(&self, id: &EntityId, cause: ThumbnailError) -> ThumbnailError {
        self.failures.fetch_add(1, Ordering::Relaxed);
        warn!(entity = %id, error = %cause, "Thumbnail generation failed");
        ThumbnailError::generation(id, cause)
    }

    /// The stored pair of `entity`, if it is fresh and fully readable.
    async fn cached_pair(
        &self,
        entity: &Entity,
    ) -> Result<Option<Arc<ThumbnailPair>>, ThumbnailError> {
        let Some(record) = self.ledger.record(entity) else {
            return Ok(None);
        };
        let CacheState::Fresh { written_at } = self.evaluate(entity, Some(&record)).await? else {
            return Ok(None);
        };
        let (Some(standard_key), Some(high_key)) = (
            paired_key(&record.key, Tier::Standard),
            paired_key(&record.key, Tier::High),
        ) else {
            return Ok(None);
        };
        let (Some(standard), Some(high)) = (
            self.store.get(&standard_key).await?,
            self.store.get(&high_key).await?,
        ) else {
            return Ok(None);
        };

        Ok(Some(Arc::new(ThumbnailPair {
            standard: Arc::new(standard),
            high: Arc::new(high),
            record,
            written_at,
        })))
    }

    async fn render_and_store(
        &self,
        entity: &Entity,
        bbox: BoundingBox,
    ) -> Result<Arc<ThumbnailPair>, ThumbnailError> {
        let (width, height) = render_dimensions(&bbox, self.config.target_size)?;
        let request = RenderRequest {
            entity: entity.clone(),
            bbox,
            width,
            height,
        };

        info!(
            entity = %entity.id,
            renderer = self.renderer.name(),
            bbox = %request.bbox,
            width,
            height,
            "Rendering thumbnail"
        );
        let raw = self.renderer.render(&request).await?;
        let derived = self.derive(raw).await?;
        self.store_pair(entity, request.bbox, derived).await
    }

    /// Decode, scale and crop on the blocking pool.
    async fn derive(&self, image: Vec<u8>) -> Result<DerivedPair, ThumbnailError> {
        let target = self.config.target_size;
        tokio::task::spawn_blocking(move || transform::derive_pair(&image, target))
            .await
            .map_err(|e| ThumbnailError::Aborted(e.to_string()))?
    }

    /// Publish both tiers, then record provenance.
    ///
    /// If any step fails, images written by this call are removed so the
    /// entity reads as `Absent` rather than carrying a mismatched pair.
    async fn store_pair(
        &self,
        entity: &Entity,
        bbox: BoundingBox,
        derived: DerivedPair,
    ) -> Result<Arc<ThumbnailPair>, ThumbnailError> {
        let standard_key = storage_key(entity, Tier::Standard);
        let high_key = storage_key(entity, Tier::High);
        let standard = Arc::new(derived.standard);
        let high = Arc::new(derived.high);
        let record = ThumbnailRecord::new(standard_key.clone(), bbox);

        let published = async {
            self.store.put(&high_key, Arc::clone(&high)).await?;
            self.store.put(&standard_key, Arc::clone(&standard)).await?;
            let written_at = self.written_at(&standard_key, &high_key).await?;
            self.ledger.write(&entity.id, &record)?;
            Ok::<_, ThumbnailError>(written_at)
        }
        .await;

        let written_at = match published {
            Ok(written_at) => written_at,
            Err(e) => {
                self.discard(&[&standard_key, &high_key]).await;
                return Err(e);
            }
        };

        debug!(
            entity = %entity.id,
            key = %standard_key,
            standard_side = derived.standard_side,
            high_side = derived.high_side,
            "Thumbnail pair stored"
        );
        Ok(Arc::new(ThumbnailPair {
            standard,
            high,
            record,
            written_at,
        }))
    }

    /// Older of the two tiers' write times.
    async fn written_at(
        &self,
        standard_key: &str,
        high_key: &str,
    ) -> Result<DateTime<Utc>, ThumbnailError> {
        let standard = self.store.last_modified(standard_key).await?;
        let high = self.store.last_modified(high_key).await?;
        Ok(match (standard, high) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) | (None, Some(a)) => a,
            (None, None) => Utc::now(),
        })
    }

    async fn discard(&self, keys: &[&str]) {
        for key in keys {
            if let Err(e) = self.store.remove(key).await {
                warn!(key = %key, error = %e, "Failed to remove partial thumbnail");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(width: f64, height: f64) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, width, height, "EPSG:4326")
    }

    #[test]
    fn test_render_dimensions_landscape() {
        assert_eq!(render_dimensions(&bbox(300.0, 150.0), 175).unwrap(), (350, 175));
    }

    #[test]
    fn test_render_dimensions_portrait() {
        assert_eq!(render_dimensions(&bbox(150.0, 300.0), 175).unwrap(), (175, 350));
    }

    #[test]
    fn test_render_dimensions_square() {
        assert_eq!(render_dimensions(&bbox(1.0, 1.0), 175).unwrap(), (175, 175));
    }

    #[test]
    fn test_render_dimensions_rounds() {
        // 175 * 4 / 3 = 233.33
        assert_eq!(render_dimensions(&bbox(4.0, 3.0), 175).unwrap(), (233, 175));
    }

    #[test]
    fn test_render_dimensions_rejects_empty() {
        assert!(render_dimensions(&bbox(0.0, 10.0), 175).is_err());
        assert!(render_dimensions(&bbox(10.0, f64::NAN), 175).is_err());
    }

    #[test]
    fn test_render_dimensions_rejects_elongated() {
        let err = render_dimensions(&bbox(1000.0, 1.0), 175).unwrap_err();
        assert!(matches!(err, RenderError::UnsupportedEntity(_)));
    }

    #[test]
    fn test_default_config() {
        let config = ServiceConfig::default();
        assert_eq!(config.target_size, 175);
        assert_eq!(config.grace, Duration::seconds(1));
    }

    #[test]
    fn test_hit_rate() {
        let stats = ServiceStats {
            cache_hits: 3,
            cache_misses: 1,
            ..Default::default()
        };
        assert!((stats.hit_rate() - 0.75).abs() < 0.001);
        assert_eq!(ServiceStats::default().hit_rate(), 0.0);
    }
}
