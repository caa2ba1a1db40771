//! Integration tests for the thumbnail service.
//!
//! These tests drive `ThumbnailService` end to end against an in-memory
//! catalog and a counting renderer:
//! - Concurrent requests coalescing onto one render
//! - Cache hits, staleness and the grace window
//! - Tier pairing and render dimensions
//! - Failure handling and fail-open on missing bytes
//! - Capture of externally rendered images

use chrono::{Duration as ChronoDuration, Utc};
use futures::future::BoxFuture;
use image::{Rgba, RgbaImage};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

use layerthumb::catalog::{BoundingBox, Catalog, Entity, EntityId, EntityKind, MemoryCatalog};
use layerthumb::render::{RenderError, RenderRequest, Renderer};
use layerthumb::thumbnail::transform::{decode, encode_png};
use layerthumb::thumbnail::{
    CacheState, DiskThumbnailStore, MemoryThumbnailStore, ServiceConfig, ThumbnailError,
    ThumbnailService, ThumbnailStore, Tier,
};

// =============================================================================
// Test Helpers
// =============================================================================

/// Renderer that draws a gradient of the requested size and counts calls.
#[derive(Default)]
struct CountingRenderer {
    calls: AtomicUsize,
    requests: Mutex<Vec<(BoundingBox, u32, u32)>>,
    fail: AtomicBool,
    garbage: AtomicBool,
    delay: Option<Duration>,
}

impl CountingRenderer {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn requests(&self) -> Vec<(BoundingBox, u32, u32)> {
        self.requests.lock().clone()
    }
}

impl Renderer for CountingRenderer {
    fn render<'a>(
        &'a self,
        request: &'a RenderRequest,
    ) -> BoxFuture<'a, Result<Vec<u8>, RenderError>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requests
                .lock()
                .push((request.bbox.clone(), request.width, request.height));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail.load(Ordering::SeqCst) {
                return Err(RenderError::HttpError("HTTP 503".to_string()));
            }
            if self.garbage.load(Ordering::SeqCst) {
                return Ok(b"<ServiceExceptionReport/>".to_vec());
            }
            Ok(gradient_png(request.width, request.height))
        })
    }

    fn name(&self) -> &str {
        "counting"
    }
}

fn gradient_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, 128, 255])
    });
    encode_png(&image).unwrap()
}

/// Layer `foo:one` with 300x150 bounds.
fn layer() -> Entity {
    Entity::new(
        "layer-1",
        "one",
        Some("foo".to_string()),
        EntityKind::Layer,
        BoundingBox::new(0.0, 0.0, 300.0, 150.0, "EPSG:4326"),
    )
}

struct Fixture {
    catalog: Arc<MemoryCatalog>,
    renderer: Arc<CountingRenderer>,
    store: Arc<MemoryThumbnailStore>,
    service: ThumbnailService,
    id: EntityId,
}

fn fixture_with(renderer: CountingRenderer) -> Fixture {
    let catalog = Arc::new(MemoryCatalog::with_entities([layer()]));
    let renderer = Arc::new(renderer);
    let store = Arc::new(MemoryThumbnailStore::new());
    let service = ThumbnailService::new(
        catalog.clone(),
        renderer.clone(),
        store.clone(),
        ServiceConfig::default(),
    );
    Fixture {
        catalog,
        renderer,
        store,
        service,
        id: EntityId::new("layer-1"),
    }
}

fn fixture() -> Fixture {
    fixture_with(CountingRenderer::default())
}

// =============================================================================
// Integration Tests
// =============================================================================

#[tokio::test]
async fn test_first_get_generates_both_tiers() {
    let f = fixture();

    let thumbnail = f.service.get(&f.id, Tier::Standard).await.unwrap();

    assert_eq!(f.renderer.calls(), 1);
    assert_eq!(thumbnail.mime_type, "image/png");
    assert!(f.store.exists("foo/layer-1.png").await.unwrap());
    assert!(f.store.exists("foo/layer-1@2x.png").await.unwrap());

    let entity = f.catalog.resolve(&f.id).unwrap().unwrap();
    assert_eq!(entity.metadata.thumbnail.as_deref(), Some("foo/layer-1.png"));
    assert_eq!(entity.metadata.bbox, Some(layer().bounds));
}

#[tokio::test]
async fn test_scenario_render_and_tier_dimensions() {
    let f = fixture();

    let standard = f.service.get(&f.id, Tier::Standard).await.unwrap();
    let high = f.service.get(&f.id, Tier::High).await.unwrap();

    let requests = f.renderer.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!((requests[0].1, requests[0].2), (350, 175));

    assert_eq!(decode(&standard.data).unwrap().dimensions(), (175, 175));
    assert_eq!(decode(&high.data).unwrap().dimensions(), (350, 350));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_gets_render_once() {
    let f = fixture_with(CountingRenderer::with_delay(Duration::from_millis(50)));
    let n = 16;

    let handles: Vec<_> = (0..n)
        .map(|_| {
            let service = f.service.clone();
            let id = f.id.clone();
            tokio::spawn(async move { service.get(&id, Tier::Standard).await })
        })
        .collect();

    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|r| r.unwrap().unwrap())
        .collect();

    assert_eq!(f.renderer.calls(), 1, "Exactly one render expected");
    assert!(results.iter().all(|t| t.data == results[0].data));
    assert_eq!(f.service.coordinator().in_flight_count(), 0);
}

#[tokio::test]
async fn test_fresh_cache_bypasses_renderer() {
    let f = fixture();
    f.service.get(&f.id, Tier::Standard).await.unwrap();

    let standard = f.service.get(&f.id, Tier::Standard).await.unwrap();
    let high = f.service.get(&f.id, Tier::High).await.unwrap();

    assert_eq!(f.renderer.calls(), 1);
    assert_eq!(
        standard.data.as_slice(),
        f.store.get("foo/layer-1.png").await.unwrap().unwrap().as_slice()
    );
    assert_eq!(decode(&high.data).unwrap().width(), 350);

    let stats = f.service.stats();
    assert_eq!(stats.cache_hits, 2);
    assert_eq!(stats.cache_misses, 1);
    assert_eq!(stats.generations, 1);
}

#[tokio::test]
async fn test_metadata_write_stays_within_grace_window() {
    let f = fixture();
    f.service.get(&f.id, Tier::Standard).await.unwrap();

    // Recording the thumbnail bumped the entity's modified timestamp.
    let entity = f.catalog.resolve(&f.id).unwrap().unwrap();
    let written = f.store.last_modified("foo/layer-1.png").await.unwrap().unwrap();
    assert!(entity.metadata.modified.unwrap() >= written);

    assert!(f.service.status(&f.id).await.unwrap().is_fresh());
    f.service.get(&f.id, Tier::High).await.unwrap();
    assert_eq!(f.renderer.calls(), 1);
}

#[tokio::test]
async fn test_modification_after_grace_regenerates() {
    let f = fixture();
    f.service.get(&f.id, Tier::Standard).await.unwrap();

    f.catalog
        .set_modified(&f.id, Utc::now() + ChronoDuration::seconds(2))
        .unwrap();
    assert_eq!(f.service.status(&f.id).await.unwrap(), CacheState::Stale);

    f.service.get(&f.id, Tier::Standard).await.unwrap();
    assert_eq!(f.renderer.calls(), 2);
    assert!(f.service.status(&f.id).await.unwrap().is_fresh());
}

#[tokio::test]
async fn test_regeneration_reuses_recorded_bounding_box() {
    let f = fixture();
    f.service.get(&f.id, Tier::Standard).await.unwrap();

    f.catalog
        .update_bounds(
            &f.id,
            BoundingBox::new(0.0, 0.0, 100.0, 400.0, "EPSG:4326"),
        )
        .unwrap();
    f.catalog
        .set_modified(&f.id, Utc::now() + ChronoDuration::seconds(2))
        .unwrap();

    f.service.get(&f.id, Tier::Standard).await.unwrap();

    let requests = f.renderer.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].0, layer().bounds);
    assert_eq!((requests[1].1, requests[1].2), (350, 175));
}

#[tokio::test]
async fn test_missing_bytes_fail_open() {
    let f = fixture();
    f.service.get(&f.id, Tier::Standard).await.unwrap();

    f.store.remove("foo/layer-1@2x.png").await.unwrap();
    assert_eq!(f.service.status(&f.id).await.unwrap(), CacheState::Absent);

    let high = f.service.get(&f.id, Tier::High).await.unwrap();
    assert_eq!(decode(&high.data).unwrap().dimensions(), (350, 350));
    assert_eq!(f.renderer.calls(), 2);
}

#[tokio::test]
async fn test_render_failure_leaves_no_record() {
    let f = fixture();
    f.renderer.fail.store(true, Ordering::SeqCst);

    let err = f.service.get(&f.id, Tier::Standard).await.unwrap_err();
    match err {
        ThumbnailError::GenerationFailed { entity, cause } => {
            assert_eq!(entity, f.id);
            assert!(matches!(*cause, ThumbnailError::Render(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }

    let entity = f.catalog.resolve(&f.id).unwrap().unwrap();
    assert!(entity.metadata.thumbnail.is_none());
    assert!(entity.metadata.bbox.is_none());
    assert!(f.store.is_empty());
    assert_eq!(f.service.status(&f.id).await.unwrap(), CacheState::Absent);
    assert_eq!(f.service.stats().failures, 1);

    // No retry inside the service; the next call tries again.
    f.renderer.fail.store(false, Ordering::SeqCst);
    f.service.get(&f.id, Tier::Standard).await.unwrap();
    assert_eq!(f.renderer.calls(), 2);
}

#[tokio::test]
async fn test_failed_regeneration_keeps_stale_state() {
    let f = fixture();
    f.service.get(&f.id, Tier::Standard).await.unwrap();
    let before = f.catalog.resolve(&f.id).unwrap().unwrap().metadata.thumbnail;

    f.catalog
        .set_modified(&f.id, Utc::now() + ChronoDuration::seconds(2))
        .unwrap();
    f.renderer.fail.store(true, Ordering::SeqCst);

    assert!(f.service.get(&f.id, Tier::Standard).await.is_err());
    assert_eq!(f.service.status(&f.id).await.unwrap(), CacheState::Stale);
    assert_eq!(
        f.catalog.resolve(&f.id).unwrap().unwrap().metadata.thumbnail,
        before
    );
}

#[tokio::test]
async fn test_undecodable_render_is_generation_failure() {
    let f = fixture();
    f.renderer.garbage.store(true, Ordering::SeqCst);

    let err = f.service.get(&f.id, Tier::Standard).await.unwrap_err();
    match err {
        ThumbnailError::GenerationFailed { cause, .. } => {
            assert!(matches!(*cause, ThumbnailError::ImageDecode(_)));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(f.store.is_empty());
}

#[tokio::test]
async fn test_concurrent_failure_reaches_every_caller() {
    let f = fixture_with(CountingRenderer::with_delay(Duration::from_millis(50)));
    f.renderer.fail.store(true, Ordering::SeqCst);

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = f.service.clone();
            let id = f.id.clone();
            tokio::spawn(async move { service.get(&id, Tier::High).await })
        })
        .collect();

    for handle in handles {
        let err = handle.await.unwrap().unwrap_err();
        assert!(matches!(err, ThumbnailError::GenerationFailed { .. }));
    }
    assert_eq!(f.service.coordinator().in_flight_count(), 0);
}

#[tokio::test]
async fn test_deleted_entity_is_not_found() {
    let f = fixture();
    f.service.get(&f.id, Tier::Standard).await.unwrap();
    f.catalog.remove(&f.id);

    let err = f.service.get(&f.id, Tier::Standard).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(f.service.status(&f.id).await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_empty_bounds_fail_generation() {
    let catalog = Arc::new(MemoryCatalog::with_entities([Entity::new(
        "empty",
        "nothing",
        Some("foo".to_string()),
        EntityKind::LayerGroup,
        BoundingBox::new(5.0, 5.0, 5.0, 5.0, "EPSG:4326"),
    )]));
    let renderer = Arc::new(CountingRenderer::default());
    let service = ThumbnailService::new(
        catalog,
        renderer.clone(),
        Arc::new(MemoryThumbnailStore::new()),
        ServiceConfig::default(),
    );

    let err = service
        .get(&EntityId::new("empty"), Tier::Standard)
        .await
        .unwrap_err();
    assert!(matches!(err, ThumbnailError::GenerationFailed { .. }));
    assert_eq!(renderer.calls(), 0);
}

#[tokio::test]
async fn test_find_by_workspace_and_name() {
    let f = fixture();

    let entity = f.service.find("foo", "one", EntityKind::Layer).unwrap();
    assert_eq!(entity.id, f.id);

    let err = f
        .service
        .find("foo", "one", EntityKind::LayerGroup)
        .unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(err.to_string(), "Entity not found: maps/foo/one");
}

#[tokio::test]
async fn test_capture_records_view_bounding_box() {
    let f = fixture();
    let view = BoundingBox::new(50.0, 25.0, 250.0, 125.0, "EPSG:4326");

    let pair = f
        .service
        .capture(&f.id, view.clone(), gradient_png(400, 200))
        .await
        .unwrap();

    assert_eq!(f.renderer.calls(), 0);
    assert_eq!(pair.record.bounding_box_used, view);
    assert_eq!(decode(&pair.standard).unwrap().dimensions(), (175, 175));
    assert_eq!(decode(&pair.high).unwrap().dimensions(), (350, 350));
    assert_eq!(f.service.stats().captures, 1);

    // The captured image is served from cache.
    let thumbnail = f.service.get(&f.id, Tier::Standard).await.unwrap();
    assert_eq!(thumbnail.data, pair.standard);
    assert_eq!(f.renderer.calls(), 0);

    // Later generations render the captured view.
    f.catalog
        .set_modified(&f.id, Utc::now() + ChronoDuration::seconds(2))
        .unwrap();
    f.service.get(&f.id, Tier::Standard).await.unwrap();
    assert_eq!(f.renderer.requests()[0].0, view);
}

#[tokio::test]
async fn test_capture_rejects_garbage() {
    let f = fixture();

    let err = f
        .service
        .capture(&f.id, layer().bounds, b"not an image".to_vec())
        .await
        .unwrap_err();

    assert!(matches!(err, ThumbnailError::GenerationFailed { .. }));
    assert!(f.store.is_empty());
    let entity = f.catalog.resolve(&f.id).unwrap().unwrap();
    assert!(entity.metadata.thumbnail.is_none());
}

#[tokio::test]
async fn test_capture_joins_in_flight_generation() {
    let f = fixture_with(CountingRenderer::with_delay(Duration::from_millis(200)));

    let generation = {
        let service = f.service.clone();
        let id = f.id.clone();
        tokio::spawn(async move { service.get(&id, Tier::Standard).await })
    };
    while !f.service.coordinator().is_in_flight(&f.id) {
        tokio::task::yield_now().await;
    }

    let view = BoundingBox::new(50.0, 25.0, 250.0, 125.0, "EPSG:4326");
    let pair = f
        .service
        .capture(&f.id, view, gradient_png(400, 200))
        .await
        .unwrap();
    let generated = generation.await.unwrap().unwrap();

    // The capture received the rendered pair; its own image was not stored.
    assert_eq!(pair.record.bounding_box_used, layer().bounds);
    assert_eq!(pair.standard, generated.data);
    assert_eq!(f.renderer.calls(), 1);
    assert_eq!(f.service.stats().captures, 0);
    assert_eq!(f.service.coordinator().stats().coalesced_requests, 1);
}

#[tokio::test]
async fn test_first_generation_renders_current_catalog_bounds() {
    let f = fixture();
    let bounds = BoundingBox::new(0.0, 0.0, 100.0, 400.0, "EPSG:4326");
    f.catalog.update_bounds(&f.id, bounds.clone()).unwrap();

    f.service.get(&f.id, Tier::Standard).await.unwrap();

    let requests = f.renderer.requests();
    assert_eq!(requests[0].0, bounds);
    assert_eq!((requests[0].1, requests[0].2), (175, 700));
}

#[tokio::test]
async fn test_disk_store_end_to_end() {
    let temp_dir = TempDir::new().unwrap();
    let store = Arc::new(DiskThumbnailStore::new(temp_dir.path().join("cache")).unwrap());
    let catalog = Arc::new(MemoryCatalog::with_entities([layer()]));
    let renderer = Arc::new(CountingRenderer::default());
    let service = ThumbnailService::new(
        catalog,
        renderer.clone(),
        store.clone(),
        ServiceConfig::default(),
    );
    let id = EntityId::new("layer-1");

    let first = service.get(&id, Tier::High).await.unwrap();
    let second = service.get(&id, Tier::High).await.unwrap();

    assert_eq!(renderer.calls(), 1);
    assert_eq!(first.data, second.data);
    assert!(store.root().join("foo").join("layer-1.png").is_file());
    assert!(store.root().join("foo").join("layer-1@2x.png").is_file());
}
