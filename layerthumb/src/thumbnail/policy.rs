//! Cache validity decisions.
//!
//! Validity is tied to the entity's `modified` timestamp rather than a TTL:
//!
//! ```text
//!   no record, or either tier missing  ──► Absent
//!   modified > written + grace         ──► Stale
//!   otherwise                          ──► Fresh
//! ```
//!
//! Recording a new thumbnail key is itself an entity modification, so a
//! freshly generated thumbnail always looks slightly older than its entity.
//! The grace window absorbs that write.

use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use crate::catalog::EntityId;
use crate::thumbnail::naming::paired_key;
use crate::thumbnail::store::ThumbnailStore;
use crate::thumbnail::types::{ThumbnailError, ThumbnailRecord, Tier};

/// Default grace window between an entity edit and the thumbnail write.
pub const GRACE_WINDOW: Duration = Duration::seconds(1);

/// Cache state of one entity's thumbnails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Both tiers are present and current.
    Fresh {
        /// Older of the two tiers' write times.
        written_at: DateTime<Utc>,
    },
    /// Both tiers are present but the entity changed after they were written.
    Stale,
    /// No usable thumbnail exists.
    Absent,
}

impl CacheState {
    pub fn is_fresh(&self) -> bool {
        matches!(self, CacheState::Fresh { .. })
    }
}

impl fmt::Display for CacheState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CacheState::Fresh { .. } => write!(f, "FRESH"),
            CacheState::Stale => write!(f, "STALE"),
            CacheState::Absent => write!(f, "ABSENT"),
        }
    }
}

/// True if an entity modified at `modified` invalidates a thumbnail written
/// at `written`.
pub fn is_stale(modified: DateTime<Utc>, written: DateTime<Utc>, grace: Duration) -> bool {
    modified > written + grace
}

/// Evaluates [`CacheState`] from ledger state and the store.
pub struct InvalidationPolicy {
    store: Arc<dyn ThumbnailStore>,
    grace: Duration,
}

impl InvalidationPolicy {
    pub fn new(store: Arc<dyn ThumbnailStore>, grace: Duration) -> Self {
        Self { store, grace }
    }

    pub fn grace(&self) -> Duration {
        self.grace
    }

    /// Evaluate the cache state of `id` given its recorded provenance and
    /// the entity's current modification time.
    ///
    /// A record whose bytes are missing from the store is `Absent`, not an
    /// error. Store failures propagate.
    pub async fn evaluate(
        &self,
        id: &EntityId,
        record: Option<&ThumbnailRecord>,
        modified: Option<DateTime<Utc>>,
    ) -> Result<CacheState, ThumbnailError> {
        let Some(record) = record else {
            debug!(entity = %id, "No thumbnail record");
            return Ok(CacheState::Absent);
        };

        let Some(written_at) = self.written_at(&record.key).await? else {
            debug!(entity = %id, key = %record.key, "Thumbnail record without images");
            return Ok(CacheState::Absent);
        };

        match modified {
            Some(modified) if is_stale(modified, written_at, self.grace) => {
                debug!(
                    entity = %id,
                    modified = %modified,
                    written = %written_at,
                    "Thumbnail is stale"
                );
                Ok(CacheState::Stale)
            }
            _ => Ok(CacheState::Fresh { written_at }),
        }
    }

    /// Write time of a recorded pair: the older of both tiers, or `None` if
    /// either tier is missing.
    async fn written_at(&self, base_key: &str) -> Result<Option<DateTime<Utc>>, ThumbnailError> {
        let mut oldest: Option<DateTime<Utc>> = None;
        for tier in [Tier::Standard, Tier::High] {
            let Some(key) = paired_key(base_key, tier) else {
                return Ok(None);
            };
            match self.store.last_modified(&key).await? {
                Some(at) => oldest = Some(oldest.map_or(at, |o| o.min(at))),
                None => return Ok(None),
            }
        }
        Ok(oldest)
    }
}

impl fmt::Debug for InvalidationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InvalidationPolicy")
            .field("grace", &self.grace)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::BoundingBox;
    use crate::thumbnail::store::MemoryThumbnailStore;

    fn id() -> EntityId {
        EntityId::new("x1")
    }

    fn record() -> ThumbnailRecord {
        ThumbnailRecord::new(
            "foo/x1.png",
            BoundingBox::new(0.0, 0.0, 300.0, 150.0, "EPSG:4326"),
        )
    }

    async fn store_with_pair(written: DateTime<Utc>) -> Arc<MemoryThumbnailStore> {
        let store = Arc::new(MemoryThumbnailStore::new());
        for key in ["foo/x1.png", "foo/x1@2x.png"] {
            store.put(key, Arc::new(vec![1])).await.unwrap();
            store.set_last_modified(key, written);
        }
        store
    }

    #[test]
    fn test_is_stale_boundaries() {
        let written = Utc::now();
        assert!(!is_stale(written, written, GRACE_WINDOW));
        assert!(!is_stale(written + Duration::milliseconds(999), written, GRACE_WINDOW));
        assert!(!is_stale(written + GRACE_WINDOW, written, GRACE_WINDOW));
        assert!(is_stale(written + Duration::milliseconds(1001), written, GRACE_WINDOW));
        assert!(!is_stale(written - Duration::hours(1), written, GRACE_WINDOW));
    }

    #[tokio::test]
    async fn test_no_record_is_absent() {
        let policy = InvalidationPolicy::new(Arc::new(MemoryThumbnailStore::new()), GRACE_WINDOW);
        let state = policy.evaluate(&id(), None, Some(Utc::now())).await.unwrap();
        assert_eq!(state, CacheState::Absent);
    }

    #[tokio::test]
    async fn test_record_without_bytes_is_absent() {
        let policy = InvalidationPolicy::new(Arc::new(MemoryThumbnailStore::new()), GRACE_WINDOW);
        let state = policy
            .evaluate(&id(), Some(&record()), Some(Utc::now()))
            .await
            .unwrap();
        assert_eq!(state, CacheState::Absent);
    }

    #[tokio::test]
    async fn test_missing_high_tier_is_absent() {
        let written = Utc::now();
        let store = store_with_pair(written).await;
        store.remove("foo/x1@2x.png").await.unwrap();
        let policy = InvalidationPolicy::new(store, GRACE_WINDOW);

        let state = policy
            .evaluate(&id(), Some(&record()), Some(written))
            .await
            .unwrap();
        assert_eq!(state, CacheState::Absent);
    }

    #[tokio::test]
    async fn test_modified_within_grace_is_fresh() {
        let written = Utc::now();
        let policy = InvalidationPolicy::new(store_with_pair(written).await, GRACE_WINDOW);

        let state = policy
            .evaluate(
                &id(),
                Some(&record()),
                Some(written + Duration::milliseconds(500)),
            )
            .await
            .unwrap();
        assert_eq!(state, CacheState::Fresh { written_at: written });
    }

    #[tokio::test]
    async fn test_modified_after_grace_is_stale() {
        let written = Utc::now();
        let policy = InvalidationPolicy::new(store_with_pair(written).await, GRACE_WINDOW);

        let state = policy
            .evaluate(&id(), Some(&record()), Some(written + Duration::seconds(2)))
            .await
            .unwrap();
        assert_eq!(state, CacheState::Stale);
    }

    #[tokio::test]
    async fn test_older_tier_decides() {
        let written = Utc::now();
        let store = store_with_pair(written).await;
        store.set_last_modified("foo/x1.png", written - Duration::seconds(5));
        let policy = InvalidationPolicy::new(store, GRACE_WINDOW);

        let state = policy
            .evaluate(&id(), Some(&record()), Some(written))
            .await
            .unwrap();
        assert_eq!(state, CacheState::Stale);
    }

    #[tokio::test]
    async fn test_unknown_modified_is_fresh() {
        let written = Utc::now();
        let policy = InvalidationPolicy::new(store_with_pair(written).await, GRACE_WINDOW);

        let state = policy.evaluate(&id(), Some(&record()), None).await.unwrap();
        assert!(state.is_fresh());
    }

    #[test]
    fn test_state_display() {
        assert_eq!(CacheState::Absent.to_string(), "ABSENT");
        assert_eq!(CacheState::Stale.to_string(), "STALE");
        assert_eq!(
            CacheState::Fresh {
                written_at: Utc::now()
            }
            .to_string(),
            "FRESH"
        );
    }
}
