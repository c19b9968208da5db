// src/services/share_store.rs
//! Ephemeral, read-only share snapshots.
//!
//! Layout, identical for every backend:
//! - `share:{id}` -> snapshot JSON, expires after the share TTL
//! - `user:{owner}:shares` -> set of ids published by that owner
//!
//! Expired and unknown ids are reported the same way.

use crate::errors::BrandKitError;
use crate::models::{BrandKit, ShareSnapshot};
use crate::services::clock::{Clock, SystemClock};
use crate::services::memory_store::{ExpiringMap, SetMap};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const DEFAULT_SHARE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[async_trait]
pub trait ShareBackend: Send + Sync {
    async fn put_snapshot(&self, key: &str, json: &str, ttl: Duration) -> Result<(), BrandKitError>;
    async fn get_snapshot(&self, key: &str) -> Result<Option<String>, BrandKitError>;
    async fn add_to_index(&self, key: &str, id: &str) -> Result<(), BrandKitError>;
    async fn index_members(&self, key: &str) -> Result<Vec<String>, BrandKitError>;
}

/// Single-process backend.
pub struct InMemoryShareBackend {
    snapshots: ExpiringMap<String>,
    owners: SetMap,
}

impl InMemoryShareBackend {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            snapshots: ExpiringMap::new(clock),
            owners: SetMap::new(),
        }
    }
}

#[async_trait]
impl ShareBackend for InMemoryShareBackend {
    async fn put_snapshot(&self, key: &str, json: &str, ttl: Duration) -> Result<(), BrandKitError> {
        self.snapshots.set_ex(key, json.to_string(), ttl);
        Ok(())
    }

    async fn get_snapshot(&self, key: &str) -> Result<Option<String>, BrandKitError> {
        Ok(self.snapshots.get(key))
    }

    async fn add_to_index(&self, key: &str, id: &str) -> Result<(), BrandKitError> {
        self.owners.sadd(key, id);
        Ok(())
    }

    async fn index_members(&self, key: &str) -> Result<Vec<String>, BrandKitError> {
        Ok(self.owners.smembers(key))
    }
}

/// One row per published share, plus one per asset, for relational mirrors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareRecord {
    pub id: String,
    pub owner_key: Option<String>,
    pub name: String,
    pub created_at: i64,
    pub assets: Vec<ShareAssetRecord>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShareAssetRecord {
    pub kind: String,
    /// `inline` or the persisted location.
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra: Option<serde_json::Value>,
}

impl ShareRecord {
    pub fn project(id: &str, owner_key: Option<&str>, snapshot: &ShareSnapshot) -> Self {
        use crate::models::ImageRef;

        let location = |image: &ImageRef| match image {
            ImageRef::Inline { .. } => "inline".to_string(),
            ImageRef::Url { location } => location.clone(),
        };
        let asset = |kind: String, url: String, extra: Option<serde_json::Value>| ShareAssetRecord {
            kind,
            url,
            extra,
        };

        let mut assets = Vec::new();
        match &snapshot.logos {
            Some(logos) => {
                for slot in crate::models::LogoSlot::ALL {
                    assets.push(asset(
                        format!("logo_{}", slot.as_str()),
                        location(logos.get(slot)),
                        None,
                    ));
                }
            }
            None => assets.push(asset("logo_primary".to_string(), location(&snapshot.logo), None)),
        }
        for (i, image) in snapshot.imagery.iter().enumerate() {
            assets.push(asset(format!("imagery_{}", i + 1), location(image), None));
        }
        for backdrop in snapshot.social_backdrops.iter().flatten() {
            assets.push(asset(
                format!("backdrop_{}", backdrop.platform.as_str()),
                location(&backdrop.image),
                Some(serde_json::json!({ "platform": backdrop.platform })),
            ));
        }
        if let Some(video) = snapshot.ad_video.as_ref().filter(|v| !v.url.is_empty()) {
            assets.push(asset(
                "ad_video".to_string(),
                video.url.clone(),
                Some(serde_json::json!({ "aspectRatio": video.aspect_ratio })),
            ));
        }

        Self {
            id: id.to_string(),
            owner_key: owner_key.map(str::to_string),
            name: snapshot.name.clone(),
            created_at: snapshot.created_at,
            assets,
        }
    }
}

/// Best-effort side channel notified after every publish.
#[async_trait]
pub trait ShareObserver: Send + Sync {
    async fn on_published(&self, record: &ShareRecord) -> Result<(), BrandKitError>;
}

/// Mirrors share records into the log.
pub struct LogShareObserver;

#[async_trait]
impl ShareObserver for LogShareObserver {
    async fn on_published(&self, record: &ShareRecord) -> Result<(), BrandKitError> {
        info!(
            "Share {} '{}' published with {} assets",
            record.id,
            record.name,
            record.assets.len()
        );
        debug!("Share record: {}", serde_json::to_string(record)?);
        Ok(())
    }
}

pub struct ShareStore {
    backend: Option<Arc<dyn ShareBackend>>,
    observers: Vec<Arc<dyn ShareObserver>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ShareStore {
    pub fn new(backend: Option<Arc<dyn ShareBackend>>, ttl: Duration) -> Self {
        Self::with_clock(backend, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        backend: Option<Arc<dyn ShareBackend>>,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            observers: Vec::new(),
            ttl,
            clock,
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn ShareObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    fn share_key(id: &str) -> String {
        format!("share:{}", id)
    }

    fn owner_key(owner: &str) -> String {
        format!("user:{}:shares", owner)
    }

    /// Sanitizes and stores `kit`. Local blob references must already have
    /// been resolved by the caller; anything still local is dropped.
    pub async fn publish(
        &self,
        kit: &BrandKit,
        owner_key: Option<&str>,
    ) -> Result<String, BrandKitError> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| BrandKitError::Share("Sharing not configured".to_string()))?;

        let snapshot = ShareSnapshot::sanitize(kit, self.clock.now().timestamp_millis());
        let json = serde_json::to_string(&snapshot)
            .map_err(|e| BrandKitError::Share(e.to_string()))?;

        let id = Uuid::new_v4().to_string();
        backend
            .put_snapshot(&Self::share_key(&id), &json, self.ttl)
            .await
            .map_err(|e| BrandKitError::Share(e.to_string()))?;

        let owner_key = owner_key.map(str::trim).filter(|o| !o.is_empty());
        if let Some(owner) = owner_key {
            if let Err(e) = backend.add_to_index(&Self::owner_key(owner), &id).await {
                warn!("Failed to index share {} for owner {}: {}", id, owner, e);
            }
        }

        if !self.observers.is_empty() {
            let record = ShareRecord::project(&id, owner_key, &snapshot);
            for observer in &self.observers {
                if let Err(e) = observer.on_published(&record).await {
                    warn!("Share observer failed for {}: {}", id, e);
                }
            }
        }

        info!("Published share {} for '{}'", id, kit.name);
        Ok(id)
    }

    pub async fn retrieve(&self, id: &str) -> Result<ShareSnapshot, BrandKitError> {
        let backend = self.backend.as_ref().ok_or(BrandKitError::NotFound)?;
        let id = id.trim();
        if id.is_empty() {
            return Err(BrandKitError::Validation("Missing id".to_string()));
        }

        let json = backend
            .get_snapshot(&Self::share_key(id))
            .await?
            .ok_or(BrandKitError::NotFound)?;

        Ok(serde_json::from_str(&json)?)
    }

    pub async fn list_by_owner(&self, owner_key: &str) -> Result<Vec<String>, BrandKitError> {
        let Some(backend) = self.backend.as_ref() else {
            return Ok(Vec::new());
        };
        backend.index_members(&Self::owner_key(owner_key.trim())).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::mocks::{ManualClock, RecordingObserver, UnindexableShareBackend, sample_kit};

    fn memory_store(clock: Arc<ManualClock>) -> ShareStore {
        let backend: Arc<dyn ShareBackend> = Arc::new(InMemoryShareBackend::new(clock.clone()));
        ShareStore::with_clock(Some(backend), DEFAULT_SHARE_TTL, clock)
    }

    #[tokio::test]
    async fn publish_then_retrieve_round_trips_the_snapshot() {
        let clock = Arc::new(ManualClock::default());
        let store = memory_store(clock.clone());
        let kit = sample_kit();

        let id = store.publish(&kit, None).await.unwrap();
        let retrieved = store.retrieve(&id).await.unwrap();

        let expected = ShareSnapshot::sanitize(&kit, retrieved.created_at);
        assert_eq!(retrieved, expected);
        assert_eq!(retrieved.created_at, clock.now().timestamp_millis());
    }

    #[tokio::test]
    async fn snapshots_expire_after_ttl() {
        let clock = Arc::new(ManualClock::default());
        let store = memory_store(clock.clone());
        let id = store.publish(&sample_kit(), None).await.unwrap();

        clock.advance(chrono::Duration::hours(23));
        assert!(store.retrieve(&id).await.is_ok());

        clock.advance(chrono::Duration::hours(1));
        assert_eq!(store.retrieve(&id).await, Err(BrandKitError::NotFound));
        assert_eq!(
            store.retrieve("never-existed").await,
            Err(BrandKitError::NotFound)
        );
    }

    #[tokio::test]
    async fn ids_are_opaque_and_unique() {
        let store = memory_store(Arc::new(ManualClock::default()));
        let kit = sample_kit();
        let a = store.publish(&kit, None).await.unwrap();
        let b = store.publish(&kit, None).await.unwrap();
        assert_ne!(a, b);
        assert!(Uuid::parse_str(&a).is_ok());
    }

    #[tokio::test]
    async fn owner_index_grows_monotonically() {
        let store = memory_store(Arc::new(ManualClock::default()));
        let kit = sample_kit();

        let mut seen = 0;
        for _ in 0..3 {
            store.publish(&kit, Some("owner-1")).await.unwrap();
            let ids = store.list_by_owner("owner-1").await.unwrap();
            assert!(ids.len() > seen);
            seen = ids.len();
        }
        assert_eq!(seen, 3);
        assert!(store.list_by_owner("someone-else").await.unwrap().is_empty());
        // blank owner keys are not indexed
        store.publish(&kit, Some("  ")).await.unwrap();
        assert!(store.list_by_owner("").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn index_failure_does_not_fail_publish() {
        let backend: Arc<dyn ShareBackend> = Arc::new(UnindexableShareBackend::default());
        let store = ShareStore::new(Some(backend), DEFAULT_SHARE_TTL);

        let id = store.publish(&sample_kit(), Some("owner-1")).await.unwrap();
        assert!(store.retrieve(&id).await.is_ok());
    }

    #[tokio::test]
    async fn disabled_store_behaviour() {
        let store = ShareStore::new(None, DEFAULT_SHARE_TTL);
        assert!(matches!(
            store.publish(&sample_kit(), None).await,
            Err(BrandKitError::Share(_))
        ));
        assert_eq!(store.retrieve("x").await, Err(BrandKitError::NotFound));
        assert!(store.list_by_owner("owner").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn observers_receive_asset_projection() {
        let observer = Arc::new(RecordingObserver::default());
        let store = memory_store(Arc::new(ManualClock::default())).with_observer(observer.clone());

        let id = store.publish(&sample_kit(), Some("owner-1")).await.unwrap();

        let records = observer.records.lock();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.id, id);
        assert_eq!(record.owner_key.as_deref(), Some("owner-1"));
        let kinds: Vec<&str> = record.assets.iter().map(|a| a.kind.as_str()).collect();
        assert_eq!(
            kinds,
            vec![
                "logo_primary",
                "logo_secondary",
                "logo_submark",
                "imagery_1",
                "imagery_2",
                "backdrop_instagram",
            ]
        );
    }
}
