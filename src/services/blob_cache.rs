// src/services/blob_cache.rs
//! Short-lived local blobs (generated audio) served back at `/api/blobs/{id}`.
//!
//! Only references issued here are local; anything else is a persisted
//! location and `release` leaves it alone.

use crate::services::clock::{Clock, SystemClock};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

pub const LOCAL_BLOB_PREFIX: &str = "/api/blobs/";

#[derive(Debug, Clone)]
pub struct CachedBlob {
    pub bytes: Bytes,
    pub content_type: String,
    created_at: DateTime<Utc>,
}

pub struct BlobCache {
    blobs: Mutex<HashMap<Uuid, CachedBlob>>,
    ttl: chrono::Duration,
    clock: Arc<dyn Clock>,
}

impl BlobCache {
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            blobs: Mutex::new(HashMap::new()),
            ttl: chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::hours(1)),
            clock,
        }
    }

    pub fn is_local(location: &str) -> bool {
        location.starts_with(LOCAL_BLOB_PREFIX)
    }

    fn parse_id(location: &str) -> Option<Uuid> {
        let id = location.strip_prefix(LOCAL_BLOB_PREFIX).unwrap_or(location);
        Uuid::parse_str(id).ok()
    }

    /// Stores bytes and returns their local reference.
    pub fn insert(&self, bytes: Bytes, content_type: &str) -> String {
        let now = self.clock.now();
        let id = Uuid::new_v4();
        let mut blobs = self.blobs.lock();
        let ttl = self.ttl;
        blobs.retain(|_, blob| now - blob.created_at < ttl);
        blobs.insert(
            id,
            CachedBlob {
                bytes,
                content_type: content_type.to_string(),
                created_at: now,
            },
        );
        format!("{}{}", LOCAL_BLOB_PREFIX, id)
    }

    /// Whether `location` is a local reference that has not expired.
    pub fn contains(&self, location: &str) -> bool {
        let Some(id) = Self::parse_id(location) else {
            return false;
        };
        let now = self.clock.now();
        self.blobs
            .lock()
            .get(&id)
            .is_some_and(|blob| now - blob.created_at < self.ttl)
    }

    /// Looks up a blob by local reference or bare id.
    pub fn get(&self, location: &str) -> Option<CachedBlob> {
        let id = Self::parse_id(location)?;
        let now = self.clock.now();
        let blobs = self.blobs.lock();
        blobs
            .get(&id)
            .filter(|blob| now - blob.created_at < self.ttl)
            .cloned()
    }

    /// Frees a local reference. Persisted or unknown locations are ignored.
    pub fn release(&self, location: &str) -> bool {
        if !Self::is_local(location) {
            return false;
        }
        let released = Self::parse_id(location)
            .map(|id| self.blobs.lock().remove(&id).is_some())
            .unwrap_or(false);
        if released {
            debug!("Released local blob {}", location);
        }
        released
    }

    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
