// src/services/sessions.rs
use crate::models::BrandKit;
use crate::services::blob_cache::BlobCache;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Remembers which local blob references each UI session currently holds,
/// so that superseded ones are freed when a new kit is handed out.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, HashSet<String>>>,
    blobs: Arc<BlobCache>,
}

impl SessionRegistry {
    pub fn new(blobs: Arc<BlobCache>) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            blobs,
        }
    }

    /// Records the kit now owned by `session_id` and releases every local
    /// reference the session held before that the new kit no longer uses.
    /// Sessions left holding only expired blobs are forgotten.
    /// Returns how many references were released.
    pub fn track(&self, session_id: &str, kit: &BrandKit) -> usize {
        let current: HashSet<String> = kit
            .audio_locations()
            .into_iter()
            .filter(|url| BlobCache::is_local(url))
            .map(str::to_string)
            .collect();

        let previous = {
            let mut sessions = self.sessions.lock();
            let previous = sessions
                .insert(session_id.to_string(), current.clone())
                .unwrap_or_default();
            sessions.retain(|_, held| held.iter().any(|url| self.blobs.contains(url)));
            previous
        };

        previous
            .difference(&current)
            .filter(|url| self.blobs.release(url))
            .count()
    }

    /// Frees a single reference that never made it into a kit.
    pub fn release(&self, location: &str) -> bool {
        self.blobs.release(location)
    }

    /// Releases everything a session holds (reset / discard).
    pub fn discard(&self, session_id: &str) -> usize {
        let held = self.sessions.lock().remove(session_id).unwrap_or_default();
        held.iter().filter(|url| self.blobs.release(url)).count()
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.sessions.lock().len()
    }
}
