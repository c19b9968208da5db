// src/services/rate_guard.rs
//! Per-caller, per-UTC-day admission for generation runs.
//!
//! Counters live under `runs:{caller}:{YYYYMMDD}` and expire 24 hours after
//! their first increment, so they never need cleanup. The guard fails open:
//! with no counter store, or when disabled by configuration, every run is
//! admitted.

use crate::errors::BrandKitError;
use crate::services::clock::{Clock, SystemClock};
use crate::services::memory_store::ExpiringMap;
use async_trait::async_trait;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;

pub const COUNTER_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increments `key` and returns the new count. The first
    /// increment sets the key to expire after `ttl`.
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, BrandKitError>;
}

pub struct InMemoryCounterStore {
    counters: ExpiringMap<i64>,
}

impl InMemoryCounterStore {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            counters: ExpiringMap::new(clock),
        }
    }
}

#[async_trait]
impl CounterStore for InMemoryCounterStore {
    async fn incr_with_expiry(&self, key: &str, ttl: Duration) -> Result<i64, BrandKitError> {
        Ok(self.counters.incr_with_expiry(key, ttl))
    }
}

/// Redis when connected. Otherwise an in-process counter only on explicit
/// opt-in, else no store at all so the guard stays open.
pub fn select_counter_store(
    redis: Option<Arc<dyn CounterStore>>,
    in_process: bool,
    clock: Arc<dyn Clock>,
) -> Option<Arc<dyn CounterStore>> {
    match redis {
        Some(redis) => Some(redis),
        None if in_process => {
            info!("Rate guard counting runs in process");
            Some(Arc::new(InMemoryCounterStore::new(clock)))
        }
        None => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    Denied,
}

pub struct RateGuard {
    store: Option<Arc<dyn CounterStore>>,
    max_per_day: i64,
    disabled: bool,
    clock: Arc<dyn Clock>,
}

impl RateGuard {
    pub fn new(store: Option<Arc<dyn CounterStore>>, max_per_day: i64, disabled: bool) -> Self {
        Self::with_clock(store, max_per_day, disabled, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Option<Arc<dyn CounterStore>>,
        max_per_day: i64,
        disabled: bool,
        clock: Arc<dyn Clock>,
    ) -> Self {
        if disabled {
            info!("Rate guard disabled by configuration");
        } else if store.is_none() {
            warn!("Rate guard has no counter store; all runs will be admitted");
        }
        Self {
            store,
            max_per_day,
            disabled,
            clock,
        }
    }

    /// Counts one run for `caller_key` and decides whether it may start.
    /// Store errors surface as `BrandKitError::Guard`, never as `Denied`.
    pub async fn admit(&self, caller_key: &str) -> Result<Admission, BrandKitError> {
        if self.disabled {
            return Ok(Admission::Allowed);
        }
        let Some(store) = self.store.as_ref() else {
            return Ok(Admission::Allowed);
        };

        let day = self.clock.now().format("%Y%m%d");
        let key = format!("runs:{}:{}", caller_key, day);

        let count = store
            .incr_with_expiry(&key, COUNTER_TTL)
            .await
            .map_err(|e| BrandKitError::Guard(e.to_string()))?;

        if count > self.max_per_day {
            info!("Denied run for {} ({} today, max {})", caller_key, count, self.max_per_day);
            Ok(Admission::Denied)
        } else {
            debug!("Admitted run {} of {} for {}", count, self.max_per_day, caller_key);
            Ok(Admission::Allowed)
        }
    }
}

/// First hop of `X-Forwarded-For`, else the socket address, else `"unknown"`.
pub fn caller_key(forwarded_for: Option<&str>, peer_addr: Option<&str>) -> String {
    forwarded_for
        .and_then(|chain| chain.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .or_else(|| peer_addr.map(str::trim).filter(|ip| !ip.is_empty()))
        .unwrap_or("unknown")
        .to_string()
}
