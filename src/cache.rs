/// Short-lived cache in front of the upstream air-quality provider.
///
/// Holds one batch of provider records with the time it was fetched. A
/// batch older than the TTL is refetched on the next request; anything
/// newer is served as is.
///
/// The slot lock is held for the whole refresh, so concurrent requests that
/// arrive while the entry is expired trigger one upstream fetch between
/// them: the first caller fetches, the rest wait on the lock and then find
/// a fresh entry.
///
/// A failed fetch is never cached and never replaced by the stale batch.
/// Requests that were already waiting on that fetch get its error instead
/// of starting a fetch of their own; requests arriving after it try again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::model::{AqiError, ProviderRecord};

pub const DEFAULT_TTL_SECS: i64 = 60;

#[derive(Debug, Clone)]
struct CacheEntry {
    records: Arc<Vec<ProviderRecord>>,
    fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now - self.fetched_at <= ttl
    }
}

/// Outcome of the most recent refresh, if it failed.
#[derive(Debug, Clone)]
struct FailedRefresh {
    attempt: u64,
    error: AqiError,
}

#[derive(Debug, Default)]
struct Slot {
    entry: Option<CacheEntry>,
    last_failure: Option<FailedRefresh>,
}

#[derive(Debug)]
pub struct ProviderCache {
    ttl: Duration,
    slot: Mutex<Slot>,
    /// Completed refresh attempts, successful or not. Only bumped with the
    /// slot lock held.
    attempts: AtomicU64,
}

impl ProviderCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            slot: Mutex::new(Slot::default()),
            attempts: AtomicU64::new(0),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached batch if it is still fresh at `now`, otherwise
    /// calls `fetch`, stores its result stamped with `now` and returns it.
    ///
    /// # Errors
    /// - Whatever `fetch` returns; the slot is left untouched.
    /// - `AqiError::UpstreamEmpty` if `fetch` returns no records. Empty
    ///   batches are not stored.
    /// - The error of a refresh that completed while this call waited for
    ///   the lock. `fetch` is not called in that case.
    pub fn get_fresh_records<F>(
        &self,
        now: DateTime<Utc>,
        fetch: F,
    ) -> Result<Arc<Vec<ProviderRecord>>, AqiError>
    where
        F: FnOnce() -> Result<Vec<ProviderRecord>, AqiError>,
    {
        let seen = self.attempts.load(Ordering::Acquire);
        self.refresh_after(seen, now, fetch)
    }

    /// `seen` is the attempt count observed before waiting for the lock.
    fn refresh_after<F>(
        &self,
        seen: u64,
        now: DateTime<Utc>,
        fetch: F,
    ) -> Result<Arc<Vec<ProviderRecord>>, AqiError>
    where
        F: FnOnce() -> Result<Vec<ProviderRecord>, AqiError>,
    {
        let mut slot = self.lock();

        if let Some(entry) = slot.entry.as_ref().filter(|e| e.is_fresh(now, self.ttl)) {
            debug!(fetched_at = %entry.fetched_at, "provider cache hit");
            return Ok(Arc::clone(&entry.records));
        }

        if let Some(failed) = slot.last_failure.as_ref().filter(|f| f.attempt > seen) {
            debug!(error = %failed.error, "sharing failed refresh with waiting request");
            return Err(failed.error.clone());
        }

        let result = fetch().and_then(|records| {
            if records.is_empty() {
                Err(AqiError::UpstreamEmpty)
            } else {
                Ok(records)
            }
        });
        let attempt = self.attempts.fetch_add(1, Ordering::AcqRel) + 1;

        match result {
            Ok(records) => {
                info!(records = records.len(), "provider cache refreshed");
                let records = Arc::new(records);
                slot.entry = Some(CacheEntry {
                    records: Arc::clone(&records),
                    fetched_at: now,
                });
                slot.last_failure = None;
                Ok(records)
            }
            Err(error) => {
                slot.last_failure = Some(FailedRefresh {
                    attempt,
                    error: error.clone(),
                });
                Err(error)
            }
        }
    }

    /// When the cached batch was fetched, if there is one.
    pub fn fetched_at(&self) -> Option<DateTime<Utc>> {
        self.lock().entry.as_ref().map(|e| e.fetched_at)
    }

    /// Drops the cached batch so the next request refetches.
    pub fn invalidate(&self) {
        let mut slot = self.lock();
        slot.entry = None;
        slot.last_failure = None;
    }

    // The slot only ever holds complete values, so a panic elsewhere while
    // the lock was held leaves nothing half-written.
    fn lock(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ProviderCache {
    fn default() -> Self {
        Self::new(Duration::seconds(DEFAULT_TTL_SECS))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
