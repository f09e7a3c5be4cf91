use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use web_time::Instant;

use crate::clock::Clock;
use crate::release::ReleaseId;

/// How long a fetched default release stays fresh.
pub const DEFAULT_TTL: Duration = Duration::from_millis(300_000);

#[derive(Clone, Debug)]
struct Entry {
    value: ReleaseId,
    fetched_at: Instant,
}

/// Single-key cache of the remotely stored default release.
///
/// The value and its fetch time are stored together, so a timestamp never
/// exists without a value. Writes are last-write-wins; concurrent refreshes
/// after expiry are tolerated.
pub struct ReleaseCache {
    entry: Mutex<Option<Entry>>,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl ReleaseCache {
    pub fn new(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            entry: Mutex::new(None),
            ttl,
            clock,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, Option<Entry>> {
        // The guarded data is a plain value; a panic mid-write cannot leave it torn.
        self.entry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The cached release if it was fetched less than `ttl` ago.
    pub fn fresh(&self) -> Option<ReleaseId> {
        let now = self.clock.now();
        self.lock()
            .as_ref()
            .filter(|entry| now.saturating_duration_since(entry.fetched_at) < self.ttl)
            .map(|entry| entry.value.clone())
    }

    /// The cached release regardless of age.
    pub fn any(&self) -> Option<ReleaseId> {
        self.lock().as_ref().map(|entry| entry.value.clone())
    }

    /// Current time on the cache's clock.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Record a fetched release. `fetched_at` is when the fetch was started,
    /// so the TTL runs from the request rather than the response.
    pub fn store(&self, value: ReleaseId, fetched_at: Instant) {
        *self.lock() = Some(Entry { value, fetched_at });
    }

    /// Time since the last successful fetch, if any.
    pub fn age(&self) -> Option<Duration> {
        let now = self.clock.now();
        self.lock()
            .as_ref()
            .map(|entry| now.saturating_duration_since(entry.fetched_at))
    }
}

impl std::fmt::Debug for ReleaseCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReleaseCache")
            .field("ttl", &self.ttl)
            .field("value", &self.any())
            .finish_non_exhaustive()
    }
}
