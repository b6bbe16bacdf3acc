//! Cache layer that owns the current snapshot and decides when it expires.

use chrono::{DateTime, Duration, Utc};
use tokio::sync::{Mutex, MutexGuard};

use super::snapshot::CacheSnapshot;

/// Time-boxed snapshot store shared across scrapes.
///
/// The snapshot is swapped and populated under one async mutex, so a scrape
/// that overlaps a running one waits for it and then sees its results.
pub struct ScrapeCache {
  snapshot: Mutex<CacheSnapshot>,
  /// How long a snapshot serves scrapes before it is rebuilt
  ttl: Duration,
}

impl ScrapeCache {
  /// Create a cache whose snapshots live for `ttl`. A zero TTL rebuilds the
  /// snapshot on every scrape.
  pub fn new(ttl: Duration) -> Self {
    Self {
      snapshot: Mutex::new(CacheSnapshot::expired()),
      ttl,
    }
  }

  /// Lock the snapshot for one scrape, replacing it first if `now` is at or
  /// past its expiry.
  pub async fn get_or_create(&self, now: DateTime<Utc>) -> MutexGuard<'_, CacheSnapshot> {
    let mut snapshot = self.snapshot.lock().await;

    if snapshot.is_expired(now) {
      let expires = now
        .checked_add_signed(self.ttl)
        .unwrap_or(DateTime::<Utc>::MAX_UTC);
      *snapshot = CacheSnapshot::new(expires);
      tracing::debug!(%expires, "Reset cache");
    }

    snapshot
  }
}
