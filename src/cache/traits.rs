//! Core types for the caching system.

/// Result from a cache lookup, including data and where it came from.
#[derive(Debug, Clone)]
pub struct CacheResult<T> {
  /// The actual data
  pub data: T,
  /// Where the data came from
  pub source: CacheSource,
}

impl<T> CacheResult<T> {
  /// Create a new cache result from fresh network data.
  pub fn from_network(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Network,
    }
  }

  /// Create a new cache result from the current snapshot.
  pub fn from_cache(data: T) -> Self {
    Self {
      data,
      source: CacheSource::Snapshot,
    }
  }
}

/// Indicates where a lookup result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  /// Fetched from the GitHub API during this lookup
  Network,
  /// Served from the current snapshot
  Snapshot,
}
