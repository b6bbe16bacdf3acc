//! Time-boxed caching of GitHub API responses across scrapes.
//!
//! This module provides:
//! - One snapshot per process, expiring as a whole at a single instant
//! - Lazy per-key population during a scrape (projects, columns, cards)
//! - No negative caching: a failed fetch is retried on the next lookup

mod layer;
mod snapshot;
mod traits;

pub use layer::ScrapeCache;
pub use snapshot::CacheSnapshot;
