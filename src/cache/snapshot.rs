//! A single time-boxed snapshot of the project hierarchy.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;

use crate::error::FetchError;
use crate::github::{Card, Column, Project, Scope};

use super::traits::CacheResult;

/// Lazily populated lookup tables that all expire together.
///
/// Keys are only ever added. Failed fetches are never stored, so the next
/// lookup for the same key goes back to the network.
#[derive(Debug)]
pub struct CacheSnapshot {
  expires: DateTime<Utc>,
  organization_projects: HashMap<String, Vec<Project>>,
  repository_projects: HashMap<String, Vec<Project>>,
  project_columns: HashMap<u64, Vec<Column>>,
  column_cards: HashMap<u64, Vec<Card>>,
}

impl CacheSnapshot {
  pub fn new(expires: DateTime<Utc>) -> Self {
    Self {
      expires,
      organization_projects: HashMap::new(),
      repository_projects: HashMap::new(),
      project_columns: HashMap::new(),
      column_cards: HashMap::new(),
    }
  }

  /// A snapshot that any scrape will replace.
  pub fn expired() -> Self {
    Self::new(DateTime::<Utc>::MIN_UTC)
  }

  pub fn expires(&self) -> DateTime<Utc> {
    self.expires
  }

  pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
    now >= self.expires
  }

  /// Number of cached keys across all levels.
  pub fn len(&self) -> usize {
    self.organization_projects.len()
      + self.repository_projects.len()
      + self.project_columns.len()
      + self.column_cards.len()
  }

  /// Projects of a scope, fetched on miss.
  pub async fn projects<F, Fut>(
    &mut self,
    scope: &Scope,
    fetcher: F,
  ) -> Result<CacheResult<Vec<Project>>, FetchError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<Project>, FetchError>>,
  {
    let (entries, key) = match scope {
      Scope::Organization(org) => (&mut self.organization_projects, org),
      Scope::Repository(slug) => (&mut self.repository_projects, slug),
    };
    lookup_or_fetch(entries, key.clone(), fetcher).await
  }

  /// Columns of a project, fetched on miss.
  pub async fn columns<F, Fut>(
    &mut self,
    project_id: u64,
    fetcher: F,
  ) -> Result<CacheResult<Vec<Column>>, FetchError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<Column>, FetchError>>,
  {
    lookup_or_fetch(&mut self.project_columns, project_id, fetcher).await
  }

  /// Cards of a column, fetched on miss.
  pub async fn cards<F, Fut>(
    &mut self,
    column_id: u64,
    fetcher: F,
  ) -> Result<CacheResult<Vec<Card>>, FetchError>
  where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<Vec<Card>, FetchError>>,
  {
    lookup_or_fetch(&mut self.column_cards, column_id, fetcher).await
  }
}

async fn lookup_or_fetch<K, V, F, Fut>(
  entries: &mut HashMap<K, V>,
  key: K,
  fetcher: F,
) -> Result<CacheResult<V>, FetchError>
where
  K: Eq + Hash,
  V: Clone,
  F: FnOnce() -> Fut,
  Fut: Future<Output = Result<V, FetchError>>,
{
  if let Some(cached) = entries.get(&key) {
    return Ok(CacheResult::from_cache(cached.clone()));
  }

  let data = fetcher().await?;
  entries.insert(key, data.clone());
  Ok(CacheResult::from_network(data))
}
