//! Scrape-time collection over the configured scopes.
//!
//! Each scrape walks scope → projects → columns → cards depth-first, reading
//! through the shared snapshot. A failed lookup is logged and only its own
//! subtree is skipped.

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use crate::cache::{CacheSnapshot, ScrapeCache};
use crate::github::{HierarchyFetcher, Project, ScrapeContext, Scope};
use crate::metrics::Sample;

/// Collects project board samples for a fixed list of scopes.
pub struct Collector {
  fetcher: HierarchyFetcher,
  cache: ScrapeCache,
  /// Organizations first, then repositories, each in configuration order
  scopes: Vec<Scope>,
}

impl Collector {
  pub fn new(fetcher: HierarchyFetcher, cache: ScrapeCache, scopes: Vec<Scope>) -> Self {
    Self {
      fetcher,
      cache,
      scopes,
    }
  }

  pub fn scopes(&self) -> &[Scope] {
    &self.scopes
  }

  /// Run one scrape. Never fails; upstream errors only reduce the samples.
  pub async fn scrape(&self, ctx: &ScrapeContext) -> Vec<Sample> {
    self.scrape_at(Utc::now(), ctx).await
  }

  /// Run one scrape as if the clock read `now`.
  pub async fn scrape_at(&self, now: DateTime<Utc>, ctx: &ScrapeContext) -> Vec<Sample> {
    let mut snapshot = self.cache.get_or_create(now).await;
    let mut samples = Vec::new();

    for scope in &self.scopes {
      self
        .collect_scope(&mut snapshot, scope, ctx, &mut samples)
        .await;
    }

    debug!(
      samples = samples.len(),
      cached_keys = snapshot.len(),
      expires = %snapshot.expires(),
      "Scrape finished"
    );
    samples
  }

  async fn collect_scope(
    &self,
    snapshot: &mut CacheSnapshot,
    scope: &Scope,
    ctx: &ScrapeContext,
    samples: &mut Vec<Sample>,
  ) {
    let projects = match snapshot
      .projects(scope, || self.fetcher.list_projects(scope, ctx))
      .await
    {
      Ok(result) => {
        debug!(%scope, source = ?result.source, count = result.data.len(), "Resolved projects");
        result.data
      }
      Err(e) => {
        error!(%scope, error = %e, "Unable to get projects");
        return;
      }
    };

    samples.push(Sample::projects(scope, projects.len()));

    for project in &projects {
      self
        .collect_project(snapshot, scope, project, ctx, samples)
        .await;
    }
  }

  async fn collect_project(
    &self,
    snapshot: &mut CacheSnapshot,
    scope: &Scope,
    project: &Project,
    ctx: &ScrapeContext,
    samples: &mut Vec<Sample>,
  ) {
    let columns = match snapshot
      .columns(project.id, || self.fetcher.list_columns(project.id, ctx))
      .await
    {
      Ok(result) => result.data,
      Err(e) => {
        error!(
          %scope,
          project_id = project.id,
          project = %project.name,
          error = %e,
          "Unable to get project columns"
        );
        return;
      }
    };

    samples.push(Sample::columns(scope, project, columns.len()));

    for column in &columns {
      match snapshot
        .cards(column.id, || self.fetcher.list_cards(column.id, ctx))
        .await
      {
        Ok(result) => samples.push(Sample::cards(scope, project, column, result.data.len())),
        Err(e) => {
          error!(
            %scope,
            project_id = project.id,
            column_id = column.id,
            column = %column.name,
            error = %e,
            "Unable to get project cards"
          );
        }
      }
    }
  }
}
