//! "Fetch all" access to the project hierarchy.
//!
//! The fetcher follows page cursors so callers only ever see every item for
//! a key, or an error. A failure on any page discards the pages already
//! collected for that call.

use std::future::Future;
use std::sync::Arc;

use tokio::time::Instant;

use crate::error::FetchError;

use super::client::ProjectsApi;
use super::types::{split_repository, Card, Column, ListOptions, Page, Project, Scope};

/// Per-scrape request context.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScrapeContext {
  /// Instant after which no upstream request may still be pending
  pub deadline: Option<Instant>,
}

impl ScrapeContext {
  pub fn with_deadline(deadline: Instant) -> Self {
    Self {
      deadline: Some(deadline),
    }
  }

  async fn bounded<T, Fut>(&self, fut: Fut) -> Result<T, FetchError>
  where
    Fut: Future<Output = Result<T, FetchError>>,
  {
    match self.deadline {
      Some(deadline) => tokio::time::timeout_at(deadline, fut)
        .await
        .map_err(|_| FetchError::Timeout)?,
      None => fut.await,
    }
  }
}

/// Stateless paginating wrapper around a [`ProjectsApi`].
#[derive(Clone)]
pub struct HierarchyFetcher {
  api: Arc<dyn ProjectsApi>,
}

impl HierarchyFetcher {
  pub fn new(api: Arc<dyn ProjectsApi>) -> Self {
    Self { api }
  }

  /// List every open project of an organization or repository.
  pub async fn list_projects(
    &self,
    scope: &Scope,
    ctx: &ScrapeContext,
  ) -> Result<Vec<Project>, FetchError> {
    match scope {
      Scope::Organization(org) => {
        if org.is_empty() {
          return Err(FetchError::InvalidScope(
            "invalid organization name: empty".to_string(),
          ));
        }
        collect_pages(ctx, |opts| self.api.organization_projects(org, opts)).await
      }
      Scope::Repository(slug) => {
        let (owner, repo) = split_repository(slug)?;
        collect_pages(ctx, |opts| self.api.repository_projects(owner, repo, opts)).await
      }
    }
  }

  /// List every column of a project.
  pub async fn list_columns(
    &self,
    project_id: u64,
    ctx: &ScrapeContext,
  ) -> Result<Vec<Column>, FetchError> {
    collect_pages(ctx, |opts| self.api.project_columns(project_id, opts)).await
  }

  /// List every card of a column.
  pub async fn list_cards(
    &self,
    column_id: u64,
    ctx: &ScrapeContext,
  ) -> Result<Vec<Card>, FetchError> {
    collect_pages(ctx, |opts| self.api.column_cards(column_id, opts)).await
  }
}

/// Request pages starting at page 1 until the cursor runs out.
async fn collect_pages<T, F, Fut>(ctx: &ScrapeContext, mut fetch_page: F) -> Result<Vec<T>, FetchError>
where
  F: FnMut(ListOptions) -> Fut,
  Fut: Future<Output = Result<Page<T>, FetchError>>,
{
  let mut all_items = Vec::new();
  let mut opts = ListOptions::first();

  loop {
    let page = ctx.bounded(fetch_page(opts)).await?;
    all_items.extend(page.items);

    match page.next_page {
      None | Some(0) => break,
      Some(next) if next <= opts.page => {
        return Err(FetchError::Pagination {
          current: opts.page,
          next,
        });
      }
      Some(next) => opts.page = next,
    }
  }

  Ok(all_items)
}
