//! Scripted in-memory [`ProjectsApi`] for tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::FetchError;

use super::client::ProjectsApi;
use super::types::{Card, Column, ListOptions, Page, Project};

#[derive(Default)]
struct State {
  orgs: HashMap<String, Vec<Project>>,
  repos: HashMap<String, Vec<Project>>,
  columns: HashMap<u64, Vec<Column>>,
  cards: HashMap<u64, Vec<Card>>,
  /// key -> page that always fails
  failing_pages: HashMap<String, u32>,
  /// keys whose next request fails once
  fail_next: HashSet<String>,
  /// key -> time every request takes
  delays: HashMap<String, Duration>,
  calls: HashMap<String, usize>,
  served: HashMap<String, Vec<usize>>,
}

/// Fake GitHub backend keyed by `org:<name>`, `repo:<slug>`,
/// `columns:<project id>` and `cards:<column id>`.
#[derive(Default)]
pub struct FakeApi {
  state: Mutex<State>,
}

impl FakeApi {
  pub fn numbered_projects(n: u64) -> Vec<Project> {
    (1..=n)
      .map(|i| Project {
        id: i,
        number: i,
        name: format!("project-{}", i),
      })
      .collect()
  }

  pub fn numbered_columns(n: u64) -> Vec<Column> {
    (1..=n)
      .map(|i| Column {
        id: i,
        name: format!("column-{}", i),
      })
      .collect()
  }

  pub fn add_org(&self, org: &str, projects: Vec<Project>) {
    self.state.lock().unwrap().orgs.insert(org.to_string(), projects);
  }

  pub fn add_repo(&self, slug: &str, projects: Vec<Project>) {
    self.state.lock().unwrap().repos.insert(slug.to_string(), projects);
  }

  pub fn add_columns(&self, project_id: u64, columns: Vec<Column>) {
    self.state.lock().unwrap().columns.insert(project_id, columns);
  }

  pub fn add_cards(&self, column_id: u64, count: u64) {
    let cards = (0..count).map(|_| Card).collect();
    self.state.lock().unwrap().cards.insert(column_id, cards);
  }

  /// Every request for `page` of `key` fails with a 502.
  pub fn fail_page(&self, key: &str, page: u32) {
    self
      .state
      .lock()
      .unwrap()
      .failing_pages
      .insert(key.to_string(), page);
  }

  /// The next request for `key` fails with a 502, later ones succeed.
  pub fn fail_next(&self, key: &str) {
    self.state.lock().unwrap().fail_next.insert(key.to_string());
  }

  /// Every request for `key` takes `delay` before it is answered.
  pub fn delay(&self, key: &str, delay: Duration) {
    self.state.lock().unwrap().delays.insert(key.to_string(), delay);
  }

  pub fn clear_failures(&self, key: &str) {
    let mut state = self.state.lock().unwrap();
    state.failing_pages.remove(key);
    state.fail_next.remove(key);
  }

  /// Page requests issued for `key`, failed ones included.
  pub fn calls(&self, key: &str) -> usize {
    self.state.lock().unwrap().calls.get(key).copied().unwrap_or(0)
  }

  pub fn total_calls(&self) -> usize {
    self.state.lock().unwrap().calls.values().sum()
  }

  /// Item counts of the pages successfully served for `key`.
  pub fn page_sizes(&self, key: &str) -> Vec<usize> {
    self
      .state
      .lock()
      .unwrap()
      .served
      .get(key)
      .cloned()
      .unwrap_or_default()
  }

  /// Count a request for `key` and hold it for its configured delay.
  async fn begin(&self, key: &str) {
    let delay = {
      let mut state = self.state.lock().unwrap();
      *state.calls.entry(key.to_string()).or_default() += 1;
      state.delays.get(key).copied()
    };
    if let Some(delay) = delay {
      tokio::time::sleep(delay).await;
    }
  }

  fn serve<T: Clone>(
    &self,
    key: String,
    opts: ListOptions,
    lookup: impl FnOnce(&State) -> Option<Vec<T>>,
  ) -> Result<Page<T>, FetchError> {
    let mut state = self.state.lock().unwrap();

    let injected = state.fail_next.remove(&key) || state.failing_pages.get(&key) == Some(&opts.page);
    if injected {
      return Err(FetchError::Status {
        url: key,
        status: 502,
        body: "Bad Gateway".to_string(),
      });
    }

    let items = lookup(&state).ok_or_else(|| FetchError::Status {
      url: key.clone(),
      status: 404,
      body: "Not Found".to_string(),
    })?;

    let per_page = opts.per_page as usize;
    let start = (opts.page as usize - 1) * per_page;
    let end = (start + per_page).min(items.len());
    let page_items = items.get(start..end).map(<[T]>::to_vec).unwrap_or_default();
    let next_page = (end < items.len()).then_some(opts.page + 1);

    state.served.entry(key).or_default().push(page_items.len());

    Ok(Page {
      items: page_items,
      next_page,
    })
  }
}

#[async_trait]
impl ProjectsApi for FakeApi {
  async fn organization_projects(
    &self,
    org: &str,
    opts: ListOptions,
  ) -> Result<Page<Project>, FetchError> {
    let key = format!("org:{}", org);
    self.begin(&key).await;
    self.serve(key, opts, |s| s.orgs.get(org).cloned())
  }

  async fn repository_projects(
    &self,
    owner: &str,
    repo: &str,
    opts: ListOptions,
  ) -> Result<Page<Project>, FetchError> {
    let slug = format!("{}/{}", owner, repo);
    let key = format!("repo:{}", slug);
    self.begin(&key).await;
    self.serve(key, opts, |s| s.repos.get(&slug).cloned())
  }

  async fn project_columns(
    &self,
    project_id: u64,
    opts: ListOptions,
  ) -> Result<Page<Column>, FetchError> {
    let key = format!("columns:{}", project_id);
    self.begin(&key).await;
    self.serve(key, opts, |s| {
      s.columns.get(&project_id).cloned()
    })
  }

  async fn column_cards(
    &self,
    column_id: u64,
    opts: ListOptions,
  ) -> Result<Page<Card>, FetchError> {
    let key = format!("cards:{}", column_id);
    self.begin(&key).await;
    self.serve(key, opts, |s| {
      s.cards.get(&column_id).cloned()
    })
  }
}
