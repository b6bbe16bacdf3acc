use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, LINK};
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{ConfigError, FetchError};
use crate::github::api_types::{next_page_from_link, ApiCard, ApiColumn, ApiProject};
use crate::github::types::{Card, Column, ListOptions, Page, Project};

/// Media type that enables the (classic) projects API.
const PROJECTS_PREVIEW: &str = "application/vnd.github.inertia-preview+json";

/// Page-level access to the GitHub Projects API.
///
/// Each call returns exactly one page; following the cursor is the fetcher's
/// job.
#[async_trait]
pub trait ProjectsApi: Send + Sync {
  async fn organization_projects(
    &self,
    org: &str,
    opts: ListOptions,
  ) -> Result<Page<Project>, FetchError>;

  async fn repository_projects(
    &self,
    owner: &str,
    repo: &str,
    opts: ListOptions,
  ) -> Result<Page<Project>, FetchError>;

  async fn project_columns(
    &self,
    project_id: u64,
    opts: ListOptions,
  ) -> Result<Page<Column>, FetchError>;

  async fn column_cards(&self, column_id: u64, opts: ListOptions)
    -> Result<Page<Card>, FetchError>;
}

/// GitHub REST API client
#[derive(Clone)]
pub struct GitHubClient {
  client: reqwest::Client,
  base_url: Url,
  token: String,
}

impl GitHubClient {
  pub fn new(token: &str, base_url: Url, request_timeout: Duration) -> Result<Self, ConfigError> {
    if token.is_empty() {
      return Err(ConfigError::MissingToken);
    }
    if base_url.cannot_be_a_base() {
      return Err(ConfigError::InvalidApiUrl {
        url: base_url.to_string(),
        reason: "not a base URL".to_string(),
      });
    }

    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(PROJECTS_PREVIEW));

    let client = reqwest::Client::builder()
      .default_headers(headers)
      .user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
      ))
      .timeout(request_timeout)
      .build()
      .map_err(ConfigError::HttpClient)?;

    Ok(Self {
      client,
      base_url,
      token: token.to_string(),
    })
  }

  /// Build an endpoint URL from path segments and list options.
  fn endpoint(&self, segments: &[&str], open_only: bool, opts: ListOptions) -> Url {
    let mut url = self.base_url.clone();
    if let Ok(mut path) = url.path_segments_mut() {
      path.pop_if_empty().extend(segments);
    }
    {
      let mut query = url.query_pairs_mut();
      if open_only {
        query.append_pair("state", "open");
      }
      query
        .append_pair("per_page", &opts.per_page.to_string())
        .append_pair("page", &opts.page.to_string());
    }
    url
  }

  /// Fetch a single page and convert its items into domain types.
  async fn get_page<A, T>(&self, url: Url) -> Result<Page<T>, FetchError>
  where
    A: DeserializeOwned,
    T: From<A>,
  {
    tracing::trace!(%url, "GET");

    let resp = self
      .client
      .get(url.clone())
      .bearer_auth(&self.token)
      .send()
      .await
      .map_err(|source| FetchError::Http {
        url: url.to_string(),
        source,
      })?;

    let status = resp.status();
    let next_page = resp
      .headers()
      .get(LINK)
      .and_then(|v| v.to_str().ok())
      .and_then(next_page_from_link);

    let body = resp.text().await.map_err(|source| FetchError::Http {
      url: url.to_string(),
      source,
    })?;

    if !status.is_success() {
      return Err(FetchError::Status {
        url: url.to_string(),
        status: status.as_u16(),
        body,
      });
    }

    let items: Vec<A> = serde_json::from_str(&body).map_err(|source| FetchError::Decode {
      url: url.to_string(),
      source,
    })?;

    Ok(Page {
      items: items.into_iter().map(T::from).collect(),
      next_page,
    })
  }
}

#[async_trait]
impl ProjectsApi for GitHubClient {
  async fn organization_projects(
    &self,
    org: &str,
    opts: ListOptions,
  ) -> Result<Page<Project>, FetchError> {
    let url = self.endpoint(&["orgs", org, "projects"], true, opts);
    self.get_page::<ApiProject, _>(url).await
  }

  async fn repository_projects(
    &self,
    owner: &str,
    repo: &str,
    opts: ListOptions,
  ) -> Result<Page<Project>, FetchError> {
    let url = self.endpoint(&["repos", owner, repo, "projects"], true, opts);
    self.get_page::<ApiProject, _>(url).await
  }

  async fn project_columns(
    &self,
    project_id: u64,
    opts: ListOptions,
  ) -> Result<Page<Column>, FetchError> {
    let id = project_id.to_string();
    let url = self.endpoint(&["projects", &id, "columns"], false, opts);
    self.get_page::<ApiColumn, _>(url).await
  }

  async fn column_cards(
    &self,
    column_id: u64,
    opts: ListOptions,
  ) -> Result<Page<Card>, FetchError> {
    let id = column_id.to_string();
    let url = self.endpoint(&["projects", "columns", &id, "cards"], false, opts);
    self.get_page::<ApiCard, _>(url).await
  }
}
