//! Error types for configuration and upstream fetching.

use thiserror::Error;

/// Fatal errors raised while building the exporter. The process must not
/// start serving scrapes when one of these is returned.
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("GitHub access token is missing. Pass --github.token or set GITHUB_TOKEN")]
  MissingToken,

  #[error("at least one organization name or repository name is required")]
  NoScopes,

  #[error("invalid repository name: {0} (expected owner/name)")]
  InvalidRepository(String),

  #[error("invalid cache TTL: {0} (must be zero or positive)")]
  NegativeTtl(i64),

  #[error("invalid GitHub API URL {url}: {reason}")]
  InvalidApiUrl { url: String, reason: String },

  #[error("invalid listen address {address}: {source}")]
  InvalidListenAddress {
    address: String,
    #[source]
    source: std::net::AddrParseError,
  },

  #[error("invalid telemetry path: {0} (must start with / and not be /)")]
  InvalidTelemetryPath(String),

  #[error("failed to build HTTP client: {0}")]
  HttpClient(#[source] reqwest::Error),
}

/// Recoverable errors raised while fetching a level of the project hierarchy.
///
/// These are logged and the failing subtree is skipped; they never reach the
/// scrape response.
#[derive(Debug, Error)]
pub enum FetchError {
  #[error("invalid scope: {0}")]
  InvalidScope(String),

  #[error("request to {url} failed: {source}")]
  Http {
    url: String,
    #[source]
    source: reqwest::Error,
  },

  #[error("GitHub API returned {status} for {url}: {body}")]
  Status {
    url: String,
    status: u16,
    body: String,
  },

  #[error("failed to decode response from {url}: {source}")]
  Decode {
    url: String,
    #[source]
    source: serde_json::Error,
  },

  #[error("scrape deadline exceeded")]
  Timeout,

  #[error("pagination cursor did not advance (page {current}, next {next})")]
  Pagination { current: u32, next: u32 },
}
