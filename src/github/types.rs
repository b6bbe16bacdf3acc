use std::fmt;

use crate::error::FetchError;

/// Number of items requested per page from every list endpoint.
pub const PER_PAGE: u32 = 100;

/// A configured collection scope
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
  /// Organization name
  Organization(String),
  /// Repository slug as configured, `owner/name`
  Repository(String),
}

impl Scope {
  /// Label name used for this scope's metrics.
  pub fn label_name(&self) -> &'static str {
    match self {
      Scope::Organization(_) => "organization",
      Scope::Repository(_) => "repository",
    }
  }

  /// Label value used for this scope's metrics.
  pub fn label_value(&self) -> &str {
    match self {
      Scope::Organization(org) => org,
      Scope::Repository(slug) => slug,
    }
  }
}

impl fmt::Display for Scope {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} {}", self.label_name(), self.label_value())
  }
}

/// Split a repository slug into `(owner, name)`.
///
/// Exactly one `/` with non-empty parts on both sides is accepted.
pub fn split_repository(slug: &str) -> Result<(&str, &str), FetchError> {
  let mut parts = slug.split('/');
  match (parts.next(), parts.next(), parts.next()) {
    (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty() => Ok((owner, name)),
    _ => Err(FetchError::InvalidScope(format!(
      "invalid repository name: {}",
      slug
    ))),
  }
}

/// Open project owned by an organization or repository
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
  pub id: u64,
  /// Display number, unique within the owning scope
  pub number: u64,
  pub name: String,
}

/// Project column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
  pub id: u64,
  pub name: String,
}

/// Project card. Cards are only counted, so nothing of them is kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Card;

/// Page selection for a list request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListOptions {
  pub page: u32,
  pub per_page: u32,
}

impl ListOptions {
  pub fn first() -> Self {
    Self {
      page: 1,
      per_page: PER_PAGE,
    }
  }
}

/// One page of a list response
#[derive(Debug, Clone)]
pub struct Page<T> {
  pub items: Vec<T>,
  /// Next page number, `None` on the last page
  pub next_page: Option<u32>,
}
