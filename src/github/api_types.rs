//! Serde-deserializable types matching GitHub Projects API responses.
//!
//! These types are separate from domain types to allow clean deserialization
//! while keeping domain types focused on what the exporter counts.

use serde::Deserialize;
use url::Url;

use super::types::{Card, Column, Project};

#[derive(Debug, Deserialize)]
pub struct ApiProject {
  pub id: u64,
  pub number: u64,
  #[serde(default)]
  pub name: String,
}

impl From<ApiProject> for Project {
  fn from(p: ApiProject) -> Self {
    Project {
      id: p.id,
      number: p.number,
      name: p.name,
    }
  }
}

#[derive(Debug, Deserialize)]
pub struct ApiColumn {
  pub id: u64,
  #[serde(default)]
  pub name: String,
}

impl From<ApiColumn> for Column {
  fn from(c: ApiColumn) -> Self {
    Column {
      id: c.id,
      name: c.name,
    }
  }
}

/// Card fields are ignored; each decoded object is one card.
#[derive(Debug, Deserialize)]
pub struct ApiCard {}

impl From<ApiCard> for Card {
  fn from(_: ApiCard) -> Self {
    Card
  }
}

// ============================================================================
// Pagination
// ============================================================================

/// Extract the `page` query parameter of the `rel="next"` entry of a `Link`
/// header.
///
/// Example header:
/// `<https://api.github.com/orgs/acme/projects?page=2>; rel="next", <...?page=5>; rel="last"`
pub fn next_page_from_link(header: &str) -> Option<u32> {
  header.split(',').find_map(|entry| {
    let mut parts = entry.split(';');
    let target = parts.next()?.trim();
    let is_next = parts.any(|param| {
      let param = param.trim();
      param == "rel=\"next\"" || param == "rel=next"
    });
    if !is_next {
      return None;
    }

    let target = target.strip_prefix('<')?.strip_suffix('>')?;
    let url = Url::parse(target).ok()?;
    url
      .query_pairs()
      .find(|(k, _)| k == "page")
      .and_then(|(_, v)| v.parse::<u32>().ok())
      .filter(|page| *page > 0)
  })
}
