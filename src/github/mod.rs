pub mod api_types;
pub mod client;
#[cfg(test)]
pub mod fake;
pub mod fetcher;
pub mod types;

pub use client::GitHubClient;
pub use fetcher::{HierarchyFetcher, ScrapeContext};
pub use types::{Card, Column, Project, Scope};
