mod cache;
mod collector;
mod config;
mod error;
mod github;
mod metrics;
mod server;

use clap::Parser;
use color_eyre::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cache::ScrapeCache;
use crate::collector::Collector;
use crate::config::{Args, Config, Settings};
use crate::github::{GitHubClient, HierarchyFetcher};

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .init();

  // Load configuration; the file is optional, command line flags win
  let file = Config::load(args.config.as_deref())?.unwrap_or_default();
  let token = Config::get_api_token(args.token.as_deref());
  let settings = Settings::from_sources(&args, file, token)?;

  let client = GitHubClient::new(
    &settings.token,
    settings.api_url.clone(),
    settings.request_timeout,
  )?;
  let collector = Collector::new(
    HierarchyFetcher::new(Arc::new(client)),
    ScrapeCache::new(settings.cache_ttl),
    settings.scopes.clone(),
  );

  metrics::register_process_collector()?;

  info!(
    version = env!("CARGO_PKG_VERSION"),
    scopes = collector.scopes().len(),
    cache_ttl_seconds = settings.cache_ttl.num_seconds(),
    api_url = %settings.api_url,
    "Starting github-project-exporter"
  );

  let app = server::router(server::AppState::new(collector, &settings));
  server::serve(settings.listen_address, app).await
}
