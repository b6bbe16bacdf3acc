//! HTTP surface: the landing page and the scrape endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use color_eyre::Result;
use tokio::time::Instant;
use tracing::{error, info};

use crate::collector::Collector;
use crate::config::Settings;
use crate::github::ScrapeContext;
use crate::metrics;

/// Header Prometheus sends with the scrape timeout it will wait for.
const SCRAPE_TIMEOUT_HEADER: &str = "x-prometheus-scrape-timeout-seconds";

#[derive(Clone)]
pub struct AppState {
  collector: Arc<Collector>,
  telemetry_path: Arc<str>,
  /// Upper bound for a scrape, whatever the scraper asks for
  scrape_timeout: Duration,
}

impl AppState {
  pub fn new(collector: Collector, settings: &Settings) -> Self {
    Self {
      collector: Arc::new(collector),
      telemetry_path: Arc::from(settings.telemetry_path.as_str()),
      scrape_timeout: settings.scrape_timeout,
    }
  }
}

pub fn router(state: AppState) -> Router {
  let telemetry_path = state.telemetry_path.clone();
  Router::new()
    .route("/", get(index))
    .route(&telemetry_path, get(scrape))
    .with_state(state)
}

async fn index(State(state): State<AppState>) -> Html<String> {
  Html(format!(
    "<html><head><title>GitHub Project Exporter</title></head><body>\n\
     <h1>GitHub Project Exporter</h1>\n\
     <p><a href=\"{}\">Metrics</a></p>\n\
     </body></html>\n",
    state.telemetry_path
  ))
}

/// Run a scrape and render it. Upstream failures only shrink the output;
/// the response is a 500 only when encoding fails.
async fn scrape(State(state): State<AppState>, headers: HeaderMap) -> Response {
  let budget = scrape_budget(&headers, state.scrape_timeout);
  // A budget too large to represent as an instant means no deadline.
  let ctx = Instant::now()
    .checked_add(budget)
    .map_or_else(ScrapeContext::default, ScrapeContext::with_deadline);

  let samples = state.collector.scrape(&ctx).await;

  match metrics::encode(&samples) {
    Ok(body) => (
      StatusCode::OK,
      [(header::CONTENT_TYPE, metrics::CONTENT_TYPE)],
      body,
    )
      .into_response(),
    Err(e) => {
      error!(error = %e, "Failed to encode metrics");
      (
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("Failed to encode metrics: {}", e),
      )
        .into_response()
    }
  }
}

/// Time a scrape may take: the scraper's own timeout when it sends one,
/// capped by the configured maximum.
fn scrape_budget(headers: &HeaderMap, max: Duration) -> Duration {
  headers
    .get(SCRAPE_TIMEOUT_HEADER)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.trim().parse::<f64>().ok())
    .filter(|secs| *secs > 0.0)
    .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
    .map_or(max, |budget| budget.min(max))
}

/// Serve `app` until Ctrl-C or SIGTERM.
pub async fn serve(listen_address: SocketAddr, app: Router) -> Result<()> {
  let listener = tokio::net::TcpListener::bind(listen_address).await?;
  info!(%listen_address, "Listening");

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await?;

  info!("Shut down");
  Ok(())
}

async fn shutdown_signal() {
  let ctrl_c = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      error!(error = %e, "Failed to listen for Ctrl-C");
      std::future::pending::<()>().await;
    }
  };

  #[cfg(unix)]
  let terminate = async {
    match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
      Ok(mut signal) => {
        signal.recv().await;
      }
      Err(e) => {
        error!(error = %e, "Failed to listen for SIGTERM");
        std::future::pending::<()>().await;
      }
    }
  };

  #[cfg(not(unix))]
  let terminate = std::future::pending::<()>();

  tokio::select! {
    _ = ctrl_c => {},
    _ = terminate => {},
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::cache::ScrapeCache;
  use crate::github::fake::FakeApi;
  use crate::config::{Args, Config};
  use crate::github::{Column, HierarchyFetcher, Project, Scope};
  use axum::body::Body;
  use axum::http::Request;
  use clap::Parser;
  use tower::ServiceExt;

  fn app(api: Arc<FakeApi>) -> Router {
    let collector = Collector::new(
      HierarchyFetcher::new(api),
      ScrapeCache::new(chrono::Duration::seconds(60)),
      vec![Scope::Organization("acme".into())],
    );
    router(AppState {
      collector: Arc::new(collector),
      telemetry_path: Arc::from("/metrics"),
      scrape_timeout: Duration::from_secs(30),
    })
  }

  /// App wired the way `main` does it, from command line arguments.
  fn app_from_args(api: Arc<FakeApi>, extra: &[&str]) -> Router {
    let args = Args::parse_from(std::iter::once("github-project-exporter").chain(extra.iter().copied()));
    let settings = Settings::from_sources(&args, Config::default(), Some("token".into())).unwrap();
    let collector = Collector::new(
      HierarchyFetcher::new(api),
      ScrapeCache::new(settings.cache_ttl),
      settings.scopes.clone(),
    );
    router(AppState::new(collector, &settings))
  }

  async fn get_body(app: Router, uri: &str) -> (StatusCode, String) {
    get_with_timeout(app, uri, None).await
  }

  async fn get_with_timeout(app: Router, uri: &str, timeout: Option<&str>) -> (StatusCode, String) {
    let mut req = Request::builder().uri(uri);
    if let Some(secs) = timeout {
      req = req.header(SCRAPE_TIMEOUT_HEADER, secs);
    }
    let resp = app
      .oneshot(req.body(Body::empty()).unwrap())
      .await
      .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    (status, String::from_utf8(bytes.to_vec()).unwrap())
  }

  #[tokio::test]
  async fn metrics_endpoint_renders_scrape() {
    let api = Arc::new(FakeApi::default());
    api.add_org("acme", Vec::new());

    let (status, body) = get_body(app(api), "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("github_organization_projects{organization=\"acme\"} 0"));
  }

  #[tokio::test]
  async fn metrics_endpoint_succeeds_when_upstream_fails() {
    let api = Arc::new(FakeApi::default());

    let (status, body) = get_body(app(api), "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert!(!body.contains("github_organization_projects{"));
  }

  fn sample_lines<'a>(body: &'a str, name: &str, label: &str) -> Vec<&'a str> {
    body
      .lines()
      .filter(|line| line.starts_with(&format!("{}{{", name)) && line.contains(label))
      .collect()
  }

  #[tokio::test]
  async fn repeated_scope_is_counted_once() {
    let api = Arc::new(FakeApi::default());
    api.add_org("acme", FakeApi::numbered_projects(3));

    let app = app_from_args(api, &["--github.organization", "acme,acme"]);
    let (status, body) = get_body(app, "/metrics").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
      sample_lines(&body, "github_organization_projects", "organization=\"acme\""),
      vec!["github_organization_projects{organization=\"acme\"} 3"]
    );
  }

  #[tokio::test]
  async fn huge_scrape_timeout_scrapes_without_deadline() {
    let api = Arc::new(FakeApi::default());
    api.add_org("acme", Vec::new());
    let app = app_from_args(
      api,
      &["--github.organization", "acme", "--web.scrape-timeout", "18446744073709551615"],
    );

    for timeout in [None, Some("10"), Some("1e300")] {
      let (status, body) = get_with_timeout(app.clone(), "/metrics", timeout).await;
      assert_eq!(status, StatusCode::OK, "{timeout:?}");
      assert!(body.contains("github_organization_projects{organization=\"acme\"} 0"));
    }
  }

  #[tokio::test(start_paused = true)]
  async fn header_deadline_cuts_off_slow_subtree() {
    let api = Arc::new(FakeApi::default());
    api.add_org(
      "acme",
      vec![Project {
        id: 1,
        number: 7,
        name: "Roadmap".into(),
      }],
    );
    api.add_columns(
      1,
      vec![
        Column {
          id: 10,
          name: "Todo".into(),
        },
        Column {
          id: 20,
          name: "Done".into(),
        },
      ],
    );
    api.add_cards(10, 2);
    api.add_cards(20, 4);
    api.delay("cards:20", Duration::from_secs(60));

    let start = Instant::now();
    let (status, body) = get_with_timeout(app(api.clone()), "/metrics", Some("5")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(start.elapsed() < Duration::from_secs(60));
    assert_eq!(api.calls("cards:20"), 1);
    assert!(body.contains("github_organization_projects{organization=\"acme\"} 1"));

    let todo = sample_lines(&body, "github_organization_project_cards", "column=\"Todo\"");
    assert_eq!(todo.len(), 1);
    assert!(todo[0].ends_with(" 2"));
    assert!(sample_lines(&body, "github_organization_project_cards", "column=\"Done\"").is_empty());
  }

  #[tokio::test]
  async fn index_links_to_metrics() {
    let (status, body) = get_body(app(Arc::new(FakeApi::default())), "/").await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.contains("<a href=\"/metrics\">Metrics</a>"));
  }

  #[test]
  fn scrape_budget_follows_header_up_to_maximum() {
    let max = Duration::from_secs(30);
    let mut headers = HeaderMap::new();
    assert_eq!(scrape_budget(&headers, max), max);

    headers.insert(SCRAPE_TIMEOUT_HEADER, "9.5".parse().unwrap());
    assert_eq!(scrape_budget(&headers, max), Duration::from_millis(9500));

    headers.insert(SCRAPE_TIMEOUT_HEADER, "120".parse().unwrap());
    assert_eq!(scrape_budget(&headers, max), max);

    headers.insert(SCRAPE_TIMEOUT_HEADER, "-1".parse().unwrap());
    assert_eq!(scrape_budget(&headers, max), max);
  }

  #[test]
  fn scrape_budget_handles_unrepresentable_values() {
    let max = Duration::from_secs(u64::MAX);
    let mut headers = HeaderMap::new();

    headers.insert(SCRAPE_TIMEOUT_HEADER, "1e300".parse().unwrap());
    assert_eq!(scrape_budget(&headers, max), max);

    headers.insert(SCRAPE_TIMEOUT_HEADER, "NaN".parse().unwrap());
    assert_eq!(scrape_budget(&headers, max), max);

    headers.insert(SCRAPE_TIMEOUT_HEADER, "2.5".parse().unwrap());
    assert_eq!(scrape_budget(&headers, max), Duration::from_millis(2500));
  }
}
