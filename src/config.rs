use clap::Parser;
use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;
use crate::github::types::split_repository;
use crate::github::Scope;

const DEFAULT_CACHE_TTL: i64 = 60;
const DEFAULT_API_URL: &str = "https://api.github.com/";
const DEFAULT_REQUEST_TIMEOUT: u64 = 10;
const DEFAULT_LISTEN_ADDRESS: &str = "0.0.0.0:9410";
const DEFAULT_TELEMETRY_PATH: &str = "/metrics";
const DEFAULT_SCRAPE_TIMEOUT: u64 = 30;

/// Environment variables checked for the access token, in order.
const TOKEN_VARS: [&str; 2] = ["GITHUB_PROJECT_EXPORTER_TOKEN", "GITHUB_TOKEN"];

#[derive(Parser, Debug)]
#[command(name = "github-project-exporter")]
#[command(about = "Exporter for GitHub Project")]
#[command(version)]
pub struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/github-project-exporter/config.yaml)
  #[arg(short, long)]
  pub config: Option<PathBuf>,

  /// GitHub access token (falls back to GITHUB_PROJECT_EXPORTER_TOKEN, then GITHUB_TOKEN)
  #[arg(long = "github.token")]
  pub token: Option<String>,

  /// Organization name (repeatable, comma-separated)
  #[arg(long = "github.organization", value_delimiter = ',')]
  pub organizations: Vec<String>,

  /// Repository name as owner/name (repeatable, comma-separated)
  #[arg(long = "github.repository", value_delimiter = ',')]
  pub repositories: Vec<String>,

  /// Cache TTL of GitHub API responses in seconds [default: 60]
  #[arg(long = "github.cache-ttl", allow_negative_numbers = true)]
  pub cache_ttl: Option<i64>,

  /// GitHub API base URL [default: https://api.github.com/]
  #[arg(long = "github.api-url")]
  pub api_url: Option<String>,

  /// Timeout of a single GitHub API request in seconds [default: 10]
  #[arg(long = "github.request-timeout")]
  pub request_timeout: Option<u64>,

  /// Address to listen on for web interface and telemetry [default: 0.0.0.0:9410]
  #[arg(long = "web.listen-address")]
  pub listen_address: Option<String>,

  /// Path under which to expose metrics [default: /metrics]
  #[arg(long = "web.telemetry-path")]
  pub telemetry_path: Option<String>,

  /// Upper bound for one scrape in seconds [default: 30]
  #[arg(long = "web.scrape-timeout")]
  pub scrape_timeout: Option<u64>,

  /// Log level filter, overridden by RUST_LOG
  #[arg(long = "log.level", default_value = "info")]
  pub log_level: String,
}

/// Contents of the optional YAML config file.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub github: GitHubConfig,
  #[serde(default)]
  pub web: WebConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GitHubConfig {
  #[serde(default)]
  pub organizations: Vec<String>,
  #[serde(default)]
  pub repositories: Vec<String>,
  /// Seconds
  pub cache_ttl: Option<i64>,
  pub api_url: Option<String>,
  /// Seconds
  pub request_timeout: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebConfig {
  pub listen_address: Option<String>,
  pub telemetry_path: Option<String>,
  /// Seconds
  pub scrape_timeout: Option<u64>,
}

impl Config {
  /// Load configuration from file, if there is one.
  ///
  /// Search order:
  /// 1. Explicit path if provided (must exist)
  /// 2. ./github-project-exporter.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/github-project-exporter/config.yaml
  pub fn load(explicit_path: Option<&Path>) -> Result<Option<Self>> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    path.map(|p| Self::load_from_path(&p)).transpose()
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("github-project-exporter.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir
        .join("github-project-exporter")
        .join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    let config: Config = serde_yaml::from_str(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))?;

    Ok(config)
  }

  /// Get the GitHub access token.
  ///
  /// Uses the command line value when given, then checks
  /// GITHUB_PROJECT_EXPORTER_TOKEN and GITHUB_TOKEN.
  pub fn get_api_token(flag: Option<&str>) -> Option<String> {
    resolve_token(flag, |name| std::env::var(name).ok())
  }
}

fn resolve_token(flag: Option<&str>, env: impl Fn(&str) -> Option<String>) -> Option<String> {
  flag
    .map(String::from)
    .into_iter()
    .chain(TOKEN_VARS.iter().filter_map(|&name| env(name)))
    .find(|token| !token.is_empty())
}

/// Validated exporter settings.
#[derive(Debug, Clone)]
pub struct Settings {
  pub token: String,
  /// Organizations first, then repositories
  pub scopes: Vec<Scope>,
  pub cache_ttl: chrono::Duration,
  pub api_url: Url,
  pub request_timeout: std::time::Duration,
  pub scrape_timeout: std::time::Duration,
  pub listen_address: SocketAddr,
  pub telemetry_path: String,
}

impl Settings {
  /// Merge command line arguments over file configuration and validate the
  /// result.
  pub fn from_sources(
    args: &Args,
    file: Config,
    token: Option<String>,
  ) -> std::result::Result<Self, ConfigError> {
    let token = token
      .filter(|t| !t.is_empty())
      .ok_or(ConfigError::MissingToken)?;

    let organizations = if args.organizations.is_empty() {
      file.github.organizations
    } else {
      args.organizations.clone()
    };
    let repositories = if args.repositories.is_empty() {
      file.github.repositories
    } else {
      args.repositories.clone()
    };

    if organizations.is_empty() && repositories.is_empty() {
      return Err(ConfigError::NoScopes);
    }

    for repo in &repositories {
      split_repository(repo).map_err(|_| ConfigError::InvalidRepository(repo.clone()))?;
    }

    let scopes = dedup_first(organizations)
      .into_iter()
      .map(Scope::Organization)
      .chain(dedup_first(repositories).into_iter().map(Scope::Repository))
      .collect();

    let ttl = args
      .cache_ttl
      .or(file.github.cache_ttl)
      .unwrap_or(DEFAULT_CACHE_TTL);
    if ttl < 0 {
      return Err(ConfigError::NegativeTtl(ttl));
    }
    let cache_ttl = chrono::Duration::try_seconds(ttl).unwrap_or(chrono::Duration::MAX);

    let api_url = parse_api_url(
      args
        .api_url
        .as_deref()
        .or(file.github.api_url.as_deref())
        .unwrap_or(DEFAULT_API_URL),
    )?;

    let listen = args
      .listen_address
      .as_deref()
      .or(file.web.listen_address.as_deref())
      .unwrap_or(DEFAULT_LISTEN_ADDRESS);
    let listen_address = listen
      .parse::<SocketAddr>()
      .map_err(|source| ConfigError::InvalidListenAddress {
        address: listen.to_string(),
        source,
      })?;

    let telemetry_path = args
      .telemetry_path
      .clone()
      .or(file.web.telemetry_path)
      .unwrap_or_else(|| DEFAULT_TELEMETRY_PATH.to_string());
    if !telemetry_path.starts_with('/') || telemetry_path == "/" {
      return Err(ConfigError::InvalidTelemetryPath(telemetry_path));
    }

    let seconds = |cli: Option<u64>, file: Option<u64>, default: u64| {
      std::time::Duration::from_secs(cli.or(file).unwrap_or(default))
    };

    Ok(Self {
      token,
      scopes,
      cache_ttl,
      api_url,
      request_timeout: seconds(
        args.request_timeout,
        file.github.request_timeout,
        DEFAULT_REQUEST_TIMEOUT,
      ),
      scrape_timeout: seconds(
        args.scrape_timeout,
        file.web.scrape_timeout,
        DEFAULT_SCRAPE_TIMEOUT,
      ),
      listen_address,
      telemetry_path,
    })
  }
}

/// Drop repeated names, keeping the first occurrence of each.
fn dedup_first(names: Vec<String>) -> Vec<String> {
  let mut seen = HashSet::new();
  names
    .into_iter()
    .filter(|name| seen.insert(name.clone()))
    .collect()
}

/// Parse the API base URL, keeping a trailing slash so endpoint paths are
/// appended below it.
fn parse_api_url(raw: &str) -> std::result::Result<Url, ConfigError> {
  let invalid = |reason: String| ConfigError::InvalidApiUrl {
    url: raw.to_string(),
    reason,
  };

  let mut url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
  if !matches!(url.scheme(), "http" | "https") {
    return Err(invalid(format!("unsupported scheme {}", url.scheme())));
  }
  if !url.path().ends_with('/') {
    let path = format!("{}/", url.path());
    url.set_path(&path);
  }
  Ok(url)
}
