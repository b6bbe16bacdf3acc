//! Prometheus metric definitions and text exposition.
//!
//! Descriptors are built once per process. Every scrape renders its samples
//! into a fresh registry, so overlapping scrapes never share gauge state.

use std::collections::HashMap;

use once_cell::sync::Lazy;
use prometheus::{GaugeVec, Opts, Registry, TextEncoder};

use crate::github::{Column, Project, Scope};

/// Prefix of every exported metric name.
pub const NAMESPACE: &str = "github";

/// Content type of the Prometheus text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Exported metric families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
  OrganizationProjects,
  OrganizationProjectColumns,
  OrganizationProjectCards,
  RepositoryProjects,
  RepositoryProjectColumns,
  RepositoryProjectCards,
}

impl Family {
  pub const ALL: [Family; 6] = [
    Family::OrganizationProjects,
    Family::OrganizationProjectColumns,
    Family::OrganizationProjectCards,
    Family::RepositoryProjects,
    Family::RepositoryProjectColumns,
    Family::RepositoryProjectCards,
  ];

  /// Metric name without the namespace prefix.
  pub fn name(self) -> &'static str {
    match self {
      Family::OrganizationProjects => "organization_projects",
      Family::OrganizationProjectColumns => "organization_project_columns",
      Family::OrganizationProjectCards => "organization_project_cards",
      Family::RepositoryProjects => "repository_projects",
      Family::RepositoryProjectColumns => "repository_project_columns",
      Family::RepositoryProjectCards => "repository_project_cards",
    }
  }

  fn help(self) -> &'static str {
    match self {
      Family::OrganizationProjects => "How many projects are in the organization.",
      Family::OrganizationProjectColumns => "How many columns are in the organization project.",
      Family::OrganizationProjectCards => "How many cards are in the organization project.",
      Family::RepositoryProjects => "How many projects are in the repository.",
      Family::RepositoryProjectColumns => "How many columns are in the repository project.",
      Family::RepositoryProjectCards => "How many cards are in the repository project.",
    }
  }

  pub fn label_names(self) -> &'static [&'static str] {
    match self {
      Family::OrganizationProjects => &["organization"],
      Family::OrganizationProjectColumns => &["organization", "project"],
      Family::OrganizationProjectCards => &["organization", "project", "column"],
      Family::RepositoryProjects => &["repository"],
      Family::RepositoryProjectColumns => &["repository", "project"],
      Family::RepositoryProjectCards => &["repository", "project", "column"],
    }
  }
}

/// Name, help and label shape of one metric family.
pub struct MetricDescriptor {
  pub family: Family,
  pub opts: Opts,
  pub label_names: &'static [&'static str],
}

/// Process-wide metric descriptors.
pub static DESCRIPTORS: Lazy<Vec<MetricDescriptor>> = Lazy::new(|| {
  Family::ALL
    .iter()
    .map(|&family| MetricDescriptor {
      family,
      opts: Opts::new(family.name(), family.help()).namespace(NAMESPACE),
      label_names: family.label_names(),
    })
    .collect()
});

/// One gauge value produced by a scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
  pub family: Family,
  pub labels: Vec<String>,
  pub value: f64,
}

impl Sample {
  /// Project count of a scope.
  pub fn projects(scope: &Scope, count: usize) -> Self {
    let family = match scope {
      Scope::Organization(_) => Family::OrganizationProjects,
      Scope::Repository(_) => Family::RepositoryProjects,
    };
    Self {
      family,
      labels: vec![scope.label_value().to_string()],
      value: count as f64,
    }
  }

  /// Column count of a project.
  pub fn columns(scope: &Scope, project: &Project, count: usize) -> Self {
    let family = match scope {
      Scope::Organization(_) => Family::OrganizationProjectColumns,
      Scope::Repository(_) => Family::RepositoryProjectColumns,
    };
    Self {
      family,
      labels: vec![scope.label_value().to_string(), project.number.to_string()],
      value: count as f64,
    }
  }

  /// Card count of a column.
  pub fn cards(scope: &Scope, project: &Project, column: &Column, count: usize) -> Self {
    let family = match scope {
      Scope::Organization(_) => Family::OrganizationProjectCards,
      Scope::Repository(_) => Family::RepositoryProjectCards,
    };
    Self {
      family,
      labels: vec![
        scope.label_value().to_string(),
        project.number.to_string(),
        column.name.clone(),
      ],
      value: count as f64,
    }
  }
}

/// Register the process collector (CPU, memory, open fds) with the default
/// registry.
pub fn register_process_collector() -> prometheus::Result<()> {
  #[cfg(target_os = "linux")]
  prometheus::register(Box::new(
    prometheus::process_collector::ProcessCollector::for_self(),
  ))?;
  Ok(())
}

/// Render scrape samples, plus everything in the default registry, into the
/// Prometheus text format.
///
/// Samples sharing a family and label set are summed.
pub fn encode(samples: &[Sample]) -> prometheus::Result<String> {
  let registry = Registry::new();
  let mut gauges = HashMap::with_capacity(DESCRIPTORS.len());

  for descriptor in DESCRIPTORS.iter() {
    let gauge = GaugeVec::new(descriptor.opts.clone(), descriptor.label_names)?;
    registry.register(Box::new(gauge.clone()))?;
    gauges.insert(descriptor.family, gauge);
  }

  for sample in samples {
    if let Some(gauge) = gauges.get(&sample.family) {
      let labels: Vec<&str> = sample.labels.iter().map(String::as_str).collect();
      gauge
        .get_metric_with_label_values(labels.as_slice())?
        .add(sample.value);
    }
  }

  let mut families = prometheus::gather();
  families.extend(registry.gather());
  TextEncoder::new().encode_to_string(&families)
}
