//! Async HTTP client for the ClinicalTrials.gov v2 search endpoint.

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;

use crate::{
  Error, Result,
  schema::{OverallStatus, Study, decode_page},
};

/// Registry connection and query settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
  /// Search endpoint, e.g. `https://clinicaltrials.gov/api/v2/studies`.
  pub base_url:     String,
  /// Studies requested per run. Only the first page is ever fetched.
  pub page_size:    u32,
  /// Recruitment-status allowlist sent as `filter.overallStatus`.
  pub statuses:     Vec<OverallStatus>,
  pub sort:         String,
  /// Optional `query.cond` condition term.
  pub condition:    Option<String>,
  pub timeout_secs: u64,
}

impl Default for RegistryConfig {
  fn default() -> Self {
    Self {
      base_url:     "https://clinicaltrials.gov/api/v2/studies".to_owned(),
      page_size:    20,
      statuses:     vec![OverallStatus::Recruiting, OverallStatus::NotYetRecruiting],
      sort:         "@relevance".to_owned(),
      condition:    None,
      timeout_secs: 30,
    }
  }
}

/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct RegistryClient {
  client: Client,
  config: RegistryConfig,
}

impl RegistryClient {
  pub fn new(config: RegistryConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(config.timeout_secs))
      .user_agent(concat!("healthhub/", env!("CARGO_PKG_VERSION")))
      .build()?;
    Ok(Self { client, config })
  }

  pub fn config(&self) -> &RegistryConfig { &self.config }

  /// Query string for the fixed search.
  pub fn query(&self) -> Vec<(&'static str, String)> {
    let mut q = vec![("pageSize", self.config.page_size.to_string()), ("sort", self.config.sort.clone())];
    if !self.config.statuses.is_empty() {
      let statuses: Vec<&str> = self.config.statuses.iter().map(AsRef::as_ref).collect();
      q.push(("filter.overallStatus", statuses.join("|")));
    }
    if let Some(cond) = self.config.condition.as_deref().filter(|c| !c.trim().is_empty()) {
      q.push(("query.cond", cond.trim().to_owned()));
    }
    q
  }

  /// `GET <base_url>?…`: exactly one round trip, no retry.
  pub async fn fetch_studies(&self) -> Result<Vec<Study>> {
    let resp = self
      .client
      .get(&self.config.base_url)
      .query(&self.query())
      .send()
      .await?;

    let status = resp.status();
    if !status.is_success() {
      return Err(Error::Status(status));
    }

    let body = resp.bytes().await?;
    decode_page(&body)
  }
}
