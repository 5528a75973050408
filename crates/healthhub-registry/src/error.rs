//! Error type for `healthhub-registry`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("registry request failed: {0}")]
  Http(#[from] reqwest::Error),

  #[error("registry returned {0}")]
  Status(reqwest::StatusCode),

  #[error("registry response is not valid JSON: {0}")]
  Json(#[from] serde_json::Error),

  #[error("persisting trials failed: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
