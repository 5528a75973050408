//! Error type for `healthhub-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  /// A stored column held a value the domain types do not accept.
  #[error("corrupt column {column}: {value:?}")]
  Corrupt { column: &'static str, value: String },

  #[error("email already registered: {0}")]
  EmailTaken(String),

  #[error("principal {0} has already completed the questionnaire")]
  ProfileExists(uuid::Uuid),

  #[error("principal not found: {0}")]
  PrincipalNotFound(uuid::Uuid),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
