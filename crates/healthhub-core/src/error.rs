//! Error types for `healthhub-core`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid questionnaire: {0}")]
  InvalidProfile(String),

  #[error("unknown sex value: {0:?}")]
  UnknownSex(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
