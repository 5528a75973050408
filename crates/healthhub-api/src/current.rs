//! The signed-in principal, as resolved by the server's session middleware.

use std::convert::Infallible;

use axum::{
  extract::{FromRequestParts, OptionalFromRequestParts},
  http::request::Parts,
};
use healthhub_core::principal::Principal;

use crate::error::ApiError;

/// Extracts the [`Principal`] the session middleware stored in the request
/// extensions. Rejects with 401 when there is none; use
/// `Option<CurrentPrincipal>` where anonymous callers are expected.
#[derive(Debug, Clone)]
pub struct CurrentPrincipal(pub Principal);

impl<St> OptionalFromRequestParts<St> for CurrentPrincipal
where
  St: Send + Sync,
{
  type Rejection = Infallible;

  async fn from_request_parts(parts: &mut Parts, _: &St) -> Result<Option<Self>, Self::Rejection> {
    Ok(parts.extensions.get::<Principal>().cloned().map(CurrentPrincipal))
  }
}

impl<St> FromRequestParts<St> for CurrentPrincipal
where
  St: Send + Sync,
{
  type Rejection = ApiError;

  async fn from_request_parts(parts: &mut Parts, _: &St) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Principal>()
      .cloned()
      .map(CurrentPrincipal)
      .ok_or(ApiError::Unauthorized)
  }
}
