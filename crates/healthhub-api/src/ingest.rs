//! `POST /trials/ingest`: run one registry ingestion on demand.
//!
//! Guarded by a bearer token from configuration. With no token configured
//! the endpoint is disabled.

use axum::{
  Json,
  extract::State,
  http::{HeaderMap, header},
};
use healthhub_core::store::{ProfileStore, TrialStore};
use healthhub_registry::{Error as RegistryError, IngestReport, StoreFailurePolicy};
use serde::Deserialize;

use crate::{ApiState, error::ApiError};

/// Ingestion settings shared by the HTTP trigger and the one-shot mode.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
  /// Bearer token accepted by the trigger. `None` disables it.
  pub token:          Option<String>,
  pub on_store_error: StoreFailurePolicy,
}

/// Message returned for any registry-side failure.
pub const FETCH_FAILED: &str = "Failed to fetch";

fn bearer(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(header::AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
}

/// `POST /trials/ingest` with `Authorization: Bearer <ingest.token>`
pub async fn trigger<S>(
  State(state): State<ApiState<S>>,
  headers: HeaderMap,
) -> Result<Json<IngestReport>, ApiError>
where
  S: ProfileStore + TrialStore + Clone + 'static,
{
  let Some(expected) = state.ingest.token.as_deref().filter(|t| !t.is_empty()) else {
    return Err(ApiError::Forbidden("ingestion trigger is disabled".into()));
  };
  if bearer(&headers) != Some(expected) {
    return Err(ApiError::Unauthorized);
  }

  match healthhub_registry::ingest(&state.registry, &*state.store, state.ingest.on_store_error).await {
    Ok(report) => Ok(Json(report)),
    Err(RegistryError::Store(e)) => Err(ApiError::Store(e)),
    Err(_) => Err(ApiError::BadGateway(FETCH_FAILED.into())),
  }
}
