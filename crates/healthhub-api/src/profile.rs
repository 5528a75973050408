//! Handlers for the caller's profile and questionnaire.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/profile` | 404 until the questionnaire is complete |
//! | `POST` | `/questionnaire` | 201 once; 409 afterwards |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use healthhub_core::{
  profile::{Profile, Questionnaire},
  store::{ProfileStore, TrialStore},
};
use serde::{Deserialize, Serialize};

use crate::{ApiState, current::CurrentPrincipal, error::ApiError};

// ─── Get ─────────────────────────────────────────────────────────────────────

/// `GET /profile`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Profile>, ApiError>
where
  S: ProfileStore + TrialStore + Clone + 'static,
{
  let profile = state
    .store
    .profile_for(principal.principal_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound("no profile yet; complete the questionnaire".into()))?;
  Ok(Json(profile))
}

// ─── Submit ──────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct SubmitBody {
  #[serde(flatten)]
  pub answers:       Questionnaire,
  /// Where the caller was headed before onboarding interrupted them.
  #[serde(default)]
  pub redirect_from: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct Submitted {
  pub profile:     Profile,
  pub redirect_to: String,
}

/// `POST /questionnaire`. Body: the questionnaire fields plus an optional
/// `redirect_from`.
pub async fn submit<S>(
  State(state): State<ApiState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
  Json(body): Json<SubmitBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: ProfileStore + TrialStore + Clone + 'static,
{
  let input = body
    .answers
    .validate(&principal)
    .map_err(|e| ApiError::BadRequest(e.to_string()))?;

  // The store rejects a second profile too, but its error is opaque here.
  let existing = state
    .store
    .profile_for(principal.principal_id)
    .await
    .map_err(ApiError::store)?;
  if existing.is_some() {
    return Err(ApiError::Conflict("questionnaire already completed".into()));
  }

  let profile = state.store.insert_profile(input).await.map_err(ApiError::store)?;
  tracing::info!(principal_id = %principal.principal_id, "questionnaire completed");

  let redirect_to = state.policy.local_redirect(body.redirect_from.as_deref());
  Ok((StatusCode::CREATED, Json(Submitted { profile, redirect_to })))
}
