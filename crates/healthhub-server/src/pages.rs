//! Page routes. Each renders a JSON payload in place of the page.

use axum::{
  Json,
  extract::{Query, State},
  http::Uri,
  response::{IntoResponse, Redirect, Response},
};
use healthhub_api::CurrentPrincipal;
use healthhub_core::{store::HubStore, trial::TrialQuery};
use healthhub_registry::schema::OverallStatus;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::{AppState, error::Error};

const DASHBOARD_TRIALS: usize = 10;

/// Public pages: `/`, `/login`, `/sign-up`, …
pub async fn public(uri: Uri) -> Json<Value> { Json(json!({ "page": uri.path() })) }

#[derive(Debug, Deserialize)]
pub struct QuestionnaireParams {
  pub redirect_from: Option<String>,
}

/// `GET /questionnaire`. Anonymous callers go to the landing page and
/// callers who already completed it go to the dashboard.
pub async fn questionnaire<S: HubStore>(
  State(state): State<AppState<S>>,
  principal: Option<CurrentPrincipal>,
  Query(params): Query<QuestionnaireParams>,
) -> Result<Response, Error> {
  let access = &state.config.access;
  let Some(CurrentPrincipal(principal)) = principal else {
    return Ok(Redirect::temporary(&access.landing_path).into_response());
  };

  let profile = state
    .store
    .profile_for(principal.principal_id)
    .await
    .map_err(Error::store)?;
  if profile.is_some() {
    return Ok(Redirect::temporary(&access.dashboard_path).into_response());
  }

  Ok(Json(json!({ "principal": principal, "redirect_from": params.redirect_from })).into_response())
}

/// `GET /dashboard`: the principal and the most recently ingested
/// recruiting trials.
pub async fn dashboard<S: HubStore>(
  State(state): State<AppState<S>>,
  CurrentPrincipal(principal): CurrentPrincipal,
) -> Result<Json<Value>, Error> {
  let query = TrialQuery {
    status: Some(OverallStatus::Recruiting.label().to_owned()),
    limit: Some(DASHBOARD_TRIALS),
    ..TrialQuery::default()
  };
  let trials = state.store.list_trials(&query).await.map_err(Error::store)?;
  Ok(Json(json!({ "principal": principal, "trials": trials })))
}

/// `GET /settings`
pub async fn settings(CurrentPrincipal(principal): CurrentPrincipal) -> Json<Value> {
  Json(json!({ "principal": principal }))
}
