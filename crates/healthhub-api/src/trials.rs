//! Handlers for `/trials` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/trials` | `?text=&status=&limit=&offset=` |
//! | `GET`  | `/trials/{nct_id}` | 404 if not ingested |

use axum::{
  Json,
  extract::{Path, Query, State},
};
use healthhub_core::{
  store::{ProfileStore, TrialStore},
  trial::{TrialQuery, TrialRow},
};

use crate::{ApiState, current::CurrentPrincipal, error::ApiError};

const MAX_LIMIT: usize = 100;

/// `GET /trials[?text=...][&status=...][&limit=...][&offset=...]`
pub async fn list<S>(
  State(state): State<ApiState<S>>,
  _: CurrentPrincipal,
  Query(mut query): Query<TrialQuery>,
) -> Result<Json<Vec<TrialRow>>, ApiError>
where
  S: ProfileStore + TrialStore + Clone + 'static,
{
  query.limit = query.limit.map(|l| l.min(MAX_LIMIT));
  let trials = state.store.list_trials(&query).await.map_err(ApiError::store)?;
  Ok(Json(trials))
}

/// `GET /trials/{nct_id}`
pub async fn get_one<S>(
  State(state): State<ApiState<S>>,
  _: CurrentPrincipal,
  Path(nct_id): Path<String>,
) -> Result<Json<TrialRow>, ApiError>
where
  S: ProfileStore + TrialStore + Clone + 'static,
{
  let trial = state
    .store
    .get_trial(&nct_id)
    .await
    .map_err(ApiError::store)?
    .ok_or_else(|| ApiError::NotFound(format!("trial {nct_id} not found")))?;
  Ok(Json(trial))
}
