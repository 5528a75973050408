//! JSON REST API for Health Mapping Hub.
//!
//! Exposes an axum [`Router`] backed by any store implementing
//! [`ProfileStore`] and [`TrialStore`]. Sessions, cookies and transport
//! concerns are the caller's responsibility: handlers that need a signed-in
//! caller read the [`Principal`](healthhub_core::principal::Principal) the
//! server's middleware placed in the request extensions.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", healthhub_api::api_router(state.clone()))
//! .merge(healthhub_api::page_router(state))
//! ```

pub mod current;
pub mod error;
pub mod ingest;
pub mod profile;
pub mod trials;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use healthhub_core::{
  access::AccessPolicy,
  store::{ProfileStore, TrialStore},
};
use healthhub_registry::RegistryClient;

pub use current::CurrentPrincipal;
pub use error::ApiError;
pub use ingest::IngestConfig;

/// Everything the API handlers share.
#[derive(Clone)]
pub struct ApiState<S> {
  pub store:    Arc<S>,
  pub registry: Arc<RegistryClient>,
  pub ingest:   Arc<IngestConfig>,
  pub policy:   Arc<AccessPolicy>,
}

/// Build the JSON API router, to be nested under `/api`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(state: ApiState<S>) -> Router<()>
where
  S: ProfileStore + TrialStore + Clone + 'static,
{
  Router::new()
    // Profile
    .route("/profile", get(profile::get_one::<S>))
    .route("/questionnaire", post(profile::submit::<S>))
    // Trials
    .route("/trials", get(trials::list::<S>))
    .route("/trials/ingest", post(ingest::trigger::<S>))
    .route("/trials/{nct_id}", get(trials::get_one::<S>))
    .with_state(state)
}

/// The page routes that render the same payloads as the API: `/profile`,
/// `/trials` and `/trials/{nct_id}`. Mounted at the root.
pub fn page_router<S>(state: ApiState<S>) -> Router<()>
where
  S: ProfileStore + TrialStore + Clone + 'static,
{
  Router::new()
    .route("/profile", get(profile::get_one::<S>))
    .route("/trials", get(trials::list::<S>))
    .route("/trials/{nct_id}", get(trials::get_one::<S>))
    .with_state(state)
}

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use chrono::Utc;
  use healthhub_core::{
    principal::Principal,
    store::IdentityStore,
    trial::TrialRow,
  };
  use healthhub_registry::{RegistryConfig, StoreFailurePolicy};
  use healthhub_store_sqlite::SqliteStore;
  use serde_json::{Value, json};
  use tokio::net::TcpListener;
  use tower::ServiceExt as _;

  const HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA";

  async fn make_state(registry_url: &str, token: Option<&str>) -> ApiState<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    let registry = RegistryClient::new(RegistryConfig {
      base_url: registry_url.to_string(),
      ..RegistryConfig::default()
    })
    .unwrap();

    ApiState {
      store:    Arc::new(store),
      registry: Arc::new(registry),
      ingest:   Arc::new(IngestConfig {
        token:          token.map(str::to_string),
        on_store_error: StoreFailurePolicy::Log,
      }),
      policy:   Arc::new(AccessPolicy::default()),
    }
  }

  async fn sign_up(state: &ApiState<SqliteStore>) -> Principal {
    state.store.create_principal("pat@example.com", HASH).await.unwrap()
  }

  async fn call(
    state:     &ApiState<SqliteStore>,
    method:    &str,
    uri:       &str,
    principal: Option<&Principal>,
    headers:   Vec<(header::HeaderName, &str)>,
    body:      Value,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder()
      .method(method)
      .uri(uri)
      .header(header::CONTENT_TYPE, "application/json");
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    if let Some(p) = principal {
      builder = builder.extension(p.clone());
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    let resp = api_router(state.clone()).oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
  }

  fn answers() -> Value {
    json!({
      "name": "Pat Doe",
      "age": "42",
      "sex": "Female",
      "ethnicity": "Hispanic",
      "location": "Boston, MA",
      "phone": "555-0100",
      "condition": "Fabry disease",
      "medications": "Migalastat",
    })
  }

  /// Registry stand-in on localhost serving `body` with `status`.
  async fn fake_registry(status: StatusCode, body: &'static str) -> String {
    let app = Router::new().route("/studies", get(move || async move { (status, body) }));
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    format!("http://{addr}/studies")
  }

  // ── Profile ───────────────────────────────────────────────────────────────

  #[tokio::test]
  async fn profile_requires_a_principal() {
    let state = make_state("http://127.0.0.1:9/studies", None).await;
    let (status, body) = call(&state, "GET", "/profile", None, vec![], Value::Null).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
  }

  #[tokio::test]
  async fn profile_is_404_until_questionnaire_submitted() {
    let state = make_state("http://127.0.0.1:9/studies", None).await;
    let pat = sign_up(&state).await;

    let (status, _) = call(&state, "GET", "/profile", Some(&pat), vec![], Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) =
      call(&state, "POST", "/questionnaire", Some(&pat), vec![], answers()).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["redirect_to"], "/dashboard");
    // Blank email falls back to the principal's.
    assert_eq!(body["profile"]["email"], "pat@example.com");

    let (status, body) = call(&state, "GET", "/profile", Some(&pat), vec![], Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Pat Doe");
    assert_eq!(body["age"], 42);
  }

  #[tokio::test]
  async fn questionnaire_returns_to_local_origin_only() {
    let state = make_state("http://127.0.0.1:9/studies", None).await;
    let pat = sign_up(&state).await;

    let mut body = answers();
    body["redirect_from"] = json!("/trials/NCT1");
    let (_, resp) = call(&state, "POST", "/questionnaire", Some(&pat), vec![], body).await;
    assert_eq!(resp["redirect_to"], "/trials/NCT1");

    let other = state.store.create_principal("sam@example.com", HASH).await.unwrap();
    let mut body = answers();
    body["redirect_from"] = json!("https://evil.example/");
    let (_, resp) = call(&state, "POST", "/questionnaire", Some(&other), vec![], body).await;
    assert_eq!(resp["redirect_to"], "/dashboard");
  }

  #[tokio::test]
  async fn second_submission_conflicts() {
    let state = make_state("http://127.0.0.1:9/studies", None).await;
    let pat = sign_up(&state).await;

    call(&state, "POST", "/questionnaire", Some(&pat), vec![], answers()).await;
    let (status, _) = call(&state, "POST", "/questionnaire", Some(&pat), vec![], answers()).await;
    assert_eq!(status, StatusCode::CONFLICT);
  }

  #[tokio::test]
  async fn invalid_questionnaire_is_400() {
    let state = make_state("http://127.0.0.1:9/studies", None).await;
    let pat = sign_up(&state).await;

    let mut body = answers();
    body["age"] = json!("two hundred");
    let (status, _) = call(&state, "POST", "/questionnaire", Some(&pat), vec![], body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let mut body = answers();
    body["sex"] = json!("Unknown");
    let (status, _) = call(&state, "POST", "/questionnaire", Some(&pat), vec![], body).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = call(&state, "GET", "/profile", Some(&pat), vec![], Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Trials ────────────────────────────────────────────────────────────────

  fn row(nct_id: &str, status: &str) -> TrialRow {
    TrialRow {
      nct_id:      nct_id.into(),
      title:       format!("Study {nct_id}"),
      conditions:  vec!["Fabry Disease".into()],
      keywords:    vec![],
      phase:       "Phase 2".into(),
      locations:   vec![],
      start_date:  "2024-03".into(),
      status:      status.into(),
      enrollment:  None,
      description: "No description available".into(),
      eligibility: "Not Specified".into(),
      sex:         "ALL".into(),
      minimum_age: "18 Years".into(),
      maximum_age: "Not Specified".into(),
      updated_at:  Utc::now(),
    }
  }

  #[tokio::test]
  async fn trials_list_and_get() {
    let state = make_state("http://127.0.0.1:9/studies", None).await;
    let pat = sign_up(&state).await;
    state
      .store
      .upsert_trials(vec![row("NCT1", "Recruiting"), row("NCT2", "Completed")])
      .await
      .unwrap();

    let (status, body) =
      call(&state, "GET", "/trials?status=Recruiting", Some(&pat), vec![], Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["nct_id"], "NCT1");

    let (status, body) = call(&state, "GET", "/trials/NCT2", Some(&pat), vec![], Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "Completed");

    let (status, _) = call(&state, "GET", "/trials/NCT404", Some(&pat), vec![], Value::Null).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  // ── Ingest trigger ────────────────────────────────────────────────────────

  #[tokio::test]
  async fn ingest_without_configured_token_is_forbidden() {
    let state = make_state("http://127.0.0.1:9/studies", None).await;
    let (status, _) = call(
      &state,
      "POST",
      "/trials/ingest",
      None,
      vec![(header::AUTHORIZATION, "Bearer anything")],
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
  }

  #[tokio::test]
  async fn ingest_with_wrong_token_is_unauthorized() {
    let state = make_state("http://127.0.0.1:9/studies", Some("s3cret")).await;
    let (status, _) = call(
      &state,
      "POST",
      "/trials/ingest",
      None,
      vec![(header::AUTHORIZATION, "Bearer nope")],
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn ingest_registry_failure_is_502_with_generic_message() {
    let url = fake_registry(StatusCode::INTERNAL_SERVER_ERROR, "boom").await;
    let state = make_state(&url, Some("s3cret")).await;

    let (status, body) = call(
      &state,
      "POST",
      "/trials/ingest",
      None,
      vec![(header::AUTHORIZATION, "Bearer s3cret")],
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body, json!({ "error": "Failed to fetch" }));
  }

  #[tokio::test]
  async fn ingest_persists_studies_and_reports() {
    let url = fake_registry(
      StatusCode::OK,
      r#"{"studies":[
        {"protocolSection":{"identificationModule":{"nctId":"NCT9","briefTitle":"Nine"},
                            "statusModule":{"overallStatus":"RECRUITING"}}},
        {}
      ]}"#,
    )
    .await;
    let state = make_state(&url, Some("s3cret")).await;

    let (status, body) = call(
      &state,
      "POST",
      "/trials/ingest",
      None,
      vec![(header::AUTHORIZATION, "Bearer s3cret")],
      Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["fetched"], 2);
    assert_eq!(body["upserted"], 2);
    assert_eq!(body["store_error"], Value::Null);

    let nine = state.store.get_trial("NCT9").await.unwrap().unwrap();
    assert_eq!(nine.title, "Nine");
    assert_eq!(nine.status, "Recruiting");
  }
}
