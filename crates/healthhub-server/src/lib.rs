//! HTTP application for Health Mapping Hub.
//!
//! Wires the JSON API, the auth endpoints and the page routes into one axum
//! [`Router`] behind the access middleware, backed by any [`HubStore`].

pub mod auth;
pub mod error;
pub mod guard;
pub mod pages;
pub mod session;

pub use error::Error;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  middleware,
  routing::{get, post},
};
use healthhub_api::{ApiState, IngestConfig};
use healthhub_core::{access::AccessPolicy, store::HubStore};
use healthhub_registry::{RegistryClient, RegistryConfig};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and `HMH_*`
/// environment variables. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                  String,
  pub port:                  u16,
  pub store_path:            PathBuf,
  /// Add `Secure` to the session cookie. Enable behind TLS.
  pub cookie_secure:         bool,
  pub session_ttl_hours:     i64,
  pub auth_code_ttl_minutes: i64,
  pub registry:              RegistryConfig,
  pub ingest:                IngestConfig,
  pub access:                AccessPolicy,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                  "127.0.0.1".to_string(),
      port:                  3000,
      store_path:            PathBuf::from("healthhub.sqlite"),
      cookie_secure:         false,
      session_ttl_hours:     24 * 7,
      auth_code_ttl_minutes: 15,
      registry:              RegistryConfig::default(),
      ingest:                IngestConfig::default(),
      access:                AccessPolicy::default(),
    }
  }
}

impl ServerConfig {
  pub fn session_ttl(&self) -> chrono::Duration { chrono::Duration::hours(self.session_ttl_hours) }

  pub fn auth_code_ttl(&self) -> chrono::Duration {
    chrono::Duration::minutes(self.auth_code_ttl_minutes)
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S> {
  pub store:    Arc<S>,
  pub registry: Arc<RegistryClient>,
  pub config:   Arc<ServerConfig>,
}

impl<S> AppState<S> {
  pub fn new(store: S, config: ServerConfig) -> healthhub_registry::Result<Self> {
    let registry = RegistryClient::new(config.registry.clone())?;
    Ok(Self {
      store:    Arc::new(store),
      registry: Arc::new(registry),
      config:   Arc::new(config),
    })
  }

  pub fn api_state(&self) -> ApiState<S> {
    ApiState {
      store:    Arc::clone(&self.store),
      registry: Arc::clone(&self.registry),
      ingest:   Arc::new(self.config.ingest.clone()),
      policy:   Arc::new(self.config.access.clone()),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the application [`Router`].
pub fn router<S: HubStore>(state: AppState<S>) -> Router {
  let auth_api = Router::new()
    .route("/auth/sign-up", post(auth::sign_up::<S>))
    .route("/auth/login",   post(auth::login::<S>))
    .route("/auth/logout",  post(auth::logout::<S>))
    .with_state(state.clone());

  let pages = Router::new()
    .route("/",                get(pages::public))
    .route("/login",           get(pages::public))
    .route("/sign-up",         get(pages::public))
    .route("/forgot-password", get(pages::public))
    .route("/terms",           get(pages::public))
    .route("/privacy",         get(pages::public))
    .route("/contact",         get(pages::public))
    .route("/auth/callback",   get(auth::callback::<S>))
    .route("/questionnaire",   get(pages::questionnaire::<S>))
    .route("/dashboard",       get(pages::dashboard::<S>))
    .route("/settings",        get(pages::settings))
    .with_state(state.clone());

  Router::new()
    .nest("/api", healthhub_api::api_router(state.api_state()).merge(auth_api))
    .merge(pages)
    .merge(healthhub_api::page_router(state.api_state()))
    .layer(middleware::from_fn_with_state(state, guard::access::<S>))
    .layer(TraceLayer::new_for_http())
}
