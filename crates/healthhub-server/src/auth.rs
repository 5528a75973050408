//! Password sign-up, login, logout and the auth-code callback.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/api/auth/sign-up` | 201 `{principal, callback_url}` |
//! | `POST` | `/api/auth/login`   | 200 + session cookie, 401 on bad credentials |
//! | `POST` | `/api/auth/logout`  | 303 to `/`, cookie cleared |
//! | `GET`  | `/auth/callback`    | `?code=&redirect_to=`, sets the cookie and redirects |

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use axum::{
  Json,
  extract::{Query, State},
  http::{HeaderMap, StatusCode, header},
  response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use healthhub_core::{
  principal::{Principal, Session, normalize_email},
  store::HubStore,
};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};

use crate::{AppState, error::Error, session};

const MIN_PASSWORD_LEN: usize = 6;

// ─── Passwords ───────────────────────────────────────────────────────────────

/// Hash `password` into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, Error> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|hash| hash.to_string())
    .map_err(|e| Error::PasswordHash(e.to_string()))
}

pub fn verify_password(password: &str, phc: &str) -> bool {
  PasswordHash::new(phc).is_ok_and(|parsed| {
    Argon2::default()
      .verify_password(password.as_bytes(), &parsed)
      .is_ok()
  })
}

/// Attach the cookie for `session` to `resp`.
fn with_session_cookie(mut resp: Response, session: &Session, secure: bool) -> Response {
  if let Some(cookie) = session::session_cookie(&session.token, session.max_age_secs(Utc::now()), secure) {
    resp.headers_mut().append(header::SET_COOKIE, cookie);
  }
  resp
}

// ─── Sign-up ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Credentials {
  pub email:    String,
  pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SignedUp {
  pub principal:    Principal,
  /// Single-use link that signs the new principal in.
  pub callback_url: String,
}

/// `POST /api/auth/sign-up` with body `{"email":…,"password":…}`
pub async fn sign_up<S: HubStore>(
  State(state): State<AppState<S>>,
  Json(creds): Json<Credentials>,
) -> Result<impl IntoResponse, Error> {
  let email = normalize_email(&creds.email);
  if !email.contains('@') {
    return Err(Error::BadRequest("a valid email address is required".into()));
  }
  if creds.password.chars().count() < MIN_PASSWORD_LEN {
    return Err(Error::BadRequest(format!(
      "password must be at least {MIN_PASSWORD_LEN} characters"
    )));
  }

  let existing = state
    .store
    .find_principal_by_email(&email)
    .await
    .map_err(Error::store)?;
  if existing.is_some() {
    return Err(Error::Conflict("email already registered".into()));
  }

  let hash = hash_password(&creds.password)?;
  let principal = state
    .store
    .create_principal(&email, &hash)
    .await
    .map_err(Error::store)?;
  let code = state
    .store
    .issue_auth_code(principal.principal_id, state.config.auth_code_ttl())
    .await
    .map_err(Error::store)?;

  tracing::info!(principal_id = %principal.principal_id, "principal signed up");
  Ok((
    StatusCode::CREATED,
    Json(SignedUp { principal, callback_url: format!("/auth/callback?code={code}") }),
  ))
}

// ─── Login / logout ──────────────────────────────────────────────────────────

/// `POST /api/auth/login` with body `{"email":…,"password":…}`
pub async fn login<S: HubStore>(
  State(state): State<AppState<S>>,
  Json(creds): Json<Credentials>,
) -> Result<Response, Error> {
  let found = state
    .store
    .find_principal_by_email(&normalize_email(&creds.email))
    .await
    .map_err(Error::store)?;

  let Some((principal, phc)) = found else {
    return Err(Error::InvalidCredentials);
  };
  if !verify_password(&creds.password, &phc) {
    return Err(Error::InvalidCredentials);
  }

  let session = state
    .store
    .create_session(principal.principal_id, state.config.session_ttl())
    .await
    .map_err(Error::store)?;

  tracing::info!(principal_id = %principal.principal_id, "login");
  Ok(with_session_cookie(Json(principal).into_response(), &session, state.config.cookie_secure))
}

/// `POST /api/auth/logout`
pub async fn logout<S: HubStore>(State(state): State<AppState<S>>, headers: HeaderMap) -> Response {
  if let Ok(Some(token)) = session::token_from_headers(&headers)
    && let Err(e) = state.store.delete_session(&token).await
  {
    tracing::warn!(error = %e, "failed to delete session on logout");
  }

  let mut resp = Redirect::to(&state.config.access.landing_path).into_response();
  resp
    .headers_mut()
    .append(header::SET_COOKIE, session::clear_cookie(state.config.cookie_secure));
  resp
}

// ─── Callback ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CallbackParams {
  pub code:        Option<String>,
  pub redirect_to: Option<String>,
}

/// `GET /auth/callback?code=<code>[&redirect_to=<path>]`
pub async fn callback<S: HubStore>(
  State(state): State<AppState<S>>,
  Query(params): Query<CallbackParams>,
) -> Response {
  let access = &state.config.access;
  let Some(code) = params.code.filter(|c| !c.is_empty()) else {
    return Redirect::to(&access.landing_path).into_response();
  };

  match state.store.exchange_auth_code(&code, state.config.session_ttl()).await {
    Ok(Some(session)) => {
      let target = access.local_redirect(params.redirect_to.as_deref());
      tracing::info!(principal_id = %session.principal.principal_id, "auth code exchanged");
      with_session_cookie(Redirect::to(&target).into_response(), &session, state.config.cookie_secure)
    }
    Ok(None) => Redirect::to("/login?error=invalid_or_expired_code").into_response(),
    Err(e) => {
      tracing::warn!(error = %e, "auth code exchange failed");
      Redirect::to("/login?error=exchange_failed").into_response()
    }
  }
}
