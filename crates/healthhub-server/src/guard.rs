//! Access middleware: resolves the session, consults the
//! [`AccessPolicy`](healthhub_core::access::AccessPolicy) and either lets the
//! request through or answers with a `307` redirect.
//!
//! Whenever a live session was resolved the response refreshes the cookie's
//! `Max-Age`; a cookie that no longer resolves is cleared. Handlers that set
//! the session cookie themselves (login, logout, auth callback) win.

use axum::{
  extract::{Request, State},
  http::header,
  middleware::Next,
  response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use healthhub_core::{
  access::{Caller, Decision, ProfileStatus},
  principal::{Principal, Session},
  store::HubStore,
};

use crate::{AppState, session};

/// `axum::middleware::from_fn_with_state` entry point.
pub async fn access<S: HubStore>(
  State(state): State<AppState<S>>,
  mut req: Request,
  next: Next,
) -> Response {
  let token = match session::token_from_headers(req.headers()) {
    Ok(token) => token,
    Err(e) => {
      tracing::warn!(error = %e, path = req.uri().path(), "no session context; passing through");
      return next.run(req).await;
    }
  };

  let session = match token.as_deref() {
    Some(token) => resolve_session(&state, token).await,
    None        => None,
  };

  let policy = &state.config.access;
  let path = req.uri().path().to_owned();
  let caller = match &session {
    None                                  => Caller::Anonymous,
    Some(s) if policy.needs_profile(&path) => {
      Caller::Authenticated(profile_status(&state, &s.principal).await)
    }
    Some(_)                               => Caller::Authenticated(ProfileStatus::Unchecked),
  };

  let mut resp = match policy.decide(&path, caller) {
    Decision::Allow => {
      if let Some(s) = &session {
        req.extensions_mut().insert(s.principal.clone());
      }
      next.run(req).await
    }
    Decision::Redirect(to) => {
      tracing::debug!(path = %path, to = %to, class = policy.classify(&path).as_ref(), "access redirect");
      Redirect::temporary(&to).into_response()
    }
  };

  if !session::sets_session_cookie(resp.headers()) {
    let secure = state.config.cookie_secure;
    let cookie = match (&session, &token) {
      (Some(s), _)    => session::session_cookie(&s.token, s.max_age_secs(Utc::now()), secure),
      (None, Some(_)) => Some(session::clear_cookie(secure)),
      (None, None)    => None,
    };
    if let Some(cookie) = cookie {
      resp.headers_mut().append(header::SET_COOKIE, cookie);
    }
  }
  resp
}

/// Resolve and slide the session. Store failures count as no session.
async fn resolve_session<S: HubStore>(state: &AppState<S>, token: &str) -> Option<Session> {
  match state.store.refresh_session(token, state.config.session_ttl()).await {
    Ok(session) => session,
    Err(e) => {
      tracing::warn!(error = %e, "session lookup failed; treating caller as anonymous");
      None
    }
  }
}

async fn profile_status<S: HubStore>(state: &AppState<S>, principal: &Principal) -> ProfileStatus {
  match state.store.profile_for(principal.principal_id).await {
    Ok(Some(_)) => ProfileStatus::Complete,
    Ok(None)    => ProfileStatus::Incomplete,
    Err(e) => {
      tracing::warn!(
        error = %e,
        principal_id = %principal.principal_id,
        "profile lookup failed; allowing request"
      );
      ProfileStatus::LookupFailed
    }
  }
}
