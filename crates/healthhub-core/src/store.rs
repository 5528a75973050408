//! Store traits for identity, profiles and trials.
//!
//! The traits are implemented by storage backends (e.g.
//! `healthhub-store-sqlite`). Higher layers (`healthhub-api`,
//! `healthhub-server`, `healthhub-registry`) depend on these abstractions, not
//! on any concrete backend.
//!
//! All methods return `Send` futures so the traits can be used in
//! multi-threaded async runtimes (e.g. tokio with `axum`).

use std::future::Future;

use chrono::Duration;
use uuid::Uuid;

use crate::{
  principal::{Principal, Session},
  profile::{NewProfile, Profile},
  trial::{TrialQuery, TrialRow},
};

// ─── Identity ────────────────────────────────────────────────────────────────

/// Principals, sessions and one-time auth codes.
pub trait IdentityStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a new principal. `password_hash` is an opaque PHC string.
  ///
  /// Returns an error if the (normalised) email is already registered.
  fn create_principal<'a>(
    &'a self,
    email: &'a str,
    password_hash: &'a str,
  ) -> impl Future<Output = Result<Principal, Self::Error>> + Send + 'a;

  /// Look up a principal and its password hash by email.
  fn find_principal_by_email<'a>(
    &'a self,
    email: &'a str,
  ) -> impl Future<Output = Result<Option<(Principal, String)>, Self::Error>> + Send + 'a;

  /// Open a new session for `principal_id` lasting `ttl`.
  fn create_session(
    &self,
    principal_id: Uuid,
    ttl: Duration,
  ) -> impl Future<Output = Result<Session, Self::Error>> + Send + '_;

  /// Resolve a bearer token to its session and push the expiry out to
  /// `now + ttl`. Expired or unknown tokens resolve to `None`.
  fn refresh_session<'a>(
    &'a self,
    token: &'a str,
    ttl: Duration,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + 'a;

  /// Destroy a session. Unknown tokens are ignored.
  fn delete_session<'a>(
    &'a self,
    token: &'a str,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + 'a;

  /// Issue a single-use code that [`exchange_auth_code`](Self::exchange_auth_code)
  /// turns into a session.
  fn issue_auth_code(
    &self,
    principal_id: Uuid,
    ttl: Duration,
  ) -> impl Future<Output = Result<String, Self::Error>> + Send + '_;

  /// Consume an auth code and open a session. Returns `None` if the code is
  /// unknown, expired or already used.
  fn exchange_auth_code<'a>(
    &'a self,
    code: &'a str,
    session_ttl: Duration,
  ) -> impl Future<Output = Result<Option<Session>, Self::Error>> + Send + 'a;
}

// ─── Profiles ────────────────────────────────────────────────────────────────

/// Questionnaire outcomes. At most one profile exists per principal.
pub trait ProfileStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Return the profile for `principal_id`, if onboarding is complete.
  fn profile_for(
    &self,
    principal_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// Insert a profile. Returns an error if the principal already has one.
  fn insert_profile(
    &self,
    input: NewProfile,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;
}

// ─── Trials ──────────────────────────────────────────────────────────────────

/// Persisted trial snapshots keyed by NCT id.
pub trait TrialStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert or replace every row in one transaction, keyed by `nct_id`.
  /// Returns the number of rows written.
  fn upsert_trials(
    &self,
    rows: Vec<TrialRow>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  fn get_trial<'a>(
    &'a self,
    nct_id: &'a str,
  ) -> impl Future<Output = Result<Option<TrialRow>, Self::Error>> + Send + 'a;

  fn list_trials<'a>(
    &'a self,
    query: &'a TrialQuery,
  ) -> impl Future<Output = Result<Vec<TrialRow>, Self::Error>> + Send + 'a;
}

// ─── Combined ────────────────────────────────────────────────────────────────

/// A backend serving every store trait, as the HTTP service needs.
pub trait HubStore: IdentityStore + ProfileStore + TrialStore + Clone + 'static {}

impl<T> HubStore for T where T: IdentityStore + ProfileStore + TrialStore + Clone + 'static {}
