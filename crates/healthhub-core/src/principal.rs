//! Principals and sessions, the identity side of the hub.
//!
//! A principal is an authenticated caller. A session binds an opaque bearer
//! token (carried in a cookie) to a principal until it expires.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An authenticated caller identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
  pub principal_id: Uuid,
  pub email:        String,
  pub created_at:   DateTime<Utc>,
}

/// A live session. `token` is the plaintext bearer value and is only ever
/// known at issue time; stores keep a digest of it.
#[derive(Debug, Clone)]
pub struct Session {
  pub token:      String,
  pub principal:  Principal,
  pub expires_at: DateTime<Utc>,
}

impl Session {
  /// Seconds until expiry relative to `now`, floored at zero. Used as the
  /// cookie `Max-Age`.
  pub fn max_age_secs(&self, now: DateTime<Utc>) -> i64 {
    (self.expires_at - now).num_seconds().max(0)
  }
}

/// Normalise an email address for identity comparisons.
pub fn normalize_email(email: &str) -> String { email.trim().to_lowercase() }
