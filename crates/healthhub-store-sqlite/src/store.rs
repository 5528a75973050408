//! [`SqliteStore`]: the SQLite implementation of the hub's store traits.

use std::path::Path;

use chrono::{Duration, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use healthhub_core::{
  principal::{Principal, Session, normalize_email},
  profile::{NewProfile, Profile},
  store::{IdentityStore, ProfileStore, TrialStore},
  trial::{TrialQuery, TrialRow},
};

use crate::{
  Error, Result,
  encode::{
    EncodedTrial, PROFILE_COLUMNS, RawPrincipal, RawProfile, RawTrial, TRIAL_COLUMNS, decode_dt,
    encode_dt, encode_sex, encode_uuid,
  },
  schema::SCHEMA,
  token,
};

/// `true` if the error is a UNIQUE / PRIMARY KEY violation.
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
  matches!(
    err,
    rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A hub store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, for tests.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn principal_by_id(&self, principal_id: Uuid) -> Result<Option<Principal>> {
    let id_str = encode_uuid(principal_id);

    let raw: Option<RawPrincipal> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT principal_id, email, created_at FROM principals WHERE principal_id = ?1",
            rusqlite::params![id_str],
            |row| {
              Ok(RawPrincipal {
                principal_id: row.get(0)?,
                email:        row.get(1)?,
                created_at:   row.get(2)?,
              })
            },
          )
          .optional()?)
      })
      .await?;

    raw.map(RawPrincipal::into_principal).transpose()
  }

  /// Delete expired sessions and auth codes that are expired or already
  /// redeemed. Runs whenever a new credential is written.
  async fn purge_credentials(&self) -> Result<()> {
    // RFC 3339 UTC strings sort chronologically.
    let now_str = encode_dt(Utc::now());

    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE expires_at <= ?1", rusqlite::params![now_str])?;
        conn.execute(
          "DELETE FROM auth_codes WHERE consumed_at IS NOT NULL OR expires_at <= ?1",
          rusqlite::params![now_str],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  #[cfg(test)]
  pub(crate) async fn row_count(&self, table: &'static str) -> Result<i64> {
    Ok(
      self
        .conn
        .call(move |conn| Ok(conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |r| r.get(0))?))
        .await?,
    )
  }
}

// ─── IdentityStore impl ──────────────────────────────────────────────────────

impl IdentityStore for SqliteStore {
  type Error = Error;

  async fn create_principal(&self, email: &str, password_hash: &str) -> Result<Principal> {
    let principal = Principal {
      principal_id: Uuid::new_v4(),
      email:        normalize_email(email),
      created_at:   Utc::now(),
    };

    let id_str    = encode_uuid(principal.principal_id);
    let email_str = principal.email.clone();
    let hash_str  = password_hash.to_owned();
    let at_str    = encode_dt(principal.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO principals (principal_id, email, password_hash, created_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![id_str, email_str, hash_str, at_str],
        ) {
          Ok(_) => Ok(true),
          Err(e) if is_constraint_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      return Err(Error::EmailTaken(principal.email));
    }
    Ok(principal)
  }

  async fn find_principal_by_email(&self, email: &str) -> Result<Option<(Principal, String)>> {
    let email_str = normalize_email(email);

    let raw: Option<(RawPrincipal, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT principal_id, email, created_at, password_hash
             FROM principals WHERE email = ?1",
            rusqlite::params![email_str],
            |row| {
              Ok((
                RawPrincipal {
                  principal_id: row.get(0)?,
                  email:        row.get(1)?,
                  created_at:   row.get(2)?,
                },
                row.get(3)?,
              ))
            },
          )
          .optional()?)
      })
      .await?;

    raw
      .map(|(p, hash)| Ok((p.into_principal()?, hash)))
      .transpose()
  }

  async fn create_session(&self, principal_id: Uuid, ttl: Duration) -> Result<Session> {
    let principal = self
      .principal_by_id(principal_id)
      .await?
      .ok_or(Error::PrincipalNotFound(principal_id))?;

    self.purge_credentials().await?;

    let now        = Utc::now();
    let token      = token::generate();
    let expires_at = now + ttl;

    let hash_str    = token::digest(&token);
    let id_str      = encode_uuid(principal_id);
    let created_str = encode_dt(now);
    let expires_str = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO sessions (token_hash, principal_id, created_at, expires_at)
           VALUES (?1, ?2, ?3, ?4)",
          rusqlite::params![hash_str, id_str, created_str, expires_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(Session { token, principal, expires_at })
  }

  async fn refresh_session(&self, token: &str, ttl: Duration) -> Result<Option<Session>> {
    let hash_str = token::digest(token);
    let lookup   = hash_str.clone();

    let raw: Option<(RawPrincipal, String)> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            "SELECT p.principal_id, p.email, p.created_at, s.expires_at
             FROM sessions s
             JOIN principals p ON p.principal_id = s.principal_id
             WHERE s.token_hash = ?1",
            rusqlite::params![lookup],
            |row| {
              Ok((
                RawPrincipal {
                  principal_id: row.get(0)?,
                  email:        row.get(1)?,
                  created_at:   row.get(2)?,
                },
                row.get(3)?,
              ))
            },
          )
          .optional()?)
      })
      .await?;

    let Some((raw_principal, expires_str)) = raw else {
      return Ok(None);
    };

    let now = Utc::now();
    if decode_dt(&expires_str)? <= now {
      self
        .conn
        .call(move |conn| {
          conn.execute("DELETE FROM sessions WHERE token_hash = ?1", rusqlite::params![hash_str])?;
          Ok(())
        })
        .await?;
      return Ok(None);
    }

    let principal  = raw_principal.into_principal()?;
    let expires_at = now + ttl;
    let new_expiry = encode_dt(expires_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "UPDATE sessions SET expires_at = ?2 WHERE token_hash = ?1",
          rusqlite::params![hash_str, new_expiry],
        )?;
        Ok(())
      })
      .await?;

    Ok(Some(Session { token: token.to_owned(), principal, expires_at }))
  }

  async fn delete_session(&self, token: &str) -> Result<()> {
    let hash_str = token::digest(token);
    self
      .conn
      .call(move |conn| {
        conn.execute("DELETE FROM sessions WHERE token_hash = ?1", rusqlite::params![hash_str])?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn issue_auth_code(&self, principal_id: Uuid, ttl: Duration) -> Result<String> {
    if self.principal_by_id(principal_id).await?.is_none() {
      return Err(Error::PrincipalNotFound(principal_id));
    }

    self.purge_credentials().await?;

    let code        = token::generate();
    let hash_str    = token::digest(&code);
    let id_str      = encode_uuid(principal_id);
    let expires_str = encode_dt(Utc::now() + ttl);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO auth_codes (code_hash, principal_id, expires_at) VALUES (?1, ?2, ?3)",
          rusqlite::params![hash_str, id_str, expires_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(code)
  }

  async fn exchange_auth_code(&self, code: &str, session_ttl: Duration) -> Result<Option<Session>> {
    let hash_str = token::digest(code);
    let now_str  = encode_dt(Utc::now());

    // Consume first so a code can never be redeemed twice, even if it turns
    // out to be expired.
    let row: Option<(String, String)> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let row: Option<(String, String)> = tx
          .query_row(
            "SELECT principal_id, expires_at FROM auth_codes
             WHERE code_hash = ?1 AND consumed_at IS NULL",
            rusqlite::params![hash_str],
            |r| Ok((r.get(0)?, r.get(1)?)),
          )
          .optional()?;
        if row.is_some() {
          tx.execute(
            "UPDATE auth_codes SET consumed_at = ?2 WHERE code_hash = ?1",
            rusqlite::params![hash_str, now_str],
          )?;
        }
        tx.commit()?;
        Ok(row)
      })
      .await?;

    let Some((id_str, expires_str)) = row else {
      return Ok(None);
    };
    if decode_dt(&expires_str)? <= Utc::now() {
      return Ok(None);
    }

    let principal_id = Uuid::parse_str(&id_str)?;
    Ok(Some(self.create_session(principal_id, session_ttl).await?))
  }
}

// ─── ProfileStore impl ───────────────────────────────────────────────────────

impl ProfileStore for SqliteStore {
  type Error = Error;

  async fn profile_for(&self, principal_id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(principal_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE principal_id = ?1"),
            rusqlite::params![id_str],
            RawProfile::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn insert_profile(&self, input: NewProfile) -> Result<Profile> {
    let profile = Profile {
      profile_id:            Uuid::new_v4(),
      principal_id:          input.principal_id,
      name:                  input.name,
      age:                   input.age,
      sex:                   input.sex,
      ethnicity:             input.ethnicity,
      location:              input.location,
      phone:                 input.phone,
      email:                 input.email,
      condition:             input.condition,
      medications:           input.medications,
      condition_description: input.condition_description,
      allergies:             input.allergies,
      created_at:            Utc::now(),
    };

    let p          = profile.clone();
    let profile_id = encode_uuid(p.profile_id);
    let owner_id   = encode_uuid(p.principal_id);
    let sex_str    = encode_sex(p.sex);
    let at_str     = encode_dt(p.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        match conn.execute(
          &format!(
            "INSERT INTO profiles ({PROFILE_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)"
          ),
          rusqlite::params![
            profile_id,
            owner_id,
            p.name,
            p.age,
            sex_str,
            p.ethnicity,
            p.location,
            p.phone,
            p.email,
            p.condition,
            p.medications,
            p.condition_description,
            p.allergies,
            at_str,
          ],
        ) {
          Ok(_) => Ok(true),
          Err(e) if is_constraint_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    if !inserted {
      // Either the profile already exists or the principal is unknown
      // (foreign key); tell them apart.
      if self.principal_by_id(profile.principal_id).await?.is_none() {
        return Err(Error::PrincipalNotFound(profile.principal_id));
      }
      return Err(Error::ProfileExists(profile.principal_id));
    }
    Ok(profile)
  }
}

// ─── TrialStore impl ─────────────────────────────────────────────────────────

impl TrialStore for SqliteStore {
  type Error = Error;

  async fn upsert_trials(&self, rows: Vec<TrialRow>) -> Result<usize> {
    let encoded = rows
      .into_iter()
      .map(EncodedTrial::encode)
      .collect::<Result<Vec<_>>>()?;

    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare(&format!(
            "INSERT INTO trials ({TRIAL_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)
             ON CONFLICT(nct_id) DO UPDATE SET
               title       = excluded.title,
               conditions  = excluded.conditions,
               keywords    = excluded.keywords,
               phase       = excluded.phase,
               locations   = excluded.locations,
               start_date  = excluded.start_date,
               status      = excluded.status,
               enrollment  = excluded.enrollment,
               description = excluded.description,
               eligibility = excluded.eligibility,
               sex         = excluded.sex,
               minimum_age = excluded.minimum_age,
               maximum_age = excluded.maximum_age,
               updated_at  = excluded.updated_at"
          ))?;
          for t in &encoded {
            stmt.execute(rusqlite::params![
              t.nct_id,
              t.title,
              t.conditions,
              t.keywords,
              t.phase,
              t.locations,
              t.start_date,
              t.status,
              t.enrollment,
              t.description,
              t.eligibility,
              t.sex,
              t.minimum_age,
              t.maximum_age,
              t.updated_at,
            ])?;
          }
        }
        tx.commit()?;
        Ok(encoded.len())
      })
      .await?;

    Ok(written)
  }

  async fn get_trial(&self, nct_id: &str) -> Result<Option<TrialRow>> {
    let id = nct_id.to_owned();

    let raw: Option<RawTrial> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {TRIAL_COLUMNS} FROM trials WHERE nct_id = ?1"),
            rusqlite::params![id],
            RawTrial::from_row,
          )
          .optional()?)
      })
      .await?;

    raw.map(RawTrial::into_row).transpose()
  }

  async fn list_trials(&self, query: &TrialQuery) -> Result<Vec<TrialRow>> {
    let text_pattern = query
      .text
      .as_deref()
      .map(str::trim)
      .filter(|t| !t.is_empty())
      .map(|t| format!("%{}%", t.to_lowercase()));
    let status     = query.status.clone();
    let limit_val  = query.limit.unwrap_or(50) as i64;
    let offset_val = query.offset.unwrap_or(0) as i64;

    let raws: Vec<RawTrial> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&format!(
          "SELECT {TRIAL_COLUMNS} FROM trials
           WHERE (?1 IS NULL
                  OR lower(title)      LIKE ?1
                  OR lower(conditions) LIKE ?1
                  OR lower(keywords)   LIKE ?1)
             AND (?2 IS NULL OR status = ?2)
           ORDER BY updated_at DESC, nct_id
           LIMIT ?3 OFFSET ?4"
        ))?;
        let rows = stmt
          .query_map(
            rusqlite::params![text_pattern.as_deref(), status.as_deref(), limit_val, offset_val],
            RawTrial::from_row,
          )?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTrial::into_row).collect()
  }
}
