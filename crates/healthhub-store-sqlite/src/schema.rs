//! SQL schema for the Health Mapping Hub SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS principals (
    principal_id  TEXT PRIMARY KEY,
    email         TEXT NOT NULL UNIQUE,   -- trimmed + lowercased
    password_hash TEXT NOT NULL,          -- argon2 PHC string
    created_at    TEXT NOT NULL
);

-- Only the SHA-256 digest of a bearer token is stored.
CREATE TABLE IF NOT EXISTS sessions (
    token_hash    TEXT PRIMARY KEY,
    principal_id  TEXT NOT NULL REFERENCES principals(principal_id),
    created_at    TEXT NOT NULL,
    expires_at    TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS auth_codes (
    code_hash     TEXT PRIMARY KEY,
    principal_id  TEXT NOT NULL REFERENCES principals(principal_id),
    expires_at    TEXT NOT NULL,
    consumed_at   TEXT
);

-- One questionnaire per principal. Rows are never updated.
CREATE TABLE IF NOT EXISTS profiles (
    profile_id            TEXT PRIMARY KEY,
    principal_id          TEXT NOT NULL UNIQUE REFERENCES principals(principal_id),
    name                  TEXT NOT NULL,
    age                   INTEGER NOT NULL,
    sex                   TEXT NOT NULL,
    ethnicity             TEXT NOT NULL,
    location              TEXT NOT NULL,
    phone                 TEXT NOT NULL,
    email                 TEXT NOT NULL,
    condition             TEXT NOT NULL,
    medications           TEXT,
    condition_description TEXT,
    allergies             TEXT,
    created_at            TEXT NOT NULL
);

-- Registry snapshots keyed by NCT id. Stale rows are never deleted.
CREATE TABLE IF NOT EXISTS trials (
    nct_id       TEXT PRIMARY KEY,
    title        TEXT NOT NULL,
    conditions   TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    keywords     TEXT NOT NULL DEFAULT '[]',   -- JSON array of strings
    phase        TEXT NOT NULL,
    locations    TEXT NOT NULL DEFAULT '[]',   -- JSON array of 'facility, country'
    start_date   TEXT NOT NULL,
    status       TEXT NOT NULL,
    enrollment   INTEGER,
    description  TEXT NOT NULL,
    eligibility  TEXT NOT NULL,
    sex          TEXT NOT NULL,
    minimum_age  TEXT NOT NULL,
    maximum_age  TEXT NOT NULL,
    updated_at   TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS sessions_principal_idx ON sessions(principal_id);
CREATE INDEX IF NOT EXISTS trials_status_idx      ON trials(status);
CREATE INDEX IF NOT EXISTS trials_updated_idx     ON trials(updated_at);

PRAGMA user_version = 1;
";
