//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! All timestamps are stored as RFC 3339 strings. String lists are stored as
//! compact JSON arrays. UUIDs are stored as hyphenated lowercase strings.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use healthhub_core::{
  principal::Principal,
  profile::{Profile, Sex},
  trial::TrialRow,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Sex ─────────────────────────────────────────────────────────────────────

pub fn encode_sex(sex: Sex) -> &'static str { sex.into() }

pub fn decode_sex(s: &str) -> Result<Sex> {
  Sex::from_str(s).map_err(|_| Error::Corrupt { column: "sex", value: s.to_owned() })
}

// ─── String lists ────────────────────────────────────────────────────────────

pub fn encode_list(items: &[String]) -> Result<String> { Ok(serde_json::to_string(items)?) }

pub fn decode_list(s: &str) -> Result<Vec<String>> { Ok(serde_json::from_str(s)?) }

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `principals` row.
pub struct RawPrincipal {
  pub principal_id: String,
  pub email:        String,
  pub created_at:   String,
}

impl RawPrincipal {
  pub fn into_principal(self) -> Result<Principal> {
    Ok(Principal {
      principal_id: decode_uuid(&self.principal_id)?,
      email:        self.email,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `profiles` row.
pub struct RawProfile {
  pub profile_id:            String,
  pub principal_id:          String,
  pub name:                  String,
  pub age:                   i64,
  pub sex:                   String,
  pub ethnicity:             String,
  pub location:              String,
  pub phone:                 String,
  pub email:                 String,
  pub condition:             String,
  pub medications:           Option<String>,
  pub condition_description: Option<String>,
  pub allergies:             Option<String>,
  pub created_at:            String,
}

/// Column list matching [`RawProfile::from_row`].
pub const PROFILE_COLUMNS: &str = "profile_id, principal_id, name, age, sex, ethnicity, \
  location, phone, email, condition, medications, condition_description, allergies, created_at";

impl RawProfile {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      profile_id:            row.get(0)?,
      principal_id:          row.get(1)?,
      name:                  row.get(2)?,
      age:                   row.get(3)?,
      sex:                   row.get(4)?,
      ethnicity:             row.get(5)?,
      location:              row.get(6)?,
      phone:                 row.get(7)?,
      email:                 row.get(8)?,
      condition:             row.get(9)?,
      medications:           row.get(10)?,
      condition_description: row.get(11)?,
      allergies:             row.get(12)?,
      created_at:            row.get(13)?,
    })
  }

  pub fn into_profile(self) -> Result<Profile> {
    let age = u8::try_from(self.age)
      .map_err(|_| Error::Corrupt { column: "age", value: self.age.to_string() })?;

    Ok(Profile {
      profile_id:            decode_uuid(&self.profile_id)?,
      principal_id:          decode_uuid(&self.principal_id)?,
      name:                  self.name,
      age,
      sex:                   decode_sex(&self.sex)?,
      ethnicity:             self.ethnicity,
      location:              self.location,
      phone:                 self.phone,
      email:                 self.email,
      condition:             self.condition,
      medications:           self.medications,
      condition_description: self.condition_description,
      allergies:             self.allergies,
      created_at:            decode_dt(&self.created_at)?,
    })
  }
}

/// Raw values read directly from a `trials` row.
pub struct RawTrial {
  pub nct_id:      String,
  pub title:       String,
  pub conditions:  String,
  pub keywords:    String,
  pub phase:       String,
  pub locations:   String,
  pub start_date:  String,
  pub status:      String,
  pub enrollment:  Option<i64>,
  pub description: String,
  pub eligibility: String,
  pub sex:         String,
  pub minimum_age: String,
  pub maximum_age: String,
  pub updated_at:  String,
}

/// Column list matching [`RawTrial::from_row`].
pub const TRIAL_COLUMNS: &str = "nct_id, title, conditions, keywords, phase, locations, \
  start_date, status, enrollment, description, eligibility, sex, minimum_age, maximum_age, \
  updated_at";

impl RawTrial {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      nct_id:      row.get(0)?,
      title:       row.get(1)?,
      conditions:  row.get(2)?,
      keywords:    row.get(3)?,
      phase:       row.get(4)?,
      locations:   row.get(5)?,
      start_date:  row.get(6)?,
      status:      row.get(7)?,
      enrollment:  row.get(8)?,
      description: row.get(9)?,
      eligibility: row.get(10)?,
      sex:         row.get(11)?,
      minimum_age: row.get(12)?,
      maximum_age: row.get(13)?,
      updated_at:  row.get(14)?,
    })
  }

  pub fn into_row(self) -> Result<TrialRow> {
    let enrollment = self
      .enrollment
      .map(|n| {
        u32::try_from(n).map_err(|_| Error::Corrupt { column: "enrollment", value: n.to_string() })
      })
      .transpose()?;

    Ok(TrialRow {
      nct_id:      self.nct_id,
      title:       self.title,
      conditions:  decode_list(&self.conditions)?,
      keywords:    decode_list(&self.keywords)?,
      phase:       self.phase,
      locations:   decode_list(&self.locations)?,
      start_date:  self.start_date,
      status:      self.status,
      enrollment,
      description: self.description,
      eligibility: self.eligibility,
      sex:         self.sex,
      minimum_age: self.minimum_age,
      maximum_age: self.maximum_age,
      updated_at:  decode_dt(&self.updated_at)?,
    })
  }
}

/// A [`TrialRow`] with every column already rendered for binding, so the
/// write closure cannot fail on encoding.
pub struct EncodedTrial {
  pub nct_id:      String,
  pub title:       String,
  pub conditions:  String,
  pub keywords:    String,
  pub phase:       String,
  pub locations:   String,
  pub start_date:  String,
  pub status:      String,
  pub enrollment:  Option<i64>,
  pub description: String,
  pub eligibility: String,
  pub sex:         String,
  pub minimum_age: String,
  pub maximum_age: String,
  pub updated_at:  String,
}

impl EncodedTrial {
  pub fn encode(row: TrialRow) -> Result<Self> {
    Ok(Self {
      conditions:  encode_list(&row.conditions)?,
      keywords:    encode_list(&row.keywords)?,
      locations:   encode_list(&row.locations)?,
      enrollment:  row.enrollment.map(i64::from),
      updated_at:  encode_dt(row.updated_at),
      nct_id:      row.nct_id,
      title:       row.title,
      phase:       row.phase,
      start_date:  row.start_date,
      status:      row.status,
      description: row.description,
      eligibility: row.eligibility,
      sex:         row.sex,
      minimum_age: row.minimum_age,
      maximum_age: row.maximum_age,
    })
  }
}
