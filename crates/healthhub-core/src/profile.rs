//! Profile records: the stored outcome of the onboarding questionnaire.
//!
//! The existence of a [`Profile`] for a principal is the only signal that
//! onboarding is complete. Profiles are written once and never updated.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString, IntoStaticStr};
use uuid::Uuid;

use crate::{Error, Result, principal::Principal};

/// Self-reported sex, as offered by the questionnaire.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString, IntoStaticStr,
)]
pub enum Sex {
  Male,
  Female,
  Other,
  #[serde(rename = "Prefer not to say")]
  #[strum(serialize = "Prefer not to say")]
  PreferNotToSay,
}

/// A completed questionnaire bound to a principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
  pub profile_id:            Uuid,
  pub principal_id:          Uuid,
  pub name:                  String,
  pub age:                   u8,
  pub sex:                   Sex,
  pub ethnicity:             String,
  pub location:              String,
  pub phone:                 String,
  pub email:                 String,
  pub condition:             String,
  pub medications:           Option<String>,
  pub condition_description: Option<String>,
  pub allergies:             Option<String>,
  pub created_at:            DateTime<Utc>,
}

/// A validated profile ready to be inserted. The store assigns the id and
/// creation timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewProfile {
  pub principal_id:          Uuid,
  pub name:                  String,
  pub age:                   u8,
  pub sex:                   Sex,
  pub ethnicity:             String,
  pub location:              String,
  pub phone:                 String,
  pub email:                 String,
  pub condition:             String,
  pub medications:           Option<String>,
  pub condition_description: Option<String>,
  pub allergies:             Option<String>,
}

// ─── Questionnaire input ─────────────────────────────────────────────────────

/// Raw questionnaire submission as it arrives from a form. Every field is
/// text; [`Questionnaire::validate`] turns it into a [`NewProfile`].
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Questionnaire {
  pub name:                  String,
  pub age:                   String,
  pub sex:                   String,
  pub ethnicity:             String,
  pub location:              String,
  pub phone:                 String,
  pub email:                 String,
  pub condition:             String,
  pub medications:           String,
  pub condition_description: String,
  pub allergies:             String,
}

const MAX_AGE: u8 = 150;

impl Questionnaire {
  /// Validate the submission for `principal`.
  ///
  /// A blank email falls back to the principal's own address.
  pub fn validate(self, principal: &Principal) -> Result<NewProfile> {
    let name      = required("name", self.name)?;
    let ethnicity = required("ethnicity", self.ethnicity)?;
    let location  = required("location", self.location)?;
    let phone     = required("phone", self.phone)?;
    let condition = required("condition", self.condition)?;

    let age_str = required("age", self.age)?;
    let age = age_str
      .parse::<u8>()
      .ok()
      .filter(|a| *a <= MAX_AGE)
      .ok_or_else(|| Error::InvalidProfile(format!("age {age_str:?} is not a valid age")))?;

    let sex = Sex::from_str(self.sex.trim())
      .map_err(|_| Error::UnknownSex(self.sex.clone()))?;

    let email = optional(self.email).unwrap_or_else(|| principal.email.clone());

    Ok(NewProfile {
      principal_id: principal.principal_id,
      name,
      age,
      sex,
      ethnicity,
      location,
      phone,
      email,
      condition,
      medications: optional(self.medications),
      condition_description: optional(self.condition_description),
      allergies: optional(self.allergies),
    })
  }
}

fn required(field: &str, value: String) -> Result<String> {
  optional(value).ok_or_else(|| Error::InvalidProfile(format!("{field} is required")))
}

fn optional(value: String) -> Option<String> {
  let trimmed = value.trim();
  if trimmed.is_empty() { None } else { Some(trimmed.to_owned()) }
}
