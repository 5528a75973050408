//! Clinical-trial records.
//!
//! [`TrialRecord`] is the normalised snapshot of one registry study.
//! [`TrialRow`] is its persisted shape: locations flattened to display
//! strings, keyed by the NCT id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Substituted for a location without a facility name.
pub const UNKNOWN_FACILITY: &str = "Unknown Facility";
/// Substituted for a location without a country.
pub const UNKNOWN_COUNTRY: &str = "Unknown Country";

/// One trial site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialLocation {
  pub facility: Option<String>,
  pub city:     Option<String>,
  pub state:    Option<String>,
  pub country:  Option<String>,
}

impl TrialLocation {
  /// `"facility, country"`, with placeholders for missing parts.
  pub fn flatten(&self) -> String {
    format!(
      "{}, {}",
      self.facility.as_deref().unwrap_or(UNKNOWN_FACILITY),
      self.country.as_deref().unwrap_or(UNKNOWN_COUNTRY),
    )
  }
}

/// A normalised registry study. Every field is populated; absent registry
/// data has already been replaced by its documented default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRecord {
  pub nct_id:       String,
  pub title:        String,
  pub conditions:   Vec<String>,
  pub keywords:     Vec<String>,
  pub phase:        String,
  pub locations:    Vec<TrialLocation>,
  pub start_date:   String,
  pub status:       String,
  pub enrollment:   Option<u32>,
  pub description:  String,
  pub eligibility:  String,
  pub sex:          String,
  pub minimum_age:  String,
  pub maximum_age:  String,
}

/// The persisted form of a trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialRow {
  pub nct_id:       String,
  pub title:        String,
  pub conditions:   Vec<String>,
  pub keywords:     Vec<String>,
  pub phase:        String,
  /// `"facility, country"` strings.
  pub locations:    Vec<String>,
  pub start_date:   String,
  pub status:       String,
  pub enrollment:   Option<u32>,
  pub description:  String,
  pub eligibility:  String,
  pub sex:          String,
  pub minimum_age:  String,
  pub maximum_age:  String,
  pub updated_at:   DateTime<Utc>,
}

impl TrialRecord {
  /// Convert into the persisted shape, stamping `updated_at`.
  pub fn into_row(self, updated_at: DateTime<Utc>) -> TrialRow {
    TrialRow {
      locations: self.locations.iter().map(TrialLocation::flatten).collect(),
      nct_id: self.nct_id,
      title: self.title,
      conditions: self.conditions,
      keywords: self.keywords,
      phase: self.phase,
      start_date: self.start_date,
      status: self.status,
      enrollment: self.enrollment,
      description: self.description,
      eligibility: self.eligibility,
      sex: self.sex,
      minimum_age: self.minimum_age,
      maximum_age: self.maximum_age,
      updated_at,
    }
  }
}

/// Parameters for [`TrialStore::list_trials`](crate::store::TrialStore::list_trials).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrialQuery {
  /// Case-insensitive substring match over title, conditions and keywords.
  pub text:   Option<String>,
  /// Exact (humanised) status, e.g. `Recruiting`.
  pub status: Option<String>,
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn flatten_uses_placeholders() {
    let full = TrialLocation {
      facility: Some("Mass General".into()),
      city:     Some("Boston".into()),
      state:    Some("Massachusetts".into()),
      country:  Some("United States".into()),
    };
    assert_eq!(full.flatten(), "Mass General, United States");

    let bare = TrialLocation::default();
    assert_eq!(bare.flatten(), "Unknown Facility, Unknown Country");
  }
}
