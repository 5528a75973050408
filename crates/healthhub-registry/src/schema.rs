//! The subset of the ClinicalTrials.gov v2 study document that ingestion
//! reads.
//!
//! Every field is optional and defaults to empty, so a study missing any
//! nested section still decodes. Fields are decoded one at a time: a value of
//! the wrong shape (a string count, a `null` inside a list) falls back to that
//! field's default and leaves its siblings intact. Only an entry that is not
//! an object at all is replaced by [`Study::default`].

use serde::{Deserialize, Deserializer, de::DeserializeOwned};
use serde_json::Value;
use strum::{AsRefStr, EnumString};

use crate::Result;

// ─── Page ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct RawPage {
  studies: Vec<Value>,
}

/// Decode a search response body into studies, tolerating malformed entries.
pub fn decode_page(body: &[u8]) -> Result<Vec<Study>> {
  let page: RawPage = serde_json::from_slice(body)?;

  Ok(
    page
      .studies
      .into_iter()
      .enumerate()
      .map(|(index, value)| {
        serde_json::from_value(value).unwrap_or_else(|e| {
          tracing::warn!(index, error = %e, "study is not an object; using defaults");
          Study::default()
        })
      })
      .collect(),
  )
}

// ─── Lenient fields ──────────────────────────────────────────────────────────

/// Decode `T`, or its default when the value has the wrong shape.
fn lenient<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned + Default,
{
  let value = Value::deserialize(deserializer)?;
  Ok(serde_json::from_value(value).unwrap_or_else(|e| {
    tracing::debug!(error = %e, "field does not match schema; using default");
    T::default()
  }))
}

/// Decode a list, dropping the entries that have the wrong shape.
fn lenient_list<'de, D, T>(deserializer: D) -> std::result::Result<Vec<T>, D::Error>
where
  D: Deserializer<'de>,
  T: DeserializeOwned,
{
  match Value::deserialize(deserializer)? {
    Value::Array(items) => Ok(
      items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect(),
    ),
    _ => Ok(Vec::new()),
  }
}

// ─── Study ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Study {
  #[serde(deserialize_with = "lenient")]
  pub protocol_section: Option<ProtocolSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolSection {
  #[serde(deserialize_with = "lenient")]
  pub identification_module:     Option<IdentificationModule>,
  #[serde(deserialize_with = "lenient")]
  pub status_module:             Option<StatusModule>,
  #[serde(deserialize_with = "lenient")]
  pub conditions_module:         Option<ConditionsModule>,
  #[serde(deserialize_with = "lenient")]
  pub design_module:             Option<DesignModule>,
  #[serde(deserialize_with = "lenient")]
  pub description_module:        Option<DescriptionModule>,
  #[serde(deserialize_with = "lenient")]
  pub eligibility_module:        Option<EligibilityModule>,
  #[serde(deserialize_with = "lenient")]
  pub contacts_locations_module: Option<ContactsLocationsModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentificationModule {
  #[serde(deserialize_with = "lenient")]
  pub nct_id:         Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub brief_title:    Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub official_title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatusModule {
  /// Raw registry enum, e.g. `RECRUITING`.
  #[serde(deserialize_with = "lenient")]
  pub overall_status:    Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub start_date_struct: Option<DateStruct>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DateStruct {
  #[serde(deserialize_with = "lenient")]
  pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConditionsModule {
  #[serde(deserialize_with = "lenient_list")]
  pub conditions: Vec<String>,
  #[serde(deserialize_with = "lenient_list")]
  pub keywords:   Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DesignModule {
  /// Raw registry enums, e.g. `["PHASE1", "PHASE2"]`.
  #[serde(deserialize_with = "lenient_list")]
  pub phases:          Vec<String>,
  #[serde(deserialize_with = "lenient")]
  pub enrollment_info: Option<EnrollmentInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EnrollmentInfo {
  #[serde(deserialize_with = "lenient")]
  pub count: Option<u32>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DescriptionModule {
  #[serde(deserialize_with = "lenient")]
  pub brief_summary:        Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub detailed_description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EligibilityModule {
  #[serde(deserialize_with = "lenient")]
  pub eligibility_criteria: Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub sex:                  Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub minimum_age:          Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub maximum_age:          Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactsLocationsModule {
  #[serde(deserialize_with = "lenient_list")]
  pub locations: Vec<Location>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Location {
  #[serde(deserialize_with = "lenient")]
  pub facility: Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub city:     Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub state:    Option<String>,
  #[serde(deserialize_with = "lenient")]
  pub country:  Option<String>,
}

// ─── Overall status ──────────────────────────────────────────────────────────

/// Registry recruitment status values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, AsRefStr, EnumString)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
  ActiveNotRecruiting,
  Completed,
  EnrollingByInvitation,
  NotYetRecruiting,
  Recruiting,
  Suspended,
  Terminated,
  Withdrawn,
  Available,
  NoLongerAvailable,
  TemporarilyNotAvailable,
  ApprovedForMarketing,
  Withheld,
  Unknown,
}

impl OverallStatus {
  /// Display label, as listings show it.
  pub fn label(self) -> &'static str {
    match self {
      Self::ActiveNotRecruiting     => "Active, not recruiting",
      Self::Completed               => "Completed",
      Self::EnrollingByInvitation   => "Enrolling by invitation",
      Self::NotYetRecruiting        => "Not yet recruiting",
      Self::Recruiting              => "Recruiting",
      Self::Suspended               => "Suspended",
      Self::Terminated              => "Terminated",
      Self::Withdrawn               => "Withdrawn",
      Self::Available               => "Available",
      Self::NoLongerAvailable       => "No longer available",
      Self::TemporarilyNotAvailable => "Temporarily not available",
      Self::ApprovedForMarketing    => "Approved for marketing",
      Self::Withheld                => "Withheld",
      Self::Unknown                 => "Unknown",
    }
  }
}
