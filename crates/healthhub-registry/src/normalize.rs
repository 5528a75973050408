//! Pure mapping from a registry [`Study`] to a [`TrialRecord`].
//!
//! Absent data never fails; it is replaced by the defaults below.

use std::str::FromStr;

use healthhub_core::trial::{TrialLocation, TrialRecord};

use crate::schema::{OverallStatus, Study};

pub const UNKNOWN_ID: &str = "Unknown ID";
pub const NO_TITLE: &str = "No Title";
pub const NOT_SPECIFIED: &str = "Not Specified";
pub const UNKNOWN_STATUS: &str = "Unknown";
pub const NO_DESCRIPTION: &str = "No description available";

/// Non-blank owned copy of `value`, or `None`.
fn text(value: Option<&String>) -> Option<String> {
  value.map(|s| s.trim()).filter(|s| !s.is_empty()).map(str::to_owned)
}

fn or_default(value: Option<&String>, default: &str) -> String {
  text(value).unwrap_or_else(|| default.to_owned())
}

/// `PHASE2` → `Phase 2`, `EARLY_PHASE1` → `Early Phase 1`, `NA` → `Not
/// Applicable`. Unrecognised values pass through unchanged.
pub fn humanize_phase(raw: &str) -> String {
  match raw {
    "NA" => "Not Applicable".to_owned(),
    _ => {
      if let Some(n) = raw.strip_prefix("EARLY_PHASE") {
        format!("Early Phase {n}")
      } else if let Some(n) = raw.strip_prefix("PHASE") {
        format!("Phase {n}")
      } else {
        raw.to_owned()
      }
    }
  }
}

/// Registry status enum → display label. Unrecognised values pass through.
pub fn humanize_status(raw: &str) -> String {
  OverallStatus::from_str(raw)
    .map(|s| s.label().to_owned())
    .unwrap_or_else(|_| raw.to_owned())
}

/// Normalise one study. Never fails.
pub fn normalize(study: &Study) -> TrialRecord {
  let ps = study.protocol_section.clone().unwrap_or_default();

  let ident       = ps.identification_module.unwrap_or_default();
  let status      = ps.status_module.unwrap_or_default();
  let conditions  = ps.conditions_module.unwrap_or_default();
  let design      = ps.design_module.unwrap_or_default();
  let description = ps.description_module.unwrap_or_default();
  let eligibility = ps.eligibility_module.unwrap_or_default();
  let contacts    = ps.contacts_locations_module.unwrap_or_default();

  let title = text(ident.brief_title.as_ref())
    .or_else(|| text(ident.official_title.as_ref()))
    .unwrap_or_else(|| NO_TITLE.to_owned());

  let phases: Vec<String> = design
    .phases
    .iter()
    .map(|p| p.trim())
    .filter(|p| !p.is_empty())
    .map(humanize_phase)
    .collect();
  let phase = if phases.is_empty() { NOT_SPECIFIED.to_owned() } else { phases.join("/") };

  let status_label = text(status.overall_status.as_ref())
    .map(|s| humanize_status(&s))
    .unwrap_or_else(|| UNKNOWN_STATUS.to_owned());

  let start_date = or_default(
    status.start_date_struct.as_ref().and_then(|d| d.date.as_ref()),
    NOT_SPECIFIED,
  );

  let locations = contacts
    .locations
    .iter()
    .map(|l| TrialLocation {
      facility: text(l.facility.as_ref()),
      city:     text(l.city.as_ref()),
      state:    text(l.state.as_ref()),
      country:  text(l.country.as_ref()),
    })
    .collect();

  TrialRecord {
    nct_id: or_default(ident.nct_id.as_ref(), UNKNOWN_ID),
    title,
    conditions: conditions.conditions,
    keywords: conditions.keywords,
    phase,
    locations,
    start_date,
    status: status_label,
    enrollment: design.enrollment_info.and_then(|e| e.count),
    description: text(description.brief_summary.as_ref())
      .or_else(|| text(description.detailed_description.as_ref()))
      .unwrap_or_else(|| NO_DESCRIPTION.to_owned()),
    eligibility: or_default(eligibility.eligibility_criteria.as_ref(), NOT_SPECIFIED),
    sex: or_default(eligibility.sex.as_ref(), NOT_SPECIFIED),
    minimum_age: or_default(eligibility.minimum_age.as_ref(), NOT_SPECIFIED),
    maximum_age: or_default(eligibility.maximum_age.as_ref(), NOT_SPECIFIED),
  }
}
