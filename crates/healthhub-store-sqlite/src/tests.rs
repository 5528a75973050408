//! Integration tests for `SqliteStore` against an in-memory database.

use chrono::{Duration, Utc};
use healthhub_core::{
  profile::{NewProfile, Sex},
  store::{IdentityStore, ProfileStore, TrialStore},
  trial::{TrialQuery, TrialRow},
};
use uuid::Uuid;

use crate::{Error, SqliteStore};

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

const HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$c2FsdA$aGFzaA";

// ─── Principals ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_find_principal() {
  let s = store().await;

  let p = s.create_principal("Pat@Example.com ", HASH).await.unwrap();
  assert_eq!(p.email, "pat@example.com");

  let (found, hash) = s
    .find_principal_by_email("PAT@example.com")
    .await
    .unwrap()
    .expect("principal");
  assert_eq!(found.principal_id, p.principal_id);
  assert_eq!(hash, HASH);
}

#[tokio::test]
async fn duplicate_email_is_rejected() {
  let s = store().await;
  s.create_principal("pat@example.com", HASH).await.unwrap();

  let err = s.create_principal("PAT@example.com", HASH).await.unwrap_err();
  assert!(matches!(err, Error::EmailTaken(ref e) if e == "pat@example.com"));
}

#[tokio::test]
async fn find_unknown_email_returns_none() {
  let s = store().await;
  assert!(s.find_principal_by_email("nobody@example.com").await.unwrap().is_none());
}

// ─── Sessions ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn session_resolves_and_slides_expiry() {
  let s = store().await;
  let p = s.create_principal("pat@example.com", HASH).await.unwrap();

  let session = s.create_session(p.principal_id, Duration::minutes(5)).await.unwrap();
  assert_eq!(session.principal, p);

  let refreshed = s
    .refresh_session(&session.token, Duration::hours(24))
    .await
    .unwrap()
    .expect("live session");
  assert_eq!(refreshed.principal.principal_id, p.principal_id);
  assert_eq!(refreshed.token, session.token);
  assert!(refreshed.expires_at > session.expires_at);
}

#[tokio::test]
async fn unknown_token_resolves_to_none() {
  let s = store().await;
  assert!(s.refresh_session("not-a-token", Duration::hours(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn expired_session_resolves_to_none_and_is_removed() {
  let s = store().await;
  let p = s.create_principal("pat@example.com", HASH).await.unwrap();
  let session = s.create_session(p.principal_id, Duration::seconds(-1)).await.unwrap();

  assert!(s.refresh_session(&session.token, Duration::hours(1)).await.unwrap().is_none());
  // A later refresh must not resurrect it.
  assert!(s.refresh_session(&session.token, Duration::hours(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn new_credentials_purge_dead_ones() {
  let s = store().await;
  let p = s.create_principal("pat@example.com", HASH).await.unwrap();

  s.create_session(p.principal_id, Duration::seconds(-1)).await.unwrap();
  s.issue_auth_code(p.principal_id, Duration::seconds(-1)).await.unwrap();
  let redeemed = s.issue_auth_code(p.principal_id, Duration::minutes(10)).await.unwrap();
  // Consuming the code also writes a session, which purges the expired rows.
  s.exchange_auth_code(&redeemed, Duration::hours(1)).await.unwrap().expect("exchange");
  assert_eq!(s.row_count("sessions").await.unwrap(), 1);

  let live = s.issue_auth_code(p.principal_id, Duration::minutes(10)).await.unwrap();
  assert_eq!(s.row_count("auth_codes").await.unwrap(), 1);
  assert!(s.exchange_auth_code(&live, Duration::hours(1)).await.unwrap().is_some());
}

#[tokio::test]
async fn deleted_session_no_longer_resolves() {
  let s = store().await;
  let p = s.create_principal("pat@example.com", HASH).await.unwrap();
  let session = s.create_session(p.principal_id, Duration::hours(1)).await.unwrap();

  s.delete_session(&session.token).await.unwrap();
  assert!(s.refresh_session(&session.token, Duration::hours(1)).await.unwrap().is_none());
  // Deleting twice is harmless.
  s.delete_session(&session.token).await.unwrap();
}

#[tokio::test]
async fn session_for_unknown_principal_is_rejected() {
  let s = store().await;
  let missing = Uuid::new_v4();
  let err = s.create_session(missing, Duration::hours(1)).await.unwrap_err();
  assert!(matches!(err, Error::PrincipalNotFound(id) if id == missing));
}

// ─── Auth codes ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn auth_code_exchanges_exactly_once() {
  let s = store().await;
  let p = s.create_principal("pat@example.com", HASH).await.unwrap();
  let code = s.issue_auth_code(p.principal_id, Duration::minutes(10)).await.unwrap();

  let session = s
    .exchange_auth_code(&code, Duration::hours(1))
    .await
    .unwrap()
    .expect("first exchange");
  assert_eq!(session.principal.principal_id, p.principal_id);

  assert!(s.exchange_auth_code(&code, Duration::hours(1)).await.unwrap().is_none());
}

#[tokio::test]
async fn expired_auth_code_is_refused() {
  let s = store().await;
  let p = s.create_principal("pat@example.com", HASH).await.unwrap();
  let code = s.issue_auth_code(p.principal_id, Duration::seconds(-1)).await.unwrap();

  assert!(s.exchange_auth_code(&code, Duration::hours(1)).await.unwrap().is_none());
}

// ─── Profiles ────────────────────────────────────────────────────────────────

fn new_profile(principal_id: Uuid) -> NewProfile {
  NewProfile {
    principal_id,
    name: "Pat Doe".into(),
    age: 42,
    sex: Sex::Female,
    ethnicity: "Hispanic".into(),
    location: "Boston, MA".into(),
    phone: "555-0100".into(),
    email: "pat@example.com".into(),
    condition: "Fabry disease".into(),
    medications: Some("Migalastat".into()),
    condition_description: None,
    allergies: None,
  }
}

#[tokio::test]
async fn profile_absent_until_inserted() {
  let s = store().await;
  let p = s.create_principal("pat@example.com", HASH).await.unwrap();
  assert!(s.profile_for(p.principal_id).await.unwrap().is_none());

  let inserted = s.insert_profile(new_profile(p.principal_id)).await.unwrap();
  let fetched = s.profile_for(p.principal_id).await.unwrap().expect("profile");
  assert_eq!(fetched, inserted);
  assert_eq!(fetched.sex, Sex::Female);
  assert_eq!(fetched.medications.as_deref(), Some("Migalastat"));
}

#[tokio::test]
async fn multi_word_sex_survives_the_column() {
  let s = store().await;
  let p = s.create_principal("pat@example.com", HASH).await.unwrap();
  let input = NewProfile { sex: Sex::PreferNotToSay, ..new_profile(p.principal_id) };
  s.insert_profile(input).await.unwrap();

  let fetched = s.profile_for(p.principal_id).await.unwrap().expect("profile");
  assert_eq!(fetched.sex, Sex::PreferNotToSay);
}

#[tokio::test]
async fn second_profile_for_same_principal_is_rejected() {
  let s = store().await;
  let p = s.create_principal("pat@example.com", HASH).await.unwrap();
  s.insert_profile(new_profile(p.principal_id)).await.unwrap();

  let err = s.insert_profile(new_profile(p.principal_id)).await.unwrap_err();
  assert!(matches!(err, Error::ProfileExists(id) if id == p.principal_id));
}

#[tokio::test]
async fn profile_for_unknown_principal_is_rejected() {
  let s = store().await;
  let missing = Uuid::new_v4();
  let err = s.insert_profile(new_profile(missing)).await.unwrap_err();
  assert!(matches!(err, Error::PrincipalNotFound(id) if id == missing));
}

// ─── Trials ──────────────────────────────────────────────────────────────────

fn trial(nct_id: &str, title: &str, status: &str) -> TrialRow {
  TrialRow {
    nct_id:      nct_id.into(),
    title:       title.into(),
    conditions:  vec!["Fabry Disease".into()],
    keywords:    vec!["enzyme replacement".into()],
    phase:       "Phase 2".into(),
    locations:   vec!["Mass General, United States".into()],
    start_date:  "2024-03".into(),
    status:      status.into(),
    enrollment:  Some(30),
    description: "A study.".into(),
    eligibility: "Adults".into(),
    sex:         "ALL".into(),
    minimum_age: "18 Years".into(),
    maximum_age: "Not Specified".into(),
    updated_at:  Utc::now(),
  }
}

#[tokio::test]
async fn upsert_inserts_then_replaces() {
  let s = store().await;

  let written = s
    .upsert_trials(vec![trial("NCT1", "First", "Recruiting"), trial("NCT2", "Second", "Recruiting")])
    .await
    .unwrap();
  assert_eq!(written, 2);

  s.upsert_trials(vec![trial("NCT1", "First, revised", "Completed")]).await.unwrap();

  let all = s.list_trials(&TrialQuery::default()).await.unwrap();
  assert_eq!(all.len(), 2);

  let one = s.get_trial("NCT1").await.unwrap().expect("trial");
  assert_eq!(one.title, "First, revised");
  assert_eq!(one.status, "Completed");
  assert_eq!(one.locations, vec!["Mass General, United States".to_string()]);
  assert_eq!(one.enrollment, Some(30));
}

#[tokio::test]
async fn duplicate_keys_in_one_batch_keep_the_last() {
  let s = store().await;
  s.upsert_trials(vec![trial("NCT1", "Early", "Recruiting"), trial("NCT1", "Late", "Recruiting")])
    .await
    .unwrap();

  let all = s.list_trials(&TrialQuery::default()).await.unwrap();
  assert_eq!(all.len(), 1);
  assert_eq!(all[0].title, "Late");
}

#[tokio::test]
async fn get_missing_trial_returns_none() {
  let s = store().await;
  assert!(s.get_trial("NCT404").await.unwrap().is_none());
}

#[tokio::test]
async fn list_filters_by_text_and_status() {
  let s = store().await;
  let mut other = trial("NCT3", "Gene therapy for SMA", "Not yet recruiting");
  other.conditions = vec!["Spinal Muscular Atrophy".into()];
  other.keywords = vec![];
  s.upsert_trials(vec![
    trial("NCT1", "Enzyme study", "Recruiting"),
    trial("NCT2", "Another enzyme study", "Completed"),
    other,
  ])
  .await
  .unwrap();

  let by_condition = s
    .list_trials(&TrialQuery { text: Some("muscular".into()), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(by_condition.len(), 1);
  assert_eq!(by_condition[0].nct_id, "NCT3");

  let by_keyword_and_status = s
    .list_trials(&TrialQuery {
      text:   Some("ENZYME".into()),
      status: Some("Recruiting".into()),
      ..Default::default()
    })
    .await
    .unwrap();
  assert_eq!(by_keyword_and_status.len(), 1);
  assert_eq!(by_keyword_and_status[0].nct_id, "NCT1");

  let paged = s
    .list_trials(&TrialQuery { limit: Some(2), offset: Some(2), ..Default::default() })
    .await
    .unwrap();
  assert_eq!(paged.len(), 1);
}
