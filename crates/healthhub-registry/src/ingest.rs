//! One ingestion run: fetch → normalise → upsert.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use healthhub_core::{store::TrialStore, trial::TrialRow};
use serde::{Deserialize, Serialize};

use crate::{Error, Result, client::RegistryClient, normalize::normalize, schema::Study};

/// What to do when the upsert fails after a successful fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreFailurePolicy {
  /// Log the error and report it in [`IngestReport::store_error`].
  #[default]
  Log,
  /// Return [`Error::Store`].
  Fail,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
  /// Studies in the registry response.
  pub fetched:     usize,
  /// Rows handed to the store after collapsing duplicate NCT ids.
  pub upserted:    usize,
  pub store_error: Option<String>,
}

/// Normalise `studies` and collapse duplicate NCT ids, last one wins. The
/// surviving rows keep the position of the first occurrence.
pub fn prepare_batch(studies: &[Study], now: DateTime<Utc>) -> Vec<TrialRow> {
  let mut rows: Vec<TrialRow> = Vec::with_capacity(studies.len());
  let mut seen: HashMap<String, usize> = HashMap::new();

  for row in studies.iter().map(|s| normalize(s).into_row(now)) {
    match seen.get(&row.nct_id) {
      Some(&i) => rows[i] = row,
      None     => {
        seen.insert(row.nct_id.clone(), rows.len());
        rows.push(row);
      }
    }
  }
  rows
}

/// Run one ingestion. Registry failures abort before anything is written.
#[tracing::instrument(skip_all)]
pub async fn ingest<S>(
  client: &RegistryClient,
  store:  &S,
  policy: StoreFailurePolicy,
) -> Result<IngestReport>
where
  S: TrialStore,
{
  let studies = client.fetch_studies().await.inspect_err(|e| {
    tracing::error!(error = %e, "registry fetch failed; nothing written");
  })?;

  let rows    = prepare_batch(&studies, Utc::now());
  let fetched = studies.len();
  let batch   = rows.len();

  match store.upsert_trials(rows).await {
    Ok(upserted) => {
      tracing::info!(fetched, upserted, "trial ingestion complete");
      Ok(IngestReport { fetched, upserted, store_error: None })
    }
    Err(e) => {
      tracing::error!(error = %e, fetched, batch, "persisting trials failed");
      match policy {
        StoreFailurePolicy::Log  => Ok(IngestReport {
          fetched,
          upserted: 0,
          store_error: Some(e.to_string()),
        }),
        StoreFailurePolicy::Fail => Err(Error::Store(Box::new(e))),
      }
    }
  }
}
