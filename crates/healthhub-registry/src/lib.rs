//! ClinicalTrials.gov ingestion for Health Mapping Hub.
//!
//! One ingestion run issues a single GET against the registry search
//! endpoint, decodes every study against an all-optional [`schema`],
//! [`normalize`]s it into a [`TrialRecord`](healthhub_core::trial::TrialRecord)
//! with documented defaults, and bulk-upserts the batch into any
//! [`TrialStore`](healthhub_core::store::TrialStore).

pub mod client;
pub mod error;
pub mod ingest;
pub mod normalize;
pub mod schema;

pub use client::{RegistryClient, RegistryConfig};
pub use error::{Error, Result};
pub use ingest::{IngestReport, StoreFailurePolicy, ingest};
pub use normalize::normalize;
