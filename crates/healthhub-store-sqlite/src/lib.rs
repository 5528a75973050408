//! SQLite backend for Health Mapping Hub.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. One [`SqliteStore`] implements every
//! store trait from `healthhub-core`.

mod encode;
mod schema;
mod store;
mod token;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
