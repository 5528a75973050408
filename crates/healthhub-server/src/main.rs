//! healthhub server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `HMH_*` environment variables, opens the SQLite store and serves the hub
//! over HTTP. With `--ingest` it runs one trial ingestion and exits, for use
//! from a scheduler.
//!
//! ```text
//! HMH_PORT=8080 HMH_INGEST__TOKEN=s3cret cargo run -p healthhub-server --bin server
//! ```

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use clap::Parser;
use healthhub_server::{AppState, ServerConfig};
use healthhub_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Health Mapping Hub server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run one registry ingestion and exit instead of serving.
  #[arg(long)]
  ingest: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(
      config::Environment::with_prefix("HMH")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read configuration")?;

  let mut server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.store_path = expand_tilde(&server_cfg.store_path);

  let store = SqliteStore::open(&server_cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", server_cfg.store_path))?;

  let address = format!("{}:{}", server_cfg.host, server_cfg.port);
  let state = AppState::new(store, server_cfg).context("failed to build registry client")?;

  if cli.ingest {
    let report = healthhub_registry::ingest(
      &state.registry,
      &*state.store,
      state.config.ingest.on_store_error,
    )
    .await
    .context("trial ingestion failed")?;

    if let Some(e) = &report.store_error {
      tracing::warn!(error = %e, fetched = report.fetched, "trials fetched but not stored");
    }
    return Ok(());
  }

  let app = healthhub_server::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
