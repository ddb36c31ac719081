//! drivesell-sync — offline-first data layer for the drivesell sales/driver
//! management app.
//!
//! The application keeps working with no network: mutations land in a local
//! SQLite store first, queue for replay, and reconcile against the remote
//! relational backend once connectivity returns, without losing or
//! duplicating data. Conflict policy is last-writer-wins (single writer
//! device per session, single authoritative remote).
//!
//! Typical wiring:
//!
//! ```no_run
//! use std::sync::Arc;
//! use drivesell_sync::{
//!     Connectivity, Db, HttpRemoteStore, RemoteConfig, SyncEngine, DEFAULT_SYNC_INTERVAL,
//! };
//!
//! # async fn wire() -> Result<(), drivesell_sync::SyncError> {
//! let config = RemoteConfig::from_env()?;
//! let db = Arc::new(Db::open(std::path::Path::new("./data"))?);
//! let remote = Arc::new(HttpRemoteStore::new(&config)?);
//! let connectivity = Connectivity::new(true);
//!
//! let engine = Arc::new(SyncEngine::new(db, remote, connectivity));
//! engine.set_session(true);
//! engine.load().await?;          // local data first, zero network latency
//! engine.clone().start(DEFAULT_SYNC_INTERVAL);
//! # Ok(())
//! # }
//! ```

mod config;
mod connectivity;
mod db;
mod error;
mod models;
mod remote;
mod sync;

pub use config::{normalize_base_url, RemoteConfig, ENV_REMOTE_KEY, ENV_REMOTE_URL};
pub use connectivity::{probe, Connectivity};
pub use db::{Db, DEFAULT_BATCH_SIZE};
pub use error::{RemoteError, SyncError};
pub use models::{
    ActionKind, Driver, DriverType, EntityStatus, Location, LocationCategory, Payment,
    PaymentMethod, PendingAction, Product, Record, Sale, ScheduleEntry, Settings, Table,
    SETTINGS_ID,
};
pub use remote::{HttpRemoteStore, RemoteStore};
pub use sync::{CycleReport, Snapshot, SyncEngine, SyncStatus, DEFAULT_SYNC_INTERVAL};

/// Install a default tracing subscriber (env-filtered, `info` fallback).
/// Hosts with their own subscriber can skip this; repeated calls are no-ops.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
