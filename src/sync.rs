//! Reconciliation engine.
//!
//! Owns the drain → push → pull → delete-reconcile cycle that keeps the
//! local durable store and the remote relational backend converged, plus the
//! optimistic CRUD surface the application screens call. The engine is an
//! owned controller: construct as many independent instances as needed and
//! drive each with `start()`/`stop()`.
//!
//! Every failure here degrades to "stays queued, try again later". Offline
//! is a normal operating mode, never an error.

use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::connectivity::Connectivity;
use crate::db::{Db, DEFAULT_BATCH_SIZE};
use crate::error::{RemoteError, SyncError};
use crate::models::{
    ActionKind, Driver, Location, Payment, Product, Record, Sale, ScheduleEntry, Settings, Table,
};
use crate::remote::RemoteStore;

/// Sync loop period while online. Short, to approximate near-real-time sync.
pub const DEFAULT_SYNC_INTERVAL: Duration = Duration::from_secs(5);

/// Batch size for server-deletion reconciliation deletes.
const DELETE_RECONCILE_BATCH: usize = 50;

/// Minimum interval between server-deletion reconciliation passes per table.
/// Guards against redundant passes on rapid reconnect events; a manual
/// refresh bypasses it.
const RECONCILE_MIN_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Permanent rejections tolerated before a pending action is dead-lettered.
const MAX_ACTION_REJECTIONS: u32 = 5;

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// In-memory cache of the local durable store, refreshed by local mutations
/// and remote pulls. Cheap to clone out to the UI.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub products: Vec<Product>,
    pub drivers: Vec<Driver>,
    pub sales: Vec<Sale>,
    pub locations: Vec<Location>,
    pub schedule: Vec<ScheduleEntry>,
    pub payments: Vec<Payment>,
    pub settings: Option<Settings>,
}

/// What one completed reconciliation cycle did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub actions_drained: usize,
    pub records_pushed: usize,
    pub tables_pulled: usize,
    pub records_deleted: usize,
}

impl CycleReport {
    pub fn total(&self) -> usize {
        self.actions_drained + self.records_pushed + self.records_deleted
    }
}

/// Queue counters for sync indicators.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub is_online: bool,
    pub has_session: bool,
    pub pending_actions: i64,
    pub failed_actions: i64,
    pub unsynced_sales: i64,
    pub unsynced_payments: i64,
    pub last_sync: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Engine
// ---------------------------------------------------------------------------

pub struct SyncEngine {
    db: Arc<Db>,
    remote: Arc<dyn RemoteStore>,
    connectivity: Connectivity,
    session: AtomicBool,
    /// Mutual exclusion: at most one cycle runs at a time. A trigger landing
    /// mid-cycle is dropped, not queued.
    cycle_in_flight: AtomicBool,
    is_running: AtomicBool,
    last_sync: Mutex<Option<DateTime<Utc>>>,
    last_reconcile: Mutex<HashMap<Table, Instant>>,
    snapshot: Mutex<Snapshot>,
}

impl SyncEngine {
    pub fn new(db: Arc<Db>, remote: Arc<dyn RemoteStore>, connectivity: Connectivity) -> SyncEngine {
        SyncEngine {
            db,
            remote,
            connectivity,
            session: AtomicBool::new(false),
            cycle_in_flight: AtomicBool::new(false),
            is_running: AtomicBool::new(false),
            last_sync: Mutex::new(None),
            last_reconcile: Mutex::new(HashMap::new()),
            snapshot: Mutex::new(Snapshot::default()),
        }
    }

    // -----------------------------------------------------------------------
    // Session and state accessors
    // -----------------------------------------------------------------------

    /// Record whether an authenticated session exists. Clearing the session
    /// drops the protected in-memory cache; settings survive so branding
    /// persists across session boundaries. The durable store is left intact.
    pub fn set_session(&self, active: bool) {
        self.session.store(active, Ordering::SeqCst);
        if !active {
            if let Ok(mut guard) = self.snapshot.lock() {
                let settings = guard.settings.take();
                *guard = Snapshot::default();
                guard.settings = settings;
            }
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.load(Ordering::SeqCst)
    }

    fn online_with_session(&self) -> bool {
        self.connectivity.is_online() && self.has_session()
    }

    /// Current in-memory state.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync.lock().ok().and_then(|guard| *guard)
    }

    pub fn status(&self) -> Result<SyncStatus, SyncError> {
        Ok(SyncStatus {
            is_online: self.connectivity.is_online(),
            has_session: self.has_session(),
            pending_actions: self.db.count_unsynced_actions()?,
            failed_actions: self.db.count_failed_actions()?,
            unsynced_sales: self.db.count_unsynced(Table::Sales)?,
            unsynced_payments: self.db.count_unsynced(Table::Payments)?,
            last_sync: self.last_sync(),
        })
    }

    // -----------------------------------------------------------------------
    // Initial load
    // -----------------------------------------------------------------------

    /// Cold-start load: read everything from the local store first so the
    /// caller has data with zero network latency, then resolve the settings
    /// singleton (local → remote → hardcoded default).
    ///
    /// The caller should follow up with [`SyncEngine::refresh`] when online
    /// with a session.
    pub async fn load(&self) -> Result<Snapshot, SyncError> {
        self.reload_snapshot()?;
        self.ensure_settings().await?;
        Ok(self.snapshot())
    }

    /// Resolve the settings singleton. Created lazily with defaults when
    /// absent both locally and remotely; never cleared on logout.
    async fn ensure_settings(&self) -> Result<(), SyncError> {
        if !self.db.get_all(Table::Settings)?.is_empty() {
            return Ok(());
        }

        if self.online_with_session() {
            match self.remote.select_all(Table::Settings).await {
                Ok(records) if !records.is_empty() => {
                    self.db.bulk_put(&records, DEFAULT_BATCH_SIZE)?;
                    self.reload_snapshot()?;
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => warn!("settings fetch failed, falling back to defaults: {e}"),
            }
        }

        let default = Record::Settings(Settings::default_company());
        self.db.put(&default)?;
        self.reload_snapshot()?;
        info!("settings absent locally and remotely; created defaults");

        if self.online_with_session() {
            if let Err(e) = self.remote.insert(&default).await {
                warn!("failed to seed default settings remotely: {e}");
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Reconciliation cycle
    // -----------------------------------------------------------------------

    /// Run one reconciliation cycle. Returns `Ok(None)` when the cycle was
    /// skipped: offline, no session, or another cycle already in flight.
    pub async fn run_cycle(&self) -> Result<Option<CycleReport>, SyncError> {
        self.run_cycle_with(false).await
    }

    /// User-initiated refresh: a full cycle that bypasses the
    /// delete-reconciliation recency guard.
    pub async fn refresh(&self) -> Result<Option<CycleReport>, SyncError> {
        self.run_cycle_with(true).await
    }

    async fn run_cycle_with(&self, force: bool) -> Result<Option<CycleReport>, SyncError> {
        if !self.connectivity.is_online() {
            debug!("sync cycle skipped: offline");
            return Ok(None);
        }
        if !self.has_session() {
            debug!("sync cycle skipped: no session");
            return Ok(None);
        }
        if self
            .cycle_in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            debug!("sync cycle skipped: previous cycle still in flight");
            return Ok(None);
        }

        let result = self.cycle_inner(force).await;
        self.cycle_in_flight.store(false, Ordering::SeqCst);

        if result.is_ok() {
            if let Ok(mut guard) = self.last_sync.lock() {
                *guard = Some(Utc::now());
            }
        }
        result.map(Some)
    }

    /// Drain happens-before push happens-before pull: a pull could otherwise
    /// reintroduce data a push was about to supersede.
    async fn cycle_inner(&self, force: bool) -> Result<CycleReport, SyncError> {
        let actions_drained = self.drain_pending_actions().await?;
        let records_pushed = self.push_unsynced_records().await?;
        let (tables_pulled, records_deleted) = self.pull_remote_deltas(force).await?;
        self.reload_snapshot()?;
        Ok(CycleReport {
            actions_drained,
            records_pushed,
            tables_pulled,
            records_deleted,
        })
    }

    /// Dispatch one queued mutation against the remote store.
    async fn replay_action(
        &self,
        kind: ActionKind,
        table: Table,
        record: &Record,
    ) -> Result<(), RemoteError> {
        match kind {
            ActionKind::Create => self.remote.insert(record).await,
            ActionKind::Update => {
                let fields = record
                    .to_remote_json()
                    .map_err(|e| RemoteError::Rejected(format!("encode record: {e}")))?;
                self.remote.update(table, record.id(), &fields).await
            }
            ActionKind::Delete => self.remote.delete(table, record.id()).await,
        }
    }

    /// Step 1: replay queued actions in FIFO order. Failures are isolated
    /// per action; one failing action must not block the ones behind it.
    async fn drain_pending_actions(&self) -> Result<usize, SyncError> {
        let actions = self.db.unsynced_actions()?;
        if actions.is_empty() {
            return Ok(0);
        }
        debug!(count = actions.len(), "draining pending actions");

        let mut drained = 0;
        for action in actions {
            match self
                .replay_action(action.kind, action.table, &action.payload)
                .await
            {
                Ok(()) => {
                    self.db.acknowledge_action(&action.id)?;
                    drained += 1;
                }
                Err(RemoteError::Transient(e)) => {
                    debug!(action_id = %action.id, "action replay deferred: {e}");
                }
                Err(err) => {
                    let dead = self
                        .db
                        .record_action_rejection(&action.id, MAX_ACTION_REJECTIONS)?;
                    if dead {
                        warn!(
                            action_id = %action.id,
                            table = %action.table,
                            "action dead-lettered after {MAX_ACTION_REJECTIONS} rejections: {err}"
                        );
                    } else {
                        warn!(
                            action_id = %action.id,
                            table = %action.table,
                            "action rejected, will retry: {err}"
                        );
                    }
                }
            }
        }
        Ok(drained)
    }

    /// Step 2: push unsynced syncable records, sales then payments. Upsert so
    /// a replayed push converges instead of failing on a duplicate id.
    async fn push_unsynced_records(&self) -> Result<usize, SyncError> {
        let mut pushed = 0;
        for table in Table::SYNCABLE {
            for record in self.db.unsynced_records(table)? {
                match self.remote.upsert(&record).await {
                    Ok(()) => {
                        self.db.mark_synced(table, record.id())?;
                        pushed += 1;
                    }
                    Err(e) => {
                        debug!(table = %table, id = %record.id(), "push deferred: {e}");
                    }
                }
            }
        }
        Ok(pushed)
    }

    /// Steps 3 and 4: overwrite local state with fresh remote data — never
    /// clobbering locally unsynced records — then reconcile server-side
    /// deletions for the syncable tables.
    async fn pull_remote_deltas(&self, force: bool) -> Result<(usize, usize), SyncError> {
        let mut pulled = 0;
        let mut deleted = 0;

        for table in Table::REFERENCE {
            match self.remote.select_all(table).await {
                Ok(records) => {
                    self.db.bulk_put(&records, DEFAULT_BATCH_SIZE)?;
                    pulled += 1;
                }
                Err(e) => warn!(table = %table, "pull failed: {e}"),
            }
        }

        for table in Table::SYNCABLE {
            match self.remote.select_all(table).await {
                Ok(mut records) => {
                    let unsynced: HashSet<String> = self
                        .db
                        .unsynced_records(table)?
                        .iter()
                        .map(|r| r.id().to_string())
                        .collect();
                    let remote_ids: HashSet<String> =
                        records.iter().map(|r| r.id().to_string()).collect();

                    // The central invariant: a record with synced = false is
                    // never overwritten by a remote-originated refresh.
                    records.retain(|r| !unsynced.contains(r.id()));
                    for record in &mut records {
                        record.set_synced(true);
                    }
                    self.db.bulk_put(&records, DEFAULT_BATCH_SIZE)?;
                    pulled += 1;

                    deleted += self.reconcile_server_deletions(table, &remote_ids, force)?;
                }
                Err(e) => warn!(table = %table, "pull failed: {e}"),
            }
        }

        Ok((pulled, deleted))
    }

    /// Delete local records that were removed server-side: present locally
    /// with `synced = true` but absent from the fresh remote id set.
    /// Unsynced locals are kept regardless — they have not been pushed yet,
    /// so their absence is expected, not evidence of remote deletion.
    fn reconcile_server_deletions(
        &self,
        table: Table,
        remote_ids: &HashSet<String>,
        force: bool,
    ) -> Result<usize, SyncError> {
        {
            let mut guard = self
                .last_reconcile
                .lock()
                .map_err(|_| SyncError::Storage("reconcile lock poisoned".into()))?;
            if !force {
                if let Some(last) = guard.get(&table) {
                    if last.elapsed() < RECONCILE_MIN_INTERVAL {
                        debug!(table = %table, "deletion reconcile skipped: ran recently");
                        return Ok(0);
                    }
                }
            }
            guard.insert(table, Instant::now());
        }

        let stale: Vec<String> = self
            .db
            .get_all(table)?
            .iter()
            .filter(|r| r.synced() == Some(true) && !remote_ids.contains(r.id()))
            .map(|r| r.id().to_string())
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }
        info!(table = %table, count = stale.len(), "removing rows deleted server-side");
        self.db.bulk_delete(table, &stale, DELETE_RECONCILE_BATCH)?;
        Ok(stale.len())
    }

    fn reload_snapshot(&self) -> Result<(), SyncError> {
        let snapshot = Snapshot {
            products: self
                .db
                .get_all(Table::Products)?
                .into_iter()
                .filter_map(Record::into_product)
                .collect(),
            drivers: self
                .db
                .get_all(Table::Drivers)?
                .into_iter()
                .filter_map(Record::into_driver)
                .collect(),
            sales: self
                .db
                .get_all(Table::Sales)?
                .into_iter()
                .filter_map(Record::into_sale)
                .collect(),
            locations: self
                .db
                .get_all(Table::Locations)?
                .into_iter()
                .filter_map(Record::into_location)
                .collect(),
            schedule: self
                .db
                .get_all(Table::Schedule)?
                .into_iter()
                .filter_map(Record::into_schedule)
                .collect(),
            payments: self
                .db
                .get_all(Table::Payments)?
                .into_iter()
                .filter_map(Record::into_payment)
                .collect(),
            settings: self
                .db
                .get_all(Table::Settings)?
                .into_iter()
                .filter_map(Record::into_settings)
                .next(),
        };
        if let Ok(mut guard) = self.snapshot.lock() {
            *guard = snapshot;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Optimistic CRUD (reference tables)
    // -----------------------------------------------------------------------

    /// Optimistic create/update: local write, snapshot update, pending
    /// action, then — only when online with a session — an inline remote
    /// attempt. Inline success acknowledges the action immediately; inline
    /// failure rolls local state back to the previous value and propagates,
    /// while the action stays queued for background replay. Offline, the
    /// change simply stays visible and queued.
    async fn optimistic_write(&self, kind: ActionKind, record: Record) -> Result<(), SyncError> {
        let table = record.table();
        let previous = self.db.get(table, record.id())?;

        self.db.put(&record)?;
        self.reload_snapshot()?;
        let action = self.db.enqueue_action(kind, record.clone())?;

        if !self.online_with_session() {
            return Ok(());
        }

        match self.replay_action(kind, table, &record).await {
            Ok(()) => {
                self.db.acknowledge_action(&action.id)?;
                Ok(())
            }
            Err(err) => {
                // The UI must never keep showing a change the remote provably
                // rejected.
                match previous {
                    Some(prev) => self.db.put(&prev)?,
                    None => self.db.delete(table, record.id())?,
                }
                self.reload_snapshot()?;
                Err(err.into())
            }
        }
    }

    /// Optimistic delete, mirroring [`SyncEngine::optimistic_write`].
    /// Deleting an id that is already absent locally is a no-op.
    async fn optimistic_delete(&self, table: Table, id: &str) -> Result<(), SyncError> {
        let Some(previous) = self.db.get(table, id)? else {
            return Ok(());
        };

        self.db.delete(table, id)?;
        self.reload_snapshot()?;
        let action = self
            .db
            .enqueue_action(ActionKind::Delete, previous.clone())?;

        if !self.online_with_session() {
            return Ok(());
        }

        match self.remote.delete(table, id).await {
            Ok(()) => {
                self.db.acknowledge_action(&action.id)?;
                Ok(())
            }
            Err(err) => {
                self.db.put(&previous)?;
                self.reload_snapshot()?;
                Err(err.into())
            }
        }
    }

    pub async fn add_product(&self, product: Product) -> Result<(), SyncError> {
        self.optimistic_write(ActionKind::Create, Record::Product(product))
            .await
    }

    pub async fn update_product(&self, product: Product) -> Result<(), SyncError> {
        self.optimistic_write(ActionKind::Update, Record::Product(product))
            .await
    }

    pub async fn delete_product(&self, id: &str) -> Result<(), SyncError> {
        self.optimistic_delete(Table::Products, id).await
    }

    /// Add a driver profile. Account provisioning for the driver's login is
    /// the host's concern; the engine only stores the profile record.
    pub async fn add_driver(&self, driver: Driver) -> Result<(), SyncError> {
        self.optimistic_write(ActionKind::Create, Record::Driver(driver))
            .await
    }

    pub async fn update_driver(&self, driver: Driver) -> Result<(), SyncError> {
        self.optimistic_write(ActionKind::Update, Record::Driver(driver))
            .await
    }

    pub async fn add_location(&self, location: Location) -> Result<(), SyncError> {
        self.optimistic_write(ActionKind::Create, Record::Location(location))
            .await
    }

    pub async fn update_location(&self, location: Location) -> Result<(), SyncError> {
        self.optimistic_write(ActionKind::Update, Record::Location(location))
            .await
    }

    pub async fn delete_location(&self, id: &str) -> Result<(), SyncError> {
        self.optimistic_delete(Table::Locations, id).await
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<(), SyncError> {
        self.optimistic_write(ActionKind::Update, Record::Settings(settings))
            .await
    }

    // -----------------------------------------------------------------------
    // Schedule operations
    // -----------------------------------------------------------------------

    /// Install a generated schedule, replacing the previous entries of every
    /// driver it covers. All writes are local and queued; the background
    /// drain replays them (deletes first, in FIFO order).
    pub fn put_schedule_entries(&self, entries: Vec<ScheduleEntry>) -> Result<(), SyncError> {
        if entries.is_empty() {
            return Ok(());
        }
        let covered: HashSet<&str> = entries.iter().map(|e| e.driver_id.as_str()).collect();
        let replaced: Vec<ScheduleEntry> = self
            .db
            .get_all(Table::Schedule)?
            .into_iter()
            .filter_map(Record::into_schedule)
            .filter(|e| covered.contains(e.driver_id.as_str()))
            .collect();

        let replaced_ids: Vec<String> = replaced.iter().map(|e| e.id.clone()).collect();
        for entry in replaced {
            self.db
                .enqueue_action(ActionKind::Delete, Record::Schedule(entry))?;
        }
        self.db
            .bulk_delete(Table::Schedule, &replaced_ids, DEFAULT_BATCH_SIZE)?;

        let records: Vec<Record> = entries.into_iter().map(Record::Schedule).collect();
        self.db.bulk_put(&records, DEFAULT_BATCH_SIZE)?;
        for record in records {
            self.db.enqueue_action(ActionKind::Create, record)?;
        }

        self.reload_snapshot()
    }

    /// Reassign today's entry for one driver, keeping at most one current
    /// entry per (driver, day).
    pub async fn reassign_schedule_today(
        &self,
        driver_id: &str,
        new_location: &Location,
    ) -> Result<ScheduleEntry, SyncError> {
        let today = Local::now().date_naive();
        let current = self
            .db
            .get_all(Table::Schedule)?
            .into_iter()
            .filter_map(Record::into_schedule)
            .find(|e| e.driver_id == driver_id && e.date == today)
            .ok_or(SyncError::NotFound)?;

        let updated = ScheduleEntry {
            location_id: new_location.id.clone(),
            location_name: new_location.name.clone(),
            ..current
        };
        self.optimistic_write(ActionKind::Update, Record::Schedule(updated.clone()))
            .await?;
        Ok(updated)
    }

    /// Remove every schedule entry, locally and (via queued deletes)
    /// remotely.
    pub fn clear_schedule(&self) -> Result<(), SyncError> {
        let entries = self.db.get_all(Table::Schedule)?;
        let ids: Vec<String> = entries.iter().map(|r| r.id().to_string()).collect();
        for entry in entries {
            self.db.enqueue_action(ActionKind::Delete, entry)?;
        }
        self.db
            .bulk_delete(Table::Schedule, &ids, DEFAULT_BATCH_SIZE)?;
        self.reload_snapshot()
    }

    // -----------------------------------------------------------------------
    // Syncable records
    // -----------------------------------------------------------------------

    /// Record a sale. Always lands locally first (`synced = false`); when
    /// online with a session an immediate push is attempted. A failed push is
    /// not an error — the sale stays visible and syncs on a later cycle.
    pub async fn add_sale(&self, mut sale: Sale) -> Result<Sale, SyncError> {
        sale.synced = false;
        let record = Record::Sale(sale.clone());
        self.db.put(&record)?;
        self.reload_snapshot()?;

        if self.online_with_session() {
            match self.remote.upsert(&record).await {
                Ok(()) => {
                    self.db.mark_synced(Table::Sales, &sale.id)?;
                    sale.synced = true;
                    self.reload_snapshot()?;
                }
                Err(e) => {
                    debug!(sale_id = %sale.id, "sale will sync on a later cycle: {e}");
                }
            }
        }
        Ok(sale)
    }

    /// Record a payroll payment. Same local-first behavior as
    /// [`SyncEngine::add_sale`].
    pub async fn add_payment(&self, mut payment: Payment) -> Result<Payment, SyncError> {
        payment.synced = false;
        let record = Record::Payment(payment.clone());
        self.db.put(&record)?;
        self.reload_snapshot()?;

        if self.online_with_session() {
            match self.remote.upsert(&record).await {
                Ok(()) => {
                    self.db.mark_synced(Table::Payments, &payment.id)?;
                    payment.synced = true;
                    self.reload_snapshot()?;
                }
                Err(e) => {
                    debug!(payment_id = %payment.id, "payment will sync on a later cycle: {e}");
                }
            }
        }
        Ok(payment)
    }

    // -----------------------------------------------------------------------
    // Background loop
    // -----------------------------------------------------------------------

    /// Start the background sync loop: a cycle every `interval`, plus an
    /// immediate cycle on every offline→online transition.
    pub fn start(self: Arc<Self>, interval: Duration) {
        if self.is_running.swap(true, Ordering::SeqCst) {
            warn!("sync loop already running");
            return;
        }

        let engine = self;
        tokio::spawn(async move {
            info!(interval_secs = interval.as_secs(), "sync loop started");
            let mut online_rx = engine.connectivity.subscribe();

            loop {
                let woke_online = tokio::select! {
                    _ = tokio::time::sleep(interval) => false,
                    changed = online_rx.changed() => match changed {
                        Ok(()) => *online_rx.borrow_and_update(),
                        // Sender gone; keep ticking on the timer alone.
                        Err(_) => false,
                    },
                };

                if !engine.is_running.load(Ordering::SeqCst) {
                    break;
                }
                if woke_online {
                    info!("connectivity restored; starting immediate sync");
                }

                match engine.run_cycle().await {
                    Ok(Some(report)) if report.total() > 0 => {
                        info!(
                            drained = report.actions_drained,
                            pushed = report.records_pushed,
                            deleted = report.records_deleted,
                            "sync cycle complete"
                        );
                    }
                    Ok(_) => {}
                    Err(e) => warn!("sync cycle failed: {e}"),
                }
            }
            info!("sync loop stopped");
        });
    }

    /// Stop the background loop. A cycle already in flight runs to
    /// completion; its partial progress is retained.
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::SeqCst);
    }

    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
