//! Local durable store for the drivesell sync engine.
//!
//! Uses rusqlite with WAL mode. One table per entity kind, each keyed by the
//! record id with the record JSON in a payload column plus extracted columns
//! for the table's secondary indexes. The pending-action log lives alongside
//! the entity tables and is append-only.
//!
//! Every operation here survives process restarts and works with no network.

use rusqlite::{params, Connection, OptionalExtension};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::SyncError;
use crate::models::{ActionKind, PendingAction, Record, Table};

/// Database file name inside the data directory.
const DB_FILE: &str = "drivesell.db";

/// Schema version is fixed at 1: absence of a table on open triggers table
/// creation, not data migration.
const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Default batch size for bulk operations.
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Shared handle to the on-device store.
pub struct Db {
    conn: Mutex<Connection>,
    pub db_path: Option<PathBuf>,
}

impl Db {
    /// Open (or create) the database at `{data_dir}/drivesell.db`.
    ///
    /// Creates the directory if needed, opens the connection, sets pragmas,
    /// and creates any missing tables. On corruption or open failure, deletes
    /// the file and retries once.
    pub fn open(data_dir: &Path) -> Result<Db, SyncError> {
        fs::create_dir_all(data_dir)
            .map_err(|e| SyncError::Storage(format!("create data dir: {e}")))?;

        let db_path = data_dir.join(DB_FILE);
        info!("Opening local store at {}", db_path.display());

        let conn = match open_and_configure(&db_path) {
            Ok(c) => c,
            Err(first_err) => {
                warn!(
                    "Local store open failed ({}), deleting and retrying once",
                    first_err
                );
                if db_path.exists() {
                    let _ = fs::remove_file(&db_path);
                    let _ = fs::remove_file(db_path.with_extension("db-wal"));
                    let _ = fs::remove_file(db_path.with_extension("db-shm"));
                }
                open_and_configure(&db_path)?
            }
        };

        run_migrations(&conn)?;

        Ok(Db {
            conn: Mutex::new(conn),
            db_path: Some(db_path),
        })
    }

    /// In-memory store for tests.
    pub fn open_in_memory() -> Result<Db, SyncError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;
        run_migrations(&conn)?;
        Ok(Db {
            conn: Mutex::new(conn),
            db_path: None,
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, SyncError> {
        self.conn
            .lock()
            .map_err(|_| SyncError::Storage("connection lock poisoned".into()))
    }

    // -----------------------------------------------------------------------
    // Point operations
    // -----------------------------------------------------------------------

    /// Insert-or-replace by id. No error on an existing id; visible to
    /// subsequent reads immediately.
    pub fn put(&self, record: &Record) -> Result<(), SyncError> {
        let conn = self.conn()?;
        put_record(&conn, record)
    }

    pub fn get(&self, table: Table, id: &str) -> Result<Option<Record>, SyncError> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                &format!("SELECT payload FROM {} WHERE id = ?1", table.name()),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        payload.map(|p| decode_record(table, &p)).transpose()
    }

    /// All records of a table, in the natural index's ascending order where
    /// one exists (insertion order otherwise). Malformed rows are skipped
    /// with a warning rather than failing the whole scan.
    pub fn get_all(&self, table: Table) -> Result<Vec<Record>, SyncError> {
        let conn = self.conn()?;
        let sql = match table.order_column() {
            Some(col) => format!("SELECT payload FROM {} ORDER BY {} ASC", table.name(), col),
            None => format!("SELECT payload FROM {} ORDER BY rowid ASC", table.name()),
        };
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            let payload = row?;
            match decode_record(table, &payload) {
                Ok(record) => records.push(record),
                Err(e) => warn!(table = %table, "skipping malformed row: {e}"),
            }
        }
        Ok(records)
    }

    pub fn delete(&self, table: Table, id: &str) -> Result<(), SyncError> {
        let conn = self.conn()?;
        conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", table.name()),
            params![id],
        )?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Bulk operations
    // -----------------------------------------------------------------------

    /// Batched upsert. Each batch commits in one transaction, so a failure
    /// never leaves a partially-written batch behind; the end state is
    /// observably equivalent to repeated single-record puts.
    pub fn bulk_put(&self, records: &[Record], batch_size: usize) -> Result<(), SyncError> {
        if records.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        for chunk in records.chunks(batch_size.max(1)) {
            let tx = conn.transaction()?;
            for record in chunk {
                put_record(&tx, record)?;
            }
            tx.commit()?;
        }
        Ok(())
    }

    /// Batched delete, transactional per batch like [`Db::bulk_put`].
    pub fn bulk_delete(
        &self,
        table: Table,
        ids: &[String],
        batch_size: usize,
    ) -> Result<(), SyncError> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn()?;
        let sql = format!("DELETE FROM {} WHERE id = ?1", table.name());
        for chunk in ids.chunks(batch_size.max(1)) {
            let tx = conn.transaction()?;
            for id in chunk {
                tx.execute(&sql, params![id])?;
            }
            tx.commit()?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Sync markers
    // -----------------------------------------------------------------------

    /// Flip a syncable record's marker to true. No-op when the record is
    /// absent (already deleted locally).
    pub fn mark_synced(&self, table: Table, id: &str) -> Result<(), SyncError> {
        let conn = self.conn()?;
        let payload: Option<String> = conn
            .query_row(
                &format!("SELECT payload FROM {} WHERE id = ?1", table.name()),
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        let Some(payload) = payload else {
            return Ok(());
        };
        let mut record = decode_record(table, &payload)?;
        if record.set_synced(true) {
            put_record(&conn, &record)?;
        }
        Ok(())
    }

    /// All records of a syncable table still awaiting remote confirmation,
    /// oldest first. Empty for tables without a sync marker.
    pub fn unsynced_records(&self, table: Table) -> Result<Vec<Record>, SyncError> {
        if !table.is_syncable() {
            return Ok(Vec::new());
        }
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT payload FROM {} WHERE synced = 0 ORDER BY timestamp ASC",
            table.name()
        ))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(decode_record(table, &row?)?);
        }
        Ok(records)
    }

    pub fn count_unsynced(&self, table: Table) -> Result<i64, SyncError> {
        if !table.is_syncable() {
            return Ok(0);
        }
        let conn = self.conn()?;
        let count = conn.query_row(
            &format!("SELECT COUNT(*) FROM {} WHERE synced = 0", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // -----------------------------------------------------------------------
    // Pending-action log
    // -----------------------------------------------------------------------

    /// Append a mutation to the pending-action log. Returns immediately;
    /// never blocks on network.
    pub fn enqueue_action(
        &self,
        kind: ActionKind,
        payload: Record,
    ) -> Result<PendingAction, SyncError> {
        let action = PendingAction {
            id: Uuid::new_v4().to_string(),
            kind,
            table: payload.table(),
            enqueued_at: chrono::Utc::now(),
            synced: false,
            reject_count: 0,
            failed: false,
            payload,
        };

        let payload_json = action
            .payload
            .to_json()
            .map_err(|e| SyncError::Storage(format!("encode action payload: {e}")))?;

        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO pending_actions (id, action, target_table, payload, enqueued_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                action.id,
                action.kind.as_str(),
                action.table.name(),
                payload_json.to_string(),
                action.enqueued_at.to_rfc3339(),
            ],
        )?;
        Ok(action)
    }

    /// All actions awaiting replay, in enqueue (FIFO) order across the whole
    /// log. Ordering matters: a delete enqueued after an update for the same
    /// id must replay after it. Dead-lettered actions are excluded.
    pub fn unsynced_actions(&self) -> Result<Vec<PendingAction>, SyncError> {
        self.query_actions("synced = 0 AND failed = 0")
    }

    /// Dead-lettered actions, for host inspection and repair.
    pub fn failed_actions(&self) -> Result<Vec<PendingAction>, SyncError> {
        self.query_actions("failed = 1")
    }

    fn query_actions(&self, where_clause: &str) -> Result<Vec<PendingAction>, SyncError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT id, action, target_table, payload, enqueued_at, synced, reject_count, failed
             FROM pending_actions WHERE {where_clause} ORDER BY rowid ASC"
        ))?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, i64>(5)?,
                row.get::<_, i64>(6)?,
                row.get::<_, i64>(7)?,
            ))
        })?;

        let mut actions = Vec::new();
        for row in rows {
            let (id, action, target_table, payload, enqueued_at, synced, reject_count, failed) =
                row?;
            let kind = ActionKind::from_str(&action)
                .ok_or_else(|| SyncError::Storage(format!("unknown action kind: {action}")))?;
            let table = Table::from_name(&target_table)
                .ok_or_else(|| SyncError::Storage(format!("unknown table: {target_table}")))?;
            let enqueued_at = chrono::DateTime::parse_from_rfc3339(&enqueued_at)
                .map_err(|e| SyncError::Storage(format!("bad enqueued_at: {e}")))?
                .with_timezone(&chrono::Utc);
            actions.push(PendingAction {
                id,
                kind,
                table,
                payload: decode_record(table, &payload)?,
                enqueued_at,
                synced: synced != 0,
                reject_count: reject_count as u32,
                failed: failed != 0,
            });
        }
        Ok(actions)
    }

    /// Mark one pending action as replayed. Idempotent.
    pub fn acknowledge_action(&self, id: &str) -> Result<(), SyncError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE pending_actions SET synced = 1 WHERE id = ?1",
            params![id],
        )?;
        Ok(())
    }

    /// Count a permanent rejection against an action. At `max` rejections
    /// the action is dead-lettered (`failed = 1`) and excluded from future
    /// drains. Returns true when this call dead-lettered it.
    pub fn record_action_rejection(&self, id: &str, max: u32) -> Result<bool, SyncError> {
        let conn = self.conn()?;
        conn.execute(
            "UPDATE pending_actions
             SET reject_count = reject_count + 1,
                 failed = CASE WHEN reject_count + 1 >= ?2 THEN 1 ELSE failed END
             WHERE id = ?1 AND synced = 0",
            params![id, max as i64],
        )?;
        let failed: Option<i64> = conn
            .query_row(
                "SELECT failed FROM pending_actions WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(failed == Some(1))
    }

    pub fn count_unsynced_actions(&self) -> Result<i64, SyncError> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM pending_actions WHERE synced = 0 AND failed = 0",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    pub fn count_failed_actions(&self) -> Result<i64, SyncError> {
        let conn = self.conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM pending_actions WHERE failed = 1",
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Row encoding
// ---------------------------------------------------------------------------

/// Upsert a record into its table, maintaining the extracted index columns.
fn put_record(conn: &Connection, record: &Record) -> Result<(), SyncError> {
    let payload = record
        .to_json()
        .map_err(|e| SyncError::Storage(format!("encode record: {e}")))?
        .to_string();

    match record {
        Record::Product(r) => put_named(conn, "products", &r.id, &r.name, &payload),
        Record::Driver(r) => put_named(conn, "drivers", &r.id, &r.name, &payload),
        Record::Location(r) => put_named(conn, "locations", &r.id, &r.name, &payload),
        Record::Sale(r) => put_stamped(
            conn,
            "sales",
            &r.id,
            &r.timestamp.to_rfc3339(),
            r.synced,
            &payload,
        ),
        Record::Payment(r) => put_stamped(
            conn,
            "payments",
            &r.id,
            &r.timestamp.to_rfc3339(),
            r.synced,
            &payload,
        ),
        Record::Schedule(r) => {
            conn.execute(
                "INSERT INTO schedule (id, date, payload) VALUES (?1, ?2, ?3)
                 ON CONFLICT(id) DO UPDATE SET date = excluded.date, payload = excluded.payload",
                params![r.id, r.date.to_string(), payload],
            )?;
            Ok(())
        }
        Record::Settings(r) => {
            conn.execute(
                "INSERT INTO settings (id, payload) VALUES (?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET payload = excluded.payload",
                params![r.id, payload],
            )?;
            Ok(())
        }
    }
}

fn put_named(
    conn: &Connection,
    table: &str,
    id: &str,
    name: &str,
    payload: &str,
) -> Result<(), SyncError> {
    conn.execute(
        &format!(
            "INSERT INTO {table} (id, name, payload) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET name = excluded.name, payload = excluded.payload"
        ),
        params![id, name, payload],
    )?;
    Ok(())
}

fn put_stamped(
    conn: &Connection,
    table: &str,
    id: &str,
    timestamp: &str,
    synced: bool,
    payload: &str,
) -> Result<(), SyncError> {
    conn.execute(
        &format!(
            "INSERT INTO {table} (id, timestamp, synced, payload) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(id) DO UPDATE SET
                timestamp = excluded.timestamp,
                synced = excluded.synced,
                payload = excluded.payload"
        ),
        params![id, timestamp, synced as i64, payload],
    )?;
    Ok(())
}

fn decode_record(table: Table, payload: &str) -> Result<Record, SyncError> {
    Record::from_json_str(table, payload)
        .map_err(|e| SyncError::Storage(format!("decode {table} row: {e}")))
}

// ---------------------------------------------------------------------------
// Schema
// ---------------------------------------------------------------------------

/// Open the database file and apply pragmas.
fn open_and_configure(path: &Path) -> Result<Connection, SyncError> {
    let conn =
        Connection::open(path).map_err(|e| SyncError::Storage(format!("sqlite open: {e}")))?;

    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA busy_timeout = 5000;
         PRAGMA synchronous = NORMAL;",
    )
    .map_err(|e| SyncError::Storage(format!("pragma setup: {e}")))?;

    Ok(conn)
}

fn run_migrations(conn: &Connection) -> Result<(), SyncError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT DEFAULT (datetime('now'))
        );",
    )?;

    let current: i32 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_version",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0);

    if current >= CURRENT_SCHEMA_VERSION {
        return Ok(());
    }

    if current < 1 {
        migrate_v1(conn)?;
    }

    info!("Local store schema initialized (v{CURRENT_SCHEMA_VERSION})");
    Ok(())
}

/// Migration v1: one table per entity kind plus the pending-action log.
fn migrate_v1(conn: &Connection) -> Result<(), SyncError> {
    conn.execute_batch(
        "
        -- Reference tables indexed by name
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_products_name ON products(name);

        CREATE TABLE IF NOT EXISTS drivers (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_drivers_name ON drivers(name);

        CREATE TABLE IF NOT EXISTS locations (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_locations_name ON locations(name);

        -- Syncable tables indexed by timestamp and sync marker
        CREATE TABLE IF NOT EXISTS sales (
            id TEXT PRIMARY KEY,
            timestamp TEXT NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_sales_timestamp ON sales(timestamp);
        CREATE INDEX IF NOT EXISTS idx_sales_synced ON sales(synced);

        CREATE TABLE IF NOT EXISTS payments (
            id TEXT PRIMARY KEY,
            timestamp TEXT NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_payments_timestamp ON payments(timestamp);
        CREATE INDEX IF NOT EXISTS idx_payments_synced ON payments(synced);

        -- Schedule indexed by calendar day
        CREATE TABLE IF NOT EXISTS schedule (
            id TEXT PRIMARY KEY,
            date TEXT NOT NULL,
            payload TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_schedule_date ON schedule(date);

        -- Settings singleton
        CREATE TABLE IF NOT EXISTS settings (
            id TEXT PRIMARY KEY,
            payload TEXT NOT NULL
        );

        -- pending_actions (append-only replay log)
        CREATE TABLE IF NOT EXISTS pending_actions (
            id TEXT PRIMARY KEY,
            action TEXT NOT NULL CHECK (action IN ('create', 'update', 'delete')),
            target_table TEXT NOT NULL,
            payload TEXT NOT NULL,
            enqueued_at TEXT NOT NULL,
            synced INTEGER NOT NULL DEFAULT 0,
            reject_count INTEGER NOT NULL DEFAULT 0,
            failed INTEGER NOT NULL DEFAULT 0
        );
        CREATE INDEX IF NOT EXISTS idx_pending_actions_synced ON pending_actions(synced);

        -- Record migration
        INSERT INTO schema_version (version) VALUES (1);
        ",
    )
    .map_err(|e| SyncError::Storage(format!("migration v1: {e}")))?;

    Ok(())
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Driver, DriverType, EntityStatus, Location, LocationCategory, Payment, PaymentMethod,
        Product, Sale, ScheduleEntry, Settings,
    };

    fn test_db() -> Db {
        Db::open_in_memory().expect("open in-memory store")
    }

    fn product(id: &str, name: &str) -> Record {
        Record::Product(Product {
            id: id.to_string(),
            name: name.to_string(),
            price: 10_000.0,
            commission: 1_000.0,
            image_url: String::new(),
            status: EntityStatus::Active,
        })
    }

    fn driver(id: &str, name: &str) -> Record {
        Record::Driver(Driver {
            id: id.to_string(),
            name: name.to_string(),
            kind: DriverType::Dedicated,
            location: None,
            contact: "0812".to_string(),
            status: EntityStatus::Active,
            user_id: format!("user-{id}"),
        })
    }

    fn sale(id: &str) -> Sale {
        let mut s = Sale::new(
            "drv-1",
            "Budi",
            "p1",
            "Coconut",
            1,
            15_000.0,
            "Pasar",
            PaymentMethod::Cash,
        );
        s.id = id.to_string();
        s
    }

    #[test]
    fn test_schema_tables_exist() {
        let db = test_db();
        let conn = db.conn().unwrap();
        let mut stmt = conn
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap();
        let tables: Vec<String> = stmt
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        for expected in [
            "products",
            "drivers",
            "sales",
            "locations",
            "schedule",
            "payments",
            "settings",
            "pending_actions",
            "schema_version",
        ] {
            assert!(tables.contains(&expected.to_string()), "missing {expected}");
        }
    }

    #[test]
    fn test_migrations_are_idempotent() {
        let db = test_db();
        let conn = db.conn().unwrap();
        run_migrations(&conn).expect("second run should succeed");

        let version: i32 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |row| {
                row.get(0)
            })
            .unwrap();
        assert_eq!(version, CURRENT_SCHEMA_VERSION);
    }

    #[test]
    fn test_put_get_roundtrip() {
        let db = test_db();
        let record = product("p1", "Coconut");
        db.put(&record).unwrap();

        let loaded = db.get(Table::Products, "p1").unwrap();
        assert_eq!(loaded, Some(record));
        assert_eq!(db.get(Table::Products, "missing").unwrap(), None);
    }

    #[test]
    fn test_put_is_upsert() {
        let db = test_db();
        db.put(&product("p1", "Coconut")).unwrap();
        db.put(&product("p1", "Young Coconut")).unwrap();

        let all = db.get_all(Table::Products).unwrap();
        assert_eq!(all.len(), 1);
        let loaded = all[0].clone().into_product().unwrap();
        assert_eq!(loaded.name, "Young Coconut");
    }

    #[test]
    fn test_durability_across_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");

        let record = Record::Sale(sale("sale-1"));
        {
            let db = Db::open(dir.path()).expect("first open");
            db.put(&record).unwrap();
        }

        // Simulated process restart: reopen the same directory.
        let db = Db::open(dir.path()).expect("reopen");
        let loaded = db.get(Table::Sales, "sale-1").unwrap();
        assert_eq!(loaded, Some(record));
    }

    #[test]
    fn test_get_all_orders_by_name_index() {
        let db = test_db();
        db.put(&driver("d1", "Citra")).unwrap();
        db.put(&driver("d2", "Agus")).unwrap();
        db.put(&driver("d3", "Budi")).unwrap();

        let names: Vec<String> = db
            .get_all(Table::Drivers)
            .unwrap()
            .into_iter()
            .map(|r| r.into_driver().unwrap().name)
            .collect();
        assert_eq!(names, vec!["Agus", "Budi", "Citra"]);
    }

    #[test]
    fn test_get_all_orders_sales_by_timestamp() {
        let db = test_db();
        let mut newer = sale("s-newer");
        let mut older = sale("s-older");
        newer.timestamp = chrono::Utc::now();
        older.timestamp = newer.timestamp - chrono::Duration::hours(2);
        db.put(&Record::Sale(newer)).unwrap();
        db.put(&Record::Sale(older)).unwrap();

        let ids: Vec<String> = db
            .get_all(Table::Sales)
            .unwrap()
            .into_iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["s-older", "s-newer"]);
    }

    #[test]
    fn test_bulk_put_and_delete_with_batching() {
        let db = test_db();
        let records: Vec<Record> = (0..125)
            .map(|i| product(&format!("p{i:03}"), &format!("Product {i:03}")))
            .collect();

        // Batch size smaller than the record count forces multiple
        // transactions.
        db.bulk_put(&records, DEFAULT_BATCH_SIZE).unwrap();
        assert_eq!(db.get_all(Table::Products).unwrap().len(), 125);

        let ids: Vec<String> = (0..100).map(|i| format!("p{i:03}")).collect();
        db.bulk_delete(Table::Products, &ids, DEFAULT_BATCH_SIZE)
            .unwrap();
        assert_eq!(db.get_all(Table::Products).unwrap().len(), 25);
    }

    #[test]
    fn test_unsynced_records_and_mark_synced() {
        let db = test_db();
        db.put(&Record::Sale(sale("s1"))).unwrap();
        db.put(&Record::Sale(sale("s2"))).unwrap();

        assert_eq!(db.count_unsynced(Table::Sales).unwrap(), 2);

        db.mark_synced(Table::Sales, "s1").unwrap();
        let unsynced = db.unsynced_records(Table::Sales).unwrap();
        assert_eq!(unsynced.len(), 1);
        assert_eq!(unsynced[0].id(), "s2");

        // Marker must be persisted inside the payload too.
        let s1 = db
            .get(Table::Sales, "s1")
            .unwrap()
            .unwrap()
            .into_sale()
            .unwrap();
        assert!(s1.synced);
    }

    #[test]
    fn test_mark_synced_noop_when_absent() {
        let db = test_db();
        db.mark_synced(Table::Sales, "ghost")
            .expect("must be a no-op");
    }

    #[test]
    fn test_unsynced_records_empty_for_reference_tables() {
        let db = test_db();
        db.put(&driver("d1", "Budi")).unwrap();
        assert!(db.unsynced_records(Table::Drivers).unwrap().is_empty());
        assert_eq!(db.count_unsynced(Table::Drivers).unwrap(), 0);
    }

    #[test]
    fn test_pending_actions_fifo_order() {
        let db = test_db();
        let update = db
            .enqueue_action(ActionKind::Update, driver("d1", "Budi"))
            .unwrap();
        let delete = db
            .enqueue_action(ActionKind::Delete, driver("d1", "Budi"))
            .unwrap();

        let actions = db.unsynced_actions().unwrap();
        assert_eq!(actions.len(), 2);
        assert_eq!(actions[0].id, update.id);
        assert_eq!(actions[0].kind, ActionKind::Update);
        assert_eq!(actions[1].id, delete.id);
        assert_eq!(actions[1].kind, ActionKind::Delete);
    }

    #[test]
    fn test_acknowledge_action_idempotent() {
        let db = test_db();
        let action = db
            .enqueue_action(ActionKind::Create, product("p1", "Coconut"))
            .unwrap();

        db.acknowledge_action(&action.id).unwrap();
        db.acknowledge_action(&action.id).unwrap();

        assert_eq!(db.count_unsynced_actions().unwrap(), 0);
        // Append-only: acknowledged actions stay in the log.
        let conn = db.conn().unwrap();
        let total: i64 = conn
            .query_row("SELECT COUNT(*) FROM pending_actions", [], |r| r.get(0))
            .unwrap();
        assert_eq!(total, 1);
    }

    #[test]
    fn test_rejections_dead_letter_at_cap() {
        let db = test_db();
        let action = db
            .enqueue_action(ActionKind::Update, driver("d1", "Budi"))
            .unwrap();

        assert!(!db.record_action_rejection(&action.id, 3).unwrap());
        assert!(!db.record_action_rejection(&action.id, 3).unwrap());
        assert!(db.record_action_rejection(&action.id, 3).unwrap());

        assert!(db.unsynced_actions().unwrap().is_empty());
        let failed = db.failed_actions().unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, action.id);
        assert_eq!(failed[0].reject_count, 3);
    }

    #[test]
    fn test_settings_singleton_upsert() {
        let db = test_db();
        let mut settings = Settings::default_company();
        db.put(&Record::Settings(settings.clone())).unwrap();

        settings.currency = "USD".to_string();
        db.put(&Record::Settings(settings.clone())).unwrap();

        let all = db.get_all(Table::Settings).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].clone().into_settings().unwrap().currency, "USD");
    }

    #[test]
    fn test_schedule_ordered_by_date() {
        let db = test_db();
        let entry = |id: &str, date: &str| {
            Record::Schedule(ScheduleEntry {
                id: id.to_string(),
                driver_id: "d1".to_string(),
                driver_name: "Budi".to_string(),
                date: date.parse().unwrap(),
                location_id: "loc-1".to_string(),
                location_name: "Pasar".to_string(),
            })
        };
        db.put(&entry("e2", "2025-08-02")).unwrap();
        db.put(&entry("e1", "2025-08-01")).unwrap();
        db.put(&entry("e3", "2025-08-03")).unwrap();

        let ids: Vec<String> = db
            .get_all(Table::Schedule)
            .unwrap()
            .into_iter()
            .map(|r| r.id().to_string())
            .collect();
        assert_eq!(ids, vec!["e1", "e2", "e3"]);
    }

    #[test]
    fn test_payment_and_location_roundtrip() {
        let db = test_db();
        let payment = Payment::new("drv-1", "2025-08", 250_000.0);
        let location = Location {
            id: "loc-1".to_string(),
            name: "Alun-alun".to_string(),
            category: LocationCategory::SpecialEvent,
        };
        db.put(&Record::Payment(payment.clone())).unwrap();
        db.put(&Record::Location(location.clone())).unwrap();

        assert_eq!(
            db.get(Table::Payments, &payment.id)
                .unwrap()
                .unwrap()
                .into_payment()
                .unwrap(),
            payment
        );
        assert_eq!(
            db.get(Table::Locations, "loc-1")
                .unwrap()
                .unwrap()
                .into_location()
                .unwrap(),
            location
        );
    }
}
