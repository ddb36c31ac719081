//! Typed records for every synced table, plus the closed [`Table`] enum that
//! routes them.
//!
//! One struct per table kind, with the wire field names (camelCase) the
//! remote relational store uses. Branching per kind is exhaustive matching on
//! [`Table`] / [`Record`], so adding a table is a compile-time-checked change.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable id of the settings singleton row.
pub const SETTINGS_ID: &str = "drivesell-settings";

// ---------------------------------------------------------------------------
// Table kinds
// ---------------------------------------------------------------------------

/// The closed set of synced tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Products,
    Drivers,
    Sales,
    Locations,
    Schedule,
    Payments,
    Settings,
}

impl Table {
    /// All tables, in pull order.
    pub const ALL: [Table; 7] = [
        Table::Products,
        Table::Drivers,
        Table::Sales,
        Table::Locations,
        Table::Schedule,
        Table::Payments,
        Table::Settings,
    ];

    /// Reference tables: no local-only unsynced writes expected; refreshed
    /// wholesale from the remote store on every pull.
    pub const REFERENCE: [Table; 5] = [
        Table::Products,
        Table::Drivers,
        Table::Locations,
        Table::Schedule,
        Table::Settings,
    ];

    /// Tables whose records carry a `synced` marker. Push order matters:
    /// sales before payments.
    pub const SYNCABLE: [Table; 2] = [Table::Sales, Table::Payments];

    /// Table name as used for both the local store and the remote endpoint.
    pub fn name(self) -> &'static str {
        match self {
            Table::Products => "products",
            Table::Drivers => "drivers",
            Table::Sales => "sales",
            Table::Locations => "locations",
            Table::Schedule => "schedule",
            Table::Payments => "payments",
            Table::Settings => "settings",
        }
    }

    pub fn from_name(name: &str) -> Option<Table> {
        Table::ALL.into_iter().find(|t| t.name() == name)
    }

    /// Column backing the table's natural ascending index, if any.
    pub fn order_column(self) -> Option<&'static str> {
        match self {
            Table::Products | Table::Drivers | Table::Locations => Some("name"),
            Table::Sales | Table::Payments => Some("timestamp"),
            Table::Schedule => Some("date"),
            Table::Settings => None,
        }
    }

    /// Whether records in this table carry the `synced` marker.
    pub fn is_syncable(self) -> bool {
        matches!(self, Table::Sales | Table::Payments)
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Field enums
// ---------------------------------------------------------------------------

/// Active/inactive flag shared by products and drivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityStatus {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverType {
    Dedicated,
    Mitra,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LocationCategory {
    #[serde(rename = "Daily Rotation")]
    DailyRotation,
    #[serde(rename = "Special/Event")]
    SpecialEvent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Qris,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: f64,
    pub commission: f64,
    pub image_url: String,
    pub status: EntityStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Driver {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub kind: DriverType,
    #[serde(default)]
    pub location: Option<String>,
    pub contact: String,
    pub status: EntityStatus,
    pub user_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    pub driver_id: String,
    pub driver_name: String,
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub total: f64,
    pub timestamp: DateTime<Utc>,
    pub location: String,
    pub payment_method: PaymentMethod,
    /// True once the remote store has acknowledged this row.
    #[serde(default)]
    pub synced: bool,
}

impl Sale {
    /// Construct a new sale: client-side id, current timestamp, unsynced.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        driver_id: impl Into<String>,
        driver_name: impl Into<String>,
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        total: f64,
        location: impl Into<String>,
        payment_method: PaymentMethod,
    ) -> Sale {
        Sale {
            id: Uuid::new_v4().to_string(),
            driver_id: driver_id.into(),
            driver_name: driver_name.into(),
            product_id: product_id.into(),
            product_name: product_name.into(),
            quantity,
            total,
            timestamp: Utc::now(),
            location: location.into(),
            payment_method,
            synced: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub id: String,
    pub name: String,
    pub category: LocationCategory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleEntry {
    pub id: String,
    pub driver_id: String,
    pub driver_name: String,
    /// Calendar day in the device's local time zone.
    pub date: NaiveDate,
    pub location_id: String,
    pub location_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: String,
    pub driver_id: String,
    pub period: String,
    pub amount: f64,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub synced: bool,
}

impl Payment {
    pub fn new(driver_id: impl Into<String>, period: impl Into<String>, amount: f64) -> Payment {
        Payment {
            id: Uuid::new_v4().to_string(),
            driver_id: driver_id.into(),
            period: period.into(),
            amount,
            timestamp: Utc::now(),
            synced: false,
        }
    }
}

/// Company settings singleton. Survives logout: branding must persist across
/// session boundaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub id: String,
    pub name: String,
    pub logo_url: String,
    pub favicon_url: String,
    #[serde(default)]
    pub icon192_url: Option<String>,
    #[serde(default)]
    pub icon512_url: Option<String>,
    pub theme: Value,
    pub currency: String,
    pub show_driver_commission: bool,
    pub show_driver_items_sold: bool,
    pub show_driver_schedule: bool,
}

impl Settings {
    /// Hardcoded default used when settings are absent both locally and
    /// remotely (never-synced offline device, or empty remote project).
    pub fn default_company() -> Settings {
        Settings {
            id: SETTINGS_ID.to_string(),
            name: String::new(),
            logo_url: "https://tailwindui.com/img/logos/mark.svg?color=white".to_string(),
            favicon_url: "https://tailwindui.com/img/logos/mark.svg?color=indigo&shade=500"
                .to_string(),
            icon192_url: None,
            icon512_url: None,
            theme: serde_json::json!({
                "primary": "#111827",
                "secondary": "#f3f4f6",
                "foreground": "#1f2937",
                "background": "#ffffff",
            }),
            currency: "IDR".to_string(),
            show_driver_commission: true,
            show_driver_items_sold: true,
            show_driver_schedule: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Record sum type
// ---------------------------------------------------------------------------

/// A record of any table kind. The payload of generic store and remote
/// operations.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Product(Product),
    Driver(Driver),
    Sale(Sale),
    Location(Location),
    Schedule(ScheduleEntry),
    Payment(Payment),
    Settings(Settings),
}

impl Record {
    pub fn table(&self) -> Table {
        match self {
            Record::Product(_) => Table::Products,
            Record::Driver(_) => Table::Drivers,
            Record::Sale(_) => Table::Sales,
            Record::Location(_) => Table::Locations,
            Record::Schedule(_) => Table::Schedule,
            Record::Payment(_) => Table::Payments,
            Record::Settings(_) => Table::Settings,
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Record::Product(r) => &r.id,
            Record::Driver(r) => &r.id,
            Record::Sale(r) => &r.id,
            Record::Location(r) => &r.id,
            Record::Schedule(r) => &r.id,
            Record::Payment(r) => &r.id,
            Record::Settings(r) => &r.id,
        }
    }

    /// Sync marker, for syncable kinds only.
    pub fn synced(&self) -> Option<bool> {
        match self {
            Record::Sale(r) => Some(r.synced),
            Record::Payment(r) => Some(r.synced),
            _ => None,
        }
    }

    /// Set the sync marker. Returns false (and does nothing) for
    /// non-syncable kinds.
    pub fn set_synced(&mut self, synced: bool) -> bool {
        match self {
            Record::Sale(r) => r.synced = synced,
            Record::Payment(r) => r.synced = synced,
            _ => return false,
        }
        true
    }

    /// Full JSON of the record, as stored in the local payload column.
    pub fn to_json(&self) -> serde_json::Result<Value> {
        match self {
            Record::Product(r) => serde_json::to_value(r),
            Record::Driver(r) => serde_json::to_value(r),
            Record::Sale(r) => serde_json::to_value(r),
            Record::Location(r) => serde_json::to_value(r),
            Record::Schedule(r) => serde_json::to_value(r),
            Record::Payment(r) => serde_json::to_value(r),
            Record::Settings(r) => serde_json::to_value(r),
        }
    }

    /// JSON body for remote calls. The `synced` marker is device-local
    /// bookkeeping and never leaves the device.
    pub fn to_remote_json(&self) -> serde_json::Result<Value> {
        let mut value = self.to_json()?;
        if let Value::Object(ref mut map) = value {
            map.remove("synced");
        }
        Ok(value)
    }

    /// Decode a record of the given table kind from JSON.
    pub fn from_json(table: Table, value: Value) -> serde_json::Result<Record> {
        Ok(match table {
            Table::Products => Record::Product(serde_json::from_value(value)?),
            Table::Drivers => Record::Driver(serde_json::from_value(value)?),
            Table::Sales => Record::Sale(serde_json::from_value(value)?),
            Table::Locations => Record::Location(serde_json::from_value(value)?),
            Table::Schedule => Record::Schedule(serde_json::from_value(value)?),
            Table::Payments => Record::Payment(serde_json::from_value(value)?),
            Table::Settings => Record::Settings(serde_json::from_value(value)?),
        })
    }

    pub fn from_json_str(table: Table, payload: &str) -> serde_json::Result<Record> {
        Record::from_json(table, serde_json::from_str(payload)?)
    }

    pub fn into_product(self) -> Option<Product> {
        match self {
            Record::Product(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_driver(self) -> Option<Driver> {
        match self {
            Record::Driver(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_sale(self) -> Option<Sale> {
        match self {
            Record::Sale(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_location(self) -> Option<Location> {
        match self {
            Record::Location(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_schedule(self) -> Option<ScheduleEntry> {
        match self {
            Record::Schedule(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_payment(self) -> Option<Payment> {
        match self {
            Record::Payment(r) => Some(r),
            _ => None,
        }
    }

    pub fn into_settings(self) -> Option<Settings> {
        match self {
            Record::Settings(r) => Some(r),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Pending actions
// ---------------------------------------------------------------------------

/// Mutation kind recorded in the pending-action log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ActionKind::Create => "create",
            ActionKind::Update => "update",
            ActionKind::Delete => "delete",
        }
    }

    pub fn from_str(raw: &str) -> Option<ActionKind> {
        match raw {
            "create" => Some(ActionKind::Create),
            "update" => Some(ActionKind::Update),
            "delete" => Some(ActionKind::Delete),
            _ => None,
        }
    }
}

/// A queued mutation awaiting replay against the remote store.
///
/// Appended at the moment of a local reference-table mutation; flips to
/// `synced = true` exactly once when the replay succeeds. The log is
/// append-only. Permanent rejections are counted and eventually dead-letter
/// the action (`failed = true`) instead of looping forever.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingAction {
    pub id: String,
    pub kind: ActionKind,
    pub table: Table,
    pub payload: Record,
    pub enqueued_at: DateTime<Utc>,
    pub synced: bool,
    pub reject_count: u32,
    pub failed: bool,
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enum_wire_strings() {
        assert_eq!(
            serde_json::to_string(&DriverType::Mitra).unwrap(),
            "\"Mitra\""
        );
        assert_eq!(
            serde_json::to_string(&DriverType::Dedicated).unwrap(),
            "\"Dedicated\""
        );
        assert_eq!(
            serde_json::to_string(&LocationCategory::DailyRotation).unwrap(),
            "\"Daily Rotation\""
        );
        assert_eq!(
            serde_json::to_string(&LocationCategory::SpecialEvent).unwrap(),
            "\"Special/Event\""
        );
        assert_eq!(serde_json::to_string(&PaymentMethod::Qris).unwrap(), "\"qris\"");
        assert_eq!(
            serde_json::to_string(&EntityStatus::Inactive).unwrap(),
            "\"inactive\""
        );
    }

    #[test]
    fn test_table_metadata() {
        assert_eq!(Table::Products.order_column(), Some("name"));
        assert_eq!(Table::Sales.order_column(), Some("timestamp"));
        assert_eq!(Table::Schedule.order_column(), Some("date"));
        assert_eq!(Table::Settings.order_column(), None);

        assert!(Table::Sales.is_syncable());
        assert!(Table::Payments.is_syncable());
        assert!(!Table::Drivers.is_syncable());

        assert_eq!(Table::from_name("schedule"), Some(Table::Schedule));
        assert_eq!(Table::from_name("nonsense"), None);
    }

    #[test]
    fn test_sale_wire_shape() {
        let sale = Sale::new(
            "drv-1",
            "Budi",
            "p1",
            "Coconut",
            2,
            20_000.0,
            "Pantai Indah",
            PaymentMethod::Cash,
        );
        assert!(!sale.synced);

        let value = serde_json::to_value(&sale).unwrap();
        let obj = value.as_object().unwrap();
        assert!(obj.contains_key("driverId"));
        assert!(obj.contains_key("paymentMethod"));
        assert_eq!(obj["quantity"], 2);

        let back: Sale = serde_json::from_value(value).unwrap();
        assert_eq!(back, sale);
    }

    #[test]
    fn test_driver_type_field_name() {
        let driver = Driver {
            id: "drv-1".into(),
            name: "Budi".into(),
            kind: DriverType::Mitra,
            location: None,
            contact: "0812".into(),
            status: EntityStatus::Active,
            user_id: "user-1".into(),
        };
        let value = serde_json::to_value(&driver).unwrap();
        assert_eq!(value["type"], "Mitra");
        assert_eq!(value["userId"], "user-1");
    }

    #[test]
    fn test_record_roundtrip_and_remote_json() {
        let sale = Sale::new("d", "n", "p", "pn", 1, 5.0, "loc", PaymentMethod::Qris);
        let record = Record::Sale(sale.clone());

        let json = record.to_json().unwrap();
        assert_eq!(json["synced"], false);

        let remote = record.to_remote_json().unwrap();
        assert!(remote.get("synced").is_none());

        let back = Record::from_json(Table::Sales, json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_record_from_json_wrong_table_fails() {
        let location = Location {
            id: "loc-1".into(),
            name: "Pasar".into(),
            category: LocationCategory::DailyRotation,
        };
        let json = serde_json::to_value(&location).unwrap();
        assert!(Record::from_json(Table::Sales, json).is_err());
    }

    #[test]
    fn test_set_synced_only_on_syncable() {
        let mut record = Record::Payment(Payment::new("drv-1", "2025-08", 150_000.0));
        assert_eq!(record.synced(), Some(false));
        assert!(record.set_synced(true));
        assert_eq!(record.synced(), Some(true));

        let mut record = Record::Location(Location {
            id: "loc-1".into(),
            name: "Pasar".into(),
            category: LocationCategory::SpecialEvent,
        });
        assert!(!record.set_synced(true));
        assert_eq!(record.synced(), None);
    }

    #[test]
    fn test_default_settings_are_stable() {
        let settings = Settings::default_company();
        assert_eq!(settings.id, SETTINGS_ID);
        assert_eq!(settings.currency, "IDR");
    }
}
