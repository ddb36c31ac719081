//! Remote store client.
//!
//! The engine only requires the [`RemoteStore`] contract: insert, update and
//! delete by id, ordered select, and errors that distinguish "not found" from
//! everything else. [`HttpRemoteStore`] implements it against the hosted
//! PostgREST-style relational backend. Each call is independent; the engine
//! never assumes the transport preserves request ordering.

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

use crate::config::RemoteConfig;
use crate::error::{RemoteError, SyncError};
use crate::models::{Record, Table};

/// Default timeout for remote requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Contract
// ---------------------------------------------------------------------------

/// Gateway to the authoritative relational backend.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Insert a new row. Rejected when the id already exists.
    async fn insert(&self, record: &Record) -> Result<(), RemoteError>;

    /// Insert-or-replace by id. Used for pushing syncable records so a
    /// replayed push converges instead of failing on a duplicate id.
    async fn upsert(&self, record: &Record) -> Result<(), RemoteError>;

    /// Update fields of an existing row. `NotFound` when the id is absent.
    async fn update(&self, table: Table, id: &str, fields: &Value) -> Result<(), RemoteError>;

    /// Delete a row by id. `NotFound` when the id is absent.
    async fn delete(&self, table: Table, id: &str) -> Result<(), RemoteError>;

    /// The full remote set of a table, in its natural ascending order.
    async fn select_all(&self, table: Table) -> Result<Vec<Record>, RemoteError>;
}

// ---------------------------------------------------------------------------
// Error mapping
// ---------------------------------------------------------------------------

/// Convert a `reqwest::Error` into a transport-level remote error.
fn friendly_error(url: &str, err: &reqwest::Error) -> RemoteError {
    if err.is_connect() {
        return RemoteError::Transient(format!("cannot reach remote store at {url}"));
    }
    if err.is_timeout() {
        return RemoteError::Transient(format!("connection to {url} timed out"));
    }
    RemoteError::Transient(format!("network error communicating with {url}: {err}"))
}

/// Map an unsuccessful HTTP status (plus response body) to a remote error.
fn status_error(status: StatusCode, body: &str) -> RemoteError {
    let detail = if body.trim().is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        format!("HTTP {}: {}", status.as_u16(), body.trim())
    };
    match status.as_u16() {
        404 => RemoteError::NotFound,
        408 | 429 => RemoteError::Transient(detail),
        s if s >= 500 => RemoteError::Transient(detail),
        _ => RemoteError::Rejected(detail),
    }
}

// ---------------------------------------------------------------------------
// HTTP implementation
// ---------------------------------------------------------------------------

/// [`RemoteStore`] over the hosted REST endpoint.
pub struct HttpRemoteStore {
    client: Client,
    base_url: String,
    api_key: String,
}

impl HttpRemoteStore {
    pub fn new(config: &RemoteConfig) -> Result<HttpRemoteStore, SyncError> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| SyncError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(HttpRemoteStore {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
        })
    }

    fn table_url(&self, table: Table) -> String {
        format!("{}/rest/v1/{}", self.base_url, table.name())
    }

    /// Send an authenticated request and return the decoded JSON body
    /// (`Value::Null` for empty responses).
    async fn send(
        &self,
        method: Method,
        url: &str,
        prefer: &str,
        body: Option<&Value>,
    ) -> Result<Value, RemoteError> {
        let mut req = self
            .client
            .request(method, url)
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json");
        if !prefer.is_empty() {
            req = req.header("Prefer", prefer);
        }
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| friendly_error(&self.base_url, &e))?;
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(status_error(status, &text));
        }
        if text.is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text)
            .map_err(|e| RemoteError::Transient(format!("invalid JSON from remote store: {e}")))
    }

    /// Interpret a `return=representation` response for a single-row write:
    /// an empty array means the filter matched nothing.
    fn require_row(value: Value) -> Result<(), RemoteError> {
        match value {
            Value::Array(rows) if rows.is_empty() => Err(RemoteError::NotFound),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteStore for HttpRemoteStore {
    async fn insert(&self, record: &Record) -> Result<(), RemoteError> {
        let body = record
            .to_remote_json()
            .map_err(|e| RemoteError::Rejected(format!("encode record: {e}")))?;
        let url = self.table_url(record.table());
        debug!(table = %record.table(), id = %record.id(), "remote insert");
        self.send(Method::POST, &url, "return=minimal", Some(&body))
            .await?;
        Ok(())
    }

    async fn upsert(&self, record: &Record) -> Result<(), RemoteError> {
        let body = record
            .to_remote_json()
            .map_err(|e| RemoteError::Rejected(format!("encode record: {e}")))?;
        let url = self.table_url(record.table());
        debug!(table = %record.table(), id = %record.id(), "remote upsert");
        self.send(
            Method::POST,
            &url,
            "return=minimal,resolution=merge-duplicates",
            Some(&body),
        )
        .await?;
        Ok(())
    }

    async fn update(&self, table: Table, id: &str, fields: &Value) -> Result<(), RemoteError> {
        let url = format!("{}?id=eq.{}", self.table_url(table), id);
        debug!(table = %table, id = %id, "remote update");
        let resp = self
            .send(Method::PATCH, &url, "return=representation", Some(fields))
            .await?;
        Self::require_row(resp)
    }

    async fn delete(&self, table: Table, id: &str) -> Result<(), RemoteError> {
        let url = format!("{}?id=eq.{}", self.table_url(table), id);
        debug!(table = %table, id = %id, "remote delete");
        let resp = self
            .send(Method::DELETE, &url, "return=representation", None)
            .await?;
        Self::require_row(resp)
    }

    async fn select_all(&self, table: Table) -> Result<Vec<Record>, RemoteError> {
        let mut url = format!("{}?select=*", self.table_url(table));
        if let Some(col) = table.order_column() {
            url.push_str(&format!("&order={col}.asc"));
        }

        let body = self.send(Method::GET, &url, "", None).await?;
        let rows = match body {
            Value::Array(rows) => rows,
            Value::Null => Vec::new(),
            other => {
                return Err(RemoteError::Transient(format!(
                    "expected array from {}, got {other}",
                    table.name()
                )))
            }
        };

        let mut records = Vec::with_capacity(rows.len());
        for row in rows {
            let record = Record::from_json(table, row)
                .map_err(|e| RemoteError::Transient(format!("decode {table} row: {e}")))?;
            records.push(record);
        }
        Ok(records)
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EntityStatus, Product};

    fn http_store(base_url: &str) -> HttpRemoteStore {
        let config = RemoteConfig::new(base_url, "test-key").expect("config");
        HttpRemoteStore::new(&config).expect("client")
    }

    fn product(id: &str, name: &str) -> Record {
        Record::Product(Product {
            id: id.to_string(),
            name: name.to_string(),
            price: 12_000.0,
            commission: 1_500.0,
            image_url: String::new(),
            status: EntityStatus::Active,
        })
    }

    #[test]
    fn test_status_error_mapping() {
        assert_eq!(
            status_error(StatusCode::NOT_FOUND, ""),
            RemoteError::NotFound
        );
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, "boom"),
            RemoteError::Transient(_)
        ));
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, ""),
            RemoteError::Transient(_)
        ));
        assert!(matches!(
            status_error(StatusCode::CONFLICT, "duplicate key"),
            RemoteError::Rejected(_)
        ));
        assert!(matches!(
            status_error(StatusCode::UNPROCESSABLE_ENTITY, ""),
            RemoteError::Rejected(_)
        ));
    }

    #[test]
    fn test_require_row() {
        assert_eq!(
            HttpRemoteStore::require_row(Value::Array(vec![])),
            Err(RemoteError::NotFound)
        );
        assert_eq!(
            HttpRemoteStore::require_row(serde_json::json!([{"id": "x"}])),
            Ok(())
        );
        assert_eq!(HttpRemoteStore::require_row(Value::Null), Ok(()));
    }

    #[tokio::test]
    async fn test_select_all_orders_by_natural_index() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/rest/v1/products")
            .match_query(mockito::Matcher::UrlEncoded("order".into(), "name.asc".into()))
            .with_status(200)
            .with_body(
                serde_json::json!([
                    {"id": "p1", "name": "Coconut", "price": 10000.0, "commission": 1000.0,
                     "imageUrl": "", "status": "active"},
                ])
                .to_string(),
            )
            .create_async()
            .await;

        let store = http_store(&server.url());
        let records = store.select_all(Table::Products).await.unwrap();
        mock.assert_async().await;

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id(), "p1");
    }

    #[tokio::test]
    async fn test_insert_sends_auth_headers() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/rest/v1/sales")
            .match_header("apikey", "test-key")
            .match_header("authorization", "Bearer test-key")
            .with_status(201)
            .create_async()
            .await;

        let sale = crate::models::Sale::new(
            "drv-1",
            "Budi",
            "p1",
            "Coconut",
            2,
            20_000.0,
            "Pasar",
            crate::models::PaymentMethod::Cash,
        );
        let store = http_store(&server.url());
        store.insert(&Record::Sale(sale)).await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_update_empty_representation_is_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("PATCH", "/rest/v1/drivers")
            .match_query(mockito::Matcher::UrlEncoded("id".into(), "eq.d1".into()))
            .with_status(200)
            .with_body("[]")
            .create_async()
            .await;

        let store = http_store(&server.url());
        let result = store
            .update(Table::Drivers, "d1", &serde_json::json!({"status": "inactive"}))
            .await;
        assert_eq!(result, Err(RemoteError::NotFound));
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/rest/v1/products")
            .with_status(503)
            .with_body("service unavailable")
            .create_async()
            .await;

        let store = http_store(&server.url());
        let result = store.insert(&product("p1", "Coconut")).await;
        assert!(matches!(result, Err(RemoteError::Transient(_))));
    }
}
