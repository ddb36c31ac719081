//! Error taxonomy for the sync engine.
//!
//! Offline is a normal operating mode, not an error: local-first operations
//! never fail just because the device has no network. Only remote failures
//! during an interactive foreground call surface to the caller; background
//! reconciliation failures are logged and retried on later cycles.

use thiserror::Error;

/// Failure of a call against the remote store.
///
/// The engine only needs to distinguish three shapes: errors that will
/// plausibly resolve on their own (retry next cycle), errors the remote
/// will keep producing for the same input, and "that row does not exist".
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RemoteError {
    /// Network timeout, connection failure, or a 5xx from the backend.
    #[error("transient remote failure: {0}")]
    Transient(String),

    /// The remote accepted the request and rejected its content
    /// (validation failure, constraint violation).
    #[error("remote rejected request: {0}")]
    Rejected(String),

    /// The targeted row does not exist on the remote store.
    #[error("remote row not found")]
    NotFound,
}

/// Top-level error type of the crate.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The local durable store is unreachable, corrupt, or over quota.
    /// Callers must not assume partial success.
    #[error("storage error: {0}")]
    Storage(String),

    /// A remote call failed in a way the next cycle may resolve.
    #[error("remote unavailable: {0}")]
    RemoteTransient(String),

    /// A remote call was rejected; retrying the same payload will not help.
    #[error("remote rejected: {0}")]
    RemoteRejected(String),

    /// The targeted record does not exist (locally or remotely, per context).
    #[error("record not found")]
    NotFound,

    /// Missing or invalid startup configuration (remote URL / credential).
    /// Fatal at initialization; never produced by the running engine.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<rusqlite::Error> for SyncError {
    fn from(err: rusqlite::Error) -> Self {
        SyncError::Storage(err.to_string())
    }
}

impl From<RemoteError> for SyncError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Transient(msg) => SyncError::RemoteTransient(msg),
            RemoteError::Rejected(msg) => SyncError::RemoteRejected(msg),
            RemoteError::NotFound => SyncError::NotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_error_maps_to_sync_error() {
        assert!(matches!(
            SyncError::from(RemoteError::Transient("timeout".into())),
            SyncError::RemoteTransient(_)
        ));
        assert!(matches!(
            SyncError::from(RemoteError::Rejected("bad field".into())),
            SyncError::RemoteRejected(_)
        ));
        assert!(matches!(
            SyncError::from(RemoteError::NotFound),
            SyncError::NotFound
        ));
    }

    #[test]
    fn test_storage_error_from_rusqlite() {
        let err = rusqlite::Error::InvalidQuery;
        assert!(matches!(SyncError::from(err), SyncError::Storage(_)));
    }
}
