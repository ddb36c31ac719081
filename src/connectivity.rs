//! Connectivity monitor.
//!
//! Exposes the current online/offline state plus edge-triggered transition
//! events over a watch channel. The host feeds `set_online` from its
//! network-state facility; the sync loop subscribes so an offline→online
//! transition starts an immediate cycle. [`probe`] is a fallback signal
//! source for hosts without a native one.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;

/// Timeout for the lightweight reachability probe.
const PROBE_TIMEOUT: Duration = Duration::from_secs(10);

/// Cloneable handle to the online/offline signal.
#[derive(Clone)]
pub struct Connectivity {
    tx: Arc<watch::Sender<bool>>,
}

impl Connectivity {
    pub fn new(initially_online: bool) -> Connectivity {
        let (tx, _rx) = watch::channel(initially_online);
        Connectivity { tx: Arc::new(tx) }
    }

    pub fn is_online(&self) -> bool {
        *self.tx.borrow()
    }

    /// Record a network-state change. Transitions are logged and broadcast;
    /// repeated reports of the same state are ignored.
    pub fn set_online(&self, online: bool) {
        let changed = self.tx.send_if_modified(|state| {
            if *state == online {
                false
            } else {
                *state = online;
                true
            }
        });
        if changed {
            if online {
                info!("network online");
            } else {
                info!("network offline; local writes will queue");
            }
        }
    }

    /// Subscribe to transition events. `changed().await` wakes on every
    /// state flip; read the new state with `borrow_and_update()`.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

/// Quick reachability check: HEAD request against the given URL.
pub async fn probe(url: &str) -> bool {
    let client = match reqwest::Client::builder().timeout(PROBE_TIMEOUT).build() {
        Ok(c) => c,
        Err(_) => return false,
    };
    match client.head(url).send().await {
        Ok(resp) => resp.status().is_success() || resp.status().is_redirection(),
        Err(_) => false,
    }
}

// ===========================================================================
// Tests
// ===========================================================================
