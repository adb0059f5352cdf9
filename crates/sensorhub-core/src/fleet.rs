// ── Fleet scheduler ──
//
// Spawns one `Poller` per remote address. The local device is never
// polled: its sensor loop already writes the data on the hub.

use std::collections::HashSet;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::model::{DeviceAddress, PollTask};
use crate::poller::Poller;
use crate::reconcile::Reconciler;

/// Builds pollers that share one reconciler and recurrence interval.
#[derive(Debug, Clone)]
pub struct Fleet {
    reconciler: Reconciler,
    interval: Duration,
}

impl Fleet {
    pub fn new(reconciler: Reconciler, interval: Duration) -> Self {
        Self {
            reconciler,
            interval,
        }
    }

    /// Spawn a poller per distinct remote address.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, addresses: &[DeviceAddress]) -> FleetHandle {
        let cancel = CancellationToken::new();
        let mut seen = HashSet::new();
        let mut handles = Vec::new();
        let mut states = Vec::new();

        for address in addresses {
            if address.is_local() {
                continue;
            }
            if !seen.insert(address) {
                warn!(address = %address, "duplicate address ignored");
                continue;
            }

            let (poller, rx) = Poller::new(self.reconciler.clone(), address.clone(), self.interval);
            handles.push(tokio::spawn(poller.run(cancel.child_token())));
            states.push(rx);
        }

        info!(
            pollers = handles.len(),
            interval_secs = self.interval.as_secs(),
            "fleet started"
        );
        FleetHandle {
            cancel,
            handles,
            states,
        }
    }
}

/// Owns the running pollers.
#[derive(Debug)]
pub struct FleetHandle {
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
    states: Vec<watch::Receiver<PollTask>>,
}

impl FleetHandle {
    pub fn poller_count(&self) -> usize {
        self.handles.len()
    }

    /// Addresses being polled, in spawn order.
    pub fn addresses(&self) -> Vec<DeviceAddress> {
        self.states
            .iter()
            .map(|rx| rx.borrow().address.clone())
            .collect()
    }

    /// Current state of every poller.
    pub fn snapshot(&self) -> Vec<PollTask> {
        self.states.iter().map(|rx| rx.borrow().clone()).collect()
    }

    /// Watch one poller's state.
    pub fn subscribe(&self, address: &DeviceAddress) -> Option<watch::Receiver<PollTask>> {
        self.states
            .iter()
            .find(|rx| rx.borrow().address == *address)
            .cloned()
    }

    /// Token that stops every poller when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel every poller and wait for them to stop.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.join().await;
    }

    /// Wait for the pollers. Without a cancellation this never returns.
    pub async fn join(self) {
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "poller task ended abnormally");
            }
        }
        info!("fleet stopped");
    }
}
