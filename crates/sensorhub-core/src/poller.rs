// ── Device poller ──
//
// One long-lived task per remote device. Each tick fetches the device's
// status (to learn its current name) and runs a reconcile pass. Errors are
// logged and published, never propagated: the next tick is the retry.

use std::time::Duration;

use chrono::Utc;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::error::CoreError;
use crate::model::{DeviceAddress, PollState, PollTask, SyncReport};
use crate::reconcile::Reconciler;

/// Periodic sync of a single device.
#[derive(Debug)]
pub struct Poller {
    reconciler: Reconciler,
    address: DeviceAddress,
    interval: Duration,
    state: watch::Sender<PollTask>,
}

impl Poller {
    /// Create a poller and the receiver its state is published on.
    pub fn new(
        reconciler: Reconciler,
        address: DeviceAddress,
        interval: Duration,
    ) -> (Self, watch::Receiver<PollTask>) {
        let (state, rx) = watch::channel(PollTask::new(address.clone()));
        let poller = Self {
            reconciler,
            address,
            interval,
            state,
        };
        (poller, rx)
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    /// Run one `Polling` cycle and publish its outcome.
    pub async fn poll_once(&self) -> Result<SyncReport, CoreError> {
        self.state.send_modify(|t| t.state = PollState::Polling);

        let result = self.fetch_and_sync().await;

        self.state.send_modify(|t| {
            t.attempts += 1;
            t.last_poll = Some(Utc::now());
            match &result {
                Ok(report) => {
                    t.state = PollState::Idle;
                    t.last_sync = Some(report.clone());
                    t.last_error = None;
                }
                Err(e) => {
                    t.state = PollState::Failed;
                    t.last_error = Some(e.to_string());
                }
            }
        });
        result
    }

    async fn fetch_and_sync(&self) -> Result<SyncReport, CoreError> {
        let status = self
            .reconciler
            .transport()
            .fetch_status(&self.address)
            .await?;
        let name = status.name.clone();
        self.state.send_modify(|t| t.last_status = Some(status));
        self.reconciler.sync_once(&self.address, &name).await
    }

    /// Poll until `cancel` fires. The first poll happens immediately.
    pub async fn run(self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    tokio::select! {
                        biased;
                        () = cancel.cancelled() => break,
                        result = self.poll_once() => {
                            if let Err(e) = result {
                                log_failure(&self.address, &e);
                            }
                        }
                    }
                }
            }
        }
        // An in-flight poll may have been dropped while still `Polling`.
        self.state.send_modify(|t| t.state = PollState::Stopped);
        debug!(address = %self.address, "poller stopped");
    }
}

fn log_failure(address: &DeviceAddress, err: &CoreError) {
    if err.is_transient() {
        warn!(address = %address, error = %err, "poll failed, retrying next interval");
    } else {
        error!(address = %address, kind = err.kind(), error = %err, "poll failed");
    }
}
