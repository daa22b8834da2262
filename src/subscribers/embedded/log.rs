//! # LogWriter: pool events as tracing records
//!
//! A subscriber that turns every [`Event`] into a `tracing` record under the
//! `procvisor::events` target. Install any `tracing` subscriber to see them.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO procvisor::events: worker spawned pid=4101 slot=0
//! INFO procvisor::events: worker online pid=4101 slot=0
//! INFO procvisor::events: pool ready
//! WARN procvisor::events: worker exited pid=4101 slot=0 code=Some(1) signal=None
//! WARN procvisor::events: respawn scheduled slot=0 crashes=1 delay_ms=None
//! INFO procvisor::events: worker respawned pid=4107 slot=0 crashes=1
//! INFO procvisor::events: pool done
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or("unknown");
        match e.kind {
            EventKind::WorkerSpawned => {
                tracing::info!(
                    target: "procvisor::events",
                    pid = ?e.pid, slot = ?e.slot,
                    "worker spawned"
                );
            }
            EventKind::WorkerOnline => {
                tracing::info!(
                    target: "procvisor::events",
                    pid = ?e.pid, slot = ?e.slot,
                    "worker online"
                );
            }
            EventKind::WorkerExited => {
                let normal = e.code == Some(0) && e.signal.is_none();
                if normal {
                    tracing::info!(
                        target: "procvisor::events",
                        pid = ?e.pid, slot = ?e.slot,
                        "worker exited"
                    );
                } else {
                    tracing::warn!(
                        target: "procvisor::events",
                        pid = ?e.pid, slot = ?e.slot, code = ?e.code, signal = ?e.signal,
                        "worker exited"
                    );
                }
            }
            EventKind::RespawnScheduled => {
                tracing::warn!(
                    target: "procvisor::events",
                    slot = ?e.slot, crashes = ?e.attempt, delay_ms = ?e.delay_ms,
                    "respawn scheduled"
                );
            }
            EventKind::WorkerRespawned => {
                tracing::info!(
                    target: "procvisor::events",
                    pid = ?e.pid, slot = ?e.slot, crashes = ?e.attempt,
                    "worker respawned"
                );
            }
            EventKind::SpawnFailed => {
                tracing::error!(
                    target: "procvisor::events",
                    slot = ?e.slot, reason,
                    "spawn failed"
                );
            }
            EventKind::HookFired => {
                tracing::debug!(
                    target: "procvisor::events",
                    pid = ?e.pid, hook = ?e.hook,
                    "hook fired"
                );
            }
            EventKind::MessageUnrouted => {
                tracing::debug!(target: "procvisor::events", pid = ?e.pid, "message unrouted");
            }
            EventKind::PoolReady => {
                tracing::info!(target: "procvisor::events", "pool ready");
            }
            EventKind::PoolDone => {
                tracing::info!(target: "procvisor::events", "pool done");
            }
            EventKind::SubscriberOverflow => {
                tracing::warn!(target: "procvisor::events", reason, "subscriber overflow");
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(target: "procvisor::events", reason, "subscriber panicked");
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
