//! # Pool events emitted by the supervisor.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Worker lifecycle**: spawned, online, exited, respawn scheduled, respawned, spawn failed
//! - **Dispatch**: a hook fired, a message fell through to the generic handler
//! - **Pool milestones**: ready, done
//!
//! plus the subscriber bookkeeping kinds published by [`SubscriberSet`](crate::SubscriberSet).
//!
//! ## Ordering guarantees
//! Each event has a process-wide sequence number (`seq`) that increases monotonically.
//!
//! ## Example
//! ```rust
//! use procvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerExited)
//!     .with_pid(4242)
//!     .with_slot(3)
//!     .with_exit(Some(1), None);
//!
//! assert_eq!(ev.kind, EventKind::WorkerExited);
//! assert_eq!(ev.pid, Some(4242));
//! assert_eq!(ev.code, Some(1));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::process::Pid;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of pool events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets: `reason` (`subscriber=<name> info=<panic>`)
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets: `reason` (`subscriber=<name> reason=<full|closed>`)
    SubscriberOverflow,

    // === Worker lifecycle ===
    /// A worker process was started from a queued spec.
    ///
    /// Sets: `pid`, `slot`
    WorkerSpawned,

    /// A worker reported readiness.
    ///
    /// Sets: `pid`, `slot`
    WorkerOnline,

    /// A worker process terminated.
    ///
    /// Sets: `pid`, `slot`, `code` and/or `signal`
    WorkerExited,

    /// A replacement for an abnormally exited worker was queued.
    ///
    /// Sets: `slot`, `attempt` (crash count of the slot), `delay_ms` when backoff applies
    RespawnScheduled,

    /// A replacement worker was started in the same slot.
    ///
    /// Sets: `pid`, `slot`, `attempt`
    WorkerRespawned,

    /// The spawn primitive refused to start a worker.
    ///
    /// Sets: `slot` (respawn only), `reason`
    SpawnFailed,

    // === Dispatch ===
    /// A keyed hook consumed a message.
    ///
    /// Sets: `pid` (sender, supervisor side), `hook`
    HookFired,

    /// A message went to the generic handler.
    ///
    /// Sets: `pid` (sender, supervisor side)
    MessageUnrouted,

    // === Pool milestones ===
    /// Every expected worker is online; the ready callback ran.
    PoolReady,

    /// Every worker has permanently exited; the done callback ran.
    PoolDone,
}

/// Pool event with optional metadata.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker process id, if applicable.
    pub pid: Option<Pid>,
    /// Pool slot (discovery index), if applicable.
    pub slot: Option<usize>,
    /// Exit code.
    pub code: Option<i32>,
    /// Terminating signal.
    pub signal: Option<i32>,
    /// Hook key that consumed a message.
    pub hook: Option<Arc<str>>,
    /// Human-readable reason (errors, overflow details, etc.).
    pub reason: Option<Arc<str>>,
    /// Respawn delay in milliseconds.
    pub delay_ms: Option<u32>,
    /// Crash count of the slot.
    pub attempt: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            pid: None,
            slot: None,
            code: None,
            signal: None,
            hook: None,
            reason: None,
            delay_ms: None,
            attempt: None,
        }
    }

    #[inline]
    pub fn with_pid(mut self, pid: Pid) -> Self {
        self.pid = Some(pid);
        self
    }

    #[inline]
    pub fn with_slot(mut self, slot: usize) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Attaches exit code and signal.
    #[inline]
    pub fn with_exit(mut self, code: Option<i32>, signal: Option<i32>) -> Self {
        self.code = code;
        self.signal = signal;
        self
    }

    #[inline]
    pub fn with_hook(mut self, key: impl Into<Arc<str>>) -> Self {
        self.hook = Some(key.into());
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a respawn delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    #[inline]
    pub fn with_attempt(mut self, n: u32) -> Self {
        self.attempt = Some(n);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} info={info}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::PoolReady);
        let b = Event::new(EventKind::PoolDone);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::RespawnScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }
}
