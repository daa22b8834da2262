//! # Roster: the supervisor's worker bookkeeping.
//!
//! A roster is a list of **slots** in discovery order plus a `pid → slot` index
//! and the pool counters. A slot outlives the processes that fill it: when a
//! worker crashes and is respawned, the replacement lands in the same slot with
//! the same retained spec.
//!
//! ```text
//! slot state machine
//!
//!   insert ──► Live(record) ──exit, normal or respawn off──► Exited
//!                 ▲     │
//!                 │     └──exit, abnormal + respawn on──► Respawning
//!                 │                                          │
//!                 └────────────── respawn ok ────────────────┤
//!                                                            └─ respawn failed ─► Exited
//! ```
//!
//! ## Counters
//! - `worker_count`: live records (the population the ready condition waits for)
//! - `online_count`: live records that reported online (`<= worker_count`)
//! - `working`: slots not yet `Exited` (the done condition waits for 0)
//! - `respawning`: slots between a crash and their replacement
//!
//! Only the supervisor mutates a roster; callbacks receive `&Roster`.

use std::collections::HashMap;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::TransportError;
use crate::process::{HandleRef, Pid, Spawned, WorkerEvent, WorkerSpec};

/// Observable state of a slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// A process occupies the slot.
    Live {
        /// Process id of the occupant.
        pid: Pid,
        /// The occupant reported online.
        online: bool,
    },
    /// The previous occupant crashed; a replacement is queued.
    Respawning,
    /// The slot is permanently finished.
    Exited,
}

pub(crate) struct WorkerRecord {
    pid: Pid,
    handle: HandleRef,
    online: bool,
    /// Taken once when events are bound.
    events: Option<mpsc::UnboundedReceiver<WorkerEvent>>,
    /// Filled by a respawn rather than by `spawn()`.
    replacement: bool,
}

enum Occupant {
    Live(WorkerRecord),
    Respawning,
    Exited,
}

struct Slot {
    spec: WorkerSpec,
    crashes: u32,
    occupant: Occupant,
}

/// Result of marking a worker online.
pub(crate) struct Online {
    pub(crate) slot: usize,
    /// First online report for this record.
    pub(crate) first: bool,
    pub(crate) replacement: bool,
}

/// Worker pool bookkeeping.
#[derive(Default)]
pub struct Roster {
    slots: Vec<Slot>,
    index: HashMap<Pid, usize>,
    worker_count: usize,
    online_count: usize,
    working: usize,
    respawning: usize,
}

impl Roster {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Live workers.
    pub fn worker_count(&self) -> usize {
        self.worker_count
    }

    /// Live workers that have reported online.
    pub fn online_count(&self) -> usize {
        self.online_count
    }

    /// Slots that have not permanently exited.
    pub fn working(&self) -> usize {
        self.working
    }

    /// Slots waiting for a replacement.
    pub fn respawning(&self) -> usize {
        self.respawning
    }

    /// Number of slots ever filled.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Every live worker is online and no slot is waiting for a replacement.
    pub fn is_ready(&self) -> bool {
        self.respawning == 0 && self.worker_count > 0 && self.online_count == self.worker_count
    }

    /// Handle of the live worker with this pid.
    pub fn get(&self, pid: Pid) -> Option<&HandleRef> {
        self.index.get(&pid).and_then(|&slot| self.handle(slot))
    }

    /// Handle of the live occupant of `slot`.
    pub fn handle(&self, slot: usize) -> Option<&HandleRef> {
        match &self.slots.get(slot)?.occupant {
            Occupant::Live(rec) => Some(&rec.handle),
            _ => None,
        }
    }

    /// Slot index currently occupied by `pid`.
    pub fn slot_of(&self, pid: Pid) -> Option<usize> {
        self.index.get(&pid).copied()
    }

    pub fn state(&self, slot: usize) -> Option<SlotState> {
        let state = match &self.slots.get(slot)?.occupant {
            Occupant::Live(rec) => SlotState::Live {
                pid: rec.pid,
                online: rec.online,
            },
            Occupant::Respawning => SlotState::Respawning,
            Occupant::Exited => SlotState::Exited,
        };
        Some(state)
    }

    /// The spec retained for `slot`.
    pub fn spec(&self, slot: usize) -> Option<&WorkerSpec> {
        self.slots.get(slot).map(|s| &s.spec)
    }

    /// Abnormal exits observed in `slot` while respawn was enabled.
    pub fn crashes(&self, slot: usize) -> u32 {
        self.slots.get(slot).map_or(0, |s| s.crashes)
    }

    /// Calls `logic(handle, slot)` for every live worker in slot order.
    pub fn each<F>(&self, mut logic: F)
    where
        F: FnMut(&HandleRef, usize),
    {
        for (i, slot) in self.slots.iter().enumerate() {
            if let Occupant::Live(rec) = &slot.occupant {
                logic(&rec.handle, i);
            }
        }
    }

    /// Pids of live workers in slot order.
    pub fn pids(&self) -> Vec<Pid> {
        let mut pids = Vec::with_capacity(self.worker_count);
        for slot in &self.slots {
            if let Occupant::Live(rec) = &slot.occupant {
                pids.push(rec.pid);
            }
        }
        pids
    }

    /// Sends `message` to the live worker `pid`.
    pub fn send(&self, pid: Pid, message: Value) -> Result<(), TransportError> {
        match self.get(pid) {
            Some(handle) => handle.send(message),
            None => Err(TransportError::UnknownWorker { pid }),
        }
    }

    /// Sends `message` to every live worker; returns how many accepted it.
    ///
    /// Failures are logged and skipped.
    pub fn broadcast(&self, message: &Value) -> usize {
        let mut delivered = 0;
        self.each(|handle, slot| match handle.send(message.clone()) {
            Ok(()) => delivered += 1,
            Err(e) => {
                tracing::warn!(pid = handle.id(), slot, error = %e, "broadcast send failed")
            }
        });
        delivered
    }

    // ---- supervisor-side mutation ----

    /// Fills a new slot. Returns `(slot, pid)`.
    pub(crate) fn insert(&mut self, spec: WorkerSpec, spawned: Spawned) -> (usize, Pid) {
        let slot = self.slots.len();
        let (record, pid) = WorkerRecord::from_spawned(spawned, false);
        self.slots.push(Slot {
            spec,
            crashes: 0,
            occupant: Occupant::Live(record),
        });
        self.index.insert(pid, slot);
        self.worker_count += 1;
        self.working += 1;
        (slot, pid)
    }

    /// Marks the record for `pid` online. `None` for unknown pids.
    pub(crate) fn mark_online(&mut self, pid: Pid) -> Option<Online> {
        let slot = self.slot_of(pid)?;
        let Occupant::Live(rec) = &mut self.slots[slot].occupant else {
            return None;
        };
        let first = !rec.online;
        if first {
            rec.online = true;
            self.online_count += 1;
        }
        Some(Online {
            slot,
            first,
            replacement: rec.replacement,
        })
    }

    /// Removes the live record for `pid`, leaving its slot vacated (still `working`).
    ///
    /// The caller must follow with [`finish`](Self::finish) or
    /// [`begin_respawn`](Self::begin_respawn).
    pub(crate) fn retire(&mut self, pid: Pid) -> Option<usize> {
        let slot = self.index.remove(&pid)?;
        let rec = match std::mem::replace(&mut self.slots[slot].occupant, Occupant::Exited) {
            Occupant::Live(rec) => rec,
            other => {
                self.slots[slot].occupant = other;
                return None;
            }
        };
        if rec.online {
            self.online_count -= 1;
        }
        self.worker_count -= 1;
        // still counted in `working` until finish/begin_respawn
        Some(slot)
    }

    /// Marks a retired slot permanently finished. Returns the remaining `working` count.
    pub(crate) fn finish(&mut self, slot: usize) -> usize {
        if let Some(s) = self.slots.get_mut(slot) {
            s.occupant = Occupant::Exited;
            self.working = self.working.saturating_sub(1);
        }
        self.working
    }

    /// Moves a retired slot to `Respawning`. Returns the slot's crash count.
    pub(crate) fn begin_respawn(&mut self, slot: usize) -> u32 {
        let Some(s) = self.slots.get_mut(slot) else {
            return 0;
        };
        s.crashes = s.crashes.saturating_add(1);
        s.occupant = Occupant::Respawning;
        self.respawning += 1;
        s.crashes
    }

    pub(crate) fn is_respawning(&self, slot: usize) -> bool {
        matches!(
            self.slots.get(slot).map(|s| &s.occupant),
            Some(Occupant::Respawning)
        )
    }

    /// Puts a replacement into a `Respawning` slot. Returns its pid.
    pub(crate) fn complete_respawn(&mut self, slot: usize, spawned: Spawned) -> Pid {
        let (record, pid) = WorkerRecord::from_spawned(spawned, true);
        self.slots[slot].occupant = Occupant::Live(record);
        self.index.insert(pid, slot);
        self.respawning -= 1;
        self.worker_count += 1;
        pid
    }

    /// Gives up on a `Respawning` slot. Returns the remaining `working` count.
    pub(crate) fn abandon_respawn(&mut self, slot: usize) -> usize {
        self.respawning -= 1;
        self.finish(slot)
    }

    /// Takes the event receivers of records that were never bound.
    pub(crate) fn take_unbound(&mut self) -> Vec<(Pid, mpsc::UnboundedReceiver<WorkerEvent>)> {
        let mut unbound = Vec::new();
        for slot in &mut self.slots {
            if let Occupant::Live(rec) = &mut slot.occupant {
                if let Some(events) = rec.events.take() {
                    unbound.push((rec.pid, events));
                }
            }
        }
        unbound
    }
}

impl WorkerRecord {
    fn from_spawned(spawned: Spawned, replacement: bool) -> (Self, Pid) {
        let pid = spawned.handle.id();
        let record = Self {
            pid,
            handle: spawned.handle,
            online: false,
            events: Some(spawned.events),
            replacement,
        };
        (record, pid)
    }
}
