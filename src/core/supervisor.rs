//! # WorkerPoolSupervisor: spawns, tracks, and respawns a pool of worker processes.
//!
//! The supervisor owns the pending spec queue, the [`Roster`], the message
//! router, and the ready/done latches. Every input reaches it as a [`Signal`] on
//! a single inbox and is handled to completion before the next one, so the
//! roster needs no locking.
//!
//! ## High-level architecture
//! ```text
//! Setup (synchronous):
//!   add(spec) / each_cpu / each_thread ──► pending queue
//!   spawn() ──► Spawner::spawn(spec) per queued spec ──► Roster slot (Live)
//!          └──► bind_events(): one forwarder task per unbound record
//!
//! Event flow:
//!   worker events ──► forwarder(pid) ──► inbox ──► handle(Signal)
//!                                          ▲          ├─ Online  → online_count++, ready?
//!                                          │          ├─ Message → MessageRouter (role=supervisor)
//!                                          │          └─ Exit
//!                                          │               ├─ normal / respawn off → working--, done?
//!                                          │               └─ abnormal + respawn   → slot Respawning
//!                                          │                                          │
//!                                          └──── Signal::Respawn{slot} ◄─ (backoff) ◄─┘
//!
//! Observability:
//!   every transition ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//! ```
//!
//! ## Rules
//! - A respawn is always a separate inbox signal, never handled inside the exit
//!   that caused it.
//! - Ready fires once: every live worker online, no slot respawning.
//! - Done fires once: every slot permanently exited.
//! - Spawn and transport failures are logged and published, never returned.
//!
//! ## Example
//! ```rust,no_run
//! use procvisor::{Config, Logic, RoleLogic, WorkerSpec};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     match procvisor::new(Config { respawn: true, ..Config::default() }) {
//!         Logic::Supervisor(mut sup) => {
//!             sup.each_cpu(|s, i| {
//!                 s.add(WorkerSpec::new().env("SHARD", i.to_string()));
//!             })
//!             .hook("result", |v, worker| println!("{} -> {v}", worker.id()))
//!             .ready(|roster| println!("{} workers online", roster.online_count()))
//!             .done(|_| println!("all workers finished"))
//!             .spawn();
//!             sup.run().await;
//!         }
//!         Logic::Worker(mut agent) => {
//!             agent.worker(|a| {
//!                 let _ = a.send(serde_json::json!({ "result": 42 }));
//!             });
//!             agent.run().await;
//!         }
//!     }
//! }
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{broadcast, mpsc};
use tokio_util::sync::CancellationToken;

use super::config::Config;
use super::role::{Role, RoleLogic};
use super::roster::Roster;
use crate::error::TransportError;
use crate::events::{Bus, Event, EventKind};
use crate::hooks::{MessageRouter, Routed};
use crate::process::{ExitStatus, HandleRef, Pid, Spawner, WorkerEvent, WorkerSpec};
use crate::subscribers::{Subscribe, SubscriberSet};

/// Pool milestone callback. Receives a read-only view of the roster.
pub type PoolFn = Box<dyn FnMut(&Roster) + Send>;

/// Per-worker logic retained by [`WorkerPoolSupervisor::each`].
pub type EachFn = Arc<dyn Fn(&HandleRef, usize) + Send + Sync>;

/// Supervisor inbox item.
#[derive(Debug)]
enum Signal {
    Worker { pid: Pid, event: WorkerEvent },
    Respawn { slot: usize },
}

/// Supervisor side of a worker pool.
pub struct WorkerPoolSupervisor {
    cfg: Config,
    spawner: Arc<dyn Spawner>,
    router: MessageRouter,
    pending: Vec<WorkerSpec>,
    roster: Roster,

    on_ready: Option<PoolFn>,
    on_done: Option<PoolFn>,
    ready_fired: bool,
    done_fired: bool,
    each_logic: Option<EachFn>,

    tx: mpsc::UnboundedSender<Signal>,
    rx: mpsc::UnboundedReceiver<Signal>,

    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    /// Opened at construction so events published before `run` reach subscribers.
    events_rx: Option<broadcast::Receiver<Event>>,
}

impl WorkerPoolSupervisor {
    /// Creates a supervisor that starts workers through `spawner`.
    pub fn new(
        cfg: Config,
        spawner: Arc<dyn Spawner>,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Self {
        let bus = Bus::new(cfg.bus_capacity_clamped());
        let events_rx = (!subscribers.is_empty()).then(|| bus.subscribe());
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            cfg,
            spawner,
            router: MessageRouter::new(),
            pending: Vec::new(),
            roster: Roster::new(),
            on_ready: None,
            on_done: None,
            ready_fired: false,
            done_fired: false,
            each_logic: None,
            tx,
            rx,
            bus,
            subscribers,
            events_rx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Read-only view of the pool.
    pub fn roster(&self) -> &Roster {
        &self.roster
    }

    /// Specs queued for the next [`spawn`](Self::spawn).
    pub fn pending(&self) -> &[WorkerSpec] {
        &self.pending
    }

    /// Receiver for pool events published from now on.
    pub fn events(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// CPU count used by [`each_cpu`](Self::each_cpu).
    pub fn cpus(&self) -> usize {
        self.cfg.cpus()
    }

    /// Thread count used by [`each_thread`](Self::each_thread).
    pub fn threads(&self) -> usize {
        self.cfg.threads()
    }

    /// Queues a worker spec. Nothing starts until [`spawn`](Self::spawn).
    pub fn add(&mut self, spec: WorkerSpec) -> &mut Self {
        self.pending.push(spec);
        self
    }

    /// Starts a worker for every queued spec and binds event forwarding.
    ///
    /// With an empty queue this only binds records that are not bound yet.
    pub fn spawn(&mut self) -> &mut Self {
        for spec in std::mem::take(&mut self.pending) {
            match self.spawner.spawn(&spec) {
                Ok(spawned) => {
                    let (slot, pid) = self.roster.insert(spec, spawned);
                    tracing::debug!(pid, slot, "worker spawned");
                    self.bus.publish(
                        Event::new(EventKind::WorkerSpawned)
                            .with_pid(pid)
                            .with_slot(slot),
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        label = e.as_label(),
                        "worker spawn failed; spec dropped"
                    );
                    self.bus
                        .publish(Event::new(EventKind::SpawnFailed).with_reason(e.to_string()));
                }
            }
        }
        self.bind_events();
        self
    }

    /// Calls `logic(self, i)` for `i` in `0..count`.
    pub fn each_of<F>(&mut self, count: usize, mut logic: F) -> &mut Self
    where
        F: FnMut(&mut Self, usize),
    {
        for i in 0..count {
            logic(self, i);
        }
        self
    }

    /// Calls `logic(self, i)` once per CPU.
    pub fn each_cpu<F>(&mut self, logic: F) -> &mut Self
    where
        F: FnMut(&mut Self, usize),
    {
        let count = self.cpus();
        self.each_of(count, logic)
    }

    /// Calls `logic(self, i)` once per CPU thread (`cpus × threads_per_core`).
    pub fn each_thread<F>(&mut self, logic: F) -> &mut Self
    where
        F: FnMut(&mut Self, usize),
    {
        let count = self.threads();
        self.each_of(count, logic)
    }

    /// Calls `logic(handle, slot)` for every live worker, in slot order.
    ///
    /// The logic is retained: a respawned replacement gets it again, with its
    /// slot index, once it comes online.
    pub fn each<F>(&mut self, logic: F) -> &mut Self
    where
        F: Fn(&HandleRef, usize) + Send + Sync + 'static,
    {
        let logic: EachFn = Arc::new(logic);
        self.roster.each(|handle, slot| logic(handle, slot));
        self.each_logic = Some(logic);
        self
    }

    /// Sets the callback run once every expected worker is online.
    pub fn ready<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(&Roster) + Send + 'static,
    {
        self.on_ready = Some(Box::new(callback));
        self
    }

    /// Sets the callback run once every worker has permanently exited.
    pub fn done<F>(&mut self, callback: F) -> &mut Self
    where
        F: FnMut(&Roster) + Send + 'static,
    {
        self.on_done = Some(Box::new(callback));
        self
    }

    /// Sends `message` to the live worker `pid`.
    pub fn send(&self, pid: Pid, message: Value) -> Result<(), TransportError> {
        self.roster.send(pid, message)
    }

    /// Sends `message` to every live worker; returns how many accepted it.
    pub fn broadcast(&self, message: &Value) -> usize {
        self.roster.broadcast(message)
    }

    /// Drives the pool until every worker has permanently exited.
    ///
    /// Returns immediately if nothing was spawned.
    pub async fn run(&mut self) {
        self.run_until(CancellationToken::new()).await;
    }

    /// Drives the pool until done or until `token` is cancelled.
    ///
    /// Cancellation stops dispatch only; workers keep running.
    pub async fn run_until(&mut self, token: CancellationToken) {
        let listener = self.subscriber_listener();
        self.bind_events();

        while self.roster.working() > 0 {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(working = self.roster.working(), "supervisor loop cancelled");
                    break;
                }
                signal = self.rx.recv() => match signal {
                    Some(signal) => self.handle(signal),
                    None => break,
                },
            }
        }

        if let Some((stop, join)) = listener {
            stop.cancel();
            let _ = join.await;
        }
    }

    /// Spawns the bus → subscriber fan-out task, if there are subscribers.
    fn subscriber_listener(&mut self) -> Option<(CancellationToken, tokio::task::JoinHandle<()>)> {
        if self.subscribers.is_empty() {
            return None;
        }
        let mut rx = self.events_rx.take().unwrap_or_else(|| self.bus.subscribe());
        let set = SubscriberSet::new(self.subscribers.clone(), self.bus.clone());
        let stop = CancellationToken::new();
        let stopped = stop.clone();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = stopped.cancelled() => break,
                    ev = rx.recv() => match ev {
                        Ok(ev) => set.emit(&ev),
                        Err(broadcast::error::RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "subscriber listener lagged");
                        }
                        Err(broadcast::error::RecvError::Closed) => break,
                    },
                }
            }
            while let Ok(ev) = rx.try_recv() {
                set.emit(&ev);
            }
            set.shutdown().await;
        });
        Some((stop, join))
    }

    /// Starts one forwarder per record whose events are not bound yet.
    ///
    /// Outside a Tokio runtime nothing is taken; a later call binds them.
    fn bind_events(&mut self) {
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        for (pid, mut events) in self.roster.take_unbound() {
            let tx = self.tx.clone();
            runtime.spawn(async move {
                while let Some(event) = events.recv().await {
                    let last = matches!(event, WorkerEvent::Exit(_));
                    if tx.send(Signal::Worker { pid, event }).is_err() || last {
                        return;
                    }
                }
                // stream ended without an exit report
                let _ = tx.send(Signal::Worker {
                    pid,
                    event: WorkerEvent::Exit(ExitStatus::default()),
                });
            });
        }
    }

    /// Waits for and handles one inbox signal. Returns `false` if the inbox is closed.
    #[cfg(test)]
    pub(crate) async fn step(&mut self) -> bool {
        match self.rx.recv().await {
            Some(signal) => {
                self.handle(signal);
                true
            }
            None => false,
        }
    }

    /// Handles one inbox signal if one is queued.
    #[cfg(test)]
    pub(crate) fn try_step(&mut self) -> bool {
        match self.rx.try_recv() {
            Ok(signal) => {
                self.handle(signal);
                true
            }
            Err(_) => false,
        }
    }

    fn handle(&mut self, signal: Signal) {
        match signal {
            Signal::Worker { pid, event } => match event {
                WorkerEvent::Online => self.on_online(pid),
                WorkerEvent::Message(message) => self.on_message(pid, message),
                WorkerEvent::Exit(status) => self.on_exit(pid, status),
            },
            Signal::Respawn { slot } => self.on_respawn(slot),
        }
    }

    fn on_online(&mut self, pid: Pid) {
        let Some(online) = self.roster.mark_online(pid) else {
            tracing::debug!(pid, "online from unknown worker; ignored");
            return;
        };
        if !online.first {
            return;
        }
        self.bus.publish(
            Event::new(EventKind::WorkerOnline)
                .with_pid(pid)
                .with_slot(online.slot),
        );

        if online.replacement {
            let handle = self.roster.handle(online.slot);
            if let (Some(logic), Some(handle)) = (&self.each_logic, handle) {
                logic(handle, online.slot);
            }
        }
        self.check_ready();
    }

    fn on_message(&mut self, pid: Pid, message: Value) {
        let Some(sender) = self.roster.get(pid).cloned() else {
            tracing::debug!(pid, "message from unknown worker; ignored");
            return;
        };
        let ev = match self.router.route(message, Role::Supervisor, &sender) {
            Routed::Hook(key) => Event::new(EventKind::HookFired).with_hook(key),
            Routed::Generic => Event::new(EventKind::MessageUnrouted),
        };
        self.bus.publish(ev.with_pid(pid));
    }

    fn on_exit(&mut self, pid: Pid, status: ExitStatus) {
        let Some(slot) = self.roster.retire(pid) else {
            tracing::debug!(pid, "exit from unknown worker; ignored");
            return;
        };
        self.bus.publish(
            Event::new(EventKind::WorkerExited)
                .with_pid(pid)
                .with_slot(slot)
                .with_exit(status.code, status.signal),
        );

        if status.is_normal() {
            tracing::debug!(pid, slot, "worker finished");
        } else {
            tracing::warn!(
                pid,
                slot,
                code = ?status.code,
                signal = ?status.signal,
                "worker exited abnormally"
            );
        }

        if self.cfg.respawn && !status.is_normal() {
            let crashes = self.roster.begin_respawn(slot);
            self.schedule_respawn(slot, crashes);
        } else {
            self.roster.finish(slot);
            self.check_done();
        }
    }

    /// Queues `Signal::Respawn` behind everything already in the inbox,
    /// after the backoff delay if one is configured.
    fn schedule_respawn(&mut self, slot: usize, crashes: u32) {
        let delay = self
            .cfg
            .respawn_backoff
            .map(|policy| policy.next(crashes.saturating_sub(1)));

        let mut ev = Event::new(EventKind::RespawnScheduled)
            .with_slot(slot)
            .with_attempt(crashes);
        if let Some(d) = delay {
            ev = ev.with_delay(d);
        }
        self.bus.publish(ev);

        match (delay, tokio::runtime::Handle::try_current()) {
            (Some(delay), Ok(runtime)) if !delay.is_zero() => {
                let tx = self.tx.clone();
                runtime.spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(Signal::Respawn { slot });
                });
            }
            _ => {
                let _ = self.tx.send(Signal::Respawn { slot });
            }
        }
    }

    fn on_respawn(&mut self, slot: usize) {
        if !self.roster.is_respawning(slot) {
            return;
        }
        let Some(spec) = self.roster.spec(slot).cloned() else {
            return;
        };
        let attempt = self.roster.crashes(slot);

        match self.spawner.spawn(&spec) {
            Ok(spawned) => {
                let pid = self.roster.complete_respawn(slot, spawned);
                tracing::info!(pid, slot, attempt, "worker respawned");
                self.bus.publish(
                    Event::new(EventKind::WorkerRespawned)
                        .with_pid(pid)
                        .with_slot(slot)
                        .with_attempt(attempt),
                );
                self.bind_events();
            }
            Err(e) => {
                tracing::error!(
                    slot,
                    error = %e,
                    label = e.as_label(),
                    "respawn failed; slot abandoned"
                );
                self.roster.abandon_respawn(slot);
                self.bus.publish(
                    Event::new(EventKind::SpawnFailed)
                        .with_slot(slot)
                        .with_reason(e.to_string()),
                );
                self.check_ready();
                self.check_done();
            }
        }
    }

    fn check_ready(&mut self) {
        if self.ready_fired || !self.roster.is_ready() {
            return;
        }
        self.ready_fired = true;
        tracing::info!(workers = self.roster.worker_count(), "pool ready");
        self.bus.publish(Event::new(EventKind::PoolReady));
        if let Some(callback) = self.on_ready.as_mut() {
            callback(&self.roster);
        }
    }

    fn check_done(&mut self) {
        if self.done_fired || self.roster.working() > 0 {
            return;
        }
        self.done_fired = true;
        tracing::info!(slots = self.roster.len(), "pool done");
        self.bus.publish(Event::new(EventKind::PoolDone));
        if let Some(callback) = self.on_done.as_mut() {
            callback(&self.roster);
        }
    }
}

impl RoleLogic for WorkerPoolSupervisor {
    fn role(&self) -> Role {
        Role::Supervisor
    }

    fn router_mut(&mut self) -> &mut MessageRouter {
        &mut self.router
    }
}
