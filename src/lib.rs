//! # procvisor
//!
//! **Procvisor** supervises a fixed-size pool of worker processes.
//!
//! One program runs in every process of the pool. At startup it asks
//! [`new`] (or a [`ClusterBuilder`]) for its [`Logic`]: the first process
//! becomes the [`WorkerPoolSupervisor`], which spawns, tracks, and respawns
//! workers; each spawned copy becomes a [`WorkerAgent`]. Both sides exchange
//! JSON messages and route them through keyed hooks before a generic handler.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                         ┌─────────────────────────────┐
//!                         │  procvisor::new(Config)     │
//!                         │  Role::detect()             │
//!                         └──────┬───────────────┬──────┘
//!                    supervisor  ▼               ▼  worker
//! ┌──────────────────────────────────────┐   ┌──────────────────────────────┐
//! │ WorkerPoolSupervisor                 │   │ WorkerAgent                  │
//! │ - pending specs ─► spawn()           │   │ - listen() once              │
//! │ - Roster (slots, counters)           │   │ - MessageRouter (role=worker)│
//! │ - MessageRouter (role=supervisor)    │   │ - send / exit(code, notice)  │
//! │ - ready / done latches               │   └──────────────┬───────────────┘
//! │ - Bus ─► SubscriberSet               │                  │
//! └──────┬───────────────────────────────┘                  │
//!        │ Spawner::spawn(spec)                             │ Channel
//!        ▼                                                  ▼
//!   ProcessHandle + events ◄══════ JSON lines over stdio ═══► StdioChannel
//! ```
//!
//! ### Worker lifecycle (supervisor view)
//! ```text
//! add(spec) ─► queued ─► spawn() ─► spawned ─► online ─► exit
//!                                                        ├─ code 0, no signal     ─► done accounting
//!                                                        ├─ abnormal, respawn off ─► done accounting
//!                                                        └─ abnormal, respawn on  ─► Respawn{slot}
//!                                                              (next loop turn or backoff delay)
//!                                                              └─► same slot, same spec
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                                  |
//! |-------------------|---------------------------------------------------------------|-----------------------------------------------------|
//! | **Roles**         | One entry point yields supervisor or worker logic.            | [`Role`], [`Logic`], [`ClusterBuilder`]             |
//! | **Supervision**   | Spawn, ready/done callbacks, respawn in place.                | [`WorkerPoolSupervisor`], [`Roster`]                |
//! | **Messaging**     | Keyed hooks take priority over a generic handler.             | [`RoleLogic`], [`HookRegistry`], [`MessageRouter`]  |
//! | **Primitives**    | Injectable spawn/transport; OS defaults included.             | [`Spawner`], [`Channel`], [`CommandSpawner`]        |
//! | **Policies**      | Optional backoff between a crash and its replacement.         | [`BackoffPolicy`], [`JitterPolicy`]                 |
//! | **Subscriber API**| Observe pool events (logging, metrics, alerting).             | [`Subscribe`], [`Event`]                            |
//! | **Errors**        | Typed spawn and transport errors with stable labels.          | [`SpawnError`], [`TransportError`]                  |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust,no_run
//! use procvisor::{Config, Logic, RoleLogic, WorkerSpec};
//! use serde_json::json;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     match procvisor::new(Config::default()) {
//!         Logic::Supervisor(mut sup) => {
//!             sup.each_cpu(|s, i| {
//!                 s.add(WorkerSpec::new().env("SHARD", i.to_string()));
//!             })
//!             .hook("sum", |v, worker| eprintln!("worker {} summed {v}", worker.id()))
//!             .ready(|roster| {
//!                 roster.broadcast(&json!({ "job": [1, 2, 3] }));
//!             })
//!             .spawn();
//!             sup.run().await;
//!         }
//!         Logic::Worker(mut agent) => {
//!             agent.hook("job", |job, supervisor| {
//!                 let sum: i64 = job.as_array().into_iter().flatten().filter_map(|n| n.as_i64()).sum();
//!                 let _ = supervisor.send(json!({ "sum": sum }));
//!             });
//!             agent.listen();
//!             agent.run().await;
//!         }
//!     }
//! }
//! ```
mod core;
mod error;
mod events;
mod hooks;
mod policies;
mod process;
mod subscribers;

#[cfg(test)]
mod testkit;

// ---- Public re-exports ----

pub use crate::core::{
    ClusterBuilder, Config, EachFn, Logic, PoolFn, Role, RoleLogic, Roster, SlotState,
    WorkerAgent, WorkerPoolSupervisor, new,
};
pub use error::{SpawnError, TransportError};
pub use events::{Bus, Event, EventKind};
pub use hooks::{Applies, HookEntry, HookFn, HookRegistry, MessageFn, MessageRouter, Routed};
pub use policies::{BackoffPolicy, JitterPolicy};
pub use process::{
    Channel, CommandSpawner, ExitStatus, Frame, HandleRef, Pid, ProcessHandle, Spawned, Spawner,
    StdioChannel, WORKER_ENV, WorkerEvent, WorkerSpec,
};
pub use subscribers::{Subscribe, SubscriberSet};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
