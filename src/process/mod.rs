//! Process primitives consumed by the pool core.
//!
//! The supervisor and the worker agent never touch OS processes directly; they
//! talk to these traits, which keeps the core testable with fakes:
//!
//! - [`Spawner`]: starts a worker from a [`WorkerSpec`] and returns a [`Spawned`]
//!   pair (handle + ordered event stream).
//! - [`ProcessHandle`]: a stable id plus `send(message)`.
//! - [`Channel`]: the worker-side view of the supervisor (inbound messages,
//!   outbound `send`, `exit`).
//!
//! ## Default implementations
//! - [`CommandSpawner`] re-executes a binary with piped stdio and JSON-lines framing.
//! - [`StdioChannel`] is its worker-side counterpart.
//!
//! ```text
//! Supervisor process                                Worker process
//! ──────────────────                                ──────────────
//! CommandSpawner::spawn(spec)
//!   ├─► child stdin  ◄── Frame::Message ──────────── StdioChannel::subscribe()
//!   └─► child stdout ──► Frame::Online/Message ◄──── StdioChannel::new()/send()
//!         └─► EOF → wait() → WorkerEvent::Exit
//! ```

mod command;
mod frame;
mod spec;
mod stdio;

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{SpawnError, TransportError};

pub use command::CommandSpawner;
pub use frame::Frame;
pub use spec::WorkerSpec;
pub use stdio::StdioChannel;

/// Stable OS-level process identifier.
pub type Pid = u32;

/// Shared handle to a peer process.
pub type HandleRef = Arc<dyn ProcessHandle>;

/// Environment variable that marks a process as a pool worker.
///
/// Its value is the worker's launch sequence number.
pub const WORKER_ENV: &str = "PROCVISOR_WORKER_ID";

/// How a worker process terminated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExitStatus {
    /// Exit code, if the process exited on its own.
    pub code: Option<i32>,
    /// Terminating signal, if any.
    pub signal: Option<i32>,
}

impl ExitStatus {
    /// Process exited with `code`.
    pub fn code(code: i32) -> Self {
        Self {
            code: Some(code),
            signal: None,
        }
    }

    /// Process was killed by `signal`.
    pub fn signaled(signal: i32) -> Self {
        Self {
            code: None,
            signal: Some(signal),
        }
    }

    /// Exit code 0 and no signal.
    pub fn is_normal(&self) -> bool {
        self.code == Some(0) && self.signal.is_none()
    }
}

impl From<std::process::ExitStatus> for ExitStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
        }
    }
}

/// Lifecycle notification for one worker, delivered in order.
#[derive(Clone, Debug, PartialEq)]
pub enum WorkerEvent {
    /// The worker is up and ready for messages.
    Online,
    /// The worker sent a message.
    Message(Value),
    /// The worker terminated. Always the last event.
    Exit(ExitStatus),
}

/// A peer process that can receive messages.
pub trait ProcessHandle: Send + Sync + 'static {
    /// Stable process identifier.
    fn id(&self) -> Pid;

    /// Hands a message to the transport. Does not wait for delivery.
    fn send(&self, message: Value) -> Result<(), TransportError>;
}

/// Result of a successful spawn.
pub struct Spawned {
    /// Handle used to address the worker.
    pub handle: HandleRef,
    /// Ordered lifecycle events. Taken exactly once when events are bound.
    pub events: mpsc::UnboundedReceiver<WorkerEvent>,
}

/// Spawn primitive: starts one worker process per call.
pub trait Spawner: Send + Sync + 'static {
    /// Starts a worker configured by `spec`.
    fn spawn(&self, spec: &WorkerSpec) -> Result<Spawned, SpawnError>;
}

/// Worker-side channel to the supervisor.
pub trait Channel: ProcessHandle {
    /// Returns the inbound message stream. Yields `Some` at most once.
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<Value>>;

    /// Terminates the current process with `code`.
    fn exit(&self, code: i32);
}
