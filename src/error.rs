//! Error types used by the procvisor primitives.
//!
//! This module defines two enums:
//!
//! - [`SpawnError`]: a worker process could not be started.
//! - [`TransportError`]: a message could not be handed to a peer.
//!
//! Neither is ever propagated out of the supervisor's event loop: the loop turns
//! them into [`Event`](crate::Event)s and log records and keeps running.
//! Both types provide `as_label` for logs/metrics.

use thiserror::Error;

/// # Errors produced by a [`Spawner`](crate::Spawner).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SpawnError {
    /// The OS refused to start the process (or the program could not be resolved).
    #[error("failed to launch worker: {0}")]
    Io(#[from] std::io::Error),

    /// Spawning requires a Tokio runtime and none was current.
    #[error("no tokio runtime available to drive worker i/o")]
    NoRuntime,

    /// A piped stdio stream was not captured by the child.
    #[error("worker {stream} not captured")]
    StdioNotCaptured {
        /// Which stream was missing (`stdin` / `stdout`).
        stream: &'static str,
    },

    /// The child exited before a process id could be read.
    #[error("worker exited before reporting a pid")]
    MissingPid,

    /// A custom spawner declined to start the worker.
    #[error("spawn rejected: {reason}")]
    Rejected {
        /// Why the spawner declined.
        reason: String,
    },
}

impl SpawnError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use procvisor::SpawnError;
    ///
    /// let err = SpawnError::Rejected { reason: "quota".into() };
    /// assert_eq!(err.as_label(), "spawn_rejected");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            SpawnError::Io(_) => "spawn_io",
            SpawnError::NoRuntime => "spawn_no_runtime",
            SpawnError::StdioNotCaptured { .. } => "spawn_stdio_not_captured",
            SpawnError::MissingPid => "spawn_missing_pid",
            SpawnError::Rejected { .. } => "spawn_rejected",
        }
    }
}

/// # Errors produced when sending a message to a peer process.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum TransportError {
    /// The peer's channel is gone (process exited or pipe closed).
    #[error("channel closed")]
    Closed,

    /// The message could not be framed.
    #[error("encode failed: {0}")]
    Encode(#[from] serde_json::Error),

    /// Writing the frame failed.
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),

    /// No live worker is registered under this pid.
    #[error("no live worker with pid {pid}")]
    UnknownWorker {
        /// The pid that was addressed.
        pid: crate::process::Pid,
    },
}

impl TransportError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            TransportError::Closed => "transport_closed",
            TransportError::Encode(_) => "transport_encode",
            TransportError::Io(_) => "transport_io",
            TransportError::UnknownWorker { .. } => "transport_unknown_worker",
        }
    }

    /// Indicates whether the peer can no longer receive anything.
    ///
    /// ```
    /// use procvisor::TransportError;
    ///
    /// assert!(TransportError::Closed.is_closed());
    /// ```
    pub fn is_closed(&self) -> bool {
        match self {
            TransportError::Closed | TransportError::UnknownWorker { .. } => true,
            TransportError::Io(e) => e.kind() == std::io::ErrorKind::BrokenPipe,
            TransportError::Encode(_) => false,
        }
    }
}
