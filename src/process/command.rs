//! Worker spawning through `tokio::process`.
//!
//! [`CommandSpawner`] starts a child with piped stdin/stdout and inherited stderr,
//! marks it as a worker through [`WORKER_ENV`], and runs two tasks per child:
//!
//! - a writer draining the handle's outbound queue into the child's stdin;
//! - a reader turning stdout lines into [`WorkerEvent`]s, then reaping the child
//!   on EOF and emitting the final `Exit`.
//!
//! Anything the worker writes to stderr goes straight to the supervisor's stderr.

use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::mpsc;

use super::frame::Frame;
use super::{ExitStatus, Pid, ProcessHandle, Spawned, Spawner, WORKER_ENV, WorkerEvent, WorkerSpec};
use crate::error::{SpawnError, TransportError};

/// Spawns workers by executing a program (by default the current binary).
#[derive(Debug, Default)]
pub struct CommandSpawner {
    program: Option<PathBuf>,
    args: Vec<OsString>,
    launched: AtomicU64,
}

impl CommandSpawner {
    /// Re-executes the current binary. The path is resolved at spawn time.
    pub fn current_exe() -> Self {
        Self::default()
    }

    /// Executes `program` for every worker.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: Some(program.into()),
            ..Self::default()
        }
    }

    /// Appends an argument passed to every worker.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    fn program(&self) -> Result<PathBuf, SpawnError> {
        match &self.program {
            Some(p) => Ok(p.clone()),
            None => Ok(std::env::current_exe()?),
        }
    }
}

impl Spawner for CommandSpawner {
    fn spawn(&self, spec: &WorkerSpec) -> Result<Spawned, SpawnError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SpawnError::NoRuntime)?;
        let seq = self.launched.fetch_add(1, Ordering::Relaxed);

        let mut cmd = Command::new(self.program()?);
        cmd.args(&self.args)
            .envs(spec.vars())
            .env(WORKER_ENV, seq.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());

        let mut child = cmd.spawn()?;
        let pid = child.id().ok_or(SpawnError::MissingPid)?;
        let stdin = child
            .stdin
            .take()
            .ok_or(SpawnError::StdioNotCaptured { stream: "stdin" })?;
        let stdout = child
            .stdout
            .take()
            .ok_or(SpawnError::StdioNotCaptured { stream: "stdout" })?;

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (out_tx, out_rx) = mpsc::unbounded_channel();

        runtime.spawn(write_loop(pid, stdin, out_rx));
        runtime.spawn(read_loop(pid, stdout, child, events_tx));

        tracing::debug!(pid, seq, "worker process started");
        Ok(Spawned {
            handle: Arc::new(ChildHandle { pid, tx: out_tx }),
            events: events_rx,
        })
    }
}

/// Supervisor-side handle to a spawned child.
struct ChildHandle {
    pid: Pid,
    tx: mpsc::UnboundedSender<String>,
}

impl ProcessHandle for ChildHandle {
    fn id(&self) -> Pid {
        self.pid
    }

    fn send(&self, message: Value) -> Result<(), TransportError> {
        let line = Frame::message(message).to_line()?;
        self.tx.send(line).map_err(|_| TransportError::Closed)
    }
}

async fn write_loop(pid: Pid, mut stdin: ChildStdin, mut rx: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = rx.recv().await {
        let res = match stdin.write_all(line.as_bytes()).await {
            Ok(()) => stdin.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = res {
            tracing::debug!(pid, error = %e, "worker stdin closed");
            break;
        }
    }
}

async fn read_loop(
    pid: Pid,
    stdout: ChildStdout,
    mut child: Child,
    events: mpsc::UnboundedSender<WorkerEvent>,
) {
    let mut lines = BufReader::new(stdout).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) if line.trim().is_empty() => continue,
            Ok(Some(line)) => {
                let ev = match Frame::from_line_lossy(&line) {
                    Frame::Online => WorkerEvent::Online,
                    Frame::Message { payload } => WorkerEvent::Message(payload),
                };
                let _ = events.send(ev);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::warn!(pid, error = %e, "worker stdout read failed");
                break;
            }
        }
    }

    let status = match child.wait().await {
        Ok(status) => ExitStatus::from(status),
        Err(e) => {
            tracing::warn!(pid, error = %e, "failed to reap worker");
            ExitStatus::default()
        }
    };
    let _ = events.send(WorkerEvent::Exit(status));
}
