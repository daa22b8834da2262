//! Worker-side channel over the process's own stdin/stdout.
//!
//! Counterpart of [`CommandSpawner`](super::CommandSpawner): stdout carries
//! frames to the supervisor, stdin carries frames from it. Application code in a
//! worker must therefore not print to stdout; use stderr or `tracing`.

use std::io::{BufRead, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;
use tokio::sync::mpsc;

use super::frame::Frame;
use super::{Channel, Pid, ProcessHandle};
use crate::error::TransportError;

/// Channel to the supervisor over stdio.
#[derive(Debug)]
pub struct StdioChannel {
    pid: Pid,
    subscribed: AtomicBool,
}

impl StdioChannel {
    /// Announces the worker as online and returns the channel.
    pub fn new() -> Self {
        let channel = Self {
            pid: std::process::id(),
            subscribed: AtomicBool::new(false),
        };
        if let Err(e) = write_frame(&Frame::Online) {
            tracing::warn!(error = %e, "failed to announce worker online");
        }
        channel
    }
}

impl Default for StdioChannel {
    fn default() -> Self {
        Self::new()
    }
}

fn write_frame(frame: &Frame) -> Result<(), TransportError> {
    let line = frame.to_line()?;
    let mut out = std::io::stdout().lock();
    out.write_all(line.as_bytes())?;
    out.flush()?;
    Ok(())
}

impl ProcessHandle for StdioChannel {
    fn id(&self) -> Pid {
        self.pid
    }

    /// Writes the frame synchronously, so it is flushed before a following `exit`.
    fn send(&self, message: Value) -> Result<(), TransportError> {
        write_frame(&Frame::message(message))
    }
}

impl Channel for StdioChannel {
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        if self.subscribed.swap(true, Ordering::AcqRel) {
            return None;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let spawned = std::thread::Builder::new()
            .name("procvisor-stdin".to_string())
            .spawn(move || {
                for line in std::io::stdin().lock().lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(e) => {
                            tracing::warn!(error = %e, "supervisor channel read failed");
                            break;
                        }
                    };
                    if line.trim().is_empty() {
                        continue;
                    }
                    let payload = match Frame::from_line_lossy(&line) {
                        Frame::Message { payload } => payload,
                        Frame::Online => continue,
                    };
                    if tx.send(payload).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = spawned {
            tracing::error!(error = %e, "failed to start supervisor channel reader");
        }
        Some(rx)
    }

    fn exit(&self, code: i32) {
        std::process::exit(code);
    }
}
