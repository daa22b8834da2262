//! # WorkerAgent: the in-worker counterpart of the supervisor.
//!
//! The agent subscribes to the process's inbound channel once, routes every
//! supervisor message through its own [`MessageRouter`] with `Role::Worker`, and
//! offers a controlled exit that can leave a final notice for the supervisor.
//!
//! ```text
//! supervisor ── Channel::subscribe() ──► inbox ──► dispatch ──► MessageRouter (role=worker)
//!                                                                ├─ hook(message[key], supervisor)
//!                                                                └─ generic(message)
//! exit(code, notice) ── send(notice) ──► supervisor
//!                    └─ Channel::exit(code)
//! ```

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::config::Config;
use super::role::{Role, RoleLogic};
use crate::error::TransportError;
use crate::hooks::{MessageRouter, Routed};
use crate::process::{Channel, HandleRef, Pid};

/// Worker side of a pool.
pub struct WorkerAgent {
    cfg: Config,
    channel: Arc<dyn Channel>,
    /// Same channel, as the handle hooks reply through.
    supervisor: HandleRef,
    router: MessageRouter,
    inbox: Option<mpsc::UnboundedReceiver<Value>>,
    listening: bool,
}

impl WorkerAgent {
    /// Creates an agent talking to the supervisor over `channel`.
    pub fn new(cfg: Config, channel: Arc<dyn Channel>) -> Self {
        let supervisor: HandleRef = channel.clone();
        Self {
            cfg,
            channel,
            supervisor,
            router: MessageRouter::new(),
            inbox: None,
            listening: false,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// This worker's process id.
    pub fn id(&self) -> Pid {
        self.channel.id()
    }

    /// Subscribes to supervisor messages. Later calls do nothing.
    pub fn listen(&mut self) -> &mut Self {
        if self.listening {
            return self;
        }
        self.listening = true;
        self.inbox = self.channel.subscribe();
        if self.inbox.is_none() {
            tracing::warn!("supervisor channel already subscribed elsewhere");
        }
        self
    }

    /// Listens, then runs `logic` once.
    pub fn worker<F>(&mut self, logic: F) -> &mut Self
    where
        F: FnOnce(&mut Self),
    {
        self.listen();
        logic(self);
        self
    }

    /// Sends `message` to the supervisor.
    pub fn send(&self, message: Value) -> Result<(), TransportError> {
        self.channel.send(message)
    }

    /// Terminates the worker with `code`, sending `notice` first if given.
    ///
    /// The notice is handed to the transport synchronously; delivery is not
    /// awaited and a failed send does not prevent termination.
    pub fn exit(&self, code: i32, notice: Option<Value>) {
        if let Some(notice) = notice {
            if let Err(e) = self.channel.send(notice) {
                tracing::warn!(code, error = %e, "exit notice not sent");
            }
        }
        tracing::debug!(code, "worker exiting");
        self.channel.exit(code);
    }

    /// Dispatches supervisor messages until the channel closes.
    pub async fn run(&mut self) {
        self.run_until(CancellationToken::new()).await;
    }

    /// Dispatches supervisor messages until the channel closes or `token` is cancelled.
    ///
    /// After cancellation the subscription is kept, so a later `run` resumes it.
    pub async fn run_until(&mut self, token: CancellationToken) {
        self.listen();
        let Some(mut inbox) = self.inbox.take() else {
            return;
        };
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    self.inbox = Some(inbox);
                    return;
                }
                message = inbox.recv() => match message {
                    Some(message) => {
                        self.dispatch(message);
                    }
                    None => {
                        tracing::debug!("supervisor channel closed");
                        return;
                    }
                },
            }
        }
    }

    /// Routes one message as the worker role.
    pub(crate) fn dispatch(&mut self, message: Value) -> Routed {
        self.router.route(message, Role::Worker, &self.supervisor)
    }

    /// Dispatches every message already queued. Returns how many were handled.
    #[cfg(test)]
    pub(crate) fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(message) = self.inbox.as_mut().and_then(|rx| rx.try_recv().ok()) {
            self.dispatch(message);
            handled += 1;
        }
        handled
    }
}

impl RoleLogic for WorkerAgent {
    fn role(&self) -> Role {
        Role::Worker
    }

    fn router_mut(&mut self) -> &mut MessageRouter {
        &mut self.router
    }
}
