//! # Process role and the interface shared by both role logics.
//!
//! Every process in a pool runs the same program. [`Role::detect`] tells the
//! supervisor apart from its workers, and [`RoleLogic`] is the part of the API
//! both sides have in common: a role tag plus hook and message-handler
//! registration on a composed [`MessageRouter`].

use std::sync::Arc;

use serde_json::Value;

use crate::hooks::{Applies, MessageRouter};
use crate::process::{HandleRef, WORKER_ENV};

/// Which side of the pool the current process is on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Role {
    /// The coordinating process.
    Supervisor,
    /// A spawned worker.
    Worker,
}

impl Role {
    /// Reads [`WORKER_ENV`]: present means worker, absent means supervisor.
    pub fn detect() -> Self {
        Self::from_marker(std::env::var_os(WORKER_ENV).is_some())
    }

    fn from_marker(is_worker: bool) -> Self {
        if is_worker {
            Role::Worker
        } else {
            Role::Supervisor
        }
    }

    /// Stable lowercase name for logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Supervisor => "supervisor",
            Role::Worker => "worker",
        }
    }
}

/// Registration surface shared by [`WorkerPoolSupervisor`](crate::WorkerPoolSupervisor)
/// and [`WorkerAgent`](crate::WorkerAgent).
///
/// All registration methods overwrite earlier registrations for the same key
/// (or the generic handler) and return the receiver for chaining.
///
/// ```rust
/// use procvisor::{Applies, RoleLogic, WorkerAgent};
///
/// fn wire(agent: &mut WorkerAgent) {
///     agent
///         .hook("job", |job, supervisor| {
///             let _ = supervisor.send(serde_json::json!({ "done": job }));
///         })
///         .hook_for("shutdown", |_, _| {}, Applies::BOTH)
///         .message_handler(|msg| eprintln!("unhandled: {msg}"));
/// }
/// ```
pub trait RoleLogic {
    /// The role this logic runs as.
    fn role(&self) -> Role;

    /// The router messages are dispatched through.
    fn router_mut(&mut self) -> &mut MessageRouter;

    /// Registers `handler` for messages carrying `key`, for the roles in `applies`.
    ///
    /// An `applies` naming no role leaves the registry unchanged.
    fn hook_for<F>(&mut self, key: &str, handler: F, applies: Applies) -> &mut Self
    where
        F: Fn(&Value, &HandleRef) + Send + Sync + 'static,
        Self: Sized,
    {
        if !self
            .router_mut()
            .hooks_mut()
            .register(key, Arc::new(handler), applies)
        {
            tracing::debug!(key, "hook registered for no role; ignored");
        }
        self
    }

    /// Registers `handler` for messages carrying `key`, for this process's own role.
    fn hook<F>(&mut self, key: &str, handler: F) -> &mut Self
    where
        F: Fn(&Value, &HandleRef) + Send + Sync + 'static,
        Self: Sized,
    {
        let applies = Applies::only(self.role());
        self.hook_for(key, handler, applies)
    }

    /// Replaces the handler for messages no hook consumed.
    fn message_handler<F>(&mut self, handler: F) -> &mut Self
    where
        F: FnMut(Value) + Send + 'static,
        Self: Sized,
    {
        self.router_mut().set_generic(Box::new(handler));
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_selects_role() {
        assert_eq!(Role::from_marker(true), Role::Worker);
        assert_eq!(Role::from_marker(false), Role::Supervisor);
    }

    #[test]
    fn test_names() {
        assert_eq!(Role::Supervisor.as_str(), "supervisor");
        assert_eq!(Role::Worker.as_str(), "worker");
    }
}
