//! # Message router: hooks first, generic handler otherwise.
//!
//! ```text
//! route(message, role, sender)
//!   ├─ not an object ─────────────────────────────► generic(message)
//!   └─ object
//!        ├─ scan hooks in key order
//!        │    first key that applies to role AND is present in message
//!        │      └─► hook(message[key], sender)   (exactly one hook fires)
//!        └─ no match ─────────────────────────────► generic(message)
//! ```
//!
//! Plain messages (strings, numbers, arrays) never reach a hook.

use std::sync::Arc;

use serde_json::Value;

use super::registry::HookRegistry;
use crate::core::Role;
use crate::process::HandleRef;

/// Generic message handler.
pub type MessageFn = Box<dyn FnMut(Value) + Send>;

/// Where a message ended up.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Routed {
    /// Consumed by the hook registered under this key.
    Hook(Arc<str>),
    /// Passed to the generic handler.
    Generic,
}

/// Hook registry plus the generic fallback.
pub struct MessageRouter {
    hooks: HookRegistry,
    generic: MessageFn,
}

impl Default for MessageRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageRouter {
    /// Empty registry; the generic handler logs each message.
    pub fn new() -> Self {
        Self {
            hooks: HookRegistry::new(),
            generic: Box::new(log_message),
        }
    }

    pub fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub fn hooks_mut(&mut self) -> &mut HookRegistry {
        &mut self.hooks
    }

    /// Replaces the generic handler.
    pub fn set_generic(&mut self, handler: MessageFn) {
        self.generic = handler;
    }

    /// Dispatches one message.
    pub fn route(&mut self, message: Value, role: Role, sender: &HandleRef) -> Routed {
        if let Value::Object(fields) = &message {
            let hit = self
                .hooks
                .entries()
                .find(|e| e.applies().includes(role) && fields.contains_key(e.key()));
            if let Some(entry) = hit {
                (entry.handler())(&fields[entry.key()], sender);
                return Routed::Hook(entry.key_arc());
            }
        }
        (self.generic)(message);
        Routed::Generic
    }
}

fn log_message(message: Value) {
    tracing::info!(target: "procvisor::message", %message, "#");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::{Applies, HookFn};
    use crate::testkit::NullPeer;
    use serde_json::json;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<String>>>;

    fn recording_hook(log: &Log, tag: &'static str) -> HookFn {
        let log = Arc::clone(log);
        Arc::new(move |v: &Value, _p: &HandleRef| log.lock().unwrap().push(format!("{tag}:{v}")))
    }

    fn router_with_generic(log: &Log) -> MessageRouter {
        let mut router = MessageRouter::new();
        let log = Arc::clone(log);
        router.set_generic(Box::new(move |v: Value| {
            log.lock().unwrap().push(format!("generic:{v}"))
        }));
        router
    }

    #[test]
    fn test_object_with_hook_key_bypasses_generic() {
        let log: Log = Arc::default();
        let mut router = router_with_generic(&log);
        router
            .hooks_mut()
            .register("ping", recording_hook(&log, "ping"), Applies::SUPERVISOR);

        let routed = router.route(json!({"ping": 42}), Role::Supervisor, &NullPeer::arc(1));
        assert_eq!(routed, Routed::Hook("ping".into()));
        assert_eq!(*log.lock().unwrap(), vec!["ping:42"]);
    }

    #[test]
    fn test_plain_message_always_reaches_generic() {
        let log: Log = Arc::default();
        let mut router = router_with_generic(&log);
        router
            .hooks_mut()
            .register("hello", recording_hook(&log, "hook"), Applies::BOTH);

        let routed = router.route(json!("hello"), Role::Supervisor, &NullPeer::arc(1));
        assert_eq!(routed, Routed::Generic);
        assert_eq!(*log.lock().unwrap(), vec!["generic:\"hello\""]);
    }

    #[test]
    fn test_hook_for_other_role_falls_through() {
        let log: Log = Arc::default();
        let mut router = router_with_generic(&log);
        router
            .hooks_mut()
            .register("ping", recording_hook(&log, "ping"), Applies::WORKER);

        let routed = router.route(json!({"ping": 1}), Role::Supervisor, &NullPeer::arc(1));
        assert_eq!(routed, Routed::Generic);
        assert_eq!(*log.lock().unwrap(), vec![r#"generic:{"ping":1}"#]);
    }

    #[test]
    fn test_exactly_one_hook_fires_for_multi_key_message() {
        let log: Log = Arc::default();
        let mut router = router_with_generic(&log);
        router
            .hooks_mut()
            .register("b", recording_hook(&log, "b"), Applies::BOTH);
        router
            .hooks_mut()
            .register("a", recording_hook(&log, "a"), Applies::BOTH);

        let routed = router.route(json!({"b": 2, "a": 1}), Role::Worker, &NullPeer::arc(1));
        assert_eq!(routed, Routed::Hook("a".into()));
        assert_eq!(*log.lock().unwrap(), vec!["a:1"]);
    }

    #[test]
    fn test_hook_receives_sender() {
        let seen = Arc::new(Mutex::new(None));
        let mut router = MessageRouter::new();
        let sink = Arc::clone(&seen);
        router.hooks_mut().register(
            "who",
            Arc::new(move |_v: &Value, peer: &HandleRef| *sink.lock().unwrap() = Some(peer.id())),
            Applies::SUPERVISOR,
        );

        router.route(json!({"who": null}), Role::Supervisor, &NullPeer::arc(77));
        assert_eq!(*seen.lock().unwrap(), Some(77));
    }
}
