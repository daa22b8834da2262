//! # Hook registry: keyed message handlers tagged by role.
//!
//! A hook is a handler bound to a message key. When an object message carries that
//! key, the hook receives the value under it instead of the generic handler seeing
//! the whole message.
//!
//! ## Rules
//! - One entry per key; registering the same key again overwrites the entry.
//! - An entry with no applicable role is never stored.
//! - Keys are scanned in lexicographic order (see [`HookRegistry::entries`]).

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::core::Role;
use crate::process::HandleRef;

/// Hook handler: receives `message[key]` and the peer that sent it.
///
/// On the supervisor the peer is the worker's handle; on a worker it is the
/// channel to the supervisor.
pub type HookFn = Arc<dyn Fn(&Value, &HandleRef) + Send + Sync>;

/// Which roles a hook applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Applies {
    /// Fires in the supervisor process.
    pub supervisor: bool,
    /// Fires in worker processes.
    pub worker: bool,
}

impl Applies {
    pub const SUPERVISOR: Applies = Applies {
        supervisor: true,
        worker: false,
    };
    pub const WORKER: Applies = Applies {
        supervisor: false,
        worker: true,
    };
    pub const BOTH: Applies = Applies {
        supervisor: true,
        worker: true,
    };

    /// Applies to exactly `role`.
    pub fn only(role: Role) -> Self {
        match role {
            Role::Supervisor => Self::SUPERVISOR,
            Role::Worker => Self::WORKER,
        }
    }

    /// Returns true if `role` is included.
    #[inline]
    pub fn includes(&self, role: Role) -> bool {
        match role {
            Role::Supervisor => self.supervisor,
            Role::Worker => self.worker,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        !self.supervisor && !self.worker
    }
}

/// A registered hook.
#[derive(Clone)]
pub struct HookEntry {
    key: Arc<str>,
    handler: HookFn,
    applies: Applies,
}

impl HookEntry {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn key_arc(&self) -> Arc<str> {
        Arc::clone(&self.key)
    }

    pub fn handler(&self) -> &HookFn {
        &self.handler
    }

    pub fn applies(&self) -> Applies {
        self.applies
    }
}

impl fmt::Debug for HookEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookEntry")
            .field("key", &self.key)
            .field("applies", &self.applies)
            .finish_non_exhaustive()
    }
}

/// Ordered map from message key to hook.
#[derive(Clone, Default, Debug)]
pub struct HookRegistry {
    entries: BTreeMap<Arc<str>, HookEntry>,
}

impl HookRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores or overwrites the hook for `key`.
    ///
    /// Returns `false` (and leaves the registry unchanged) when `applies` names no role.
    pub fn register(
        &mut self,
        key: impl Into<Arc<str>>,
        handler: HookFn,
        applies: Applies,
    ) -> bool {
        if applies.is_empty() {
            return false;
        }
        let key = key.into();
        self.entries.insert(
            Arc::clone(&key),
            HookEntry {
                key,
                handler,
                applies,
            },
        );
        true
    }

    /// Returns the handler for `key` if it applies to `role`.
    pub fn lookup(&self, key: &str, role: Role) -> Option<&HookFn> {
        self.entries
            .get(key)
            .filter(|e| e.applies.includes(role))
            .map(|e| &e.handler)
    }

    /// Entries in scan order (lexicographic by key).
    pub fn entries(&self) -> impl Iterator<Item = &HookEntry> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
