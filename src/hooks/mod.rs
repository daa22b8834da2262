//! Keyed message hooks and the router that applies them.
//!
//! Both roles compose the same [`MessageRouter`]; only the `Role` passed to
//! [`MessageRouter::route`] differs.
//!
//! - [`registry`]: [`HookRegistry`], [`HookEntry`], [`Applies`]
//! - [`router`]: [`MessageRouter`], [`Routed`]

mod registry;
mod router;

pub use registry::{Applies, HookEntry, HookFn, HookRegistry};
pub use router::{MessageFn, MessageRouter, Routed};
