//! # Event subscribers for a procvisor pool.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out,
//! and (behind the `logging` feature) a built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! WorkerPoolSupervisor ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                     │
//!                                                      ┌──────────────┼──────────────┐
//!                                                      ▼              ▼              ▼
//!                                                  LogWriter       Metrics        Custom
//! ```

#[cfg(feature = "logging")]
mod embedded;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
