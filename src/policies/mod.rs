//! Respawn pacing policies.
//!
//! A crashed worker is replaced on the next turn of the supervisor loop by
//! default. These knobs let a pool slow that down when a worker crash-loops.
//!
//! ## Contents
//! - [`BackoffPolicy`] how respawn delays evolve (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomization so a herd of crashed workers does not
//!   respawn in lockstep
//!
//! ## Quick wiring
//! ```text
//! Config { respawn: true, respawn_backoff: Some(BackoffPolicy), .. }
//!      └─► WorkerPoolSupervisor on abnormal exit of slot i:
//!           - crashes[i] += 1
//!           - delay = backoff.next(crashes[i] - 1)
//!           - enqueue Respawn{i} after delay
//! ```
//!
//! ## Defaults
//! - `BackoffPolicy::default()` → first=100ms, factor=1.0 (constant), max=30s, jitter=None.
//! - `JitterPolicy::None` by default; consider `Equal` for pools that crash together.

mod backoff;
mod jitter;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
