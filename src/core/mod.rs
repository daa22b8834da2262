//! Pool core: role selection, supervisor state machine, worker agent.
//!
//! Internal modules:
//! - [`config`]: [`Config`] shared by both roles;
//! - [`role`]: [`Role`] detection and the [`RoleLogic`] registration surface;
//! - [`roster`]: slots, records, and counters owned by the supervisor;
//! - [`supervisor`]: spawn/online/exit/respawn handling and the ready/done latches;
//! - [`agent`]: inbound dispatch and controlled exit inside a worker;
//! - [`factory`]: [`ClusterBuilder`] and [`Logic`].

mod agent;
mod config;
mod factory;
mod role;
mod roster;
mod supervisor;

pub use agent::WorkerAgent;
pub use config::Config;
pub use factory::{ClusterBuilder, Logic, new};
pub use role::{Role, RoleLogic};
pub use roster::{Roster, SlotState};
pub use supervisor::{EachFn, PoolFn, WorkerPoolSupervisor};
