//! # Role factory: one entry point, two role logics.
//!
//! [`ClusterBuilder`] collects the configuration and the process primitives,
//! then yields a [`Logic`] for the requested (or detected) role. Primitives not
//! supplied fall back to the OS implementations:
//!
//! | Role       | Primitive | Default                          |
//! |------------|-----------|----------------------------------|
//! | supervisor | spawner   | [`CommandSpawner::current_exe`]  |
//! | worker     | channel   | [`StdioChannel::new`]            |

use std::sync::Arc;

use super::agent::WorkerAgent;
use super::config::Config;
use super::role::Role;
use super::supervisor::WorkerPoolSupervisor;
use crate::process::{Channel, CommandSpawner, Spawner, StdioChannel};
use crate::subscribers::Subscribe;

/// The logic selected for this process.
pub enum Logic {
    Supervisor(WorkerPoolSupervisor),
    Worker(WorkerAgent),
}

impl Logic {
    pub fn role(&self) -> Role {
        match self {
            Logic::Supervisor(_) => Role::Supervisor,
            Logic::Worker(_) => Role::Worker,
        }
    }

    /// The supervisor, if this process is one.
    pub fn into_supervisor(self) -> Option<WorkerPoolSupervisor> {
        match self {
            Logic::Supervisor(sup) => Some(sup),
            Logic::Worker(_) => None,
        }
    }

    /// The worker agent, if this process is one.
    pub fn into_worker(self) -> Option<WorkerAgent> {
        match self {
            Logic::Worker(agent) => Some(agent),
            Logic::Supervisor(_) => None,
        }
    }
}

/// Builder for a [`Logic`].
///
/// ```rust
/// use std::sync::Arc;
/// use procvisor::{ClusterBuilder, CommandSpawner, Config, Role};
///
/// let logic = ClusterBuilder::new(Config::default())
///     .with_spawner(Arc::new(CommandSpawner::new("/usr/bin/env")))
///     .build(Role::Supervisor);
/// assert_eq!(logic.role(), Role::Supervisor);
/// ```
pub struct ClusterBuilder {
    cfg: Config,
    spawner: Option<Arc<dyn Spawner>>,
    channel: Option<Arc<dyn Channel>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ClusterBuilder {
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            spawner: None,
            channel: None,
            subscribers: Vec::new(),
        }
    }

    /// Spawn primitive used by the supervisor.
    #[must_use]
    pub fn with_spawner(mut self, spawner: Arc<dyn Spawner>) -> Self {
        self.spawner = Some(spawner);
        self
    }

    /// Channel used by a worker agent.
    #[must_use]
    pub fn with_channel(mut self, channel: Arc<dyn Channel>) -> Self {
        self.channel = Some(channel);
        self
    }

    /// Event subscribers attached to the supervisor.
    #[must_use]
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the logic for `role`.
    ///
    /// Building a worker without a channel announces the process as online on stdout.
    pub fn build(self, role: Role) -> Logic {
        tracing::debug!(role = role.as_str(), "building pool logic");
        match role {
            Role::Supervisor => {
                let spawner: Arc<dyn Spawner> = match self.spawner {
                    Some(spawner) => spawner,
                    None => Arc::new(CommandSpawner::current_exe()),
                };
                Logic::Supervisor(WorkerPoolSupervisor::new(self.cfg, spawner, self.subscribers))
            }
            Role::Worker => {
                let channel: Arc<dyn Channel> = match self.channel {
                    Some(channel) => channel,
                    None => Arc::new(StdioChannel::new()),
                };
                Logic::Worker(WorkerAgent::new(self.cfg, channel))
            }
        }
    }

    /// Builds the logic for [`Role::detect`].
    pub fn build_detected(self) -> Logic {
        self.build(Role::detect())
    }
}

/// Builds the logic for this process with default primitives.
pub fn new(cfg: Config) -> Logic {
    ClusterBuilder::new(cfg).build_detected()
}
