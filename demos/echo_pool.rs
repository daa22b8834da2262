//! Echo pool: one supervisor, one worker per CPU (at most four).
//!
//! Each worker asks for a job, echoes it back, and exits. The supervisor
//! answers whichever worker asks, replacements included. The first worker
//! launched crashes instead, so the pool shows a respawn in place.
//!
//! ```text
//! cargo run --example echo_pool --features logging
//! RUST_LOG=procvisor=debug cargo run --example echo_pool --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use procvisor::{
    BackoffPolicy, ClusterBuilder, Config, JitterPolicy, LogWriter, Logic, RoleLogic, Subscribe,
    WORKER_ENV, WorkerSpec,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    // stdout is the worker's channel to the supervisor
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cfg = Config {
        respawn: true,
        respawn_backoff: Some(BackoffPolicy {
            first: Duration::from_millis(100),
            max: Duration::from_secs(2),
            factor: 2.0,
            jitter: JitterPolicy::Equal,
        }),
        ..Config::default()
    };
    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];

    match ClusterBuilder::new(cfg).with_subscribers(subs).build_detected() {
        Logic::Supervisor(mut sup) => {
            let workers = sup.cpus().min(4);
            sup.each_of(workers, |s, i| {
                s.add(WorkerSpec::new().env("ECHO_SHARD", i.to_string()));
            })
            .hook("want", |shard, worker| {
                let _ = worker.send(json!({ "job": format!("hello shard {shard}") }));
            })
            .hook("echo", |v, worker| {
                tracing::info!(pid = worker.id(), echo = %v, "echo received");
            })
            .message_handler(|m| tracing::info!(%m, "worker said"))
            .ready(|roster| tracing::info!(workers = roster.online_count(), "pool ready"))
            .done(|roster| tracing::info!(slots = roster.len(), "all workers finished"))
            .spawn();
            sup.run().await;
        }
        Logic::Worker(mut agent) => {
            let shard = std::env::var("ECHO_SHARD").unwrap_or_default();
            let launch = std::env::var(WORKER_ENV).unwrap_or_default();
            if launch == "0" {
                // first launch only; the replacement gets a new launch number
                agent.exit(1, Some(json!(format!("shard {shard} crashing on purpose"))));
                return;
            }

            // leave once the first job is answered
            let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
            let echo_shard = shard.clone();
            agent
                .hook("job", move |job, supervisor| {
                    let _ = supervisor.send(json!({ "echo": { "shard": echo_shard, "job": job } }));
                    let _ = tx.send(());
                })
                .worker(|a| {
                    let _ = a.send(json!({ "want": shard }));
                });
            tokio::select! {
                _ = agent.run() => {}
                _ = rx.recv() => {}
            }
            agent.exit(0, None);
        }
    }
}
