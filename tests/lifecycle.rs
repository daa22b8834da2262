//! End-to-end pool lifecycle through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::mpsc;

use procvisor::{
    Channel, ClusterBuilder, Config, Event, EventKind, ExitStatus, Pid, ProcessHandle, Role,
    RoleLogic, SpawnError, Spawned, Spawner, Subscribe, TransportError, WorkerEvent,
    WorkerPoolSupervisor, WorkerSpec,
};

/// Handle that records what the supervisor sent.
struct Peer {
    pid: Pid,
    inbox: Mutex<Vec<Value>>,
}

impl ProcessHandle for Peer {
    fn id(&self) -> Pid {
        self.pid
    }

    fn send(&self, message: Value) -> Result<(), TransportError> {
        self.inbox.lock().unwrap().push(message);
        Ok(())
    }
}

type Script = dyn Fn(usize, &WorkerSpec) -> Vec<WorkerEvent> + Send + Sync;

/// Spawner whose workers replay a scripted event sequence, chosen per spawn.
struct ScriptedSpawner {
    script: Box<Script>,
    peers: Mutex<Vec<Arc<Peer>>>,
}

impl ScriptedSpawner {
    fn new<F>(script: F) -> Arc<Self>
    where
        F: Fn(usize, &WorkerSpec) -> Vec<WorkerEvent> + Send + Sync + 'static,
    {
        Arc::new(Self {
            script: Box::new(script),
            peers: Mutex::new(Vec::new()),
        })
    }

    fn spawned(&self) -> usize {
        self.peers.lock().unwrap().len()
    }

    fn inbox(&self, nth: usize) -> Vec<Value> {
        self.peers.lock().unwrap()[nth].inbox.lock().unwrap().clone()
    }
}

impl Spawner for ScriptedSpawner {
    fn spawn(&self, spec: &WorkerSpec) -> Result<Spawned, SpawnError> {
        let mut peers = self.peers.lock().unwrap();
        let nth = peers.len();
        let peer = Arc::new(Peer {
            pid: 1000 + nth as Pid,
            inbox: Mutex::new(Vec::new()),
        });
        peers.push(peer.clone());

        let (tx, events) = mpsc::unbounded_channel();
        for event in (self.script)(nth, spec) {
            let _ = tx.send(event);
        }
        Ok(Spawned {
            handle: peer,
            events,
        })
    }
}

/// Subscriber collecting event kinds.
#[derive(Default)]
struct Kinds(Mutex<Vec<EventKind>>);

impl Kinds {
    fn count(&self, kind: EventKind) -> usize {
        self.0.lock().unwrap().iter().filter(|k| **k == kind).count()
    }
}

#[async_trait]
impl Subscribe for Kinds {
    async fn on_event(&self, ev: &Event) {
        self.0.lock().unwrap().push(ev.kind);
    }

    fn name(&self) -> &'static str {
        "kinds"
    }
}

fn latch() -> (Arc<AtomicUsize>, impl FnMut(&procvisor::Roster) + Send + 'static) {
    let hits = Arc::new(AtomicUsize::new(0));
    let h = hits.clone();
    (hits, move |_: &procvisor::Roster| {
        h.fetch_add(1, Ordering::SeqCst);
    })
}

fn supervisor(
    cfg: Config,
    spawner: Arc<ScriptedSpawner>,
    kinds: &Arc<Kinds>,
) -> WorkerPoolSupervisor {
    ClusterBuilder::new(cfg)
        .with_spawner(spawner)
        .with_subscribers(vec![kinds.clone() as Arc<dyn Subscribe>])
        .build(Role::Supervisor)
        .into_supervisor()
        .expect("supervisor logic")
}

async fn run(sup: &mut WorkerPoolSupervisor) {
    tokio::time::timeout(Duration::from_secs(10), sup.run())
        .await
        .expect("pool should finish");
}

#[tokio::test]
async fn pool_without_respawn_finishes_after_every_exit() {
    let spawner = ScriptedSpawner::new(|nth, _| {
        let status = match nth {
            0 => ExitStatus::code(0),
            1 => ExitStatus::code(1),
            _ => ExitStatus::signaled(9),
        };
        vec![WorkerEvent::Online, WorkerEvent::Exit(status)]
    });
    let kinds = Arc::new(Kinds::default());
    let mut sup = supervisor(Config::default(), spawner.clone(), &kinds);
    let (ready, on_ready) = latch();
    let (done, on_done) = latch();

    sup.each_of(3, |s, i| {
        s.add(WorkerSpec::new().env("IDX", i.to_string()));
    })
    .ready(on_ready)
    .done(on_done)
    .spawn();
    run(&mut sup).await;

    assert_eq!(spawner.spawned(), 3);
    assert_eq!(ready.load(Ordering::SeqCst), 1);
    assert_eq!(done.load(Ordering::SeqCst), 1);
    assert_eq!(kinds.count(EventKind::WorkerExited), 3);
    assert_eq!(kinds.count(EventKind::PoolDone), 1);
    assert_eq!(kinds.count(EventKind::RespawnScheduled), 0);
}

#[tokio::test]
async fn crashed_worker_is_replaced_with_its_spec() {
    let spawner = ScriptedSpawner::new(|nth, _| {
        if nth == 0 {
            vec![WorkerEvent::Online, WorkerEvent::Exit(ExitStatus::code(1))]
        } else {
            vec![WorkerEvent::Online, WorkerEvent::Exit(ExitStatus::code(0))]
        }
    });
    let kinds = Arc::new(Kinds::default());
    let cfg = Config {
        respawn: true,
        ..Config::default()
    };
    let mut sup = supervisor(cfg, spawner.clone(), &kinds);
    let (ready, on_ready) = latch();
    let (done, on_done) = latch();

    sup.add(WorkerSpec::new().env("SHARD", "a"))
        .add(WorkerSpec::new().env("SHARD", "b"))
        .ready(on_ready)
        .done(on_done)
        .spawn();
    run(&mut sup).await;

    assert_eq!(spawner.spawned(), 3);
    assert_eq!(sup.roster().len(), 2, "pool size is stable");
    assert_eq!(sup.roster().spec(0).and_then(|s| s.get("SHARD")), Some("a"));
    assert_eq!(sup.roster().crashes(0), 1);
    assert_eq!(ready.load(Ordering::SeqCst), 1);
    assert_eq!(done.load(Ordering::SeqCst), 1);
    assert_eq!(kinds.count(EventKind::WorkerRespawned), 1);
}

#[tokio::test]
async fn supervisor_hooks_preempt_generic_handler() {
    let spawner = ScriptedSpawner::new(|_, _| {
        vec![
            WorkerEvent::Online,
            WorkerEvent::Message(json!({ "ping": 42 })),
            WorkerEvent::Message(json!("hello")),
            WorkerEvent::Exit(ExitStatus::code(0)),
        ]
    });
    let kinds = Arc::new(Kinds::default());
    let mut sup = supervisor(Config::default(), spawner.clone(), &kinds);
    let generic = Arc::new(Mutex::new(Vec::new()));
    let sink = generic.clone();
    let pinged = Arc::new(Mutex::new(Vec::new()));
    let seen = pinged.clone();

    sup.hook("ping", move |v, worker| {
        seen.lock().unwrap().push(v.clone());
        let _ = worker.send(json!({ "pong": v }));
    })
    .message_handler(move |m| sink.lock().unwrap().push(m))
    .add(WorkerSpec::new())
    .spawn();
    run(&mut sup).await;

    assert_eq!(*pinged.lock().unwrap(), vec![json!(42)]);
    assert_eq!(*generic.lock().unwrap(), vec![json!("hello")]);
    assert_eq!(spawner.inbox(0), vec![json!({ "pong": 42 })]);
    assert_eq!(kinds.count(EventKind::HookFired), 1);
    assert_eq!(kinds.count(EventKind::MessageUnrouted), 1);
}

#[tokio::test]
async fn run_with_nothing_spawned_returns_immediately() {
    let spawner = ScriptedSpawner::new(|_, _| Vec::new());
    let kinds = Arc::new(Kinds::default());
    let mut sup = supervisor(Config::default(), spawner, &kinds);
    let (done, on_done) = latch();
    sup.done(on_done).spawn();
    run(&mut sup).await;
    assert_eq!(done.load(Ordering::SeqCst), 0);
}

/// Worker-side channel fed from a fixed list of supervisor messages.
struct ScriptedChannel {
    inbound: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    outbound: Mutex<Vec<Value>>,
    exit_codes: Mutex<Vec<i32>>,
}

impl ScriptedChannel {
    fn new(messages: Vec<Value>) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        for m in messages {
            let _ = tx.send(m);
        }
        Arc::new(Self {
            inbound: Mutex::new(Some(rx)),
            outbound: Mutex::new(Vec::new()),
            exit_codes: Mutex::new(Vec::new()),
        })
    }
}

impl ProcessHandle for ScriptedChannel {
    fn id(&self) -> Pid {
        1
    }

    fn send(&self, message: Value) -> Result<(), TransportError> {
        self.outbound.lock().unwrap().push(message);
        Ok(())
    }
}

impl Channel for ScriptedChannel {
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.inbound.lock().unwrap().take()
    }

    fn exit(&self, code: i32) {
        self.exit_codes.lock().unwrap().push(code);
    }
}

#[tokio::test]
async fn worker_agent_answers_jobs_and_exits_with_notice() {
    let channel = ScriptedChannel::new(vec![
        json!({ "job": [1, 2, 3] }),
        json!({ "job": [10] }),
        json!("status?"),
    ]);
    let mut agent = ClusterBuilder::new(Config::default())
        .with_channel(channel.clone())
        .build(Role::Worker)
        .into_worker()
        .expect("worker logic");
    let generic = Arc::new(AtomicUsize::new(0));
    let g = generic.clone();

    agent
        .hook("job", |job, supervisor| {
            let sum: i64 = job
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(Value::as_i64)
                .sum();
            let _ = supervisor.send(json!({ "sum": sum }));
        })
        .message_handler(move |_| {
            g.fetch_add(1, Ordering::SeqCst);
        })
        .worker(|a| {
            let _ = a.send(json!({ "hello": a.id() }));
        });
    agent.run().await;
    agent.exit(0, Some(json!({ "bye": true })));

    assert_eq!(
        *channel.outbound.lock().unwrap(),
        vec![
            json!({ "hello": 1 }),
            json!({ "sum": 6 }),
            json!({ "sum": 10 }),
            json!({ "bye": true }),
        ]
    );
    assert_eq!(generic.load(Ordering::SeqCst), 1);
    assert_eq!(*channel.exit_codes.lock().unwrap(), vec![0]);
}

#[cfg(unix)]
#[tokio::test]
async fn command_spawner_drives_a_real_worker() {
    use procvisor::CommandSpawner;

    let script = concat!(
        r#"printf '{"type":"online"}\n"#,
        r#"{"type":"message","payload":{"ping":"'"$SHARD"'"}}\n'; exit 0"#,
    );
    let spawner = Arc::new(CommandSpawner::new("sh").arg("-c").arg(script));
    let mut sup = ClusterBuilder::new(Config::default())
        .with_spawner(spawner)
        .build(Role::Supervisor)
        .into_supervisor()
        .expect("supervisor logic");

    let pings = Arc::new(Mutex::new(Vec::new()));
    let sink = pings.clone();
    let (ready, on_ready) = latch();
    let (done, on_done) = latch();
    sup.hook("ping", move |v, _| sink.lock().unwrap().push(v.clone()))
        .add(WorkerSpec::new().env("SHARD", "s0"))
        .add(WorkerSpec::new().env("SHARD", "s1"))
        .ready(on_ready)
        .done(on_done)
        .spawn();
    run(&mut sup).await;

    let mut pings = pings.lock().unwrap().clone();
    pings.sort_by_key(|v| v.to_string());
    assert_eq!(pings, vec![json!("s0"), json!("s1")]);
    assert_eq!(done.load(Ordering::SeqCst), 1);
    assert_eq!(ready.load(Ordering::SeqCst), 1);
}
