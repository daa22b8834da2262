//! In-memory process primitives for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::{SpawnError, TransportError};
use crate::process::{
    Channel, HandleRef, Pid, ProcessHandle, Spawned, Spawner, WorkerEvent, WorkerSpec,
};

/// Handle that accepts and discards everything.
pub(crate) struct NullPeer(Pid);

impl NullPeer {
    pub(crate) fn arc(pid: Pid) -> HandleRef {
        Arc::new(NullPeer(pid))
    }
}

impl ProcessHandle for NullPeer {
    fn id(&self) -> Pid {
        self.0
    }

    fn send(&self, _message: Value) -> Result<(), TransportError> {
        Ok(())
    }
}

/// Handle that records what was sent to it.
pub(crate) struct RecordingPeer {
    pid: Pid,
    sent: Mutex<Vec<Value>>,
}

impl ProcessHandle for RecordingPeer {
    fn id(&self) -> Pid {
        self.pid
    }

    fn send(&self, message: Value) -> Result<(), TransportError> {
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

#[derive(Default)]
struct FakeState {
    next_pid: Pid,
    fail_next: usize,
    specs: Vec<WorkerSpec>,
    pids: Vec<Pid>,
    events: HashMap<Pid, mpsc::UnboundedSender<WorkerEvent>>,
    peers: HashMap<Pid, Arc<RecordingPeer>>,
}

/// Spawner handing out sequential pids from 100, with scripted events.
pub(crate) struct FakeSpawner {
    state: Mutex<FakeState>,
}

impl FakeSpawner {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(FakeState {
                next_pid: 100,
                ..FakeState::default()
            }),
        })
    }

    /// Makes the next `n` spawns fail.
    pub(crate) fn fail_next(&self, n: usize) {
        self.state.lock().unwrap().fail_next = n;
    }

    pub(crate) fn spawn_count(&self) -> usize {
        self.state.lock().unwrap().pids.len()
    }

    /// Pids in spawn order.
    pub(crate) fn pids(&self) -> Vec<Pid> {
        self.state.lock().unwrap().pids.clone()
    }

    /// Specs of successful spawns, in spawn order.
    pub(crate) fn specs(&self) -> Vec<WorkerSpec> {
        self.state.lock().unwrap().specs.clone()
    }

    /// Delivers `event` as if worker `pid` produced it.
    pub(crate) fn emit(&self, pid: Pid, event: WorkerEvent) {
        let state = self.state.lock().unwrap();
        let tx = state.events.get(&pid).expect("unknown fake pid");
        tx.send(event).expect("event stream closed");
    }

    /// Ends the event stream of `pid` without an exit report.
    pub(crate) fn close(&self, pid: Pid) {
        self.state.lock().unwrap().events.remove(&pid);
    }

    /// Messages the supervisor sent to `pid`.
    pub(crate) fn sent(&self, pid: Pid) -> Vec<Value> {
        let state = self.state.lock().unwrap();
        state
            .peers
            .get(&pid)
            .map(|p| p.sent.lock().unwrap().clone())
            .unwrap_or_default()
    }
}

impl Spawner for FakeSpawner {
    fn spawn(&self, spec: &WorkerSpec) -> Result<Spawned, SpawnError> {
        let mut state = self.state.lock().unwrap();
        if state.fail_next > 0 {
            state.fail_next -= 1;
            return Err(SpawnError::Rejected {
                reason: "scripted failure".into(),
            });
        }

        let pid = state.next_pid;
        state.next_pid += 1;
        let (tx, events) = mpsc::unbounded_channel();
        let peer = Arc::new(RecordingPeer {
            pid,
            sent: Mutex::new(Vec::new()),
        });

        state.specs.push(spec.clone());
        state.pids.push(pid);
        state.events.insert(pid, tx);
        state.peers.insert(pid, peer.clone());
        Ok(Spawned {
            handle: peer,
            events,
        })
    }
}

/// Worker-side channel with a scriptable inbox.
pub(crate) struct FakeChannel {
    pid: Pid,
    inbound_tx: Mutex<Option<mpsc::UnboundedSender<Value>>>,
    inbound_rx: Mutex<Option<mpsc::UnboundedReceiver<Value>>>,
    subscribes: AtomicUsize,
    closed: Mutex<bool>,
    sent: Mutex<Vec<Value>>,
    exits: Mutex<Vec<i32>>,
}

impl FakeChannel {
    pub(crate) fn new(pid: Pid) -> Arc<Self> {
        let (tx, rx) = mpsc::unbounded_channel();
        Arc::new(Self {
            pid,
            inbound_tx: Mutex::new(Some(tx)),
            inbound_rx: Mutex::new(Some(rx)),
            subscribes: AtomicUsize::new(0),
            closed: Mutex::new(false),
            sent: Mutex::new(Vec::new()),
            exits: Mutex::new(Vec::new()),
        })
    }

    /// Queues a message from the supervisor.
    pub(crate) fn push(&self, message: Value) {
        if let Some(tx) = self.inbound_tx.lock().unwrap().as_ref() {
            let _ = tx.send(message);
        }
    }

    /// Closes the supervisor → worker direction.
    pub(crate) fn hang_up(&self) {
        self.inbound_tx.lock().unwrap().take();
    }

    /// Makes every later `send` fail.
    pub(crate) fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }

    pub(crate) fn subscribe_calls(&self) -> usize {
        self.subscribes.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<Value> {
        self.sent.lock().unwrap().clone()
    }

    /// Exit codes requested, in order.
    pub(crate) fn exits(&self) -> Vec<i32> {
        self.exits.lock().unwrap().clone()
    }
}

impl ProcessHandle for FakeChannel {
    fn id(&self) -> Pid {
        self.pid
    }

    fn send(&self, message: Value) -> Result<(), TransportError> {
        if *self.closed.lock().unwrap() {
            return Err(TransportError::Closed);
        }
        self.sent.lock().unwrap().push(message);
        Ok(())
    }
}

impl Channel for FakeChannel {
    fn subscribe(&self) -> Option<mpsc::UnboundedReceiver<Value>> {
        self.subscribes.fetch_add(1, Ordering::SeqCst);
        self.inbound_rx.lock().unwrap().take()
    }

    fn exit(&self, code: i32) {
        self.exits.lock().unwrap().push(code);
    }
}
