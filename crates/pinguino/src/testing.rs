//! In-memory transports used by the unit tests.

use crate::{
    Assignment, CoordinatorTransport, Error, MoveCommand, PlayerId, Result, WorkerTransport,
};
use core::{future::Future, time::Duration};
use parking_lot::Mutex;
use std::sync::{
    Arc,
    atomic::{AtomicBool, AtomicU32, AtomicUsize, Ordering},
};
use tokio::sync::Notify;

#[derive(Default)]
struct WorkerInner {
    down: AtomicBool,
    heartbeat_delay: Mutex<Duration>,
    heartbeats: AtomicUsize,
    fast_moves: Mutex<Vec<MoveCommand>>,
    stable_moves: Mutex<Vec<MoveCommand>>,
}

/// Worker that records what it receives and can be switched off.
#[derive(Clone, Default)]
pub(crate) struct MockWorker {
    inner: Arc<WorkerInner>,
}

impl MockWorker {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn set_down(&self, down: bool) {
        self.inner.down.store(down, Ordering::SeqCst);
    }

    pub(crate) fn set_heartbeat_delay(&self, delay: Duration) {
        *self.inner.heartbeat_delay.lock() = delay;
    }

    pub(crate) fn heartbeats(&self) -> usize {
        self.inner.heartbeats.load(Ordering::SeqCst)
    }

    pub(crate) fn fast_moves(&self) -> Vec<MoveCommand> {
        self.inner.fast_moves.lock().clone()
    }

    pub(crate) fn stable_moves(&self) -> Vec<MoveCommand> {
        self.inner.stable_moves.lock().clone()
    }

    fn check_up(&self) -> Result<()> {
        if self.inner.down.load(Ordering::SeqCst) {
            return Err(Error::Transport {
                context: "worker down".to_string(),
            });
        }
        Ok(())
    }
}

impl WorkerTransport for MockWorker {
    fn heartbeat(&self) -> impl Future<Output = Result<()>> + Send {
        let worker = self.clone();
        async move {
            worker.inner.heartbeats.fetch_add(1, Ordering::SeqCst);
            let delay = *worker.inner.heartbeat_delay.lock();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            worker.check_up()
        }
    }

    fn fast_move(&self, command: MoveCommand) -> impl Future<Output = Result<()>> + Send {
        let worker = self.clone();
        async move {
            worker.check_up()?;
            worker.inner.fast_moves.lock().push(command);
            Ok(())
        }
    }

    fn stable_move(&self, command: MoveCommand) -> impl Future<Output = Result<()>> + Send {
        let worker = self.clone();
        async move {
            worker.check_up()?;
            worker.inner.stable_moves.lock().push(command);
            Ok(())
        }
    }
}

/// Coordinator that fails a fixed number of times before answering, and can
/// hold every answer until released.
#[derive(Clone)]
pub(crate) struct ScriptedCoordinator {
    assignment: Assignment,
    failures: u32,
    calls: Arc<AtomicU32>,
    gate: Option<Arc<Notify>>,
}

impl ScriptedCoordinator {
    pub(crate) fn new(assignment: Assignment) -> Self {
        Self {
            assignment,
            failures: 0,
            calls: Arc::new(AtomicU32::new(0)),
            gate: None,
        }
    }

    pub(crate) fn failing(mut self, failures: u32) -> Self {
        self.failures = failures;
        self
    }

    /// Holds every reply until the returned handle is notified.
    pub(crate) fn gated(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.gate = Some(Arc::clone(&gate));
        (self, gate)
    }

    pub(crate) fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

impl CoordinatorTransport for ScriptedCoordinator {
    fn assign_player_to_region(
        &self,
        _player: &PlayerId,
    ) -> impl Future<Output = Result<Assignment>> + Send {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let failures = self.failures;
        let assignment = self.assignment;
        let gate = self.gate.clone();
        async move {
            if let Some(gate) = gate {
                gate.notified().await;
            }
            if call <= failures {
                return Err(Error::Transport {
                    context: format!("coordinator unreachable (call {call})"),
                });
            }
            Ok(assignment)
        }
    }
}
