//! Client-side proxy for one connected player.
//!
//! A [`PlayerAgent`] starts unassigned and immediately asks the coordinator
//! for a region in the background, retrying with exponential backoff. Move
//! submissions made before the answer arrives wait for it; they never reach a
//! worker while the agent is unassigned.
//!
//! ```text
//! Pending --(coordinator answers)--> Assigned --(set_workers)--> Assigned
//!    |\
//!    | `--(attempts exhausted)--> Failed --(set_workers)--> Assigned
//!     `--(kill)--> Killed --(set_workers)--> Assigned
//! ```
//!
//! Once assigned, moves go straight to the owning worker over one of two
//! paths:
//!
//! - fast: dispatched in the background, failures are only logged;
//! - stable: awaited until the worker acknowledges.

use crate::{
    Assignment, CoordinatorTransport, Error, MoveCommand, Payload, PlayerId, PlayerState, Result,
    WorkerTransport,
};
use bytes::Bytes;
use core::time::Duration;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{sync::watch, task::AbortHandle, time};

/// Retry policy for the initial assignment request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_secs(1),
        }
    }
}

/// Where the agent is in its assignment protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentStatus {
    Pending,
    Assigned(Assignment),
    Failed { attempts: u32 },
    /// [`PlayerAgent::kill`] stopped the request before an answer arrived.
    Killed,
}

struct Binding<W> {
    workers: Vec<W>,
    assignment: Option<Assignment>,
    state: PlayerState,
}

struct AgentInner<C, W> {
    player_id: PlayerId,
    coordinator: C,
    config: AgentConfig,
    binding: Mutex<Binding<W>>,
    status: watch::Sender<AssignmentStatus>,
}

pub struct PlayerAgent<C, W> {
    inner: Arc<AgentInner<C, W>>,
    assignment_task: AbortHandle,
}

impl<C, W> PlayerAgent<C, W>
where
    C: CoordinatorTransport,
    W: WorkerTransport,
{
    /// Creates an unassigned agent and starts the assignment protocol in the
    /// background. Returns immediately.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(coordinator: C, workers: Vec<W>, player_id: impl Into<PlayerId>) -> Self {
        Self::with_config(coordinator, workers, player_id, AgentConfig::default())
    }

    /// Like [`PlayerAgent::new`], with a custom retry policy.
    pub fn with_config(
        coordinator: C,
        workers: Vec<W>,
        player_id: impl Into<PlayerId>,
        config: AgentConfig,
    ) -> Self {
        let (status, _) = watch::channel(AssignmentStatus::Pending);
        let inner = Arc::new(AgentInner {
            player_id: player_id.into(),
            coordinator,
            config,
            binding: Mutex::new(Binding {
                workers,
                assignment: None,
                state: PlayerState::default(),
            }),
            status,
        });

        let task = tokio::spawn(request_assignment(Arc::clone(&inner)));

        Self {
            inner,
            assignment_task: task.abort_handle(),
        }
    }

    /// Player this agent acts for.
    pub fn player_id(&self) -> &PlayerId {
        &self.inner.player_id
    }

    /// True once both region and worker are known.
    pub fn is_assigned(&self) -> bool {
        self.inner.binding.lock().assignment.is_some()
    }

    /// Current binding, if any.
    pub fn assignment(&self) -> Option<Assignment> {
        self.inner.binding.lock().assignment
    }

    /// Current step of the assignment protocol.
    pub fn status(&self) -> AssignmentStatus {
        *self.inner.status.borrow()
    }

    /// Last position sent by [`PlayerAgent::move_player`].
    pub fn state(&self) -> PlayerState {
        self.inner.binding.lock().state
    }

    /// Waits until the agent is assigned.
    ///
    /// # Errors
    ///
    /// - [`Error::AssignmentFailed`] once the coordinator could not be
    ///   reached within the configured attempts.
    /// - [`Error::Shutdown`] if the agent was killed before it was assigned.
    pub async fn wait_for_assignment(&self) -> Result<Assignment> {
        let mut status = self.inner.status.subscribe();
        loop {
            let current = *status.borrow_and_update();
            match current {
                AssignmentStatus::Assigned(assignment) => return Ok(assignment),
                AssignmentStatus::Failed { attempts } => {
                    return Err(Error::AssignmentFailed { attempts });
                }
                AssignmentStatus::Killed => return Err(Error::Shutdown),
                AssignmentStatus::Pending => {
                    status.changed().await.map_err(|_| Error::Shutdown)?;
                }
            }
        }
    }

    /// Rebinds the agent to a new worker list and assignment, e.g. after the
    /// coordinator moved its region. Concurrent moves see either the old or
    /// the new binding, never a mix.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownWorker`] if `assignment.worker` is not an
    /// index into `workers`; the old binding is kept.
    pub fn set_workers(&self, workers: Vec<W>, assignment: Assignment) -> Result<()> {
        if assignment.worker.slot() >= workers.len() {
            return Err(Error::UnknownWorker {
                index: assignment.worker,
            });
        }

        let mut binding = self.inner.binding.lock();
        binding.workers = workers;
        binding.assignment = Some(assignment);
        self.inner
            .status
            .send_replace(AssignmentStatus::Assigned(assignment));
        drop(binding);

        #[cfg(feature = "tracing")]
        tracing::debug!(
            "{} rebound to {} on {}",
            self.inner.player_id,
            assignment.region,
            assignment.worker
        );
        Ok(())
    }

    /// Sends a move over the fast path once assigned. Returns as soon as the
    /// command is handed to the transport; delivery is not confirmed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AssignmentFailed`] if the agent never got a region.
    pub async fn send_fast_move(&self, payload: Bytes) -> Result<()> {
        let (worker, command) = self.prepare(payload).await?;

        tokio::spawn(async move {
            if let Err(_e) = worker.fast_move(command).await {
                #[cfg(feature = "tracing")]
                tracing::debug!("Fast move dropped: {_e}");
            }
        });
        Ok(())
    }

    /// Sends a move over the stable path once assigned and waits for the
    /// worker's acknowledgement.
    ///
    /// # Errors
    ///
    /// - [`Error::AssignmentFailed`] if the agent never got a region.
    /// - Whatever the worker transport reports.
    pub async fn send_stable_move(&self, payload: Bytes) -> Result<()> {
        let (worker, command) = self.prepare(payload).await?;
        worker.stable_move(command).await
    }

    /// Records `(x, y)` as the player's position and sends it as a fast move.
    /// The local state changes before the move is sent, whatever the worker
    /// does with it.
    ///
    /// # Errors
    ///
    /// See [`PlayerAgent::send_fast_move`].
    pub async fn move_player(&self, x: i32, y: i32) -> Result<()> {
        self.inner.binding.lock().state = PlayerState { x, y };

        let payload = Payload::Move {
            x,
            y,
            username: self.inner.player_id.to_string(),
        }
        .encode()?;
        self.send_fast_move(payload).await
    }

    /// Sends a chat message over the stable path.
    ///
    /// # Errors
    ///
    /// See [`PlayerAgent::send_stable_move`].
    pub async fn send_chat(&self, message: impl Into<String>) -> Result<()> {
        let payload = Payload::Chat {
            message: message.into(),
            username: self.inner.player_id.to_string(),
        }
        .encode()?;
        self.send_stable_move(payload).await
    }

    /// Stops an assignment request that is still retrying. Sends waiting
    /// for it return [`Error::Shutdown`]. An agent that is already assigned
    /// keeps its binding.
    pub fn kill(&self) {
        self.assignment_task.abort();
        // Under the binding lock so a late answer cannot land after this.
        let _binding = self.inner.binding.lock();
        self.inner.settle(AssignmentStatus::Killed);
    }

    // Waits for the assignment, then snapshots worker and region together.
    async fn prepare(&self, payload: Bytes) -> Result<(W, MoveCommand)> {
        self.wait_for_assignment().await?;

        let binding = self.inner.binding.lock();
        let assignment = binding.assignment.ok_or(Error::Shutdown)?;
        let worker = binding
            .workers
            .get(assignment.worker.slot())
            .cloned()
            .ok_or(Error::UnknownWorker {
                index: assignment.worker,
            })?;
        drop(binding);

        let command = MoveCommand::new(payload, self.inner.player_id.clone(), assignment.region);
        Ok((worker, command))
    }
}

impl<C, W> Drop for PlayerAgent<C, W> {
    fn drop(&mut self) {
        self.assignment_task.abort();
    }
}

impl<C, W> AgentInner<C, W> {
    // Applies the coordinator's answer unless an override or a kill got
    // there first.
    fn bind(&self, assignment: Assignment) -> bool {
        let mut binding = self.binding.lock();
        if binding.assignment.is_some()
            || matches!(*self.status.borrow(), AssignmentStatus::Killed)
        {
            return false;
        }
        binding.assignment = Some(assignment);
        self.status
            .send_replace(AssignmentStatus::Assigned(assignment));
        true
    }

    // Publishes a terminal state unless the agent already left `Pending`.
    fn settle(&self, terminal: AssignmentStatus) {
        self.status.send_if_modified(|status| {
            if matches!(status, AssignmentStatus::Pending) {
                *status = terminal;
                true
            } else {
                false
            }
        });
    }
}

async fn request_assignment<C, W>(inner: Arc<AgentInner<C, W>>)
where
    C: CoordinatorTransport,
    W: WorkerTransport,
{
    let attempts = inner.config.max_attempts.max(1);
    let mut backoff = inner.config.initial_backoff;

    for attempt in 1..=attempts {
        match inner
            .coordinator
            .assign_player_to_region(&inner.player_id)
            .await
        {
            Ok(assignment) => {
                let _bound = inner.bind(assignment);
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "{} assigned to {} on {} (attempt {attempt}, applied: {_bound})",
                    inner.player_id,
                    assignment.region,
                    assignment.worker
                );
                return;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::debug!(
                    "Assignment attempt {attempt}/{attempts} for {} failed: {_e}",
                    inner.player_id
                );
            }
        }

        if attempt < attempts {
            time::sleep(backoff).await;
            backoff = (backoff * 2).min(inner.config.max_backoff);
        }
    }

    #[cfg(feature = "tracing")]
    tracing::error!(
        "Giving up on region assignment for {} after {attempts} attempts",
        inner.player_id
    );
    inner.settle(AssignmentStatus::Failed { attempts });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        Coordinator, CoordinatorConfig, Region, WorkerIndex,
        testing::{MockWorker, ScriptedCoordinator},
    };

    fn assignment(region: u32, worker: u32) -> Assignment {
        Assignment::new(Region::new(region), WorkerIndex::new(worker))
    }

    fn workers(n: usize) -> Vec<MockWorker> {
        (0..n).map(|_| MockWorker::new()).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn agent_starts_unassigned_and_binds_answer() {
        let (coordinator, gate) = ScriptedCoordinator::new(assignment(1, 1)).gated();
        let agent = PlayerAgent::new(coordinator, workers(2), "pingu");

        assert!(!agent.is_assigned());
        assert_eq!(agent.status(), AssignmentStatus::Pending);

        gate.notify_one();
        assert_eq!(agent.wait_for_assignment().await.unwrap(), assignment(1, 1));
        assert!(agent.is_assigned());
        assert_eq!(agent.status(), AssignmentStatus::Assigned(assignment(1, 1)));
    }

    #[tokio::test(start_paused = true)]
    async fn fast_move_waits_for_assignment() {
        let pool = workers(2);
        let (coordinator, gate) = ScriptedCoordinator::new(assignment(1, 1)).gated();
        let agent = Arc::new(PlayerAgent::new(coordinator, pool.clone(), "pingu"));

        let sender = Arc::clone(&agent);
        let send = tokio::spawn(async move { sender.move_player(4, 2).await });

        time::sleep(Duration::from_millis(50)).await;
        assert!(!send.is_finished());
        assert!(!agent.is_assigned());
        assert!(pool.iter().all(|w| w.fast_moves().is_empty()));
        // Optimistic: the position is recorded before any worker sees it.
        assert_eq!(agent.state(), PlayerState { x: 4, y: 2 });

        gate.notify_one();
        send.await.unwrap().unwrap();
        time::sleep(Duration::from_millis(1)).await;

        let sent = pool[1].fast_moves();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].region, Region::new(1));
        assert_eq!(sent[0].player_id, PlayerId::from("pingu"));
        assert_eq!(
            Payload::decode(&sent[0].payload).unwrap(),
            Payload::Move {
                x: 4,
                y: 2,
                username: "pingu".into()
            }
        );
        assert!(pool[0].fast_moves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn fast_move_ignores_worker_failure() {
        let pool = workers(1);
        pool[0].set_down(true);
        let agent = PlayerAgent::new(ScriptedCoordinator::new(assignment(0, 0)), pool, "pingu");

        agent.move_player(7, 7).await.unwrap();
        assert_eq!(agent.state(), PlayerState { x: 7, y: 7 });
    }

    #[tokio::test(start_paused = true)]
    async fn stable_move_reports_worker_result() {
        let pool = workers(1);
        let agent =
            PlayerAgent::new(ScriptedCoordinator::new(assignment(0, 0)), pool.clone(), "pingu");

        agent.send_chat("hello").await.unwrap();
        assert_eq!(pool[0].stable_moves().len(), 1);
        assert_eq!(
            Payload::decode(&pool[0].stable_moves()[0].payload).unwrap(),
            Payload::Chat {
                message: "hello".into(),
                username: "pingu".into()
            }
        );

        pool[0].set_down(true);
        let err = agent
            .send_stable_move(Bytes::from_static(b"{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Transport { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_failures_are_retried_with_backoff() {
        let coordinator = ScriptedCoordinator::new(assignment(0, 0)).failing(3);
        let calls = coordinator.clone();
        let start = time::Instant::now();

        let agent = PlayerAgent::new(coordinator, workers(1), "pingu");
        agent.wait_for_assignment().await.unwrap();

        assert_eq!(calls.calls(), 4);
        // 10ms + 20ms + 40ms between the four attempts.
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(70), "{waited:?}");
        assert!(waited < Duration::from_millis(80), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn exhausted_retries_surface_as_error() {
        let coordinator = ScriptedCoordinator::new(assignment(0, 0)).failing(u32::MAX);
        let calls = coordinator.clone();
        let pool = workers(1);
        let agent = PlayerAgent::new(coordinator, pool.clone(), "pingu");

        let err = agent.move_player(1, 1).await.unwrap_err();
        assert_eq!(err, Error::AssignmentFailed { attempts: 10 });
        assert_eq!(calls.calls(), 10);
        assert_eq!(agent.status(), AssignmentStatus::Failed { attempts: 10 });
        assert!(pool[0].fast_moves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_is_capped() {
        let coordinator = ScriptedCoordinator::new(assignment(0, 0)).failing(4);
        let config = AgentConfig {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(100),
            max_backoff: Duration::from_millis(150),
        };
        let start = time::Instant::now();
        let agent = PlayerAgent::with_config(coordinator, workers(1), "pingu", config);

        agent.wait_for_assignment().await.unwrap();
        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(100 + 150 * 3), "{waited:?}");
        assert!(waited < Duration::from_millis(100 + 150 * 4), "{waited:?}");
    }

    #[tokio::test(start_paused = true)]
    async fn set_workers_rebinds_atomically() {
        let old = workers(1);
        let new = workers(3);
        let agent = PlayerAgent::new(ScriptedCoordinator::new(assignment(0, 0)), old.clone(), "pingu");
        agent.wait_for_assignment().await.unwrap();

        assert!(matches!(
            agent.set_workers(new.clone(), assignment(5, 3)),
            Err(Error::UnknownWorker { .. })
        ));
        assert_eq!(agent.assignment(), Some(assignment(0, 0)));

        agent.set_workers(new.clone(), assignment(5, 2)).unwrap();
        agent.send_stable_move(Bytes::from_static(b"{}")).await.unwrap();

        assert!(old[0].stable_moves().is_empty());
        let sent = new[2].stable_moves();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].region, Region::new(5));
    }

    #[tokio::test(start_paused = true)]
    async fn override_before_answer_wins() {
        let (coordinator, gate) = ScriptedCoordinator::new(assignment(0, 0)).gated();
        let agent = PlayerAgent::new(coordinator, workers(2), "pingu");

        agent.set_workers(workers(2), assignment(1, 1)).unwrap();
        gate.notify_one();
        time::sleep(Duration::from_millis(1)).await;

        assert_eq!(agent.assignment(), Some(assignment(1, 1)));
    }

    #[tokio::test(start_paused = true)]
    async fn killed_agent_rejects_waiting_moves() {
        let (coordinator, gate) = ScriptedCoordinator::new(assignment(0, 0)).gated();
        let pool = workers(1);
        let agent = Arc::new(PlayerAgent::new(coordinator, pool.clone(), "pingu"));

        let sender = Arc::clone(&agent);
        let waiting = tokio::spawn(async move { sender.send_stable_move(Bytes::new()).await });
        time::sleep(Duration::from_millis(10)).await;

        agent.kill();
        assert_eq!(agent.status(), AssignmentStatus::Killed);
        assert_eq!(waiting.await.unwrap().unwrap_err(), Error::Shutdown);

        let err = time::timeout(Duration::from_secs(3600), agent.send_fast_move(Bytes::new()))
            .await
            .expect("send returns after kill")
            .unwrap_err();
        assert_eq!(err, Error::Shutdown);

        // The aborted request never binds, even if the coordinator answers.
        gate.notify_one();
        time::sleep(Duration::from_millis(10)).await;
        assert!(!agent.is_assigned());
        assert!(pool[0].stable_moves().is_empty());
        assert!(pool[0].fast_moves().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn kill_after_assignment_keeps_binding() {
        let pool = workers(1);
        let agent = PlayerAgent::new(ScriptedCoordinator::new(assignment(0, 0)), pool.clone(), "pingu");
        agent.wait_for_assignment().await.unwrap();

        agent.kill();
        assert_eq!(agent.status(), AssignmentStatus::Assigned(assignment(0, 0)));
        agent.send_chat("still here").await.unwrap();
        assert_eq!(pool[0].stable_moves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failed_agent_recovers_through_override() {
        let coordinator = ScriptedCoordinator::new(assignment(0, 0)).failing(u32::MAX);
        let config = AgentConfig {
            max_attempts: 1,
            ..AgentConfig::default()
        };
        let pool = workers(1);
        let agent = PlayerAgent::with_config(coordinator, pool.clone(), "pingu", config);
        assert!(agent.wait_for_assignment().await.is_err());

        agent.set_workers(pool.clone(), assignment(0, 0)).unwrap();
        agent.send_chat("back").await.unwrap();
        assert_eq!(pool[0].stable_moves().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn agents_against_real_coordinator() {
        let pool = workers(3);
        let coordinator =
            Coordinator::new(pool.clone(), 3, CoordinatorConfig::default()).unwrap();

        let agents: Vec<_> = (0..10)
            .map(|i| PlayerAgent::new(coordinator.clone(), pool.clone(), format!("p{i}")))
            .collect();

        for agent in &agents {
            let assignment = agent.wait_for_assignment().await.unwrap();
            assert_eq!(coordinator.lookup(agent.player_id()), Some(assignment));
            agent.send_chat("hi").await.unwrap();
        }

        let delivered: usize = pool.iter().map(|w| w.stable_moves().len()).sum();
        assert_eq!(delivered, 10);
        coordinator.shutdown().await;
    }
}
