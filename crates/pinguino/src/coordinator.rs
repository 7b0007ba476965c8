//! Region assignment and worker liveness.
//!
//! The [`Coordinator`] owns the [`AssignmentTable`] and the
//! [`LivenessTracker`] behind a single lock and answers two kinds of request:
//!
//! - players asking which region and worker they belong to
//!   ([`Coordinator::assign_player_to_region`]);
//! - operators adding workers ([`Coordinator::register_workers`]).
//!
//! A background heartbeat loop probes every worker whose last contact is
//! older than the heartbeat interval. Each probe runs as its own task and
//! reports back through a channel, so a slow or dead worker never delays the
//! probes of the others.
//!
//! ## Worker failure
//!
//! A worker that stops answering keeps its regions. Failures are counted,
//! logged and visible through [`Coordinator::worker_status`] and
//! [`Coordinator::is_live`]; probing continues every interval until the
//! worker answers again. Moving regions off a dead worker is not done here.

use crate::{
    Assignment, AssignmentTable, CoordinatorTransport, Error, LivenessTracker, PlayerId,
    ProbeOutcome, ProbeReport, Region, RegionPolicy, Result, Transition, UniformRandomPolicy,
    WorkerIndex, WorkerStatus, WorkerTransport,
};
use core::{future::Future, time::Duration};
use parking_lot::Mutex;
use rand::{Rng, rng};
use std::sync::{Arc, Weak};
use tokio::{
    sync::{broadcast, mpsc},
    task::JoinHandle,
    time::{self, Instant, MissedTickBehavior},
};
use tokio_util::sync::CancellationToken;

/// Capacity of the probe report broadcast. Lagging subscribers lose the
/// oldest reports.
const PROBE_EVENT_CAPACITY: usize = 256;

/// Timing knobs for the heartbeat loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordinatorConfig {
    /// Period of the loop, and the age after which a worker is probed.
    pub heartbeat_interval: Duration,
    /// How long a single probe may take before it counts as failed.
    pub probe_timeout: Duration,
    /// How old the last contact may be for a worker to count as live.
    pub liveness_timeout: Duration,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self::from_interval(Duration::from_secs(1))
    }
}

impl CoordinatorConfig {
    /// Probe timeout equal to the interval, liveness timeout three intervals.
    pub fn from_interval(heartbeat_interval: Duration) -> Self {
        Self {
            heartbeat_interval,
            probe_timeout: heartbeat_interval,
            liveness_timeout: heartbeat_interval * 3,
        }
    }

    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for zero durations or a liveness
    /// timeout shorter than the heartbeat interval.
    pub fn validate(&self) -> Result<()> {
        if self.heartbeat_interval.is_zero() {
            return Err(Error::InvalidConfig {
                reason: "heartbeat interval must be greater than 0".to_string(),
            });
        }
        if self.probe_timeout.is_zero() {
            return Err(Error::InvalidConfig {
                reason: "probe timeout must be greater than 0".to_string(),
            });
        }
        if self.liveness_timeout < self.heartbeat_interval {
            return Err(Error::InvalidConfig {
                reason: format!(
                    "liveness timeout ({:?}) is shorter than the heartbeat interval ({:?})",
                    self.liveness_timeout, self.heartbeat_interval
                ),
            });
        }
        Ok(())
    }
}

struct State<W> {
    workers: Vec<W>,
    table: AssignmentTable,
    liveness: LivenessTracker,
    backup: Option<WorkerIndex>,
}

struct Shared<W> {
    state: Mutex<State<W>>,
    policy: Box<dyn RegionPolicy>,
    config: CoordinatorConfig,
    probe_events: broadcast::Sender<ProbeReport>,
}

/// Shared handle to the coordinator. Clones refer to the same state and the
/// same heartbeat loop.
pub struct Coordinator<W: WorkerTransport> {
    shared: Arc<Shared<W>>,
    shutdown_token: CancellationToken,
    heartbeat_task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl<W: WorkerTransport> Clone for Coordinator<W> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            shutdown_token: self.shutdown_token.clone(),
            heartbeat_task: Arc::clone(&self.heartbeat_task),
        }
    }
}

impl<W: WorkerTransport> Coordinator<W> {
    /// Creates a coordinator with `num_regions` regions spread over
    /// `workers`, assigning players uniformly at random, and starts the
    /// heartbeat loop.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] for an invalid `config` or when
    /// regions are requested without workers.
    ///
    /// # Panics
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(workers: Vec<W>, num_regions: u32, config: CoordinatorConfig) -> Result<Self> {
        Self::with_policy(workers, num_regions, config, UniformRandomPolicy)
    }

    /// Like [`Coordinator::new`], with a custom region policy.
    ///
    /// # Errors
    ///
    /// See [`Coordinator::new`].
    pub fn with_policy<P>(
        workers: Vec<W>,
        num_regions: u32,
        config: CoordinatorConfig,
        policy: P,
    ) -> Result<Self>
    where
        P: RegionPolicy + 'static,
    {
        config.validate()?;
        let table = AssignmentTable::new(num_regions, workers.len())?;

        let now = Instant::now();
        let mut liveness = LivenessTracker::new();
        for _ in &workers {
            liveness.track(now);
        }
        let backup = pick_backup(workers.len());

        let (probe_events, _) = broadcast::channel(PROBE_EVENT_CAPACITY);
        let interval = config.heartbeat_interval;
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                workers,
                table,
                liveness,
                backup,
            }),
            policy: Box::new(policy),
            config,
            probe_events,
        });

        let shutdown_token = CancellationToken::new();
        let handle = tokio::spawn(heartbeat_loop(
            Arc::downgrade(&shared),
            interval,
            shutdown_token.clone(),
        ));

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Coordinator started with {} regions, backup {:?}",
            num_regions,
            backup
        );

        Ok(Self {
            shared,
            shutdown_token,
            heartbeat_task: Arc::new(Mutex::new(Some(handle))),
        })
    }

    /// Returns the player's region and the worker owning it, assigning a
    /// region on the first call. Later calls return the same pair.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoRegions`] when no region exists yet. Stopping the
    /// heartbeat loop with [`Coordinator::shutdown`] does not affect
    /// assignment.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all, fields(player = %player)))]
    pub fn assign_player_to_region(&self, player: &PlayerId) -> Result<Assignment> {
        let assignment = self
            .shared
            .state
            .lock()
            .table
            .assign(player, self.shared.policy.as_ref())?;

        #[cfg(feature = "tracing")]
        tracing::debug!("{player} -> {} on {}", assignment.region, assignment.worker);

        Ok(assignment)
    }

    /// Appends `workers` to the registry. Each new worker gets a new region
    /// of its own, numbered after the existing regions.
    ///
    /// Returns the new `(region, worker)` pairs.
    pub fn register_workers(&self, workers: impl IntoIterator<Item = W>) -> Vec<Assignment> {
        let now = Instant::now();
        let mut state = self.shared.state.lock();

        let before = state.workers.len();
        state.workers.extend(workers);
        let count = state.workers.len() - before;

        for _ in 0..count {
            state.liveness.track(now);
        }
        let added = state
            .table
            .add_regions(WorkerIndex::new(before as u32), count);

        if state.backup.is_none() {
            state.backup = pick_backup(state.workers.len());
        }
        drop(state);

        #[cfg(feature = "tracing")]
        for assignment in &added {
            tracing::info!(
                "Registered {} owning {}",
                assignment.worker,
                assignment.region
            );
        }

        added
    }

    /// The existing assignment of `player`, without assigning.
    pub fn lookup(&self, player: &PlayerId) -> Option<Assignment> {
        self.shared.state.lock().table.lookup(player)
    }

    /// Worker owning `region`, if the region exists.
    pub fn worker_for(&self, region: Region) -> Option<WorkerIndex> {
        self.shared.state.lock().table.worker_for(region)
    }

    /// Number of regions, fixed at construction and grown by registration.
    pub fn num_regions(&self) -> usize {
        self.shared.state.lock().table.num_regions()
    }

    /// Number of registered workers, live or not.
    pub fn num_workers(&self) -> usize {
        self.shared.state.lock().workers.len()
    }

    /// Number of players assigned so far.
    pub fn player_count(&self) -> usize {
        self.shared.state.lock().table.player_count()
    }

    /// Players per region, indexed by region.
    pub fn region_load(&self) -> Vec<usize> {
        self.shared.state.lock().table.region_load().to_vec()
    }

    /// Worker chosen as backup when the first workers were known. Nothing
    /// fails over to it yet.
    pub fn backup_worker(&self) -> Option<WorkerIndex> {
        self.shared.state.lock().backup
    }

    /// Handle to the worker at `index`.
    pub fn worker(&self, index: WorkerIndex) -> Option<W> {
        self.shared.state.lock().workers.get(index.slot()).cloned()
    }

    /// Handles to all workers, in registry order.
    pub fn workers(&self) -> Vec<W> {
        self.shared.state.lock().workers.clone()
    }

    /// Heartbeat timing this coordinator was built with.
    pub fn config(&self) -> &CoordinatorConfig {
        &self.shared.config
    }

    /// Time of the last acknowledged heartbeat from `worker`, or of its
    /// registration if it never answered. `None` for an unknown index.
    pub fn last_heartbeat_at(&self, worker: WorkerIndex) -> Option<Instant> {
        self.shared.state.lock().liveness.last_heartbeat_at(worker)
    }

    /// Whether `worker` was reached within the liveness timeout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownWorker`] for an index outside the registry.
    pub fn is_live(&self, worker: WorkerIndex) -> Result<bool> {
        self.shared
            .state
            .lock()
            .liveness
            .is_live(worker, Instant::now(), self.shared.config.liveness_timeout)
            .ok_or(Error::UnknownWorker { index: worker })
    }

    /// Liveness snapshot of every registered worker, in registry order.
    pub fn worker_status(&self) -> Vec<WorkerStatus> {
        self.shared
            .state
            .lock()
            .liveness
            .snapshot(Instant::now(), self.shared.config.liveness_timeout)
    }

    /// Subscribes to the result of every heartbeat probe.
    pub fn subscribe_probes(&self) -> broadcast::Receiver<ProbeReport> {
        self.shared.probe_events.subscribe()
    }

    /// Whether the heartbeat loop has been told to stop.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Stops the heartbeat loop and waits for it to exit.
    ///
    /// The loop reacts to the signal immediately, even mid-sleep. Probes
    /// already in flight finish on their own and their results are dropped.
    /// Safe to call more than once and from several tasks.
    pub async fn shutdown(&self) {
        self.shutdown_token.cancel();

        let handle = self.heartbeat_task.lock().take();
        if let Some(handle) = handle {
            if let Err(_e) = handle.await {
                #[cfg(feature = "tracing")]
                tracing::error!("Heartbeat loop ended abnormally: {_e}");
            }
        }

        #[cfg(feature = "tracing")]
        tracing::info!("Coordinator shut down");
    }
}

impl<W: WorkerTransport> CoordinatorTransport for Coordinator<W> {
    fn assign_player_to_region(
        &self,
        player: &PlayerId,
    ) -> impl Future<Output = Result<Assignment>> + Send {
        let result = Coordinator::assign_player_to_region(self, player);
        async move { result }
    }
}

fn pick_backup(num_workers: usize) -> Option<WorkerIndex> {
    (num_workers > 0).then(|| WorkerIndex::new(rng().random_range(0..num_workers) as u32))
}

impl<W: WorkerTransport> Shared<W> {
    fn dispatch_probes(&self, report_tx: &mpsc::UnboundedSender<ProbeReport>) {
        let now = Instant::now();
        let probes: Vec<(WorkerIndex, W)> = {
            let mut state = self.state.lock();
            let stale = state
                .liveness
                .claim_stale(now, self.config.heartbeat_interval);
            stale
                .into_iter()
                .filter_map(|index| Some((index, state.workers.get(index.slot())?.clone())))
                .collect()
        };

        for (index, worker) in probes {
            tokio::spawn(probe_worker(
                index,
                worker,
                self.config.probe_timeout,
                report_tx.clone(),
            ));
        }
    }

    fn apply_probe(&self, report: ProbeReport) {
        let transition = self.state.lock().liveness.record(&report, Instant::now());

        match transition {
            Transition::Failed { consecutive: _n } => {
                #[cfg(feature = "tracing")]
                tracing::warn!(
                    "couldn't reach {} ({} in a row): {:?}",
                    report.worker,
                    _n,
                    report.outcome
                );
            }
            Transition::Recovered { after_failures: _n } => {
                #[cfg(feature = "tracing")]
                tracing::info!("{} reachable again after {} failed probes", report.worker, _n);
            }
            Transition::Healthy | Transition::Unknown => {}
        }

        // No subscribers is fine.
        let _ = self.probe_events.send(report);
    }
}

async fn heartbeat_loop<W: WorkerTransport>(
    shared: Weak<Shared<W>>,
    interval: Duration,
    shutdown_token: CancellationToken,
) {
    #[cfg(feature = "tracing")]
    tracing::trace!("Heartbeat loop started");

    let (report_tx, mut report_rx) = mpsc::unbounded_channel();
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = shutdown_token.cancelled() => break,
            Some(report) = report_rx.recv() => {
                let Some(shared) = shared.upgrade() else { break };
                shared.apply_probe(report);
            }
            _ = ticker.tick() => {
                let Some(shared) = shared.upgrade() else { break };
                shared.dispatch_probes(&report_tx);
            }
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Heartbeat loop stopped");
}

async fn probe_worker<W: WorkerTransport>(
    worker: WorkerIndex,
    transport: W,
    probe_timeout: Duration,
    report_tx: mpsc::UnboundedSender<ProbeReport>,
) {
    let sent_at = Instant::now();
    let outcome = match time::timeout(probe_timeout, transport.heartbeat()).await {
        Ok(Ok(())) => ProbeOutcome::Ack,
        Ok(Err(e)) => ProbeOutcome::Failed {
            reason: e.to_string(),
        },
        Err(_) => ProbeOutcome::TimedOut,
    };

    // The loop is gone after shutdown; the result is dropped.
    let _ = report_tx.send(ProbeReport {
        worker,
        sent_at,
        outcome,
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockWorker;
    use std::collections::HashSet;

    const INTERVAL: Duration = Duration::from_millis(10);

    fn workers(n: usize) -> Vec<MockWorker> {
        (0..n).map(|_| MockWorker::new()).collect()
    }

    fn fast_config() -> CoordinatorConfig {
        CoordinatorConfig::from_interval(INTERVAL)
    }

    #[tokio::test(start_paused = true)]
    async fn repeated_assignment_is_stable() {
        let coordinator = Coordinator::new(workers(4), 4, fast_config()).unwrap();
        let player = PlayerId::from("pingu");

        let first = coordinator.assign_player_to_region(&player).unwrap();
        for _ in 0..20 {
            assert_eq!(coordinator.assign_player_to_region(&player).unwrap(), first);
        }
        assert_eq!(coordinator.player_count(), 1);
        assert_eq!(coordinator.lookup(&player), Some(first));
    }

    #[tokio::test(start_paused = true)]
    async fn hundred_players_land_in_range() {
        let coordinator = Coordinator::new(workers(3), 3, fast_config()).unwrap();

        for r in 0..3 {
            assert_eq!(
                coordinator.worker_for(Region::new(r)),
                Some(WorkerIndex::new(r))
            );
        }

        for i in 0..100 {
            let assignment = coordinator
                .assign_player_to_region(&PlayerId::new(format!("player-{i}")))
                .unwrap();
            assert!(assignment.region.get() < 3);
            assert!(assignment.worker.get() < 3);
            assert_eq!(assignment.region.get(), assignment.worker.get());
        }
        assert_eq!(coordinator.player_count(), 100);
        assert_eq!(coordinator.region_load().iter().sum::<usize>(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_assignments_lose_no_updates() {
        const PLAYERS: usize = 256;
        let coordinator = Coordinator::new(workers(3), 3, CoordinatorConfig::default()).unwrap();

        let tasks: Vec<_> = (0..PLAYERS)
            .map(|i| {
                let coordinator = coordinator.clone();
                tokio::spawn(async move {
                    let player = PlayerId::new(format!("player-{i}"));
                    let assignment = coordinator.assign_player_to_region(&player).unwrap();
                    (player, assignment)
                })
            })
            .collect();

        let mut players = HashSet::new();
        for task in tasks {
            let (player, assignment) = task.await.unwrap();
            assert_eq!(coordinator.lookup(&player), Some(assignment));
            assert!(assignment.region.get() < 3);
            players.insert(player);
        }

        assert_eq!(players.len(), PLAYERS);
        assert_eq!(coordinator.player_count(), PLAYERS);
        coordinator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn assignment_without_regions_fails() {
        let coordinator = Coordinator::<MockWorker>::new(Vec::new(), 0, fast_config()).unwrap();
        let err = coordinator
            .assign_player_to_region(&PlayerId::from("pingu"))
            .unwrap_err();
        assert_eq!(err, Error::NoRegions);
        assert_eq!(coordinator.backup_worker(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn regions_without_workers_are_rejected() {
        let result = Coordinator::<MockWorker>::new(Vec::new(), 2, fast_config());
        assert!(matches!(result, Err(Error::InvalidConfig { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn invalid_timing_is_rejected() {
        let config = CoordinatorConfig {
            heartbeat_interval: Duration::ZERO,
            ..fast_config()
        };
        assert!(matches!(
            Coordinator::new(workers(1), 1, config),
            Err(Error::InvalidConfig { .. })
        ));

        let config = CoordinatorConfig {
            liveness_timeout: INTERVAL / 2,
            ..fast_config()
        };
        assert!(config.validate().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn registered_workers_get_their_own_regions() {
        let coordinator = Coordinator::<MockWorker>::new(Vec::new(), 0, fast_config()).unwrap();

        let added = coordinator.register_workers(workers(2));
        assert_eq!(
            added,
            vec![
                Assignment::new(Region::new(0), WorkerIndex::new(0)),
                Assignment::new(Region::new(1), WorkerIndex::new(1)),
            ]
        );

        let added = coordinator.register_workers(workers(1));
        assert_eq!(
            added,
            vec![Assignment::new(Region::new(2), WorkerIndex::new(2))]
        );

        assert_eq!(coordinator.num_workers(), 3);
        assert_eq!(coordinator.num_regions(), 3);
        assert_eq!(coordinator.worker_status().len(), 3);
        assert!(coordinator.backup_worker().unwrap().get() < 2);
        assert!(coordinator
            .assign_player_to_region(&PlayerId::from("pingu"))
            .is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn healthy_workers_keep_advancing() {
        let coordinator = Coordinator::new(workers(2), 2, fast_config()).unwrap();
        let t0 = Instant::now();

        time::sleep(INTERVAL * 10).await;

        for w in 0..2 {
            let index = WorkerIndex::new(w);
            assert!(coordinator.last_heartbeat_at(index).unwrap() > t0);
            assert!(coordinator.is_live(index).unwrap());
            assert!(coordinator.worker(index).unwrap().heartbeats() >= 3);
        }
        assert!(matches!(
            coordinator.is_live(WorkerIndex::new(9)),
            Err(Error::UnknownWorker { .. })
        ));
        coordinator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn failed_probes_leave_heartbeat_stale_until_recovery() {
        let pool = workers(1);
        let worker = pool[0].clone();
        worker.set_down(true);

        let coordinator = Coordinator::new(pool, 1, fast_config()).unwrap();
        let index = WorkerIndex::new(0);
        let t0 = coordinator.last_heartbeat_at(index).unwrap();

        time::sleep(INTERVAL * 10).await;

        let status = coordinator.worker_status()[0];
        assert!(status.consecutive_failures >= 3);
        assert_eq!(coordinator.last_heartbeat_at(index), Some(t0));
        assert!(!coordinator.is_live(index).unwrap());

        worker.set_down(false);
        let revived_at = Instant::now();
        time::sleep(INTERVAL * 3).await;

        assert!(coordinator.last_heartbeat_at(index).unwrap() >= revived_at);
        assert_eq!(coordinator.worker_status()[0].consecutive_failures, 0);
        assert!(coordinator.is_live(index).unwrap());
        coordinator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn hung_worker_does_not_delay_others() {
        let pool = workers(3);
        pool[1].set_heartbeat_delay(Duration::from_secs(3600));
        let config = CoordinatorConfig {
            probe_timeout: Duration::from_secs(3600),
            ..fast_config()
        };

        let coordinator = Coordinator::new(pool.clone(), 3, config).unwrap();
        let t0 = Instant::now();

        time::sleep(INTERVAL * 20).await;

        assert!(pool[0].heartbeats() >= 5);
        assert!(pool[2].heartbeats() >= 5);
        // One probe stuck in flight, never a pile-up.
        assert_eq!(pool[1].heartbeats(), 1);
        assert_eq!(coordinator.last_heartbeat_at(WorkerIndex::new(1)), Some(t0));
        assert!(coordinator.last_heartbeat_at(WorkerIndex::new(0)).unwrap() > t0);
        assert!(coordinator.last_heartbeat_at(WorkerIndex::new(2)).unwrap() > t0);
        coordinator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn timed_out_probe_counts_as_failure() {
        let pool = workers(1);
        pool[0].set_heartbeat_delay(INTERVAL * 100);
        let config = CoordinatorConfig {
            probe_timeout: INTERVAL,
            ..fast_config()
        };
        let coordinator = Coordinator::new(pool, 1, config).unwrap();
        let mut probes = coordinator.subscribe_probes();

        let report = probes.recv().await.unwrap();
        assert_eq!(report.worker, WorkerIndex::new(0));
        assert_eq!(report.outcome, ProbeOutcome::TimedOut);
        coordinator.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_probing_promptly() {
        let pool = workers(2);
        let coordinator = Coordinator::new(pool.clone(), 2, fast_config()).unwrap();
        time::sleep(INTERVAL * 5).await;

        let other = coordinator.clone();
        let before = Instant::now();
        tokio::join!(coordinator.shutdown(), other.shutdown());
        assert!(Instant::now() - before < INTERVAL);
        assert!(coordinator.is_shutdown());

        let probed: Vec<_> = pool.iter().map(MockWorker::heartbeats).collect();
        time::sleep(INTERVAL * 10).await;
        assert_eq!(
            pool.iter().map(MockWorker::heartbeats).collect::<Vec<_>>(),
            probed
        );

    }

    #[tokio::test(start_paused = true)]
    async fn assignment_survives_shutdown() {
        let coordinator = Coordinator::new(workers(1), 1, fast_config()).unwrap();
        coordinator.shutdown().await;

        let late = PlayerId::from("late");
        let assignment = coordinator.assign_player_to_region(&late).unwrap();
        assert_eq!(assignment, Assignment::new(Region::new(0), WorkerIndex::new(0)));
        assert_eq!(coordinator.assign_player_to_region(&late).unwrap(), assignment);

        let added = coordinator.register_workers([MockWorker::new()]);
        assert_eq!(added.len(), 1);
        assert_eq!(coordinator.num_regions(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn coordinator_serves_as_in_process_transport() {
        let coordinator = Coordinator::new(workers(2), 2, fast_config()).unwrap();
        let player = PlayerId::from("pingu");

        let via_trait = CoordinatorTransport::assign_player_to_region(&coordinator, &player)
            .await
            .unwrap();
        assert_eq!(coordinator.lookup(&player), Some(via_trait));
    }
}
