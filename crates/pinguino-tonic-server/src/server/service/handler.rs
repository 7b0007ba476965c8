//! gRPC service implementation for the coordinator.
//!
//! [`CoordinatorService`] exposes a [`pinguino::Coordinator`] driving
//! [`GrpcWorker`] handles through the `Coordinator` service defined in the
//! protobuf schema.
//!
//! ## Responsibilities
//!
//! - Answer `AssignPlayerToRegion`. A coordinator without regions answers
//!   `success = false` rather than failing the call.
//! - Register workers sent through `RegisterWorkers`, connecting lazily.
//! - Report per-worker liveness through `WorkerStatus`.
//! - Feed heartbeat probe results into the metrics.

use crate::server::{
    config::{PolicyKind, ServerConfig},
    telemetry::{
        increment_assignment_failures, increment_assignments, increment_heartbeat_failures,
        increment_heartbeat_probes, increment_workers_registered, record_assign_latency,
    },
};
use pinguino_tonic_core::{
    Error, GrpcWorker,
    pinguino::{
        self, Coordinator, LeastLoadedPolicy, ProbeOutcome, ProbeReport, UniformRandomPolicy,
    },
    proto::{
        AssignPlayerToRegionRequest, AssignPlayerToRegionResponse, RegisterWorkersRequest,
        RegisterWorkersResponse, WorkerState, WorkerStatusRequest, WorkerStatusResponse,
        coordinator_server::Coordinator as CoordinatorRpc,
    },
    require_username,
};
use tokio::{
    sync::broadcast::{self, error::RecvError},
    time::Instant,
};
use tonic::{Request, Response, Status};

/// The coordinator process's gRPC service.
///
/// Cloning is cheap; every clone drives the same coordinator.
#[derive(Clone)]
pub struct CoordinatorService {
    coordinator: Coordinator<GrpcWorker>,
}

impl CoordinatorService {
    /// Connects (lazily) to the configured workers, starts the coordinator
    /// and its heartbeat loop.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: &ServerConfig) -> Result<Self, Error> {
        let workers = config
            .workers
            .iter()
            .map(|uri| GrpcWorker::connect_lazy(uri.as_str()))
            .collect::<Result<Vec<_>, _>>()?;

        let settings = config.coordinator.clone();
        let coordinator = match config.policy {
            PolicyKind::Random => {
                Coordinator::with_policy(workers, config.num_regions, settings, UniformRandomPolicy)?
            }
            PolicyKind::LeastLoaded => {
                Coordinator::with_policy(workers, config.num_regions, settings, LeastLoadedPolicy)?
            }
        };

        Ok(Self::from_coordinator(coordinator))
    }

    pub fn from_coordinator(coordinator: Coordinator<GrpcWorker>) -> Self {
        tokio::spawn(record_probes(coordinator.subscribe_probes()));
        Self { coordinator }
    }

    pub fn coordinator(&self) -> &Coordinator<GrpcWorker> {
        &self.coordinator
    }

    /// Stops the heartbeat loop. Assignment and registration keep working.
    pub async fn shutdown(&self) {
        self.coordinator.shutdown().await;
    }
}

async fn record_probes(mut probes: broadcast::Receiver<ProbeReport>) {
    loop {
        match probes.recv().await {
            Ok(report) => {
                increment_heartbeat_probes();
                if report.outcome != ProbeOutcome::Ack {
                    increment_heartbeat_failures();
                }
            }
            Err(RecvError::Lagged(_skipped)) => {
                #[cfg(feature = "tracing")]
                tracing::debug!("Probe metrics skipped {} reports", _skipped);
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[tonic::async_trait]
impl CoordinatorRpc for CoordinatorService {
    /// Returns the caller's region and owning worker, assigning one on first
    /// call.
    ///
    /// If `metrics` is enabled, emits telemetry for:
    /// - assignments answered
    /// - assignment failures
    /// - handler latency
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(username = %req.get_ref().username)))]
    async fn assign_player_to_region(
        &self,
        req: Request<AssignPlayerToRegionRequest>,
    ) -> Result<Response<AssignPlayerToRegionResponse>, Status> {
        let start = std::time::Instant::now();

        let player = require_username(req.into_inner().username).inspect_err(|_| {
            increment_assignment_failures();
        })?;

        let reply = match self.coordinator.assign_player_to_region(&player) {
            Ok(assignment) => {
                increment_assignments();
                AssignPlayerToRegionResponse::from(assignment)
            }
            Err(pinguino::Error::NoRegions) => {
                increment_assignment_failures();
                #[cfg(feature = "tracing")]
                tracing::warn!("No regions configured, cannot place {}", player);
                AssignPlayerToRegionResponse::unassigned()
            }
            Err(e) => {
                increment_assignment_failures();
                return Err(Error::from(e).into());
            }
        };

        record_assign_latency(start.elapsed().as_secs_f64() * 1000.0);
        Ok(Response::new(reply))
    }

    /// Appends workers in request order. Either every endpoint is valid and
    /// all are registered, or none is.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip_all, fields(count = req.get_ref().endpoints.len())))]
    async fn register_workers(
        &self,
        req: Request<RegisterWorkersRequest>,
    ) -> Result<Response<RegisterWorkersResponse>, Status> {
        let workers = req
            .into_inner()
            .endpoints
            .into_iter()
            .map(GrpcWorker::connect_lazy)
            .collect::<Result<Vec<_>, _>>()?;

        let added = self.coordinator.register_workers(workers);
        increment_workers_registered(added.len() as u64);

        Ok(Response::new(RegisterWorkersResponse {
            regions: added.into_iter().map(Into::into).collect(),
        }))
    }

    async fn worker_status(
        &self,
        _req: Request<WorkerStatusRequest>,
    ) -> Result<Response<WorkerStatusResponse>, Status> {
        let now = Instant::now();
        // Snapshot first: the registry only grows, so every status has a
        // handle in the list read afterwards.
        let statuses = self.coordinator.worker_status();
        let handles = self.coordinator.workers();

        let workers = statuses
            .into_iter()
            .map(|status| WorkerState {
                index: status.index.get(),
                endpoint: handles
                    .get(status.index.get() as usize)
                    .map(|worker| worker.uri().to_string())
                    .unwrap_or_default(),
                millis_since_contact: u64::try_from(
                    now.saturating_duration_since(status.last_heartbeat_at)
                        .as_millis(),
                )
                .unwrap_or(u64::MAX),
                consecutive_failures: status.consecutive_failures,
                live: status.live,
            })
            .collect();

        Ok(Response::new(WorkerStatusResponse { workers }))
    }
}
