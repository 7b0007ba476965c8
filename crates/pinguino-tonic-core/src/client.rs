//! gRPC implementations of the domain transport traits.
//!
//! - [`GrpcWorker`] is the coordinator's and the player agent's handle to a
//!   worker process.
//! - [`GrpcCoordinator`] is the player agent's handle to the coordinator,
//!   reachable over TCP or the coordinator's Unix socket.
//!
//! Channels are cheap to clone; every clone multiplexes over the same HTTP/2
//! connection.

use crate::{
    Error, Result, transport_error,
    proto::{
        AssignPlayerToRegionRequest, FastMoveRequest, HeartbeatRequest, RegisterWorkersRequest,
        StableMoveRequest, WorkerState, WorkerStatusRequest, coordinator_client::CoordinatorClient,
        worker_client::WorkerClient,
    },
};
use core::{future::Future, time::Duration};
use pinguino::{Assignment, CoordinatorTransport, MoveCommand, PlayerId, WorkerTransport};
use tonic::transport::{Channel, Endpoint};

/// Upper bound on establishing a connection. Per-call deadlines are left to
/// the caller (the coordinator wraps every probe in its own timeout).
const CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

fn endpoint(uri: &str) -> Result<Endpoint> {
    Endpoint::from_shared(uri.to_string())
        .map(|endpoint| endpoint.connect_timeout(CONNECT_TIMEOUT).tcp_nodelay(true))
        .map_err(|e| Error::InvalidRequest {
            reason: format!("invalid endpoint {uri:?}: {e}"),
        })
}

/// Handle to one worker process.
#[derive(Clone, Debug)]
pub struct GrpcWorker {
    uri: String,
    client: WorkerClient<Channel>,
}

impl GrpcWorker {
    /// Creates a handle without connecting. The connection is made on first
    /// use and re-established after failures, so an unreachable worker only
    /// shows up as failed calls.
    ///
    /// Must be called from within a tokio runtime.
    pub fn connect_lazy(uri: impl Into<String>) -> Result<Self> {
        let uri = uri.into();
        let channel = endpoint(&uri)?.connect_lazy();
        Ok(Self {
            uri,
            client: WorkerClient::new(channel),
        })
    }

    /// The URI this handle was created with.
    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl WorkerTransport for GrpcWorker {
    fn heartbeat(&self) -> impl Future<Output = pinguino::Result<()>> + Send {
        let mut client = self.client.clone();
        async move {
            client
                .heartbeat(HeartbeatRequest {})
                .await
                .map_err(transport_error)?;
            Ok(())
        }
    }

    fn fast_move(&self, command: MoveCommand) -> impl Future<Output = pinguino::Result<()>> + Send {
        let mut client = self.client.clone();
        let request = FastMoveRequest {
            command: Some(command.into()),
        };
        async move {
            client.fast_move(request).await.map_err(transport_error)?;
            Ok(())
        }
    }

    fn stable_move(
        &self,
        command: MoveCommand,
    ) -> impl Future<Output = pinguino::Result<()>> + Send {
        let mut client = self.client.clone();
        let request = StableMoveRequest {
            command: Some(command.into()),
        };
        async move {
            client.stable_move(request).await.map_err(transport_error)?;
            Ok(())
        }
    }
}

/// Handle to the coordinator process.
#[derive(Clone, Debug)]
pub struct GrpcCoordinator {
    client: CoordinatorClient<Channel>,
}

impl GrpcCoordinator {
    /// Connects over TCP, e.g. `http://127.0.0.1:50051`.
    pub async fn connect(uri: impl AsRef<str>) -> Result<Self> {
        let channel = endpoint(uri.as_ref())?
            .connect()
            .await
            .map_err(|e| Error::Connect {
                context: format!("{}: {e}", uri.as_ref()),
            })?;
        Ok(Self::from_channel(channel))
    }

    /// Connects over the coordinator's Unix domain socket.
    #[cfg(unix)]
    pub async fn connect_uds(path: impl AsRef<std::path::Path>) -> Result<Self> {
        use hyper_util::rt::TokioIo;
        use tokio::net::UnixStream;
        use tonic::transport::Uri;
        use tower::service_fn;

        let path = path.as_ref().to_path_buf();
        let display = path.display().to_string();

        // The authority is ignored; every connection dials the socket.
        let channel = Endpoint::from_static("http://[::]:50051")
            .connect_with_connector(service_fn(move |_: Uri| {
                let path = path.clone();
                async move { Ok::<_, std::io::Error>(TokioIo::new(UnixStream::connect(path).await?)) }
            }))
            .await
            .map_err(|e| Error::Connect {
                context: format!("{display}: {e}"),
            })?;
        Ok(Self::from_channel(channel))
    }

    pub fn from_channel(channel: Channel) -> Self {
        Self {
            client: CoordinatorClient::new(channel),
        }
    }

    /// Asks the coordinator to append workers; returns the regions created
    /// for them.
    pub async fn register_workers(
        &self,
        endpoints: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Vec<Assignment>> {
        let request = RegisterWorkersRequest {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
        };
        let reply = self
            .client
            .clone()
            .register_workers(request)
            .await
            .map_err(transport_error)?
            .into_inner();
        Ok(reply.regions.into_iter().map(Assignment::from).collect())
    }

    /// Liveness snapshot of every registered worker.
    pub async fn worker_status(&self) -> Result<Vec<WorkerState>> {
        let reply = self
            .client
            .clone()
            .worker_status(WorkerStatusRequest {})
            .await
            .map_err(transport_error)?
            .into_inner();
        Ok(reply.workers)
    }
}

impl CoordinatorTransport for GrpcCoordinator {
    fn assign_player_to_region(
        &self,
        player: &PlayerId,
    ) -> impl Future<Output = pinguino::Result<Assignment>> + Send {
        let mut client = self.client.clone();
        let request = AssignPlayerToRegionRequest {
            username: player.as_str().to_owned(),
        };
        async move {
            let reply = client
                .assign_player_to_region(request)
                .await
                .map_err(transport_error)?
                .into_inner();
            Assignment::try_from(reply)
        }
    }
}
