#![doc = include_str!("../README.md")]

mod server;

use clap::Parser;
use futures::Stream;
use pinguino_tonic_core::proto::{FILE_DESCRIPTOR_SET, coordinator_server::CoordinatorServer};
use server::config::{CliArgs, ListenAddr, ServerConfig};
use server::service::handler::CoordinatorService;
use server::telemetry::{TelemetryProviders, init_telemetry};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::signal;
use tokio_stream::wrappers::TcpListenerStream;
use tonic::transport::Server;
use tonic::transport::server::Connected;
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(args)?;

    let providers = init_telemetry()?;

    match config.listen.clone() {
        ListenAddr::Uds(path) => {
            #[cfg(unix)]
            {
                use tokio::net::UnixListener;
                use tokio_stream::wrappers::UnixListenerStream;

                // A previous run may have left its socket behind.
                match std::fs::remove_file(&path) {
                    Ok(()) => {
                        #[cfg(feature = "tracing")]
                        tracing::info!("Removed stale socket {}", path.display());
                    }
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => return Err(e.into()),
                }
                let uds = UnixListener::bind(&path)?;
                let incoming = UnixListenerStream::new(uds);
                log_startup_info(&config);
                let res = run_server_with_incoming(providers, incoming, config).await;
                let _ = std::fs::remove_file(&path);
                res
            }
            #[cfg(not(unix))]
            {
                let _ = (path, providers);
                anyhow::bail!("Unix domain sockets are not supported on this platform; set SERVER_ADDR");
            }
        }
        ListenAddr::Tcp(addr) => {
            let tcp = TcpListener::bind(&addr).await?;
            let incoming = TcpListenerStream::new(tcp);
            log_startup_info(&config);
            run_server_with_incoming(providers, incoming, config).await
        }
    }
}

async fn run_server_with_incoming<I, IO, IE>(
    providers: TelemetryProviders,
    incoming: I,
    config: ServerConfig,
) -> anyhow::Result<()>
where
    I: Stream<Item = Result<IO, IE>>,
    IO: AsyncRead + AsyncWrite + Connected + Unpin + Send + 'static,
    IE: Into<tower::BoxError>,
{
    let (health_reporter, health_service) = tonic_health::server::health_reporter();
    health_reporter
        .set_serving::<CoordinatorServer<CoordinatorService>>()
        .await;

    let service = CoordinatorService::new(&config)?;

    let reflection = Builder::configure()
        .register_encoded_file_descriptor_set(FILE_DESCRIPTOR_SET)
        .build_v1()?;

    Server::builder()
        .http2_adaptive_window(Some(true))
        .add_service(health_service)
        .add_service(reflection)
        .add_service(CoordinatorServer::new(service.clone()))
        .serve_with_incoming_shutdown(
            incoming,
            shutdown_signal(service, health_reporter, providers),
        )
        .await?;

    #[cfg(feature = "tracing")]
    tracing::info!("Coordinator shut down successfully");
    Ok(())
}

fn log_startup_info(_config: &ServerConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting coordinator on {} with full config: {:#?}",
            _config.listen,
            _config
        );
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting coordinator on {} with {} workers and {} regions",
            _config.listen,
            _config.workers.len(),
            _config.num_regions
        );
    }
}

async fn shutdown_signal(
    service: CoordinatorService,
    health_reporter: HealthReporter,
    providers: TelemetryProviders,
) {
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    tokio::select! {
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    #[cfg(feature = "tracing")]
    tracing::info!(
        "Shutdown signal received, {} players on {} workers",
        service.coordinator().player_count(),
        service.coordinator().num_workers()
    );

    // 1. Publish the status
    health_reporter
        .set_not_serving::<CoordinatorServer<CoordinatorService>>()
        .await;

    // 2. Stop the heartbeat loop
    service.shutdown().await;

    providers.shutdown();
}
