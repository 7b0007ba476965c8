use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use core::time::Duration;
use pinguino_tonic_core::pinguino::CoordinatorConfig;
use std::path::PathBuf;
use tonic::transport::Uri;

/// Runtime configuration for the coordinator process.
///
/// Every flag can also be set through the environment variable named next to
/// it, or through a `.env` file in the working directory.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "pinguino-tonic-server",
    version,
    about = "Assigns players to world regions and watches the workers that own them"
)]
pub struct CliArgs {
    /// Unix socket to listen on.
    ///
    /// Defaults to `/var/tmp/pinguino-<uid>`, one coordinator per user on a
    /// shared host. A stale socket left by a previous run is removed before
    /// binding.
    ///
    /// Environment variable: `PINGUINO_SOCKET`
    #[arg(long, env = "PINGUINO_SOCKET")]
    pub socket: Option<PathBuf>,

    /// Listen on this TCP address instead of the Unix socket.
    ///
    /// Example: "0.0.0.0:50051"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR")]
    pub server_addr: Option<String>,

    /// Comma-separated worker endpoints, registered in order.
    ///
    /// Example: "http://10.0.0.7:7000,http://10.0.0.8:7000"
    ///
    /// Environment variable: `WORKER_ADDRS`
    #[arg(long, env = "WORKER_ADDRS", value_delimiter = ',')]
    pub workers: Vec<String>,

    /// Number of regions to start with. Region `r` is owned by worker
    /// `r % workers`. Defaults to one region per worker.
    ///
    /// Environment variable: `NUM_REGIONS`
    #[arg(long, env = "NUM_REGIONS")]
    pub regions: Option<u32>,

    /// How often stale workers are probed, in milliseconds.
    ///
    /// Environment variable: `HEARTBEAT_INTERVAL_MS`
    #[arg(long, env = "HEARTBEAT_INTERVAL_MS", default_value_t = 1000)]
    pub heartbeat_interval_ms: u64,

    /// How long a single probe may take before it counts as failed.
    /// Defaults to the heartbeat interval.
    ///
    /// Environment variable: `PROBE_TIMEOUT_MS`
    #[arg(long, env = "PROBE_TIMEOUT_MS")]
    pub probe_timeout_ms: Option<u64>,

    /// How long since its last answer a worker still counts as live.
    /// Defaults to three heartbeat intervals.
    ///
    /// Environment variable: `LIVENESS_TIMEOUT_MS`
    #[arg(long, env = "LIVENESS_TIMEOUT_MS")]
    pub liveness_timeout_ms: Option<u64>,

    /// How new players are spread over regions.
    ///
    /// Environment variable: `REGION_POLICY`
    #[arg(long, env = "REGION_POLICY", value_enum, default_value_t = PolicyKind::Random)]
    pub policy: PolicyKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Uniformly random region.
    Random,
    /// Region with the fewest players, lowest index on ties.
    LeastLoaded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListenAddr {
    Uds(PathBuf),
    Tcp(String),
}

impl core::fmt::Display for ListenAddr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Uds(path) => write!(f, "unix:{}", path.display()),
            Self::Tcp(addr) => f.write_str(addr),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen: ListenAddr,
    pub workers: Vec<String>,
    pub num_regions: u32,
    pub coordinator: CoordinatorConfig,
    pub policy: PolicyKind,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        let workers: Vec<String> = args
            .workers
            .into_iter()
            .map(|w| w.trim().to_string())
            .filter(|w| !w.is_empty())
            .collect();

        for worker in &workers {
            worker
                .parse::<Uri>()
                .with_context(|| format!("WORKER_ADDRS contains an invalid URI: {worker:?}"))?;
        }

        let num_workers =
            u32::try_from(workers.len()).context("WORKER_ADDRS lists too many workers")?;
        let num_regions = args.regions.unwrap_or(num_workers);
        if num_workers == 0 && num_regions > 0 {
            bail!("NUM_REGIONS ({num_regions}) requires at least one worker in WORKER_ADDRS");
        }

        if args.heartbeat_interval_ms == 0 {
            bail!("HEARTBEAT_INTERVAL_MS must be greater than 0");
        }
        let mut coordinator =
            CoordinatorConfig::from_interval(Duration::from_millis(args.heartbeat_interval_ms));
        if let Some(ms) = args.probe_timeout_ms {
            coordinator.probe_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = args.liveness_timeout_ms {
            coordinator.liveness_timeout = Duration::from_millis(ms);
        }
        coordinator.validate()?;

        let listen = match args.server_addr {
            Some(addr) => ListenAddr::Tcp(addr),
            None => ListenAddr::Uds(args.socket.unwrap_or_else(default_socket_path)),
        };

        Ok(Self {
            listen,
            workers,
            num_regions,
            coordinator,
            policy: args.policy,
        })
    }
}

/// `/var/tmp/pinguino-<uid>`, where `<uid>` is the process's effective uid
/// as read from procfs.
///
/// Hosts without procfs (macOS, the BSDs) and non-unix targets use the login
/// name from `USER`/`USERNAME` instead, so the same account gets a different
/// socket name there. Pass `--socket` to pin the path across hosts.
pub fn default_socket_path() -> PathBuf {
    PathBuf::from(format!("/var/tmp/pinguino-{}", current_user()))
}

#[cfg(unix)]
fn current_user() -> String {
    use std::os::unix::fs::MetadataExt;

    // `/proc/self` is owned by the effective uid.
    match std::fs::metadata("/proc/self") {
        Ok(meta) => meta.uid().to_string(),
        Err(_) => login_name(),
    }
}

#[cfg(not(unix))]
fn current_user() -> String {
    login_name()
}

fn login_name() -> String {
    std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "default".to_string())
}
