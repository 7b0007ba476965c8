//! # pinguino
//!
//! Sharding core for a real-time multiplayer backend. The game world is cut
//! into regions, each region is owned by one worker process, and every
//! connecting player is routed to the worker owning its region.
//!
//! - [`Coordinator`] assigns players to regions, keeps the region to worker
//!   map, and probes workers with heartbeats in the background.
//! - [`PlayerAgent`] is the client-side proxy for one player. It asks the
//!   coordinator for a region once, then sends moves straight to the owning
//!   worker over a fast (best-effort) or stable (acknowledged) path.
//!
//! Networking is abstracted behind [`WorkerTransport`] and
//! [`CoordinatorTransport`]; the `pinguino-tonic-core` crate implements them
//! over gRPC.
//!
//! ## Features
//!
//! - `tracing`: emit log events for assignments, registrations, probe
//!   failures and retries.

mod assignment;
mod coordinator;
mod error;
mod liveness;
mod payload;
mod player;
mod policy;
#[cfg(test)]
mod testing;
mod transport;
mod types;

pub use crate::assignment::*;
pub use crate::coordinator::*;
pub use crate::error::*;
pub use crate::liveness::*;
pub use crate::payload::*;
pub use crate::player::*;
pub use crate::policy::*;
pub use crate::transport::*;
pub use crate::types::*;
