//! Error types for the coordinator and player agent.
//!
//! ## Error Cases
//! - `Transport`: an RPC to a worker or the coordinator could not be
//!   completed.
//! - `NoRegions`: an assignment was requested before any region exists.
//! - `UnknownWorker`: a worker index outside the registry was referenced.
//! - `AssignmentFailed`: the player agent gave up asking for a region.
//! - `InvalidConfig`: a coordinator or agent was built with unusable settings.
//! - `Codec`: a move payload could not be encoded or decoded.
//! - `Shutdown`: the agent was killed before it was assigned.

use crate::WorkerIndex;

pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Unified error type for region assignment and move submission.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// The remote side was unreachable or returned a failure.
    #[error("Transport error: {context}")]
    Transport { context: String },

    /// No region has been configured yet, so nothing can be assigned.
    #[error("No regions are configured")]
    NoRegions,

    /// The referenced worker is not part of the registry.
    #[error("Unknown worker index {index:?}")]
    UnknownWorker { index: WorkerIndex },

    /// Every assignment attempt failed; the agent stopped retrying.
    #[error("Region assignment failed after {attempts} attempts")]
    AssignmentFailed { attempts: u32 },

    /// Construction parameters were rejected.
    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    /// A move payload could not be (de)serialized.
    #[error("Codec error: {context}")]
    Codec { context: String },

    /// The player agent was killed before an assignment arrived.
    #[error("Shutting down")]
    Shutdown,
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Codec {
            context: err.to_string(),
        }
    }
}
