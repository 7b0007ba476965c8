//! Error types for the gRPC layer.
//!
//! [`Error`] wraps the domain error and adds the failures that only exist on
//! the wire. `From<Error>` for [`tonic::Status`] lets handlers return it with
//! `?` and gives clients a meaningful status code.
//!
//! ## Error Cases
//! - `Coordinator`: a domain operation failed (see [`pinguino::Error`]).
//! - `InvalidRequest`: the request was malformed, e.g. a move without a
//!   command or an unparseable endpoint.
//! - `Connect`: a channel to a worker or the coordinator could not be set up.

use tonic::Status;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the gRPC transports and services.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// A coordinator or agent operation failed.
    #[error("Coordinator error: {0}")]
    Coordinator(#[from] pinguino::Error),

    /// The request could not be interpreted.
    #[error("Invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// Establishing a channel failed.
    #[error("Connect error: {context}")]
    Connect { context: String },
}

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        match err {
            Error::Coordinator(e) => match e {
                pinguino::Error::Transport { .. }
                | pinguino::Error::AssignmentFailed { .. }
                | pinguino::Error::Shutdown => Status::unavailable(e.to_string()),
                pinguino::Error::NoRegions => Status::failed_precondition(e.to_string()),
                pinguino::Error::UnknownWorker { .. } => Status::not_found(e.to_string()),
                pinguino::Error::InvalidConfig { .. } | pinguino::Error::Codec { .. } => {
                    Status::invalid_argument(e.to_string())
                }
            },
            Error::InvalidRequest { reason } => Status::invalid_argument(reason),
            Error::Connect { context } => Status::unavailable(format!("Connect error: {}", context)),
        }
    }
}

impl From<Error> for pinguino::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Coordinator(e) => e,
            other => pinguino::Error::Transport {
                context: other.to_string(),
            },
        }
    }
}

/// Folds a failed RPC into the domain's transport error.
pub fn transport_error(status: Status) -> pinguino::Error {
    pinguino::Error::Transport {
        context: format!("{:?}: {}", status.code(), status.message()),
    }
}
