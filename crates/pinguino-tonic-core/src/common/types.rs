//! Conversions between protobuf messages and domain types.
//!
//! Region and worker indices travel as plain `uint32`; player identities
//! travel as the username string.

use crate::{Error, Result, proto};
use pinguino::{Assignment, MoveCommand, PlayerId, Region, WorkerIndex};

impl From<Assignment> for proto::AssignPlayerToRegionResponse {
    fn from(assignment: Assignment) -> Self {
        Self {
            success: true,
            region: assignment.region.get(),
            worker: assignment.worker.get(),
        }
    }
}

impl proto::AssignPlayerToRegionResponse {
    /// Reply sent when no region exists yet. The index fields carry no
    /// meaning.
    pub fn unassigned() -> Self {
        Self {
            success: false,
            region: 0,
            worker: 0,
        }
    }
}

impl TryFrom<proto::AssignPlayerToRegionResponse> for Assignment {
    type Error = pinguino::Error;

    fn try_from(reply: proto::AssignPlayerToRegionResponse) -> pinguino::Result<Self> {
        if !reply.success {
            return Err(pinguino::Error::NoRegions);
        }
        Ok(Assignment::new(
            Region::new(reply.region),
            WorkerIndex::new(reply.worker),
        ))
    }
}

impl From<Assignment> for proto::RegionAssignment {
    fn from(assignment: Assignment) -> Self {
        Self {
            region: assignment.region.get(),
            worker: assignment.worker.get(),
        }
    }
}

impl From<proto::RegionAssignment> for Assignment {
    fn from(assignment: proto::RegionAssignment) -> Self {
        Assignment::new(
            Region::new(assignment.region),
            WorkerIndex::new(assignment.worker),
        )
    }
}

impl From<MoveCommand> for proto::MoveCommand {
    fn from(command: MoveCommand) -> Self {
        Self {
            payload: command.payload,
            username: command.player_id.into_inner(),
            region: command.region.get(),
        }
    }
}

impl From<proto::MoveCommand> for MoveCommand {
    fn from(command: proto::MoveCommand) -> Self {
        MoveCommand::new(
            command.payload,
            PlayerId::new(command.username),
            Region::new(command.region),
        )
    }
}

/// Extracts the command from a `FastMove`/`StableMove` request body.
pub fn require_command(command: Option<proto::MoveCommand>) -> Result<MoveCommand> {
    command.map(MoveCommand::from).ok_or_else(|| Error::InvalidRequest {
        reason: "move request carries no command".to_string(),
    })
}

/// Validates a player identity received on the wire.
pub fn require_username(username: String) -> Result<PlayerId> {
    if username.is_empty() {
        return Err(Error::InvalidRequest {
            reason: "username must not be empty".to_string(),
        });
    }
    Ok(PlayerId::new(username))
}
