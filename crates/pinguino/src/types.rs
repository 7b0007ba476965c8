//! Identifiers shared by the coordinator, the player agent and the wire
//! layer.
//!
//! - [`Region`] - a disjoint partition of world-space, numbered densely from
//!   zero.
//! - [`WorkerIndex`] - a stable position in the coordinator's worker
//!   registry. Indices are never reused or reordered.
//! - [`PlayerId`] - the username a player connects with.
//! - [`Assignment`] - the `(region, worker)` pair a player is routed to.

use core::fmt;
use serde::{Deserialize, Serialize};

/// A partition of the game world owned by exactly one worker at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Region(u32);

impl Region {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw region number.
    pub const fn get(self) -> u32 {
        self.0
    }

    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for Region {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}", self.0)
    }
}

/// Position of a worker in the coordinator's ordered registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerIndex(u32);

impl WorkerIndex {
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw registry position.
    pub const fn get(self) -> u32 {
        self.0
    }

    pub(crate) const fn slot(self) -> usize {
        self.0 as usize
    }
}

impl From<u32> for WorkerIndex {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Display for WorkerIndex {
    // Operators count workers from one.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "worker {}", u64::from(self.0) + 1)
    }
}

/// The identity a player connects with.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Wraps a username.
    pub fn new(username: impl Into<String>) -> Self {
        Self(username.into())
    }

    /// The username.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Unwraps the username.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for PlayerId {
    fn from(username: &str) -> Self {
        Self(username.to_owned())
    }
}

impl From<String> for PlayerId {
    fn from(username: String) -> Self {
        Self(username)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Where a player's move commands are sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Assignment {
    pub region: Region,
    pub worker: WorkerIndex,
}

impl Assignment {
    pub const fn new(region: Region, worker: WorkerIndex) -> Self {
        Self { region, worker }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn worker_index_displays_one_based() {
        assert_eq!(WorkerIndex::new(0).to_string(), "worker 1");
        assert_eq!(WorkerIndex::new(u32::MAX).to_string(), "worker 4294967296");
    }

    #[test]
    fn player_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&PlayerId::from("pingu")).unwrap();
        assert_eq!(json, "\"pingu\"");
    }
}
