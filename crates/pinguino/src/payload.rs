//! Move commands and the payload types players put inside them.
//!
//! A [`MoveCommand`] carries an opaque byte payload; the coordinator and the
//! transport never look inside it. The payload kinds a player agent knows how
//! to produce are registered in [`Payload`], a tagged enum encoded as JSON so
//! workers in any language can decode it.

use crate::{PlayerId, Region, Result};
use bytes::Bytes;
use serde::{Deserialize, Serialize};

/// A command submitted by a player to the worker that owns its region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveCommand {
    pub payload: Bytes,
    pub player_id: PlayerId,
    pub region: Region,
}

impl MoveCommand {
    /// Addresses `payload` from `player_id` to `region`.
    pub fn new(payload: Bytes, player_id: PlayerId, region: Region) -> Self {
        Self {
            payload,
            player_id,
            region,
        }
    }
}

/// Payload kinds understood by workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// The player moved to `(x, y)`.
    Move { x: i32, y: i32, username: String },
    /// The player posted a chat message.
    Chat { message: String, username: String },
}

impl Payload {
    /// Serializes to the JSON bytes carried by a [`MoveCommand`].
    pub fn encode(&self) -> Result<Bytes> {
        Ok(Bytes::from(serde_json::to_vec(self)?))
    }

    /// Parses bytes produced by [`Payload::encode`].
    pub fn decode(raw: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(raw)?)
    }
}

/// Last position a player agent believes its player occupies.
///
/// Updated optimistically when a move is sent; never reconciled with the
/// worker.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerState {
    pub x: i32,
    pub y: i32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn move_payload_is_tagged() {
        let payload = Payload::Move {
            x: 3,
            y: -4,
            username: "pingu".into(),
        };
        let raw = payload.encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(value["kind"], "move");
        assert_eq!(value["x"], 3);
        assert_eq!(Payload::decode(&raw).unwrap(), payload);
    }

    #[test]
    fn unknown_kind_is_a_codec_error() {
        let err = Payload::decode(br#"{"kind":"teleport","username":"pingu"}"#).unwrap_err();
        assert!(matches!(err, Error::Codec { .. }));
    }
}
