//! Stable identifiers shared across the engine.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier for one running game session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameId(pub Uuid);

impl GameId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for GameId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stable numeric identity for one participant in a session, independent
/// of whether the underlying actor is a human or an automated decision-maker.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Seat(pub u8);

impl std::fmt::Display for Seat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Origin of an event: a seat, or the engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    /// Emitted by the engine (phase changes, resolutions, notices).
    System,
    /// Emitted on behalf of a seated participant.
    Seat(Seat),
}

impl std::fmt::Display for Actor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::Seat(seat) => write!(f, "seat {seat}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_ids_are_unique() {
        assert_ne!(GameId::new(), GameId::new());
    }

    #[test]
    fn seat_serializes_transparently() {
        let json = serde_json::to_string(&Seat(4)).unwrap();
        assert_eq!(json, "4");
        let back: Seat = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Seat(4));
    }

    #[test]
    fn actor_display() {
        assert_eq!(Actor::System.to_string(), "system");
        assert_eq!(Actor::Seat(Seat(2)).to_string(), "seat 2");
    }
}
