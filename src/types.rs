//! Core Data Model
//!
//! Identifiers and value types shared across the session core. None of these
//! carry synchronization logic; they are the payloads the controller and
//! submission pipeline move between collaborators.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies one player expected in a match instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ParticipantId(Uuid);

impl ParticipantId {
    /// Wrap an existing identifier.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Identifies the room hosting a match round.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoomId(Uuid);

impl RoomId {
    /// Wrap an existing identifier.
    pub fn new(id: Uuid) -> Self {
        Self(id)
    }

    /// Generate a fresh random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Per-session credential required before gameplay content may be loaded.
///
/// Opaque to this crate: it is resolved at session start and handed to the
/// gameplay engine when play is released. Its absence is a setup failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameplayToken(String);

impl GameplayToken {
    /// Wrap a raw credential.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Raw credential value.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The queued item being played this round.
///
/// Used only to parameterize the results screen; the session core never
/// inspects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    /// Server-assigned identifier of the queued item.
    pub id: u64,
    /// Human-readable title for display layers.
    pub title: String,
}

/// Locally computed outcome of a completed play.
///
/// Created once gameplay ends and owned by the submission pipeline until
/// handed to the results display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Score {
    /// Player this score belongs to.
    pub participant: ParticipantId,
    /// Total points scored.
    pub total: u64,
    /// Longest combo reached.
    pub max_combo: u32,
    /// Hit accuracy in `0.0..=1.0`.
    pub accuracy: f32,
    /// Whether the play met the pass criteria.
    pub passed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_ids_are_distinct() {
        assert_ne!(ParticipantId::random(), ParticipantId::random());
        assert_ne!(RoomId::random(), RoomId::random());
    }

    #[test]
    fn test_token_preserves_raw_value() {
        let token = GameplayToken::new("abc-123");
        assert_eq!(token.as_str(), "abc-123");
    }
}
