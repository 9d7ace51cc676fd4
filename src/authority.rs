//! Match Authority Contract
//!
//! The remote match authority owns canonical state for who has loaded,
//! started, and finished a round. This module defines the local proxy
//! contract the session core consumes; implementations (networking,
//! reconnection, wire format) live outside this crate.

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, watch};

use crate::types::RoomId;

/// Participant states this client can ask the authority to record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParticipantState {
    /// Gameplay content is loaded; the participant is ready to start.
    Loaded,
    /// The participant finished the play and submitted a score.
    FinishedPlay,
}

/// Notifications pushed by the match authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchNotification {
    /// Fired once per round, after all participants report loaded.
    MatchStarted,
    /// Fired at most once per round, once all scores are aggregated (or the
    /// authority decides to proceed without a straggler).
    ResultsReady,
}

/// Errors surfaced by a participant state request.
///
/// A server-side rejection and a failed round trip are kept apart for
/// logging, but the session core handles both identically: abort, exit
/// without results.
#[derive(Debug, Clone, thiserror::Error)]
pub enum AuthorityError {
    /// The authority refused the state transition.
    #[error("state request rejected: {0}")]
    Rejected(String),

    /// The round trip to the authority failed.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Local proxy for the remote match authority.
///
/// The transport behind an implementation must deliver notifications ordered
/// and deduplicated; a disconnect is terminal for the session (no
/// reconnection happens at this layer).
pub trait MatchAuthority: Send + Sync {
    /// Current connectivity with change notification.
    ///
    /// The current value is observable immediately upon subscription; a
    /// transition to `false` is permanent for this session.
    fn connectivity(&self) -> watch::Receiver<bool>;

    /// Subscribe to round notifications.
    ///
    /// Dropping the receiver deregisters the subscription.
    fn subscribe(&self) -> broadcast::Receiver<MatchNotification>;

    /// Ask the authority to record this participant's state.
    ///
    /// Resolves once the authority acknowledges the transition. There is no
    /// client-side timeout here; only the results wait is time-bounded.
    fn request_state(&self, state: ParticipantState)
        -> BoxFuture<'static, Result<(), AuthorityError>>;

    /// Identifier of the room hosting this round.
    ///
    /// Must be present by the time results are shown.
    fn room_id(&self) -> Option<RoomId>;
}
