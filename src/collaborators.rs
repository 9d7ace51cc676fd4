//! External Collaborator Seams
//!
//! The session core orchestrates *when* these subsystems run; their
//! implementations (rendering, input handling, score math, token issuance)
//! live in the embedding client.

use futures_util::future::BoxFuture;

use crate::types::{GameplayToken, ParticipantId, PlaylistItem, RoomId, Score};

/// Errors from resolving the gameplay authorization token.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TokenError {
    /// The service declined to issue a token for this round.
    #[error("token denied: {0}")]
    Denied(String),

    /// The token service could not be reached.
    #[error("token service unreachable: {0}")]
    Unreachable(String),
}

/// Errors from the base score-recording step.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RecordError {
    /// The score service rejected the score.
    #[error("score rejected: {0}")]
    Rejected(String),

    /// The round trip to the score service failed.
    #[error("transport failure: {0}")]
    Transport(String),
}

/// Resolves the per-session gameplay authorization token.
///
/// Resolution happens once, at session start, before any listeners are
/// registered. Failure is a setup failure: the session aborts before any
/// gameplay begins.
pub trait TokenProvider: Send + Sync {
    /// Resolve the token for the round being entered.
    fn resolve(&self) -> BoxFuture<'static, Result<GameplayToken, TokenError>>;
}

/// The base score-recording step of the submission pipeline.
///
/// Score math and persistence are out of scope here; the pipeline only
/// sequences this step before the finished-play handshake.
pub trait ScoreRecorder: Send + Sync {
    /// Record a completed play's score.
    fn record(&self, score: &Score) -> BoxFuture<'static, Result<(), RecordError>>;
}

/// The local gameplay engine, gated by the session controller.
///
/// The engine must not process frames or input before [`release`] and must
/// stop doing so after [`halt`]. Both calls arrive on the controller's owner
/// task.
///
/// [`release`]: GameplayEngine::release
/// [`halt`]: GameplayEngine::halt
pub trait GameplayEngine: Send + Sync {
    /// Allow gameplay to run, with the credential that authorizes loading
    /// its content.
    fn release(&self, token: &GameplayToken);

    /// Stop gameplay immediately.
    fn halt(&self);

    /// Whether gameplay is currently running.
    fn is_running(&self) -> bool;
}

/// Presentation layer the session drives.
///
/// Messaging around aborts is the surrounding screen's responsibility; this
/// core only requests the exit.
pub trait SessionDisplay: Send + Sync {
    /// Show the "waiting for match to start" indicator.
    fn show_waiting_indicator(&self);

    /// Hide the waiting indicator.
    fn hide_waiting_indicator(&self);

    /// Show the results screen for a finished round.
    fn show_results(&self, score: &Score, room: RoomId, item: &PlaylistItem);

    /// Leave the session without showing results.
    fn request_exit(&self);
}

/// Optional spectator-facing leaderboard.
///
/// May be absent for a round; every consumer handles the absent case
/// explicitly rather than assuming presence.
pub trait LeaderboardDisplay: Send + Sync {
    /// Hand over the fixed participant set for this match instance.
    fn track_participants(&self, participants: &[ParticipantId]);
}
