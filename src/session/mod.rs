//! Gameplay Session Lifecycle
//!
//! Shared vocabulary of the session core: the phase machine, terminal
//! outcomes, and per-session configuration. The moving parts live in
//! [`controller`] and [`submit`].

pub mod controller;
mod latch;
pub mod submit;

pub use self::latch::ResultsLatch;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use self::submit::SubmitOutcome;
use crate::types::{ParticipantId, PlaylistItem};
use crate::DEFAULT_RESULTS_TIMEOUT;

/// Phase of a gameplay session.
///
/// Progression is forward-only along
/// `Initializing → WaitingToStart → Playing → Submitting → AwaitingResults
/// → Done`, with [`Aborted`](SessionPhase::Aborted) absorbing from any
/// non-terminal phase. The local gameplay engine runs only while the phase
/// is [`Playing`](SessionPhase::Playing).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    /// Resolving the gameplay authorization token; nothing registered yet.
    Initializing,
    /// Loaded and reported as such; holding for the authority's start signal.
    WaitingToStart,
    /// Local gameplay is running.
    Playing,
    /// Play completed; score is being recorded and the finished-play
    /// handshake is in flight.
    Submitting,
    /// Bounded wait for the authority's results confirmation.
    AwaitingResults,
    /// Results shown (server-confirmed or local after the bound elapsed).
    Done,
    /// Session ended without results.
    Aborted,
}

impl SessionPhase {
    /// Whether this phase ends the session.
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionPhase::Done | SessionPhase::Aborted)
    }

    /// Whether `next` is a legal successor of this phase.
    pub fn may_advance_to(self, next: SessionPhase) -> bool {
        use SessionPhase::*;
        if next == Aborted {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (Initializing, WaitingToStart)
                | (WaitingToStart, Playing)
                | (Playing, Submitting)
                | (Submitting, AwaitingResults)
                | (AwaitingResults, Done)
        )
    }
}

/// Why a session aborted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbortReason {
    /// The gameplay authorization token could not be obtained.
    SetupFailure,
    /// The authority's connectivity observable went false, or the authority
    /// itself went away.
    ConnectivityLoss,
    /// A participant state request or the score recording step failed.
    RequestFailed,
    /// The embedding client dropped its handle without completing the play.
    Abandoned,
}

/// Terminal result of a session run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionOutcome {
    /// The round ran to the results screen.
    Completed(SubmitOutcome),
    /// The session exited without results.
    Aborted(AbortReason),
}

/// Configuration for one gameplay session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// All players expected in this match instance. Fixed at session
    /// creation; consumed by display-layer downstreams only.
    pub participants: Vec<ParticipantId>,
    /// The queued item being played, for the results screen.
    pub playlist_item: PlaylistItem,
    /// Bound on the wait for server-confirmed results.
    pub results_timeout: Duration,
}

impl SessionConfig {
    /// Configuration with the default results bound.
    pub fn new(participants: Vec<ParticipantId>, playlist_item: PlaylistItem) -> Self {
        Self {
            participants,
            playlist_item,
            results_timeout: DEFAULT_RESULTS_TIMEOUT,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const ALL_PHASES: [SessionPhase; 7] = [
        SessionPhase::Initializing,
        SessionPhase::WaitingToStart,
        SessionPhase::Playing,
        SessionPhase::Submitting,
        SessionPhase::AwaitingResults,
        SessionPhase::Done,
        SessionPhase::Aborted,
    ];

    fn rank(phase: SessionPhase) -> usize {
        ALL_PHASES.iter().position(|p| *p == phase).unwrap()
    }

    fn phase_strategy() -> impl Strategy<Value = SessionPhase> {
        proptest::sample::select(ALL_PHASES.to_vec())
    }

    #[test]
    fn test_terminal_phases() {
        assert!(SessionPhase::Done.is_terminal());
        assert!(SessionPhase::Aborted.is_terminal());
        assert!(!SessionPhase::Playing.is_terminal());
    }

    #[test]
    fn test_no_regression_from_playing() {
        assert!(!SessionPhase::Playing.may_advance_to(SessionPhase::WaitingToStart));
        assert!(!SessionPhase::Playing.may_advance_to(SessionPhase::Initializing));
    }

    #[test]
    fn test_config_defaults_to_sixty_second_results_bound() {
        let config = SessionConfig::new(
            Vec::new(),
            PlaylistItem {
                id: 1,
                title: "item".into(),
            },
        );
        assert_eq!(config.results_timeout, Duration::from_secs(60));
    }

    proptest! {
        #[test]
        fn phase_order_is_forward_only(a in phase_strategy(), b in phase_strategy()) {
            if a.may_advance_to(b) && b != SessionPhase::Aborted {
                prop_assert_eq!(rank(b), rank(a) + 1);
            }
        }

        #[test]
        fn terminal_phases_never_advance(b in phase_strategy()) {
            prop_assert!(!SessionPhase::Done.may_advance_to(b));
            prop_assert!(!SessionPhase::Aborted.may_advance_to(b));
        }

        #[test]
        fn abort_absorbs_every_live_phase(a in phase_strategy()) {
            if !a.is_terminal() {
                prop_assert!(a.may_advance_to(SessionPhase::Aborted));
            }
        }
    }
}
