//! # Matchgate Client
//!
//! Client-side gameplay session coordination for real-time multiplayer
//! matches. Gates local gameplay start/stop on server-confirmed match state,
//! submits results, and bounds how long the client waits for the server's
//! results confirmation.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                      MATCHGATE CLIENT                        │
//! ├──────────────────────────────────────────────────────────────┤
//! │  types.rs          - Identifiers, token, playlist item, score│
//! │  authority.rs      - Match authority contract (remote proxy) │
//! │  collaborators.rs  - Engine / display / score-service seams  │
//! │                                                              │
//! │  session/          - The coordination core                   │
//! │  ├── controller.rs - Session state machine and owner task    │
//! │  ├── submit.rs     - Result submission with bounded wait     │
//! │  └── latch.rs      - One-shot results-ready latch            │
//! │                                                              │
//! │  mock.rs           - Scriptable collaborators (mock feature) │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Synchronization guarantee
//!
//! The local gameplay engine is active **iff** the session phase is
//! [`SessionPhase::Playing`]. Start is gated on the authority's match-start
//! notification; stop happens on play completion or on any abort. Result
//! submission never waits more than [`DEFAULT_RESULTS_TIMEOUT`] past its two
//! round trips, so a stalled server-side aggregation path can never wedge
//! the player.
//!
//! All session state is owned by a single controller task. Notifications
//! from the authority may arrive on any transport task; they are marshalled
//! through channels and applied on the owner task before any session state
//! is touched.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod authority;
pub mod collaborators;
#[cfg(any(test, feature = "mock"))]
pub mod mock;
pub mod session;
pub mod types;

// Re-export commonly used types
pub use authority::{AuthorityError, MatchAuthority, MatchNotification, ParticipantState};
pub use collaborators::{
    GameplayEngine, LeaderboardDisplay, RecordError, ScoreRecorder, SessionDisplay, TokenError,
    TokenProvider,
};
pub use session::controller::{SessionController, SessionDeps, SessionHandle};
pub use session::submit::{ResultSubmitter, SubmitError, SubmitOutcome};
pub use session::{AbortReason, ResultsLatch, SessionConfig, SessionOutcome, SessionPhase};
pub use types::{GameplayToken, ParticipantId, PlaylistItem, RoomId, Score};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default bound on the wait for server-confirmed results.
///
/// Chosen to exceed several retry cycles of the underlying result-query
/// mechanism. Elapsing is an accepted worst case, not an error: results are
/// shown from local score data.
pub const DEFAULT_RESULTS_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(60);
