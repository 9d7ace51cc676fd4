//! Scriptable Collaborators
//!
//! In-memory stand-ins for the external collaborators, used by this crate's
//! own tests and available to embedders through the `mock` feature. Each
//! mock records what the session asked of it and lets a test script the
//! authority's side of the round.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use tokio::sync::{broadcast, watch};

use crate::authority::{AuthorityError, MatchAuthority, MatchNotification, ParticipantState};
use crate::collaborators::{
    GameplayEngine, LeaderboardDisplay, RecordError, ScoreRecorder, SessionDisplay, TokenError,
    TokenProvider,
};
use crate::session::controller::SessionDeps;
use crate::types::{GameplayToken, ParticipantId, PlaylistItem, RoomId, Score};

/// Capacity of the mock notification channel.
const NOTIFICATION_CAPACITY: usize = 16;

// =============================================================================
// MATCH AUTHORITY
// =============================================================================

/// In-memory match authority with scriptable connectivity and notifications.
pub struct MockAuthority {
    connectivity: watch::Sender<bool>,
    notifications: broadcast::Sender<MatchNotification>,
    room: Mutex<Option<RoomId>>,
    requests: Mutex<Vec<ParticipantState>>,
    request_failures: Mutex<VecDeque<AuthorityError>>,
    request_delay: Mutex<Option<Duration>>,
}

impl MockAuthority {
    /// A connected authority hosting `room`.
    pub fn new(room: RoomId) -> Arc<Self> {
        let (connectivity, _) = watch::channel(true);
        let (notifications, _) = broadcast::channel(NOTIFICATION_CAPACITY);
        Arc::new(Self {
            connectivity,
            notifications,
            room: Mutex::new(Some(room)),
            requests: Mutex::new(Vec::new()),
            request_failures: Mutex::new(VecDeque::new()),
            request_delay: Mutex::new(None),
        })
    }

    /// Flip the observable connectivity state.
    pub fn set_connected(&self, connected: bool) {
        self.connectivity.send_replace(connected);
    }

    /// Fire the match-started notification.
    pub fn start_match(&self) {
        let _ = self.notifications.send(MatchNotification::MatchStarted);
    }

    /// Fire the results-ready notification.
    pub fn publish_results(&self) {
        let _ = self.notifications.send(MatchNotification::ResultsReady);
    }

    /// Queue an error for the next state request.
    pub fn fail_next_request(&self, error: AuthorityError) {
        self.request_failures
            .lock()
            .expect("mock state poisoned")
            .push_back(error);
    }

    /// Delay every state request by `delay`.
    pub fn delay_requests(&self, delay: Duration) {
        *self.request_delay.lock().expect("mock state poisoned") = Some(delay);
    }

    /// Forget the room id, violating the authority contract on purpose.
    pub fn clear_room(&self) {
        *self.room.lock().expect("mock state poisoned") = None;
    }

    /// State requests observed so far, in order.
    pub fn requests(&self) -> Vec<ParticipantState> {
        self.requests.lock().expect("mock state poisoned").clone()
    }

    /// Live round-notification subscriptions.
    pub fn notification_subscribers(&self) -> usize {
        self.notifications.receiver_count()
    }

    /// Live connectivity observers.
    pub fn connectivity_observers(&self) -> usize {
        self.connectivity.receiver_count()
    }
}

impl MatchAuthority for MockAuthority {
    fn connectivity(&self) -> watch::Receiver<bool> {
        self.connectivity.subscribe()
    }

    fn subscribe(&self) -> broadcast::Receiver<MatchNotification> {
        self.notifications.subscribe()
    }

    fn request_state(
        &self,
        state: ParticipantState,
    ) -> BoxFuture<'static, Result<(), AuthorityError>> {
        self.requests
            .lock()
            .expect("mock state poisoned")
            .push(state);
        let failure = self
            .request_failures
            .lock()
            .expect("mock state poisoned")
            .pop_front();
        let delay = *self.request_delay.lock().expect("mock state poisoned");
        Box::pin(async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            match failure {
                Some(error) => Err(error),
                None => Ok(()),
            }
        })
    }

    fn room_id(&self) -> Option<RoomId> {
        *self.room.lock().expect("mock state poisoned")
    }
}

// =============================================================================
// SCORE SERVICE
// =============================================================================

/// Token provider that always grants, or always denies.
pub struct MockTokenProvider {
    outcome: Result<GameplayToken, TokenError>,
}

impl MockTokenProvider {
    /// Provider that grants a fixed token.
    pub fn granting() -> Arc<Self> {
        Arc::new(Self {
            outcome: Ok(GameplayToken::new("mock-token")),
        })
    }

    /// Provider that denies every resolution with `reason`.
    pub fn denying(reason: &str) -> Arc<Self> {
        Arc::new(Self {
            outcome: Err(TokenError::Denied(reason.into())),
        })
    }
}

impl TokenProvider for MockTokenProvider {
    fn resolve(&self) -> BoxFuture<'static, Result<GameplayToken, TokenError>> {
        let outcome = self.outcome.clone();
        Box::pin(async move { outcome })
    }
}

/// Score recorder that stores what it was given.
pub struct MockRecorder {
    recorded: Mutex<Vec<Score>>,
    failure: Mutex<Option<RecordError>>,
}

impl MockRecorder {
    /// A recorder that accepts everything.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            recorded: Mutex::new(Vec::new()),
            failure: Mutex::new(None),
        })
    }

    /// Fail the next recording with `error`.
    pub fn fail_with(&self, error: RecordError) {
        *self.failure.lock().expect("mock state poisoned") = Some(error);
    }

    /// Scores recorded so far.
    pub fn recorded(&self) -> Vec<Score> {
        self.recorded.lock().expect("mock state poisoned").clone()
    }
}

impl ScoreRecorder for MockRecorder {
    fn record(&self, score: &Score) -> BoxFuture<'static, Result<(), RecordError>> {
        let failure = self.failure.lock().expect("mock state poisoned").take();
        if failure.is_none() {
            self.recorded
                .lock()
                .expect("mock state poisoned")
                .push(score.clone());
        }
        Box::pin(async move {
            match failure {
                Some(error) => Err(error),
                None => Ok(()),
            }
        })
    }
}

// =============================================================================
// ENGINE AND DISPLAYS
// =============================================================================

/// Engine gate that records release and halt calls.
pub struct MockEngine {
    running: AtomicBool,
    releases: AtomicUsize,
    halts: AtomicUsize,
    token: Mutex<Option<GameplayToken>>,
}

impl MockEngine {
    /// An idle engine.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            running: AtomicBool::new(false),
            releases: AtomicUsize::new(0),
            halts: AtomicUsize::new(0),
            token: Mutex::new(None),
        })
    }

    /// How many times the engine was released.
    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    /// How many times the engine was halted.
    pub fn halts(&self) -> usize {
        self.halts.load(Ordering::SeqCst)
    }

    /// Token handed over at release time, if any.
    pub fn token(&self) -> Option<GameplayToken> {
        self.token.lock().expect("mock state poisoned").clone()
    }
}

impl GameplayEngine for MockEngine {
    fn release(&self, token: &GameplayToken) {
        *self.token.lock().expect("mock state poisoned") = Some(token.clone());
        self.running.store(true, Ordering::SeqCst);
        self.releases.fetch_add(1, Ordering::SeqCst);
    }

    fn halt(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.halts.fetch_add(1, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

/// One call the session made into the display, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayCall {
    /// The waiting indicator was shown.
    WaitingShown,
    /// The waiting indicator was hidden.
    WaitingHidden,
    /// The results screen was shown for a room.
    ResultsShown(RoomId),
    /// Session exit without results was requested.
    ExitRequested,
}

/// Display that records every call it receives.
pub struct MockDisplay {
    calls: Mutex<Vec<DisplayCall>>,
}

impl MockDisplay {
    /// A display with an empty call log.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
        })
    }

    fn push(&self, call: DisplayCall) {
        self.calls.lock().expect("mock state poisoned").push(call);
    }

    /// Every call received so far, in order.
    pub fn calls(&self) -> Vec<DisplayCall> {
        self.calls.lock().expect("mock state poisoned").clone()
    }

    /// Whether a results screen was shown.
    pub fn results_shown(&self) -> bool {
        self.calls()
            .iter()
            .any(|c| matches!(c, DisplayCall::ResultsShown(_)))
    }

    /// Whether an exit without results was requested.
    pub fn exit_requested(&self) -> bool {
        self.calls().contains(&DisplayCall::ExitRequested)
    }
}

impl SessionDisplay for MockDisplay {
    fn show_waiting_indicator(&self) {
        self.push(DisplayCall::WaitingShown);
    }

    fn hide_waiting_indicator(&self) {
        self.push(DisplayCall::WaitingHidden);
    }

    fn show_results(&self, _score: &Score, room: RoomId, _item: &PlaylistItem) {
        self.push(DisplayCall::ResultsShown(room));
    }

    fn request_exit(&self) {
        self.push(DisplayCall::ExitRequested);
    }
}

/// Leaderboard that records the participant set it was handed.
pub struct MockLeaderboard {
    tracked: Mutex<Vec<ParticipantId>>,
}

impl MockLeaderboard {
    /// An empty leaderboard.
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            tracked: Mutex::new(Vec::new()),
        })
    }

    /// Participants handed over at session start.
    pub fn tracked(&self) -> Vec<ParticipantId> {
        self.tracked.lock().expect("mock state poisoned").clone()
    }
}

impl LeaderboardDisplay for MockLeaderboard {
    fn track_participants(&self, participants: &[ParticipantId]) {
        self.tracked
            .lock()
            .expect("mock state poisoned")
            .extend_from_slice(participants);
    }
}

// =============================================================================
// HARNESS
// =============================================================================

/// A fully mocked dependency set for driving a session.
pub struct MockHarness {
    /// Scriptable authority.
    pub authority: Arc<MockAuthority>,
    /// Granting token provider; swap for a denying one to test setup failure.
    pub tokens: Arc<MockTokenProvider>,
    /// Accepting score recorder.
    pub recorder: Arc<MockRecorder>,
    /// Recording engine gate.
    pub engine: Arc<MockEngine>,
    /// Recording display.
    pub display: Arc<MockDisplay>,
    /// Recording leaderboard.
    pub leaderboard: Arc<MockLeaderboard>,
}

impl MockHarness {
    /// A connected harness hosting a fresh room.
    pub fn new() -> Self {
        Self {
            authority: MockAuthority::new(RoomId::random()),
            tokens: MockTokenProvider::granting(),
            recorder: MockRecorder::new(),
            engine: MockEngine::new(),
            display: MockDisplay::new(),
            leaderboard: MockLeaderboard::new(),
        }
    }

    /// Wire the mocks into a dependency set, leaderboard included.
    pub fn deps(&self) -> SessionDeps {
        SessionDeps {
            authority: self.authority.clone(),
            tokens: self.tokens.clone(),
            recorder: self.recorder.clone(),
            engine: self.engine.clone(),
            display: self.display.clone(),
            leaderboard: Some(self.leaderboard.clone()),
        }
    }
}

impl Default for MockHarness {
    fn default() -> Self {
        Self::new()
    }
}
