//! Gameplay Session Controller
//!
//! Owns the session state machine and every UI-visible side effect. The
//! authority's notifications may arrive on arbitrary transport tasks; they
//! reach session state only through the channels drained by the single
//! owner task running [`SessionController::run`], so no mutation ever
//! happens inside a notification callback.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, watch};
use tracing::{debug, error, info, warn};

use crate::authority::{MatchAuthority, MatchNotification, ParticipantState};
use crate::collaborators::{
    GameplayEngine, LeaderboardDisplay, ScoreRecorder, SessionDisplay, TokenProvider,
};
use crate::session::latch::ResultsLatch;
use crate::session::submit::ResultSubmitter;
use crate::session::{AbortReason, SessionConfig, SessionOutcome, SessionPhase};
use crate::types::Score;

/// External collaborators a session is wired to.
#[derive(Clone)]
pub struct SessionDeps {
    /// Local proxy for the remote match authority.
    pub authority: Arc<dyn MatchAuthority>,
    /// Resolves the gameplay authorization token at session start.
    pub tokens: Arc<dyn TokenProvider>,
    /// Base score-recording step of the submission pipeline.
    pub recorder: Arc<dyn ScoreRecorder>,
    /// Local gameplay engine, gated on the session phase.
    pub engine: Arc<dyn GameplayEngine>,
    /// Presentation layer for overlays, results, and exit.
    pub display: Arc<dyn SessionDisplay>,
    /// Optional leaderboard; absent when the round has no spectator display.
    pub leaderboard: Option<Arc<dyn LeaderboardDisplay>>,
}

/// Work marshalled onto the controller task by the embedding client.
#[derive(Debug)]
enum SessionCommand {
    /// The local engine finished the play and produced a score.
    PlayCompleted(Score),
}

/// What the controller did with one drained notification.
enum Heard {
    /// The authority opened play.
    Started,
    /// Absorbed (latch set, duplicate, or a lagged stretch was skipped).
    Absorbed,
    /// The notification stream is gone; the authority went away.
    StreamClosed,
}

/// Handle the embedding client keeps while a session runs.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::UnboundedSender<SessionCommand>,
    phase: watch::Receiver<SessionPhase>,
}

impl SessionHandle {
    /// Report that local gameplay completed with `score`.
    ///
    /// Returns `false` if the session already terminated.
    pub fn complete_play(&self, score: Score) -> bool {
        self.commands
            .send(SessionCommand::PlayCompleted(score))
            .is_ok()
    }

    /// Current session phase.
    pub fn phase(&self) -> SessionPhase {
        *self.phase.borrow()
    }

    /// Phase-change stream for passive observers such as a spectator or
    /// progress display.
    pub fn phase_watch(&self) -> watch::Receiver<SessionPhase> {
        self.phase.clone()
    }
}

/// Drives one session from token resolution to its terminal phase.
///
/// Created per round; never reused. All session state lives here and is
/// mutated only by [`run`](SessionController::run).
pub struct SessionController {
    deps: SessionDeps,
    config: SessionConfig,
    phase: watch::Sender<SessionPhase>,
    commands: mpsc::UnboundedReceiver<SessionCommand>,
    results: ResultsLatch,
    exit_requested: bool,
}

impl SessionController {
    /// Create a controller and the handle the embedding client keeps.
    pub fn new(deps: SessionDeps, config: SessionConfig) -> (Self, SessionHandle) {
        let (phase_tx, phase_rx) = watch::channel(SessionPhase::Initializing);
        let (command_tx, command_rx) = mpsc::unbounded_channel();

        let controller = Self {
            deps,
            config,
            phase: phase_tx,
            commands: command_rx,
            results: ResultsLatch::new(),
            exit_requested: false,
        };
        let handle = SessionHandle {
            commands: command_tx,
            phase: phase_rx,
        };
        (controller, handle)
    }

    /// Run the session to its terminal state.
    ///
    /// Consumes the controller: a session is never reused across rounds.
    pub async fn run(mut self) -> SessionOutcome {
        // resolve the gameplay authorization token before anything registers;
        // on failure there are no listeners to clean up
        let token = match self.deps.tokens.resolve().await {
            Ok(token) => token,
            Err(e) => {
                warn!(error = %e, "session setup failed, no gameplay token");
                return self.abort(AbortReason::SetupFailure);
            }
        };

        // registration: connectivity is a watch (current value observable
        // immediately), round notifications a broadcast subscription; both
        // receivers drop when this task returns, which deregisters them
        // exactly once on every exit path
        let mut connectivity = self.deps.authority.connectivity();
        let mut notifications = self.deps.authority.subscribe();

        if !*connectivity.borrow_and_update() {
            return self.abort(AbortReason::ConnectivityLoss);
        }

        self.deps.display.show_waiting_indicator();
        self.advance(SessionPhase::WaitingToStart);
        if let Some(leaderboard) = &self.deps.leaderboard {
            leaderboard.track_participants(&self.config.participants);
        }

        // report Loaded; the authority opens play only once every
        // participant has
        let loaded = tokio::select! {
            res = self.deps.authority.request_state(ParticipantState::Loaded) => res,
            _ = connection_lost(&mut connectivity) => {
                return self.abort(AbortReason::ConnectivityLoss);
            }
        };
        if let Err(e) = loaded {
            warn!(error = %e, "loaded state request failed");
            return self.abort(AbortReason::RequestFailed);
        }

        // hold for the authority's start signal
        loop {
            tokio::select! {
                _ = connection_lost(&mut connectivity) => {
                    return self.abort(AbortReason::ConnectivityLoss);
                }
                note = notifications.recv() => match self.on_notification(note) {
                    Heard::Started => break,
                    Heard::Absorbed => {}
                    Heard::StreamClosed => return self.abort(AbortReason::ConnectivityLoss),
                },
            }
        }

        self.deps.display.hide_waiting_indicator();
        self.deps.engine.release(&token);
        self.advance(SessionPhase::Playing);
        info!("match started, local gameplay released");

        // play until the engine reports completion through the handle
        let score = loop {
            tokio::select! {
                _ = connection_lost(&mut connectivity) => {
                    return self.abort(AbortReason::ConnectivityLoss);
                }
                note = notifications.recv() => match self.on_notification(note) {
                    Heard::StreamClosed => return self.abort(AbortReason::ConnectivityLoss),
                    Heard::Started | Heard::Absorbed => {}
                },
                command = self.commands.recv() => match command {
                    Some(SessionCommand::PlayCompleted(score)) => break score,
                    // every handle dropped without a completed play
                    None => return self.abort(AbortReason::Abandoned),
                },
            }
        };

        self.deps.engine.halt();
        self.advance(SessionPhase::Submitting);

        let submitter = ResultSubmitter::new(
            self.deps.recorder.clone(),
            self.deps.authority.clone(),
            self.results.clone(),
            self.config.results_timeout,
        );

        // steps 1-2 of the pipeline: base recording plus the finished-play
        // handshake; a disconnect must still cut the session short while
        // these are in flight
        let delivered = {
            let deliver = submitter.deliver(&score);
            tokio::pin!(deliver);
            loop {
                tokio::select! {
                    res = &mut deliver => break res,
                    _ = connection_lost(&mut connectivity) => {
                        return self.abort(AbortReason::ConnectivityLoss);
                    }
                    note = notifications.recv() => match self.on_notification(note) {
                        Heard::StreamClosed => return self.abort(AbortReason::ConnectivityLoss),
                        Heard::Started | Heard::Absorbed => {}
                    },
                }
            }
        };
        if let Err(e) = delivered {
            warn!(error = %e, "result submission failed");
            return self.abort(AbortReason::RequestFailed);
        }

        self.advance(SessionPhase::AwaitingResults);

        // step 3: first of the results latch or the deadline wins; the
        // loser is simply dropped
        let outcome = {
            let wait = submitter.await_results();
            tokio::pin!(wait);
            loop {
                tokio::select! {
                    outcome = &mut wait => break outcome,
                    _ = connection_lost(&mut connectivity) => {
                        return self.abort(AbortReason::ConnectivityLoss);
                    }
                    note = notifications.recv() => match self.on_notification(note) {
                        Heard::StreamClosed => return self.abort(AbortReason::ConnectivityLoss),
                        Heard::Started | Heard::Absorbed => {}
                    },
                }
            }
        };

        self.advance(SessionPhase::Done);
        match self.deps.authority.room_id() {
            Some(room) => {
                info!(%room, ?outcome, "session complete, showing results");
                self.deps
                    .display
                    .show_results(&score, room, &self.config.playlist_item);
            }
            None => {
                // the authority contract requires a room id by results time
                error!("room identifier missing at results time, exiting without results");
                self.deps.display.request_exit();
            }
        }
        SessionOutcome::Completed(outcome)
    }

    /// Apply one drained notification to session state.
    fn on_notification(
        &self,
        note: Result<MatchNotification, broadcast::error::RecvError>,
    ) -> Heard {
        match note {
            Ok(MatchNotification::MatchStarted) => Heard::Started,
            Ok(MatchNotification::ResultsReady) => {
                // monotonic: setting an already-set latch is a no-op
                self.results.set();
                Heard::Absorbed
            }
            Err(broadcast::error::RecvError::Lagged(missed)) => {
                warn!(missed, "notification stream lagged");
                Heard::Absorbed
            }
            Err(broadcast::error::RecvError::Closed) => Heard::StreamClosed,
        }
    }

    /// Advance the observable phase.
    fn advance(&self, next: SessionPhase) {
        let current = *self.phase.borrow();
        debug_assert!(
            current.may_advance_to(next),
            "illegal phase transition {current:?} -> {next:?}"
        );
        self.phase.send_replace(next);
        debug!(from = ?current, to = ?next, "session phase advanced");
    }

    /// Tear the session down without results.
    ///
    /// Runs on the owner task, never inside a notification callback, and
    /// requests the exit at most once however the abort was reached.
    fn abort(&mut self, reason: AbortReason) -> SessionOutcome {
        if self.exit_requested {
            return SessionOutcome::Aborted(reason);
        }
        self.exit_requested = true;

        warn!(?reason, "session aborted");
        self.deps.display.hide_waiting_indicator();
        if self.deps.engine.is_running() {
            self.deps.engine.halt();
        }
        self.advance(SessionPhase::Aborted);
        // exit without showing results; messaging is the surrounding
        // screen's responsibility
        self.deps.display.request_exit();
        SessionOutcome::Aborted(reason)
    }
}

/// Resolves once the authority reports the transport as disconnected.
///
/// The current value is checked before suspending, so a connection that is
/// already lost resolves immediately. An authority that dropped its sender
/// counts as disconnected.
async fn connection_lost(connectivity: &mut watch::Receiver<bool>) {
    let _ = connectivity.wait_for(|connected| !connected).await;
}
