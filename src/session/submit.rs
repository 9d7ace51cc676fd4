//! Result Submission Pipeline
//!
//! Wraps the base score-recording step with the finished-play handshake and
//! a bounded wait for the authority's results confirmation.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::authority::{AuthorityError, MatchAuthority, ParticipantState};
use crate::collaborators::{RecordError, ScoreRecorder};
use crate::session::latch::ResultsLatch;
use crate::types::Score;

/// How a submission concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The authority confirmed results before the deadline.
    Confirmed,
    /// The deadline elapsed first. Not an error: results are shown from
    /// local score data.
    TimedOut,
}

/// Errors from the submission steps that can fail.
///
/// The bounded results wait never produces one of these; an absent
/// confirmation is [`SubmitOutcome::TimedOut`].
#[derive(Debug, Clone, thiserror::Error)]
pub enum SubmitError {
    /// The base score-recording step failed.
    #[error("score recording failed: {0}")]
    Record(#[from] RecordError),

    /// The finished-play state request failed.
    #[error("finished-play request failed: {0}")]
    Authority(#[from] AuthorityError),
}

/// Submits a completed play's score and waits, boundedly, for results.
pub struct ResultSubmitter {
    recorder: Arc<dyn ScoreRecorder>,
    authority: Arc<dyn MatchAuthority>,
    results: ResultsLatch,
    results_timeout: Duration,
}

impl ResultSubmitter {
    /// Build a pipeline around the given collaborators.
    pub fn new(
        recorder: Arc<dyn ScoreRecorder>,
        authority: Arc<dyn MatchAuthority>,
        results: ResultsLatch,
        results_timeout: Duration,
    ) -> Self {
        Self {
            recorder,
            authority,
            results,
            results_timeout,
        }
    }

    /// Record the score, then request the finished-play transition.
    ///
    /// Either failure propagates immediately; the second step is not
    /// attempted after the first fails. Neither step is time-bounded.
    pub(crate) async fn deliver(&self, score: &Score) -> Result<(), SubmitError> {
        self.recorder.record(score).await?;
        self.authority
            .request_state(ParticipantState::FinishedPlay)
            .await?;
        Ok(())
    }

    /// First of the results latch or the deadline wins; the loser is simply
    /// dropped, not cancelled.
    pub(crate) async fn await_results(&self) -> SubmitOutcome {
        match tokio::time::timeout(self.results_timeout, self.results.wait()).await {
            Ok(()) => SubmitOutcome::Confirmed,
            Err(_elapsed) => {
                debug!(timeout = ?self.results_timeout, "results wait hit the deadline");
                SubmitOutcome::TimedOut
            }
        }
    }

    /// Submit `score`: record, handshake, then wait boundedly for results.
    ///
    /// Always returns within the configured deadline plus the latency of the
    /// two preceding round trips, whatever the latch-arrival timing.
    pub async fn submit(&self, score: &Score) -> Result<SubmitOutcome, SubmitError> {
        self.deliver(score).await?;
        Ok(self.await_results().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockAuthority, MockRecorder};
    use crate::types::{ParticipantId, RoomId};
    use tokio::time::Instant;

    fn test_score() -> Score {
        Score {
            participant: ParticipantId::random(),
            total: 734_210,
            max_combo: 158,
            accuracy: 0.93,
            passed: true,
        }
    }

    fn pipeline(
        timeout: Duration,
    ) -> (
        ResultSubmitter,
        Arc<MockAuthority>,
        Arc<MockRecorder>,
        ResultsLatch,
    ) {
        let authority = MockAuthority::new(RoomId::random());
        let recorder = MockRecorder::new();
        let latch = ResultsLatch::new();
        let submitter = ResultSubmitter::new(
            recorder.clone(),
            authority.clone(),
            latch.clone(),
            timeout,
        );
        (submitter, authority, recorder, latch)
    }

    #[tokio::test]
    async fn test_submit_confirms_when_latch_already_set() {
        let (submitter, authority, recorder, latch) = pipeline(Duration::from_secs(60));
        latch.set();

        let score = test_score();
        let outcome = submitter.submit(&score).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Confirmed);
        assert_eq!(recorder.recorded(), vec![score]);
        assert_eq!(authority.requests(), vec![ParticipantState::FinishedPlay]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_confirms_when_latch_sets_mid_wait() {
        let (submitter, _authority, _recorder, latch) = pipeline(Duration::from_secs(60));

        tokio::spawn({
            let latch = latch.clone();
            async move {
                tokio::time::sleep(Duration::from_secs(10)).await;
                latch.set();
            }
        });

        let started = Instant::now();
        let outcome = submitter.submit(&test_score()).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::Confirmed);
        assert!(started.elapsed() >= Duration::from_secs(10));
        assert!(started.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_submit_times_out_without_confirmation() {
        let (submitter, _authority, _recorder, _latch) = pipeline(Duration::from_secs(60));

        let started = Instant::now();
        let outcome = submitter.submit(&test_score()).await.unwrap();

        assert_eq!(outcome, SubmitOutcome::TimedOut);
        assert!(started.elapsed() >= Duration::from_secs(60));
        assert!(started.elapsed() < Duration::from_secs(61));
    }

    #[tokio::test]
    async fn test_record_failure_stops_the_pipeline() {
        let (submitter, authority, recorder, _latch) = pipeline(Duration::from_secs(60));
        recorder.fail_with(RecordError::Transport("connection reset".into()));

        let result = submitter.submit(&test_score()).await;

        assert!(matches!(result, Err(SubmitError::Record(_))));
        // the handshake is never attempted after a recording failure
        assert!(authority.requests().is_empty());
    }

    #[tokio::test]
    async fn test_finished_play_failure_propagates() {
        let (submitter, authority, recorder, _latch) = pipeline(Duration::from_secs(60));
        authority.fail_next_request(AuthorityError::Rejected("round already closed".into()));

        let result = submitter.submit(&test_score()).await;

        assert!(matches!(result, Err(SubmitError::Authority(_))));
        assert_eq!(recorder.recorded().len(), 1);
        assert_eq!(authority.requests(), vec![ParticipantState::FinishedPlay]);
    }
}
