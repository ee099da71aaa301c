use std::sync::Arc;

use listen_core::model::{Challenge, ChallengeId, PlaybackSample, SampleError};
use listen_core::progress::{self, CompletionEvent, ProgressTransition};
use storage::repository::{ChallengeRepository, LedgerRepository};
use tracing::{debug, info, warn};

use crate::Clock;
use crate::error::TrackerError;
use crate::feedback::{FeedbackEvent, FeedbackSink};

/// Result of feeding one sample to the tracker.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    /// Track duration not known yet.
    Pending,
    /// Challenge already completed; nothing written.
    Frozen,
    Progressed { percent: f64 },
    Completed(CompletionEvent),
    /// Invalid reading; logged and dropped.
    Rejected(SampleError),
    /// No challenge with this id in the catalog; logged and dropped.
    UnknownChallenge,
}

/// Result of a pause checkpoint.
#[derive(Debug, Clone, PartialEq)]
pub enum CheckpointOutcome {
    Saved { percent: f64 },
    Frozen,
    Rejected(SampleError),
    UnknownChallenge,
}

#[derive(Debug, Clone, PartialEq)]
struct LastKnown {
    challenge_id: ChallengeId,
    percent: f64,
}

/// Turns live playback samples into persisted challenge progress.
///
/// Owned by the single playback loop driving the active track; every catalog
/// write is a read / derive / replace of one challenge.
pub struct PlaybackProgressTracker {
    clock: Clock,
    challenges: Arc<dyn ChallengeRepository>,
    ledger: Arc<dyn LedgerRepository>,
    feedback: Arc<dyn FeedbackSink>,
    last_known: Option<LastKnown>,
}

impl PlaybackProgressTracker {
    #[must_use]
    pub fn new(
        clock: Clock,
        challenges: Arc<dyn ChallengeRepository>,
        ledger: Arc<dyn LedgerRepository>,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Self {
        Self {
            clock,
            challenges,
            ledger,
            feedback,
            last_known: None,
        }
    }

    /// Last percentage computed from a sample for `challenge_id`, if any.
    #[must_use]
    pub fn last_known_percent(&self, challenge_id: &ChallengeId) -> Option<f64> {
        self.last_known
            .as_ref()
            .filter(|last| &last.challenge_id == challenge_id)
            .map(|last| last.percent)
    }

    /// Load a challenge from the catalog.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::UnknownChallenge` if the id is not in the catalog.
    pub async fn challenge(&self, challenge_id: &ChallengeId) -> Result<Challenge, TrackerError> {
        self.challenges
            .get_challenge(challenge_id)
            .await?
            .ok_or_else(|| TrackerError::UnknownChallenge(challenge_id.clone()))
    }

    /// Seek position to start playback of `challenge_id` from.
    ///
    /// Zero unless the challenge is partially listened and not completed.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError` if the challenge is unknown or cannot be read.
    pub async fn resume_position_secs(&self, challenge_id: &ChallengeId) -> Result<f64, TrackerError> {
        let challenge = self.challenge(challenge_id).await?;
        if challenge.is_resumable() {
            Ok(challenge.resume_position_secs())
        } else {
            Ok(0.0)
        }
    }

    /// Apply a playback sample for `challenge_id`.
    ///
    /// Completion awards the challenge points to the ledger and notifies the
    /// feedback sink exactly once per completed lifecycle.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if a catalog or ledger write fails.
    pub async fn on_sample(
        &mut self,
        challenge_id: &ChallengeId,
        sample: PlaybackSample,
    ) -> Result<SampleOutcome, TrackerError> {
        let Some(current) = self.challenges.get_challenge(challenge_id).await? else {
            warn!(%challenge_id, "sample for unknown challenge dropped");
            return Ok(SampleOutcome::UnknownChallenge);
        };

        let transition = match progress::apply_sample(&current, &sample, self.clock.now()) {
            Ok(transition) => transition,
            Err(err) => {
                warn!(
                    %challenge_id,
                    position = sample.position_secs,
                    duration = sample.duration_secs,
                    error = %err,
                    "invalid playback sample dropped"
                );
                return Ok(SampleOutcome::Rejected(err));
            }
        };

        match transition {
            ProgressTransition::Unknown => Ok(SampleOutcome::Pending),
            ProgressTransition::Frozen => Ok(SampleOutcome::Frozen),
            ProgressTransition::Progressed { challenge, percent } => {
                self.challenges.replace_challenge(&challenge).await?;
                self.last_known = Some(LastKnown {
                    challenge_id: challenge_id.clone(),
                    percent,
                });
                debug!(%challenge_id, percent, "progress updated");
                Ok(SampleOutcome::Progressed { percent })
            }
            ProgressTransition::Completed { challenge, event } => {
                self.challenges.replace_challenge(&challenge).await?;
                self.last_known = Some(LastKnown {
                    challenge_id: challenge_id.clone(),
                    percent: 100.0,
                });
                if let Err(err) = self.award(&event).await {
                    warn!(
                        %challenge_id,
                        points = event.points,
                        error = %err,
                        "challenge saved as completed but points were not awarded"
                    );
                    return Err(err);
                }
                Ok(SampleOutcome::Completed(event))
            }
        }
    }

    async fn award(&self, event: &CompletionEvent) -> Result<(), TrackerError> {
        let total = self.ledger.add_points(event.points).await?;
        let newly_recorded = self
            .ledger
            .mark_challenge_completed(&event.challenge_id)
            .await?;
        if !newly_recorded {
            debug!(challenge_id = %event.challenge_id, "ledger already listed completion");
        }
        info!(
            challenge_id = %event.challenge_id,
            points = event.points,
            total_points = total,
            "challenge completed"
        );
        self.feedback
            .notify(FeedbackEvent::ChallengeCompleted(event.clone()));
        Ok(())
    }

    /// Persist `percent` for `challenge_id` when playback pauses.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if the catalog write fails.
    pub async fn on_pause(
        &mut self,
        challenge_id: &ChallengeId,
        percent: f64,
    ) -> Result<CheckpointOutcome, TrackerError> {
        let Some(current) = self.challenges.get_challenge(challenge_id).await? else {
            warn!(%challenge_id, "checkpoint for unknown challenge dropped");
            return Ok(CheckpointOutcome::UnknownChallenge);
        };

        match progress::apply_checkpoint(&current, percent) {
            Err(err) => {
                warn!(%challenge_id, percent, error = %err, "invalid checkpoint dropped");
                Ok(CheckpointOutcome::Rejected(err))
            }
            Ok(None) => Ok(CheckpointOutcome::Frozen),
            Ok(Some(updated)) => {
                let saved = updated.progress_percent();
                self.challenges.replace_challenge(&updated).await?;
                info!(%challenge_id, percent = saved, "progress checkpointed");
                Ok(CheckpointOutcome::Saved { percent: saved })
            }
        }
    }

    /// Clear progress on every challenge and the points ledger.
    ///
    /// Returns the number of challenges reset.
    ///
    /// # Errors
    ///
    /// Returns `TrackerError::Storage` if either reset fails.
    pub async fn reset_all(&mut self) -> Result<usize, TrackerError> {
        let count = self.challenges.reset_all().await?;
        self.ledger.reset_progress().await?;
        self.last_known = None;
        info!(challenges = count, "all challenge progress reset");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::RecordingFeedback;
    use listen_core::model::default_catalog;
    use listen_core::time::{fixed_clock, fixed_now};
    use async_trait::async_trait;
    use listen_core::model::UserProgress;
    use storage::repository::{InMemoryRepository, StorageError};

    struct UnavailableLedger;

    #[async_trait]
    impl LedgerRepository for UnavailableLedger {
        async fn get_progress(&self) -> Result<UserProgress, StorageError> {
            Ok(UserProgress::new())
        }
        async fn add_points(&self, _amount: u32) -> Result<u64, StorageError> {
            Err(StorageError::Connection("ledger offline".into()))
        }
        async fn mark_challenge_completed(&self, _id: &ChallengeId) -> Result<bool, StorageError> {
            Err(StorageError::Connection("ledger offline".into()))
        }
        async fn reset_progress(&self) -> Result<(), StorageError> {
            Ok(())
        }
    }

    fn id(raw: &str) -> ChallengeId {
        ChallengeId::new(raw).unwrap()
    }

    fn setup() -> (PlaybackProgressTracker, InMemoryRepository, Arc<RecordingFeedback>) {
        let repo = InMemoryRepository::with_challenges(default_catalog());
        let feedback = Arc::new(RecordingFeedback::new());
        let tracker = PlaybackProgressTracker::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo.clone()),
            feedback.clone(),
        );
        (tracker, repo, feedback)
    }

    #[tokio::test]
    async fn completion_fires_once_at_ninety_percent() {
        let (mut tracker, repo, feedback) = setup();
        let all_night = id("challenge-1");

        let outcome = tracker
            .on_sample(&all_night, PlaybackSample::new(197.0, 219.0))
            .await
            .unwrap();
        assert!(matches!(outcome, SampleOutcome::Progressed { .. }));
        assert!(feedback.completions().is_empty());

        let outcome = tracker
            .on_sample(&all_night, PlaybackSample::new(198.0, 219.0))
            .await
            .unwrap();
        let SampleOutcome::Completed(event) = outcome else {
            panic!("expected completion, got {outcome:?}");
        };
        assert_eq!(event.points, 150);

        for pos in [200.0, 210.0, 219.0] {
            let again = tracker
                .on_sample(&all_night, PlaybackSample::new(pos, 219.0))
                .await
                .unwrap();
            assert_eq!(again, SampleOutcome::Frozen);
        }

        let stored = repo.get_challenge(&all_night).await.unwrap().unwrap();
        assert_eq!(stored.progress_percent(), 100.0);
        assert_eq!(stored.completed_at(), Some(fixed_now()));
        assert_eq!(feedback.completions().len(), 1);
        assert_eq!(repo.get_progress().await.unwrap().total_points(), 150);
    }

    #[tokio::test]
    async fn zero_duration_changes_nothing() {
        let (mut tracker, repo, _) = setup();
        let before = repo.list_challenges().await.unwrap();
        let outcome = tracker
            .on_sample(&id("challenge-2"), PlaybackSample::new(40.0, 0.0))
            .await
            .unwrap();
        assert_eq!(outcome, SampleOutcome::Pending);
        assert_eq!(repo.list_challenges().await.unwrap(), before);
        assert_eq!(tracker.last_known_percent(&id("challenge-2")), None);
    }

    #[tokio::test]
    async fn invalid_and_unknown_samples_are_dropped() {
        let (mut tracker, repo, _) = setup();
        let before = repo.list_challenges().await.unwrap();

        let rejected = tracker
            .on_sample(&id("challenge-1"), PlaybackSample::new(-4.0, 219.0))
            .await
            .unwrap();
        assert!(matches!(rejected, SampleOutcome::Rejected(_)));

        let unknown = tracker
            .on_sample(&id("nope"), PlaybackSample::new(4.0, 219.0))
            .await
            .unwrap();
        assert_eq!(unknown, SampleOutcome::UnknownChallenge);
        assert_eq!(repo.list_challenges().await.unwrap(), before);
    }

    #[tokio::test]
    async fn pause_checkpoint_persists_last_percent() {
        let (mut tracker, repo, _) = setup();
        let new_forms = id("challenge-2");
        tracker
            .on_sample(&new_forms, PlaybackSample::new(218.08, 464.0))
            .await
            .unwrap();
        let last = tracker.last_known_percent(&new_forms).unwrap();
        assert!((last - 47.0).abs() < 1e-9);

        let saved = tracker.on_pause(&new_forms, last).await.unwrap();
        assert!(matches!(saved, CheckpointOutcome::Saved { .. }));
        let stored = repo.get_challenge(&new_forms).await.unwrap().unwrap();
        assert!((stored.progress_percent() - 47.0).abs() < 1e-9);

        let bad = tracker.on_pause(&new_forms, f64::NAN).await.unwrap();
        assert!(matches!(bad, CheckpointOutcome::Rejected(_)));
    }

    #[tokio::test]
    async fn pause_on_completed_challenge_is_frozen() {
        let (mut tracker, _, _) = setup();
        let all_night = id("challenge-1");
        tracker
            .on_sample(&all_night, PlaybackSample::new(219.0, 219.0))
            .await
            .unwrap();
        let outcome = tracker.on_pause(&all_night, 30.0).await.unwrap();
        assert_eq!(outcome, CheckpointOutcome::Frozen);
    }

    #[tokio::test]
    async fn reset_allows_completion_to_fire_again() {
        let (mut tracker, repo, feedback) = setup();
        let all_night = id("challenge-1");
        tracker
            .on_sample(&all_night, PlaybackSample::new(219.0, 219.0))
            .await
            .unwrap();

        assert_eq!(tracker.reset_all().await.unwrap(), 3);
        assert_eq!(tracker.last_known_percent(&all_night), None);
        assert_eq!(repo.get_progress().await.unwrap().total_points(), 0);

        let grown = tracker
            .on_sample(&all_night, PlaybackSample::new(21.9, 219.0))
            .await
            .unwrap();
        assert!(matches!(grown, SampleOutcome::Progressed { .. }));

        let done = tracker
            .on_sample(&all_night, PlaybackSample::new(219.0, 219.0))
            .await
            .unwrap();
        assert!(matches!(done, SampleOutcome::Completed(_)));
        assert_eq!(feedback.completions().len(), 2);
        assert_eq!(repo.get_progress().await.unwrap().total_points(), 150);
    }

    #[tokio::test]
    async fn resume_position_comes_from_saved_percent() {
        let (mut tracker, _, _) = setup();
        let new_forms = id("challenge-2");
        assert_eq!(tracker.resume_position_secs(&new_forms).await.unwrap(), 0.0);

        tracker
            .on_sample(&new_forms, PlaybackSample::new(116.0, 464.0))
            .await
            .unwrap();
        let pos = tracker.resume_position_secs(&new_forms).await.unwrap();
        assert!((pos - 116.0).abs() < 1e-9);

        let err = tracker.resume_position_secs(&id("missing")).await.unwrap_err();
        assert!(matches!(err, TrackerError::UnknownChallenge(_)));
    }

    #[tokio::test]
    async fn ledger_failure_after_completion_is_surfaced() {
        let repo = InMemoryRepository::with_challenges(default_catalog());
        let feedback = Arc::new(RecordingFeedback::new());
        let mut tracker = PlaybackProgressTracker::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(UnavailableLedger),
            feedback.clone(),
        );
        let all_night = id("challenge-1");

        let err = tracker
            .on_sample(&all_night, PlaybackSample::new(219.0, 219.0))
            .await
            .unwrap_err();
        assert!(matches!(err, TrackerError::Storage(StorageError::Connection(_))));

        let stored = repo.get_challenge(&all_night).await.unwrap().unwrap();
        assert!(stored.is_completed());
        assert!(feedback.completions().is_empty());
    }
}
