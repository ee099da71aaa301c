use std::sync::Arc;

use async_trait::async_trait;
use listen_core::accrual::{AccrualConfig, PointsAccrualCounter, PointsDelta};
use listen_core::milestone::{Milestone, MilestoneTracker};
use listen_core::model::{Challenge, ChallengeId, PlaybackSample, PlaybackState};
use tracing::{debug, info, warn};

use crate::error::{PlayerError, TransportError};
use crate::feedback::{FeedbackEvent, FeedbackSink};
use crate::tracker::{CheckpointOutcome, PlaybackProgressTracker, SampleOutcome};

//
// ─── TRANSPORT ─────────────────────────────────────────────────────────────────
//

/// What the audio engine needs to load a challenge track.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSource {
    pub id: ChallengeId,
    pub url: String,
    pub title: String,
    pub artist: String,
    pub duration_secs: u32,
}

impl From<&Challenge> for TrackSource {
    fn from(challenge: &Challenge) -> Self {
        Self {
            id: challenge.id().clone(),
            url: challenge.audio_url().to_owned(),
            title: challenge.title().to_owned(),
            artist: challenge.artist().to_owned(),
            duration_secs: challenge.duration_secs(),
        }
    }
}

/// Commands understood by the audio engine.
///
/// Implementations report state changes and samples back through
/// `PlayerSession::on_state_change` and `PlayerSession::on_sample`.
#[async_trait]
pub trait AudioTransport: Send + Sync {
    async fn play(&self, track: &TrackSource) -> Result<(), TransportError>;
    async fn pause(&self) -> Result<(), TransportError>;
    async fn resume(&self) -> Result<(), TransportError>;
    async fn seek_to(&self, position_secs: f64) -> Result<(), TransportError>;
    async fn set_playback_rate(&self, rate: f32) -> Result<(), TransportError>;
}

//
// ─── SESSION ───────────────────────────────────────────────────────────────────
//

/// Everything one sample changed.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleReport {
    pub progress: SampleOutcome,
    pub points: Option<PointsDelta>,
    pub milestones: Vec<Milestone>,
}

/// Playback glue for the single active track: drives the progress tracker,
/// the session points counter and milestone celebrations from one stream of
/// transport events.
pub struct PlayerSession {
    tracker: PlaybackProgressTracker,
    transport: Arc<dyn AudioTransport>,
    feedback: Arc<dyn FeedbackSink>,
    counter: PointsAccrualCounter,
    milestones: MilestoneTracker,
    current: Option<Challenge>,
    state: PlaybackState,
    playback_rate: f32,
}

impl PlayerSession {
    #[must_use]
    pub fn new(
        tracker: PlaybackProgressTracker,
        transport: Arc<dyn AudioTransport>,
        feedback: Arc<dyn FeedbackSink>,
    ) -> Self {
        Self {
            tracker,
            transport,
            feedback,
            counter: PointsAccrualCounter::new(),
            milestones: MilestoneTracker::default(),
            current: None,
            state: PlaybackState::Idle,
            playback_rate: 1.0,
        }
    }

    #[must_use]
    pub fn current(&self) -> Option<&Challenge> {
        self.current.as_ref()
    }

    #[must_use]
    pub fn state(&self) -> PlaybackState {
        self.state
    }

    #[must_use]
    pub fn playback_rate(&self) -> f32 {
        self.playback_rate
    }

    #[must_use]
    pub fn counter(&self) -> &PointsAccrualCounter {
        &self.counter
    }

    #[must_use]
    pub fn earned_points(&self) -> u32 {
        self.counter.earned_points()
    }

    #[must_use]
    pub fn fired_milestones(&self) -> &[Milestone] {
        self.milestones.fired()
    }

    #[must_use]
    pub fn tracker(&self) -> &PlaybackProgressTracker {
        &self.tracker
    }

    /// Load and start `challenge_id`, resuming mid-track when it was partially
    /// listened. Returns the position playback starts from.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Tracker` for an unknown challenge and
    /// `PlayerError::Transport` if the engine cannot load the track; the
    /// latter is also reported to the feedback sink.
    pub async fn play(&mut self, challenge_id: &ChallengeId) -> Result<f64, PlayerError> {
        let challenge = self.tracker.challenge(challenge_id).await?;

        let switching = self
            .current
            .as_ref()
            .is_some_and(|current| current.id() != challenge_id);
        if switching {
            debug!(%challenge_id, "track changed; discarding points session");
            self.counter.reset();
            self.milestones.reset(0);
        }

        let track = TrackSource::from(&challenge);
        if let Err(err) = self.transport.play(&track).await {
            self.on_playback_error(&err.to_string());
            return Err(err.into());
        }

        let start_at = if challenge.is_resumable() {
            challenge.resume_position_secs()
        } else {
            0.0
        };
        if start_at > 0.0 {
            self.transport.seek_to(start_at).await?;
        }

        info!(%challenge_id, start_at, "playback started");
        self.current = Some(challenge);
        Ok(start_at)
    }

    /// React to a transport state change.
    ///
    /// Entering `Playing` starts (or continues) the points session; pausing or
    /// buffering stops counting, and `Stopped` or `Idle` discards the session.
    /// The `Playing -> Paused` edge also checkpoints progress.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Tracker` if the checkpoint write fails.
    pub async fn on_state_change(
        &mut self,
        state: PlaybackState,
    ) -> Result<Option<CheckpointOutcome>, PlayerError> {
        let previous = std::mem::replace(&mut self.state, state);
        let Some(current) = self.current.as_ref() else {
            return Ok(None);
        };

        if state.is_playing() {
            if !self.counter.is_active() {
                let config = AccrualConfig::for_challenge(current);
                if self.counter.config() == Some(&config) {
                    self.counter.resume();
                } else {
                    self.milestones.reset(config.total_points);
                    self.counter.start(config);
                }
            }
            return Ok(None);
        }

        if matches!(state, PlaybackState::Stopped | PlaybackState::Idle) {
            self.counter.reset();
            self.milestones.reset(0);
            return Ok(None);
        }

        if !previous.is_playing() {
            return Ok(None);
        }
        self.counter.stop();

        if state != PlaybackState::Paused {
            return Ok(None);
        }
        let challenge_id = current.id().clone();
        let Some(percent) = self.tracker.last_known_percent(&challenge_id) else {
            return Ok(None);
        };
        let outcome = self.tracker.on_pause(&challenge_id, percent).await?;
        Ok(Some(outcome))
    }

    /// Feed a playback sample for the current track.
    ///
    /// Returns `Ok(None)` when no track is loaded.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Tracker` if progress cannot be persisted.
    pub async fn on_sample(
        &mut self,
        sample: PlaybackSample,
    ) -> Result<Option<SampleReport>, PlayerError> {
        let Some(challenge_id) = self.current.as_ref().map(|c| c.id().clone()) else {
            return Ok(None);
        };

        let progress = self.tracker.on_sample(&challenge_id, sample).await?;
        if matches!(progress, SampleOutcome::Completed(_)) {
            self.current = Some(self.tracker.challenge(&challenge_id).await?);
        }

        let points = match self.counter.on_sample(&sample) {
            Ok(delta) => delta,
            // Same reading the tracker rejected and logged above.
            Err(_) => None,
        };
        let milestones = match points {
            Some(delta) => self.celebrate(&challenge_id, delta),
            None => Vec::new(),
        };

        Ok(Some(SampleReport {
            progress,
            points,
            milestones,
        }))
    }

    fn celebrate(&mut self, challenge_id: &ChallengeId, delta: PointsDelta) -> Vec<Milestone> {
        let crossed = self.milestones.observe(delta.previous, delta.earned);
        let total = self.counter.config().map_or(0, |c| c.total_points);
        for milestone in &crossed {
            info!(%challenge_id, %milestone, earned = delta.earned, total, "milestone reached");
            self.feedback.notify(FeedbackEvent::MilestoneReached {
                challenge_id: challenge_id.clone(),
                milestone: *milestone,
                earned: delta.earned,
                total,
            });
        }
        crossed
    }

    /// Playback percentage of `sample` for display.
    #[must_use]
    pub fn progress_percent(&self, sample: &PlaybackSample) -> f64 {
        self.counter.progress_percent(sample)
    }

    /// # Errors
    ///
    /// Returns `PlayerError::NoTrack` without a loaded track, or the
    /// transport failure.
    pub async fn pause(&self) -> Result<(), PlayerError> {
        self.require_track()?;
        self.transport.pause().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PlayerError::NoTrack` without a loaded track, or the
    /// transport failure.
    pub async fn resume(&self) -> Result<(), PlayerError> {
        self.require_track()?;
        self.transport.resume().await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PlayerError::InvalidSeek` for negative or non-finite
    /// positions and `PlayerError::NoTrack` without a loaded track.
    pub async fn seek_to(&self, position_secs: f64) -> Result<(), PlayerError> {
        if !position_secs.is_finite() || position_secs < 0.0 {
            return Err(PlayerError::InvalidSeek(position_secs));
        }
        self.require_track()?;
        self.transport.seek_to(position_secs).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `PlayerError::InvalidPlaybackRate` unless `rate` is finite
    /// and positive.
    pub async fn set_playback_rate(&mut self, rate: f32) -> Result<(), PlayerError> {
        if !rate.is_finite() || rate <= 0.0 {
            return Err(PlayerError::InvalidPlaybackRate(rate));
        }
        self.transport.set_playback_rate(rate).await?;
        self.playback_rate = rate;
        Ok(())
    }

    /// Report an engine failure to the user.
    pub fn on_playback_error(&self, message: &str) {
        warn!(
            challenge_id = ?self.current.as_ref().map(Challenge::id),
            error = message,
            "playback error"
        );
        self.feedback.notify(FeedbackEvent::PlaybackError {
            message: message.to_owned(),
        });
    }

    /// Drop the current track and its points session.
    pub fn stop(&mut self) {
        self.counter.reset();
        self.milestones.reset(0);
        self.current = None;
        self.state = PlaybackState::Stopped;
    }

    /// Clear all persisted progress and the in-memory session.
    ///
    /// # Errors
    ///
    /// Returns `PlayerError::Tracker` if storage cannot be reset.
    pub async fn reset_all(&mut self) -> Result<usize, PlayerError> {
        let count = self.tracker.reset_all().await?;
        self.counter.reset();
        self.milestones.reset(0);
        self.current = None;
        self.state = PlaybackState::Idle;
        Ok(count)
    }

    fn require_track(&self) -> Result<&Challenge, PlayerError> {
        self.current.as_ref().ok_or(PlayerError::NoTrack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feedback::RecordingFeedback;
    use listen_core::model::default_catalog;
    use listen_core::time::fixed_clock;
    use storage::repository::InMemoryRepository;

    struct SilentTransport;

    #[async_trait]
    impl AudioTransport for SilentTransport {
        async fn play(&self, _track: &TrackSource) -> Result<(), TransportError> {
            Ok(())
        }
        async fn pause(&self) -> Result<(), TransportError> {
            Ok(())
        }
        async fn resume(&self) -> Result<(), TransportError> {
            Ok(())
        }
        async fn seek_to(&self, _position_secs: f64) -> Result<(), TransportError> {
            Ok(())
        }
        async fn set_playback_rate(&self, _rate: f32) -> Result<(), TransportError> {
            Ok(())
        }
    }

    fn session() -> PlayerSession {
        let repo = InMemoryRepository::with_challenges(default_catalog());
        let feedback = Arc::new(RecordingFeedback::new());
        let tracker = PlaybackProgressTracker::new(
            fixed_clock(),
            Arc::new(repo.clone()),
            Arc::new(repo),
            feedback.clone(),
        );
        PlayerSession::new(tracker, Arc::new(SilentTransport), feedback)
    }

    #[tokio::test]
    async fn commands_need_a_loaded_track() {
        let player = session();
        assert!(matches!(player.pause().await, Err(PlayerError::NoTrack)));
        assert!(matches!(player.seek_to(3.0).await, Err(PlayerError::NoTrack)));
    }

    #[tokio::test]
    async fn seek_and_rate_are_validated() {
        let mut player = session();
        player.play(&"challenge-1".parse().unwrap()).await.unwrap();

        assert!(matches!(
            player.seek_to(-1.0).await,
            Err(PlayerError::InvalidSeek(_))
        ));
        assert!(matches!(
            player.seek_to(f64::INFINITY).await,
            Err(PlayerError::InvalidSeek(_))
        ));
        assert!(matches!(
            player.set_playback_rate(0.0).await,
            Err(PlayerError::InvalidPlaybackRate(_))
        ));
        assert!(matches!(
            player.set_playback_rate(f32::NAN).await,
            Err(PlayerError::InvalidPlaybackRate(_))
        ));

        player.set_playback_rate(1.5).await.unwrap();
        assert_eq!(player.playback_rate(), 1.5);
        player.seek_to(12.0).await.unwrap();
    }

    #[tokio::test]
    async fn samples_without_a_track_are_ignored() {
        let mut player = session();
        let report = player
            .on_sample(PlaybackSample::new(10.0, 219.0))
            .await
            .unwrap();
        assert!(report.is_none());
    }

    #[tokio::test]
    async fn unknown_challenge_cannot_be_played() {
        let mut player = session();
        let err = player.play(&"missing".parse().unwrap()).await.unwrap_err();
        assert!(matches!(err, PlayerError::Tracker(_)));
        assert!(player.current().is_none());
    }
}
