//! Session-scoped running points total for the challenge being played.
//!
//! The counter is independent of persisted progress: it only feeds the UI
//! (counter animation, milestones) and is discarded when playback ends.

use crate::model::{Challenge, ChallengeId, PlaybackSample, SampleError};

/// At or beyond this playback percentage the full point total is credited.
pub const FULL_CREDIT_PERCENT: f64 = 99.0;

/// Snapshot of the challenge taken when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccrualConfig {
    pub challenge_id: ChallengeId,
    pub total_points: u32,
    pub duration_secs: u32,
}

impl AccrualConfig {
    #[must_use]
    pub fn for_challenge(challenge: &Challenge) -> Self {
        Self {
            challenge_id: challenge.id().clone(),
            total_points: challenge.points(),
            duration_secs: challenge.duration_secs(),
        }
    }
}

/// An upward change of the earned points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointsDelta {
    pub previous: u32,
    pub earned: u32,
}

#[derive(Debug, Clone, Default)]
pub struct PointsAccrualCounter {
    config: Option<AccrualConfig>,
    earned: u32,
    active: bool,
}

impl PointsAccrualCounter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a new session, replacing any session in progress.
    pub fn start(&mut self, config: AccrualConfig) {
        self.config = Some(config);
        self.earned = 0;
        self.active = true;
    }

    /// Pause counting. The last earned value stays readable.
    pub fn stop(&mut self) {
        self.active = false;
    }

    /// Continue a stopped session for the same challenge, keeping the earned
    /// value. Returns false when there is no session to continue.
    pub fn resume(&mut self) -> bool {
        if self.config.is_none() {
            return false;
        }
        self.active = true;
        true
    }

    pub fn reset(&mut self) {
        self.config = None;
        self.earned = 0;
        self.active = false;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[must_use]
    pub fn config(&self) -> Option<&AccrualConfig> {
        self.config.as_ref()
    }

    #[must_use]
    pub fn earned_points(&self) -> u32 {
        self.earned
    }

    /// Feed a playback sample.
    ///
    /// Returns the change when the earned total went up. Inactive sessions and
    /// unknown durations produce `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Returns `SampleError` for negative or non-finite readings; the
    /// counter is left untouched.
    pub fn on_sample(&mut self, sample: &PlaybackSample) -> Result<Option<PointsDelta>, SampleError> {
        if !self.active {
            return Ok(None);
        }
        let Some(config) = self.config.as_ref() else {
            return Ok(None);
        };
        let Some(raw) = sample.raw_percent()? else {
            return Ok(None);
        };

        let earned = earned_for(raw, config.total_points);
        if earned <= self.earned {
            return Ok(None);
        }

        let previous = self.earned;
        self.earned = earned;
        Ok(Some(PointsDelta { previous, earned }))
    }

    /// Playback percentage for display; zero without a session or duration.
    #[must_use]
    pub fn progress_percent(&self, sample: &PlaybackSample) -> f64 {
        if self.config.is_none() {
            return 0.0;
        }
        match sample.raw_percent() {
            Ok(Some(raw)) => raw,
            _ => 0.0,
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn earned_for(raw_percent: f64, total_points: u32) -> u32 {
    if raw_percent >= FULL_CREDIT_PERCENT {
        return total_points;
    }
    let total = f64::from(total_points);
    (raw_percent / 100.0 * total).floor().clamp(0.0, total) as u32
}
