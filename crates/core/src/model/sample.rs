use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SampleError {
    #[error("position must be a finite value >= 0, got {0}")]
    InvalidPosition(f64),

    #[error("duration must be a finite value >= 0, got {0}")]
    InvalidDuration(f64),

    #[error("percent must be a finite value >= 0, got {0}")]
    InvalidPercent(f64),
}

/// A live position/duration reading from the audio player.
///
/// `duration_secs == 0` means the track is not loaded yet.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaybackSample {
    pub position_secs: f64,
    pub duration_secs: f64,
}

impl PlaybackSample {
    #[must_use]
    pub fn new(position_secs: f64, duration_secs: f64) -> Self {
        Self {
            position_secs,
            duration_secs,
        }
    }

    /// Unclamped `position / duration * 100`.
    ///
    /// Returns `Ok(None)` while the duration is still unknown (zero).
    ///
    /// # Errors
    ///
    /// Returns `SampleError` for negative or non-finite readings.
    pub fn raw_percent(&self) -> Result<Option<f64>, SampleError> {
        if !self.position_secs.is_finite() || self.position_secs < 0.0 {
            return Err(SampleError::InvalidPosition(self.position_secs));
        }
        if !self.duration_secs.is_finite() || self.duration_secs < 0.0 {
            return Err(SampleError::InvalidDuration(self.duration_secs));
        }
        if self.duration_secs == 0.0 {
            return Ok(None);
        }
        Ok(Some(self.position_secs / self.duration_secs * 100.0))
    }
}

/// Validates a caller-supplied percentage (e.g. a pause checkpoint).
///
/// # Errors
///
/// Returns `SampleError::InvalidPercent` for negative or non-finite values.
pub(crate) fn checked_percent(percent: f64) -> Result<f64, SampleError> {
    if !percent.is_finite() || percent < 0.0 {
        return Err(SampleError::InvalidPercent(percent));
    }
    Ok(percent)
}

/// Transport state reported by the audio player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Buffering,
    Stopped,
}

impl PlaybackState {
    #[must_use]
    pub fn is_playing(self) -> bool {
        matches!(self, PlaybackState::Playing)
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PlaybackState::Idle => "idle",
            PlaybackState::Playing => "playing",
            PlaybackState::Paused => "paused",
            PlaybackState::Buffering => "buffering",
            PlaybackState::Stopped => "stopped",
        };
        f.write_str(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_duration_is_unknown_not_error() {
        assert_eq!(PlaybackSample::new(12.0, 0.0).raw_percent(), Ok(None));
    }

    #[test]
    fn raw_percent_is_unclamped() {
        let pct = PlaybackSample::new(250.0, 200.0).raw_percent().unwrap();
        assert_eq!(pct, Some(125.0));
    }

    #[test]
    fn rejects_negative_and_non_finite_readings() {
        assert!(matches!(
            PlaybackSample::new(-1.0, 10.0).raw_percent(),
            Err(SampleError::InvalidPosition(_))
        ));
        assert!(matches!(
            PlaybackSample::new(f64::NAN, 10.0).raw_percent(),
            Err(SampleError::InvalidPosition(_))
        ));
        assert!(matches!(
            PlaybackSample::new(1.0, f64::INFINITY).raw_percent(),
            Err(SampleError::InvalidDuration(_))
        ));
        assert!(matches!(
            PlaybackSample::new(1.0, -5.0).raw_percent(),
            Err(SampleError::InvalidDuration(_))
        ));
    }

    #[test]
    fn checked_percent_rejects_garbage() {
        assert_eq!(checked_percent(47.0), Ok(47.0));
        assert!(checked_percent(-0.5).is_err());
        assert!(checked_percent(f64::NAN).is_err());
    }
}
