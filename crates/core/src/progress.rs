//! Per-challenge progress transitions driven by playback samples.
//!
//! Every function here is pure: it reads the current `Challenge` and returns
//! the replacement value (if any) for the caller to write back.

use chrono::{DateTime, Utc};

use crate::model::{Challenge, ChallengeId, PlaybackSample, SampleError, checked_percent};

/// Listening this far into a track counts as finishing it.
pub const COMPLETION_THRESHOLD_PERCENT: f64 = 90.0;

/// Emitted once, on the false -> true edge of `completed`.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionEvent {
    pub challenge_id: ChallengeId,
    pub title: String,
    pub points: u32,
    pub completed_at: DateTime<Utc>,
}

/// What a sample does to a challenge.
#[derive(Debug, Clone, PartialEq)]
pub enum ProgressTransition {
    /// Duration not known yet; nothing to write.
    Unknown,
    /// Challenge is already completed; nothing to write.
    Frozen,
    /// New clamped progress to persist.
    Progressed { challenge: Challenge, percent: f64 },
    /// The sample crossed the completion threshold.
    Completed {
        challenge: Challenge,
        event: CompletionEvent,
    },
}

impl ProgressTransition {
    /// The replacement challenge value, if this transition writes one.
    #[must_use]
    pub fn updated(&self) -> Option<&Challenge> {
        match self {
            ProgressTransition::Progressed { challenge, .. }
            | ProgressTransition::Completed { challenge, .. } => Some(challenge),
            ProgressTransition::Unknown | ProgressTransition::Frozen => None,
        }
    }
}

/// Apply one playback sample to `challenge`.
///
/// # Errors
///
/// Returns `SampleError` if the sample holds negative or non-finite values.
pub fn apply_sample(
    challenge: &Challenge,
    sample: &PlaybackSample,
    now: DateTime<Utc>,
) -> Result<ProgressTransition, SampleError> {
    let Some(raw) = sample.raw_percent()? else {
        return Ok(ProgressTransition::Unknown);
    };
    if challenge.is_completed() {
        return Ok(ProgressTransition::Frozen);
    }

    let percent = raw.clamp(0.0, 100.0);
    if percent >= COMPLETION_THRESHOLD_PERCENT {
        let completed = challenge.completed_copy(now);
        let event = CompletionEvent {
            challenge_id: completed.id().clone(),
            title: completed.title().to_owned(),
            points: completed.points(),
            completed_at: now,
        };
        return Ok(ProgressTransition::Completed {
            challenge: completed,
            event,
        });
    }

    Ok(ProgressTransition::Progressed {
        challenge: challenge.with_progress(percent),
        percent,
    })
}

/// Checkpoint an explicit percentage, e.g. when playback pauses.
///
/// Returns `Ok(None)` for completed challenges, which stay frozen at 100%.
///
/// # Errors
///
/// Returns `SampleError::InvalidPercent` for negative or non-finite input.
pub fn apply_checkpoint(challenge: &Challenge, percent: f64) -> Result<Option<Challenge>, SampleError> {
    let percent = checked_percent(percent)?;
    if challenge.is_completed() {
        return Ok(None);
    }
    Ok(Some(challenge.with_progress(percent)))
}
