use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::model::ids::ChallengeId;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ChallengeError {
    #[error("challenge title cannot be empty")]
    EmptyTitle,

    #[error("challenge duration must be > 0 seconds")]
    ZeroDuration,

    #[error("unknown difficulty: {0}")]
    UnknownDifficulty(String),

    #[error("progress must be a finite value in [0, 100], got {0}")]
    InvalidProgress(f64),

    #[error("completed challenge must have 100% progress, got {0}")]
    CompletedBelowFull(f64),

    #[error("completed challenge is missing its completion timestamp")]
    MissingCompletedAt,

    #[error("incomplete challenge cannot carry a completion timestamp")]
    UnexpectedCompletedAt,
}

//
// ─── DIFFICULTY ────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Difficulty {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = ChallengeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "easy" => Ok(Self::Easy),
            "medium" => Ok(Self::Medium),
            "hard" => Ok(Self::Hard),
            other => Err(ChallengeError::UnknownDifficulty(other.to_owned())),
        }
    }
}

//
// ─── DRAFT ─────────────────────────────────────────────────────────────────────
//

/// Immutable catalog data for a challenge, before progress is attached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeDraft {
    pub id: ChallengeId,
    pub title: String,
    pub artist: String,
    pub audio_url: String,
    pub description: String,
    pub difficulty: Difficulty,
    pub duration_secs: u32,
    pub points: u32,
}

impl ChallengeDraft {
    /// Validate the draft into a fresh challenge with zero progress.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError::EmptyTitle` for a blank title and
    /// `ChallengeError::ZeroDuration` for a zero-length track.
    pub fn validate(self) -> Result<Challenge, ChallengeError> {
        let title = self.title.trim().to_owned();
        if title.is_empty() {
            return Err(ChallengeError::EmptyTitle);
        }
        if self.duration_secs == 0 {
            return Err(ChallengeError::ZeroDuration);
        }

        Ok(Challenge {
            id: self.id,
            title,
            artist: self.artist.trim().to_owned(),
            audio_url: self.audio_url.trim().to_owned(),
            description: self.description.trim().to_owned(),
            difficulty: self.difficulty,
            duration_secs: self.duration_secs,
            points: self.points,
            progress_percent: 0.0,
            completed: false,
            completed_at: None,
        })
    }
}

//
// ─── CHALLENGE ─────────────────────────────────────────────────────────────────
//

/// A listening challenge and its persisted progress.
///
/// Invariants held by every constructed value:
/// - `progress_percent` is finite and within `[0, 100]`
/// - `completed` implies `progress_percent == 100`
/// - `completed_at` is present exactly when `completed` is true
#[derive(Debug, Clone, PartialEq)]
pub struct Challenge {
    id: ChallengeId,
    title: String,
    artist: String,
    audio_url: String,
    description: String,
    difficulty: Difficulty,
    duration_secs: u32,
    points: u32,
    progress_percent: f64,
    completed: bool,
    completed_at: Option<DateTime<Utc>>,
}

impl Challenge {
    /// Rehydrate a challenge from persisted storage.
    ///
    /// # Errors
    ///
    /// Returns `ChallengeError` if the draft is invalid or the progress fields
    /// break the completion invariants.
    pub fn from_persisted(
        draft: ChallengeDraft,
        progress_percent: f64,
        completed: bool,
        completed_at: Option<DateTime<Utc>>,
    ) -> Result<Self, ChallengeError> {
        let mut challenge = draft.validate()?;

        if !progress_percent.is_finite() || !(0.0..=100.0).contains(&progress_percent) {
            return Err(ChallengeError::InvalidProgress(progress_percent));
        }
        match (completed, completed_at) {
            (true, None) => return Err(ChallengeError::MissingCompletedAt),
            (false, Some(_)) => return Err(ChallengeError::UnexpectedCompletedAt),
            _ => {}
        }
        if completed && progress_percent != 100.0 {
            return Err(ChallengeError::CompletedBelowFull(progress_percent));
        }

        challenge.progress_percent = progress_percent;
        challenge.completed = completed;
        challenge.completed_at = completed_at;
        Ok(challenge)
    }

    #[must_use]
    pub fn id(&self) -> &ChallengeId {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    #[must_use]
    pub fn artist(&self) -> &str {
        &self.artist
    }

    #[must_use]
    pub fn audio_url(&self) -> &str {
        &self.audio_url
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub fn difficulty(&self) -> Difficulty {
        self.difficulty
    }

    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.duration_secs
    }

    #[must_use]
    pub fn points(&self) -> u32 {
        self.points
    }

    #[must_use]
    pub fn progress_percent(&self) -> f64 {
        self.progress_percent
    }

    #[must_use]
    pub fn is_completed(&self) -> bool {
        self.completed
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    /// Position to seek to when playback of this challenge starts again.
    #[must_use]
    pub fn resume_position_secs(&self) -> f64 {
        self.progress_percent / 100.0 * f64::from(self.duration_secs)
    }

    /// True when a partially listened challenge should resume mid-track.
    #[must_use]
    pub fn is_resumable(&self) -> bool {
        !self.completed && self.progress_percent > 0.0 && self.progress_percent < 100.0
    }

    /// Returns a copy with all progress cleared, as if newly created.
    #[must_use]
    pub fn reset(&self) -> Self {
        Self {
            progress_percent: 0.0,
            completed: false,
            completed_at: None,
            ..self.clone()
        }
    }

    /// Returns a copy with `percent` clamped into `[0, 100]`.
    ///
    /// Completed challenges are returned unchanged.
    pub(crate) fn with_progress(&self, percent: f64) -> Self {
        if self.completed {
            return self.clone();
        }
        Self {
            progress_percent: percent.clamp(0.0, 100.0),
            ..self.clone()
        }
    }

    /// Returns a completed copy stamped with `at`.
    ///
    /// An already completed challenge keeps its original timestamp.
    pub(crate) fn completed_copy(&self, at: DateTime<Utc>) -> Self {
        if self.completed {
            return self.clone();
        }
        Self {
            progress_percent: 100.0,
            completed: true,
            completed_at: Some(at),
            ..self.clone()
        }
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
