//! Shared error types for the services crate.

use thiserror::Error;

use listen_core::model::ChallengeId;
use storage::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `PlaybackProgressTracker`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("unknown challenge: {0}")]
    UnknownChallenge(ChallengeId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Failure reported by an audio transport implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransportError {
    #[error("failed to load track: {0}")]
    Load(String),
    #[error("playback command failed: {0}")]
    Command(String),
}

/// Errors emitted by `PlayerSession`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PlayerError {
    #[error("no track is loaded")]
    NoTrack,
    #[error("seek position must be a finite value >= 0, got {0}")]
    InvalidSeek(f64),
    #[error("playback rate must be a finite value > 0, got {0}")]
    InvalidPlaybackRate(f32),
    #[error(transparent)]
    Tracker(#[from] TrackerError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

/// Errors emitted by `CatalogService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogServiceError {
    #[error("unknown challenge: {0}")]
    UnknownChallenge(ChallengeId),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}
