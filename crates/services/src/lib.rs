#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog_service;
pub mod error;
pub mod feedback;
pub mod player;
pub mod tracker;

pub use listen_core::Clock;

pub use app_services::AppServices;
pub use catalog_service::{CatalogService, CatalogSummary};
pub use error::{AppServicesError, CatalogServiceError, PlayerError, TrackerError, TransportError};
pub use feedback::{FeedbackEvent, FeedbackSink, LogFeedback, RecordingFeedback, Toast, ToastKind};
pub use player::{AudioTransport, PlayerSession, SampleReport, TrackSource};
pub use tracker::{CheckpointOutcome, PlaybackProgressTracker, SampleOutcome};
