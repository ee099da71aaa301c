//! Presentation-facing events (toasts, celebrations) emitted by the core.
//!
//! Sinks are fire-and-forget: nothing they do feeds back into progress state.

use std::sync::Mutex;
use std::time::Duration;

use listen_core::milestone::Milestone;
use listen_core::model::ChallengeId;
use listen_core::progress::CompletionEvent;

#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackEvent {
    ChallengeCompleted(CompletionEvent),
    MilestoneReached {
        challenge_id: ChallengeId,
        milestone: Milestone,
        earned: u32,
        total: u32,
    },
    PlaybackError {
        message: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Success,
    Error,
    Info,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    pub duration: Duration,
}

const DEFAULT_TOAST: Duration = Duration::from_millis(3000);
const COMPLETION_TOAST: Duration = Duration::from_millis(5000);

impl FeedbackEvent {
    /// The toast a UI should show for this event.
    #[must_use]
    pub fn toast(&self) -> Toast {
        match self {
            FeedbackEvent::ChallengeCompleted(event) => Toast {
                kind: ToastKind::Success,
                message: format!("Challenge completed! You earned {} points!", event.points),
                duration: COMPLETION_TOAST,
            },
            FeedbackEvent::MilestoneReached {
                milestone, earned, ..
            } => Toast {
                kind: ToastKind::Info,
                message: format!("{milestone} of the way there: {earned} points so far"),
                duration: DEFAULT_TOAST,
            },
            FeedbackEvent::PlaybackError { message } => Toast {
                kind: ToastKind::Error,
                message: format!("Playback error: {message}"),
                duration: DEFAULT_TOAST,
            },
        }
    }
}

pub trait FeedbackSink: Send + Sync {
    fn notify(&self, event: FeedbackEvent);
}

/// Writes every toast to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogFeedback;

impl FeedbackSink for LogFeedback {
    fn notify(&self, event: FeedbackEvent) {
        let toast = event.toast();
        tracing::info!(kind = ?toast.kind, "{}", toast.message);
    }
}

/// Keeps events in memory, in arrival order.
#[derive(Debug, Default)]
pub struct RecordingFeedback {
    events: Mutex<Vec<FeedbackEvent>>,
}

impl RecordingFeedback {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn events(&self) -> Vec<FeedbackEvent> {
        self.events
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn completions(&self) -> Vec<CompletionEvent> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FeedbackEvent::ChallengeCompleted(done) => Some(done),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn milestones(&self) -> Vec<Milestone> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                FeedbackEvent::MilestoneReached { milestone, .. } => Some(milestone),
                _ => None,
            })
            .collect()
    }
}

impl FeedbackSink for RecordingFeedback {
    fn notify(&self, event: FeedbackEvent) {
        if let Ok(mut guard) = self.events.lock() {
            guard.push(event);
        }
    }
}
