use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use listen_core::milestone::Milestone;
use listen_core::model::{ChallengeId, PlaybackSample, PlaybackState};
use listen_core::time::{fixed_clock, fixed_now};
use services::{
    AppServices, AudioTransport, CheckpointOutcome, FeedbackEvent, PlayerSession,
    RecordingFeedback, SampleOutcome, ToastKind, TrackSource, TransportError,
};
use storage::repository::{ChallengeRepository, LedgerRepository, Storage};

#[derive(Debug, Clone, PartialEq)]
enum Command {
    Play(ChallengeId),
    Pause,
    Resume,
    Seek(f64),
    Rate(f32),
}

#[derive(Default)]
struct FakeTransport {
    commands: Mutex<Vec<Command>>,
    fail_loads: bool,
}

impl FakeTransport {
    fn failing() -> Self {
        Self {
            fail_loads: true,
            ..Self::default()
        }
    }

    fn commands(&self) -> Vec<Command> {
        self.commands.lock().unwrap().clone()
    }

    fn record(&self, command: Command) {
        self.commands.lock().unwrap().push(command);
    }
}

#[async_trait]
impl AudioTransport for FakeTransport {
    async fn play(&self, track: &TrackSource) -> Result<(), TransportError> {
        if self.fail_loads {
            return Err(TransportError::Load(format!("cannot open {}", track.url)));
        }
        self.record(Command::Play(track.id.clone()));
        Ok(())
    }

    async fn pause(&self) -> Result<(), TransportError> {
        self.record(Command::Pause);
        Ok(())
    }

    async fn resume(&self) -> Result<(), TransportError> {
        self.record(Command::Resume);
        Ok(())
    }

    async fn seek_to(&self, position_secs: f64) -> Result<(), TransportError> {
        self.record(Command::Seek(position_secs));
        Ok(())
    }

    async fn set_playback_rate(&self, rate: f32) -> Result<(), TransportError> {
        self.record(Command::Rate(rate));
        Ok(())
    }
}

struct Harness {
    storage: Storage,
    feedback: Arc<RecordingFeedback>,
    transport: Arc<FakeTransport>,
    player: PlayerSession,
}

async fn harness_with(transport: FakeTransport) -> Harness {
    let storage = Storage::in_memory();
    let feedback = Arc::new(RecordingFeedback::new());
    let transport = Arc::new(transport);
    let services = AppServices::from_storage(storage.clone(), fixed_clock(), feedback.clone())
        .await
        .unwrap();
    let player = services.player(transport.clone());
    Harness {
        storage,
        feedback,
        transport,
        player,
    }
}

async fn harness() -> Harness {
    harness_with(FakeTransport::default()).await
}

fn id(raw: &str) -> ChallengeId {
    raw.parse().unwrap()
}

async fn start(h: &mut Harness, raw: &str) -> f64 {
    let from = h.player.play(&id(raw)).await.unwrap();
    h.player.on_state_change(PlaybackState::Playing).await.unwrap();
    from
}

async fn sample(h: &mut Harness, position: f64, duration: f64) -> services::SampleReport {
    h.player
        .on_sample(PlaybackSample::new(position, duration))
        .await
        .unwrap()
        .unwrap()
}

#[tokio::test]
async fn completion_at_ninety_percent_awards_points_once() {
    let mut h = harness().await;
    start(&mut h, "challenge-1").await;

    let below = sample(&mut h, 197.0, 219.0).await;
    let SampleOutcome::Progressed { percent } = below.progress else {
        panic!("expected progress, got {:?}", below.progress);
    };
    assert!((percent - 89.954_337).abs() < 1e-5);

    let crossing = sample(&mut h, 198.0, 219.0).await;
    assert!(matches!(crossing.progress, SampleOutcome::Completed(_)));

    for pos in [205.0, 215.0, 219.0] {
        let after = sample(&mut h, pos, 219.0).await;
        assert_eq!(after.progress, SampleOutcome::Frozen);
    }

    let stored = h
        .storage
        .challenges
        .get_challenge(&id("challenge-1"))
        .await
        .unwrap()
        .unwrap();
    assert!(stored.is_completed());
    assert_eq!(stored.progress_percent(), 100.0);
    assert_eq!(stored.completed_at(), Some(fixed_now()));
    assert!(h.player.current().unwrap().is_completed());

    let completions = h.feedback.completions();
    assert_eq!(completions.len(), 1);
    assert_eq!(completions[0].points, 150);

    let ledger = h.storage.ledger.get_progress().await.unwrap();
    assert_eq!(ledger.total_points(), 150);
    assert_eq!(ledger.completed_challenges(), [id("challenge-1")]);

    let toast = FeedbackEvent::ChallengeCompleted(completions[0].clone()).toast();
    assert_eq!(toast.kind, ToastKind::Success);
    assert_eq!(toast.message, "Challenge completed! You earned 150 points!");
}

#[tokio::test]
async fn counter_credits_full_points_near_the_end() {
    let mut h = harness().await;
    start(&mut h, "challenge-1").await;

    sample(&mut h, 109.5, 219.0).await;
    assert_eq!(h.player.earned_points(), 75);

    sample(&mut h, 217.0, 219.0).await;
    assert_eq!(h.player.earned_points(), 150);
}

#[tokio::test]
async fn counter_never_goes_back_on_backward_seek() {
    let mut h = harness().await;
    start(&mut h, "challenge-2").await;

    sample(&mut h, 232.0, 464.0).await;
    assert_eq!(h.player.earned_points(), 150);

    h.player.seek_to(46.4).await.unwrap();
    let report = sample(&mut h, 46.4, 464.0).await;
    assert_eq!(report.points, None);
    assert_eq!(h.player.earned_points(), 150);

    // Persisted progress follows the latest sample while incomplete.
    let stored = h
        .storage
        .challenges
        .get_challenge(&id("challenge-2"))
        .await
        .unwrap()
        .unwrap();
    assert!((stored.progress_percent() - 10.0).abs() < 1e-9);
}

#[tokio::test]
async fn pause_checkpoints_and_next_play_resumes() {
    let mut h = harness().await;
    let from = start(&mut h, "challenge-2").await;
    assert_eq!(from, 0.0);

    sample(&mut h, 218.08, 464.0).await;
    h.player.pause().await.unwrap();
    let checkpoint = h
        .player
        .on_state_change(PlaybackState::Paused)
        .await
        .unwrap();
    assert!(matches!(checkpoint, Some(CheckpointOutcome::Saved { .. })));

    let stored = h
        .storage
        .challenges
        .get_challenge(&id("challenge-2"))
        .await
        .unwrap()
        .unwrap();
    assert!((stored.progress_percent() - 47.0).abs() < 1e-9);

    let resumed_at = h.player.play(&id("challenge-2")).await.unwrap();
    assert!((resumed_at - 218.08).abs() < 1e-6);

    let commands = h.transport.commands();
    assert_eq!(commands[0], Command::Play(id("challenge-2")));
    assert_eq!(commands[1], Command::Pause);
    assert_eq!(commands[2], Command::Play(id("challenge-2")));
    let Command::Seek(pos) = commands[3] else {
        panic!("expected a seek, got {:?}", commands[3]);
    };
    assert!((pos - 218.08).abs() < 1e-6);
}

#[tokio::test]
async fn resuming_the_same_track_keeps_the_points_session() {
    let mut h = harness().await;
    start(&mut h, "challenge-1").await;
    sample(&mut h, 109.5, 219.0).await;

    h.player
        .on_state_change(PlaybackState::Paused)
        .await
        .unwrap();
    assert!(!h.player.counter().is_active());
    assert_eq!(h.player.earned_points(), 75);

    h.player.resume().await.unwrap();
    h.player
        .on_state_change(PlaybackState::Playing)
        .await
        .unwrap();
    assert!(h.player.counter().is_active());
    assert_eq!(h.player.earned_points(), 75);
    assert_eq!(h.transport.commands().last(), Some(&Command::Resume));
}

#[tokio::test]
async fn stopping_discards_the_points_session() {
    let mut h = harness().await;
    start(&mut h, "challenge-1").await;
    sample(&mut h, 109.5, 219.0).await;
    assert_eq!(h.player.earned_points(), 75);

    h.player
        .on_state_change(PlaybackState::Stopped)
        .await
        .unwrap();
    assert!(h.player.counter().config().is_none());

    h.player
        .on_state_change(PlaybackState::Playing)
        .await
        .unwrap();
    assert_eq!(h.player.earned_points(), 0);
    assert!(h.player.fired_milestones().is_empty());

    let replay = sample(&mut h, 109.5, 219.0).await;
    assert_eq!(replay.milestones, vec![Milestone::Quarter, Milestone::Half]);
}

#[tokio::test]
async fn milestones_fire_once_each_across_jumps() {
    let mut h = harness().await;
    start(&mut h, "challenge-1").await;

    let first = sample(&mut h, 59.13, 219.0).await;
    assert_eq!(h.player.earned_points(), 40);
    assert_eq!(first.milestones, vec![Milestone::Quarter]);

    let second = sample(&mut h, 219.0, 219.0).await;
    assert_eq!(
        second.milestones,
        vec![Milestone::Half, Milestone::ThreeQuarters, Milestone::Full]
    );

    let third = sample(&mut h, 219.0, 219.0).await;
    assert!(third.milestones.is_empty());
    assert_eq!(
        h.feedback.milestones(),
        vec![
            Milestone::Quarter,
            Milestone::Half,
            Milestone::ThreeQuarters,
            Milestone::Full
        ]
    );
}

#[tokio::test]
async fn changing_track_starts_a_new_session() {
    let mut h = harness().await;
    start(&mut h, "challenge-1").await;
    sample(&mut h, 109.5, 219.0).await;
    assert_eq!(h.player.fired_milestones(), [Milestone::Quarter, Milestone::Half]);

    start(&mut h, "challenge-3").await;
    assert_eq!(h.player.earned_points(), 0);
    assert!(h.player.fired_milestones().is_empty());
    assert_eq!(
        h.player.counter().config().map(|c| c.total_points),
        Some(250)
    );
}

#[tokio::test]
async fn unknown_duration_changes_nothing() {
    let mut h = harness().await;
    start(&mut h, "challenge-2").await;
    let before = h.storage.challenges.list_challenges().await.unwrap();

    let report = sample(&mut h, 30.0, 0.0).await;
    assert_eq!(report.progress, SampleOutcome::Pending);
    assert_eq!(report.points, None);
    assert_eq!(h.player.earned_points(), 0);
    assert_eq!(h.storage.challenges.list_challenges().await.unwrap(), before);
}

#[tokio::test]
async fn invalid_samples_are_dropped() {
    let mut h = harness().await;
    start(&mut h, "challenge-2").await;
    sample(&mut h, 100.0, 464.0).await;
    let before = h.storage.challenges.list_challenges().await.unwrap();

    for (pos, dur) in [(-1.0, 464.0), (f64::NAN, 464.0), (10.0, f64::INFINITY)] {
        let report = sample(&mut h, pos, dur).await;
        assert!(matches!(report.progress, SampleOutcome::Rejected(_)));
        assert_eq!(report.points, None);
    }
    assert_eq!(h.storage.challenges.list_challenges().await.unwrap(), before);
}

#[tokio::test]
async fn reset_lets_completion_fire_again() {
    let mut h = harness().await;
    start(&mut h, "challenge-1").await;
    sample(&mut h, 219.0, 219.0).await;

    assert_eq!(h.player.reset_all().await.unwrap(), 3);
    assert!(h.player.current().is_none());
    assert_eq!(h.player.earned_points(), 0);
    let all = h.storage.challenges.list_challenges().await.unwrap();
    assert!(all.iter().all(|c| c.progress_percent() == 0.0 && !c.is_completed()));
    assert_eq!(h.storage.ledger.get_progress().await.unwrap().total_points(), 0);

    start(&mut h, "challenge-1").await;
    let again = sample(&mut h, 200.0, 219.0).await;
    assert!(matches!(again.progress, SampleOutcome::Completed(_)));
    assert_eq!(h.feedback.completions().len(), 2);
    assert_eq!(h.storage.ledger.get_progress().await.unwrap().total_points(), 150);
}

#[tokio::test]
async fn load_failure_is_reported_as_error_toast() {
    let mut h = harness_with(FakeTransport::failing()).await;
    let err = h.player.play(&id("challenge-1")).await;
    assert!(err.is_err());
    assert!(h.player.current().is_none());

    let events = h.feedback.events();
    assert_eq!(events.len(), 1);
    let toast = events[0].toast();
    assert_eq!(toast.kind, ToastKind::Error);
    assert_eq!(toast.duration.as_millis(), 3000);
}

#[tokio::test]
async fn playback_rate_is_forwarded() {
    let mut h = harness().await;
    start(&mut h, "challenge-3").await;
    h.player.set_playback_rate(1.25).await.unwrap();
    assert_eq!(h.player.playback_rate(), 1.25);
    assert_eq!(h.transport.commands().last(), Some(&Command::Rate(1.25)));
}
