use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use listen_core::model::{ChallengeId, PlaybackSample, PlaybackState};
use services::{
    AppServices, AudioTransport, Clock, LogFeedback, SampleOutcome, TrackSource, TransportError,
};
use tracing::debug;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    MissingChallenge,
    UnknownArg(String),
    InvalidChallengeId { raw: String },
    InvalidSeconds { flag: &'static str, raw: String },
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::MissingChallenge => write!(f, "simulate requires a challenge id"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
            ArgsError::InvalidChallengeId { raw } => write!(f, "invalid challenge id: {raw:?}"),
            ArgsError::InvalidSeconds { flag, raw } => {
                write!(f, "invalid {flag} value: {raw} (expected seconds > 0)")
            }
            ArgsError::InvalidDbUrl { raw } => write!(f, "invalid --db value: {raw}"),
        }
    }
}

impl std::error::Error for ArgsError {}

fn require_value(
    args: &mut impl Iterator<Item = String>,
    flag: &'static str,
) -> Result<String, ArgsError> {
    args.next().ok_or(ArgsError::MissingValue { flag })
}

fn parse_seconds(raw: String, flag: &'static str, allow_zero: bool) -> Result<f64, ArgsError> {
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() && (v > 0.0 || (allow_zero && v == 0.0)) => Ok(v),
        _ => Err(ArgsError::InvalidSeconds { flag, raw }),
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p app -- list     [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- simulate <challenge-id> [--step-secs <n>] [--from-secs <n>] [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- reset    [--db <sqlite_url>]");
    eprintln!("  cargo run -p app -- seed     [--db <sqlite_url>]");
    eprintln!();
    eprintln!("Defaults:");
    eprintln!("  --db sqlite://listen.sqlite3");
    eprintln!("  --step-secs 10");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LISTEN_DB_URL, RUST_LOG");
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    List,
    Simulate,
    Reset,
    Seed,
}

impl Command {
    fn from_arg(arg: &str) -> Option<Self> {
        match arg {
            "list" => Some(Self::List),
            "simulate" => Some(Self::Simulate),
            "reset" => Some(Self::Reset),
            "seed" => Some(Self::Seed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Simulation {
    challenge_id: ChallengeId,
    step_secs: f64,
    from_secs: Option<f64>,
}

struct Args {
    db_url: String,
    simulation: Option<Simulation>,
}

impl Args {
    fn parse(
        cmd: Command,
        args: &mut impl Iterator<Item = String>,
    ) -> Result<Self, ArgsError> {
        let mut db_url = std::env::var("LISTEN_DB_URL")
            .ok()
            .map_or_else(|| "sqlite://listen.sqlite3".into(), normalize_sqlite_url);
        let mut challenge_id = None;
        let mut step_secs = 10.0;
        let mut from_secs = None;

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = normalize_sqlite_url(value);
                }
                "--step-secs" if cmd == Command::Simulate => {
                    step_secs = parse_seconds(require_value(args, "--step-secs")?, "--step-secs", false)?;
                }
                "--from-secs" if cmd == Command::Simulate => {
                    from_secs = Some(parse_seconds(
                        require_value(args, "--from-secs")?,
                        "--from-secs",
                        true,
                    )?);
                }
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                other if cmd == Command::Simulate && challenge_id.is_none() && !other.starts_with("--") => {
                    let id = other
                        .parse::<ChallengeId>()
                        .map_err(|_| ArgsError::InvalidChallengeId { raw: arg.clone() })?;
                    challenge_id = Some(id);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        let simulation = match cmd {
            Command::Simulate => Some(Simulation {
                challenge_id: challenge_id.ok_or(ArgsError::MissingChallenge)?,
                step_secs,
                from_secs,
            }),
            _ => None,
        };

        Ok(Self { db_url, simulation })
    }
}

fn normalize_sqlite_url(raw: String) -> String {
    if raw == "sqlite::memory:" || raw.starts_with("sqlite://") {
        return raw;
    }

    let trimmed = raw.trim().to_string();
    let path_str = trimmed
        .strip_prefix("sqlite:")
        .unwrap_or(trimmed.as_str())
        .to_string();
    let path = std::path::Path::new(&path_str);
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .unwrap_or_else(|_| std::path::PathBuf::from("."))
            .join(path)
    };
    format!("sqlite://{}", absolute.display())
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }

    Ok(())
}

/// Stand-in audio engine: accepts every command and only logs it.
struct SimulatedTransport;

#[async_trait]
impl AudioTransport for SimulatedTransport {
    async fn play(&self, track: &TrackSource) -> Result<(), TransportError> {
        debug!(challenge_id = %track.id, url = %track.url, "load track");
        Ok(())
    }

    async fn pause(&self) -> Result<(), TransportError> {
        debug!("pause");
        Ok(())
    }

    async fn resume(&self) -> Result<(), TransportError> {
        debug!("resume");
        Ok(())
    }

    async fn seek_to(&self, position_secs: f64) -> Result<(), TransportError> {
        debug!(position_secs, "seek");
        Ok(())
    }

    async fn set_playback_rate(&self, rate: f32) -> Result<(), TransportError> {
        debug!(rate, "set playback rate");
        Ok(())
    }
}

async fn list(services: &AppServices) -> Result<(), Box<dyn std::error::Error>> {
    let catalog = services.catalog();
    for challenge in catalog.list().await? {
        println!(
            "{:<12} {:<18} {:<16} {:>6} pts  {:>6.2}%{}",
            challenge.id().as_str(),
            challenge.title(),
            challenge.artist(),
            challenge.points(),
            challenge.progress_percent(),
            if challenge.is_completed() { "  done" } else { "" }
        );
    }
    let summary = catalog.summary().await?;
    println!(
        "{}/{} completed, {} of {} points earned (ledger total {})",
        summary.completed,
        summary.total,
        summary.earned_points,
        summary.available_points,
        summary.ledger_points
    );
    Ok(())
}

async fn simulate(
    services: &AppServices,
    sim: &Simulation,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut player = services.player(Arc::new(SimulatedTransport));
    let mut position = player.play(&sim.challenge_id).await?;
    if let Some(from) = sim.from_secs {
        player.seek_to(from).await?;
        position = from;
    }
    player.on_state_change(PlaybackState::Playing).await?;

    let duration = player
        .current()
        .map_or(0.0, |challenge| f64::from(challenge.duration_secs()));
    loop {
        let sample = PlaybackSample::new(position.min(duration), duration);
        if let Some(report) = player.on_sample(sample).await? {
            let percent = player.progress_percent(&sample);
            println!(
                "{:>7.1}s  {:>6.2}%  {:>5} pts",
                sample.position_secs,
                percent,
                player.earned_points()
            );
            for milestone in &report.milestones {
                println!("          milestone {milestone}");
            }
            if let SampleOutcome::Completed(event) = &report.progress {
                println!("          completed {} (+{} pts)", event.title, event.points);
            }
        }
        if position >= duration {
            break;
        }
        position += sim.step_secs;
    }

    player.on_state_change(PlaybackState::Stopped).await?;
    player.stop();
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let mut argv: Vec<String> = std::env::args().skip(1).collect();

    let cmd = match argv.first().map(String::as_str) {
        None => Command::List,
        Some("--help" | "-h") => {
            print_usage();
            return Ok(());
        }
        Some(first) if first.starts_with("--") => Command::List,
        Some(first) => Command::from_arg(first).ok_or_else(|| {
            eprintln!("unknown subcommand: {first}");
            print_usage();
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "unknown subcommand")
        })?,
    };

    if !argv.is_empty() && !argv[0].starts_with("--") {
        argv.remove(0);
    }

    let mut iter = argv.into_iter();
    let parsed = Args::parse(cmd, &mut iter).map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    prepare_sqlite_file(&parsed.db_url)?;
    let services =
        AppServices::new_sqlite(&parsed.db_url, Clock::system(), Arc::new(LogFeedback)).await?;

    match cmd {
        Command::List => list(&services).await,
        Command::Simulate => match parsed.simulation.as_ref() {
            Some(sim) => simulate(&services, sim).await,
            None => Err(ArgsError::MissingChallenge.into()),
        },
        Command::Reset => {
            let count = services.tracker().reset_all().await?;
            println!("Reset progress on {count} challenge(s) in {}", parsed.db_url);
            Ok(())
        }
        Command::Seed => {
            if services.seeded_on_launch() {
                println!("Seeded default challenges into {}", parsed.db_url);
            } else {
                println!("Catalog already present in {}", parsed.db_url);
            }
            Ok(())
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
