use std::fmt;

use listen_core::model::default_catalog;
use storage::repository::Storage;

const DEFAULT_DB_URL: &str = "sqlite://listen.sqlite3";

#[derive(Debug, Clone)]
struct Args {
    db_url: String,
    reset: bool,
}

#[derive(Debug)]
enum ArgsError {
    MissingValue { flag: &'static str },
    UnknownArg(String),
    InvalidDbUrl { raw: String },
}

impl fmt::Display for ArgsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArgsError::MissingValue { flag } => write!(f, "{flag} requires a value"),
            ArgsError::UnknownArg(arg) => write!(f, "unknown argument: {arg}"),
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

impl Args {
    fn parse() -> Result<Self, ArgsError> {
        let mut db_url =
            std::env::var("LISTEN_DB_URL").unwrap_or_else(|_| DEFAULT_DB_URL.into());
        let mut reset = false;

        let mut args = std::env::args().skip(1);
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--db" => {
                    let value = require_value(&mut args, "--db")?;
                    if value.trim().is_empty() {
                        return Err(ArgsError::InvalidDbUrl { raw: value });
                    }
                    db_url = value;
                }
                "--reset" => reset = true,
                "--help" | "-h" => {
                    print_usage();
                    std::process::exit(0);
                }
                _ => return Err(ArgsError::UnknownArg(arg)),
            }
        }

        Ok(Self { db_url, reset })
    }
}

fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  cargo run -p storage --bin seed -- [options]");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --db <sqlite_url>   SQLite URL (default: {DEFAULT_DB_URL})");
    eprintln!("  --reset             Overwrite existing challenges and clear the points ledger");
    eprintln!("  -h, --help          Show this help");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  LISTEN_DB_URL");
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse().map_err(|e| {
        eprintln!("{e}");
        print_usage();
        e
    })?;

    let storage = Storage::sqlite(&args.db_url).await?;

    let mut inserted = 0_usize;
    for challenge in default_catalog() {
        let exists = storage.challenges.get_challenge(challenge.id()).await?.is_some();
        if exists && !args.reset {
            continue;
        }
        storage.challenges.upsert_challenge(&challenge).await?;
        inserted += 1;
    }
    if args.reset {
        storage.ledger.reset_progress().await?;
    }

    println!(
        "Seeded {inserted} challenge(s) into {}{}",
        args.db_url,
        if args.reset { " (ledger reset)" } else { "" }
    );

    Ok(())
}

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("{err}");
        std::process::exit(2);
    }
}
