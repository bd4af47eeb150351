//! ancestry CLI tool
//!
//! Command-line driver for moving a SQLite database's resource genealogy between the
//! relationship-row representation and the flattened per-resource representation.
//!
//! ## Commands
//!
//! - `init`: Create the database file and its tables
//! - `up`: Flatten governed relationship rows onto `resources.ancestry`
//! - `down`: Rebuild relationship rows from `resources.ancestry`
//! - `status`: Report which representation currently holds the hierarchy
//!
//! Every `up`/`down` runs inside one transaction. With `--dry-run` the transaction is rolled
//! back after the report is printed, so the database is left exactly as it was.

use ancestry_transcoder::{
    db::{db_init, DbSession},
    transcode::{Direction, Transcoder},
    TranscodeConfig,
};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ancestry")]
#[command(author, version, about = "Transcode resource genealogy between edge rows and flattened ancestry", long_about = None)]
struct Cli {
    /// SQLite database file (created by `init` if missing)
    #[arg(long)]
    db: PathBuf,

    /// Configuration file path (TOML). Defaults apply when omitted or missing.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print reports and status as JSON
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the database and its tables
    Init,

    /// Relationship rows to flattened resource ancestry
    Up {
        /// Compute and report, then roll back
        #[arg(long)]
        dry_run: bool,
    },

    /// Flattened resource ancestry to relationship rows
    Down {
        /// Compute and report, then roll back
        #[arg(long)]
        dry_run: bool,
    },

    /// Show which representation holds the governed hierarchy
    Status,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = TranscodeConfig::load(cli.config.as_deref())?;
    let transcoder = Transcoder::new(config)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async {
        let pool = db_init(&cli.db).await?;
        match cli.command {
            Commands::Init => {
                println!("✓ Database ready: {}", cli.db.display());
            }
            Commands::Up { dry_run } => {
                run(&transcoder, &pool, Direction::Up, dry_run, cli.json).await?;
            }
            Commands::Down { dry_run } => {
                run(&transcoder, &pool, Direction::Down, dry_run, cli.json).await?;
            }
            Commands::Status => {
                let session = DbSession::begin(&pool).await?;
                let status = transcoder
                    .status(&session.resources(), &session.edges())
                    .await?;
                session.rollback().await?;
                if cli.json {
                    println!("{}", serde_json::to_string_pretty(&status)?);
                } else {
                    println!("{status}");
                }
            }
        }
        pool.close().await;
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;

    Ok(())
}

async fn run(
    transcoder: &Transcoder,
    pool: &sqlx::Pool<sqlx::Sqlite>,
    direction: Direction,
    dry_run: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let session = DbSession::begin(pool).await?;
    let mut resources = session.resources();
    let mut edges = session.edges();

    let report = match transcoder.run(direction, &mut resources, &mut edges).await {
        Ok(report) => report,
        Err(e) => {
            session.rollback().await?;
            eprintln!("Error: {direction} aborted, database unchanged");
            return Err(e.into());
        }
    };

    if dry_run {
        session.rollback().await?;
    } else {
        session.commit().await?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{report}");
    }
    if dry_run {
        println!("(dry run: rolled back)");
    }
    Ok(())
}
