//! Chessahoochee CLI
//!
//! Inspect and edit the tournament database from a terminal.
//!
//! Usage:
//! ```bash
//! chessahoochee --config db.yaml seed
//! chessahoochee players 3 1
//! chessahoochee option get roundCount --default 5
//! chessahoochee option set roundCount 7
//! chessahoochee tournament put 42 tourney.json
//! chessahoochee tournament show 42
//! ```

use anyhow::Context;
use chessahoochee_bindings::{Binding, DbConfig, Repositories};
use chessahoochee_core::{Id, Tournament};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "chessahoochee")]
#[command(about = "Chessahoochee - tournament database tools", long_about = None)]
struct Cli {
    /// Path to a YAML or TOML config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Apply the configured seed datasets and wait for them to finish
    Seed,
    /// Show players by id, in the given order
    Players {
        ids: Vec<i64>,
    },
    /// Read or write a numeric option
    Option {
        #[command(subcommand)]
        action: OptionAction,
    },
    /// Read or write a tournament record
    Tournament {
        #[command(subcommand)]
        action: TournamentAction,
    },
}

#[derive(Subcommand)]
enum OptionAction {
    /// Print an option, storing the default if it was never set
    Get {
        key: String,

        /// Fallback when the option is unset (otherwise taken from config)
        #[arg(long)]
        default: Option<f64>,
    },
    /// Set an option
    Set { key: String, value: f64 },
}

#[derive(Subcommand)]
enum TournamentAction {
    /// Print a tournament record as JSON
    Show { id: i64 },
    /// Store a tournament record read from a JSON file
    Put { id: i64, file: PathBuf },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DbConfig::from_file(path)?,
        None => DbConfig::default(),
    };
    config.merge_env()?;

    init_tracing(&config.logging.level)?;

    let backend = config.build_backend();
    let mut repos = Repositories::init(backend.as_ref(), &config).await?;
    repos.seeded().await?;

    match cli.command {
        Commands::Seed => {
            info!(database = %config.database, "Seed data applied");
        }
        Commands::Players { ids } => {
            let binding = repos.players(ids.into_iter().map(Id).collect());
            binding.settle().await?;
            for (id, player) in binding.ids().iter().zip(binding.players().iter()) {
                match player {
                    Some(player) => println!("{}", serde_json::to_string(player)?),
                    None => println!("{}: <missing>", id),
                }
            }
        }
        Commands::Option { action } => match action {
            OptionAction::Get { key, default } => {
                let binding = match default {
                    Some(default) => repos.option_with_default(&key, default)?,
                    None => repos.option(&key)?,
                };
                binding.settle().await?;
                println!("{} = {}", key, binding.value());
            }
            OptionAction::Set { key, value } => {
                let binding = repos.option_with_default(&key, value)?;
                binding.settle().await?;
                binding.set(value)?;
                binding.settle().await?;
                println!("{} = {}", key, binding.value());
            }
        },
        Commands::Tournament { action } => match action {
            TournamentAction::Show { id } => {
                let binding = repos.tournament(Id(id));
                binding.settle().await?;
                let tournament = binding.tournament();
                if tournament.is_placeholder() {
                    println!("Tournament {} not found", id);
                } else {
                    println!("{}", serde_json::to_string_pretty(tournament.as_value())?);
                }
            }
            TournamentAction::Put { id, file } => {
                let contents = std::fs::read_to_string(&file)
                    .with_context(|| format!("Failed to read {}", file.display()))?;
                let record: serde_json::Value = serde_json::from_str(&contents)
                    .with_context(|| format!("Invalid JSON in {}", file.display()))?;

                let binding = repos.tournament(Id(id));
                binding.settle().await?;
                binding.set(Tournament::from(record));
                binding.settle().await?;
                println!("Stored tournament {}", id);
            }
        },
    }

    // Interval-mode writes may still be pending
    repos.persist_all().await?;
    Ok(())
}

fn init_tracing(level: &str) -> anyhow::Result<()> {
    let level = match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    // RUST_LOG directives win over the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}
