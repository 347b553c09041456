use anyhow::Result;
use clap::{Parser, Subcommand};
use pmu_rs::{CombinationType, Config, Envelope, PmuClient, Stores};
use rust_decimal::Decimal;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pmu")]
#[command(about = "PMU programme and betting analytics CLI", long_about = None)]
struct Cli {
    /// Path to config file (default: ./config.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Day programme (reunions and races)
    Programme {
        /// DDMMYYYY or YYYY-MM-DD (default: today)
        #[arg(short, long)]
        date: Option<String>,
    },
    /// One reunion with its races
    Reunion {
        reunion: i64,
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Runners of a race
    Participants {
        reunion: i64,
        course: i64,
        #[arg(short, long)]
        date: Option<String>,
    },
    /// Value bets for a race
    ValueBets {
        race_id: i64,
        #[arg(short, long, default_value = "1000")]
        bankroll: Decimal,
    },
    /// Tiercé combinations for a race
    Tierce {
        race_id: i64,
        /// Combinations in exact order
        #[arg(long)]
        ordre: bool,
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },
    /// Quinté combinations for a race
    Quinte {
        race_id: i64,
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },
    /// Best bets of the day
    TopBets {
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short, long, default_value = "1000")]
        bankroll: Decimal,
        #[arg(short, long, default_value = "5")]
        limit: i64,
    },
    /// Best combinations of the day
    TopCombinations {
        #[arg(short, long)]
        date: Option<String>,
        #[arg(short = 't', long = "type", default_value = "tierce")]
        kind: String,
        #[arg(short, long, default_value = "3")]
        limit: i64,
    },
    /// Show where an inbound path is routed, without sending anything
    Route { path: String },
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    let config = match path {
        Some(path) => Config::from_file(path)?,
        None if Path::new("config.toml").exists() => Config::new()?,
        None => {
            info!("No config.toml found, using defaults");
            Config::default()
        }
    };
    Ok(config.with_env_overrides()?)
}

fn print(envelope: &Envelope) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(&envelope.to_value())?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    let command = match cli.command {
        Commands::Route { path } => {
            let table = config.routing_table();
            let route = table.route(&path)?;
            println!("{} {}", route.target.upstream, route.url());
            return Ok(());
        }
        other => other,
    };

    let client = PmuClient::new(&config, Arc::new(Stores::new()))?;

    let envelope = match command {
        Commands::Programme { date } => client.load_programme(date.as_deref()).await?,
        Commands::Reunion { reunion, date } => client.load_reunion(reunion, date.as_deref()).await?,
        Commands::Participants {
            reunion,
            course,
            date,
        } => {
            client
                .load_participants(reunion, course, date.as_deref())
                .await?
        }
        Commands::ValueBets { race_id, bankroll } => client.fetch_value_bets(race_id, bankroll).await?,
        Commands::Tierce {
            race_id,
            ordre,
            limit,
        } => client.fetch_tierce(race_id, ordre, limit).await?,
        Commands::Quinte { race_id, limit } => client.fetch_quinte(race_id, limit).await?,
        Commands::TopBets {
            date,
            bankroll,
            limit,
        } => client.fetch_top_bets(date.as_deref(), bankroll, limit).await?,
        Commands::TopCombinations { date, kind, limit } => {
            let kind: CombinationType = kind.parse()?;
            client
                .fetch_top_combinations(date.as_deref(), kind, limit)
                .await?
        }
        Commands::Route { .. } => return Ok(()),
    };

    print(&envelope)
}
