//! # nutribase
//!
//! Command line front end over the food store.
//!
//! ## Usage
//! ```bash
//! # Load sample foods into an empty database
//! cargo run -p nutribase-db --bin nutribase -- seed
//!
//! # Import one document or an array of documents
//! cargo run -p nutribase-db --bin nutribase -- import foods.json
//!
//! # Print every food as nested JSON
//! cargo run -p nutribase-db --bin nutribase -- list --strategy fan_out
//!
//! # One food, then remove it
//! cargo run -p nutribase-db --bin nutribase -- show 1
//! cargo run -p nutribase-db --bin nutribase -- delete 1
//! ```
//!
//! Configuration comes from `NUTRIBASE_*` environment variables; `--db`
//! overrides the database path. `RUST_LOG` controls log output.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::info;
use tracing_subscriber::EnvFilter;

use nutribase_core::{FoodDocument, FoodId};
use nutribase_db::{AggregationStrategy, AppConfig, Database};

const SEED_FOODS: &str = include_str!("../../seed/foods.json");

#[derive(Parser, Debug)]
#[command(name = "nutribase", version, about = "Store and read nested food documents")]
struct Cli {
    /// SQLite database file (overrides NUTRIBASE_DATABASE)
    #[arg(long, global = true, value_name = "PATH")]
    db: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Import a JSON file holding one food document or an array of them
    Import {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print every stored food as nested JSON
    List {
        /// Read strategy: joined or fan_out (default from configuration)
        #[arg(long)]
        strategy: Option<AggregationStrategy>,
    },

    /// Print one food
    Show { id: FoodId },

    /// Delete a food and everything attached to it
    Delete { id: FoodId },

    /// Load the bundled sample foods into an empty database
    Seed,

    /// Report row counts and migration state
    Status,
}

/// One document or a batch, as found in an import file.
#[derive(Deserialize)]
#[serde(untagged)]
enum ImportPayload {
    Many(Vec<FoodDocument>),
    One(Box<FoodDocument>),
}

impl ImportPayload {
    fn into_documents(self) -> Vec<FoodDocument> {
        match self {
            ImportPayload::Many(docs) => docs,
            ImportPayload::One(doc) => vec![*doc],
        }
    }
}

fn init_tracing(debug: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if debug { "debug" } else { "info" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(debug)
        .compact()
        .try_init()
        .map_err(|err| anyhow!(err))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug)?;

    let mut config = AppConfig::load()?;
    if let Some(path) = cli.db {
        config.database_path = path;
    }

    let db = Database::new(config.db_config())
        .await
        .with_context(|| format!("opening {}", config.database_path.display()))?;

    let result = run(&db, cli.command).await;
    db.close().await;
    result
}

async fn run(db: &Database, command: Commands) -> Result<()> {
    match command {
        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let payload: ImportPayload = serde_json::from_str(&raw)
                .with_context(|| format!("parsing {}", file.display()))?;

            let outcome = db.foods().insert_batch(&payload.into_documents()).await?;
            print_json(&outcome)?;
        }

        Commands::List { strategy } => {
            let aggregator = match strategy {
                Some(strategy) => db.aggregator_with(strategy),
                None => db.aggregator(),
            };
            print_json(&aggregator.aggregate_all().await?)?;
        }

        Commands::Show { id } => match db.aggregator().get(id).await? {
            Some(food) => print_json(&food)?,
            None => bail!("food {} not found", id),
        },

        Commands::Delete { id } => {
            let outcome = db.foods().delete(id).await?;
            if !outcome.food_deleted {
                info!(food_id = id, "Nothing to delete");
            }
            print_json(&outcome)?;
        }

        Commands::Seed => {
            let existing = db.foods().count().await?;
            if existing > 0 {
                info!(existing, "Database already has foods, skipping seed");
                return Ok(());
            }

            let docs: Vec<FoodDocument> = serde_json::from_str(SEED_FOODS)?;
            let outcome = db.foods().insert_batch(&docs).await?;
            info!(count = outcome.food_ids.len(), "Seeded sample foods");
        }

        Commands::Status => {
            let (total, applied) = db.migration_status().await?;
            println!("healthy:     {}", db.health_check().await);
            println!("migrations:  {applied}/{total}");
            println!("foods:       {}", db.foods().count().await?);
            println!("nutrients:   {}", db.nutrients().count().await?);
            println!("aggregation: {}", db.aggregation());
        }
    }

    Ok(())
}
