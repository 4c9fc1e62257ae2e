//! Store gateway CLI.
//!
//! Seeds an in-process store from a JSON file and runs one gateway
//! operation against it, printing the result as JSON.
//!
//! ```text
//!   --data records.json ──▶ MemoryStore ──▶ CoreClient ──▶ search | nearby | list | stats
//!                                                              │
//!                                                              ▼
//!                                                         JSON on stdout
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use futures_util::TryStreamExt;
use serde::Serialize;

use store_gateway::config::{load_config, GatewayConfig};
use store_gateway::observability::{logging, metrics};
use store_gateway::store::{CollectionKind, Filter, MemoryStore, Record};
use store_gateway::CoreClient;

#[derive(Parser)]
#[command(name = "store-gateway")]
#[command(about = "Resilient search and region-routed reads over a document store", long_about = None)]
struct Cli {
    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// JSON array of records to load
    #[arg(short, long)]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ranked text search
    Search {
        query: String,
        #[arg(short, long)]
        region: Option<String>,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Prefix search over a region and its neighbours
    Nearby {
        query: String,
        #[arg(short, long)]
        region: Option<String>,
        #[arg(short, long, default_value_t = 10)]
        limit: usize,
    },
    /// Region-routed listing of a collection
    List {
        collection: String,
        #[arg(short, long)]
        region: Option<String>,
        #[arg(short, long, default_value_t = 20)]
        limit: usize,
    },
    /// Circuit, search and sharding statistics
    Stats,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };
    logging::init_logging(&config.observability);

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let store = Arc::new(MemoryStore::new());
    if let Some(path) = &cli.data {
        let records: Vec<Record> = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        tracing::info!(path = %path.display(), records = records.len(), "Store seeded");
        store.insert_all(records);
    }
    let client = CoreClient::new(store, &config);

    match cli.command {
        Commands::Search { query, region, limit } => {
            let results = client
                .search()
                .search_scored(&query, region.as_deref(), limit)
                .await;
            print_json(&results)?;
        }
        Commands::Nearby { query, region, limit } => {
            let results = client.search_nearby(&query, region.as_deref(), limit).await?;
            print_json(&results)?;
        }
        Commands::List { collection, region, limit } => {
            let kind = CollectionKind::parse(&collection)?;
            let filters: Vec<Filter> = region
                .map(|code| vec![Filter::eq(config.sharding.region_field.clone(), code)])
                .unwrap_or_default();
            let records: Vec<Record> = client
                .get_optimized(kind, limit, None, filters)
                .try_collect()
                .await?;
            print_json(&records)?;
        }
        Commands::Stats => print_json(&client.stats())?,
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> Result<(), serde_json::Error> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
