//! Clinical store administration CLI.
//!
//! # Usage
//!
//! ```bash
//! # Create the schema in ./clinical.db
//! clinical-store init
//!
//! # Live record counts per resource type
//! CLINICAL_STORE_DATABASE=/var/lib/clinical.db clinical-store stats
//!
//! # Search and print the searchset bundle
//! clinical-store search Observation patient=p1 status=final --count 10 --offset 20
//! ```

use anyhow::Context;
use clap::{Parser, Subcommand};
use clinical_persistence::core::{ResourceStorage, SearchProvider};
use clinical_persistence::types::{COUNT_PARAM, OFFSET_PARAM, ResourceType, SearchBundle, SearchQuery};
use clinical_persistence::{StoreConfig, backends::sqlite::SqliteBackend};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

#[derive(Debug, Parser)]
#[command(name = "clinical-store", version)]
#[command(about = "Clinical resource store administration")]
struct Cli {
    #[command(flatten)]
    config: StoreConfig,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create or upgrade the database schema.
    Init,

    /// Print live record counts per resource type.
    Stats,

    /// Run a search and print the searchset bundle as JSON.
    Search {
        /// Resource type (Patient, Observation, DiagnosticReport, ServiceRequest or Order).
        resource_type: ResourceType,

        /// Filters as name=value pairs.
        filters: Vec<String>,

        /// Page size.
        #[arg(long)]
        count: Option<String>,

        /// Zero-based offset of the first entry.
        #[arg(long)]
        offset: Option<String>,
    },
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},clinical_persistence=debug")));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn parse_filter(raw: &str) -> anyhow::Result<(String, String)> {
    let (name, value) = raw
        .split_once('=')
        .with_context(|| format!("filter '{raw}' must be written name=value"))?;
    Ok((name.to_string(), value.to_string()))
}

async fn stats(backend: &SqliteBackend) -> anyhow::Result<()> {
    for resource_type in ResourceType::ALL {
        let count = backend.count(resource_type).await?;
        println!("{:<18} {}", resource_type, count);
    }
    Ok(())
}

async fn search(
    backend: &SqliteBackend,
    base_url: &str,
    resource_type: ResourceType,
    filters: &[String],
    count: Option<String>,
    offset: Option<String>,
) -> anyhow::Result<()> {
    let mut pairs = filters
        .iter()
        .map(String::as_str)
        .map(parse_filter)
        .collect::<anyhow::Result<Vec<_>>>()?;
    if let Some(count) = count {
        pairs.push((COUNT_PARAM.to_string(), count));
    }
    if let Some(offset) = offset {
        pairs.push((OFFSET_PARAM.to_string(), offset));
    }

    let query = SearchQuery::from_query_pairs(resource_type, pairs)?;
    let result = backend.search(&query).await?;
    let bundle = SearchBundle::assemble(&result, &query, base_url);
    println!("{}", serde_json::to_string_pretty(&bundle.to_json()?)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.config.log_level);

    if let Err(errors) = cli.config.validate() {
        for error in &errors {
            eprintln!("Configuration error: {}", error);
        }
        std::process::exit(1);
    }

    info!(database = %cli.config.database, "Opening clinical store");
    let backend = cli
        .config
        .open_backend()
        .with_context(|| format!("failed to open '{}'", cli.config.database))?;

    match cli.command {
        Command::Init => {
            println!("Schema version {}", backend.schema_version()?);
        }
        Command::Stats => stats(&backend).await?,
        Command::Search {
            resource_type,
            filters,
            count,
            offset,
        } => {
            search(
                &backend,
                &cli.config.base_url,
                resource_type,
                &filters,
                count,
                offset,
            )
            .await?
        }
    }

    Ok(())
}
