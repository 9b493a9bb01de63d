mod api;
mod cli;
mod db;
mod models;
mod services;
mod utils;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use cli::FilterArgs;

#[derive(Parser)]
#[command(name = "winmix")]
#[command(about = "Head-to-head match statistics and outcome tendencies")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the API server
    Serve {
        #[arg(short, long, default_value = "3000")]
        port: u16,
    },
    /// Initialize the database
    InitDb,
    /// Load demo fixtures into an empty database
    Seed {
        /// Clear all stored data first
        #[arg(long)]
        fresh: bool,
    },
    /// Import match records from the configured source
    Import {
        /// Override WINMIX_SOURCE_URL
        #[arg(short, long)]
        url: Option<String>,
    },
    /// Aggregate statistics for the filtered matches
    Stats {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Trends and scenario breakdowns for the filtered matches
    Analytics {
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Head-to-head statistics for up to eight HOME:AWAY pairs
    Predict {
        #[arg(short, long = "pair", required = true)]
        pairs: Vec<String>,
    },
    /// Export the filtered matches as CSV
    Export {
        #[arg(short, long)]
        out: PathBuf,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// List every known team
    Teams,
    /// Manage saved filter presets
    Filters {
        #[command(subcommand)]
        action: FilterCommands,
    },
}

#[derive(Subcommand)]
enum FilterCommands {
    /// List saved presets
    List,
    /// Save the given filters under a name
    Save {
        #[arg(short, long)]
        name: String,
        #[command(flatten)]
        filters: FilterArgs,
    },
    /// Delete one preset
    Delete {
        #[arg(short, long)]
        id: String,
    },
    /// Delete every preset
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables first so RUST_LOG can come from .env
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Serve { port }) => {
            tracing::info!("Starting WinMix API server on port {}", port);
            api::serve(port).await?;
        }
        Some(Commands::InitDb) => {
            tracing::info!("Initializing database...");
            db::init_database().await?;
        }
        Some(Commands::Seed { fresh }) => {
            cli::seed(fresh).await?;
        }
        Some(Commands::Import { url }) => {
            tracing::info!("Importing match records...");
            cli::import_data(url).await?;
        }
        Some(Commands::Stats { filters }) => {
            cli::show_stats(filters.into_filters()).await?;
        }
        Some(Commands::Analytics { filters }) => {
            cli::show_analytics(filters.into_filters()).await?;
        }
        Some(Commands::Predict { pairs }) => {
            cli::predict(&pairs).await?;
        }
        Some(Commands::Export { out, filters }) => {
            cli::export(filters.into_filters(), &out).await?;
        }
        Some(Commands::Teams) => {
            cli::list_teams().await?;
        }
        Some(Commands::Filters { action }) => match action {
            FilterCommands::List => cli::list_presets().await?,
            FilterCommands::Save { name, filters } => {
                cli::save_preset(&name, filters.into_filters()).await?
            }
            FilterCommands::Delete { id } => cli::delete_preset(&id).await?,
            FilterCommands::Clear => cli::clear_presets().await?,
        },
        None => {
            // Default to serving
            tracing::info!("Starting WinMix API server on port 3000");
            api::serve(3000).await?;
        }
    }

    Ok(())
}
