use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use querylens_core::ExplorerConfig;
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(name = "querylens", author, version, about, long_about = None)]
struct Cli {
    /// Configuration file (toml, yaml or json)
    #[arg(long, global = true, env = "QUERYLENS_CONFIG")]
    config: Option<PathBuf>,

    /// URL the session was opened from; its `query` parameter seeds the query text
    #[arg(long, global = true)]
    shared_url: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    /// Also write daily-rotated JSON logs to this file
    #[arg(long, global = true)]
    log_file: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build query text from the rule tree and print it
    Build {
        /// Replace the rule tree with the JSON tree in this file first
        #[arg(long)]
        rules: Option<PathBuf>,
    },

    /// Commit query text and print the fragments a rebuild will keep
    Extract {
        /// Query text
        sql: String,
    },

    /// Resolve the dataset through the cache, fetching it if needed
    Prefetch,

    /// Print a shareable URL for the current query text
    Share {
        #[arg(long)]
        base_url: String,
    },

    /// List the fields the rule builder offers
    Fields,

    /// Inspect or maintain the dataset cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached keys
    List,
    /// Remove one cached key
    Evict { key: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = ExplorerConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    if cli.log_file.is_some() {
        config.log_file = cli.log_file;
    }

    querylens_monitoring::init(config.monitoring("querylens", cli.json_logs))
        .context("Failed to initialize logging")?;

    let explorer = commands::explorer(config, cli.shared_url.as_deref())?;

    let output = match cli.command {
        Commands::Build { rules } => commands::build(&explorer, rules.as_deref())?,
        Commands::Extract { sql } => commands::extract(&explorer, &sql)?,
        Commands::Prefetch => commands::prefetch(&explorer).await?,
        Commands::Share { base_url } => commands::share(&explorer, &base_url)?,
        Commands::Fields => commands::fields()?,
        Commands::Cache { action } => match action {
            CacheAction::List => commands::cache_list(&explorer).await?,
            CacheAction::Evict { key } => commands::cache_evict(&explorer, &key).await?,
        },
    };

    println!("{}", output);
    Ok(())
}
