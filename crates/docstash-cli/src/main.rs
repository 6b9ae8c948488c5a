//! docstash CLI
//!
//! Command-line interface for inspecting an in-memory docstash store.
//! Each run starts from an empty store, optionally seeded from a JSON file.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use docstash_core::{Store, StoreConfig};

mod commands;
mod output;
mod seed;

use commands::query::QueryArgs;
use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "docstash")]
#[command(about = "docstash - in-memory document store inspector")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Log store activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Seed file to load before running the command
    #[arg(long, global = true)]
    seed: Option<PathBuf>,

    /// Config file (defaults to ~/.config/docstash/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show a single document
    Get {
        /// Collection path (e.g. users or users/u1/cvs)
        collection: String,
        /// Document ID
        id: String,
    },
    /// Query a collection
    #[command(alias = "q")]
    Query {
        /// Collection path (e.g. users or users/u1/cvs)
        collection: String,
        /// Filter as "field op value" (repeatable, all must match)
        #[arg(short = 'w', long = "where")]
        filter: Vec<String>,
        /// Field to sort by, optionally suffixed with :asc or :desc
        #[arg(short, long)]
        order_by: Option<String>,
        /// Sort descending
        #[arg(long, requires = "order_by")]
        desc: bool,
        /// Maximum number of documents
        #[arg(short, long)]
        limit: Option<usize>,
        /// Number of documents to skip
        #[arg(long)]
        offset: Option<usize>,
        /// Print only the number of matching documents
        #[arg(short, long)]
        count: bool,
    },
    /// Show configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = match &cli.config {
        Some(path) => StoreConfig::load_from_path(path),
        None => StoreConfig::load(),
    }
    .context("Failed to load configuration")?;

    // Config doesn't need a store
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => {
                commands::config::show(&config, cli.config.as_ref(), &output)
            }
        };
    }

    let seed_path = cli.seed.clone().or_else(|| config.seed_file.clone());
    let store = Store::with_config(config);

    if let Some(path) = seed_path {
        let written = seed::load_seed(&store, &path).await?;
        info!("Seeded {} documents from {:?}", written, path);
    }

    match cli.command {
        Commands::Get { collection, id } => {
            commands::get::show(&store, &collection, &id, &output).await
        }
        Commands::Query {
            collection,
            filter,
            order_by,
            desc,
            limit,
            offset,
            count,
        } => {
            let args = QueryArgs {
                collection,
                filters: filter,
                order_by,
                descending: desc,
                limit,
                offset,
                count,
            };
            commands::query::run(&store, args, &output).await
        }
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Initialize stderr logging
///
/// `RUST_LOG` wins over `--verbose` when set.
fn init_logging(verbose: bool) {
    let log_level = if verbose { "debug" } else { "warn" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "docstash_core={},docstash_cli={}",
            log_level, log_level
        ))
    });

    // Ignore error if already initialized
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_query_command() {
        let cli = Cli::try_parse_from([
            "docstash",
            "--json",
            "query",
            "users/u1/cvs",
            "--where",
            "views >= 10",
            "-w",
            "status == published",
            "--order-by",
            "views",
            "--desc",
            "--limit",
            "5",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Query {
                collection,
                filter,
                order_by,
                desc,
                limit,
                offset,
                count,
            } => {
                assert_eq!(collection, "users/u1/cvs");
                assert_eq!(filter, vec!["views >= 10", "status == published"]);
                assert_eq!(order_by.as_deref(), Some("views"));
                assert!(desc);
                assert_eq!(limit, Some(5));
                assert!(offset.is_none());
                assert!(!count);
            }
            _ => panic!("expected query command"),
        }
    }

    #[test]
    fn test_desc_requires_order_by() {
        let result = Cli::try_parse_from(["docstash", "query", "users", "--desc"]);
        assert!(result.is_err());
    }
}
