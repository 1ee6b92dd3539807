//! genoscore: variant effect prediction from the command line
//!
//! Scores single variants against the prediction service and maintains the
//! local prediction cache.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use genoscore::config::{API_KEY_ENV, Config, Secrets};
use genoscore::{CacheStore, GenoscoreError, Variant};

/// Genoscore CLI
#[derive(Parser)]
#[command(name = "genoscore")]
#[command(version = genoscore::PKG_VERSION)]
#[command(about = "Cached variant effect prediction client")]
struct Args {
    /// Config file (default: ~/.genoscore/config.toml, then /etc/genoscore/config.toml)
    #[arg(short, long, env = "GENOSCORE_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Score one variant
    Predict {
        /// Chromosome name (e.g. chr1)
        chrom: String,
        /// 1-based position
        pos: u64,
        /// Reference allele
        reference: String,
        /// Alternate allele
        alternate: String,
        /// Sequence context around the variant
        #[arg(short, long)]
        sequence: String,
        /// Prediction kinds to request (repeatable)
        #[arg(short, long = "kind", required = true)]
        kinds: Vec<String>,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Inspect or maintain the prediction cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Print version information
    Version,
}

#[derive(Subcommand)]
enum CacheAction {
    /// Show cache statistics
    Stats,
    /// Delete every cached prediction
    Clear,
    /// Purge expired entries
    Sweep,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialise tracing (default: warn for CLI; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let config = Config::load(args.config.as_deref())?;

    match args.command {
        Command::Predict {
            chrom,
            pos,
            reference,
            alternate,
            sequence,
            kinds,
            json,
        } => {
            let api_key = Secrets::load()?.api_key().ok_or_else(|| {
                GenoscoreError::Configuration(format!(
                    "no API key: set {API_KEY_ENV} or create ~/.genoscore/secrets.toml"
                ))
            })?;
            let client = config.client_builder().api_key(api_key).build()?;
            let variant = Variant::new(chrom, pos, reference, alternate, sequence);
            let scores = client.predict_variant(&variant, &kinds).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&scores)?);
            } else {
                println!("{}", variant.label());
                for (kind, score) in &scores {
                    println!("  {kind:<30} {score:.4}");
                }
            }
        }

        Command::Cache { action } => {
            let dir = config.cache_dir().ok_or_else(|| {
                GenoscoreError::Configuration("caching is disabled in the configuration".into())
            })?;
            let cache = CacheStore::open(&dir, config.cache_config())?;
            match action {
                CacheAction::Stats => {
                    let stats = cache.stats();
                    println!("Cache directory: {}", dir.display());
                    println!("Entries:         {}", stats.total_items);
                    println!("Size:            {} bytes", stats.total_size_bytes);
                    println!("Max entries:     {}", cache.config().max_entries);
                    println!("Default TTL:     {}s", cache.config().default_ttl.as_secs());
                }
                CacheAction::Clear => {
                    cache.clear()?;
                    println!("Cleared {}", dir.display());
                }
                CacheAction::Sweep => {
                    let removed = cache.sweep_expired()?;
                    println!("Removed {removed} expired entries");
                }
            }
        }

        Command::Version => {
            println!("genoscore {}", genoscore::version_string());
        }
    }

    Ok(())
}
