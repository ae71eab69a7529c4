//! docsync CLI - interactive driver for the sync engine.
//!
//! This tool keeps a source and a target document store in memory and
//! offers a menu to populate the source and sync it into the target.

mod demo;
mod shell;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use docsync_storage::{load_source, DocumentStore, MemoryStore};
use docsync_sync::{SyncConfig, SyncEngine};

use crate::shell::Shell;

#[derive(Parser)]
#[command(name = "docsync")]
#[command(about = "docsync - One-way sync between two in-memory document stores")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// JSON file with sync settings.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Synthetic records to load into the source at startup.
    #[arg(long)]
    seed: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the interactive menu (default).
    Shell,

    /// Run the scripted full/batched/incremental walkthrough.
    Demo {
        /// Page size for the batched step (default: from config).
        #[arg(short, long)]
        batch_size: Option<usize>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging; RUST_LOG wins over --verbose.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref(), cli.seed)?;
    let engine = Arc::new(build_engine(config.clone()).await?);

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => cmd_shell(engine).await,
        Commands::Demo { batch_size } => {
            cmd_demo(&engine, batch_size.unwrap_or(config.batch_size)).await
        }
    }
}

/// Read settings from `path` (defaults if absent) and apply overrides.
fn load_config(path: Option<&Path>, seed: Option<usize>) -> Result<SyncConfig> {
    let mut config = match path {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => SyncConfig::default(),
    };

    if let Some(seed) = seed {
        config = config.with_seed_records(seed);
    }
    config.validate().context("Invalid sync settings")?;
    Ok(config)
}

/// Create both stores, seed the source, and wire up the engine.
async fn build_engine(config: SyncConfig) -> Result<SyncEngine> {
    let source: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new("source"));
    let target: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new("target"));

    if config.seed_records > 0 {
        load_source(source.as_ref(), config.seed_records)
            .await
            .context("Failed to seed source store")?;
    }

    SyncEngine::new(source, target, config).context("Failed to create sync engine")
}

/// Run the interactive menu on stdin/stdout.
async fn cmd_shell(engine: Arc<SyncEngine>) -> Result<()> {
    info!("Starting interactive shell");

    let input = BufReader::new(tokio::io::stdin());
    let mut shell = Shell::new(engine, input, tokio::io::stdout());
    shell.run().await
}

/// Run the scripted walkthrough and fail if any check fails.
async fn cmd_demo(engine: &SyncEngine, batch_size: usize) -> Result<()> {
    info!("Running demo with batch size {}", batch_size);

    let mut out = tokio::io::stdout();
    let passed = demo::run_demo(engine, batch_size, &mut out).await?;
    if passed != 3 {
        anyhow::bail!("Demo failed: {} of 3 checks passed", passed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use docsync_storage::Query;
    use std::io::Write;

    #[test]
    fn test_cli_parses() {
        let cli = Cli::parse_from(["docsync", "-v", "--seed", "4", "demo", "-b", "3"]);
        assert!(cli.verbose);
        assert_eq!(cli.seed, Some(4));
        assert!(matches!(cli.command, Some(Commands::Demo { batch_size: Some(3) })));

        let cli = Cli::parse_from(["docsync"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_load_config_defaults() {
        let config = load_config(None, None).unwrap();
        assert_eq!(config, SyncConfig::default());
    }

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"batch_size": 10, "seed_records": 2}}"#).unwrap();

        let config = load_config(Some(file.path()), Some(5)).unwrap();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.seed_records, 5);
        assert_eq!(config.auto_sync_interval_secs, 5);
    }

    #[test]
    fn test_load_config_rejects_zero_batch() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"batch_size": 0}}"#).unwrap();

        assert!(load_config(Some(file.path()), None).is_err());
    }

    #[test]
    fn test_load_config_rejects_garbage() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();

        assert!(load_config(Some(file.path()), None).is_err());
    }

    #[tokio::test]
    async fn test_build_engine_seeds_source() {
        let config = SyncConfig::default().with_seed_records(6);
        let engine = build_engine(config).await.unwrap();

        assert_eq!(engine.source().count(&Query::all()).await.unwrap(), 6);
        assert_eq!(engine.target().count(&Query::all()).await.unwrap(), 0);
    }
}
