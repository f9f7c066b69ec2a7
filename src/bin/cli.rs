//! CLI binary for serapis.

use anyhow::Context;
use clap::{Parser, Subcommand};
use serapis::{Message, SerapisConfig, Stage, TaskPipeline};
use serapis_search::SearchAggregator;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

/// Serapis: search aggregation and definition-mining pipeline.
#[derive(Parser)]
#[command(name = "serapis", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Also write logs to this file.
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Run the full search → detect → rate → save pipeline for a word.
    Run { word: String },

    /// Print aggregated search results for a word as JSON.
    Search { word: String },

    /// Print Diffbot global-index results for a word as JSON.
    Cache { word: String },

    /// Run one stage on a message read from a JSON file, or from the store.
    Stage {
        /// One of search, detect, rate, save.
        stage: Stage,
        /// Path to the input message.
        #[arg(required_unless_present = "hashslug")]
        message: Option<PathBuf>,
        /// Load the input from the store key `<stage>:<HASHSLUG>` instead.
        #[arg(long, conflicts_with = "message")]
        hashslug: Option<String>,
    },

    /// Print the hashslug identifier for a word.
    Hashslug { word: String },

    /// Write a default configuration file.
    InitConfig {
        /// Destination; defaults to the standard config path.
        path: Option<PathBuf>,
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_tracing(cli.log_file.as_deref())?;

    match cli.command {
        Command::Hashslug { word } => {
            println!("{}", serapis::hashslug(&word));
            Ok(())
        }
        Command::InitConfig { path, force } => init_config(path, force),
        command => {
            let config = load_config(cli.config.as_deref())?;
            run_command(command, config).await
        }
    }
}

/// Log to stderr, and to `log_file` too when given.
///
/// The returned guard flushes the file writer when dropped.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("serapis=info,serapis_search=info"));

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let name = path
                .file_name()
                .with_context(|| format!("log file path has no file name: {}", path.display()))?;
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("cannot create log directory {}", dir.display()))?;
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::never(dir, name));
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .init();
    Ok(guard)
}

/// Explicit path, else the default path if it exists, else defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<SerapisConfig> {
    let config = match path {
        Some(path) => SerapisConfig::from_file(path)
            .with_context(|| format!("cannot load config {}", path.display()))?,
        None => {
            let default = SerapisConfig::default_config_path();
            if default.exists() {
                SerapisConfig::from_file(&default)
                    .with_context(|| format!("cannot load config {}", default.display()))?
            } else {
                SerapisConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

async fn run_command(command: Command, config: SerapisConfig) -> anyhow::Result<()> {
    match command {
        Command::Run { word } => {
            let pipeline = TaskPipeline::from_config(&config)?;
            let message = until_interrupted(pipeline.run(Message::new(word))).await?;
            print_json(&message)
        }
        Command::Search { word } => {
            let aggregator = SearchAggregator::from_config(config.search)?;
            let results = until_interrupted(aggregator.search_all(&word)).await?;
            print_json(&results)
        }
        Command::Cache { word } => {
            let aggregator = SearchAggregator::from_config(config.search)?;
            let results = until_interrupted(aggregator.search_cache(&word)).await?;
            print_json(&results)
        }
        Command::Stage {
            stage,
            message,
            hashslug,
        } => {
            let pipeline = TaskPipeline::from_config(&config)?;
            let output = match (message, hashslug) {
                (Some(path), _) => {
                    let json = std::fs::read_to_string(&path)
                        .with_context(|| format!("cannot read message {}", path.display()))?;
                    let input = Message::from_json(&json)?;
                    until_interrupted(pipeline.run_stage(stage, input)).await?
                }
                (None, Some(hashslug)) => {
                    until_interrupted(pipeline.run_stored(stage, &hashslug)).await??
                }
                (None, None) => anyhow::bail!("give a message file or --hashslug"),
            };
            print_json(&output)
        }
        Command::Hashslug { .. } | Command::InitConfig { .. } => Ok(()),
    }
}

/// Await `work`, giving up on Ctrl+C.
async fn until_interrupted<T>(work: impl std::future::Future<Output = T>) -> anyhow::Result<T> {
    tokio::select! {
        value = work => Ok(value),
        _ = tokio::signal::ctrl_c() => {
            info!("received Ctrl+C, shutting down...");
            anyhow::bail!("interrupted")
        }
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> anyhow::Result<()> {
    let path = path.unwrap_or_else(SerapisConfig::default_config_path);
    if path.exists() && !force {
        anyhow::bail!(
            "{} already exists (use --force to overwrite)",
            path.display()
        );
    }
    SerapisConfig::default().save_to_file(&path)?;
    println!("Wrote default configuration to {}", path.display());
    Ok(())
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
