//! `s2b-harvest` command line entry point
//!
//! Exit codes: 0 finished (or nothing to do), 2 transient failure (retry
//! later, checkpoint preserved), 1 needs an operator.

#![allow(clippy::uninlined_format_args)]

use anyhow::{Context, Result, anyhow, bail};
use clap::{Args, Parser, Subcommand};
use s2b_harvest_lib::application::{CrawlOrchestrator, CrawlSettings, current_date, policy_from_config};
use s2b_harvest_lib::domain::{Checkpoint, TargetDate};
use s2b_harvest_lib::infrastructure::logging::{self, LogGuard};
use s2b_harvest_lib::infrastructure::{
    AppConfig, CheckpointStore, S2bHttpClient, merge_results, run_log_file_name,
};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "s2b-harvest")]
#[command(about = "Resumable crawler for S2B contract listings")]
#[command(version)]
struct Cli {
    /// Configuration file layered over config/default.toml
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl from the stored checkpoint until the day boundary or a stop condition
    Crawl(CrawlArgs),
    /// Create the checkpoint file
    Init(InitArgs),
    /// Print the stored checkpoint as JSON
    Status(StatusArgs),
    /// Combine per-run result files into one file per date
    Merge(MergeArgs),
}

#[derive(Args)]
struct CrawlArgs {
    /// Checkpoint file (overrides crawl.checkpoint_path)
    #[arg(long)]
    checkpoint: Option<PathBuf>,

    /// Result directory (overrides output.dir)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Stop after this many pages (overrides crawl.max_pages_per_run)
    #[arg(long)]
    max_pages: Option<u32>,
}

#[derive(Args)]
struct InitArgs {
    /// First day to harvest, YYYYMMDD
    #[arg(long)]
    date: TargetDate,

    /// First page to fetch
    #[arg(long, default_value_t = 1)]
    page: u32,

    /// Replace an existing checkpoint
    #[arg(long)]
    force: bool,

    /// Checkpoint file (overrides crawl.checkpoint_path)
    #[arg(long)]
    checkpoint: Option<PathBuf>,
}

#[derive(Args)]
struct StatusArgs {
    /// Checkpoint file (overrides crawl.checkpoint_path)
    #[arg(long)]
    checkpoint: Option<PathBuf>,
}

#[derive(Args)]
struct MergeArgs {
    /// Directory holding per-run files (defaults to output.dir)
    #[arg(short, long)]
    input_dir: Option<PathBuf>,

    /// Directory for merged files (defaults to output.merged_dir)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;

    match cli.command {
        Commands::Crawl(args) => crawl(config, args).await,
        Commands::Init(args) => init(&config, args),
        Commands::Status(args) => status(&config, args),
        Commands::Merge(args) => merge(&config, args),
    }
}

/// Console-only logging for the short utility commands
fn init_console_logging(config: &AppConfig) -> Result<LogGuard> {
    let mut logging_config = config.logging.clone();
    logging_config.console_output = true;
    logging_config.file_output = false;
    logging::init_logging(&logging_config, "")
}

fn checkpoint_store(config: &AppConfig, path: Option<PathBuf>) -> CheckpointStore {
    CheckpointStore::new(path.unwrap_or_else(|| config.crawl.checkpoint_path.clone()))
}

async fn crawl(mut config: AppConfig, args: CrawlArgs) -> Result<ExitCode> {
    if let Some(dir) = args.output_dir {
        config.output.dir = dir;
    }
    if let Some(max_pages) = args.max_pages {
        config.crawl.max_pages_per_run = max_pages;
    }
    let store = checkpoint_store(&config, args.checkpoint);

    let start = store.load().ok();
    let _guard = logging::init_logging(&config.logging, &run_log_file_name(start.as_ref()))?;
    logging::log_system_info();

    let today = current_date(config.crawl.timezone_offset_hours)
        .ok_or_else(|| anyhow!("Invalid timezone offset {}", config.crawl.timezone_offset_hours))?;

    let client = S2bHttpClient::new(config.fetch.clone())?.with_session_priming(config.session.prime_on_rotate);
    if config.session.prime_on_rotate {
        client.prime_session().await;
    }

    let policy = policy_from_config(&config.session);
    let settings = CrawlSettings::from_config(&config);
    let mut orchestrator = CrawlOrchestrator::new(client, policy, store, settings)?;

    let outcome = orchestrator.run(today).await?;
    info!("🏁 Run finished: {}", serde_json::to_string(&outcome)?);
    info!("{}", "=".repeat(60));

    Ok(ExitCode::from(outcome.exit_code()))
}

fn init(config: &AppConfig, args: InitArgs) -> Result<ExitCode> {
    let _guard = init_console_logging(config)?;
    let store = checkpoint_store(config, args.checkpoint);

    if store.exists() && !args.force {
        bail!(
            "Checkpoint {} already exists (use --force to replace it)",
            store.path().display()
        );
    }

    let checkpoint = Checkpoint::new(args.date, args.page)?;
    store.save(&checkpoint)?;
    info!("📍 Checkpoint {} written to {}", checkpoint, store.path().display());

    Ok(ExitCode::SUCCESS)
}

fn status(config: &AppConfig, args: StatusArgs) -> Result<ExitCode> {
    let store = checkpoint_store(config, args.checkpoint);
    let checkpoint = store.load()?;

    let today = current_date(config.crawl.timezone_offset_hours);
    let report = serde_json::json!({
        "checkpoint_file": store.path(),
        "search_day": checkpoint.target_date(),
        "page": checkpoint.next_page(),
        "harvestable": today.is_some_and(|today| checkpoint.target_date() < today),
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    Ok(ExitCode::SUCCESS)
}

fn merge(config: &AppConfig, args: MergeArgs) -> Result<ExitCode> {
    let _guard = init_console_logging(config)?;

    let input_dir = args.input_dir.unwrap_or_else(|| config.output.dir.clone());
    let output_dir = args.output_dir.unwrap_or_else(|| config.output.merged_dir.clone());

    info!("📚 Merging result files from {} into {}", input_dir.display(), output_dir.display());
    let summaries = merge_results(&input_dir, &output_dir)?;
    println!("{}", serde_json::to_string_pretty(&summaries)?);

    Ok(ExitCode::SUCCESS)
}
