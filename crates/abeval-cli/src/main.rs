//! Abeval - operator CLI for comparative evaluation batches
//!
//! The `abeval` command drives the batch coordinator against a scoring
//! backend.
//!
//! ## Commands
//!
//! - `run`: Execute a client-sequenced batch from a local item catalog
//! - `submit`: Submit a server-delegated batch and watch its progress
//! - `history`: List persisted results from the history store

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use abeval_client::{ScoringApiClient, ScoringApiConfig};
use abeval_core::{
    init_tracing, write_export_json, BatchConfig, BatchController, BatchStatus, CoordinatorConfig,
    EvalMode, HistorySort, HistoryStore, StartRequest, TestItem,
};

#[derive(Parser)]
#[command(name = "abeval")]
#[command(author = "Abeval Maintainers")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "A/B evaluation batch coordinator", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    /// Scoring service base URL
    #[arg(long, global = true, env = "ABEVAL_API_URL")]
    api_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a client-sequenced batch from a local item catalog
    Run {
        /// Path to the item catalog (JSON array of test items)
        #[arg(short, long)]
        catalog: PathBuf,

        /// Comparison arm to evaluate
        #[arg(long, value_enum, default_value = "a")]
        mode: ModeArg,

        /// Operator label attached to the batch
        #[arg(long)]
        label: Option<String>,

        /// Inter-item delay in milliseconds (backpressure toward the
        /// scoring service)
        #[arg(long, default_value = "1500")]
        item_delay_ms: u64,

        /// Write the results export to this path when the run ends
        #[arg(long)]
        export: Option<PathBuf>,
    },

    /// Submit a server-delegated batch and watch its progress
    Submit {
        /// Number of items the remote runner should execute
        #[arg(short = 'n', long)]
        count: u64,

        /// Comparison arm to evaluate
        #[arg(long, value_enum, default_value = "a")]
        mode: ModeArg,

        /// Operator label attached to the batch
        #[arg(long)]
        label: Option<String>,

        /// Give up (run fails) if the remote batch reports no terminal
        /// status after this many seconds
        #[arg(long)]
        stall_timeout_secs: Option<u64>,
    },

    /// List persisted results from the history store
    History {
        /// Maximum number of entries to show
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Oldest entries first (default: newest first)
        #[arg(long)]
        oldest_first: bool,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    A,
    B,
}

impl From<ModeArg> for EvalMode {
    fn from(arg: ModeArg) -> Self {
        match arg {
            ModeArg::A => EvalMode::ModeA,
            ModeArg::B => EvalMode::ModeB,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    init_tracing(cli.json, level);

    let client = Arc::new(match &cli.api_url {
        Some(url) => ScoringApiClient::new(ScoringApiConfig::new(url)),
        None => ScoringApiClient::from_env(),
    });

    match cli.command {
        Commands::Run {
            catalog,
            mode,
            label,
            item_delay_ms,
            export,
        } => cmd_run(client, catalog, mode.into(), label, item_delay_ms, export).await,
        Commands::Submit {
            count,
            mode,
            label,
            stall_timeout_secs,
        } => cmd_submit(client, count, mode.into(), label, stall_timeout_secs).await,
        Commands::History {
            limit,
            oldest_first,
        } => cmd_history(client, limit, oldest_first).await,
    }
}

async fn cmd_run(
    client: Arc<ScoringApiClient>,
    catalog: PathBuf,
    mode: EvalMode,
    label: Option<String>,
    item_delay_ms: u64,
    export: Option<PathBuf>,
) -> Result<()> {
    let raw = std::fs::read_to_string(&catalog)
        .with_context(|| format!("read catalog {:?}", catalog))?;
    let items: Vec<TestItem> = serde_json::from_str(&raw).context("parse catalog")?;
    println!("Loaded {} items from {}", items.len(), catalog.display());

    let config = CoordinatorConfig::default()
        .with_item_delay(Duration::from_millis(item_delay_ms));
    let controller =
        BatchController::new(client.clone(), client.clone(), client.clone(), config);

    let run_id = controller
        .start(StartRequest::Items(items), batch_config(mode, label))
        .await?;
    println!("Run {} started ({})", run_id, mode);

    watch_progress(&controller).await;
    controller.wait().await;
    report_run(&controller);

    if let Some(path) = export {
        write_export_json(&path, &controller.export())?;
        println!("Export written to {}", path.display());
    }
    Ok(())
}

async fn cmd_submit(
    client: Arc<ScoringApiClient>,
    count: u64,
    mode: EvalMode,
    label: Option<String>,
    stall_timeout_secs: Option<u64>,
) -> Result<()> {
    let mut config = CoordinatorConfig::default();
    if let Some(secs) = stall_timeout_secs {
        config = config.with_stall_timeout(Duration::from_secs(secs));
    }
    let controller =
        BatchController::new(client.clone(), client.clone(), client.clone(), config);

    let run_id = controller
        .start(StartRequest::Remote { count }, batch_config(mode, label))
        .await?;
    println!("Batch of {} items submitted ({}), run {}", count, mode, run_id);

    watch_progress(&controller).await;
    controller.wait().await;
    report_run(&controller);
    Ok(())
}

async fn cmd_history(
    client: Arc<ScoringApiClient>,
    limit: usize,
    oldest_first: bool,
) -> Result<()> {
    let sort = if oldest_first {
        HistorySort::OldestFirst
    } else {
        HistorySort::NewestFirst
    };
    let entries = client.list_results(sort, limit).await?;

    if entries.is_empty() {
        println!("No persisted results.");
        return Ok(());
    }
    for entry in entries {
        println!(
            "{}  {}  {:7}  {:6}  score {:+.3}",
            entry.created_at.format("%Y-%m-%d %H:%M:%S"),
            entry.item_id,
            entry.mode.as_str(),
            if entry.passed { "pass" } else { "fail" },
            entry.score,
        );
    }
    Ok(())
}

fn batch_config(mode: EvalMode, label: Option<String>) -> BatchConfig {
    match label {
        Some(label) => BatchConfig::new(mode).with_label(&label),
        None => BatchConfig::new(mode),
    }
}

/// Print a progress line on the elapsed-ticker cadence until the run
/// leaves `Running`.
async fn watch_progress(controller: &BatchController) {
    loop {
        let state = controller.snapshot();
        println!(
            "[{:>6.1}s] {:?}: {}/{} done ({:.0}%), {} passed, {} failed, avg {:+.3}",
            state.elapsed_ms as f64 / 1000.0,
            state.status,
            state.completed_count,
            state.total,
            state.progress_fraction() * 100.0,
            state.passed_count,
            state.failed_count,
            state.running_avg_score,
        );
        if state.status != BatchStatus::Running {
            break;
        }
        tokio::time::sleep(Duration::from_millis(500)).await;
    }
}

fn report_run(controller: &BatchController) {
    let state = controller.snapshot();
    println!(
        "Run finished: {:?} ({}/{} items, {} passed, {} failed)",
        state.status, state.completed_count, state.total, state.passed_count, state.failed_count,
    );

    if let Some(summary) = controller.final_summary() {
        println!(
            "Summary: pass rate {:.1}%, avg score {:+.3}, wall clock {:.1}s",
            summary.pass_rate * 100.0,
            summary.avg_score,
            summary.wall_clock_ms as f64 / 1000.0,
        );
    }

    let history = controller.history();
    if !history.is_empty() {
        println!("Recent persisted results ({} entries):", history.len());
        for entry in history.iter().take(10) {
            println!(
                "  {}  {}  {}",
                entry.item_id,
                if entry.passed { "pass" } else { "fail" },
                entry.score,
            );
        }
    }
}
