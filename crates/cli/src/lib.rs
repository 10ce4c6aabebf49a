//! `bugtrace` command-line surface over the indexing pipeline.
//!
//! Every command resolves the project root, loads `bugtrace.yaml` through
//! [`IndexCoordinator::open`] and prints either a text summary or, with
//! `--json`, a single JSON document on stdout. Logs and progress go to stderr.

use anyhow::{Context, Result};
use bugtrace_indexer::{
    ensure_state_dir, BugtraceConfig, IndexCoordinator, IndexObserver, NoopObserver,
    CONFIG_FILE_NAME,
};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

mod progress;
mod report;

pub use progress::IndicatifObserver;

#[derive(Parser)]
#[command(name = "bugtrace")]
#[command(about = "Codebase-aware retrieval for debugging sessions", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (defaults to the current directory)
    #[arg(long, global = true, default_value = ".")]
    root: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Quiet mode: log only warnings/errors and draw no progress bar
    #[arg(long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default bugtrace.yaml and create the state directory
    Init(InitArgs),

    /// Walk the project and refresh the file manifest
    Scan(OutputArgs),

    /// Scan, then embed new and changed files into the vector index
    Index(IndexArgs),

    /// Search the indexed project
    Search(SearchArgs),

    /// Show the index lifecycle phase and counts
    Status(OutputArgs),
}

#[derive(Args)]
struct InitArgs {
    /// LLM provider written to the llm section
    #[arg(long, default_value = "ollama")]
    provider: String,

    /// LLM model written to the llm section
    #[arg(long, default_value = "llama3.2:3b")]
    model: String,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct OutputArgs {
    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[derive(Args)]
struct IndexArgs {
    /// Re-embed every tracked file
    #[arg(long)]
    force: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Args)]
struct SearchArgs {
    /// Natural-language or code query
    query: String,

    /// Number of results (1-20, defaults to rag.top_k)
    #[arg(long, short = 'k')]
    top_k: Option<usize>,

    /// Search the index as-is instead of refreshing stale files first
    #[arg(long)]
    no_refresh: bool,

    #[command(flatten)]
    output: OutputArgs,
}

#[derive(Serialize)]
struct InitOutput {
    config: PathBuf,
    created: bool,
    state_dir: PathBuf,
}

pub async fn main_entry() -> Result<()> {
    let cli = Cli::parse();

    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"));
    if cli.quiet {
        builder.filter_level(log::LevelFilter::Warn);
    } else if cli.verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();

    let root = cli.root.as_path();
    match cli.command {
        Commands::Init(args) => run_init(root, &args).await,
        Commands::Scan(args) => run_scan(root, &args).await,
        Commands::Index(args) => run_index(root, &args, cli.quiet).await,
        Commands::Search(args) => run_search(root, &args).await,
        Commands::Status(args) => run_status(root, &args).await,
    }
}

async fn open(root: &Path) -> Result<IndexCoordinator> {
    IndexCoordinator::open(root)
        .await
        .with_context(|| format!("Failed to open project {}", root.display()))
}

async fn run_init(root: &Path, args: &InitArgs) -> Result<()> {
    std::fs::create_dir_all(root)
        .with_context(|| format!("Failed to create {}", root.display()))?;
    let created = BugtraceConfig::write_default(root, &args.provider, &args.model)
        .with_context(|| format!("Failed to write {CONFIG_FILE_NAME}"))?;
    let state_dir = ensure_state_dir(root).await?;

    let output = InitOutput {
        config: BugtraceConfig::path_for_project_root(root),
        created,
        state_dir,
    };
    if args.output.json {
        return print_json(&output);
    }
    if created {
        println!("Created {}", output.config.display());
    } else {
        println!("{} already exists; left unchanged", output.config.display());
    }
    Ok(())
}

async fn run_scan(root: &Path, args: &OutputArgs) -> Result<()> {
    let coordinator = open(root).await?;
    let report = coordinator.scan().await.context("Scan failed")?;

    if args.json {
        print_json(&report)
    } else {
        print!("{}", report::render_scan(&report));
        Ok(())
    }
}

async fn run_index(root: &Path, args: &IndexArgs, quiet: bool) -> Result<()> {
    let observer: Arc<dyn IndexObserver> = if quiet || args.output.json {
        Arc::new(NoopObserver)
    } else {
        Arc::new(IndicatifObserver::new())
    };
    let coordinator = open(root).await?.with_observer(observer);
    let outcome = coordinator.index(args.force).await.context("Indexing failed")?;

    if args.output.json {
        print_json(&outcome)
    } else {
        print!("{}", report::render_index(&outcome));
        Ok(())
    }
}

async fn run_search(root: &Path, args: &SearchArgs) -> Result<()> {
    let coordinator = open(root).await?;
    if !args.no_refresh {
        coordinator
            .ensure_indexed()
            .await
            .context("Failed to refresh the index before searching")?;
    }
    let results = coordinator
        .search(&args.query, args.top_k)
        .await
        .context("Search failed")?;

    if args.output.json {
        print_json(&results)
    } else {
        print!(
            "{}",
            report::render_search(&args.query, &results, coordinator.root())
        );
        Ok(())
    }
}

async fn run_status(root: &Path, args: &OutputArgs) -> Result<()> {
    let coordinator = open(root).await?;
    let status = coordinator.status().await.context("Failed to read index status")?;

    if args.json {
        print_json(&status)
    } else {
        print!("{}", report::render_status(&status));
        Ok(())
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
