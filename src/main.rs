//! paper-digest: daily arXiv digest job.
//!
//! fetch (arXiv) -> rank (institution allow-list) -> summarize (Gemini) -> push (ServerChan).
//! Exit status: 0 success, 1 failure or missing configuration, 130 interrupted.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use paper_digest::config::institutions::{clean_list, load_institutions_default};
use paper_digest::ingest::arxiv::ArxivProvider;
use paper_digest::notify::ServerChanNotifier;
use paper_digest::pipeline::{self, Pipeline};
use paper_digest::probe::run_probe;
use paper_digest::summarize::{GeminiProvider, GenerationParams};
use paper_digest::{Credentials, DigestConfig, DigestError};

const EXIT_SUCCESS: u8 = 0;
const EXIT_FAILURE: u8 = 1;
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Parser)]
#[command(name = "paper-digest")]
#[command(version)]
#[command(about = "Fetch, rank, summarize and push today's arXiv papers")]
struct Cli {
    /// Configuration file path (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Lookback window in days
    #[arg(long)]
    days: Option<u32>,

    /// Maximum number of feed results to request
    #[arg(long)]
    max_results: Option<u32>,

    /// Maximum number of papers in the digest
    #[arg(long)]
    max_papers: Option<usize>,

    /// Fetch and rank only; print the digest instead of summarizing and pushing
    #[arg(long)]
    dry_run: bool,

    /// Emit logs as JSON lines
    #[arg(long)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Clone, Copy)]
enum Commands {
    /// Run the daily digest (default)
    Run,
    /// Check connectivity to the generative-text service and the push webhook
    Probe,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("paper_digest=info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().compact()).init();
    }
}

fn apply_overrides(cfg: &mut DigestConfig, cli: &Cli) {
    if let Some(d) = cli.days {
        cfg.feed.lookback_days = d;
    }
    if let Some(n) = cli.max_results {
        cfg.feed.max_results = n;
    }
    if let Some(n) = cli.max_papers {
        cfg.rank.max_papers = n.max(1);
    }
}

fn institutions_for(cfg: &DigestConfig) -> Result<Vec<String>> {
    if cfg.rank.institutions.is_empty() {
        load_institutions_default()
    } else {
        Ok(clean_list(cfg.rank.institutions.clone()))
    }
}

fn credentials() -> Result<Credentials> {
    let creds = Credentials::from_env()?;
    info!(?creds, "credentials present");
    Ok(creds)
}

async fn execute(cli: Cli) -> Result<u8> {
    let mut cfg = DigestConfig::load(cli.config.as_deref())?;
    apply_overrides(&mut cfg, &cli);
    let institutions = institutions_for(&cfg)?;
    info!(
        lookback_days = cfg.feed.lookback_days,
        max_results = cfg.feed.max_results,
        max_papers = cfg.rank.max_papers,
        institutions = institutions.len(),
        "configuration loaded"
    );

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Probe => {
            let creds = credentials()?;
            let generator = GeminiProvider::new(&creds.gemini_api_key, &cfg.summarize)?;
            let notifier = ServerChanNotifier::new(&creds.serverchan_key, &cfg.notify)?;
            let report = run_probe(
                &generator,
                &GenerationParams::from(&cfg.summarize),
                &notifier,
            )
            .await;
            info!(
                generator_ok = report.generator_ok,
                notifier_ok = report.notifier_ok,
                "probe finished"
            );
            Ok(exit_status(report.all_ok()))
        }
        Commands::Run if cli.dry_run => {
            let feed = ArxivProvider::from_config(&cfg.feed)?;
            let msg = pipeline::preview(&feed, &cfg, &institutions, Utc::now()).await;
            println!("{}\n\n{}", msg.title, msg.body);
            Ok(EXIT_SUCCESS)
        }
        Commands::Run => {
            let creds = credentials()?;
            let pipeline = Pipeline::from_config(cfg, &creds, institutions)?;
            let report = pipeline.run(Utc::now()).await;
            Ok(exit_status(report.success()))
        }
    }
}

fn exit_status(ok: bool) -> u8 {
    if ok {
        EXIT_SUCCESS
    } else {
        EXIT_FAILURE
    }
}

/// Log a top-level error and map it to the exit status.
fn error_status(e: &anyhow::Error) -> u8 {
    match e.downcast_ref::<DigestError>() {
        Some(DigestError::MissingCredential(name)) => {
            error!(variable = *name, "required environment variable is not set");
        }
        _ => error!(error = ?e, "run aborted"),
    }
    EXIT_FAILURE
}

async fn run(cli: Cli) -> u8 {
    match execute(cli).await {
        Ok(code) => code,
        Err(e) => error_status(&e),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // Load .env if present; no-op otherwise.
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    init_tracing(cli.log_json);
    info!(started = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"), "paper-digest starting");

    let code = tokio::select! {
        code = run(cli) => code,
        Ok(()) = tokio::signal::ctrl_c() => {
            warn!("interrupted by user");
            EXIT_INTERRUPTED
        }
    };
    ExitCode::from(code)
}
