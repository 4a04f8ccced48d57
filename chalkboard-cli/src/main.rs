//! chalkboard: run the design → frontend/backend agent pipeline from a console.
//!
//! Each line typed at the prompt starts a fresh run: the request is posted to
//! an empty board and the agents iterate on it until the run stops. Type
//! `exit` or `quit` to leave.
//!
//!   chalkboard                         # interactive, uses ANTHROPIC_API_KEY
//!   chalkboard --request "a todo app"  # one run, then exit
//!   chalkboard --dry-run               # scripted agents, no API calls
//!
//! Requires ANTHROPIC_API_KEY unless --dry-run is given.

mod config;
mod output;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;

use chalkboard::generate::{AnthropicGenerator, Generator, ScriptedGenerator};
use chalkboard::pacing::FixedInterval;
use chalkboard::{Coordinator, EventSink, RunReport};

use crate::config::{FileConfig, Overrides, Resolved};

#[derive(Parser)]
#[command(name = "chalkboard", about = "Blackboard agent pipeline console")]
struct Cli {
    /// Anthropic API key (or set ANTHROPIC_API_KEY env var)
    #[arg(long, env = "ANTHROPIC_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Claude model to use
    #[arg(long)]
    model: Option<String>,

    /// Max tokens per generation
    #[arg(long)]
    max_tokens: Option<u32>,

    /// Messages API endpoint
    #[arg(long)]
    api_url: Option<String>,

    /// Maximum cycles per run
    #[arg(long)]
    max_cycles: Option<u32>,

    /// Consecutive idle cycles that stop a run
    #[arg(long)]
    idle_threshold: Option<u32>,

    /// Iteration budget for every agent
    #[arg(long)]
    budget: Option<u32>,

    /// Iteration budget for the design agent (overrides --budget)
    #[arg(long)]
    design_budget: Option<u32>,

    /// Iteration budget for the frontend agent (overrides --budget)
    #[arg(long)]
    frontend_budget: Option<u32>,

    /// Iteration budget for the backend agent (overrides --budget)
    #[arg(long)]
    backend_budget: Option<u32>,

    /// Pause between cycles, in milliseconds
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Maximum summary length shown per agent
    #[arg(long)]
    summary_len: Option<usize>,

    /// Retries after a failed generation
    #[arg(long)]
    retries: Option<u32>,

    /// Timeout for a single generation attempt, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Config file (default: ~/.config/chalkboard/config.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Run this request once and exit instead of prompting
    #[arg(long)]
    request: Option<String>,

    /// Use scripted agents instead of calling the API
    #[arg(long)]
    dry_run: bool,

    /// Print each run's report as JSON
    #[arg(long)]
    json: bool,

    /// Print the newest artifact of each category after a run
    #[arg(long)]
    show_artifacts: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            model: self.model.clone(),
            max_tokens: self.max_tokens,
            api_url: self.api_url.clone(),
            max_cycles: self.max_cycles,
            idle_threshold: self.idle_threshold,
            budget: self.budget,
            design_budget: self.design_budget,
            frontend_budget: self.frontend_budget,
            backend_budget: self.backend_budget,
            interval_ms: self.interval_ms,
            summary_len: self.summary_len,
            retries: self.retries,
            timeout_secs: self.timeout_secs,
        }
    }
}

const SENTINELS: &[&str] = &["exit", "quit"];

fn is_sentinel(line: &str) -> bool {
    SENTINELS.iter().any(|s| line.trim().eq_ignore_ascii_case(s))
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "chalkboard=info,chalkboard_cli=info".into());
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let file = match &cli.config {
        Some(path) => FileConfig::load_from(path)?,
        None => FileConfig::load_default(),
    };
    let resolved = Resolved::merge(&cli.overrides(), &file);
    resolved
        .run
        .validate()
        .context("Invalid run configuration")?;

    let generator: Arc<dyn Generator> = if cli.dry_run {
        Arc::new(ScriptedGenerator::new())
    } else {
        let api_key = cli
            .api_key
            .clone()
            .context("ANTHROPIC_API_KEY is not set (use --api-key or --dry-run)")?;
        Arc::new(
            AnthropicGenerator::new(api_key)
                .with_model(&resolved.model)
                .with_api_url(&resolved.api_url)
                .with_max_tokens(resolved.max_tokens),
        )
    };

    tracing::info!(
        model = %resolved.model,
        dry_run = cli.dry_run,
        max_cycles = resolved.run.max_global_cycles,
        "Starting chalkboard"
    );

    if let Some(request) = &cli.request {
        run_once(&cli, &resolved, &generator, request).await?;
        return Ok(());
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();
    loop {
        stdout.write_all(b"\nrequest> ").await?;
        stdout.flush().await?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        if is_sentinel(&line) {
            break;
        }
        if let Err(e) = run_once(&cli, &resolved, &generator, &line).await {
            eprintln!("error: {e:#}");
        }
    }

    tracing::info!("Bye");
    Ok(())
}

/// Run one request to completion, printing progress as it happens.
async fn run_once(
    cli: &Cli,
    resolved: &Resolved,
    generator: &Arc<dyn Generator>,
    request: &str,
) -> Result<RunReport> {
    let (tx, mut rx) = mpsc::unbounded_channel();
    let coordinator = Coordinator::new(Arc::clone(generator), resolved.run.clone())
        .with_pacing(FixedInterval(resolved.interval))
        .with_events(EventSink::new(tx));

    let result = {
        let run = coordinator.run(request);
        tokio::pin!(run);
        loop {
            tokio::select! {
                biased;
                Some(event) = rx.recv() => println!("{}", output::event_line(&event)),
                result = &mut run => break result,
            }
        }
    };
    drop(coordinator);
    while let Ok(event) = rx.try_recv() {
        println!("{}", output::event_line(&event));
    }

    let report = result?;
    println!("\n{}", output::summary(&report));
    if cli.show_artifacts {
        println!("\n{}", output::artifacts(&report));
    }
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinels_match_case_insensitively() {
        assert!(is_sentinel("exit"));
        assert!(is_sentinel("  QUIT \n"));
        assert!(!is_sentinel("exit strategy for a startup"));
    }

    #[test]
    fn cli_flags_parse() {
        let cli = Cli::try_parse_from([
            "chalkboard",
            "--dry-run",
            "--budget",
            "2",
            "--backend-budget",
            "5",
            "--interval-ms",
            "0",
            "--request",
            "a todo app",
        ])
        .unwrap();
        assert!(cli.dry_run);
        let overrides = cli.overrides();
        assert_eq!(overrides.budget, Some(2));
        assert_eq!(overrides.backend_budget, Some(5));
        assert_eq!(overrides.design_budget, None);
        assert_eq!(overrides.interval_ms, Some(0));
        assert_eq!(cli.request.as_deref(), Some("a todo app"));
    }

    #[tokio::test]
    async fn dry_run_completes_a_request() {
        let cli = Cli::try_parse_from(["chalkboard", "--dry-run", "--interval-ms", "0"]).unwrap();
        let resolved = Resolved::merge(&cli.overrides(), &FileConfig::default());
        let generator: Arc<dyn Generator> = Arc::new(ScriptedGenerator::new());
        let report = run_once(&cli, &resolved, &generator, "a todo app").await.unwrap();
        assert_eq!(report.board.len(), 10);
        assert_eq!(report.termination, chalkboard::Termination::IdleStopped);
    }
}
