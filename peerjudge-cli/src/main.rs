// Copyright 2025 PeerJudge (https://github.com/peerjudge)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! `peerjudge` command-line interface.
//!
//! Exit codes: 0 on success, 1 on evaluation or validation failure, 2 on
//! usage errors. This binary is a thin presentation layer: every
//! user-visible failure is caught and reported here, never re-raised.

mod input;
mod report;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use peerjudge_core::{CompositeResult, JudgeConfig};
use peerjudge_evals::{baseline, JudgeAgent};
use peerjudge_trace::{AdapterMode, CcTraceAdapter};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, warn};

#[derive(Parser)]
#[command(
    name = "peerjudge",
    version,
    about = "Three-tier evaluation of agent-generated peer reviews"
)]
struct Cli {
    /// Enable debug logging
    #[arg(long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Evaluate an agent-generated review against ground truth
    Evaluate(EvaluateArgs),
    /// Compare serialized composite results across runs
    Compare(CompareArgs),
}

#[derive(Args)]
struct EvaluateArgs {
    /// Paper text file
    #[arg(long)]
    paper: PathBuf,

    /// Generated review text file
    #[arg(long)]
    review: PathBuf,

    /// Ground-truth review text file (repeatable)
    #[arg(long = "reference")]
    references: Vec<PathBuf>,

    /// Trace artifacts directory for the evaluated run
    #[arg(long)]
    trace_dir: Option<PathBuf>,

    /// Comma-separated tier numbers to enable (e.g. "1,3")
    #[arg(long, default_value = "1,2,3")]
    tiers: String,

    /// Tier 1 timeout in seconds
    #[arg(long)]
    tier1_timeout: Option<f64>,

    /// Tier 2 timeout in seconds
    #[arg(long)]
    tier2_timeout: Option<f64>,

    /// Tier 3 timeout in seconds
    #[arg(long)]
    tier3_timeout: Option<f64>,

    /// LLM provider for Tier 2: "auto", "openai", or "anthropic"
    #[arg(long, default_value = "auto")]
    provider: String,

    /// Validate and parse inputs without running the evaluation
    #[arg(long)]
    skip_eval: bool,

    /// Render a markdown report after evaluation
    #[arg(long, conflicts_with = "skip_eval")]
    report: bool,

    /// Character budget for text sent to the LLM judge
    #[arg(long)]
    token_limit: Option<usize>,

    /// CC artifact directory for baseline comparison (repeatable;
    /// solo/teams mode is auto-detected)
    #[arg(long = "cc-artifacts")]
    cc_artifacts: Vec<PathBuf>,
}

#[derive(Args)]
struct CompareArgs {
    /// CompositeResult JSON files: PydanticAI baseline, then CC-solo and
    /// optionally CC-teams
    #[arg(num_args = 2..=3, required = true)]
    files: Vec<PathBuf>,
}

#[derive(Debug)]
enum CliError {
    Usage(String),
    Failure(anyhow::Error),
}

impl From<anyhow::Error> for CliError {
    fn from(error: anyhow::Error) -> Self {
        CliError::Failure(error)
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("error: failed to start runtime: {e}");
            return ExitCode::from(1);
        }
    };

    match runtime.block_on(run(cli.command)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage(message)) => {
            eprintln!("usage error: {message}");
            ExitCode::from(2)
        }
        Err(CliError::Failure(error)) => {
            eprintln!("error: {error:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Evaluate(args) => evaluate(args).await,
        Command::Compare(args) => compare(args),
    }
}

fn parse_tiers(tiers: &str) -> Result<BTreeSet<u8>, CliError> {
    let mut parsed = BTreeSet::new();
    for part in tiers.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let tier: u8 = part
            .parse()
            .map_err(|_| CliError::Usage(format!("invalid tier number: {part:?}")))?;
        parsed.insert(tier);
    }
    if parsed.is_empty() {
        return Err(CliError::Usage("no tiers enabled".to_string()));
    }
    Ok(parsed)
}

async fn evaluate(args: EvaluateArgs) -> Result<(), CliError> {
    let mut config = JudgeConfig::default();
    config.tiers_enabled = parse_tiers(&args.tiers)?;
    config.tier2.provider = args.provider.clone();
    if let Some(timeout) = args.tier1_timeout {
        config.tier1_max_seconds = timeout;
    }
    if let Some(timeout) = args.tier2_timeout {
        config.tier2_max_seconds = timeout;
    }
    if let Some(timeout) = args.tier3_timeout {
        config.tier3_max_seconds = timeout;
    }
    if let Some(limit) = args.token_limit {
        config.tier2.paper_excerpt_length = config.tier2.paper_excerpt_length.min(limit);
    }

    let paper = input::load_text(&args.paper)?;
    let review = input::load_text(&args.review)?;
    let references: Vec<String> = args
        .references
        .iter()
        .map(|path| input::load_text(path))
        .collect::<Result<_, _>>()?;

    let trace = match &args.trace_dir {
        Some(dir) => {
            let adapter = CcTraceAdapter::new(dir)
                .with_context(|| format!("failed to open trace artifacts in {}", dir.display()))?;
            let record = adapter.parse().context("failed to parse trace artifacts")?;
            info!(
                execution_id = %record.execution_id,
                mode = %adapter.mode(),
                "trace loaded"
            );
            Some(record)
        }
        None => None,
    };

    if args.skip_eval {
        info!("--skip-eval set; inputs validated, evaluation skipped");
        let summary = serde_json::json!({
            "skipped": true,
            "paper_bytes": paper.len(),
            "review_bytes": review.len(),
            "references": references.len(),
            "execution_id": trace.as_ref().map(|t| t.execution_id.clone()),
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("failed to render summary")?
        );
        return Ok(());
    }

    let judge = JudgeAgent::new(config);
    let result = judge
        .evaluate_comprehensive(&paper, &review, trace, references.clone())
        .await
        .context("evaluation failed")?;

    let comparisons = evaluate_cc_baselines(&judge, &args.cc_artifacts, &paper, &review, &references, &result).await?;

    if args.report {
        println!("{}", report::render(&result, &comparisons));
    } else {
        let mut output = serde_json::to_value(&result).context("failed to render result")?;
        if !comparisons.is_empty() {
            output["baseline_comparisons"] =
                serde_json::to_value(&comparisons).context("failed to render comparisons")?;
        }
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("failed to render output")?
        );
    }

    Ok(())
}

/// Evaluate each CC artifact directory with the same inputs and diff
/// against the primary run. The first solo and first teams directory are
/// used; extras are ignored with a warning.
async fn evaluate_cc_baselines(
    judge: &JudgeAgent,
    cc_artifacts: &[PathBuf],
    paper: &str,
    review: &str,
    references: &[String],
    primary: &CompositeResult,
) -> Result<Vec<peerjudge_core::BaselineComparison>, CliError> {
    if cc_artifacts.is_empty() {
        return Ok(Vec::new());
    }

    let mut solo_result: Option<CompositeResult> = None;
    let mut teams_result: Option<CompositeResult> = None;

    for dir in cc_artifacts {
        let adapter = CcTraceAdapter::new(dir)
            .with_context(|| format!("failed to open CC artifacts in {}", dir.display()))?;
        let mode = adapter.mode();
        let record = adapter
            .parse()
            .with_context(|| format!("failed to parse CC artifacts in {}", dir.display()))?;

        let result = judge
            .evaluate_comprehensive(paper, review, Some(record), references.to_vec())
            .await
            .with_context(|| format!("baseline evaluation failed for {}", dir.display()))?;

        let slot = match mode {
            AdapterMode::Solo => &mut solo_result,
            AdapterMode::Teams => &mut teams_result,
        };
        if slot.is_some() {
            warn!(dir = %dir.display(), %mode, "duplicate CC artifacts for mode; ignoring");
        } else {
            *slot = Some(result);
        }
    }

    Ok(baseline::compare_all(
        primary,
        solo_result.as_ref(),
        teams_result.as_ref(),
    ))
}

fn compare(args: CompareArgs) -> Result<(), CliError> {
    let mut results: Vec<CompositeResult> = Vec::new();
    for path in &args.files {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let result: CompositeResult = serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse composite result from {}", path.display()))?;
        results.push(result);
    }

    let comparisons = baseline::compare_all(&results[0], results.get(1), results.get(2));
    for comparison in &comparisons {
        info!("{}", comparison.summary);
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&comparisons).context("failed to render comparisons")?
    );
    Ok(())
}
