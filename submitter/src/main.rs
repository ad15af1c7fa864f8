//! Sampled-completion solution submitter CLI.
//!
//! Loads `submitter.toml`, applies command-line overrides, and runs the
//! generate/verify/submit loop for one task.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use submitter::controller::{RunOutcome, RunRequest, RunStop, Services, run_pipeline};
use submitter::core::types::{Mode, TaskRef};
use submitter::exit_codes;
use submitter::io::completion::{HttpCompletionClient, credentials_path, load_credentials};
use submitter::io::config::{SubmitterConfig, load_config, write_config};
use submitter::io::delay::{CancelToken, ThreadSleeper};
use submitter::io::judge::OjJudge;
use submitter::io::problem::{default_problem_dir, load_problem};
use submitter::logging::{self, LogSink};

/// Escalated batch size relative to `--testcases`.
const ESCALATION_FACTOR: usize = 3;

#[derive(Parser, Debug)]
#[command(
    name = "submitter",
    version,
    about = "Generate, verify and submit solutions from sampled completions"
)]
struct Cli {
    /// Contest id, e.g. `abc200`.
    contest_id: String,
    /// Problem id within the contest, e.g. `c`.
    problem_id: String,

    /// Directory holding `main.py` and `statement.txt`.
    /// Defaults to `workspace/<contest>/<PROBLEM>`.
    #[arg(long)]
    problem_dir: Option<PathBuf>,

    /// Config file; missing files fall back to defaults.
    #[arg(long, default_value = "submitter.toml")]
    config: PathBuf,

    /// Write the effective config (file plus overrides) to `--config` and exit.
    #[arg(long)]
    write_config: bool,

    /// Completions per initial batch. The escalated batch is three times larger.
    #[arg(short = 'n', long = "testcases", value_name = "N")]
    batch: Option<usize>,

    /// Test candidates against the sample cases before submitting.
    #[arg(short, long)]
    test: bool,

    #[arg(long)]
    completion_endpoint: Option<String>,
    #[arg(long)]
    max_tokens: Option<u32>,
    #[arg(long)]
    temperature: Option<f64>,
    #[arg(long)]
    top_p: Option<f64>,
    #[arg(long)]
    logprobs: Option<u32>,
    #[arg(long)]
    presence_penalty: Option<f64>,
    #[arg(long)]
    frequency_penalty: Option<f64>,
    #[arg(long)]
    best_of: Option<u32>,

    /// Round cap; 0 means unbounded.
    #[arg(long)]
    max_rounds: Option<u32>,
}

impl Cli {
    fn apply_overrides(&self, config: &mut SubmitterConfig) {
        if let Some(batch) = self.batch {
            config.rounds.initial_batch = batch;
            config.rounds.escalated_batch = batch.saturating_mul(ESCALATION_FACTOR);
        }
        if let Some(max_rounds) = self.max_rounds {
            config.rounds.max_rounds = max_rounds;
        }
        if let Some(endpoint) = &self.completion_endpoint {
            config.completion.endpoint = endpoint.clone();
        }

        let parameters = &mut config.completion.parameters;
        if self.max_tokens.is_some() {
            parameters.max_tokens = self.max_tokens;
        }
        if self.temperature.is_some() {
            parameters.temperature = self.temperature;
        }
        if self.top_p.is_some() {
            parameters.top_p = self.top_p;
        }
        if self.logprobs.is_some() {
            parameters.logprobs = self.logprobs;
        }
        if self.presence_penalty.is_some() {
            parameters.presence_penalty = self.presence_penalty;
        }
        if self.frequency_penalty.is_some() {
            parameters.frequency_penalty = self.frequency_penalty;
        }
        if self.best_of.is_some() {
            parameters.best_of = self.best_of;
        }
    }

    fn mode(&self) -> Mode {
        if self.test { Mode::Tested } else { Mode::Direct }
    }

    fn problem_dir(&self) -> Result<PathBuf> {
        match &self.problem_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let cwd = std::env::current_dir().context("resolve current directory")?;
                Ok(default_problem_dir(
                    &cwd,
                    &self.contest_id,
                    &self.problem_id,
                ))
            }
        }
    }
}

fn main() {
    let code = match run() {
        Ok(code) => code,
        Err(err) => {
            eprintln!("{err:#}");
            exit_codes::INVALID
        }
    };
    std::process::exit(code);
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let sink = LogSink::new();
    logging::init(&sink);

    let config = effective_config(&cli)?;
    if cli.write_config {
        write_config(&cli.config, &config)?;
        println!("wrote {}", cli.config.display());
        return Ok(exit_codes::OK);
    }

    if let Some(path) = credentials_path() {
        load_credentials(&path);
    }
    let client = HttpCompletionClient::from_env(config.completion.clone())?;
    let problem_dir = cli.problem_dir()?;
    let template = load_problem(&problem_dir, &config.program.function_name)?;
    let task = TaskRef::new(&cli.contest_id, &cli.problem_id);

    let cancel = CancelToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || handler_token.cancel()).context("install interrupt handler")?;

    let judge = OjJudge::new(config.judge.clone());
    let services = Services {
        client: &client,
        judge: &judge,
        sleeper: &ThreadSleeper,
    };
    let request = RunRequest {
        task: &task,
        template: &template,
        mode: cli.mode(),
        config: &config,
        cancel: &cancel,
        sink: &sink,
    };
    let outcome = run_pipeline(&services, &request)?;
    Ok(report(&outcome))
}

fn effective_config(cli: &Cli) -> Result<SubmitterConfig> {
    let mut config = load_config(&cli.config)?;
    cli.apply_overrides(&mut config);
    config.validate().context("invalid command-line overrides")?;
    Ok(config)
}

fn report(outcome: &RunOutcome) -> i32 {
    match &outcome.stop {
        RunStop::Submitted {
            round,
            choice,
            submit_attempts,
        } => {
            info!(round, choice, submit_attempts, "done");
            println!(
                "submitted: candidate {choice} (round {round}, {submit_attempts} submit attempt(s))"
            );
            exit_codes::OK
        }
        RunStop::RoundsExhausted { max_rounds } => {
            println!("exhausted: no submission after {max_rounds} round(s)");
            exit_codes::EXHAUSTED
        }
        RunStop::SubmitAttemptsExhausted { round, attempts } => {
            println!("exhausted: submission failed {attempts} time(s) in round {round}");
            exit_codes::EXHAUSTED
        }
        RunStop::Rejected {
            round,
            exit_code,
            reason,
        } => {
            println!("rejected in round {round} (exit {exit_code:?}): {reason}");
            exit_codes::REJECTED
        }
        RunStop::Cancelled => {
            println!("cancelled after {} round(s)", outcome.rounds);
            exit_codes::CANCELLED
        }
    }
}
