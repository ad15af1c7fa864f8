//! Round loop for one problem: generate, verify, submit, or try again.

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::core::budget::AttemptBudget;
use crate::core::fingerprint::TextCanonicalizer;
use crate::core::program::{CallLineRewrite, ProgramAssembler};
use crate::core::prompt::ProblemTemplate;
use crate::core::types::{Mode, TaskRef};
use crate::io::completion::CompletionClient;
use crate::io::config::SubmitterConfig;
use crate::io::delay::{CancelToken, Cancelled, Sleeper};
use crate::io::judge::Judge;
use crate::io::submission::SubmissionRenderer;
use crate::logging::LogSink;
use crate::round::fetch_candidates;
use crate::submit::{
    SubmissionRejected, SubmitAttemptsExhausted, SubmitRequest, Submitter,
};
use crate::verify::{Verification, Verifier};

/// Reason why `run_pipeline` stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStop {
    /// A candidate was submitted and the judge took it.
    Submitted {
        round: u32,
        choice: usize,
        submit_attempts: u32,
    },
    /// Every allowed round failed to produce a submission.
    RoundsExhausted { max_rounds: u32 },
    /// Transient submission failures outlasted the submit attempt cap.
    SubmitAttemptsExhausted { round: u32, attempts: u32 },
    /// The judge refused the submission outright.
    Rejected {
        round: u32,
        exit_code: Option<i32>,
        reason: String,
    },
    /// The cancel token fired.
    Cancelled,
}

/// Summary of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// Rounds started, including the one that stopped the run.
    pub rounds: u32,
    pub stop: RunStop,
}

/// External collaborators of the pipeline.
pub struct Services<'a, C, J, S> {
    pub client: &'a C,
    pub judge: &'a J,
    pub sleeper: &'a S,
}

/// Everything describing one run.
pub struct RunRequest<'a> {
    pub task: &'a TaskRef,
    pub template: &'a ProblemTemplate,
    pub mode: Mode,
    pub config: &'a SubmitterConfig,
    pub cancel: &'a CancelToken,
    pub sink: &'a LogSink,
}

/// Run rounds until a candidate is submitted, the round cap is hit, or the run
/// is cancelled.
///
/// A round with no eligible candidates, or none that passes verification,
/// counts against the cap and starts a fresh round. Completion, judge and
/// rendering failures stop the run with an error.
#[instrument(skip_all, fields(contest = %request.task.contest_id, problem = %request.task.problem_id, mode = ?request.mode))]
pub fn run_pipeline<C: CompletionClient, J: Judge, S: Sleeper>(
    services: &Services<'_, C, J, S>,
    request: &RunRequest<'_>,
) -> Result<RunOutcome> {
    let config = request.config;
    let renderer = SubmissionRenderer::new()?;
    let assembler = ProgramAssembler::new(&config.program.imports, CallLineRewrite);
    let pipeline = Pipeline {
        client: services.client,
        request,
        verifier: Verifier {
            judge: services.judge,
            sleeper: services.sleeper,
            cancel: request.cancel,
            assembler: &assembler,
            retry: &config.retry,
        },
        submitter: Submitter {
            judge: services.judge,
            sleeper: services.sleeper,
            cancel: request.cancel,
            renderer: &renderer,
            sink: request.sink,
            retry: &config.retry,
        },
    };

    let mut rounds = AttemptBudget::new(config.rounds.round_cap());
    loop {
        if request.cancel.is_cancelled() {
            return Ok(stopped(rounds.used(), RunStop::Cancelled));
        }
        let Some(round) = rounds.next_attempt() else {
            warn!(rounds = rounds.used(), "round cap reached without a submission");
            return Ok(stopped(
                rounds.used(),
                RunStop::RoundsExhausted {
                    max_rounds: config.rounds.max_rounds,
                },
            ));
        };
        info!(round, "round started");

        match pipeline.run_round(round) {
            Ok(Some(stop)) => return Ok(stopped(round, stop)),
            Ok(None) => {}
            Err(err) => {
                if err.downcast_ref::<Cancelled>().is_some() {
                    info!(round, "run cancelled");
                    return Ok(stopped(round, RunStop::Cancelled));
                }
                if let Some(exhausted) = err.downcast_ref::<SubmitAttemptsExhausted>() {
                    return Ok(stopped(
                        round,
                        RunStop::SubmitAttemptsExhausted {
                            round,
                            attempts: exhausted.attempts,
                        },
                    ));
                }
                if let Some(rejected) = err.downcast_ref::<SubmissionRejected>() {
                    warn!(round, %rejected, "judge rejected the submission");
                    return Ok(stopped(
                        round,
                        RunStop::Rejected {
                            round,
                            exit_code: rejected.exit_code,
                            reason: rejected.reason.clone(),
                        },
                    ));
                }
                return Err(err);
            }
        }
    }
}

struct Pipeline<'a, C, J, S> {
    client: &'a C,
    request: &'a RunRequest<'a>,
    verifier: Verifier<'a, J, S, CallLineRewrite>,
    submitter: Submitter<'a, J, S>,
}

impl<C: CompletionClient, J: Judge, S: Sleeper> Pipeline<'_, C, J, S> {
    /// One round. `None` means the round failed and another should start.
    fn run_round(&self, round: u32) -> Result<Option<RunStop>> {
        let request = self.request;
        let selection = fetch_candidates(
            self.client,
            &TextCanonicalizer,
            request.template,
            &request.config.rounds,
        )?;
        if selection.candidates.is_empty() {
            warn!(round, "no eligible candidates; starting a new round");
            return Ok(None);
        }

        let verification = self.verifier.verify(
            request.mode,
            request.task,
            request.template,
            &selection.candidates,
        )?;
        let (candidate, program) = match verification {
            Verification::Chosen { candidate, program } => (candidate, program),
            Verification::Exhausted { outcomes } => {
                info!(
                    round,
                    tested = outcomes.len(),
                    "no candidate passed; starting a new round"
                );
                return Ok(None);
            }
        };

        let receipt = self.submitter.submit(&SubmitRequest {
            task: request.task,
            program: &program,
            chosen: &candidate,
            all_candidates: &selection.all_candidates,
        })?;
        Ok(Some(RunStop::Submitted {
            round,
            choice: receipt.choice,
            submit_attempts: receipt.attempts,
        }))
    }
}

fn stopped(rounds: u32, stop: RunStop) -> RunOutcome {
    RunOutcome { rounds, stop }
}
