//! Submission with fixed-delay retry.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, instrument, warn};

use crate::core::budget::AttemptBudget;
use crate::core::types::{Candidate, SubmitStatus, TaskRef};
use crate::io::config::RetryConfig;
use crate::io::delay::{CancelToken, Sleeper};
use crate::io::judge::Judge;
use crate::io::submission::{SubmissionInput, SubmissionRenderer};
use crate::logging::LogSink;

/// The judge refused the submission for a reason retrying cannot fix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmissionRejected {
    pub exit_code: Option<i32>,
    pub reason: String,
}

impl fmt::Display for SubmissionRejected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "submission rejected (exit {code}): {}", self.reason),
            None => write!(f, "submission rejected: {}", self.reason),
        }
    }
}

impl std::error::Error for SubmissionRejected {}

/// The submit attempt cap was reached while failures were still transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitAttemptsExhausted {
    pub attempts: u32,
}

impl fmt::Display for SubmitAttemptsExhausted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "submission still failing after {} attempts", self.attempts)
    }
}

impl std::error::Error for SubmitAttemptsExhausted {}

/// Outcome of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitReceipt {
    pub choice: usize,
    pub attempts: u32,
}

/// What gets submitted.
pub struct SubmitRequest<'a> {
    pub task: &'a TaskRef,
    pub program: &'a str,
    pub chosen: &'a Candidate,
    /// Audit trail embedded in the submission.
    pub all_candidates: &'a [Candidate],
}

/// Collaborators for the submit loop.
pub struct Submitter<'a, J, S> {
    pub judge: &'a J,
    pub sleeper: &'a S,
    pub cancel: &'a CancelToken,
    pub renderer: &'a SubmissionRenderer,
    pub sink: &'a LogSink,
    pub retry: &'a RetryConfig,
}

impl<J: Judge, S: Sleeper> Submitter<'_, J, S> {
    /// Submit until the judge accepts, retrying transient failures after a
    /// fixed delay.
    ///
    /// The execution log is re-captured on every attempt so the submitted file
    /// records the earlier failures too.
    #[instrument(skip_all, fields(choice = request.chosen.source_index))]
    pub fn submit(&self, request: &SubmitRequest<'_>) -> Result<SubmitReceipt> {
        let choice = request.chosen.source_index;
        let delay = Duration::from_millis(self.retry.submit_delay_ms);
        let mut budget = AttemptBudget::new(self.retry.max_submit_attempts);

        loop {
            let Some(attempt) = budget.next_attempt() else {
                return Err(SubmitAttemptsExhausted {
                    attempts: budget.used(),
                }
                .into());
            };
            self.cancel.check()?;

            let execution_log = self.sink.snapshot();
            let rendered = self.renderer.render(&SubmissionInput {
                program: request.program,
                execution_log: &execution_log,
                candidates: request.all_candidates,
                choice,
            })?;

            match self
                .judge
                .submit(request.task, &rendered)
                .context("submit to judge")?
            {
                SubmitStatus::Accepted => {
                    info!(attempt, "submission accepted");
                    return Ok(SubmitReceipt {
                        choice,
                        attempts: attempt,
                    });
                }
                SubmitStatus::Transient { exit_code } => {
                    warn!(attempt, ?exit_code, "submission failed; retrying");
                    self.sleeper.sleep(delay, self.cancel)?;
                }
                SubmitStatus::Rejected { exit_code, reason } => {
                    return Err(SubmissionRejected { exit_code, reason }.into());
                }
            }
        }
    }
}
