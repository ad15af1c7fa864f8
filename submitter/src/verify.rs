//! Candidate verification for a single round.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use tracing::{info, instrument, warn};

use crate::core::budget::AttemptBudget;
use crate::core::program::{DriverRewrite, ProgramAssembler};
use crate::core::prompt::ProblemTemplate;
use crate::core::selector::CandidateSet;
use crate::core::types::{Candidate, DownloadStatus, Mode, TaskRef, VerificationOutcome};
use crate::io::config::RetryConfig;
use crate::io::delay::{CancelToken, Sleeper};
use crate::io::judge::Judge;

/// Result of verifying one round's candidates.
#[derive(Debug, Clone)]
pub enum Verification {
    /// Candidate to submit, with its assembled program.
    Chosen { candidate: Candidate, program: String },
    /// Nothing in the set qualified; the round failed.
    Exhausted { outcomes: Vec<VerificationOutcome> },
}

/// Collaborators shared by both verification modes.
pub struct Verifier<'a, J, S, R> {
    pub judge: &'a J,
    pub sleeper: &'a S,
    pub cancel: &'a CancelToken,
    pub assembler: &'a ProgramAssembler<R>,
    pub retry: &'a RetryConfig,
}

impl<J: Judge, S: Sleeper, R: DriverRewrite> Verifier<'_, J, S, R> {
    /// Pick the candidate to submit according to `mode`.
    pub fn verify(
        &self,
        mode: Mode,
        task: &TaskRef,
        template: &ProblemTemplate,
        candidates: &CandidateSet,
    ) -> Result<Verification> {
        match mode {
            Mode::Direct => Ok(self.first_assemblable(template, candidates)),
            Mode::Tested => self.first_passing(task, template, candidates),
        }
    }

    /// Direct mode: the first candidate whose program can be assembled.
    fn first_assemblable(
        &self,
        template: &ProblemTemplate,
        candidates: &CandidateSet,
    ) -> Verification {
        for candidate in candidates {
            if let Some(program) = self.assemble(template, candidate) {
                info!(choice = candidate.source_index, "submitting without local tests");
                return Verification::Chosen {
                    candidate: candidate.clone(),
                    program,
                };
            }
        }
        Verification::Exhausted {
            outcomes: Vec::new(),
        }
    }

    /// Tested mode: download samples, then test candidates in order and stop at
    /// the first that passes.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    fn first_passing(
        &self,
        task: &TaskRef,
        template: &ProblemTemplate,
        candidates: &CandidateSet,
    ) -> Result<Verification> {
        let samples = tempfile::tempdir().context("create sample directory")?;
        self.download_with_retry(task, samples.path())?;

        let mut outcomes = Vec::new();
        for candidate in candidates {
            self.cancel.check()?;
            let Some(program) = self.assemble(template, candidate) else {
                continue;
            };

            let verdict = self
                .judge
                .test(&program, samples.path())
                .with_context(|| format!("test candidate {}", candidate.source_index))?;
            outcomes.push(VerificationOutcome {
                source_index: candidate.source_index,
                verdict,
            });

            if verdict.passed() {
                info!(choice = candidate.source_index, "sample cases passed");
                return Ok(Verification::Chosen {
                    candidate: candidate.clone(),
                    program,
                });
            }
            info!(
                candidate = candidate.source_index,
                ?verdict,
                "sample cases failed; trying the next candidate"
            );
        }

        Ok(Verification::Exhausted { outcomes })
    }

    fn download_with_retry(&self, task: &TaskRef, dir: &Path) -> Result<()> {
        let delay = Duration::from_millis(self.retry.download_delay_ms);
        let mut budget = AttemptBudget::new(self.retry.max_download_attempts);
        loop {
            let Some(attempt) = budget.next_attempt() else {
                bail!(
                    "sample download still failing after {} attempts",
                    budget.used()
                );
            };
            self.cancel.check()?;
            match self
                .judge
                .download_samples(task, dir)
                .context("download sample cases")?
            {
                DownloadStatus::Ready => return Ok(()),
                DownloadStatus::Transient { exit_code } => {
                    info!(attempt, ?exit_code, "sample download failed; retrying");
                    self.sleeper.sleep(delay, self.cancel)?;
                }
            }
        }
    }

    fn assemble(&self, template: &ProblemTemplate, candidate: &Candidate) -> Option<String> {
        match self.assembler.assemble(template, candidate) {
            Ok(program) => Some(program),
            Err(err) => {
                warn!(candidate = candidate.source_index, %err, "skipping candidate");
                None
            }
        }
    }
}
