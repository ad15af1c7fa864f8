//! Shared deterministic types for the submitter pipeline.
//!
//! These types define stable contracts between core components. They should not
//! depend on external state or I/O and must remain deterministic across runs.

use serde::{Deserialize, Serialize};

/// Candidates whose body reaches this many characters are never eligible.
pub const MAX_CANDIDATE_LENGTH: usize = 800;

/// One sampled continuation returned by the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// Position of this continuation within its batch.
    pub index: usize,
    pub text: String,
}

impl Completion {
    pub fn new(index: usize, text: impl Into<String>) -> Self {
        Self {
            index,
            text: text.into(),
        }
    }
}

/// A bounded function body derived from exactly one [`Completion`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    /// Index of the source completion, unique within a round.
    pub source_index: usize,
    /// Raw completion text the body was extracted from.
    pub completion: String,
    /// Signature line plus the contiguous indented lines that follow it.
    pub body: String,
    pub fingerprint: String,
    /// Character count of `body`.
    pub length: usize,
}

impl Candidate {
    pub fn within_length_limit(&self) -> bool {
        self.length < MAX_CANDIDATE_LENGTH
    }
}

/// Verification mode, selected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Submit the first eligible candidate without running it locally.
    Direct,
    /// Run candidates against the sample cases and submit the first that passes.
    Tested,
}

/// Contest task addressed by the judge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRef {
    pub contest_id: String,
    pub problem_id: String,
}

impl TaskRef {
    pub fn new(contest_id: impl Into<String>, problem_id: impl Into<String>) -> Self {
        Self {
            contest_id: contest_id.into(),
            problem_id: problem_id.into(),
        }
    }

    /// Expand `{contest}` and `{problem}` in `template`. The problem id is lowercased.
    pub fn task_url(&self, template: &str) -> String {
        template
            .replace("{contest}", &self.contest_id)
            .replace("{problem}", &self.problem_id.to_lowercase())
    }
}

/// Result of running one program against the sample cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum TestVerdict {
    Pass,
    Fail { exit_code: Option<i32> },
    /// The test runner itself exceeded its wall-clock budget.
    TimedOut,
}

impl TestVerdict {
    pub fn passed(&self) -> bool {
        matches!(self, TestVerdict::Pass)
    }
}

/// Per-candidate verification record. Discarded when the round ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationOutcome {
    pub source_index: usize,
    pub verdict: TestVerdict,
}

/// Result of a sample-case download.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadStatus {
    Ready,
    Transient { exit_code: Option<i32> },
}

/// Result of a submission attempt.
///
/// `Accepted` means the judge took the submission, not that it was judged correct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitStatus {
    Accepted,
    /// Infrastructure failure; the same submission may be retried.
    Transient { exit_code: Option<i32> },
    /// The judge refuses this submission; retrying will not help.
    Rejected {
        exit_code: Option<i32>,
        reason: String,
    },
}
