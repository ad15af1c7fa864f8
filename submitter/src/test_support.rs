//! Test-only collaborators with scripted behavior.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::Path;
use std::time::Duration;

use anyhow::{Result, anyhow};

use crate::core::prompt::ProblemTemplate;
use crate::core::types::{Completion, DownloadStatus, SubmitStatus, TaskRef, TestVerdict};
use crate::io::completion::CompletionClient;
use crate::io::config::SubmitterConfig;
use crate::io::delay::{CancelToken, Cancelled, Sleeper};
use crate::io::judge::Judge;

/// Skeleton in the shape produced by the judge tooling.
pub const SKELETON: &str = "#!/usr/bin/env python3\nimport sys\n\n\ndef solve(n: int, k: int):\n    return\n\n\ndef main():\n    n, k = map(int, input().split())\n    solve(n, k)\n\n\nif __name__ == '__main__':\n    main()\n";

/// Template built from [`SKELETON`] with a one-line statement.
pub fn sample_template() -> ProblemTemplate {
    ProblemTemplate::from_skeleton(
        SKELETON,
        "solve",
        &["Sum the room numbers.".to_string()],
    )
    .expect("sample skeleton should parse")
}

pub fn sample_task() -> TaskRef {
    TaskRef::new("abc200", "c")
}

/// Default config with a single header import.
pub fn test_config() -> SubmitterConfig {
    let mut config = SubmitterConfig::default();
    config.program.imports = vec!["math".to_string()];
    config
}

/// Completion body that returns `expr`, in the shape the service streams back.
pub fn returning(expr: &str) -> String {
    format!("\n    return {expr}\n")
}

/// Completion client that replays batches in order and records requested sizes.
pub struct ScriptedCompletionClient {
    batches: RefCell<VecDeque<Vec<String>>>,
    requests: RefCell<Vec<usize>>,
}

impl ScriptedCompletionClient {
    pub fn new(batches: Vec<Vec<String>>) -> Self {
        Self {
            batches: RefCell::new(batches.into()),
            requests: RefCell::new(Vec::new()),
        }
    }

    /// Batch sizes requested so far, in call order.
    pub fn requests(&self) -> Vec<usize> {
        self.requests.borrow().clone()
    }
}

impl CompletionClient for ScriptedCompletionClient {
    fn complete(&self, _prompt: &str, n: usize) -> Result<Vec<Completion>> {
        self.requests.borrow_mut().push(n);
        let batch = self
            .batches
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted completions left"))?;
        Ok(batch
            .into_iter()
            .enumerate()
            .map(|(index, text)| Completion { index, text })
            .collect())
    }
}

/// Judge that replays scripted results and records every program it sees.
#[derive(Default)]
pub struct ScriptedJudge {
    downloads: RefCell<VecDeque<DownloadStatus>>,
    verdicts: RefCell<VecDeque<TestVerdict>>,
    submissions: RefCell<VecDeque<SubmitStatus>>,
    download_calls: RefCell<u32>,
    tested: RefCell<Vec<String>>,
    submitted: RefCell<Vec<String>>,
}

impl ScriptedJudge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Download results to replay; once exhausted, downloads succeed.
    pub fn with_downloads(self, downloads: Vec<DownloadStatus>) -> Self {
        *self.downloads.borrow_mut() = downloads.into();
        self
    }

    pub fn with_verdicts(self, verdicts: Vec<TestVerdict>) -> Self {
        *self.verdicts.borrow_mut() = verdicts.into();
        self
    }

    pub fn with_submissions(self, submissions: Vec<SubmitStatus>) -> Self {
        *self.submissions.borrow_mut() = submissions.into();
        self
    }

    pub fn download_calls(&self) -> u32 {
        *self.download_calls.borrow()
    }

    /// Programs passed to `test`, in call order.
    pub fn tested(&self) -> Vec<String> {
        self.tested.borrow().clone()
    }

    /// Rendered submissions passed to `submit`, in call order.
    pub fn submitted(&self) -> Vec<String> {
        self.submitted.borrow().clone()
    }
}

impl Judge for ScriptedJudge {
    fn download_samples(&self, _task: &TaskRef, _dir: &Path) -> Result<DownloadStatus> {
        *self.download_calls.borrow_mut() += 1;
        Ok(self
            .downloads
            .borrow_mut()
            .pop_front()
            .unwrap_or(DownloadStatus::Ready))
    }

    fn test(&self, source: &str, _samples: &Path) -> Result<TestVerdict> {
        self.tested.borrow_mut().push(source.to_string());
        self.verdicts
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted verdicts left"))
    }

    fn submit(&self, _task: &TaskRef, source: &str) -> Result<SubmitStatus> {
        self.submitted.borrow_mut().push(source.to_string());
        self.submissions
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("no scripted submissions left"))
    }
}

/// Sleeper that records requested delays without sleeping.
///
/// Optionally fires the cancel token on the n-th sleep (1-indexed).
#[derive(Default)]
pub struct RecordingSleeper {
    delays: RefCell<Vec<Duration>>,
    cancel_on: Option<usize>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancelling_on(sleep_number: usize) -> Self {
        Self {
            delays: RefCell::new(Vec::new()),
            cancel_on: Some(sleep_number),
        }
    }

    pub fn delays(&self) -> Vec<Duration> {
        self.delays.borrow().clone()
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, delay: Duration, cancel: &CancelToken) -> Result<(), Cancelled> {
        cancel.check()?;
        self.delays.borrow_mut().push(delay);
        if self.cancel_on == Some(self.delays.borrow().len()) {
            cancel.cancel();
            return Err(Cancelled);
        }
        Ok(())
    }
}
