//! Judge adapter for sample download, local testing and submission.
//!
//! The [`Judge`] trait decouples the pipeline from the judge CLI (currently
//! `oj`). Tests use scripted judges that return predetermined results without
//! spawning processes.

use std::io::Write;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result};
use tempfile::NamedTempFile;
use tracing::{debug, info, instrument, warn};

use crate::core::types::{DownloadStatus, SubmitStatus, TaskRef, TestVerdict};
use crate::io::config::JudgeConfig;
use crate::io::process::{CommandLimits, CommandOutput, run_command};

/// Abstraction over the external judge.
pub trait Judge {
    /// Download the task's sample cases into `dir`.
    fn download_samples(&self, task: &TaskRef, dir: &Path) -> Result<DownloadStatus>;

    /// Run `source` against the sample cases in `samples`.
    fn test(&self, source: &str, samples: &Path) -> Result<TestVerdict>;

    /// Hand `source` to the judge as a submission for `task`.
    fn submit(&self, task: &TaskRef, source: &str) -> Result<SubmitStatus>;
}

/// Judge backed by the `oj` command line tool.
pub struct OjJudge {
    config: JudgeConfig,
}

impl OjJudge {
    pub fn new(config: JudgeConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.command[0]);
        cmd.args(&self.config.command[1..]);
        cmd
    }

    fn limits(&self) -> CommandLimits {
        CommandLimits {
            timeout: Duration::from_secs(self.config.command_timeout_secs),
            output_limit_bytes: self.config.output_limit_bytes,
        }
    }
}

impl Judge for OjJudge {
    #[instrument(skip_all, fields(contest = %task.contest_id, problem = %task.problem_id))]
    fn download_samples(&self, task: &TaskRef, dir: &Path) -> Result<DownloadStatus> {
        let url = task.task_url(&self.config.task_url);
        info!(%url, "downloading sample cases");
        let mut cmd = self.command();
        cmd.arg("download").arg(&url).arg("--directory").arg(dir);

        let output = run_command(cmd, self.limits()).context("run judge download")?;
        if output.success() {
            return Ok(DownloadStatus::Ready);
        }
        warn!(exit_code = ?output.exit_code(), detail = %output.last_line(), "sample download failed");
        Ok(DownloadStatus::Transient {
            exit_code: output.exit_code(),
        })
    }

    #[instrument(skip_all, fields(samples = %samples.display()))]
    fn test(&self, source: &str, samples: &Path) -> Result<TestVerdict> {
        let program = write_program(source)?;
        let mut cmd = self.command();
        cmd.arg("test")
            .arg("--command")
            .arg(format!(
                "{} {}",
                self.config.run_command,
                program.path().display()
            ))
            .arg("--directory")
            .arg(samples)
            .arg("--mle")
            .arg(self.config.memory_limit_mb.to_string())
            .arg("--tle")
            .arg(self.config.time_limit_secs.to_string());

        let output = run_command(cmd, self.limits()).context("run judge test")?;
        let verdict = classify_test(&output);
        debug!(?verdict, "sample test finished");
        Ok(verdict)
    }

    #[instrument(skip_all, fields(contest = %task.contest_id, problem = %task.problem_id))]
    fn submit(&self, task: &TaskRef, source: &str) -> Result<SubmitStatus> {
        let program = write_program(source)?;
        let url = task.task_url(&self.config.task_url);
        let mut cmd = self.command();
        cmd.arg("submit")
            .arg(&url)
            .arg(program.path())
            .arg("--wait")
            .arg("0")
            .arg("--yes")
            .arg("--language")
            .arg(&self.config.language);

        let output = run_command(cmd, self.limits()).context("run judge submit")?;
        Ok(classify_submit(&output, &self.config.terminal_exit_codes))
    }
}

fn write_program(source: &str) -> Result<NamedTempFile> {
    let mut file = tempfile::Builder::new()
        .prefix("candidate-")
        .suffix(".py")
        .tempfile()
        .context("create program file")?;
    file.write_all(source.as_bytes())
        .context("write program file")?;
    file.flush().context("flush program file")?;
    Ok(file)
}

fn classify_test(output: &CommandOutput) -> TestVerdict {
    if output.timed_out {
        TestVerdict::TimedOut
    } else if output.status.success() {
        TestVerdict::Pass
    } else {
        TestVerdict::Fail {
            exit_code: output.exit_code(),
        }
    }
}

fn classify_submit(output: &CommandOutput, terminal_exit_codes: &[i32]) -> SubmitStatus {
    if output.success() {
        return SubmitStatus::Accepted;
    }
    match output.exit_code() {
        Some(code) if !output.timed_out && terminal_exit_codes.contains(&code) => {
            SubmitStatus::Rejected {
                exit_code: Some(code),
                reason: output.last_line(),
            }
        }
        exit_code => SubmitStatus::Transient { exit_code },
    }
}
