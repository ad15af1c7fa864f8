//! Submitter configuration stored in `submitter.toml`.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Submitter configuration (TOML).
///
/// Missing fields default to the values the pipeline was tuned with.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct SubmitterConfig {
    pub completion: CompletionConfig,
    pub rounds: RoundConfig,
    pub retry: RetryConfig,
    pub judge: JudgeConfig,
    pub program: ProgramConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionConfig {
    /// Completion endpoint URL.
    pub endpoint: String,

    /// Wall-clock limit for one completion request, in seconds.
    pub request_timeout_secs: u64,

    /// Tuning parameters passed through to the request body.
    pub parameters: CompletionParameters,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/engines/davinci-codex/completions".to_string(),
            request_timeout_secs: 300,
            parameters: CompletionParameters::default(),
        }
    }
}

/// Opaque sampling parameters. Unset fields are omitted from the request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompletionParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logprobs: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub best_of: Option<u32>,
}

impl Default for CompletionParameters {
    fn default() -> Self {
        Self {
            max_tokens: Some(2048),
            temperature: None,
            top_p: None,
            logprobs: None,
            presence_penalty: None,
            frequency_penalty: None,
            best_of: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RoundConfig {
    /// Completions requested by the first fetch of every round.
    pub initial_batch: usize,

    /// Completions requested when the first fetch yields at most one candidate.
    pub escalated_batch: usize,

    /// Cap on fetch/verify rounds. `0` means retry until something passes.
    pub max_rounds: u32,
}

impl RoundConfig {
    pub fn round_cap(&self) -> Option<u32> {
        (self.max_rounds > 0).then_some(self.max_rounds)
    }
}

impl Default for RoundConfig {
    fn default() -> Self {
        Self {
            initial_batch: 5,
            escalated_batch: 15,
            max_rounds: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    /// Fixed pause between submission attempts, in milliseconds.
    pub submit_delay_ms: u64,

    /// Cap on submission attempts. Absent means unbounded.
    pub max_submit_attempts: Option<u32>,

    /// Fixed pause between sample download attempts, in milliseconds.
    pub download_delay_ms: u64,

    /// Cap on sample download attempts. Absent means unbounded.
    pub max_download_attempts: Option<u32>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            submit_delay_ms: 500,
            max_submit_attempts: None,
            download_delay_ms: 500,
            max_download_attempts: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct JudgeConfig {
    /// Judge CLI invocation prefix (e.g. `["oj"]`).
    pub command: Vec<String>,

    /// Interpreter used to run a candidate under test.
    pub run_command: String,

    /// Language name passed to the judge on submission.
    pub language: String,

    /// Task page URL; `{contest}` and `{problem}` are substituted.
    pub task_url: String,

    /// Per-sample time limit, in seconds.
    pub time_limit_secs: u64,

    /// Per-sample memory limit, in megabytes.
    pub memory_limit_mb: u64,

    /// Wall-clock limit for one judge CLI invocation, in seconds.
    pub command_timeout_secs: u64,

    /// Truncate captured judge output beyond this many bytes.
    pub output_limit_bytes: usize,

    /// Submit exit codes that mean the judge refused the submission for good.
    pub terminal_exit_codes: Vec<i32>,
}

impl Default for JudgeConfig {
    fn default() -> Self {
        Self {
            command: vec!["oj".to_string()],
            run_command: "python".to_string(),
            language: "python".to_string(),
            task_url: "https://atcoder.jp/contests/{contest}/tasks/{contest}_{problem}"
                .to_string(),
            time_limit_secs: 1,
            memory_limit_mb: 50,
            command_timeout_secs: 120,
            output_limit_bytes: 100_000,
            terminal_exit_codes: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ProgramConfig {
    /// Function the model completes.
    pub function_name: String,

    /// Modules imported at the top of every assembled program.
    pub imports: Vec<String>,
}

impl Default for ProgramConfig {
    fn default() -> Self {
        Self {
            function_name: "solve".to_string(),
            imports: [
                "math",
                "re",
                "bisect",
                "collections",
                "heapq",
                "itertools",
                "functools",
                "fractions",
                "numpy as np",
                "numpy",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

impl SubmitterConfig {
    pub fn validate(&self) -> Result<()> {
        if self.completion.endpoint.trim().is_empty() {
            return Err(anyhow!("completion.endpoint must be non-empty"));
        }
        if self.completion.request_timeout_secs == 0 {
            return Err(anyhow!("completion.request_timeout_secs must be > 0"));
        }
        if self.rounds.initial_batch == 0 {
            return Err(anyhow!("rounds.initial_batch must be > 0"));
        }
        if self.rounds.escalated_batch == 0 {
            return Err(anyhow!("rounds.escalated_batch must be > 0"));
        }
        if self.judge.command.is_empty() || self.judge.command[0].trim().is_empty() {
            return Err(anyhow!("judge.command must be a non-empty array"));
        }
        if self.judge.command_timeout_secs == 0 {
            return Err(anyhow!("judge.command_timeout_secs must be > 0"));
        }
        if self.judge.output_limit_bytes == 0 {
            return Err(anyhow!("judge.output_limit_bytes must be > 0"));
        }
        if self.program.function_name.trim().is_empty() {
            return Err(anyhow!("program.function_name must be non-empty"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `SubmitterConfig::default()`.
pub fn load_config(path: &Path) -> Result<SubmitterConfig> {
    if !path.exists() {
        let cfg = SubmitterConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: SubmitterConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &SubmitterConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
