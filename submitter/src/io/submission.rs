//! Submission rendering.
//!
//! The submitted file carries the program plus an audit trail: the execution
//! log up to the moment of submission, every candidate generated in the run,
//! and the index of the chosen one.

use std::sync::LazyLock;

use anyhow::{Context, Result};
use minijinja::{Environment, context};
use regex::Regex;
use serde::Serialize;

use crate::core::types::Candidate;

const SUBMISSION_TEMPLATE: &str = include_str!("templates/submission.py.jinja");

static QUOTE_RUN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"'+").unwrap());
static CHOICE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^# choice: (\d+)\s*$").unwrap());

/// Everything embedded in one rendered submission.
#[derive(Debug, Clone)]
pub struct SubmissionInput<'a> {
    /// Assembled program source.
    pub program: &'a str,
    /// Log snapshot taken right before rendering.
    pub execution_log: &'a str,
    /// Every candidate derived in the current run, eligible or not.
    pub candidates: &'a [Candidate],
    /// `source_index` of the submitted candidate.
    pub choice: usize,
}

#[derive(Debug, Serialize)]
struct AuditEntry<'a> {
    index: usize,
    lines: Vec<&'a str>,
}

/// Template engine wrapper around minijinja.
pub struct SubmissionRenderer {
    env: Environment<'static>,
}

impl SubmissionRenderer {
    pub fn new() -> Result<Self> {
        let mut env = Environment::new();
        env.set_keep_trailing_newline(true);
        env.add_template("submission.py", SUBMISSION_TEMPLATE)
            .context("load submission template")?;
        Ok(Self { env })
    }

    pub fn render(&self, input: &SubmissionInput<'_>) -> Result<String> {
        let candidates: Vec<AuditEntry<'_>> = input
            .candidates
            .iter()
            .map(|candidate| AuditEntry {
                index: candidate.source_index,
                lines: candidate.body.lines().collect(),
            })
            .collect();
        let template = self.env.get_template("submission.py")?;
        let rendered = template
            .render(context! {
                code => input.program.trim_end(),
                execution_log => normalize_execution_log(input.execution_log).trim_end(),
                candidates => candidates,
                choice => input.choice,
            })
            .context("render submission")?;
        Ok(rendered)
    }
}

/// Collapse runs of single quotes so the log cannot close its string literal early.
pub fn normalize_execution_log(log: &str) -> String {
    QUOTE_RUN_RE.replace_all(log, "'").into_owned()
}

/// Read the chosen candidate index back out of a rendered submission.
pub fn parse_choice(rendered: &str) -> Option<usize> {
    CHOICE_RE
        .captures_iter(rendered)
        .last()
        .and_then(|caps| caps[1].parse().ok())
}
