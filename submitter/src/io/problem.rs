//! Loading problem skeletons and statements from a problem directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{debug, info};

use crate::core::prompt::ProblemTemplate;

/// Skeleton source generated by the judge tooling.
pub const SKELETON_FILE: &str = "main.py";
/// Statement text, one paragraph line per line.
pub const STATEMENT_FILE: &str = "statement.txt";

/// Default problem directory: `workspace/<contest>/<PROBLEM>`.
pub fn default_problem_dir(root: &Path, contest_id: &str, problem_id: &str) -> PathBuf {
    root.join("workspace")
        .join(contest_id)
        .join(problem_id.to_uppercase())
}

/// Read the skeleton and statement from `dir` and split the skeleton around `function_name`.
///
/// A missing statement file yields an empty statement.
pub fn load_problem(dir: &Path, function_name: &str) -> Result<ProblemTemplate> {
    let skeleton_path = dir.join(SKELETON_FILE);
    let skeleton = fs::read_to_string(&skeleton_path)
        .with_context(|| format!("read {}", skeleton_path.display()))?;

    let statement_path = dir.join(STATEMENT_FILE);
    let statement: Vec<String> = if statement_path.exists() {
        fs::read_to_string(&statement_path)
            .with_context(|| format!("read {}", statement_path.display()))?
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(str::to_string)
            .collect()
    } else {
        debug!(path = %statement_path.display(), "no statement file");
        Vec::new()
    };

    let template = ProblemTemplate::from_skeleton(&skeleton, function_name, &statement)
        .with_context(|| format!("parse {}", skeleton_path.display()))?;
    info!(
        signature = template.signature.trim(),
        statement_lines = statement.len(),
        "loaded problem template"
    );
    Ok(template)
}
