//! Assembly of runnable programs from candidates.
//!
//! The print injection is a line-pattern heuristic over the driver text. It sits
//! behind [`DriverRewrite`] so a parser-based rewrite can replace it without
//! touching the pipeline.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;

use crate::core::prompt::ProblemTemplate;
use crate::core::types::Candidate;

/// `print` as a word outside `#` comments.
static PRINT_CALL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^[^#\n]*\bprint\b").unwrap());

/// Rewrites driver code so the function's return value gets printed.
pub trait DriverRewrite {
    /// Return the rewritten driver, or `None` when no call line was recognized.
    fn wrap_call_in_print(&self, driver: &str, function_name: &str) -> Option<String>;
}

/// Wraps every line that consists solely of `<function>(...)` in `print(...)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallLineRewrite;

impl DriverRewrite for CallLineRewrite {
    fn wrap_call_in_print(&self, driver: &str, function_name: &str) -> Option<String> {
        let pattern = format!(
            r"(?m)^([ \t]*)({}\(.*\))[ \t]*\r?$",
            regex::escape(function_name)
        );
        let re = Regex::new(&pattern).ok()?;
        if !re.is_match(driver) {
            return None;
        }
        Some(re.replace_all(driver, "${1}print(${2})").into_owned())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgramError {
    /// The completion never prints and the driver has no call line to wrap.
    DriverCallNotFound { function: String },
}

impl fmt::Display for ProgramError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramError::DriverCallNotFound { function } => write!(
                f,
                "completion does not print and the driver has no `{function}(...)` line to wrap"
            ),
        }
    }
}

impl std::error::Error for ProgramError {}

/// Builds the program text submitted for one candidate.
#[derive(Debug, Clone)]
pub struct ProgramAssembler<R> {
    header: String,
    rewrite: R,
}

impl<R: DriverRewrite> ProgramAssembler<R> {
    /// `imports` become `import <entry>` header lines, in order.
    pub fn new(imports: &[String], rewrite: R) -> Self {
        let header = imports
            .iter()
            .map(|module| format!("import {module}\n"))
            .collect();
        Self { header, rewrite }
    }

    /// Header, template preamble, the signature with the raw completion, then
    /// the driver.
    ///
    /// The whole completion is emitted, so helpers defined after the solve
    /// function survive. The print check reads exactly the emitted text.
    pub fn assemble(
        &self,
        template: &ProblemTemplate,
        candidate: &Candidate,
    ) -> Result<String, ProgramError> {
        let solution = format!(
            "{}{}",
            template.signature.trim_end(),
            candidate.completion.trim_end()
        );
        let driver = if prints_output(&solution) {
            template.driver.clone()
        } else {
            self.rewrite
                .wrap_call_in_print(&template.driver, &template.function_name)
                .ok_or_else(|| ProgramError::DriverCallNotFound {
                    function: template.function_name.clone(),
                })?
        };

        let mut program = String::new();
        program.push_str(&self.header);
        program.push_str(&template.preamble());
        program.push_str(&solution);
        program.push_str("\n\n");
        program.push_str(&driver);
        Ok(program)
    }
}

/// Whether `code` calls `print` anywhere outside a comment.
fn prints_output(code: &str) -> bool {
    PRINT_CALL_RE.is_match(code)
}
