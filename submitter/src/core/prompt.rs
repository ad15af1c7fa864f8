//! Problem skeleton parsing and prompt construction.

use std::fmt;

/// TeX-ish statement tokens rewritten before the statement becomes comments.
///
/// Applied in order; longer tokens precede their prefixes (`\leq` before `\le`).
const STATEMENT_REWRITES: &[(&str, &str)] = &[
    ("\\neq", "!="),
    ("\\,", " "),
    ("\\times", "x"),
    ("\\leq", "<="),
    ("\\le", "<="),
    ("\\lt", "<"),
    ("\\geq", ">="),
    ("\\ge", ">="),
    ("\\gt", ">"),
    ("\\dots", "..."),
    ("\\cdots", "..."),
    ("\\ldots", "..."),
    ("^", " ** "),
    ("\\mathrm", ""),
];

/// Normalize one statement line for use inside a source comment.
pub fn normalize_statement_line(line: &str) -> String {
    let rewritten = STATEMENT_REWRITES
        .iter()
        .fold(line.to_string(), |acc, (from, to)| acc.replace(from, to));
    rewritten.trim().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    MissingFunction { function: String },
}

impl fmt::Display for TemplateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TemplateError::MissingFunction { function } => {
                write!(f, "skeleton has no `def {function}(` line")
            }
        }
    }
}

impl std::error::Error for TemplateError {}

/// A problem skeleton split around the function the model must complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProblemTemplate {
    /// Name of the function to complete (e.g. `solve`).
    pub function_name: String,
    /// Skeleton lines before the function definition.
    pub intro: String,
    /// Statement lines rendered as `# ` comments.
    pub comments: String,
    /// The `def` line, including its line ending.
    pub signature: String,
    /// Skeleton lines after the placeholder body: input parsing and the call.
    pub driver: String,
}

impl ProblemTemplate {
    /// Split `skeleton` around `def <function_name>(`.
    ///
    /// A leading shebang line is dropped. The line right after the signature is
    /// the skeleton's placeholder body and is discarded.
    pub fn from_skeleton(
        skeleton: &str,
        function_name: &str,
        statement: &[String],
    ) -> Result<Self, TemplateError> {
        let mut lines: Vec<&str> = skeleton.split_inclusive('\n').collect();
        if lines.first().is_some_and(|line| line.starts_with("#!")) {
            lines.remove(0);
        }

        let needle = format!("def {function_name}(");
        let def_index = lines
            .iter()
            .position(|line| line.trim_start().starts_with(&needle))
            .ok_or_else(|| TemplateError::MissingFunction {
                function: function_name.to_string(),
            })?;

        let comments = statement
            .iter()
            .map(|line| format!("# {}\n", normalize_statement_line(line)))
            .collect::<String>();

        Ok(Self {
            function_name: function_name.to_string(),
            intro: lines[..def_index].concat(),
            comments,
            signature: lines[def_index].to_string(),
            driver: lines.get(def_index + 2..).unwrap_or_default().concat(),
        })
    }

    /// Prompt sent to the completion service: intro, statement comments, signature.
    pub fn prompt(&self) -> String {
        format!("{}{}{}", self.intro, self.comments, self.signature)
            .trim()
            .to_string()
    }

    /// Program text that precedes the candidate body.
    pub fn preamble(&self) -> String {
        format!("{}{}", self.intro, self.comments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKELETON: &str = "#!/usr/bin/env python3\nimport sys\n\n\ndef solve(N: int, K: int):\n    return\n\n\ndef main():\n    N = int(input())\n    K = int(input())\n    solve(N, K)\n";

    fn statement() -> Vec<String> {
        vec![
            "Find the sum for 1 \\leq N \\le 9.".to_string(),
            "  Print it.  ".to_string(),
        ]
    }

    #[test]
    fn splits_skeleton_around_function() {
        let template = ProblemTemplate::from_skeleton(SKELETON, "solve", &statement())
            .expect("template");
        assert_eq!(template.intro, "import sys\n\n\n");
        assert_eq!(template.signature, "def solve(N: int, K: int):\n");
        assert_eq!(
            template.driver,
            "\n\ndef main():\n    N = int(input())\n    K = int(input())\n    solve(N, K)\n"
        );
        assert_eq!(
            template.comments,
            "# Find the sum for 1 <= N <= 9.\n# Print it.\n"
        );
    }

    #[test]
    fn prompt_ends_with_signature() {
        let template = ProblemTemplate::from_skeleton(SKELETON, "solve", &statement())
            .expect("template");
        let prompt = template.prompt();
        assert!(prompt.starts_with("import sys"));
        assert!(prompt.ends_with("def solve(N: int, K: int):"));
        assert!(prompt.contains("# Print it.\ndef solve"));
    }

    #[test]
    fn missing_function_is_an_error() {
        let err = ProblemTemplate::from_skeleton("print(1)\n", "solve", &[]).unwrap_err();
        assert_eq!(
            err,
            TemplateError::MissingFunction {
                function: "solve".to_string()
            }
        );
    }

    #[test]
    fn normalizes_tex_tokens() {
        assert_eq!(normalize_statement_line("2^N \\times M"), "2 ** N x M");
        assert_eq!(normalize_statement_line("A_1, \\ldots, A_N"), "A_1, ..., A_N");
        assert_eq!(normalize_statement_line("A \\neq B"), "A != B");
        assert_eq!(normalize_statement_line("\\mathrm{Yes}"), "{Yes}");
    }
}
