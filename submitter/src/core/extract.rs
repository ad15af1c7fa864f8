//! Candidate extraction from raw completion text.

/// Re-attach `signature` to `completion` and keep only the function body.
///
/// The body is every line that is indented (space or tab) or empty, up to the first
/// non-empty line at column zero. A blank first line (the newline that usually
/// follows the prompt's signature) is skipped. Lines are right-trimmed.
pub fn extract_function(signature: &str, completion: &str) -> String {
    let mut lines = vec![signature.trim()];

    for (i, line) in completion.lines().enumerate() {
        if i == 0 && line.is_empty() {
            continue;
        }
        if line.starts_with(|c: char| c != ' ' && c != '\t') {
            break;
        }
        lines.push(line.trim_end());
    }

    lines.join("\n")
}
