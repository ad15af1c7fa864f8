//! Canonical fingerprints used to detect likely-duplicate candidates.
//!
//! The default canonicalizer is a text heuristic, not AST equality: bodies that
//! differ only in comments, whitespace or parentheses collide, and so do
//! semantically different bodies that happen to normalize to the same text.

use std::sync::LazyLock;

use regex::Regex;

static COMMENT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?m)#.*$").unwrap());
static NOISE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\s()]").unwrap());

/// Reduces a candidate body to its deduplication key.
pub trait Canonicalizer {
    fn fingerprint(&self, body: &str) -> String;
}

/// Strips `#` comments, then every whitespace and parenthesis character.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextCanonicalizer;

impl Canonicalizer for TextCanonicalizer {
    fn fingerprint(&self, body: &str) -> String {
        let without_comments = COMMENT_RE.replace_all(body, "");
        NOISE_RE.replace_all(&without_comments, "").into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spacing_and_parentheses_do_not_matter() {
        let a = "    return n*k*(k+1)//2 + n*(n+1)*k//2";
        let b = "  return n * k * (k + 1) // 2 + n * (n + 1) * k // 2";
        let canon = TextCanonicalizer;
        assert_eq!(canon.fingerprint(a), canon.fingerprint(b));
        assert_eq!(canon.fingerprint(a), "returnn*k*k+1//2+n*n+1*k//2");
    }

    #[test]
    fn comments_are_stripped_per_line() {
        let canon = TextCanonicalizer;
        let body = "def solve(N):  # entry\n    # explain\n    return N  # done\n";
        assert_eq!(canon.fingerprint(body), "defsolveN:returnN");
    }

    #[test]
    fn bare_comment_marker_is_stripped() {
        let canon = TextCanonicalizer;
        assert_eq!(canon.fingerprint("x = 1 #\ny = 2"), "x=1y=2");
    }

    #[test]
    fn fingerprint_is_idempotent() {
        let canon = TextCanonicalizer;
        let bodies = [
            "def solve(N):\n    return N # note",
            "def solve(S):\n    return S.count('#')\n",
            "  a = ( 1 )\n\t#\n  b = 2",
            "",
        ];
        for body in bodies {
            let once = canon.fingerprint(body);
            assert_eq!(canon.fingerprint(&once), once, "{body:?}");
        }
    }
}
