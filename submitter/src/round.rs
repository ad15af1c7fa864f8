//! Candidate generation for a single round.
//!
//! A round asks the completion service for a batch, derives and deduplicates
//! candidates, and asks once more with a larger batch when the first one
//! yields at most one distinct candidate.

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::fingerprint::Canonicalizer;
use crate::core::prompt::ProblemTemplate;
use crate::core::selector::{Selection, needs_escalation, next_index_offset};
use crate::io::completion::CompletionClient;
use crate::io::config::RoundConfig;

/// Fetch completions and build the round's candidate selection.
///
/// The escalated batch is merged into the same selection, so fingerprints seen
/// in the first batch still deduplicate the second one.
#[instrument(skip_all, fields(initial = batches.initial_batch, escalated = batches.escalated_batch))]
pub fn fetch_candidates<C: CompletionClient, K: Canonicalizer>(
    client: &C,
    canonicalizer: &K,
    template: &ProblemTemplate,
    batches: &RoundConfig,
) -> Result<Selection> {
    let prompt = template.prompt();
    let first = client
        .complete(&prompt, batches.initial_batch)
        .context("request initial batch")?;

    let mut selection = Selection::new();
    selection.absorb(&first, &template.signature, 0, canonicalizer);
    info!(
        received = first.len(),
        eligible = selection.candidates.len(),
        "initial batch processed"
    );

    if needs_escalation(&selection.candidates) {
        let offset = next_index_offset(batches.initial_batch, &first);
        info!(
            eligible = selection.candidates.len(),
            requested = batches.escalated_batch,
            "too few distinct candidates; requesting a larger batch"
        );
        let second = client
            .complete(&prompt, batches.escalated_batch)
            .context("request escalated batch")?;
        selection.absorb(&second, &template.signature, offset, canonicalizer);
        info!(
            received = second.len(),
            eligible = selection.candidates.len(),
            "escalated batch processed"
        );
    }

    Ok(selection)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::fingerprint::TextCanonicalizer;
    use crate::test_support::{ScriptedCompletionClient, returning, sample_template};

    fn batches() -> RoundConfig {
        RoundConfig {
            initial_batch: 3,
            escalated_batch: 9,
            max_rounds: 1,
        }
    }

    #[test]
    fn distinct_first_batch_does_not_escalate() {
        let client = ScriptedCompletionClient::new(vec![vec![
            returning("n + k"),
            returning("n * k"),
            returning("n - k"),
        ]]);
        let selection =
            fetch_candidates(&client, &TextCanonicalizer, &sample_template(), &batches())
                .expect("fetch");

        assert_eq!(client.requests(), vec![3]);
        assert_eq!(selection.candidates.len(), 3);
        assert_eq!(selection.all_candidates.len(), 3);
    }

    #[test]
    fn single_distinct_candidate_escalates_exactly_once() {
        let client = ScriptedCompletionClient::new(vec![
            vec![returning("n + k"), returning("n+k"), returning("(n + k)")],
            vec![returning("n + k"), returning("n * k")],
        ]);
        let selection =
            fetch_candidates(&client, &TextCanonicalizer, &sample_template(), &batches())
                .expect("fetch");

        assert_eq!(client.requests(), vec![3, 9]);
        let indices: Vec<usize> = selection
            .candidates
            .iter()
            .map(|candidate| candidate.source_index)
            .collect();
        assert_eq!(indices, vec![0, 4]);
        let all: Vec<usize> = selection
            .all_candidates
            .iter()
            .map(|candidate| candidate.source_index)
            .collect();
        assert_eq!(all, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn escalation_still_leaves_single_candidate_without_refetching() {
        let client = ScriptedCompletionClient::new(vec![
            vec![returning("n + k")],
            vec![returning("n + k")],
        ]);
        let selection =
            fetch_candidates(&client, &TextCanonicalizer, &sample_template(), &batches())
                .expect("fetch");

        assert_eq!(client.requests(), vec![3, 9]);
        assert_eq!(selection.candidates.len(), 1);
    }

    #[test]
    fn completion_failure_is_reported() {
        let client = ScriptedCompletionClient::new(Vec::new());
        let err = fetch_candidates(&client, &TextCanonicalizer, &sample_template(), &batches())
            .expect_err("no batches scripted");
        assert!(format!("{err:#}").contains("request initial batch"));
    }
}
