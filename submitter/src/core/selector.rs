//! Deterministic candidate selection from a batch of completions.

use std::collections::HashSet;

use crate::core::extract::extract_function;
use crate::core::fingerprint::Canonicalizer;
use crate::core::types::{Candidate, Completion};

/// Ordered, fingerprint-unique sequence of eligible candidates.
///
/// Insertion order is preserved and the first candidate with a given
/// fingerprint wins; later duplicates are dropped.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    members: Vec<Candidate>,
    fingerprints: HashSet<String>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `candidate` if it is within the length limit and its fingerprint is new.
    ///
    /// Returns whether the candidate was accepted.
    pub fn try_insert(&mut self, candidate: Candidate) -> bool {
        if !candidate.within_length_limit() || self.fingerprints.contains(&candidate.fingerprint) {
            return false;
        }
        self.fingerprints.insert(candidate.fingerprint.clone());
        self.members.push(candidate);
        true
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Candidate> {
        self.members.iter()
    }
}

impl<'a> IntoIterator for &'a CandidateSet {
    type Item = &'a Candidate;
    type IntoIter = std::slice::Iter<'a, Candidate>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Candidates derived during one round.
#[derive(Debug, Clone, Default)]
pub struct Selection {
    /// Eligible, deduplicated candidates in first-occurrence order.
    pub candidates: CandidateSet,
    /// Every derived candidate, eligible or not, kept for the audit trail.
    pub all_candidates: Vec<Candidate>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive a candidate from each completion and register the eligible ones.
    ///
    /// `index_offset` is added to every completion index so that indices stay
    /// unique when several batches feed the same round.
    pub fn absorb<C: Canonicalizer>(
        &mut self,
        completions: &[Completion],
        signature: &str,
        index_offset: usize,
        canonicalizer: &C,
    ) {
        for completion in completions {
            let body = extract_function(signature, &completion.text);
            let candidate = Candidate {
                source_index: completion.index + index_offset,
                completion: completion.text.clone(),
                fingerprint: canonicalizer.fingerprint(&body),
                length: body.chars().count(),
                body,
            };
            self.all_candidates.push(candidate.clone());
            self.candidates.try_insert(candidate);
        }
    }
}

/// Build a [`Selection`] from a single batch.
pub fn select_candidates<C: Canonicalizer>(
    completions: &[Completion],
    signature: &str,
    canonicalizer: &C,
) -> Selection {
    let mut selection = Selection::new();
    selection.absorb(completions, signature, 0, canonicalizer);
    selection
}

/// A set with at most one member calls for a larger batch before giving up.
pub fn needs_escalation(set: &CandidateSet) -> bool {
    set.len() <= 1
}

/// Offset for indices of a batch that follows one of `requested` completions.
///
/// Uses the larger of the requested size and the highest index actually seen,
/// so a service that numbers its choices sparsely cannot cause collisions.
pub fn next_index_offset(requested: usize, completions: &[Completion]) -> usize {
    let seen = completions
        .iter()
        .map(|completion| completion.index + 1)
        .max()
        .unwrap_or(0);
    requested.max(seen)
}
