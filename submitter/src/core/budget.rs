//! Attempt budgets for rounds and retries.

/// Counts attempts against an optional cap. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptBudget {
    limit: Option<u32>,
    used: u32,
}

impl AttemptBudget {
    pub fn new(limit: Option<u32>) -> Self {
        Self { limit, used: 0 }
    }

    /// Claim the next attempt, returning its 1-indexed number, or `None` once the cap is hit.
    pub fn next_attempt(&mut self) -> Option<u32> {
        if self.limit.is_some_and(|limit| self.used >= limit) {
            return None;
        }
        self.used += 1;
        Some(self.used)
    }

    pub fn used(&self) -> u32 {
        self.used
    }
}
