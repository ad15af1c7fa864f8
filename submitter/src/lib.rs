//! Sampled-completion solution submitter.
//!
//! For one competitive-programming task, the submitter samples candidate
//! function bodies from a completion service, deduplicates them by a
//! whitespace-insensitive fingerprint, optionally tests them against the
//! task's sample cases, and submits the first viable one with an audit trail
//! attached. Failed rounds regenerate; transient judge failures retry after a
//! fixed delay.
//!
//! - **[`core`]**: Pure logic (extraction, fingerprinting, selection, program
//!   assembly). No I/O.
//! - **[`io`]**: Completion service, judge CLI, config, problem files and
//!   submission rendering.
//!
//! Orchestration modules ([`round`], [`verify`], [`submit`], [`controller`])
//! tie them together.

pub mod controller;
pub mod core;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod round;
pub mod submit;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod verify;
