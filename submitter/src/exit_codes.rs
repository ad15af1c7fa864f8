//! Stable exit codes for the submitter CLI.

/// A candidate was submitted and the judge accepted the submission.
pub const OK: i32 = 0;
/// Invalid configuration, missing credentials, unreadable problem files, or
/// any other fatal error.
pub const INVALID: i32 = 1;
/// The round cap or submit attempt cap was reached without a submission.
pub const EXHAUSTED: i32 = 2;
/// The run was interrupted before it finished.
pub const CANCELLED: i32 = 3;
/// The judge refused the submission with a terminal error.
pub const REJECTED: i32 = 4;
