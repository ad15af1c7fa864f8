//! Deterministic, pure logic shared by the submitter pipeline.
//!
//! Core modules must be free of I/O side effects. They operate on in-memory
//! data structures and return deterministic outputs suitable for tests.

pub mod budget;
pub mod extract;
pub mod fingerprint;
pub mod program;
pub mod prompt;
pub mod selector;
pub mod types;
