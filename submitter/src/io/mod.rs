//! I/O helpers for the submitter pipeline.

pub mod completion;
pub mod config;
pub mod delay;
pub mod judge;
pub mod problem;
pub mod process;
pub mod submission;
