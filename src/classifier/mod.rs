//! Log classifier - coarse application status from the cycle log tail.

pub mod classify;
pub mod tail;

pub use classify::{Classification, DEFAULT_DECISION_WINDOW, DEFAULT_RETAINED_LINES, LogClassifier};
pub use tail::{FileLogSource, LogSource, read_tail};
