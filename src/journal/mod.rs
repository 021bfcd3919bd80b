//! Cycle log stream - the only channel between the controller and the monitor.
//!
//! This module provides:
//! - CycleEvent: controller milestones and their line rendering
//! - LogMarkers: the tokens the classifier recognises
//! - CycleJournal: append-only sinks (file, memory)

pub mod event;
pub mod markers;
pub mod writer;

pub use event::{CycleEvent, Level};
pub use markers::LogMarkers;
pub use writer::{CycleJournal, FileJournal, MemoryJournal};
