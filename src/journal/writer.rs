//! Append-only sinks for the cycle log.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::Utc;

use super::event::{CycleEvent, Level};
use crate::error::Result;

/// Sink for controller milestones.
pub trait CycleJournal: Send + Sync {
    /// Append one event. Failures are reported but never stop the controller.
    fn record(&self, event: &CycleEvent) -> Result<()>;
}

impl<J: CycleJournal + ?Sized> CycleJournal for Arc<J> {
    fn record(&self, event: &CycleEvent) -> Result<()> {
        (**self).record(event)
    }
}

fn mirror(event: &CycleEvent) {
    match event.level() {
        Level::Info => log::info!("{}", event),
        Level::Warn => log::warn!("{}", event),
        Level::Error => log::error!("{}", event),
    }
}

/// Appends timestamped lines to a file, reopening it per write so external
/// rotation is picked up.
#[derive(Debug)]
pub struct FileJournal {
    path: PathBuf,
}

impl FileJournal {
    /// Create a journal at `path`, creating parent directories.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CycleJournal for FileJournal {
    fn record(&self, event: &CycleEvent) -> Result<()> {
        mirror(event);
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{}", event.to_line(Utc::now()))?;
        Ok(())
    }
}

/// In-memory journal for tests and embedding.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    lines: Mutex<Vec<String>>,
}

impl MemoryJournal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every recorded line
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }

    /// Append a raw line, bypassing event rendering
    pub fn push_raw(&self, line: impl Into<String>) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(line.into());
        }
    }

    pub fn count_matching(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }
}

impl CycleJournal for MemoryJournal {
    fn record(&self, event: &CycleEvent) -> Result<()> {
        mirror(event);
        self.push_raw(event.to_line(Utc::now()));
        Ok(())
    }
}
