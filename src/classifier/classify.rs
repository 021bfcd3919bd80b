//! Marker-based application status inference.

use crate::domain::AppState;
use crate::journal::LogMarkers;

/// Default number of tail lines retained
pub const DEFAULT_RETAINED_LINES: usize = 50;

/// Default number of most recent lines the verdict is based on
pub const DEFAULT_DECISION_WINDOW: usize = 10;

/// Result of classifying a log tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Classification {
    pub state: AppState,
    /// Restart markers in the retained window.
    ///
    /// Log-derived and lagging: it only sees what is still in the tail, so it
    /// can differ from the controller's own restart counter.
    pub restart_count: u32,
    /// Lines actually retained from the input
    pub lines_considered: usize,
}

/// Derives a coarse application state from cycle log lines.
#[derive(Debug, Clone)]
pub struct LogClassifier {
    markers: LogMarkers,
    retained: usize,
    window: usize,
}

impl LogClassifier {
    /// `window` is capped at `retained`
    pub fn new(markers: LogMarkers, retained: usize, window: usize) -> Self {
        Self {
            markers,
            retained,
            window: window.min(retained),
        }
    }

    pub fn retained(&self) -> usize {
        self.retained
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn markers(&self) -> &LogMarkers {
        &self.markers
    }

    /// Classify `tail_lines` (oldest first).
    ///
    /// Error markers in the recent window win over success markers; with
    /// neither present the application is considered running.
    pub fn classify<S: AsRef<str>>(&self, tail_lines: &[S]) -> Classification {
        let retained = &tail_lines[tail_lines.len().saturating_sub(self.retained)..];
        let recent = &retained[retained.len().saturating_sub(self.window)..];

        let state = if recent.iter().any(|l| self.markers.is_error(l.as_ref())) {
            AppState::Error
        } else if recent.iter().any(|l| self.markers.is_success(l.as_ref())) {
            AppState::Healthy
        } else {
            AppState::Running
        };

        let restart_count = retained
            .iter()
            .filter(|l| self.markers.is_restart(l.as_ref()))
            .count() as u32;

        Classification {
            state,
            restart_count,
            lines_considered: retained.len(),
        }
    }
}

impl Default for LogClassifier {
    fn default() -> Self {
        Self::new(LogMarkers::default(), DEFAULT_RETAINED_LINES, DEFAULT_DECISION_WINDOW)
    }
}
