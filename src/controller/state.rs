//! Controller state - private bookkeeping of the execution controller.

use std::fmt;

/// Where the controller is in its cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ControllerPhase {
    #[default]
    Idle,
    SessionReady,
    CycleRunning,
    CycleSucceeded,
    CycleFailed,
    Backoff,
    Terminated,
}

impl fmt::Display for ControllerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ControllerPhase::Idle => "idle",
            ControllerPhase::SessionReady => "session_ready",
            ControllerPhase::CycleRunning => "cycle_running",
            ControllerPhase::CycleSucceeded => "cycle_succeeded",
            ControllerPhase::CycleFailed => "cycle_failed",
            ControllerPhase::Backoff => "backoff",
            ControllerPhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// Counters and flags owned by a single controller.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ControllerState {
    pub session_open: bool,
    /// Failures since the last successful cycle
    pub consecutive_failures: u32,
    /// Restarts counted against the ceiling
    pub total_restarts: u32,
    pub running: bool,
    pub phase: ControllerPhase,
    pub cycles_started: u64,
    pub cycles_succeeded: u64,
    finished: bool,
}

impl ControllerState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark the controller running. Returns false once it has finished.
    pub fn start(&mut self) -> bool {
        if self.finished {
            return false;
        }
        self.running = true;
        true
    }

    /// Record a cycle being started
    pub fn cycle_started(&mut self) -> u64 {
        self.cycles_started += 1;
        self.phase = ControllerPhase::CycleRunning;
        self.cycles_started
    }

    /// Record a successful cycle
    pub fn record_success(&mut self, reset_restarts: bool) {
        self.consecutive_failures = 0;
        if reset_restarts {
            self.total_restarts = 0;
        }
        self.cycles_succeeded += 1;
        self.phase = ControllerPhase::CycleSucceeded;
    }

    /// Record a failed cycle
    pub fn record_failure(&mut self) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        self.total_restarts = self.total_restarts.saturating_add(1);
        self.phase = ControllerPhase::CycleFailed;
    }

    /// Check whether the restart ceiling has been reached
    pub fn ceiling_reached(&self, max_restarts: u32) -> bool {
        self.total_restarts >= max_restarts
    }

    /// Final transition; `running` never becomes true again
    pub fn finish(&mut self) {
        self.running = false;
        self.session_open = false;
        self.finished = true;
        self.phase = ControllerPhase::Terminated;
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_new() {
        let state = ControllerState::new();
        assert!(!state.running);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.total_restarts, 0);
        assert_eq!(state.phase, ControllerPhase::Idle);
    }

    #[test]
    fn test_success_resets_streak() {
        let mut state = ControllerState::new();
        state.record_failure();
        state.record_failure();
        assert_eq!(state.consecutive_failures, 2);
        assert_eq!(state.total_restarts, 2);

        state.record_success(true);
        assert_eq!(state.consecutive_failures, 0);
        assert_eq!(state.total_restarts, 0);
        assert_eq!(state.phase, ControllerPhase::CycleSucceeded);
    }

    #[test]
    fn test_lifetime_restart_accounting() {
        let mut state = ControllerState::new();
        state.record_failure();
        state.record_success(false);
        state.record_failure();
        assert_eq!(state.consecutive_failures, 1);
        assert_eq!(state.total_restarts, 2);
        assert!(state.ceiling_reached(2));
        assert!(!state.ceiling_reached(3));
    }

    #[test]
    fn test_running_never_returns() {
        let mut state = ControllerState::new();
        assert!(state.start());
        assert!(state.running);
        state.finish();
        assert!(!state.running);
        assert!(!state.start());
        assert!(!state.running);
        assert_eq!(state.phase, ControllerPhase::Terminated);
    }

    #[test]
    fn test_cycle_started_counts() {
        let mut state = ControllerState::new();
        assert_eq!(state.cycle_started(), 1);
        assert_eq!(state.cycle_started(), 2);
        assert_eq!(state.phase, ControllerPhase::CycleRunning);
    }
}
