//! Controller milestones and their log-line rendering.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

/// Severity written into each cycle log line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "INFO",
            Level::Warn => "WARN",
            Level::Error => "ERROR",
        }
    }
}

/// A milestone of the execution controller.
///
/// The rendered messages carry the tokens the log classifier matches on, so
/// their wording is part of the external log contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleEvent {
    ControllerStarted { max_restarts: u32 },
    SessionOpened,
    SessionClosed,
    SessionCloseFailed { reason: String },
    CycleStarted { cycle: u64 },
    CycleSucceeded,
    CycleFailed { reason: String },
    RestartScheduled { delay_secs: u64, attempt: u32, max: u32 },
    MaxRestartsReached { max: u32 },
    StopRequested,
    ControllerStopped,
}

impl CycleEvent {
    pub fn level(&self) -> Level {
        match self {
            CycleEvent::CycleFailed { .. } | CycleEvent::MaxRestartsReached { .. } => Level::Error,
            CycleEvent::SessionCloseFailed { .. } => Level::Warn,
            _ => Level::Info,
        }
    }

    /// `<RFC3339 timestamp> <LEVEL> <message>`
    pub fn to_line(&self, at: DateTime<Utc>) -> String {
        format!(
            "{} {} {}",
            at.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.level().as_str(),
            self
        )
    }
}

/// Folds line breaks so a reason never spills onto an untimestamped line.
fn single_line(reason: &str) -> String {
    reason
        .split(['\r', '\n'])
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

impl fmt::Display for CycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleEvent::ControllerStarted { max_restarts } => {
                write!(f, "controller started (restart ceiling {})", max_restarts)
            }
            CycleEvent::SessionOpened => write!(f, "session opened"),
            CycleEvent::SessionClosed => write!(f, "session closed"),
            CycleEvent::SessionCloseFailed { reason } => write!(f, "session close failed: {}", single_line(reason)),
            CycleEvent::CycleStarted { cycle } => write!(f, "cycle started (#{})", cycle),
            CycleEvent::CycleSucceeded => write!(f, "cycle succeeded"),
            CycleEvent::CycleFailed { reason } => write!(f, "cycle failed: {}", single_line(reason)),
            CycleEvent::RestartScheduled { delay_secs, attempt, max } => {
                write!(f, "restarting in {}s (attempt {}/{})", delay_secs, attempt, max)
            }
            CycleEvent::MaxRestartsReached { max } => write!(f, "max restarts reached ({})", max),
            CycleEvent::StopRequested => write!(f, "stop requested"),
            CycleEvent::ControllerStopped => write!(f, "controller stopped"),
        }
    }
}
