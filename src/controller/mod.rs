//! Resilient execution controller.
//!
//! This module provides:
//! - ExecutionController: the supervised generate/process cycle
//! - BackoffPolicy: exponential restart delay with a ceiling
//! - ProcessingSession/SessionFactory and Workload: the collaborators it drives
//! - Fault injection hooks
//! - Scripted doubles for deterministic runs (tests and the `test-util` feature)

pub mod backoff;
pub mod executor;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod session;
pub mod state;
pub mod workload;

pub use backoff::BackoffPolicy;
pub use executor::{ControllerExit, ExecutionController, StopHandle};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{MockSession, MockSessionFactory, ScriptedWorkload};
pub use session::{ProcessingSession, SessionFactory};
pub use state::{ControllerPhase, ControllerState};
pub use workload::{FaultSource, InjectedFaults, NoFaults, RandomFaults, ScriptedFaults, Workload};
