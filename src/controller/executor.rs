//! Execution controller - runs the supervised cycle with bounded restarts.
//!
//! Each iteration:
//! 1. Ensures a healthy session (re-creating it if the health check fails)
//! 2. Runs generate + process
//! 3. On success: resets the failure streak and waits the cycle interval
//! 4. On failure: closes the session, counts the restart, and either backs
//!    off exponentially or terminates once the restart ceiling is reached
//!
//! Every wait is raced against the stop token so shutdown is prompt.

use std::time::Duration;

use log::{debug, warn};
use tokio_util::sync::CancellationToken;

use super::backoff::BackoffPolicy;
use super::session::{ProcessingSession, SessionFactory};
use super::state::{ControllerPhase, ControllerState};
use super::workload::Workload;
use crate::config::ControllerConfig;
use crate::domain::{CycleOutcome, ErrorInfo};
use crate::error::{FailoverError, Result};
use crate::journal::{CycleEvent, CycleJournal};

/// How `run` ended without a fatal error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerExit {
    /// A stop was requested
    Stopped,
    /// `run` was called on a controller that had already finished
    AlreadyFinished,
}

/// Cloneable handle for requesting a cooperative stop.
#[derive(Debug, Clone)]
pub struct StopHandle {
    token: CancellationToken,
}

impl StopHandle {
    /// Idempotent; safe to call from a signal task
    pub fn request_stop(&self) {
        self.token.cancel();
    }

    pub fn is_stop_requested(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Supervises a workload against a processing session.
pub struct ExecutionController<F, W, J>
where
    F: SessionFactory,
    W: Workload,
    J: CycleJournal,
{
    factory: F,
    workload: W,
    journal: J,
    config: ControllerConfig,
    backoff: BackoffPolicy,
    session: Option<F::Session>,
    state: ControllerState,
    last_outcome: Option<CycleOutcome>,
    shutdown: CancellationToken,
}

impl<F, W, J> ExecutionController<F, W, J>
where
    F: SessionFactory,
    W: Workload,
    J: CycleJournal,
{
    /// Create a controller. Cancelling `shutdown` is equivalent to `request_stop`.
    pub fn new(factory: F, workload: W, journal: J, config: ControllerConfig, shutdown: CancellationToken) -> Self {
        let backoff = config.backoff();
        Self {
            factory,
            workload,
            journal,
            config,
            backoff,
            session: None,
            state: ControllerState::new(),
            last_outcome: None,
            shutdown,
        }
    }

    pub fn stop_handle(&self) -> StopHandle {
        StopHandle {
            token: self.shutdown.clone(),
        }
    }

    pub fn request_stop(&self) {
        self.shutdown.cancel();
    }

    pub fn state(&self) -> &ControllerState {
        &self.state
    }

    pub fn last_outcome(&self) -> Option<&CycleOutcome> {
        self.last_outcome.as_ref()
    }

    /// Run until a stop is requested or the restart ceiling is reached.
    ///
    /// Returns `Err(RestartCeilingExceeded)` for the fatal case; every other
    /// failure is absorbed by the restart policy.
    pub async fn run(&mut self) -> Result<ControllerExit> {
        if !self.state.start() {
            warn!("Controller already finished, ignoring run()");
            return Ok(ControllerExit::AlreadyFinished);
        }

        let max = self.config.max_restarts;
        self.record(CycleEvent::ControllerStarted { max_restarts: max });

        let shutdown = self.shutdown.clone();
        let result = loop {
            if shutdown.is_cancelled() {
                break Ok(ControllerExit::Stopped);
            }

            let outcome = tokio::select! {
                biased;
                _ = shutdown.cancelled() => None,
                outcome = self.run_cycle() => Some(outcome),
            };
            let Some(outcome) = outcome else {
                break Ok(ControllerExit::Stopped);
            };

            let succeeded = outcome.succeeded;
            let reason = outcome.reason().unwrap_or("unknown error").to_string();
            self.last_outcome = Some(outcome);

            if succeeded {
                self.state.record_success(self.config.reset_restarts_on_success);
                self.record(CycleEvent::CycleSucceeded);
                self.state.phase = ControllerPhase::SessionReady;
                if !self.pause(self.config.cycle_interval()).await {
                    break Ok(ControllerExit::Stopped);
                }
                continue;
            }

            self.record(CycleEvent::CycleFailed { reason });
            self.close_session().await;
            self.state.record_failure();

            if self.state.ceiling_reached(max) {
                self.record(CycleEvent::MaxRestartsReached { max });
                break Err(FailoverError::RestartCeilingExceeded {
                    restarts: self.state.total_restarts,
                    max,
                });
            }

            let delay = self.backoff.delay_for(self.state.consecutive_failures);
            self.state.phase = ControllerPhase::Backoff;
            self.record(CycleEvent::RestartScheduled {
                delay_secs: delay.as_secs(),
                attempt: self.state.total_restarts,
                max,
            });
            if !self.pause(delay).await {
                break Ok(ControllerExit::Stopped);
            }
        };

        if matches!(result, Ok(ControllerExit::Stopped)) {
            self.record(CycleEvent::StopRequested);
        }
        self.close_session().await;
        self.state.finish();
        self.record(CycleEvent::ControllerStopped);
        result
    }

    /// One generate+process attempt, including session preparation.
    async fn run_cycle(&mut self) -> CycleOutcome {
        if let Err(e) = self.ensure_session().await {
            self.state.phase = ControllerPhase::CycleFailed;
            return CycleOutcome::failure(ErrorInfo::new(e.kind(), e.to_string()));
        }

        let cycle = self.state.cycle_started();
        self.record(CycleEvent::CycleStarted { cycle });

        match self.execute_workload().await {
            Ok(()) => CycleOutcome::success(),
            Err(e) => CycleOutcome::failure(ErrorInfo::new(e.kind(), e.to_string())),
        }
    }

    async fn execute_workload(&self) -> Result<()> {
        let dataset = self.workload.generate().await?;
        self.workload.process(dataset).await
    }

    /// Reuse the open session if it is healthy, otherwise replace it.
    async fn ensure_session(&mut self) -> Result<()> {
        let timeout = self.config.session_timeout();

        if let Some(session) = &self.session {
            match tokio::time::timeout(timeout, session.check_health()).await {
                Ok(Ok(())) => return Ok(()),
                Ok(Err(e)) => warn!("{}", as_health_failure(e)),
                Err(_) => warn!(
                    "{}",
                    FailoverError::HealthCheck(format!("timed out after {}ms", timeout.as_millis()))
                ),
            }
        }

        self.close_session().await;

        match tokio::time::timeout(timeout, self.factory.open()).await {
            Ok(Ok(session)) => {
                self.session = Some(session);
                self.state.session_open = true;
                self.state.phase = ControllerPhase::SessionReady;
                self.record(CycleEvent::SessionOpened);
                Ok(())
            }
            Ok(Err(e)) => Err(as_session_failure(e)),
            Err(_) => Err(FailoverError::SessionCreation(format!(
                "timed out after {}ms",
                timeout.as_millis()
            ))),
        }
    }

    /// Best-effort close; failures are journaled, never propagated.
    async fn close_session(&mut self) {
        let Some(mut session) = self.session.take() else {
            return;
        };
        self.state.session_open = false;

        let timeout = self.config.session_timeout();
        match tokio::time::timeout(timeout, session.close()).await {
            Ok(Ok(())) => self.record(CycleEvent::SessionClosed),
            Ok(Err(e)) => self.record(CycleEvent::SessionCloseFailed { reason: e.to_string() }),
            Err(_) => self.record(CycleEvent::SessionCloseFailed {
                reason: format!("timed out after {}ms", timeout.as_millis()),
            }),
        }
    }

    /// Sleep unless stopped first. Returns false when a stop interrupted it.
    async fn pause(&self, delay: Duration) -> bool {
        debug!("Sleeping {:?} (phase {})", delay, self.state.phase);
        tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => false,
            _ = tokio::time::sleep(delay) => true,
        }
    }

    fn record(&self, event: CycleEvent) {
        if let Err(e) = self.journal.record(&event) {
            warn!("Failed to write cycle log ({}): {}", event, e);
        }
    }
}

fn as_session_failure(e: FailoverError) -> FailoverError {
    match e {
        FailoverError::SessionCreation(_) => e,
        other => FailoverError::SessionCreation(other.to_string()),
    }
}

fn as_health_failure(e: FailoverError) -> FailoverError {
    match e {
        FailoverError::HealthCheck(_) => e,
        other => FailoverError::HealthCheck(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::mock::{MockSessionFactory, ScriptedWorkload};
    use crate::domain::ErrorKind;
    use crate::journal::MemoryJournal;
    use std::sync::Arc;
    use tokio::time::Instant;

    fn config(max_restarts: u32) -> ControllerConfig {
        ControllerConfig {
            max_restarts,
            ..Default::default()
        }
    }

    type TestController = ExecutionController<Arc<MockSessionFactory>, Arc<ScriptedWorkload>, Arc<MemoryJournal>>;

    fn controller(
        factory: MockSessionFactory,
        workload: ScriptedWorkload,
        max_restarts: u32,
        token: CancellationToken,
    ) -> (TestController, Arc<MockSessionFactory>, Arc<ScriptedWorkload>, Arc<MemoryJournal>) {
        let factory = Arc::new(factory);
        let workload = Arc::new(workload);
        let journal = Arc::new(MemoryJournal::new());
        let controller = ExecutionController::new(
            Arc::clone(&factory),
            Arc::clone(&workload),
            Arc::clone(&journal),
            config(max_restarts),
            token,
        );
        (controller, factory, workload, journal)
    }

    #[tokio::test(start_paused = true)]
    async fn test_terminates_after_max_restarts() {
        let token = CancellationToken::new();
        let (mut ctl, factory, workload, journal) =
            controller(MockSessionFactory::new(), ScriptedWorkload::failing(), 3, token);

        let result = ctl.run().await;
        assert!(matches!(
            result,
            Err(FailoverError::RestartCeilingExceeded { restarts: 3, max: 3 })
        ));
        assert_eq!(workload.attempts(), 3);
        assert_eq!(factory.opened(), 3);
        assert_eq!(factory.closed(), 3);
        assert!(!ctl.state().running);
        assert_eq!(ctl.state().phase, ControllerPhase::Terminated);
        assert_eq!(journal.count_matching("max restarts reached"), 1);
        assert_eq!(journal.count_matching("restarting in"), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backoff_delays_follow_policy() {
        let token = CancellationToken::new();
        let (mut ctl, _factory, _workload, journal) =
            controller(MockSessionFactory::new(), ScriptedWorkload::failing(), 3, token);

        let start = Instant::now();
        let _ = ctl.run().await;
        // 2s after the first failure, 4s after the second, none after the third
        assert_eq!(start.elapsed().as_secs(), 6);

        let lines = journal.lines();
        assert!(lines.iter().any(|l| l.ends_with("restarting in 2s (attempt 1/3)")));
        assert!(lines.iter().any(|l| l.ends_with("restarting in 4s (attempt 2/3)")));
        assert!(!lines.iter().any(|l| l.contains("restarting in 8s")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_streak() {
        let token = CancellationToken::new();
        let workload = ScriptedWorkload::new([false, false, true, false]).stop_when_done(token.clone());
        let (mut ctl, _factory, workload, journal) = controller(MockSessionFactory::new(), workload, 3, token);

        let result = ctl.run().await;
        assert_eq!(result.unwrap(), ControllerExit::Stopped);
        assert_eq!(workload.attempts(), 5);
        // streak restarted at 1 after the success
        assert_eq!(ctl.state().consecutive_failures, 0);
        assert_eq!(journal.count_matching("restarting in 2s (attempt 1/3)"), 2);
        assert_eq!(journal.count_matching("max restarts reached"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifetime_restart_accounting_reaches_ceiling() {
        let token = CancellationToken::new();
        let workload = ScriptedWorkload::new([false, true, false, true, false]);
        let factory = Arc::new(MockSessionFactory::new());
        let workload = Arc::new(workload);
        let journal = Arc::new(MemoryJournal::new());
        let mut cfg = config(3);
        cfg.reset_restarts_on_success = false;
        let mut ctl = ExecutionController::new(factory, Arc::clone(&workload), journal, cfg, token);

        let result = ctl.run().await;
        assert!(matches!(result, Err(FailoverError::RestartCeilingExceeded { .. })));
        assert_eq!(workload.attempts(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_healthy_session_is_reused() {
        let token = CancellationToken::new();
        let workload = ScriptedWorkload::new([true, true, true]).stop_when_done(token.clone());
        let (mut ctl, factory, _workload, _journal) = controller(MockSessionFactory::new(), workload, 5, token);

        ctl.run().await.unwrap();
        assert_eq!(factory.opened(), 1);
        // closed once on shutdown
        assert_eq!(factory.closed(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unhealthy_session_is_recreated() {
        let token = CancellationToken::new();
        let workload = ScriptedWorkload::new([true]).stop_when_done(token.clone());
        let (mut ctl, factory, _workload, _journal) = controller(MockSessionFactory::new(), workload, 5, token);
        factory.set_healthy(false);

        ctl.run().await.unwrap();
        // every check fails, so each cycle opens a fresh session
        assert_eq!(factory.opened(), 2);
        assert_eq!(ctl.state().consecutive_failures, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_session_creation_failure_counts_as_cycle_failure() {
        let token = CancellationToken::new();
        let workload = ScriptedWorkload::new([]).stop_when_done(token.clone());
        let (mut ctl, factory, workload, journal) =
            controller(MockSessionFactory::new().fail_next_opens(2), workload, 5, token);

        ctl.run().await.unwrap();
        assert_eq!(factory.opened(), 1);
        assert_eq!(workload.attempts(), 1);
        assert_eq!(journal.count_matching("cycle failed: Session creation failed"), 2);
        assert_eq!(journal.count_matching("restarting in 4s (attempt 2/5)"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_failure_is_not_fatal() {
        let token = CancellationToken::new();
        let workload = ScriptedWorkload::new([false]).stop_when_done(token.clone());
        let (mut ctl, _factory, _workload, journal) =
            controller(MockSessionFactory::new().failing_close(), workload, 5, token);

        assert_eq!(ctl.run().await.unwrap(), ControllerExit::Stopped);
        assert!(journal.count_matching("session close failed") >= 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_cycle_interval() {
        let token = CancellationToken::new();
        let (mut ctl, factory, _workload, journal) =
            controller(MockSessionFactory::new(), ScriptedWorkload::new([true]), 5, token);
        let handle = ctl.stop_handle();

        let start = Instant::now();
        let (result, _) = tokio::join!(ctl.run(), async {
            tokio::time::sleep(Duration::from_secs(1)).await;
            handle.request_stop();
            handle.request_stop();
        });

        assert_eq!(result.unwrap(), ControllerExit::Stopped);
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(factory.closed(), 1);
        assert_eq!(journal.count_matching("stop requested"), 1);
        assert_eq!(journal.count_matching("controller stopped"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_backoff() {
        let token = CancellationToken::new();
        let mut cfg = config(10);
        cfg.backoff_base_secs = 30;
        cfg.backoff_ceiling_secs = 600;
        let journal = Arc::new(MemoryJournal::new());
        let mut ctl = ExecutionController::new(
            MockSessionFactory::new(),
            ScriptedWorkload::failing(),
            Arc::clone(&journal),
            cfg,
            token.clone(),
        );

        let start = Instant::now();
        let (result, _) = tokio::join!(ctl.run(), async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            token.cancel();
        });

        assert_eq!(result.unwrap(), ControllerExit::Stopped);
        assert!(start.elapsed() < Duration::from_secs(60));
        assert_eq!(journal.count_matching("restarting in 60s (attempt 1/10)"), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_interrupts_in_flight_cycle() {
        let token = CancellationToken::new();
        let (mut ctl, factory, workload, journal) =
            controller(MockSessionFactory::new(), ScriptedWorkload::hanging(), 5, token);
        let handle = ctl.stop_handle();

        let start = Instant::now();
        let (result, _) = tokio::join!(ctl.run(), async {
            tokio::time::sleep(Duration::from_secs(3)).await;
            handle.request_stop();
        });

        assert_eq!(result.unwrap(), ControllerExit::Stopped);
        assert_eq!(start.elapsed(), Duration::from_secs(3));
        assert_eq!(workload.attempts(), 1);
        assert_eq!(factory.opened(), 1);
        assert_eq!(factory.closed(), 1);
        assert_eq!(journal.count_matching("cycle started"), 1);
        assert_eq!(journal.count_matching("cycle succeeded"), 0);
        assert_eq!(journal.count_matching("cycle failed"), 0);
        assert_eq!(journal.count_matching("stop requested"), 1);
        assert!(!ctl.state().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_session_open_times_out() {
        let token = CancellationToken::new();
        let (mut ctl, factory, workload, journal) =
            controller(MockSessionFactory::new().hanging_opens(), ScriptedWorkload::new([]), 2, token);

        let start = Instant::now();
        let result = ctl.run().await;

        assert!(matches!(
            result,
            Err(FailoverError::RestartCeilingExceeded { restarts: 2, max: 2 })
        ));
        // 5s open timeout, 2s backoff, 5s open timeout
        assert_eq!(start.elapsed(), Duration::from_secs(12));
        assert_eq!(factory.opened(), 0);
        assert_eq!(workload.attempts(), 0);
        assert_eq!(
            journal.count_matching("cycle failed: Session creation failed: timed out after 5000ms"),
            2
        );

        let outcome = ctl.last_outcome().unwrap();
        assert_eq!(outcome.error.as_ref().unwrap().kind, ErrorKind::SessionCreation);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_health_check_replaces_session() {
        let token = CancellationToken::new();
        let workload = ScriptedWorkload::new([true]).stop_when_done(token.clone());
        let (mut ctl, factory, workload, journal) = controller(MockSessionFactory::new(), workload, 5, token);

        let start = Instant::now();
        let (result, _) = tokio::join!(ctl.run(), async {
            // after the first cycle, while the controller waits out its interval
            tokio::time::sleep(Duration::from_secs(10)).await;
            factory.set_health_hangs(true);
        });

        assert_eq!(result.unwrap(), ControllerExit::Stopped);
        // 30s cycle interval, then a 5s health check timeout before reopening
        assert_eq!(start.elapsed(), Duration::from_secs(35));
        assert_eq!(workload.attempts(), 2);
        assert_eq!(factory.opened(), 2);
        assert_eq!(factory.closed(), 2);
        assert_eq!(journal.count_matching("session opened"), 2);
        assert_eq!(journal.count_matching("cycle failed"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_after_finish_is_noop() {
        let token = CancellationToken::new();
        token.cancel();
        let (mut ctl, factory, _workload, _journal) =
            controller(MockSessionFactory::new(), ScriptedWorkload::new([]), 5, token);

        assert_eq!(ctl.run().await.unwrap(), ControllerExit::Stopped);
        assert_eq!(factory.opened(), 0);
        assert_eq!(ctl.run().await.unwrap(), ControllerExit::AlreadyFinished);
        assert!(!ctl.state().running);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_outcome_records_failure_kind() {
        let token = CancellationToken::new();
        let (mut ctl, _factory, _workload, _journal) =
            controller(MockSessionFactory::new(), ScriptedWorkload::failing(), 1, token);

        let _ = ctl.run().await;
        let outcome = ctl.last_outcome().unwrap();
        assert!(!outcome.succeeded);
        assert_eq!(outcome.error.as_ref().unwrap().kind, ErrorKind::Workload);
    }
}
