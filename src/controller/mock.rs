//! Scripted sessions and workloads for exercising the controller.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::session::{ProcessingSession, SessionFactory};
use super::workload::Workload;
use crate::error::{FailoverError, Result};

#[derive(Debug, Default)]
struct SessionCounters {
    opened: AtomicU32,
    closed: AtomicU32,
    healthy: AtomicBool,
    hang_health: AtomicBool,
    close_fails: AtomicBool,
}

/// Session factory with scripted open failures and a shared health flag.
#[derive(Debug)]
pub struct MockSessionFactory {
    open_failures: Mutex<VecDeque<bool>>,
    hang_opens: AtomicBool,
    counters: Arc<SessionCounters>,
}

impl MockSessionFactory {
    pub fn new() -> Self {
        let counters = SessionCounters::default();
        counters.healthy.store(true, Ordering::SeqCst);
        Self {
            open_failures: Mutex::new(VecDeque::new()),
            hang_opens: AtomicBool::new(false),
            counters: Arc::new(counters),
        }
    }

    /// Fail the next `n` open attempts
    pub fn fail_next_opens(self, n: usize) -> Self {
        if let Ok(mut script) = self.open_failures.lock() {
            script.extend(std::iter::repeat_n(true, n));
        }
        self
    }

    /// Make every open attempt wait forever
    pub fn hanging_opens(self) -> Self {
        self.hang_opens.store(true, Ordering::SeqCst);
        self
    }

    /// Make health checks on open sessions wait forever
    pub fn set_health_hangs(&self, hangs: bool) {
        self.counters.hang_health.store(hangs, Ordering::SeqCst);
    }

    /// Make `close` report an error
    pub fn failing_close(self) -> Self {
        self.counters.close_fails.store(true, Ordering::SeqCst);
        self
    }

    /// Health reported by every open session
    pub fn set_healthy(&self, healthy: bool) {
        self.counters.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn opened(&self) -> u32 {
        self.counters.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> u32 {
        self.counters.closed.load(Ordering::SeqCst)
    }
}

impl Default for MockSessionFactory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionFactory for MockSessionFactory {
    type Session = MockSession;

    async fn open(&self) -> Result<MockSession> {
        if self.hang_opens.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        let fail = self
            .open_failures
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or(false);
        if fail {
            return Err(FailoverError::SessionCreation("scripted open failure".to_string()));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MockSession {
            counters: Arc::clone(&self.counters),
        })
    }
}

/// Session handed out by `MockSessionFactory`
#[derive(Debug)]
pub struct MockSession {
    counters: Arc<SessionCounters>,
}

#[async_trait]
impl ProcessingSession for MockSession {
    async fn check_health(&self) -> Result<()> {
        if self.counters.hang_health.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        if self.counters.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(FailoverError::HealthCheck("mock session unhealthy".to_string()))
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        if self.counters.close_fails.load(Ordering::SeqCst) {
            return Err(FailoverError::Io(std::io::Error::other("close refused")));
        }
        Ok(())
    }
}

/// Workload that succeeds or fails according to a script.
///
/// `true` is a successful cycle. When the script runs out the workload keeps
/// succeeding and, if configured, cancels `stop_when_done`. A hanging
/// workload never finishes `process`.
#[derive(Debug, Default)]
pub struct ScriptedWorkload {
    script: Mutex<VecDeque<bool>>,
    stop_when_done: Option<CancellationToken>,
    hangs: bool,
    attempts: AtomicU32,
}

impl ScriptedWorkload {
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            stop_when_done: None,
            hangs: false,
            attempts: AtomicU32::new(0),
        }
    }

    /// Never finish processing
    pub fn hanging() -> Self {
        Self {
            hangs: true,
            ..Self::default()
        }
    }

    /// Always fail
    pub fn failing() -> Self {
        Self::new(std::iter::repeat_n(false, 1024))
    }

    pub fn stop_when_done(mut self, token: CancellationToken) -> Self {
        self.stop_when_done = Some(token);
        self
    }

    /// Number of process attempts so far
    pub fn attempts(&self) -> u32 {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Workload for ScriptedWorkload {
    type Dataset = u32;

    async fn generate(&self) -> Result<u32> {
        Ok(self.attempts.load(Ordering::SeqCst) + 1)
    }

    async fn process(&self, dataset: u32) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.hangs {
            std::future::pending::<()>().await;
        }
        let next = self.script.lock().ok().and_then(|mut s| s.pop_front());
        match next {
            Some(true) => Ok(()),
            Some(false) => Err(FailoverError::Workload(format!("scripted failure #{}", dataset))),
            None => {
                if let Some(token) = &self.stop_when_done {
                    token.cancel();
                }
                Ok(())
            }
        }
    }
}
