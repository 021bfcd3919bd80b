//! Status aggregator - merges probe results and the log classifier into one
//! published snapshot.
//!
//! The aggregator is the single writer. Readers hold a [`StatusHandle`] and
//! always see a complete `AggregatedStatus`; each tick swaps in a new `Arc`.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use log::{debug, info, warn};
use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, timeout};
use tokio_util::sync::CancellationToken;

use crate::classifier::{FileLogSource, LogClassifier, LogSource};
use crate::config::Config;
use crate::domain::{AggregatedStatus, HealthSnapshot, Subsystem};
use crate::error::{FailoverError, Result};
use crate::probe::{HealthProbe, HttpHealthProbe};

/// Default interval between ticks
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(10);

/// Default budget for a single probe
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Read side of the published status.
#[derive(Debug, Clone)]
pub struct StatusHandle {
    rx: watch::Receiver<Arc<AggregatedStatus>>,
}

impl StatusHandle {
    /// Most recently published status
    pub fn snapshot(&self) -> Arc<AggregatedStatus> {
        self.rx.borrow().clone()
    }

    /// Wait for the next publish. Errors once the aggregator is dropped.
    pub async fn changed(&mut self) -> Result<Arc<AggregatedStatus>> {
        self.rx
            .changed()
            .await
            .map_err(|_| FailoverError::Probe("aggregator closed".to_string()))?;
        Ok(self.rx.borrow_and_update().clone())
    }
}

pub struct StatusAggregator {
    probes: Vec<Box<dyn HealthProbe>>,
    log_source: Arc<dyn LogSource>,
    classifier: LogClassifier,
    probe_timeout: Duration,
    poll_interval: Duration,
    tx: watch::Sender<Arc<AggregatedStatus>>,
}

impl StatusAggregator {
    pub fn new(log_source: impl LogSource + 'static, classifier: LogClassifier) -> Self {
        let (tx, _) = watch::channel(Arc::new(AggregatedStatus::initial()));
        Self {
            probes: Vec::new(),
            log_source: Arc::new(log_source),
            classifier,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            tx,
        }
    }

    /// Aggregator wired from configuration: HTTP probes for master and worker,
    /// the configured cycle log as the log source.
    pub fn from_config(config: &Config) -> Result<Self> {
        let classifier = LogClassifier::new(
            config.log.markers.clone(),
            config.log.retained_lines,
            config.log.decision_window,
        );
        let timeout = config.probes.timeout();

        let aggregator = Self::new(FileLogSource::new(&config.log.path), classifier)
            .with_probe(HttpHealthProbe::new(Subsystem::Master, &config.probes.master_url, timeout)?)
            .with_probe(HttpHealthProbe::new(Subsystem::Worker, &config.probes.worker_url, timeout)?)
            .with_probe_timeout(timeout)
            .with_poll_interval(config.monitor.poll_interval());
        Ok(aggregator)
    }

    pub fn with_probe(mut self, probe: impl HealthProbe + 'static) -> Self {
        self.probes.push(Box::new(probe));
        self
    }

    pub fn with_probe_timeout(mut self, budget: Duration) -> Self {
        self.probe_timeout = budget;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// Reader for the published status
    pub fn handle(&self) -> StatusHandle {
        StatusHandle { rx: self.tx.subscribe() }
    }

    /// Most recently published status
    pub fn snapshot(&self) -> Arc<AggregatedStatus> {
        self.tx.borrow().clone()
    }

    async fn poll_probe(&self, probe: &dyn HealthProbe) -> HealthSnapshot {
        match timeout(self.probe_timeout, probe.poll()).await {
            Ok(snapshot) => snapshot,
            Err(_) => {
                warn!(
                    "{} probe timed out after {}ms",
                    probe.subsystem(),
                    self.probe_timeout.as_millis()
                );
                HealthSnapshot::unhealthy(probe.subsystem())
            }
        }
    }

    /// Tail the cycle log on the blocking pool; file sources seek and read.
    async fn read_log_tail(&self) -> Result<Vec<String>> {
        let source = Arc::clone(&self.log_source);
        let retained = self.classifier.retained();
        tokio::task::spawn_blocking(move || source.tail(retained))
            .await
            .unwrap_or_else(|e| Err(FailoverError::Io(std::io::Error::other(e))))
    }

    /// Run all probes and the classifier once and publish the result.
    ///
    /// Always completes: each failure only degrades its own subsystem.
    pub async fn tick(&self) -> Arc<AggregatedStatus> {
        let polled = join_all(self.probes.iter().map(|p| self.poll_probe(p.as_ref()))).await;

        let mut status = AggregatedStatus::initial();
        for snapshot in polled {
            status.snapshots.insert(snapshot.subsystem, snapshot);
        }

        match self.read_log_tail().await {
            Ok(lines) => {
                let verdict = self.classifier.classify(&lines);
                let mut metrics = BTreeMap::new();
                metrics.insert("restart_count".to_string(), verdict.restart_count as f64);
                metrics.insert("log_lines".to_string(), verdict.lines_considered as f64);

                status.snapshots.insert(
                    Subsystem::Application,
                    HealthSnapshot::new(Subsystem::Application, verdict.state.health()).with_metrics(metrics),
                );
                status.restart_count = verdict.restart_count;
                status.application_state = Some(verdict.state);
                status.recent_log_lines = lines;
            }
            Err(e) => {
                warn!("cycle log unreadable: {}", e);
                status
                    .snapshots
                    .insert(Subsystem::Application, HealthSnapshot::unknown(Subsystem::Application));
            }
        }

        status.published_at = Utc::now();
        let status = Arc::new(status);
        self.tx.send_replace(status.clone());
        debug!(
            "published status: master={} worker={} application={}",
            status.status_of(Subsystem::Master),
            status.status_of(Subsystem::Worker),
            status.status_of(Subsystem::Application)
        );
        status
    }

    /// Tick on the poll interval until `shutdown` is cancelled.
    ///
    /// The first tick runs immediately.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            "status aggregator started (interval {}s, {} probes)",
            self.poll_interval.as_secs(),
            self.probes.len()
        );

        let mut interval = tokio::time::interval(self.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                _ = shutdown.cancelled() => {
                    info!("status aggregator stopping");
                    break;
                }

                _ = interval.tick() => {
                    self.tick().await;
                }
            }
        }
    }
}

impl std::fmt::Debug for StatusAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusAggregator")
            .field("probes", &self.probes.len())
            .field("classifier", &self.classifier)
            .field("probe_timeout", &self.probe_timeout)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}
