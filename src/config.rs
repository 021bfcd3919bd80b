use eyre::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::controller::BackoffPolicy;
use crate::journal::LogMarkers;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub controller: ControllerConfig,
    pub probes: ProbesConfig,
    pub monitor: MonitorConfig,
    pub log: LogConfig,
    pub workload: WorkloadConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Processing engine master address
    pub master_url: String,
    pub max_restarts: u32,
    pub backoff_base_secs: u64,
    pub backoff_ceiling_secs: u64,
    pub cycle_interval_secs: u64,
    pub session_timeout_ms: u64,
    /// Reset the restart counter together with the failure streak on success
    pub reset_restarts_on_success: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            master_url: "local[*]".to_string(),
            max_restarts: 5,
            backoff_base_secs: 1,
            backoff_ceiling_secs: 60,
            cycle_interval_secs: 30,
            session_timeout_ms: 5000,
            reset_restarts_on_success: true,
        }
    }
}

impl ControllerConfig {
    pub fn backoff(&self) -> BackoffPolicy {
        BackoffPolicy::new(
            Duration::from_secs(self.backoff_base_secs),
            Duration::from_secs(self.backoff_ceiling_secs),
        )
    }

    pub fn cycle_interval(&self) -> Duration {
        Duration::from_secs(self.cycle_interval_secs)
    }

    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbesConfig {
    pub master_url: String,
    pub worker_url: String,
    pub timeout_ms: u64,
}

impl Default for ProbesConfig {
    fn default() -> Self {
        Self {
            master_url: "http://localhost:8080/json".to_string(),
            worker_url: "http://localhost:8081/json".to_string(),
            timeout_ms: 5000,
        }
    }
}

impl ProbesConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub poll_interval_secs: u64,
    pub bind_addr: String,
    /// Log lines included in the machine-readable snapshot
    pub api_log_lines: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 10,
            bind_addr: "0.0.0.0:3000".to_string(),
            api_log_lines: 10,
        }
    }
}

impl MonitorConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Cycle log stream shared by the controller and the classifier
    pub path: PathBuf,
    pub retained_lines: usize,
    pub decision_window: usize,
    pub markers: LogMarkers,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("logs/failover.log"),
            retained_lines: 50,
            decision_window: 10,
            markers: LogMarkers::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkloadConfig {
    /// Probability that an injected fault fails the process step
    pub failure_rate: f64,
    pub batch_size: usize,
    pub output_dir: Option<PathBuf>,
}

impl Default for WorkloadConfig {
    fn default() -> Self {
        Self {
            failure_rate: 0.3,
            batch_size: 1000,
            output_dir: None,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            controller: ControllerConfig::default(),
            probes: ProbesConfig::default(),
            monitor: MonitorConfig::default(),
            log: LogConfig::default(),
            workload: WorkloadConfig::default(),
        }
    }
}

/// Where a loaded configuration came from.
///
/// Logging is not set up while the configuration is resolved, so files that
/// failed to load are handed back for the caller to report.
#[derive(Debug, Clone, Default)]
pub struct ConfigSource {
    /// File the configuration was read from; `None` means defaults
    pub path: Option<PathBuf>,
    /// One message per candidate file that existed but failed to load
    pub skipped: Vec<String>,
}

impl Config {
    /// Load configuration with fallback chain, then apply environment overrides
    pub fn load(config_path: Option<&PathBuf>) -> Result<(Self, ConfigSource)> {
        let (mut config, source) = Self::load_file(config_path)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok((config, source))
    }

    fn load_file(config_path: Option<&PathBuf>) -> Result<(Self, ConfigSource)> {
        // If explicit config path provided, try to load it
        if let Some(path) = config_path {
            let config =
                Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()))?;
            let source = ConfigSource {
                path: Some(path.clone()),
                skipped: Vec::new(),
            };
            return Ok((config, source));
        }

        let project_name = env!("CARGO_PKG_NAME");
        let mut candidates = Vec::new();

        // Primary location: ~/.config/<project>/<project>.yml
        if let Some(config_dir) = dirs::config_dir() {
            candidates.push(config_dir.join(project_name).join(format!("{}.yml", project_name)));
        }

        // Fallback location: ./<project>.yml
        candidates.push(PathBuf::from(format!("{}.yml", project_name)));

        Ok(Self::load_first(&candidates))
    }

    /// First candidate that exists and parses wins; defaults otherwise.
    fn load_first(candidates: &[PathBuf]) -> (Self, ConfigSource) {
        let mut source = ConfigSource::default();
        for path in candidates.iter().filter(|p| p.exists()) {
            match Self::load_from_file(path) {
                Ok(config) => {
                    source.path = Some(path.clone());
                    return (config, source);
                }
                Err(e) => source
                    .skipped
                    .push(format!("Failed to load config from {}: {:#}", path.display(), e)),
            }
        }
        (Self::default(), source)
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;
        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;
        Ok(config)
    }

    /// Apply `FAILOVER_*` overrides. `lookup` abstracts the environment for tests.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("FAILOVER_MASTER_URL") {
            self.controller.master_url = v;
        }
        if let Some(v) = lookup("FAILOVER_MASTER_STATUS_URL") {
            self.probes.master_url = v;
        }
        if let Some(v) = lookup("FAILOVER_WORKER_STATUS_URL") {
            self.probes.worker_url = v;
        }
        if let Some(v) = lookup("FAILOVER_LOG_FILE") {
            self.log.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("FAILOVER_BIND_ADDR") {
            self.monitor.bind_addr = v;
        }
        override_parsed(&lookup, "FAILOVER_MAX_RESTARTS", &mut self.controller.max_restarts)?;
        override_parsed(&lookup, "FAILOVER_BACKOFF_BASE_SECS", &mut self.controller.backoff_base_secs)?;
        override_parsed(&lookup, "FAILOVER_BACKOFF_CEILING_SECS", &mut self.controller.backoff_ceiling_secs)?;
        override_parsed(&lookup, "FAILOVER_CYCLE_INTERVAL_SECS", &mut self.controller.cycle_interval_secs)?;
        override_parsed(&lookup, "FAILOVER_FAILURE_RATE", &mut self.workload.failure_rate)?;
        override_parsed(&lookup, "FAILOVER_POLL_INTERVAL_SECS", &mut self.monitor.poll_interval_secs)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.workload.failure_rate) {
            bail!("failure_rate must be within [0, 1], got {}", self.workload.failure_rate);
        }
        if self.controller.max_restarts == 0 {
            bail!("max_restarts must be at least 1");
        }
        if self.controller.backoff_ceiling_secs < self.controller.backoff_base_secs {
            bail!(
                "backoff ceiling ({}s) is below backoff base ({}s)",
                self.controller.backoff_ceiling_secs,
                self.controller.backoff_base_secs
            );
        }
        if self.monitor.poll_interval_secs == 0 {
            bail!("poll_interval_secs must be at least 1");
        }
        if self.log.decision_window > self.log.retained_lines {
            bail!(
                "decision window ({}) exceeds retained log lines ({})",
                self.log.decision_window,
                self.log.retained_lines
            );
        }
        Ok(())
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| eyre::eyre!("Invalid value for {}: {:?} ({})", key, raw, e))?;
    }
    Ok(())
}
