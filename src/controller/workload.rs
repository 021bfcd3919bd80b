//! Workload abstraction and the fault-injection hook.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::Rng;

use crate::error::{FailoverError, Result};

/// The supervised work: generate a dataset, then process it.
#[async_trait]
pub trait Workload: Send + Sync {
    type Dataset: Send;

    async fn generate(&self) -> Result<Self::Dataset>;

    async fn process(&self, dataset: Self::Dataset) -> Result<()>;
}

#[async_trait]
impl<T: Workload> Workload for Arc<T> {
    type Dataset = T::Dataset;

    async fn generate(&self) -> Result<T::Dataset> {
        (**self).generate().await
    }

    async fn process(&self, dataset: T::Dataset) -> Result<()> {
        (**self).process(dataset).await
    }
}

/// Decides whether the next process step should fail on purpose.
pub trait FaultSource: Send + Sync {
    fn should_fail(&self) -> bool;
}

/// Never injects a fault
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFaults;

impl FaultSource for NoFaults {
    fn should_fail(&self) -> bool {
        false
    }
}

/// Injects faults at a fixed probability
#[derive(Debug, Clone, Copy)]
pub struct RandomFaults {
    rate: f64,
}

impl RandomFaults {
    /// `rate` is clamped to [0, 1]
    pub fn new(rate: f64) -> Self {
        let rate = if rate.is_nan() { 0.0 } else { rate.clamp(0.0, 1.0) };
        Self { rate }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl FaultSource for RandomFaults {
    fn should_fail(&self) -> bool {
        rand::rng().random_bool(self.rate)
    }
}

/// Replays a fixed fail/pass sequence, then stops failing.
#[derive(Debug, Default)]
pub struct ScriptedFaults {
    script: Mutex<VecDeque<bool>>,
}

impl ScriptedFaults {
    pub fn new(script: impl IntoIterator<Item = bool>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
        }
    }
}

impl FaultSource for ScriptedFaults {
    fn should_fail(&self) -> bool {
        self.script
            .lock()
            .ok()
            .and_then(|mut s| s.pop_front())
            .unwrap_or(false)
    }
}

/// Wraps a workload so that its process step can fail on demand.
pub struct InjectedFaults<W, F> {
    inner: W,
    faults: F,
}

impl<W, F> InjectedFaults<W, F>
where
    W: Workload,
    F: FaultSource,
{
    pub fn new(inner: W, faults: F) -> Self {
        Self { inner, faults }
    }

    pub fn inner(&self) -> &W {
        &self.inner
    }
}

#[async_trait]
impl<W, F> Workload for InjectedFaults<W, F>
where
    W: Workload,
    F: FaultSource,
{
    type Dataset = W::Dataset;

    async fn generate(&self) -> Result<Self::Dataset> {
        self.inner.generate().await
    }

    async fn process(&self, dataset: Self::Dataset) -> Result<()> {
        if self.faults.should_fail() {
            return Err(FailoverError::Workload("injected fault".to_string()));
        }
        self.inner.process(dataset).await
    }
}
