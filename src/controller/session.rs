//! Processing session abstraction.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;

/// An open connection to the compute backend.
#[async_trait]
pub trait ProcessingSession: Send + Sync {
    /// Cheap liveness check; an error means the session must be re-created.
    async fn check_health(&self) -> Result<()>;

    /// Release the session. Best-effort; callers log failures.
    async fn close(&mut self) -> Result<()>;
}

/// Creates processing sessions.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    type Session: ProcessingSession;

    async fn open(&self) -> Result<Self::Session>;
}

#[async_trait]
impl<T: SessionFactory> SessionFactory for Arc<T> {
    type Session = T::Session;

    async fn open(&self) -> Result<T::Session> {
        (**self).open().await
    }
}
