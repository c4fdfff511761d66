//! Production implementation of UiContext using Tokio.

use crate::UiContext;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::warn;

/// Production context backed by Tokio.
///
/// Time comes from the system monotonic clock. Blocking work goes to the
/// runtime's blocking pool, or to a detached OS thread when no runtime is
/// entered.
pub struct TokioContext {
    /// Start time for monotonic duration calculations
    start: Instant,
}

impl TokioContext {
    /// Creates a new TokioContext.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Creates an Arc-wrapped context for sharing across tasks.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

impl Default for TokioContext {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UiContext for TokioContext {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    fn spawn_blocking<F>(&self, name: &str, work: F)
    where
        F: FnOnce() + Send + 'static,
    {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                // Detached: the JoinHandle is dropped on purpose.
                let _ = handle.spawn_blocking(work);
            }
            Err(_) => {
                let spawned = std::thread::Builder::new()
                    .name(name.to_string())
                    .spawn(work);
                if let Err(e) = spawned {
                    warn!("failed to spawn {} worker: {}", name, e);
                }
            }
        }
    }
}
