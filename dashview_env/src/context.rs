//! Core environment context trait for the DashView UI loop.

use async_trait::async_trait;
use std::time::Duration;

/// The central interface for clock and execution.
///
/// This trait abstracts the "real world" so that the UI state loop can run
/// in both production (tokio) and simulation (virtual clock) environments.
///
/// # Implementations
///
/// - **Production**: `TokioContext` - wraps `tokio::time` and the blocking pool
/// - **Simulation**: `SimContext` - manually advanced clock, inline execution
#[async_trait]
pub trait UiContext: Send + Sync + 'static {
    /// Returns the monotonic time since boot.
    ///
    /// Compared against `deviceState.started_mono_time` to derive how long
    /// the device has been onroad.
    fn now(&self) -> Duration;

    /// Suspends execution for the given duration.
    ///
    /// In production: wraps `tokio::time::sleep`
    /// In simulation: advances virtual clock
    async fn sleep(&self, duration: Duration);

    /// Runs a potentially blocking closure off the tick thread.
    ///
    /// The caller never observes completion. Used for hardware writes that
    /// may stall (e.g. backlight sysfs nodes).
    fn spawn_blocking<F>(&self, name: &str, work: F)
    where
        F: FnOnce() + Send + 'static;
}
