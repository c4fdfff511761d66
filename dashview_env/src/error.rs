//! Error types for the DashView environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// Parameter store read/write failed
    #[error("Parameter error: {0}")]
    ParamError(String),

    /// Hardware action (display power, backlight) failed
    #[error("Hardware error: {0}")]
    HardwareError(String),

    /// Persistent storage backend failed
    #[error("Storage error: {0}")]
    Storage(#[from] sled::Error),
}

impl EnvError {
    /// Creates a parameter store error.
    pub fn param(msg: impl Into<String>) -> Self {
        Self::ParamError(msg.into())
    }

    /// Creates a hardware error.
    pub fn hardware(msg: impl Into<String>) -> Self {
        Self::HardwareError(msg.into())
    }
}
