//! Error types for the simulation harness.

use dashview_core::UiConfig;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration parsed but is unusable
    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Loads a UI configuration from a JSON file, missing fields take defaults.
pub fn load_ui_config(path: impl AsRef<Path>) -> Result<UiConfig, SimError> {
    let text = std::fs::read_to_string(path)?;
    let config = UiConfig::from_json_str(&text)?;
    if config.ui_freq == 0 {
        return Err(SimError::Config("ui_freq must be positive".to_string()));
    }
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_is_io_error() {
        let err = load_ui_config("/nonexistent/dashview.json").unwrap_err();
        assert!(matches!(err, SimError::Io(_)));
    }

    #[test]
    fn test_load_partial_config() {
        let path = std::env::temp_dir().join(format!("dashview-sim-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"ui_freq": 10}"#).unwrap();
        let config = load_ui_config(&path).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.ui_freq, 10);
        assert_eq!(config.accel_samples, UiConfig::default().accel_samples);
    }

    #[test]
    fn test_zero_rate_rejected() {
        let path = std::env::temp_dir().join(format!("dashview-sim-zero-{}.json", std::process::id()));
        std::fs::write(&path, r#"{"ui_freq": 0}"#).unwrap();
        let err = load_ui_config(&path).unwrap_err();
        std::fs::remove_file(&path).unwrap();

        assert!(matches!(err, SimError::Config(_)));
    }
}
