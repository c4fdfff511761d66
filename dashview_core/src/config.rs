//! UI loop configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the UI state loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiConfig {
    /// Tick rate in Hz (default: 20)
    pub ui_freq: u32,

    /// Display width in pixels (default: 2160)
    pub frame_width: f32,

    /// Display height in pixels (default: 1080)
    pub frame_height: f32,

    /// Accelerometer averaging window for tap detection (default: 5 * ui_freq)
    pub accel_samples: u32,

    /// Let the awake countdown expire into sleep when auto screen off is on
    /// (default: false)
    pub auto_screen_off_sleeps: bool,

    /// Backlight percentage while offroad (default: 50)
    pub backlight_offroad: f32,

    /// Backlight filter time constant in seconds (default: 10)
    pub backlight_ts: f32,

    /// Backlight filter sample interval in seconds (default: 0.05)
    pub backlight_dt: f32,

    /// Capacity of the UI event broadcast channel (default: 64)
    pub event_capacity: usize,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            ui_freq: 20,
            frame_width: 2160.0,
            frame_height: 1080.0,
            accel_samples: 100,
            auto_screen_off_sleeps: false,
            backlight_offroad: 50.0,
            backlight_ts: 10.0,
            backlight_dt: 0.05,
            event_capacity: 64,
        }
    }
}

impl UiConfig {
    /// Parses a (possibly partial) JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Interval between ticks.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.ui_freq.max(1)))
    }

    /// Length of a full awake countdown, in ticks.
    pub fn awake_timeout_ticks(&self) -> i32 {
        30 * self.ui_freq as i32
    }

    /// Ticks without a panda update before the adapter reads as unknown.
    pub fn panda_timeout_ticks(&self) -> u64 {
        5 * u64::from(self.ui_freq)
    }

    /// Frames between engageability refreshes.
    pub fn engageable_interval(&self) -> u64 {
        u64::from(self.ui_freq / 2).max(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = UiConfig::default();
        assert_eq!(config.ui_freq, 20);
        assert_eq!(config.accel_samples, 5 * config.ui_freq);
        assert!(!config.auto_screen_off_sleeps);
        assert_eq!(config.tick_period(), Duration::from_millis(50));
        assert_eq!(config.awake_timeout_ticks(), 600);
        assert_eq!(config.panda_timeout_ticks(), 100);
        assert_eq!(config.engageable_interval(), 10);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = UiConfig::from_json_str(r#"{"ui_freq": 10, "auto_screen_off_sleeps": true}"#).unwrap();
        assert_eq!(config.ui_freq, 10);
        assert!(config.auto_screen_off_sleeps);
        assert_eq!(config.frame_width, 2160.0);
        assert_eq!(config.engageable_interval(), 5);
    }

    #[test]
    fn test_engageable_interval_never_zero() {
        let config = UiConfig { ui_freq: 1, ..Default::default() };
        assert_eq!(config.engageable_interval(), 1);
    }
}
