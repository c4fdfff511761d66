//! Hardware abstraction: display power, backlight and device profile.

use crate::error::EnvError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

/// Device family, used to pick sensor and display constants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HardwareProfile {
    /// Older phone-based unit
    Legacy,
    /// Current dedicated unit with OLED panel and wide road camera
    Tici,
    /// Desktop development build
    #[default]
    Pc,
}

impl HardwareProfile {
    /// Maximum integration lines of the road camera sensor.
    pub fn max_sensor_lines(&self) -> f32 {
        match self {
            HardwareProfile::Legacy => 5408.0,
            _ => 1904.0,
        }
    }

    /// Maximum analog gain of the road camera sensor.
    pub fn max_sensor_gain(&self) -> f32 {
        match self {
            HardwareProfile::Legacy => 1.0,
            _ => 10.0,
        }
    }

    /// Exposure value at which the light sensor reads fully dark.
    pub fn max_exposure(&self) -> f32 {
        let max_ev = self.max_sensor_lines() * self.max_sensor_gain();
        match self {
            HardwareProfile::Tici => max_ev / 6.0,
            _ => max_ev,
        }
    }

    /// Whether the panel needs the long-running brightness cap.
    pub fn supports_anti_burn_in(&self) -> bool {
        matches!(self, HardwareProfile::Tici)
    }

    /// Whether a wide road camera is fitted.
    pub fn has_wide_camera(&self) -> bool {
        matches!(self, HardwareProfile::Tici)
    }

    pub fn name(&self) -> &'static str {
        match self {
            HardwareProfile::Legacy => "legacy",
            HardwareProfile::Tici => "tici",
            HardwareProfile::Pc => "pc",
        }
    }
}

impl std::fmt::Display for HardwareProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for HardwareProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "legacy" | "eon" => Ok(HardwareProfile::Legacy),
            "tici" => Ok(HardwareProfile::Tici),
            "pc" => Ok(HardwareProfile::Pc),
            _ => Err(format!("Unknown hardware profile: {}", s)),
        }
    }
}

/// Actions the UI performs on the device.
///
/// `set_brightness` may block and is always called off the tick thread.
pub trait Hardware: Send + Sync + 'static {
    fn profile(&self) -> HardwareProfile;

    fn set_display_power(&self, on: bool) -> Result<(), EnvError>;

    /// Sets the backlight, `percent` in [0, 100].
    fn set_brightness(&self, percent: u8) -> Result<(), EnvError>;
}

/// Linux backlight driven through sysfs nodes.
pub struct SysfsHardware {
    profile: HardwareProfile,
    brightness_path: PathBuf,
    power_path: PathBuf,
    max_brightness: u32,
}

impl SysfsHardware {
    /// Backlight device exposed by the panel driver.
    pub const DEFAULT_BACKLIGHT_DIR: &'static str = "/sys/class/backlight/panel0-backlight";

    /// Creates a backlight writer for the device directory `dir`.
    ///
    /// Reads `max_brightness` once; falls back to 1023 when absent.
    pub fn new(profile: HardwareProfile, dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let max_brightness = fs::read_to_string(dir.join("max_brightness"))
            .ok()
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(1023);

        Self {
            profile,
            brightness_path: dir.join("brightness"),
            power_path: dir.join("bl_power"),
            max_brightness,
        }
    }

    fn write(&self, path: &PathBuf, value: String) -> Result<(), EnvError> {
        fs::write(path, value)
            .map_err(|e| EnvError::hardware(format!("{}: {}", path.display(), e)))
    }
}

impl Hardware for SysfsHardware {
    fn profile(&self) -> HardwareProfile {
        self.profile
    }

    fn set_display_power(&self, on: bool) -> Result<(), EnvError> {
        // FB_BLANK_UNBLANK = 0, FB_BLANK_POWERDOWN = 4
        self.write(&self.power_path, if on { "0" } else { "4" }.to_string())
    }

    fn set_brightness(&self, percent: u8) -> Result<(), EnvError> {
        let raw = u32::from(percent.min(100)) * self.max_brightness / 100;
        self.write(&self.brightness_path, raw.to_string())
    }
}
