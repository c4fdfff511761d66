//! Hardware double that records every display action.

use dashview_env::{EnvError, Hardware, HardwareProfile};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Records display power and backlight writes in call order.
pub struct RecordingHardware {
    profile: HardwareProfile,
    power: Mutex<Vec<bool>>,
    brightness: Mutex<Vec<u8>>,
    /// Makes backlight writes fail, to exercise error logging
    fail_brightness: AtomicBool,
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl RecordingHardware {
    pub fn new(profile: HardwareProfile) -> Self {
        Self {
            profile,
            power: Mutex::new(Vec::new()),
            brightness: Mutex::new(Vec::new()),
            fail_brightness: AtomicBool::new(false),
        }
    }

    pub fn set_fail_brightness(&self, fail: bool) {
        self.fail_brightness.store(fail, Ordering::SeqCst);
    }

    /// Every display power write so far.
    pub fn power_log(&self) -> Vec<bool> {
        lock(&self.power).clone()
    }

    /// Every backlight write so far.
    pub fn brightness_log(&self) -> Vec<u8> {
        lock(&self.brightness).clone()
    }

    /// Display power as last written, `None` before any write.
    pub fn display_on(&self) -> Option<bool> {
        lock(&self.power).last().copied()
    }

    pub fn last_brightness(&self) -> Option<u8> {
        lock(&self.brightness).last().copied()
    }
}

impl Hardware for RecordingHardware {
    fn profile(&self) -> HardwareProfile {
        self.profile
    }

    fn set_display_power(&self, on: bool) -> Result<(), EnvError> {
        lock(&self.power).push(on);
        Ok(())
    }

    fn set_brightness(&self, percent: u8) -> Result<(), EnvError> {
        if self.fail_brightness.load(Ordering::SeqCst) {
            return Err(EnvError::hardware("backlight unavailable"));
        }
        lock(&self.brightness).push(percent);
        Ok(())
    }
}
