//! Wakefulness State Machine - display on/off.
//!
//! The display stays on while `awake_timeout` is positive. The countdown is
//! re-armed by onroad activity, the keep-on timer, night dimming, taps on the
//! device and the driver wake key (cruise switch or an on-screen alert).

use crate::config::UiConfig;
use crate::scene::UiScene;
use dashview_env::Hardware;
use tracing::{debug, warn};

/// Accelerometer delta that counts as a tap (m/s²).
pub const ACCEL_TAP_THRESHOLD: f32 = 0.2;

/// Gyroscope delta that counts as a tap (rad/s).
pub const GYRO_TAP_THRESHOLD: f32 = 0.15;

/// What changed during one wakefulness tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WakeEvents {
    /// New display power state, when it was switched
    pub power_changed: Option<bool>,
    /// The wake key rose and forced the display on
    pub forced_wake: bool,
}

#[derive(Debug, Clone)]
pub struct Wakefulness {
    awake: bool,
    awake_timeout: i32,
    accel_prev: f32,
    gyro_prev: f32,
    old_key: i32,

    accel_samples: f32,
    ui_freq: i32,
    sleep_on_timeout: bool,
}

impl Wakefulness {
    pub fn new(config: &UiConfig) -> Self {
        Self {
            awake: false,
            awake_timeout: 0,
            accel_prev: 0.0,
            gyro_prev: 0.0,
            old_key: 0,
            accel_samples: config.accel_samples.max(1) as f32,
            ui_freq: config.ui_freq as i32,
            sleep_on_timeout: config.auto_screen_off_sleeps,
        }
    }

    pub fn awake(&self) -> bool {
        self.awake
    }

    pub fn awake_timeout(&self) -> i32 {
        self.awake_timeout
    }

    fn full_timeout(&self) -> i32 {
        30 * self.ui_freq
    }

    /// Turns the display on and re-arms every countdown.
    pub fn wake(&mut self, scene: &mut UiScene, hw: &dyn Hardware) -> WakeEvents {
        let mut events = WakeEvents::default();
        self.set_awake(true, true, scene, hw, &mut events);
        events
    }

    /// Runs one tick.
    pub fn update(&mut self, scene: &mut UiScene, hw: &dyn Hardware) -> WakeEvents {
        let mut events = WakeEvents::default();
        self.awake_timeout = (self.awake_timeout - 1).max(0);

        // Sensor priors track every tick, whichever branch decides.
        let tapped = self.detect_tap(scene);
        let should_wake = if scene.scr.auto_screen_off == 0 || !scene.ignition {
            scene.started || scene.ignition || tapped
        } else {
            tapped
        };

        self.screen_awake(scene, hw, &mut events);
        let on = self.awake_timeout > 0;
        self.set_awake(on, should_wake, scene, hw, &mut events);
        events
    }

    /// Accelerometer and gyro must both jump against their priors.
    fn detect_tap(&mut self, scene: &UiScene) -> bool {
        let accel_trigger = (scene.accel_sensor - self.accel_prev).abs() > ACCEL_TAP_THRESHOLD;
        let gyro_trigger = (scene.gyro_sensor - self.gyro_prev).abs() > GYRO_TAP_THRESHOLD;

        let n = self.accel_samples;
        self.gyro_prev = scene.gyro_sensor;
        self.accel_prev = (self.accel_prev * (n - 1.0) + scene.accel_sensor) / n;

        accel_trigger && gyro_trigger
    }

    fn screen_awake(&mut self, scene: &mut UiScene, hw: &dyn Hardware, events: &mut WakeEvents) {
        let full = self.full_timeout();
        let scr = &mut scene.scr;

        if scr.n_time > 0 {
            self.awake_timeout = full;
            scr.n_time -= 1;
        } else if scr.brightness_off != 0 {
            self.awake_timeout = full;
        } else if scene.started && scene.ignition && scene.car_state.map(|c| c.v_ego).unwrap_or(0.0) < 1.0 {
            self.awake_timeout = full;
        } else if scr.auto_screen_off != 0 && scr.n_time == 0 && self.sleep_on_timeout {
            self.awake_timeout = 0;
        }

        let mut key = scene.scr.awake;
        if scene.alert_visible() {
            key += 1;
        }

        if key != self.old_key {
            self.old_key = key;
            if key != 0 {
                debug!("wake key {}", key);
                self.set_awake(true, true, scene, hw, events);
                events.forced_wake = true;
            }
        }
    }

    fn set_awake(&mut self, on: bool, reset: bool, scene: &mut UiScene, hw: &dyn Hardware, events: &mut WakeEvents) {
        if on != self.awake {
            self.awake = on;

            if scene.ignition || scene.scr.auto_screen_off == 0 {
                debug!("setting display power {}", on);
                if let Err(e) = hw.set_display_power(on) {
                    warn!("failed to set display power: {}", e);
                }
                events.power_changed = Some(on);
            }
        }

        if reset {
            self.awake_timeout = self.full_timeout();
            scene.scr.n_time = scene.scr.auto_screen_off * 60 * self.ui_freq;
        }
    }
}
