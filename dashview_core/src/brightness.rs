//! Brightness Controller - backlight target, smoothing and dispatch.
//!
//! Pipeline per tick:
//!
//! ```text
//! light_sensor ─▶ CIE lightness ─▶ clamp [10,100] ─▶ anti-burn-in cap
//!                                                        │
//!                   offroad: fixed constant ─────────────┤
//!                                                        ▼
//!                                             first order filter
//!                                                        │
//!                         asleep → 0 / dimmed → x% ◀─────┘
//! ```
//!
//! The hardware write happens off the tick thread and only when the
//! integer value changes.

use crate::config::UiConfig;
use crate::scene::UiState;
use dashview_env::{Hardware, HardwareProfile, UiContext};
use std::sync::Arc;
use tracing::{debug, warn};

/// Hours of onroad time before the anti-burn-in cap starts dropping.
pub const MAX_BRIGHTNESS_HOURS: f32 = 4.0;

/// Cap decrease per hour past [`MAX_BRIGHTNESS_HOURS`] (percent).
pub const HOURLY_BRIGHTNESS_DECREASE: f32 = 5.0;

/// Exponential low-pass filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FirstOrderFilter {
    x: f32,
    k: f32,
}

impl FirstOrderFilter {
    /// Filter starting at `x0` with time constant `ts` sampled every `dt`.
    pub fn new(x0: f32, ts: f32, dt: f32) -> Self {
        let ratio = dt / ts;
        Self {
            x: x0,
            k: ratio / (1.0 + ratio),
        }
    }

    pub fn update(&mut self, x: f32) -> f32 {
        self.x += self.k * (x - self.x);
        self.x
    }

    pub fn x(&self) -> f32 {
        self.x
    }
}

/// CIE 1931 lightness of `light` in [0, 1], as a percentage in [10, 100].
pub fn perceived_brightness(light: f32) -> f32 {
    let b = 100.0 * light;
    let b = if b <= 8.0 {
        b / 903.3
    } else {
        ((b + 16.0) / 116.0).powi(3)
    };
    (100.0 * b).clamp(10.0, 100.0)
}

/// Highest brightness allowed after `running_time` seconds onroad.
pub fn anti_burn_in_cap(running_time: f64) -> f32 {
    let hours = (running_time / 3600.0) as f32;
    (100.0 - HOURLY_BRIGHTNESS_DECREASE * (hours - MAX_BRIGHTNESS_HOURS)).clamp(30.0, 100.0)
}

/// Unfiltered backlight target in percent.
pub fn target_brightness(started: bool, light: f32, running_time: f64, profile: HardwareProfile, offroad: f32) -> f32 {
    if !started {
        return offroad;
    }
    let mut target = perceived_brightness(light);
    if profile.supports_anti_burn_in() {
        target = target.min(anti_burn_in_cap(running_time));
    }
    target
}

/// Owns the brightness filter and the last dispatched value.
pub struct BrightnessController {
    filter: FirstOrderFilter,
    offroad: f32,
    profile: HardwareProfile,
    last_brightness: Option<i32>,
}

impl BrightnessController {
    pub fn new(config: &UiConfig, profile: HardwareProfile) -> Self {
        Self {
            filter: FirstOrderFilter::new(config.backlight_offroad, config.backlight_ts, config.backlight_dt),
            offroad: config.backlight_offroad,
            profile,
            last_brightness: None,
        }
    }

    /// Advances the filter and returns the brightness for this tick.
    pub fn compute(&mut self, s: &UiState, awake: bool) -> i32 {
        let scene = &s.scene;
        let target = target_brightness(scene.started, scene.light_sensor, s.running_time, self.profile, self.offroad);
        let brightness = self.filter.update(target) as i32;

        if !awake {
            0
        } else if scene.started && scene.scr.n_time <= 0 && scene.scr.auto_screen_off != 0 {
            (scene.scr.brightness_off as f32 * 0.01 * brightness as f32) as i32
        } else {
            brightness
        }
    }

    /// Computes this tick's brightness and writes it if it changed.
    ///
    /// Returns the dispatched value.
    pub fn update<Ctx: UiContext>(
        &mut self,
        s: &UiState,
        awake: bool,
        ctx: &Ctx,
        hw: &Arc<dyn Hardware>,
    ) -> Option<i32> {
        let brightness = self.compute(s, awake);
        if self.last_brightness == Some(brightness) {
            return None;
        }
        self.last_brightness = Some(brightness);

        debug!("setting brightness {}", brightness);
        let hw = Arc::clone(hw);
        let percent = brightness.clamp(0, 100) as u8;
        ctx.spawn_blocking("brightness", move || {
            if let Err(e) = hw.set_brightness(percent) {
                warn!("failed to set brightness: {}", e);
            }
        });
        Some(brightness)
    }

    pub fn filtered(&self) -> f32 {
        self.filter.x()
    }

    pub fn last_brightness(&self) -> Option<i32> {
        self.last_brightness
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use async_trait::async_trait;
    use dashview_env::EnvError;
    use proptest::prelude::*;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Runs blocking work inline.
    struct InlineContext;

    #[async_trait]
    impl UiContext for InlineContext {
        fn now(&self) -> Duration {
            Duration::ZERO
        }

        async fn sleep(&self, _duration: Duration) {}

        fn spawn_blocking<F>(&self, _name: &str, work: F)
        where
            F: FnOnce() + Send + 'static,
        {
            work()
        }
    }

    #[derive(Default)]
    struct Backlight {
        writes: Mutex<Vec<u8>>,
    }

    impl Hardware for Backlight {
        fn profile(&self) -> HardwareProfile {
            HardwareProfile::Tici
        }

        fn set_display_power(&self, _on: bool) -> Result<(), EnvError> {
            Ok(())
        }

        fn set_brightness(&self, percent: u8) -> Result<(), EnvError> {
            self.writes.lock().unwrap().push(percent);
            Ok(())
        }
    }

    fn onroad_state(light: f32) -> UiState {
        let mut s = UiState::new(&UiConfig::default());
        s.scene.started = true;
        s.scene.light_sensor = light;
        s
    }

    #[test]
    fn test_filter_converges() {
        let mut f = FirstOrderFilter::new(50.0, 10.0, 0.05);
        let first = f.update(100.0);
        assert_relative_eq!(first, 50.0 + 50.0 * (0.005 / 1.005), epsilon = 1e-4);
        for _ in 0..5000 {
            f.update(100.0);
        }
        assert_relative_eq!(f.x(), 100.0, epsilon = 1e-2);
    }

    #[test]
    fn test_perceived_brightness_curve() {
        assert_relative_eq!(perceived_brightness(0.0), 10.0);
        assert_relative_eq!(perceived_brightness(1.0), 100.0, epsilon = 1e-4);
        let half = ((50.0f32 + 16.0) / 116.0).powi(3) * 100.0;
        assert_relative_eq!(perceived_brightness(0.5), half, epsilon = 1e-4);
    }

    #[test]
    fn test_anti_burn_in_cap() {
        assert_relative_eq!(anti_burn_in_cap(0.0), 100.0);
        assert_relative_eq!(anti_burn_in_cap(4.0 * 3600.0), 100.0);
        assert_relative_eq!(anti_burn_in_cap(10.0 * 3600.0), 70.0, epsilon = 1e-4);
        assert_relative_eq!(anti_burn_in_cap(100.0 * 3600.0), 30.0);
    }

    #[test]
    fn test_target_offroad_is_constant() {
        for light in [0.0, 0.3, 1.0] {
            let t = target_brightness(false, light, 1e6, HardwareProfile::Tici, 50.0);
            assert_eq!(t, 50.0);
        }
    }

    #[test]
    fn test_anti_burn_in_only_on_tici() {
        let long = 20.0 * 3600.0;
        assert_relative_eq!(target_brightness(true, 1.0, long, HardwareProfile::Tici, 50.0), 30.0);
        assert_relative_eq!(
            target_brightness(true, 1.0, long, HardwareProfile::Legacy, 50.0),
            100.0,
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_half_light_trends_to_curve() {
        let config = UiConfig::default();
        let mut ctl = BrightnessController::new(&config, HardwareProfile::Tici);
        let s = onroad_state(0.5);
        let mut b = 0;
        for _ in 0..5000 {
            b = ctl.compute(&s, true);
        }
        let expected = perceived_brightness(0.5);
        assert!((b as f32 - expected).abs() <= 1.0, "{} vs {}", b, expected);
    }

    #[test]
    fn test_asleep_forces_zero() {
        let mut ctl = BrightnessController::new(&UiConfig::default(), HardwareProfile::Pc);
        assert_eq!(ctl.compute(&onroad_state(1.0), false), 0);
    }

    #[test]
    fn test_dimming_scales_filtered_value() {
        let mut ctl = BrightnessController::new(&UiConfig::default(), HardwareProfile::Pc);
        let mut s = UiState::new(&UiConfig::default());
        s.scene.started = true;
        s.scene.light_sensor = 0.5;
        s.scene.scr.auto_screen_off = 1;
        s.scene.scr.brightness_off = 40;

        // First tick: filter barely moves from 50.
        assert_eq!(ctl.compute(&s, true), 19);

        s.scene.scr.n_time = 10;
        assert_eq!(ctl.compute(&s, true), 49);
    }

    #[test]
    fn test_dispatch_only_on_change() {
        let hw = Arc::new(Backlight::default());
        let dyn_hw: Arc<dyn Hardware> = hw.clone();
        let mut ctl = BrightnessController::new(&UiConfig::default(), HardwareProfile::Pc);
        let s = UiState::new(&UiConfig::default());

        assert_eq!(ctl.update(&s, true, &InlineContext, &dyn_hw), Some(50));
        for _ in 0..10 {
            assert_eq!(ctl.update(&s, true, &InlineContext, &dyn_hw), None);
        }
        assert_eq!(ctl.update(&s, false, &InlineContext, &dyn_hw), Some(0));
        assert_eq!(*hw.writes.lock().unwrap(), vec![50, 0]);
    }

    proptest! {
        #[test]
        fn prop_target_monotonic_in_light(
            a in 0.0f32..=1.0,
            b in 0.0f32..=1.0,
            hours in 0.0f64..30.0,
        ) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let running = hours * 3600.0;
            for profile in [HardwareProfile::Legacy, HardwareProfile::Tici, HardwareProfile::Pc] {
                let t_lo = target_brightness(true, lo, running, profile, 50.0);
                let t_hi = target_brightness(true, hi, running, profile, 50.0);
                prop_assert!(t_lo <= t_hi);
                prop_assert!((10.0..=100.0).contains(&t_hi));
            }
        }
    }
}
