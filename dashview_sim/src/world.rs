//! The simulated world: one device, one car, one UI runtime.

use crate::context::SimContext;
use crate::hardware::RecordingHardware;
use crate::oracle::DriveOracle;
use dashview_core::{TickReport, UiConfig, UiEvent, UiRuntime, UiScene, UiState};
use dashview_env::{ChannelSource, HardwareProfile, MemoryParams, Message, ParamKey, ParamStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

/// Configuration for a simulated world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Master seed; the physics seed is derived from it
    pub seed: u64,
    pub profile: HardwareProfile,
    /// Runtime configuration handed to the UI
    pub ui: UiConfig,
    /// Stored `IsOpenpilotViewEnabled` value
    pub preview_mode: bool,
    /// Stored `AutoScreenOff` value (minutes)
    pub auto_screen_off: i32,
    /// Stored `BrightnessOff` value (percent)
    pub brightness_off: i32,
    /// Standard deviation of sensor noise
    pub sensor_noise_std: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            profile: HardwareProfile::Tici,
            ui: UiConfig::default(),
            preview_mode: false,
            auto_screen_off: 0,
            brightness_off: 0,
            sensor_noise_std: 0.02,
        }
    }
}

/// Events observed on the runtime's broadcast channel, stamped by frame.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorldLog {
    pub offroad_transitions: Vec<(u64, bool)>,
    pub power_changes: Vec<(u64, bool)>,
    pub scenes: u64,
    /// Events dropped because the receiver fell behind
    pub lagged: u64,
}

/// A device running the UI loop against a DriveOracle.
pub struct SimWorld {
    config: SimConfig,
    context: Arc<SimContext>,
    pub oracle: DriveOracle,
    hardware: Arc<RecordingHardware>,
    params: Arc<MemoryParams>,
    runtime: UiRuntime<SimContext, ChannelSource>,
    tx: mpsc::Sender<Message>,
    events: broadcast::Receiver<UiEvent>,
    log: WorldLog,
    last_scene: Option<Arc<UiScene>>,
    frame: u64,
}

impl SimWorld {
    pub fn new(config: SimConfig) -> Self {
        let physics_seed = config.seed.wrapping_mul(0x9e3779b97f4a7c15);
        let context = SimContext::shared(config.seed);
        let mut oracle = DriveOracle::new(physics_seed, config.profile);
        oracle.set_sensor_noise(config.sensor_noise_std);

        let hardware = Arc::new(RecordingHardware::new(config.profile));
        let params = Arc::new(
            MemoryParams::new()
                .with(ParamKey::IsMetric, "1")
                .with(ParamKey::IsOpenpilotViewEnabled, bool_param(config.preview_mode))
                .with(ParamKey::AutoScreenOff, config.auto_screen_off.to_string())
                .with(ParamKey::BrightnessOff, config.brightness_off.to_string()),
        );

        // Generous capacity so a full second of messages never blocks.
        let (tx, source) = ChannelSource::channel(1024);
        let runtime = UiRuntime::new(
            context.clone(),
            source,
            hardware.clone(),
            params.clone(),
            config.ui.clone(),
        );
        let events = runtime.subscribe();

        info!(
            "sim world seed {} physics seed {:#x} profile {}",
            config.seed, physics_seed, config.profile
        );

        Self {
            config,
            context,
            oracle,
            hardware,
            params,
            runtime,
            tx,
            events,
            log: WorldLog::default(),
            last_scene: None,
            frame: 0,
        }
    }

    /// Runs one UI frame: publish, tick, advance the clock.
    pub fn step(&mut self) -> TickReport {
        let period = self.config.ui.tick_period();
        self.oracle.step(period.as_secs_f64());

        self.frame += 1;
        let now_ns = self.context.time_ns();
        for msg in self.oracle.messages(self.frame, self.config.ui.ui_freq, now_ns) {
            if let Err(e) = self.tx.try_send(msg) {
                warn!("dropping simulated message: {}", e);
            }
        }

        let report = self.runtime.tick();
        self.context.advance_time(period);
        self.drain_events(report.frame);
        report
    }

    fn drain_events(&mut self, frame: u64) {
        loop {
            match self.events.try_recv() {
                Ok(UiEvent::SceneUpdated(scene)) => {
                    self.log.scenes += 1;
                    self.last_scene = Some(scene);
                }
                Ok(UiEvent::OffroadTransition(offroad)) => {
                    info!(frame, offroad, "offroad transition");
                    self.log.offroad_transitions.push((frame, offroad));
                }
                Ok(UiEvent::DisplayPowerChanged(on)) => {
                    info!(frame, on, "display power");
                    self.log.power_changes.push((frame, on));
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    debug!("event receiver lagged by {}", n);
                    self.log.lagged += n;
                }
                Err(_) => break,
            }
        }
    }

    /// Steps for `secs` seconds of simulated time.
    pub fn run_for(&mut self, secs: f64) {
        for _ in 0..self.ticks_for(secs) {
            self.step();
        }
    }

    /// Steps until `done` holds or `secs` elapse; returns whether it held.
    pub fn run_until(&mut self, secs: f64, mut done: impl FnMut(&SimWorld) -> bool) -> bool {
        for _ in 0..self.ticks_for(secs) {
            self.step();
            if done(self) {
                return true;
            }
        }
        false
    }

    /// Whole frames covering `secs` seconds.
    pub fn ticks_for(&self, secs: f64) -> u64 {
        (secs.max(0.0) * f64::from(self.config.ui.ui_freq)).round() as u64
    }

    /// Jumps the monotonic clock, e.g. to emulate a long uptime.
    pub fn set_clock(&mut self, since_boot: Duration) {
        self.context.set_time(since_boot.as_nanos() as u64);
    }

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    pub fn state(&self) -> &UiState {
        self.runtime.state()
    }

    pub fn runtime(&self) -> &UiRuntime<SimContext, ChannelSource> {
        &self.runtime
    }

    pub fn hardware(&self) -> &RecordingHardware {
        &self.hardware
    }

    pub fn params(&self) -> &dyn ParamStore {
        self.params.as_ref()
    }

    pub fn log(&self) -> &WorldLog {
        &self.log
    }

    /// Most recent scene received on the event channel.
    pub fn last_scene(&self) -> Option<&Arc<UiScene>> {
        self.last_scene.as_ref()
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Simulated seconds since the world was created.
    pub fn elapsed_secs(&self) -> f64 {
        self.oracle.time()
    }
}

fn bool_param(v: bool) -> &'static str {
    if v {
        "1"
    } else {
        "0"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashview_core::UiStatus;
    use dashview_env::messages::PandaType;

    #[test]
    fn test_world_starts_offroad_and_awake() {
        let mut world = SimWorld::new(SimConfig::default());
        let report = world.step();

        assert_eq!(report.frame, 1);
        assert_eq!(report.offroad_transition, Some(true));
        assert!(report.awake);
        assert_eq!(world.hardware().display_on(), Some(true));
        assert_eq!(world.log().offroad_transitions, vec![(1, true)]);
        assert_eq!(world.state().scene.panda_type, PandaType::Dos);
    }

    #[test]
    fn test_ignition_goes_onroad() {
        let mut world = SimWorld::new(SimConfig::default());
        world.run_for(1.0);
        world.oracle.set_ignition(true);
        world.oracle.set_engaged(true);
        let onroad = world.run_until(2.0, |w| w.state().scene.started);

        assert!(onroad);
        assert_eq!(world.log().offroad_transitions.last().map(|t| t.1), Some(false));
        // The edge itself resets status; the next controls update sets it.
        assert_eq!(world.state().scene.status, UiStatus::Disengaged);
        world.step();
        assert_eq!(world.state().scene.status, UiStatus::Engaged);
    }

    #[test]
    fn test_scene_events_track_frames() {
        let mut world = SimWorld::new(SimConfig::default());
        world.run_for(2.0);

        assert_eq!(world.frame(), 40);
        assert_eq!(world.log().scenes + world.log().lagged, 40);
        assert!(world.last_scene().is_some());
        assert!((world.elapsed_secs() - 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_same_seed_same_outcome() {
        let run = || {
            let mut world = SimWorld::new(SimConfig::default());
            world.oracle.set_ignition(true);
            world.oracle.set_target_speed(20.0);
            world.run_for(5.0);
            (
                world.hardware().brightness_log(),
                world.state().scene.track_vertices.clone(),
            )
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_params_are_seeded_from_config() {
        let world = SimWorld::new(SimConfig {
            auto_screen_off: 2,
            preview_mode: true,
            ..Default::default()
        });
        assert_eq!(world.params().get_int(ParamKey::AutoScreenOff), 2);
        assert!(world.params().get_bool(ParamKey::IsOpenpilotViewEnabled));
        assert_eq!(world.state().scene.scr.auto_screen_off, 2);
    }
}
