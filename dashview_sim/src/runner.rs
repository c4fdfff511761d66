//! Scenario runner - executes drive scenarios against a simulated device.

use crate::exporter::{SimEvent, SimExport, SimFrame};
use crate::scenarios::ScenarioId;
use crate::world::{SimConfig, SimWorld};

use dashview_core::{TickReport, UiConfig, UiStatus};
use dashview_env::messages::{AlertSize, AlertStatus, PandaType};
use dashview_env::HardwareProfile;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Results from running a scenario.
#[derive(Debug, Clone)]
pub struct ScenarioResult {
    /// Scenario that was run
    pub scenario: ScenarioId,

    /// Seed used
    pub seed: u64,

    /// Whether scenario passed all assertions
    pub passed: bool,

    /// Total ticks executed
    pub total_ticks: u64,

    /// Final simulation time in seconds
    pub final_time_secs: f64,

    /// Failure message if any
    pub failure_reason: Option<String>,

    /// Metrics collected during run
    pub metrics: ScenarioMetrics,
}

/// Metrics collected during scenario execution.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ScenarioMetrics {
    /// Messages the UI accepted
    pub messages_delivered: u64,

    /// Scenes received on the event channel
    pub scenes_emitted: u64,

    pub onroad_transitions: u64,

    /// Offroad edges, including the initial one on the first frame
    pub offroad_transitions: u64,

    pub power_toggles: u64,

    /// Backlight values dispatched to the panel
    pub brightness_writes: u64,

    pub forced_wakes: u64,

    /// Lowest backlight dispatched while onroad and awake
    pub min_onroad_brightness: Option<i32>,

    pub max_brightness: Option<i32>,

    /// Longest planned path ribbon seen
    pub max_track_vertices: usize,

    #[serde(skip)]
    prev_awake: bool,
}

impl ScenarioMetrics {
    fn observe(&mut self, report: &TickReport, track_vertices: usize) {
        self.messages_delivered += report.messages as u64;

        match report.offroad_transition {
            Some(false) => self.onroad_transitions += 1,
            Some(true) => self.offroad_transitions += 1,
            None => {}
        }
        if report.wake.power_changed.is_some() {
            self.power_toggles += 1;
        }
        if report.wake.forced_wake {
            self.forced_wakes += 1;
        }

        if let Some(b) = report.brightness {
            self.brightness_writes += 1;
            self.max_brightness = Some(self.max_brightness.map_or(b, |m| m.max(b)));
            // Brightness is computed before wakefulness, so it lags by a tick.
            if report.started && report.awake && self.prev_awake {
                self.min_onroad_brightness = Some(self.min_onroad_brightness.map_or(b, |m| m.min(b)));
            }
        }
        self.prev_awake = report.awake;

        self.max_track_vertices = self.max_track_vertices.max(track_vertices);
    }
}

/// A world under test plus everything recorded about it.
struct Session {
    world: SimWorld,
    metrics: ScenarioMetrics,
    export: SimExport,
    export_every: u64,
    exported_offroad: usize,
    exported_power: usize,
}

impl Session {
    fn new(world: SimWorld, scenario: ScenarioId, export_every: u64) -> Self {
        let seed = world.config().seed;
        Self {
            world,
            metrics: ScenarioMetrics::default(),
            export: SimExport::new(scenario.name(), seed),
            export_every: export_every.max(1),
            exported_offroad: 0,
            exported_power: 0,
        }
    }

    fn step(&mut self) -> TickReport {
        let report = self.world.step();
        self.metrics
            .observe(&report, self.world.state().scene.track_vertices.len());
        if report.frame % self.export_every == 0 {
            self.sample();
        }
        report
    }

    fn run_for(&mut self, secs: f64) {
        for _ in 0..self.world.ticks_for(secs) {
            self.step();
        }
    }

    /// Runs until `secs` seconds have elapsed in total.
    fn run_to(&mut self, secs: f64) {
        self.run_for(secs - self.world.elapsed_secs());
    }

    fn run_until(&mut self, secs: f64, mut done: impl FnMut(&SimWorld) -> bool) -> bool {
        for _ in 0..self.world.ticks_for(secs) {
            self.step();
            if done(&self.world) {
                return true;
            }
        }
        false
    }

    fn sample(&mut self) {
        let mut frame = SimFrame::capture(
            self.world.elapsed_secs(),
            self.world.frame(),
            self.world.state(),
            self.world.hardware().last_brightness(),
        );

        let log = self.world.log();
        for &(at, offroad) in &log.offroad_transitions[self.exported_offroad..] {
            let message = if offroad { "offroad" } else { "onroad" };
            frame.events.push(SimEvent {
                frame: at,
                message: message.to_string(),
            });
        }
        for &(at, on) in &log.power_changes[self.exported_power..] {
            frame.events.push(SimEvent {
                frame: at,
                message: format!("display power {}", if on { "on" } else { "off" }),
            });
        }
        self.exported_offroad = log.offroad_transitions.len();
        self.exported_power = log.power_changes.len();

        self.export.add_frame(frame);
    }

    fn finish(mut self, scenario: ScenarioId, outcome: Result<(), String>) -> (ScenarioResult, SimExport) {
        self.sample();
        self.metrics.scenes_emitted = self.world.log().scenes;

        let failure_reason = outcome.err();
        let passed = failure_reason.is_none();
        self.export.finalize(passed, failure_reason.clone());

        let result = ScenarioResult {
            scenario,
            seed: self.world.config().seed,
            passed,
            total_ticks: self.world.frame(),
            final_time_secs: self.world.elapsed_secs(),
            failure_reason,
            metrics: self.metrics,
        };
        (result, self.export)
    }
}

fn ensure(cond: bool, reason: impl Into<String>) -> Result<(), String> {
    if cond {
        Ok(())
    } else {
        Err(reason.into())
    }
}

/// Runs drive scenarios.
pub struct ScenarioRunner {
    /// Configuration seed
    seed: u64,

    profile: HardwareProfile,

    ui: UiConfig,

    /// Requested duration in seconds; scenarios extend it to their minimum
    max_duration_secs: f64,
}

impl ScenarioRunner {
    /// Creates a new scenario runner.
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            profile: HardwareProfile::Tici,
            ui: UiConfig::default(),
            max_duration_secs: 0.0,
        }
    }

    pub fn with_profile(mut self, profile: HardwareProfile) -> Self {
        self.profile = profile;
        self
    }

    /// Sets the UI runtime configuration.
    pub fn with_ui_config(mut self, ui: UiConfig) -> Self {
        self.ui = ui;
        self
    }

    /// Sets the maximum duration.
    pub fn with_duration(mut self, secs: f64) -> Self {
        self.max_duration_secs = secs;
        self
    }

    fn sim_config(&self, scenario: ScenarioId) -> SimConfig {
        let base = SimConfig {
            seed: self.seed,
            profile: self.profile,
            ui: self.ui.clone(),
            ..Default::default()
        };
        match scenario {
            ScenarioId::AlertWake => SimConfig {
                auto_screen_off: 1,
                brightness_off: 0,
                ..base
            },
            ScenarioId::LongHaul => SimConfig {
                profile: HardwareProfile::Tici,
                ..base
            },
            ScenarioId::PreviewMode => SimConfig {
                preview_mode: true,
                ..base
            },
            _ => base,
        }
    }

    /// Runs a scenario and returns the result.
    pub fn run(&self, scenario: ScenarioId) -> ScenarioResult {
        self.run_recorded(scenario).0
    }

    /// Runs a scenario and returns the result with its sampled frames.
    pub fn run_recorded(&self, scenario: ScenarioId) -> (ScenarioResult, SimExport) {
        info!("Starting scenario: {} (seed={})", scenario.name(), self.seed);

        let duration = self.max_duration_secs.max(scenario.min_duration_secs());
        let world = SimWorld::new(self.sim_config(scenario));
        // Two samples per second.
        let export_every = u64::from(self.ui.ui_freq / 2).max(1);
        let mut session = Session::new(world, scenario, export_every);

        let outcome = match scenario {
            ScenarioId::Drive => self.run_drive(&mut session, duration),
            ScenarioId::ParkedTap => self.run_parked_tap(&mut session, duration),
            ScenarioId::PandaDropout => self.run_panda_dropout(&mut session, duration),
            ScenarioId::AlertWake => self.run_alert_wake(&mut session, duration),
            ScenarioId::LongHaul => self.run_long_haul(&mut session, duration),
            ScenarioId::PreviewMode => self.run_preview_mode(&mut session, duration),
        };

        match &outcome {
            Ok(()) => info!("✓ {} passed", scenario.name()),
            Err(reason) => warn!("✗ {} failed: {}", scenario.name(), reason),
        }
        session.finish(scenario, outcome)
    }

    /// DV-001: Drive - a full ignition cycle.
    ///
    /// **Assertion**: exactly one onroad edge, world objects appear once
    /// calibrated, the planned path and lead marker are projected, status
    /// follows the controller and brightness never drops below 10% awake.
    fn run_drive(&self, s: &mut Session, duration: f64) -> Result<(), String> {
        info!("DV-001: Drive - ignition cycle");

        s.run_for(2.0);
        ensure(!s.world.state().scene.started, "started while parked")?;
        ensure(
            s.world.log().offroad_transitions.first() == Some(&(1, true)),
            "no offroad event on the first frame",
        )?;

        s.world.oracle.set_ignition(true);
        s.world.oracle.set_target_speed(25.0);
        s.world.oracle.set_engaged(true);
        ensure(s.run_until(2.0, |w| w.state().scene.started), "ignition never went onroad")?;
        ensure(
            !s.world.state().scene.world_objects_visible,
            "world objects visible before calibration",
        )?;
        ensure(
            s.run_until(2.0, |w| w.state().scene.world_objects_visible),
            "calibration never arrived",
        )?;

        s.run_for(3.0);
        let scene = &s.world.state().scene;
        ensure(
            scene.status == UiStatus::Engaged,
            format!("status {:?} while engaged", scene.status),
        )?;
        ensure(!scene.track_vertices.is_empty(), "planned path not projected")?;
        ensure(
            !scene.lane_line_vertices[1].is_empty() && !scene.lane_line_vertices[2].is_empty(),
            "ego lane lines not projected",
        )?;
        let free_track = scene.track_vertices.len();

        s.world.oracle.spawn_lead(40.0, 25.0);
        ensure(
            s.run_until(2.0, |w| w.state().scene.lead_markers[0].is_some()),
            "lead marker never appeared",
        )?;
        let lead_track = s.world.state().scene.track_vertices.len();
        debug!("  track vertices free={} behind lead={}", free_track, lead_track);
        ensure(
            lead_track <= free_track,
            format!("path grew behind a lead ({} > {})", lead_track, free_track),
        )?;

        s.run_to(duration - 4.0);
        s.world.oracle.clear_lead();
        s.world.oracle.set_ignition(false);
        ensure(s.run_until(2.0, |w| !w.state().scene.started), "ignition off never went offroad")?;
        s.run_to(duration);

        let m = &s.metrics;
        ensure(m.onroad_transitions == 1, format!("{} onroad edges", m.onroad_transitions))?;
        ensure(m.offroad_transitions == 2, format!("{} offroad edges", m.offroad_transitions))?;
        ensure(m.power_toggles == 0, "display power toggled during a drive")?;
        match m.min_onroad_brightness {
            Some(b) if b >= 10 => Ok(()),
            other => Err(format!("onroad brightness {:?} below floor", other)),
        }
    }

    /// DV-002: ParkedTap - offroad sleep and tap to wake.
    ///
    /// **Assertion**: the display sleeps 30s after startup, ignores sensor
    /// noise while asleep and wakes within a second of a tap.
    fn run_parked_tap(&self, s: &mut Session, duration: f64) -> Result<(), String> {
        info!("DV-002: ParkedTap - offroad sleep");

        ensure(
            s.run_until(32.0, |w| w.hardware().display_on() == Some(false)),
            "parked display never slept",
        )?;
        let slept_at = s.world.elapsed_secs();
        ensure(
            (29.5..=30.5).contains(&slept_at),
            format!("slept at {:.2}s instead of 30s", slept_at),
        )?;

        s.run_to(40.0);
        ensure(
            s.world.hardware().display_on() == Some(false),
            "display woke without a tap",
        )?;
        ensure(
            s.world.hardware().last_brightness() == Some(0),
            "backlight not zeroed while asleep",
        )?;

        s.world.oracle.tap();
        ensure(
            s.run_until(1.0, |w| w.hardware().display_on() == Some(true)),
            "tap did not wake the display",
        )?;
        ensure(
            s.world.hardware().power_log() == vec![true, false, true],
            format!("power log {:?}", s.world.hardware().power_log()),
        )?;

        s.run_to(duration);
        Ok(())
    }

    /// DV-003: PandaDropout - panda disappears while driving.
    ///
    /// **Assertion**: the panda type reads unknown only after 5s of silence,
    /// ignition is kept and no offroad edge fires.
    fn run_panda_dropout(&self, s: &mut Session, duration: f64) -> Result<(), String> {
        info!("DV-003: PandaDropout - stale panda");

        s.world.oracle.set_ignition(true);
        s.world.oracle.set_target_speed(15.0);
        s.run_for(3.0);
        ensure(s.world.state().scene.started, "not onroad with ignition")?;
        ensure(
            s.world.state().scene.panda_type != PandaType::Unknown,
            "panda type unknown while connected",
        )?;

        s.world.oracle.set_panda_connected(false);
        s.run_for(4.0);
        ensure(
            s.world.state().scene.panda_type != PandaType::Unknown,
            "panda type dropped before the timeout",
        )?;

        s.run_for(2.0);
        let scene = &s.world.state().scene;
        ensure(scene.panda_type == PandaType::Unknown, "stale panda type kept")?;
        ensure(scene.ignition, "ignition lost with the panda")?;
        ensure(scene.started, "went offroad with the panda")?;

        s.world.oracle.set_panda_connected(true);
        ensure(
            s.run_until(1.0, |w| w.state().scene.panda_type != PandaType::Unknown),
            "panda type not restored",
        )?;

        s.run_to(duration);
        ensure(
            s.metrics.offroad_transitions == 1,
            format!("{} offroad edges", s.metrics.offroad_transitions),
        )
    }

    /// DV-004: AlertWake - auto screen off while driving.
    ///
    /// With a one minute auto screen off and a 0% dim level the backlight
    /// goes dark after 60s and the panel powers off 30s later.
    ///
    /// **Assertion**: the panel is off, then an alert turns it back on.
    fn run_alert_wake(&self, s: &mut Session, duration: f64) -> Result<(), String> {
        info!("DV-004: AlertWake - dim, sleep, alert");

        s.world.oracle.set_ignition(true);
        s.world.oracle.set_target_speed(20.0);
        s.world.oracle.set_engaged(true);

        s.run_to(70.0);
        ensure(s.world.state().scene.started, "not onroad")?;
        ensure(
            s.world.hardware().last_brightness() == Some(0),
            format!("backlight {:?} after dimming", s.world.hardware().last_brightness()),
        )?;
        ensure(s.world.hardware().display_on() != Some(false), "panel off too early")?;

        ensure(
            s.run_until(25.0, |w| w.hardware().display_on() == Some(false)),
            "dimmed panel never powered off",
        )?;
        debug!("  panel off at t={:.1}s", s.world.elapsed_secs());

        s.world
            .oracle
            .raise_alert(AlertStatus::UserPrompt, AlertSize::Mid, "Take Control");
        ensure(
            s.run_until(1.0, |w| w.hardware().display_on() == Some(true)),
            "alert did not wake the panel",
        )?;
        ensure(s.metrics.forced_wakes >= 1, "wake not reported as forced")?;
        s.step();
        ensure(
            s.world.state().scene.status == UiStatus::Warning,
            format!("status {:?} under a prompt", s.world.state().scene.status),
        )?;

        s.world.oracle.clear_alert();
        s.run_for(2.0);
        ensure(
            s.world.hardware().display_on() == Some(true),
            "panel off right after the alert",
        )?;

        s.run_to(duration);
        Ok(())
    }

    /// DV-005: LongHaul - anti burn-in brightness cap.
    ///
    /// **Assertion**: ten hours after start, full daylight brightness is
    /// capped at 70% and the filter settles there.
    fn run_long_haul(&self, s: &mut Session, duration: f64) -> Result<(), String> {
        info!("DV-005: LongHaul - anti burn-in");

        s.world.set_clock(Duration::from_secs(12 * 3600));
        s.world.oracle.backdate_start(Duration::from_secs(10 * 3600));
        s.world.oracle.set_ambient_light(1.0);
        s.world.oracle.set_ignition(true);
        s.world.oracle.set_target_speed(30.0);

        s.run_to(duration);

        let running = s.world.state().running_time;
        ensure(
            (36_000.0..36_000.0 + duration + 1.0).contains(&running),
            format!("running time {:.0}s", running),
        )?;
        ensure(
            s.metrics.max_brightness.is_some_and(|b| b <= 70),
            format!("brightness {:?} above the cap", s.metrics.max_brightness),
        )?;
        let last = s.world.hardware().last_brightness().unwrap_or(0);
        ensure(last >= 65, format!("brightness settled at {}", last))
    }

    /// DV-006: PreviewMode - onroad without ignition.
    ///
    /// **Assertion**: with preview enabled a started device goes onroad
    /// with ignition off; without it the same device stays offroad.
    fn run_preview_mode(&self, s: &mut Session, duration: f64) -> Result<(), String> {
        info!("DV-006: PreviewMode - device start only");

        s.world.oracle.set_force_started(true);
        ensure(
            s.run_until(2.0, |w| w.state().scene.started),
            "preview device never went onroad",
        )?;
        ensure(!s.world.state().scene.ignition, "ignition reported in preview")?;
        ensure(s.world.state().scene.preview_mode, "preview flag not loaded")?;

        s.world.oracle.set_force_started(false);
        ensure(
            s.run_until(2.0, |w| !w.state().scene.started),
            "preview device never went offroad",
        )?;

        let mut control = SimWorld::new(SimConfig {
            preview_mode: false,
            ..s.world.config().clone()
        });
        control.oracle.set_force_started(true);
        control.run_for(2.0);
        ensure(
            !control.state().scene.started,
            "device start alone went onroad without preview",
        )?;

        s.run_to(duration);
        ensure(
            s.metrics.onroad_transitions == 1,
            format!("{} onroad edges", s.metrics.onroad_transitions),
        )
    }
}
