//! Ground truth oracle for simulation.
//!
//! The DriveOracle maintains the true state of one simulated car and its
//! device:
//! - Vehicle kinematics on a gently curving road
//! - A lead vehicle, ambient light, controller alerts
//! - Ignition, panda connectivity and device taps
//!
//! and turns it into the noisy message stream the UI would receive.

use dashview_env::messages::*;
use dashview_env::HardwareProfile;
use nalgebra::Vector3;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::StandardNormal;
use std::time::Duration;

/// Samples per model polyline.
const MODEL_SAMPLES: usize = 33;

/// Lateral offsets of the four lane lines (m, right positive).
const LANE_OFFSETS: [f64; 4] = [-5.4, -1.8, 1.8, 5.4];

/// Lateral offsets of the two road edges (m).
const ROAD_EDGE_OFFSETS: [f64; 2] = [-7.0, 7.0];

/// Height of the road surface below the camera (m).
const ROAD_DEPTH: f64 = 1.22;

/// Longitudinal acceleration limit (m/s²).
const MAX_ACCEL: f64 = 2.0;

/// A vehicle driving ahead of the ego car.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeadTruth {
    /// Gap to the ego car (m)
    pub distance: f64,
    /// Absolute speed (m/s)
    pub speed: f64,
}

/// An alert the controller is showing.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertTruth {
    pub status: AlertStatus,
    pub size: AlertSize,
    pub text: String,
}

/// The DriveOracle - ground truth and message generation.
pub struct DriveOracle {
    /// Physics seed (separate from the context seed)
    physics_seed: u64,

    /// RNG for sensor noise
    physics_rng: ChaCha8Rng,

    profile: HardwareProfile,

    /// Seconds since the oracle started
    current_time: f64,

    ignition: bool,
    /// Device reports started without ignition
    force_started: bool,
    device_started: bool,
    started_mono_time: u64,
    start_backdate: Duration,

    speed: f64,
    target_speed: f64,
    odometer: f64,
    curvature: f64,

    lead: Option<LeadTruth>,
    ambient_light: f64,

    engaged: bool,
    alert: Option<AlertTruth>,
    cruise_sw_state: i32,

    panda_connected: bool,
    pending_tap: bool,

    /// Standard deviation of sensor noise
    sensor_noise_std: f64,
    frame_id: u32,
}

impl DriveOracle {
    /// Creates a parked car with ignition off.
    pub fn new(physics_seed: u64, profile: HardwareProfile) -> Self {
        Self {
            physics_seed,
            physics_rng: ChaCha8Rng::seed_from_u64(physics_seed),
            profile,
            current_time: 0.0,
            ignition: false,
            force_started: false,
            device_started: false,
            started_mono_time: 0,
            start_backdate: Duration::ZERO,
            speed: 0.0,
            target_speed: 0.0,
            odometer: 0.0,
            curvature: 0.0,
            lead: None,
            ambient_light: 0.6,
            engaged: false,
            alert: None,
            cruise_sw_state: 0,
            panda_connected: true,
            pending_tap: false,
            sensor_noise_std: 0.02,
            frame_id: 0,
        }
    }

    pub fn seed(&self) -> u64 {
        self.physics_seed
    }

    pub fn set_sensor_noise(&mut self, std_dev: f64) {
        self.sensor_noise_std = std_dev.max(0.0);
    }

    pub fn set_ignition(&mut self, on: bool) {
        self.ignition = on;
    }

    /// Makes the device report started regardless of ignition.
    pub fn set_force_started(&mut self, on: bool) {
        self.force_started = on;
    }

    /// Pretends the next start happened `ago` earlier.
    pub fn backdate_start(&mut self, ago: Duration) {
        self.start_backdate = ago;
    }

    pub fn set_target_speed(&mut self, speed: f64) {
        self.target_speed = speed.max(0.0);
    }

    pub fn spawn_lead(&mut self, distance: f64, speed: f64) {
        self.lead = Some(LeadTruth { distance, speed });
    }

    pub fn clear_lead(&mut self) {
        self.lead = None;
    }

    /// Ambient light in [0, 1].
    pub fn set_ambient_light(&mut self, light: f64) {
        self.ambient_light = light.clamp(0.0, 1.0);
    }

    pub fn set_engaged(&mut self, engaged: bool) {
        self.engaged = engaged;
    }

    pub fn raise_alert(&mut self, status: AlertStatus, size: AlertSize, text: &str) {
        self.alert = Some(AlertTruth {
            status,
            size,
            text: text.to_string(),
        });
    }

    pub fn clear_alert(&mut self) {
        self.alert = None;
    }

    pub fn set_cruise_switch(&mut self, state: i32) {
        self.cruise_sw_state = state;
    }

    pub fn set_panda_connected(&mut self, connected: bool) {
        self.panda_connected = connected;
    }

    /// Knocks on the parked device once.
    pub fn tap(&mut self) {
        self.pending_tap = true;
    }

    pub fn time(&self) -> f64 {
        self.current_time
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn lead(&self) -> Option<LeadTruth> {
        self.lead
    }

    pub fn ignition(&self) -> bool {
        self.ignition
    }

    pub fn device_started(&self) -> bool {
        self.device_started
    }

    pub fn ambient_light(&self) -> f64 {
        self.ambient_light
    }

    fn noise(&mut self, scale: f64) -> f64 {
        if self.sensor_noise_std <= 0.0 {
            return 0.0;
        }
        let z: f64 = self.physics_rng.sample(StandardNormal);
        z * self.sensor_noise_std * scale
    }

    /// Advances the physics by `dt` seconds.
    pub fn step(&mut self, dt: f64) {
        self.current_time += dt;

        let target = if self.ignition { self.target_speed } else { 0.0 };
        let dv = (target - self.speed).clamp(-MAX_ACCEL * dt, MAX_ACCEL * dt);
        self.speed = (self.speed + dv).max(0.0);
        self.odometer += self.speed * dt;

        // Gentle S-curves with a one minute period.
        self.curvature = 0.002 * (std::f64::consts::TAU * self.current_time / 60.0).sin();

        if let Some(lead) = self.lead.as_mut() {
            lead.distance = (lead.distance + (lead.speed - self.speed) * dt).max(2.0);
        }
    }

    /// Lateral position of the road centre `x` meters ahead.
    fn road_offset(&self, x: f64) -> f64 {
        0.5 * self.curvature * x * x
    }

    fn polyline(&mut self, xs: &[f64], lateral: f64, depth: f64) -> XyztData {
        let mut line = XyztData::default();
        for (i, &x) in xs.iter().enumerate() {
            let p = Vector3::new(x, self.road_offset(x) + lateral, depth);
            let jitter = self.noise(0.5);
            line.x.push(p.x as f32);
            line.y.push((p.y + jitter) as f32);
            line.z.push(p.z as f32);
            line.t.push(model_time(i) as f32);
        }
        line
    }

    fn model(&mut self) -> ModelV2 {
        self.frame_id = self.frame_id.wrapping_add(1);

        let path_xs: Vec<f64> = (0..MODEL_SAMPLES).map(|i| self.speed * model_time(i)).collect();
        let lane_xs: Vec<f64> = (0..MODEL_SAMPLES).map(model_distance).collect();

        let position = self.polyline(&path_xs, 0.0, 0.0);
        let lane_lines = LANE_OFFSETS
            .iter()
            .map(|&off| self.polyline(&lane_xs, off, ROAD_DEPTH))
            .collect();
        let road_edges = ROAD_EDGE_OFFSETS
            .iter()
            .map(|&off| self.polyline(&lane_xs, off, ROAD_DEPTH))
            .collect();

        let outer = (0.3 + self.noise(1.0)).clamp(0.0, 1.0) as f32;
        let inner = (0.9 + self.noise(1.0)).clamp(0.0, 1.0) as f32;

        ModelV2 {
            frame_id: self.frame_id,
            position,
            lane_lines,
            lane_line_probs: vec![outer, inner, inner, outer],
            road_edges,
            road_edge_stds: vec![0.4, 0.4],
        }
    }

    fn radar(&mut self) -> RadarState {
        let lead_one = match self.lead {
            Some(lead) if lead.distance < 150.0 => {
                let lateral = self.road_offset(lead.distance);
                LeadData {
                    status: true,
                    d_rel: (lead.distance + self.noise(2.0)) as f32,
                    y_rel: (-lateral + self.noise(1.0)) as f32,
                    v_rel: (lead.speed - self.speed) as f32,
                }
            }
            _ => LeadData::default(),
        };
        RadarState {
            lead_one,
            lead_two: LeadData::default(),
        }
    }

    fn camera(&mut self) -> RoadCameraState {
        let light = (self.ambient_light + self.noise(0.5)).clamp(0.0, 1.0);
        let max_ev = f64::from(self.profile.max_exposure());
        let max_lines = f64::from(self.profile.max_sensor_lines());
        let max_gain = f64::from(self.profile.max_sensor_gain());

        let ev = (1.0 - light) * max_ev;
        let gain = (ev / max_lines).clamp(1.0, max_gain);
        RoadCameraState {
            frame_id: self.frame_id,
            gain: gain as f32,
            integ_lines: (ev / gain).round() as u32,
        }
    }

    fn sensors(&mut self) -> Vec<SensorEvent> {
        let (accel_kick, gyro_kick) = if std::mem::take(&mut self.pending_tap) {
            (1.0, 0.5)
        } else {
            (0.0, 0.0)
        };
        let accel = vec![
            self.noise(1.0) as f32,
            self.noise(1.0) as f32,
            (9.81 + accel_kick + self.noise(1.0)) as f32,
        ];
        let gyro = vec![
            self.noise(0.25) as f32,
            (gyro_kick + self.noise(0.25)) as f32,
            self.noise(0.25) as f32,
        ];
        vec![
            SensorEvent::Acceleration { v: accel },
            SensorEvent::GyroUncalibrated { v: gyro },
            SensorEvent::Light {
                lux: (self.ambient_light * 1000.0) as f32,
            },
        ]
    }

    fn panda_type(&self) -> PandaType {
        match self.profile {
            HardwareProfile::Legacy => PandaType::Uno,
            HardwareProfile::Tici => PandaType::Dos,
            HardwareProfile::Pc => PandaType::RedPanda,
        }
    }

    fn controls(&self) -> ControlsState {
        let enabled = self.engaged && self.device_started;
        let mut cs = ControlsState {
            enabled,
            engageable: self.device_started,
            ..Default::default()
        };
        if let Some(alert) = &self.alert {
            cs.alert_status = alert.status;
            cs.alert_size = alert.size;
            cs.alert_text1 = alert.text.clone();
        }
        cs
    }

    /// Messages published during frame `frame`, at `now_ns` since boot.
    ///
    /// Fast topics go out every frame, slow ones at 2 Hz or 1 Hz.
    pub fn messages(&mut self, frame: u64, ui_freq: u32, now_ns: u64) -> Vec<Message> {
        let started = self.ignition || self.force_started;
        if started && !self.device_started {
            self.started_mono_time = now_ns.saturating_sub(self.start_backdate.as_nanos() as u64);
        }
        self.device_started = started;

        let half = u64::from(ui_freq / 2).max(1);
        let full = u64::from(ui_freq).max(1);
        let two_hz = frame == 1 || frame % half == 0;
        let one_hz = frame == 1 || frame % full == 0;

        let model = self.model();
        let radar = self.radar();
        let camera = self.camera();
        let sensors = self.sensors();

        let mut out = vec![
            Message::ModelV2(model),
            Message::RadarState(radar),
            Message::RoadCameraState(camera),
            Message::SensorEvents(sensors),
            Message::ControlsState(self.controls()),
            Message::CarState(CarState {
                v_ego: self.speed as f32,
                steering_angle_deg: (self.curvature * 2.7 * 15.2).to_degrees() as f32,
                cruise_state: CruiseState {
                    enabled: self.engaged,
                    speed: self.target_speed as f32,
                    cruise_sw_state: self.cruise_sw_state,
                },
            }),
            Message::LateralPlan(LateralPlan {
                lane_width: 3.6,
                d_prob: 0.9,
                l_prob: 0.9,
                r_prob: 0.9,
            }),
        ];

        if two_hz {
            out.push(Message::DeviceState(DeviceState {
                started,
                started_mono_time: self.started_mono_time,
                cpu_temp_c: (45.0 + self.noise(10.0)) as f32,
                free_space_percent: 80.0,
            }));
            if self.panda_connected {
                out.push(Message::PandaStates(vec![PandaState {
                    panda_type: self.panda_type(),
                    ignition_line: self.ignition,
                    ignition_can: false,
                }]));
            }
            out.push(Message::DriverMonitoringState(DriverMonitoringState {
                is_active_mode: self.engaged,
            }));
        }

        if one_hz {
            out.push(Message::LiveCalibration(LiveCalibration {
                rpy_calib: vec![0.0, 0.02, 0.005],
            }));
            out.push(Message::CarParams(CarParams {
                openpilot_longitudinal_control: true,
            }));
            out.push(Message::GpsLocationExternal(GpsLocationExternal {
                latitude: 37.7749,
                longitude: -122.4194 + self.odometer / 111_320.0,
                speed: self.speed as f32,
                bearing_deg: 90.0,
                accuracy: 3.0,
            }));
            out.push(Message::LiveParameters(LiveParameters {
                angle_offset_deg: 0.3,
                stiffness_factor: 1.0,
                steer_ratio: 15.2,
            }));
            out.push(Message::LiveNaviData(LiveNaviData::default()));
        }

        out
    }
}

/// Model time of sample `i` (s).
fn model_time(i: usize) -> f64 {
    let r = i as f64 / (MODEL_SAMPLES - 1) as f64;
    10.0 * r * r
}

/// Model distance of sample `i` (m).
fn model_distance(i: usize) -> f64 {
    let r = i as f64 / (MODEL_SAMPLES - 1) as f64;
    192.0 * r * r
}
