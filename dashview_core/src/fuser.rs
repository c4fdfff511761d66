//! Scene Fuser - folds one tick of topic updates into the scene.
//!
//! Each topic owns a fixed set of scene fields and only touches them when it
//! updated this tick. A malformed payload is logged and skipped without
//! affecting the other topics of the same tick.

use crate::config::UiConfig;
use crate::error::{calibration_rpy, sensor_axis, validate_model, MessageError};
use crate::geometry::view_from_calib;
use crate::scene::{AlertText, LeadMarker, UiState, UiStatus, LANE_LINE_COUNT, ROAD_EDGE_COUNT};
use crate::trajectory::{draw_distance, path_length_idx};
use dashview_env::messages::{
    AlertStatus, ControlsState, LeadData, ModelV2, PandaState, PandaType, RadarState, RoadCameraState,
    SensorEvent, XyztData,
};
use dashview_env::{HardwareProfile, MessageSource, ParamKey, ParamStore, SubMaster, Topic};
use nalgebra::Vector3;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Lane line half width per unit of confidence (m).
pub const LANE_LINE_WIDTH: f32 = 0.025;

/// Road edge half width (m).
pub const ROAD_EDGE_WIDTH: f32 = 0.025;

/// Planned path half width (m).
pub const PATH_WIDTH: f32 = 0.5;

/// Camera mount height above the road (m).
pub const MOUNT_HEIGHT: f32 = 1.22;

/// Topics the UI subscribes to.
pub const UI_TOPICS: [Topic; Topic::COUNT] = Topic::ALL;

/// Converts fresh topic data into scene fields.
pub struct SceneFuser {
    config: UiConfig,
    profile: HardwareProfile,
    params: Arc<dyn ParamStore>,
    started_prev: bool,
}

impl SceneFuser {
    pub fn new(config: UiConfig, profile: HardwareProfile, params: Arc<dyn ParamStore>) -> Self {
        Self {
            config,
            profile,
            params,
            started_prev: false,
        }
    }

    pub fn profile(&self) -> HardwareProfile {
        self.profile
    }

    /// Reads the startup settings.
    pub fn load_params(&self, s: &mut UiState) {
        s.scene.is_metric = self.params.get_bool(ParamKey::IsMetric);
        s.scene.preview_mode = self.params.get_bool(ParamKey::IsOpenpilotViewEnabled);
        s.has_prime = self.params.get_bool(ParamKey::HasPrime);
        s.wide_camera = self.wide_camera_enabled();
        self.load_screen_params(s);
    }

    fn load_screen_params(&self, s: &mut UiState) {
        s.scene.scr.auto_screen_off = self.params.get_int(ParamKey::AutoScreenOff);
        s.scene.scr.brightness_off = self.params.get_int(ParamKey::BrightnessOff);
    }

    fn wide_camera_enabled(&self) -> bool {
        self.profile.has_wide_camera() && self.params.get_bool(ParamKey::EnableWideCamera)
    }

    /// Applies every topic that updated in the current frame of `sm`.
    pub fn update_state<S: MessageSource>(&mut self, sm: &SubMaster<S>, s: &mut UiState, now: Duration) {
        let camera = s.camera();
        s.projector.set_profile(self.profile);
        s.projector.set_camera(camera);

        let started_ns = sm.device_state().map(|d| d.started_mono_time).unwrap_or(0);
        s.running_time = now.as_secs_f64() - started_ns as f64 * 1e-9;

        if sm.frame() % self.config.engageable_interval() == 0 {
            let default_cs = ControlsState::default();
            let cs = sm.controls_state().unwrap_or(&default_cs);
            s.scene.engageable = cs.engageable || cs.enabled;
            s.scene.dm_active = sm
                .driver_monitoring_state()
                .map(|dm| dm.is_active_mode)
                .unwrap_or(false);
        }

        if sm.updated(Topic::ModelV2) {
            if let Some(model) = sm.model_v2() {
                if let Err(e) = update_model(s, model, sm.radar_state().map(|r| &r.lead_one)) {
                    warn!("skipping model frame {}: {}", model.frame_id, e);
                }
            }
        }

        if sm.updated(Topic::RadarState) {
            if let Some(radar) = sm.radar_state() {
                let line = sm.model_v2().map(|m| &m.position);
                update_leads(s, radar, line);
            }
        }

        if sm.updated(Topic::LiveCalibration) {
            if let Some(calib) = sm.live_calibration() {
                match calibration_rpy(&calib.rpy_calib) {
                    Ok([roll, pitch, yaw]) => {
                        let rot = view_from_calib(&Vector3::new(roll, pitch, yaw));
                        s.scene.view_from_calib = rot;
                        s.projector.set_view_from_calib(rot);
                        s.scene.world_objects_visible = true;
                    }
                    Err(e) => warn!("ignoring calibration: {}", e),
                }
            }
        }

        if sm.updated(Topic::PandaStates) {
            if let Some(pandas) = sm.panda_states() {
                update_panda(s, pandas);
            }
        } else if sm.frames_since(Topic::PandaStates) > self.config.panda_timeout_ticks() {
            s.scene.panda_type = PandaType::Unknown;
        }

        if sm.updated(Topic::CarParams) {
            if let Some(cp) = sm.car_params() {
                s.scene.longitudinal_control = cp.openpilot_longitudinal_control;
            }
        }

        if !s.scene.started && sm.updated(Topic::SensorEvents) {
            if let Some(events) = sm.sensor_events() {
                update_sensors(s, events);
            }
        }

        if sm.updated(Topic::RoadCameraState) {
            if let Some(cam) = sm.road_camera_state() {
                s.scene.light_sensor = light_sensor(cam, self.profile);
            }
        }

        let device_started = sm.device_state().map(|d| d.started).unwrap_or(false);
        s.scene.started = device_started && (s.scene.ignition || s.scene.preview_mode);

        if sm.updated(Topic::GpsLocationExternal) {
            s.scene.gps_location = sm.gps_location_external().copied();
        }
        if sm.updated(Topic::DeviceState) {
            s.scene.device_state = sm.device_state().copied();
        }
        if s.scene.started && sm.updated(Topic::ControlsState) {
            if let Some(cs) = sm.controls_state() {
                s.scene.alert = AlertText {
                    text1: cs.alert_text1.clone(),
                    text2: cs.alert_text2.clone(),
                    text3: cs.alert_text3.clone(),
                };
                s.scene.controls_state = Some(cs.clone());
            }
        }
        if sm.updated(Topic::CarState) {
            if let Some(cs) = sm.car_state() {
                s.scene.scr.awake = cs.cruise_state.cruise_sw_state;
                s.scene.car_state = Some(*cs);
            }
        }
        if sm.updated(Topic::LiveNaviData) {
            if let Some(navi) = sm.live_navi_data() {
                s.scene.scr.map_is_running = navi.map_enable;
                s.scene.live_navi_data = Some(*navi);
            }
        }
        if sm.updated(Topic::LiveParameters) {
            s.scene.live_parameters = sm.live_parameters().copied();
        }
        if sm.updated(Topic::LateralPlan) {
            s.scene.lateral_plan = sm.lateral_plan().copied();
        }
    }

    /// Derives the display status and detects onroad/offroad edges.
    ///
    /// Returns `true` on the tick the onroad flag changed.
    pub fn update_status<S: MessageSource>(&mut self, sm: &SubMaster<S>, s: &mut UiState) -> bool {
        if s.scene.started && sm.updated(Topic::ControlsState) {
            if let Some(cs) = sm.controls_state() {
                s.scene.status = status_for(cs);
            }
        }

        let transition = s.scene.started != self.started_prev;
        if transition {
            if s.scene.started {
                s.scene.status = UiStatus::Disengaged;
                s.scene.started_frame = sm.frame();
                s.scene.end_to_end = self.params.get_bool(ParamKey::EndToEndToggle);
                s.wide_camera = self.wide_camera_enabled();
                self.load_screen_params(s);
                debug!("onroad at frame {}", sm.frame());
            } else {
                debug!("offroad at frame {}", sm.frame());
            }
            s.scene.world_objects_visible = false;
        }
        self.started_prev = s.scene.started;
        transition
    }
}

/// Alert status takes priority over the engaged flag.
pub fn status_for(cs: &ControlsState) -> UiStatus {
    match cs.alert_status {
        AlertStatus::UserPrompt => UiStatus::Warning,
        AlertStatus::Critical => UiStatus::Alert,
        AlertStatus::Normal if cs.enabled => UiStatus::Engaged,
        AlertStatus::Normal => UiStatus::Disengaged,
    }
}

/// Ambient light in [0, 1] from the road camera exposure.
pub fn light_sensor(cam: &RoadCameraState, profile: HardwareProfile) -> f32 {
    let ev = cam.gain * cam.integ_lines as f32;
    (1.0 - ev / profile.max_exposure()).clamp(0.0, 1.0)
}

/// Rebuilds lane line, road edge and path strips.
pub fn update_model(s: &mut UiState, model: &ModelV2, lead_one: Option<&LeadData>) -> Result<(), MessageError> {
    validate_model(model, LANE_LINE_COUNT, ROAD_EDGE_COUNT)?;

    let scene = &mut s.scene;
    let projector = &s.projector;

    let max_distance = draw_distance(&model.position, None);
    let max_idx = path_length_idx(&model.lane_lines[0], max_distance);

    for (i, strip) in scene.lane_line_vertices.iter_mut().enumerate() {
        let prob = model.lane_line_probs[i];
        scene.lane_line_probs[i] = prob;
        let width = LANE_LINE_WIDTH * prob;
        strip.fill(projector, &model.lane_lines[i], width, width, 0.0, max_idx);
    }

    for (i, strip) in scene.road_edge_vertices.iter_mut().enumerate() {
        scene.road_edge_stds[i] = model.road_edge_stds[i];
        strip.fill(projector, &model.road_edges[i], ROAD_EDGE_WIDTH, ROAD_EDGE_WIDTH, 0.0, max_idx);
    }

    let path_distance = draw_distance(&model.position, lead_one);
    let path_idx = path_length_idx(&model.position, path_distance);
    scene
        .track_vertices
        .fill(projector, &model.position, PATH_WIDTH, PATH_WIDTH, MOUNT_HEIGHT, path_idx);
    Ok(())
}

/// Places markers for the two radar leads.
///
/// The marker height follows the path at the lead's distance, or the road
/// plane when no model has arrived yet.
pub fn update_leads(s: &mut UiState, radar: &RadarState, line: Option<&XyztData>) {
    for (i, lead) in [radar.lead_one, radar.lead_two].iter().enumerate() {
        s.scene.lead_markers[i] = if lead.status {
            let z = line
                .and_then(|l| l.z.get(path_length_idx(l, lead.d_rel)).copied())
                .unwrap_or(0.0);
            let point = Vector3::new(lead.d_rel, -lead.y_rel, z + MOUNT_HEIGHT);
            s.projector.project(&point).map(|vertex| LeadMarker {
                vertex,
                d_rel: lead.d_rel,
                y_rel: lead.y_rel,
                v_rel: lead.v_rel,
            })
        } else {
            None
        };
    }
}

/// Adapter type from the first panda; ignition if any panda reports it.
fn update_panda(s: &mut UiState, pandas: &[PandaState]) {
    let Some(first) = pandas.first() else {
        return;
    };
    s.scene.panda_type = first.panda_type;
    if s.scene.panda_type != PandaType::Unknown {
        s.scene.ignition = pandas.iter().any(|p| p.ignition_line || p.ignition_can);
    }
}

fn update_sensors(s: &mut UiState, events: &[SensorEvent]) {
    for event in events {
        let reading = match event {
            SensorEvent::Acceleration { v } => sensor_axis("acceleration", v, 2).map(|a| s.scene.accel_sensor = a),
            SensorEvent::GyroUncalibrated { v } => sensor_axis("gyro", v, 1).map(|g| s.scene.gyro_sensor = g),
            SensorEvent::Light { .. } => Ok(()),
        };
        if let Err(e) = reading {
            warn!("skipping sensor event: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Camera;
    use crate::trajectory::TRAJECTORY_SIZE;
    use approx::assert_relative_eq;
    use dashview_env::messages::*;
    use dashview_env::{ChannelSource, MemoryParams};
    use tokio::sync::mpsc::Sender;

    struct Harness {
        tx: Sender<Message>,
        sm: SubMaster<ChannelSource>,
        fuser: SceneFuser,
        state: UiState,
    }

    impl Harness {
        fn new(profile: HardwareProfile, params: MemoryParams) -> Self {
            let config = UiConfig::default();
            let (tx, source) = ChannelSource::channel(256);
            let fuser = SceneFuser::new(config.clone(), profile, Arc::new(params));
            let mut state = UiState::new(&config);
            fuser.load_params(&mut state);
            Self {
                tx,
                sm: SubMaster::new(source, &UI_TOPICS),
                fuser,
                state,
            }
        }

        fn send(&self, msg: Message) {
            self.tx.try_send(msg).unwrap();
        }

        fn tick(&mut self) -> bool {
            self.sm.update();
            self.fuser.update_state(&self.sm, &mut self.state, Duration::from_secs(100));
            self.fuser.update_status(&self.sm, &mut self.state)
        }

        fn go_onroad(&mut self) {
            self.send(Message::PandaStates(vec![PandaState {
                panda_type: PandaType::Dos,
                ignition_line: true,
                ignition_can: false,
            }]));
            self.send(Message::DeviceState(DeviceState {
                started: true,
                ..Default::default()
            }));
        }
    }

    fn line(y: f32) -> XyztData {
        let x: Vec<f32> = (0..TRAJECTORY_SIZE).map(|i| 2.0 + i as f32 * 3.0).collect();
        XyztData {
            y: vec![y; TRAJECTORY_SIZE],
            z: vec![0.0; TRAJECTORY_SIZE],
            t: vec![0.0; TRAJECTORY_SIZE],
            x,
        }
    }

    fn model() -> ModelV2 {
        ModelV2 {
            frame_id: 1,
            position: line(0.0),
            lane_lines: vec![line(-3.6), line(-1.8), line(1.8), line(3.6)],
            lane_line_probs: vec![0.2, 0.9, 0.9, 0.2],
            road_edges: vec![line(-4.0), line(4.0)],
            road_edge_stds: vec![0.3, 0.3],
        }
    }

    #[test]
    fn test_onroad_transition_fires_once() {
        let params = MemoryParams::new().with(ParamKey::EndToEndToggle, "1");
        let mut h = Harness::new(HardwareProfile::Pc, params);

        assert!(!h.tick());
        h.go_onroad();
        h.send(Message::LiveCalibration(LiveCalibration {
            rpy_calib: vec![0.0, 0.0, 0.0],
        }));
        assert!(h.tick());
        assert!(h.state.scene.started);
        assert_eq!(h.state.scene.started_frame, 2);
        assert_eq!(h.state.scene.status, UiStatus::Disengaged);
        assert!(h.state.scene.end_to_end);
        // Calibration in the transition tick is hidden again.
        assert!(!h.state.scene.world_objects_visible);

        // Steady onroad: no further transitions.
        for _ in 0..5 {
            assert!(!h.tick());
        }

        h.send(Message::LiveCalibration(LiveCalibration {
            rpy_calib: vec![0.0, 0.01, 0.0],
        }));
        h.tick();
        assert!(h.state.scene.world_objects_visible);

        h.send(Message::DeviceState(DeviceState::default()));
        assert!(h.tick());
        assert!(!h.state.scene.started);
        assert!(!h.state.scene.world_objects_visible);
        assert!(!h.tick());
    }

    #[test]
    fn test_preview_mode_bypasses_ignition() {
        let params = MemoryParams::new().with(ParamKey::IsOpenpilotViewEnabled, "1");
        let mut h = Harness::new(HardwareProfile::Pc, params);
        h.send(Message::DeviceState(DeviceState {
            started: true,
            ..Default::default()
        }));
        h.tick();
        assert!(!h.state.scene.ignition);
        assert!(h.state.scene.started);

        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::DeviceState(DeviceState {
            started: true,
            ..Default::default()
        }));
        h.tick();
        assert!(!h.state.scene.started);
    }

    #[test]
    fn test_status_priority() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.go_onroad();
        h.tick();

        let cases = [
            (AlertStatus::Normal, false, UiStatus::Disengaged),
            (AlertStatus::Normal, true, UiStatus::Engaged),
            (AlertStatus::UserPrompt, true, UiStatus::Warning),
            (AlertStatus::Critical, true, UiStatus::Alert),
            (AlertStatus::Critical, false, UiStatus::Alert),
        ];
        for (alert_status, enabled, expected) in cases {
            h.send(Message::ControlsState(ControlsState {
                enabled,
                alert_status,
                alert_text1: "Take Control".into(),
                ..Default::default()
            }));
            h.tick();
            assert_eq!(h.state.scene.status, expected);
        }
        assert_eq!(h.state.scene.alert.text1, "Take Control");
    }

    #[test]
    fn test_controls_ignored_offroad() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::ControlsState(ControlsState {
            enabled: true,
            ..Default::default()
        }));
        h.tick();
        assert_eq!(h.state.scene.status, UiStatus::Disengaged);
        assert!(h.state.scene.controls_state.is_none());
    }

    #[test]
    fn test_engageable_refreshes_at_half_rate() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::ControlsState(ControlsState {
            engageable: true,
            ..Default::default()
        }));
        for _ in 0..9 {
            h.tick();
            assert!(!h.state.scene.engageable);
        }
        h.tick();
        assert_eq!(h.sm.frame(), 10);
        assert!(h.state.scene.engageable);
    }

    #[test]
    fn test_panda_timeout_keeps_ignition() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.go_onroad();
        h.tick();
        assert!(h.state.scene.ignition);
        assert_eq!(h.state.scene.panda_type, PandaType::Dos);

        // Frame 1 delivered; unknown once more than 100 frames have passed.
        for _ in 0..100 {
            h.tick();
        }
        assert_eq!(h.state.scene.panda_type, PandaType::Dos);
        h.tick();
        assert_eq!(h.state.scene.panda_type, PandaType::Unknown);
        assert!(h.state.scene.ignition);
    }

    #[test]
    fn test_never_received_panda_times_out() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.state.scene.ignition = true;
        h.state.scene.panda_type = PandaType::Dos;

        for _ in 0..100 {
            h.tick();
        }
        assert_eq!(h.state.scene.panda_type, PandaType::Dos);
        h.tick();
        assert_eq!(h.sm.frame(), 101);
        assert_eq!(h.state.scene.panda_type, PandaType::Unknown);
        assert!(h.state.scene.ignition);
    }

    #[test]
    fn test_unknown_panda_does_not_touch_ignition() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.go_onroad();
        h.tick();
        h.send(Message::PandaStates(vec![PandaState::default()]));
        h.tick();
        assert_eq!(h.state.scene.panda_type, PandaType::Unknown);
        assert!(h.state.scene.ignition);

        h.send(Message::PandaStates(vec![]));
        h.tick();
        assert!(h.state.scene.ignition);
    }

    #[test]
    fn test_ignition_from_any_panda() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::PandaStates(vec![
            PandaState {
                panda_type: PandaType::RedPanda,
                ..Default::default()
            },
            PandaState {
                panda_type: PandaType::RedPanda,
                ignition_can: true,
                ..Default::default()
            },
        ]));
        h.tick();
        assert!(h.state.scene.ignition);
    }

    #[test]
    fn test_light_sensor_by_profile() {
        let cam = RoadCameraState {
            gain: 1.0,
            integ_lines: 1904,
            ..Default::default()
        };
        assert_relative_eq!(light_sensor(&cam, HardwareProfile::Pc), 0.9, epsilon = 1e-6);
        assert_relative_eq!(light_sensor(&cam, HardwareProfile::Tici), 0.4, epsilon = 1e-5);
        let dark = RoadCameraState {
            gain: 10.0,
            integ_lines: 5408,
            ..Default::default()
        };
        assert_eq!(light_sensor(&dark, HardwareProfile::Legacy), 0.0);
        assert_eq!(light_sensor(&RoadCameraState::default(), HardwareProfile::Legacy), 1.0);
    }

    #[test]
    fn test_sensor_events_only_offroad() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::SensorEvents(vec![
            SensorEvent::Acceleration { v: vec![0.1, 0.2, 9.8] },
            SensorEvent::GyroUncalibrated { v: vec![] },
        ]));
        h.tick();
        assert_relative_eq!(h.state.scene.accel_sensor, 9.8);
        assert_eq!(h.state.scene.gyro_sensor, 0.0);

        h.go_onroad();
        h.tick();
        h.send(Message::SensorEvents(vec![SensorEvent::Acceleration {
            v: vec![0.0, 0.0, 3.0],
        }]));
        h.tick();
        assert_relative_eq!(h.state.scene.accel_sensor, 9.8);
    }

    #[test]
    fn test_model_builds_strips() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::ModelV2(model()));
        h.tick();

        let scene = &h.state.scene;
        assert!(!scene.track_vertices.is_empty());
        assert!(scene.lane_line_vertices.iter().all(|s| !s.is_empty()));
        assert!(scene.road_edge_vertices.iter().all(|s| !s.is_empty()));
        assert_relative_eq!(scene.lane_line_probs[1], 0.9);
        assert_relative_eq!(scene.road_edge_stds[0], 0.3);
    }

    #[test]
    fn test_lane_line_width_follows_probability() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::ModelV2(ModelV2 {
            lane_lines: vec![line(0.0); 4],
            lane_line_probs: vec![0.2, 0.9, 0.2, 0.9],
            ..model()
        }));
        h.tick();

        // First and last vertices are the two edges of the nearest sample.
        let near_width = |i: usize| {
            let points = h.state.scene.lane_line_vertices[i].points();
            (points[points.len() - 1] - points[0]).norm()
        };
        let faint = near_width(0);
        let confident = near_width(1);
        assert!(faint > 0.0);
        assert_relative_eq!(confident / faint, 4.5, epsilon = 1e-3);
        assert_relative_eq!(near_width(2), faint, epsilon = 1e-4);
    }

    #[test]
    fn test_projector_follows_profile() {
        let mut h = Harness::new(HardwareProfile::Tici, MemoryParams::new());
        h.tick();
        assert_eq!(h.state.projector.profile(), HardwareProfile::Tici);
        assert_relative_eq!(h.state.projector.intrinsics()[(0, 0)], 2648.0);
    }

    #[test]
    fn test_lead_shortens_path() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::ModelV2(model()));
        h.tick();
        let full = h.state.scene.track_vertices.len();

        h.send(Message::RadarState(RadarState {
            lead_one: LeadData {
                status: true,
                d_rel: 10.0,
                ..Default::default()
            },
            ..Default::default()
        }));
        h.send(Message::ModelV2(model()));
        h.tick();
        assert!(h.state.scene.track_vertices.len() < full);
    }

    #[test]
    fn test_malformed_model_keeps_previous_strips() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::ModelV2(model()));
        h.tick();
        let before = h.state.scene.track_vertices.clone();

        let mut bad = model();
        bad.position.x.truncate(5);
        h.send(Message::ModelV2(bad));
        h.send(Message::CarState(CarState {
            v_ego: 12.0,
            ..Default::default()
        }));
        h.tick();
        assert_eq!(h.state.scene.track_vertices, before);
        // Other topics of the same tick still apply.
        assert_relative_eq!(h.state.scene.v_ego(), 12.0);
    }

    #[test]
    fn test_leads_markers() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::RadarState(RadarState {
            lead_one: LeadData {
                status: true,
                d_rel: 30.0,
                y_rel: 0.0,
                v_rel: -1.0,
            },
            lead_two: LeadData {
                status: false,
                d_rel: 50.0,
                ..Default::default()
            },
        }));
        h.tick();

        let marker = h.state.scene.lead_markers[0].expect("lead one visible");
        assert_relative_eq!(marker.d_rel, 30.0);
        assert_relative_eq!(marker.vertex.x, 1080.0, epsilon = 1e-2);
        assert!(h.state.scene.lead_markers[1].is_none());

        h.send(Message::RadarState(RadarState::default()));
        h.tick();
        assert!(h.state.scene.lead_markers[0].is_none());
    }

    #[test]
    fn test_lead_height_follows_path() {
        let config = UiConfig::default();
        let mut state = UiState::new(&config);
        let mut path = line(0.0);
        path.z = vec![-2.0; TRAJECTORY_SIZE];
        let radar = RadarState {
            lead_one: LeadData {
                status: true,
                d_rel: 30.0,
                ..Default::default()
            },
            ..Default::default()
        };

        update_leads(&mut state, &radar, None);
        let flat = state.scene.lead_markers[0].unwrap().vertex;
        update_leads(&mut state, &radar, Some(&path));
        let raised = state.scene.lead_markers[0].unwrap().vertex;
        assert!(raised.y < flat.y);
    }

    #[test]
    fn test_wide_camera_only_on_tici() {
        let params = || MemoryParams::new().with(ParamKey::EnableWideCamera, "1");
        let h = Harness::new(HardwareProfile::Pc, params());
        assert!(!h.state.wide_camera);

        let mut h = Harness::new(HardwareProfile::Tici, params());
        assert!(h.state.wide_camera);
        h.tick();
        assert_eq!(h.state.projector.camera(), Camera::Wide);
    }

    #[test]
    fn test_latest_copies() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::CarState(CarState {
            cruise_state: CruiseState {
                cruise_sw_state: 2,
                ..Default::default()
            },
            ..Default::default()
        }));
        h.send(Message::LiveNaviData(LiveNaviData {
            map_enable: true,
            ..Default::default()
        }));
        h.send(Message::CarParams(CarParams {
            openpilot_longitudinal_control: true,
        }));
        h.send(Message::LateralPlan(LateralPlan::default()));
        h.tick();

        let scene = &h.state.scene;
        assert_eq!(scene.scr.awake, 2);
        assert!(scene.scr.map_is_running);
        assert!(scene.longitudinal_control);
        assert!(scene.lateral_plan.is_some());
        assert!(scene.gps_location.is_none());
    }

    #[test]
    fn test_running_time_from_device_start() {
        let mut h = Harness::new(HardwareProfile::Pc, MemoryParams::new());
        h.send(Message::DeviceState(DeviceState {
            started_mono_time: 40_000_000_000,
            ..Default::default()
        }));
        h.tick();
        assert_relative_eq!(h.state.running_time, 60.0);
    }
}
