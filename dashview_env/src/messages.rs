//! Typed message payloads and the compile-time topic set.
//!
//! Each variant of [`Message`] is the decoded payload of exactly one
//! [`Topic`]. Field names follow the upstream schema closely enough that a
//! bridge from the real transport is a mechanical conversion.

use serde::{Deserialize, Serialize};

/// Named message streams the UI can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    ModelV2,
    ControlsState,
    LiveCalibration,
    RadarState,
    DeviceState,
    RoadCameraState,
    PandaStates,
    CarParams,
    DriverMonitoringState,
    SensorEvents,
    CarState,
    LiveNaviData,
    GpsLocationExternal,
    LateralPlan,
    LiveParameters,
}

impl Topic {
    /// Number of topics in the enumeration.
    pub const COUNT: usize = 15;

    /// Every topic, in index order.
    pub const ALL: [Topic; Topic::COUNT] = [
        Topic::ModelV2,
        Topic::ControlsState,
        Topic::LiveCalibration,
        Topic::RadarState,
        Topic::DeviceState,
        Topic::RoadCameraState,
        Topic::PandaStates,
        Topic::CarParams,
        Topic::DriverMonitoringState,
        Topic::SensorEvents,
        Topic::CarState,
        Topic::LiveNaviData,
        Topic::GpsLocationExternal,
        Topic::LateralPlan,
        Topic::LiveParameters,
    ];

    /// Dense index used by per-topic bookkeeping arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Wire name of the topic.
    pub fn name(self) -> &'static str {
        match self {
            Topic::ModelV2 => "modelV2",
            Topic::ControlsState => "controlsState",
            Topic::LiveCalibration => "liveCalibration",
            Topic::RadarState => "radarState",
            Topic::DeviceState => "deviceState",
            Topic::RoadCameraState => "roadCameraState",
            Topic::PandaStates => "pandaStates",
            Topic::CarParams => "carParams",
            Topic::DriverMonitoringState => "driverMonitoringState",
            Topic::SensorEvents => "sensorEvents",
            Topic::CarState => "carState",
            Topic::LiveNaviData => "liveNaviData",
            Topic::GpsLocationExternal => "gpsLocationExternal",
            Topic::LateralPlan => "lateralPlan",
            Topic::LiveParameters => "liveParameters",
        }
    }
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// A polyline sampled at fixed time steps, in calibrated car space.
///
/// `x` is longitudinal (forward), `y` lateral (right), `z` vertical (down).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct XyztData {
    pub x: Vec<f32>,
    pub y: Vec<f32>,
    pub z: Vec<f32>,
    pub t: Vec<f32>,
}

impl XyztData {
    /// Number of samples present on every axis.
    pub fn len(&self) -> usize {
        self.x.len().min(self.y.len()).min(self.z.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelV2 {
    pub frame_id: u32,
    /// Planned path of the ego vehicle
    pub position: XyztData,
    pub lane_lines: Vec<XyztData>,
    pub lane_line_probs: Vec<f32>,
    pub road_edges: Vec<XyztData>,
    pub road_edge_stds: Vec<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LeadData {
    /// Whether the radar is tracking this lead
    pub status: bool,
    /// Relative longitudinal distance (m)
    pub d_rel: f32,
    /// Relative lateral offset (m, positive left)
    pub y_rel: f32,
    /// Relative speed (m/s)
    pub v_rel: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RadarState {
    pub lead_one: LeadData,
    pub lead_two: LeadData,
}

/// Alert severity published by the controller, highest wins.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertStatus {
    #[default]
    Normal,
    UserPrompt,
    Critical,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AlertSize {
    #[default]
    None,
    Small,
    Mid,
    Full,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ControlsState {
    pub enabled: bool,
    pub engageable: bool,
    pub alert_status: AlertStatus,
    pub alert_size: AlertSize,
    pub alert_text1: String,
    pub alert_text2: String,
    pub alert_text3: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveCalibration {
    /// Roll, pitch, yaw of the device relative to the calibrated frame (rad)
    pub rpy_calib: Vec<f32>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DeviceState {
    pub started: bool,
    /// Monotonic boot time at which `started` last went true (ns)
    pub started_mono_time: u64,
    pub cpu_temp_c: f32,
    pub free_space_percent: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RoadCameraState {
    pub frame_id: u32,
    pub gain: f32,
    pub integ_lines: u32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PandaType {
    #[default]
    Unknown,
    WhitePanda,
    GreyPanda,
    BlackPanda,
    Pedal,
    Uno,
    Dos,
    RedPanda,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PandaState {
    pub panda_type: PandaType,
    pub ignition_line: bool,
    pub ignition_can: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarParams {
    pub openpilot_longitudinal_control: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DriverMonitoringState {
    pub is_active_mode: bool,
}

/// One reading from the device sensor hub.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SensorEvent {
    Acceleration { v: Vec<f32> },
    GyroUncalibrated { v: Vec<f32> },
    Light { lux: f32 },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CruiseState {
    pub enabled: bool,
    pub speed: f32,
    /// Driver-side cruise switch state, used as the screen wake key
    pub cruise_sw_state: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CarState {
    /// Ego speed (m/s)
    pub v_ego: f32,
    pub steering_angle_deg: f32,
    pub cruise_state: CruiseState,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveNaviData {
    pub map_enable: bool,
    pub speed_limit: f32,
    pub distance_to_camera: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GpsLocationExternal {
    pub latitude: f64,
    pub longitude: f64,
    pub speed: f32,
    pub bearing_deg: f32,
    pub accuracy: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LateralPlan {
    pub lane_width: f32,
    pub d_prob: f32,
    pub l_prob: f32,
    pub r_prob: f32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LiveParameters {
    pub angle_offset_deg: f32,
    pub stiffness_factor: f32,
    pub steer_ratio: f32,
}

/// Tagged union of every payload the UI consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Message {
    ModelV2(ModelV2),
    ControlsState(ControlsState),
    LiveCalibration(LiveCalibration),
    RadarState(RadarState),
    DeviceState(DeviceState),
    RoadCameraState(RoadCameraState),
    PandaStates(Vec<PandaState>),
    CarParams(CarParams),
    DriverMonitoringState(DriverMonitoringState),
    SensorEvents(Vec<SensorEvent>),
    CarState(CarState),
    LiveNaviData(LiveNaviData),
    GpsLocationExternal(GpsLocationExternal),
    LateralPlan(LateralPlan),
    LiveParameters(LiveParameters),
}

impl Message {
    /// The topic this payload is published on.
    pub fn topic(&self) -> Topic {
        match self {
            Message::ModelV2(_) => Topic::ModelV2,
            Message::ControlsState(_) => Topic::ControlsState,
            Message::LiveCalibration(_) => Topic::LiveCalibration,
            Message::RadarState(_) => Topic::RadarState,
            Message::DeviceState(_) => Topic::DeviceState,
            Message::RoadCameraState(_) => Topic::RoadCameraState,
            Message::PandaStates(_) => Topic::PandaStates,
            Message::CarParams(_) => Topic::CarParams,
            Message::DriverMonitoringState(_) => Topic::DriverMonitoringState,
            Message::SensorEvents(_) => Topic::SensorEvents,
            Message::CarState(_) => Topic::CarState,
            Message::LiveNaviData(_) => Topic::LiveNaviData,
            Message::GpsLocationExternal(_) => Topic::GpsLocationExternal,
            Message::LateralPlan(_) => Topic::LateralPlan,
            Message::LiveParameters(_) => Topic::LiveParameters,
        }
    }
}
