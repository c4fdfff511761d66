//! The scene snapshot and the process-level UI state that owns it.
//!
//! Fields fed by a topic are only meaningful once that topic has been
//! received; sub-state copies stay `None` until then.

use crate::config::UiConfig;
use crate::geometry::{view_from_device, Camera, Projector};
use crate::trajectory::VertexStrip;
use dashview_env::messages::{
    AlertSize, CarState, ControlsState, DeviceState, GpsLocationExternal, LateralPlan, LiveNaviData,
    LiveParameters, PandaType,
};
use nalgebra::{Matrix3, Point2};
use serde::Serialize;

/// Lane lines drawn per model frame.
pub const LANE_LINE_COUNT: usize = 4;

/// Road edges drawn per model frame.
pub const ROAD_EDGE_COUNT: usize = 2;

/// Display status derived from the controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum UiStatus {
    #[default]
    Disengaged,
    Engaged,
    Warning,
    Alert,
}

/// Screen wake and dimming settings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct ScreenControl {
    /// Driver wake key (cruise switch state)
    pub awake: i32,
    /// Keep-on countdown in ticks
    pub n_time: i32,
    /// Minutes before the onroad screen dims, 0 = disabled
    pub auto_screen_off: i32,
    /// Dimmed brightness percentage, 0 = no dimming
    pub brightness_off: i32,
    pub map_is_running: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AlertText {
    pub text1: String,
    pub text2: String,
    pub text3: String,
}

/// Projected radar lead.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LeadMarker {
    pub vertex: Point2<f32>,
    pub d_rel: f32,
    pub y_rel: f32,
    pub v_rel: f32,
}

/// Everything the renderer needs for one frame.
#[derive(Debug, Clone, Serialize)]
pub struct UiScene {
    /// Onroad
    pub started: bool,
    /// Frame of the last offroad → onroad transition
    pub started_frame: u64,
    pub ignition: bool,
    /// False until a calibration arrives after going onroad
    pub world_objects_visible: bool,
    pub status: UiStatus,

    pub is_metric: bool,
    /// Onroad without ignition
    pub preview_mode: bool,
    pub end_to_end: bool,
    pub engageable: bool,
    pub dm_active: bool,
    pub longitudinal_control: bool,
    pub panda_type: PandaType,

    pub view_from_calib: Matrix3<f32>,

    pub lane_line_vertices: [VertexStrip; LANE_LINE_COUNT],
    pub lane_line_probs: [f32; LANE_LINE_COUNT],
    pub road_edge_vertices: [VertexStrip; ROAD_EDGE_COUNT],
    pub road_edge_stds: [f32; ROAD_EDGE_COUNT],
    pub track_vertices: VertexStrip,
    pub lead_markers: [Option<LeadMarker>; 2],

    /// Ambient light estimate in [0, 1]
    pub light_sensor: f32,
    pub accel_sensor: f32,
    pub gyro_sensor: f32,

    pub car_state: Option<CarState>,
    pub device_state: Option<DeviceState>,
    pub controls_state: Option<ControlsState>,
    pub live_navi_data: Option<LiveNaviData>,
    pub gps_location: Option<GpsLocationExternal>,
    pub lateral_plan: Option<LateralPlan>,
    pub live_parameters: Option<LiveParameters>,
    pub alert: AlertText,

    pub scr: ScreenControl,
}

impl Default for UiScene {
    fn default() -> Self {
        Self {
            started: false,
            started_frame: 0,
            ignition: false,
            world_objects_visible: false,
            status: UiStatus::Disengaged,
            is_metric: false,
            preview_mode: false,
            end_to_end: false,
            engageable: false,
            dm_active: false,
            longitudinal_control: false,
            panda_type: PandaType::Unknown,
            view_from_calib: view_from_device(),
            lane_line_vertices: Default::default(),
            lane_line_probs: [0.0; LANE_LINE_COUNT],
            road_edge_vertices: Default::default(),
            road_edge_stds: [0.0; ROAD_EDGE_COUNT],
            track_vertices: VertexStrip::default(),
            lead_markers: [None; 2],
            light_sensor: 0.0,
            accel_sensor: 0.0,
            gyro_sensor: 0.0,
            car_state: None,
            device_state: None,
            controls_state: None,
            live_navi_data: None,
            gps_location: None,
            lateral_plan: None,
            live_parameters: None,
            alert: AlertText::default(),
            scr: ScreenControl::default(),
        }
    }
}

impl UiScene {
    /// Ego speed, 0 before the first car state.
    pub fn v_ego(&self) -> f32 {
        self.car_state.map(|c| c.v_ego).unwrap_or(0.0)
    }

    /// Whether an alert is on screen.
    pub fn alert_visible(&self) -> bool {
        self.started
            && self
                .controls_state
                .as_ref()
                .is_some_and(|cs| cs.alert_size != AlertSize::None)
    }
}

/// Process-level UI state: the scene plus what the fuser derives around it.
#[derive(Debug, Clone)]
pub struct UiState {
    pub scene: UiScene,
    /// Seconds since the device went onroad
    pub running_time: f64,
    pub wide_camera: bool,
    pub has_prime: bool,
    /// Display on
    pub awake: bool,
    pub projector: Projector,
}

impl UiState {
    pub fn new(config: &UiConfig) -> Self {
        Self {
            scene: UiScene::default(),
            running_time: 0.0,
            wide_camera: false,
            has_prime: false,
            awake: false,
            projector: Projector::new(config.frame_width, config.frame_height, Camera::Road),
        }
    }

    /// Camera selected by the wide camera toggle.
    pub fn camera(&self) -> Camera {
        if self.wide_camera {
            Camera::Wide
        } else {
            Camera::Road
        }
    }
}
