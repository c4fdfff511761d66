//! Geometric Projector - calibrated car space to screen space
//!
//! A point goes through three transforms:
//! 1. `view_from_calib`: calibrated car frame → camera view frame (rotation)
//! 2. camera intrinsics + perspective divide → full-frame image pixels
//! 3. car space transform (2D affine) → display coordinates
//!
//! Points whose display coordinates fall outside the frame grown by
//! [`CLIP_MARGIN`] on every side are reported as not visible.

use dashview_env::HardwareProfile;
use nalgebra::{Affine2, Matrix3, Point2, Rotation3, Vector3};
use serde::{Deserialize, Serialize};

/// Margin around the frame inside which geometry is still emitted.
pub const CLIP_MARGIN: f32 = 500.0;

/// Projected depth at or below which a point is rejected.
pub const MIN_DEPTH: f32 = 1e-3;

/// Display zoom numerator; divided by the focal length of the active camera.
pub const CAMERA_ZOOM: f32 = 2912.8;

/// Road camera in use for the current frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Camera {
    /// Narrow-angle road camera
    #[default]
    Road,
    /// Wide-angle road camera
    Wide,
}

impl Camera {
    /// Intrinsic matrix of the camera on `profile`.
    ///
    /// The road camera sensor differs between units; only Tici carries a
    /// wide camera.
    pub fn intrinsics(&self, profile: HardwareProfile) -> Matrix3<f32> {
        match (self, profile) {
            (Camera::Road, HardwareProfile::Tici) => Matrix3::new(
                2648.0, 0.0, 964.0,
                0.0, 2648.0, 604.0,
                0.0, 0.0, 1.0,
            ),
            (Camera::Road, _) => Matrix3::new(
                910.0, 0.0, 582.0,
                0.0, 910.0, 437.0,
                0.0, 0.0, 1.0,
            ),
            (Camera::Wide, _) => Matrix3::new(
                567.0, 0.0, 964.0,
                0.0, 567.0, 604.0,
                0.0, 0.0, 1.0,
            ),
        }
    }
}

/// Axis permutation from device frame (x fwd, y right, z down) to camera
/// view frame (x right, y down, z fwd).
pub fn view_from_device() -> Matrix3<f32> {
    Matrix3::new(
        0.0, 1.0, 0.0,
        0.0, 0.0, 1.0,
        1.0, 0.0, 0.0,
    )
}

/// Rotation for roll/pitch/yaw: `Rz(yaw) * Ry(pitch) * Rx(roll)`.
pub fn euler_to_rot(rpy: &Vector3<f32>) -> Matrix3<f32> {
    Rotation3::from_euler_angles(rpy.x, rpy.y, rpy.z).into_inner()
}

/// Full calibration rotation used by the projector.
pub fn view_from_calib(rpy: &Vector3<f32>) -> Matrix3<f32> {
    view_from_device() * euler_to_rot(rpy)
}

/// Axis-aligned rectangle in display coordinates, edges inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipRect {
    pub min: Point2<f32>,
    pub max: Point2<f32>,
}

impl ClipRect {
    /// Frame of `width` x `height` grown by `margin` on every side.
    pub fn around_frame(width: f32, height: f32, margin: f32) -> Self {
        Self {
            min: Point2::new(-margin, -margin),
            max: Point2::new(width + margin, height + margin),
        }
    }

    pub fn contains(&self, p: &Point2<f32>) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }
}

/// Maps image pixels of a camera with intrinsics `k` onto a display of the
/// given size.
///
/// Centers the principal point on the display and scales by the camera zoom.
pub fn car_space_transform(width: f32, height: f32, k: &Matrix3<f32>) -> Affine2<f32> {
    let zoom = CAMERA_ZOOM / k[(0, 0)];
    let (cx, cy) = (k[(0, 2)], k[(1, 2)]);

    Affine2::from_matrix_unchecked(Matrix3::new(
        zoom, 0.0, width / 2.0 - zoom * cx,
        0.0, zoom, height / 2.0 - zoom * cy,
        0.0, 0.0, 1.0,
    ))
}

/// Projects calibrated 3D points to clipped display coordinates.
#[derive(Debug, Clone)]
pub struct Projector {
    camera: Camera,
    profile: HardwareProfile,
    view_from_calib: Matrix3<f32>,
    intrinsics: Matrix3<f32>,
    car_space: Affine2<f32>,
    clip: ClipRect,
    width: f32,
    height: f32,
}

impl Projector {
    /// Creates an uncalibrated projector for a display of `width` x `height`.
    ///
    /// Until calibration arrives the device is assumed aligned with the car.
    /// Intrinsics start out as the desktop profile's.
    pub fn new(width: f32, height: f32, camera: Camera) -> Self {
        let profile = HardwareProfile::default();
        let intrinsics = camera.intrinsics(profile);
        Self {
            camera,
            profile,
            view_from_calib: view_from_device(),
            intrinsics,
            car_space: car_space_transform(width, height, &intrinsics),
            clip: ClipRect::around_frame(width, height, CLIP_MARGIN),
            width,
            height,
        }
    }

    /// Switches camera; rebuilds intrinsics and the display transform.
    pub fn set_camera(&mut self, camera: Camera) {
        if camera != self.camera {
            self.camera = camera;
            self.rebuild();
        }
    }

    /// Switches the unit whose road camera sensor is projected through.
    pub fn set_profile(&mut self, profile: HardwareProfile) {
        if profile != self.profile {
            self.profile = profile;
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        self.intrinsics = self.camera.intrinsics(self.profile);
        self.car_space = car_space_transform(self.width, self.height, &self.intrinsics);
    }

    pub fn set_view_from_calib(&mut self, view_from_calib: Matrix3<f32>) {
        self.view_from_calib = view_from_calib;
    }

    pub fn camera(&self) -> Camera {
        self.camera
    }

    pub fn profile(&self) -> HardwareProfile {
        self.profile
    }

    pub fn view_from_calib(&self) -> &Matrix3<f32> {
        &self.view_from_calib
    }

    pub fn intrinsics(&self) -> &Matrix3<f32> {
        &self.intrinsics
    }

    pub fn car_space(&self) -> &Affine2<f32> {
        &self.car_space
    }

    pub fn clip_rect(&self) -> &ClipRect {
        &self.clip
    }

    /// Projects a calibrated point; `None` when behind the camera or clipped.
    pub fn project(&self, point: &Vector3<f32>) -> Option<Point2<f32>> {
        let ep = self.view_from_calib * point;
        let kep = self.intrinsics * ep;

        // Also rejects NaN depth.
        if !(kep.z > MIN_DEPTH) {
            return None;
        }

        let image = Point2::new(kep.x / kep.z, kep.y / kep.z);
        let display = self.car_space.transform_point(&image);
        self.clip.contains(&display).then_some(display)
    }
}
