//! Malformed payload errors.
//!
//! These never cross the tick boundary: the fuser logs them and skips the
//! affected update.

use crate::trajectory::TRAJECTORY_SIZE;
use dashview_env::messages::{ModelV2, XyztData};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum MessageError {
    /// Sensor vector too short for the axis we read
    #[error("{sensor} vector has {len} elements, need {needed}")]
    ShortVector {
        sensor: &'static str,
        len: usize,
        needed: usize,
    },

    /// Model polyline with fewer samples than a full trajectory
    #[error("{what} has {len} samples, expected {}", TRAJECTORY_SIZE)]
    ShortPolyline { what: &'static str, len: usize },

    /// Model output missing lines or their confidences
    #[error("model has {lines} {what}, need {needed}")]
    MissingLines {
        what: &'static str,
        lines: usize,
        needed: usize,
    },

    /// Calibration without three Euler angles
    #[error("calibration has {0} angles, expected 3")]
    BadCalibration(usize),
}

/// Reads `v[axis]`, failing on short vectors.
pub fn sensor_axis(sensor: &'static str, v: &[f32], axis: usize) -> Result<f32, MessageError> {
    v.get(axis).copied().ok_or(MessageError::ShortVector {
        sensor,
        len: v.len(),
        needed: axis + 1,
    })
}

fn check_polyline(what: &'static str, line: &XyztData) -> Result<(), MessageError> {
    if line.len() < TRAJECTORY_SIZE {
        return Err(MessageError::ShortPolyline {
            what,
            len: line.len(),
        });
    }
    Ok(())
}

/// Checks a model message carries `lane_lines` lane lines and `road_edges`
/// road edges, each with a confidence and a full trajectory.
pub fn validate_model(model: &ModelV2, lane_lines: usize, road_edges: usize) -> Result<(), MessageError> {
    check_polyline("position", &model.position)?;

    let lanes = model.lane_lines.len().min(model.lane_line_probs.len());
    if lanes < lane_lines {
        return Err(MessageError::MissingLines {
            what: "lane lines",
            lines: lanes,
            needed: lane_lines,
        });
    }
    let edges = model.road_edges.len().min(model.road_edge_stds.len());
    if edges < road_edges {
        return Err(MessageError::MissingLines {
            what: "road edges",
            lines: edges,
            needed: road_edges,
        });
    }

    for line in &model.lane_lines[..lane_lines] {
        check_polyline("lane line", line)?;
    }
    for line in &model.road_edges[..road_edges] {
        check_polyline("road edge", line)?;
    }
    Ok(())
}

/// Roll, pitch and yaw from a calibration vector.
pub fn calibration_rpy(rpy: &[f32]) -> Result<[f32; 3], MessageError> {
    match rpy {
        [r, p, y, ..] => Ok([*r, *p, *y]),
        _ => Err(MessageError::BadCalibration(rpy.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn full_line() -> XyztData {
        XyztData {
            x: vec![0.0; TRAJECTORY_SIZE],
            y: vec![0.0; TRAJECTORY_SIZE],
            z: vec![0.0; TRAJECTORY_SIZE],
            t: vec![0.0; TRAJECTORY_SIZE],
        }
    }

    #[test]
    fn test_sensor_axis() {
        assert_eq!(sensor_axis("accel", &[0.0, 1.0, 9.8], 2), Ok(9.8));
        assert_eq!(
            sensor_axis("accel", &[], 2),
            Err(MessageError::ShortVector { sensor: "accel", len: 0, needed: 3 })
        );
    }

    #[test]
    fn test_validate_model() {
        let mut model = ModelV2 {
            position: full_line(),
            lane_lines: vec![full_line(); 4],
            lane_line_probs: vec![0.9; 4],
            road_edges: vec![full_line(); 2],
            road_edge_stds: vec![0.1; 2],
            ..Default::default()
        };
        assert!(validate_model(&model, 4, 2).is_ok());

        model.lane_line_probs.pop();
        assert!(matches!(
            validate_model(&model, 4, 2),
            Err(MessageError::MissingLines { lines: 3, .. })
        ));

        model.lane_line_probs.push(0.9);
        model.road_edges[1].x.truncate(10);
        assert_eq!(
            validate_model(&model, 4, 2),
            Err(MessageError::ShortPolyline { what: "road edge", len: 10 })
        );
    }

    #[test]
    fn test_calibration_rpy() {
        assert_eq!(calibration_rpy(&[0.1, 0.2, 0.3]), Ok([0.1, 0.2, 0.3]));
        assert_eq!(calibration_rpy(&[0.1]), Err(MessageError::BadCalibration(1)));
        assert!(MessageError::BadCalibration(1).to_string().contains("expected 3"));
    }
}
