//! JSON exporter for offline replay.
//!
//! Exports sampled scene frames so plots and replays can be built without
//! rerunning the simulation.

use crate::error::SimError;
use dashview_core::{UiState, UiStatus};
use nalgebra::Point2;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A single sampled frame of simulation data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimFrame {
    /// Simulation time in seconds
    pub time_sec: f64,
    pub frame: u64,

    pub started: bool,
    pub status: String,
    pub awake: bool,
    /// Backlight percentage last written to the panel
    #[serde(skip_serializing_if = "Option::is_none")]
    pub brightness: Option<u8>,
    pub light_sensor: f32,
    pub v_ego: f32,

    /// Planned path ribbon in screen space
    pub track: Vec<[f32; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lead: Option<[f32; 2]>,

    /// Edges and power changes since the previous sample
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SimEvent>,
}

impl SimFrame {
    /// Samples the UI state at `frame`.
    pub fn capture(time_sec: f64, frame: u64, state: &UiState, brightness: Option<u8>) -> Self {
        let scene = &state.scene;
        Self {
            time_sec,
            frame,
            started: scene.started,
            status: status_name(scene.status).to_string(),
            awake: state.awake,
            brightness,
            light_sensor: scene.light_sensor,
            v_ego: scene.v_ego(),
            track: scene.track_vertices.points().iter().map(xy).collect(),
            lead: scene.lead_markers[0].map(|m| xy(&m.vertex)),
            events: Vec::new(),
        }
    }
}

fn xy(p: &Point2<f32>) -> [f32; 2] {
    [p.x, p.y]
}

fn status_name(status: UiStatus) -> &'static str {
    match status {
        UiStatus::Disengaged => "disengaged",
        UiStatus::Engaged => "engaged",
        UiStatus::Warning => "warning",
        UiStatus::Alert => "alert",
    }
}

/// Simulation event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimEvent {
    pub frame: u64,
    pub message: String,
}

/// Complete simulation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimExport {
    /// Scenario name
    pub scenario: String,

    /// Seed used
    pub seed: u64,

    /// Duration in seconds
    pub duration_sec: f64,

    /// Sampled frames
    pub frames: Vec<SimFrame>,

    /// Final results
    pub passed: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

impl SimExport {
    /// Creates a new export container.
    pub fn new(scenario: &str, seed: u64) -> Self {
        Self {
            scenario: scenario.to_string(),
            seed,
            duration_sec: 0.0,
            frames: Vec::new(),
            passed: false,
            failure_reason: None,
        }
    }

    /// Adds a frame.
    pub fn add_frame(&mut self, frame: SimFrame) {
        self.duration_sec = frame.time_sec;
        self.frames.push(frame);
    }

    /// Finalizes the export.
    pub fn finalize(&mut self, passed: bool, failure_reason: Option<String>) {
        self.passed = passed;
        self.failure_reason = failure_reason;
    }

    /// Writes to a JSON file.
    pub fn write_to_file(&self, path: impl AsRef<Path>) -> Result<(), SimError> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dashview_core::UiConfig;

    #[test]
    fn test_capture_default_state() {
        let state = UiState::new(&UiConfig::default());
        let frame = SimFrame::capture(1.5, 30, &state, Some(50));

        assert_eq!(frame.frame, 30);
        assert_eq!(frame.status, "disengaged");
        assert!(frame.track.is_empty());
        assert!(frame.lead.is_none());
        assert_eq!(frame.brightness, Some(50));
    }

    #[test]
    fn test_export_tracks_duration() {
        let state = UiState::new(&UiConfig::default());
        let mut export = SimExport::new("drive", 7);
        export.add_frame(SimFrame::capture(0.5, 10, &state, None));
        export.add_frame(SimFrame::capture(1.0, 20, &state, None));
        export.finalize(true, None);

        assert_eq!(export.frames.len(), 2);
        assert_eq!(export.duration_sec, 1.0);

        let json = serde_json::to_value(&export).unwrap();
        assert_eq!(json["scenario"], "drive");
        assert!(json.get("failure_reason").is_none());
        assert!(json["frames"][0].get("brightness").is_none());
    }
}
