//! DashView Core - per-frame scene fusion for a driving-assistance dashboard
//!
//! This library turns asynchronous, variable-rate message streams into one
//! consistent scene per UI frame:
//! 1. **Projection**: calibrated 3D model output to clipped screen coordinates
//! 2. **Trajectories**: lane lines, road edges and the planned path as ribbons
//! 3. **Fusion**: topic updates folded into the scene, status and onroad edges
//! 4. **Display control**: filtered backlight and the wake/sleep state machine
//!
//! Rendering is not part of this crate; consumers subscribe to [`UiEvent`]s.

pub mod brightness;
pub mod config;
pub mod error;
pub mod fuser;
pub mod geometry;
pub mod runtime;
pub mod scene;
pub mod trajectory;
pub mod wakefulness;

// Re-export key types for convenience
pub use brightness::{BrightnessController, FirstOrderFilter};
pub use config::UiConfig;
pub use error::MessageError;
pub use fuser::SceneFuser;
pub use geometry::{Camera, Projector};
pub use runtime::{TickReport, UiEvent, UiRuntime};
pub use scene::{LeadMarker, ScreenControl, UiScene, UiState, UiStatus};
pub use trajectory::{build_strip, draw_distance, path_length_idx, VertexStrip};
pub use wakefulness::{WakeEvents, Wakefulness};
