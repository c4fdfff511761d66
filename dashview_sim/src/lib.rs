//! DashView Deterministic Simulation Testing (DST) Harness
//!
//! This crate runs the real UI state loop against a simulated car and
//! device, with every source of non-determinism under control:
//! - **Time**: Virtual clock advances one frame per tick
//! - **Messages**: Published by the oracle straight into the UI channel
//! - **Randomness**: All sensor noise derived from a single 64-bit seed
//! - **Hardware**: Display writes recorded in call order
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         SimWorld                            │
//! │  ┌──────────────────────────────────────────────────────┐   │
//! │  │ SimContext (Virtual Clock, inline blocking work)     │   │
//! │  └──────────────────────────────────────────────────────┘   │
//! │                                                             │
//! │  ┌─────────────┐  messages   ┌───────────┐   power/bright   │
//! │  │ DriveOracle │────────────►│ UiRuntime │──────────────►   │
//! │  │ (truth)     │             │           │  Recording       │
//! │  └─────────────┘             └─────┬─────┘  Hardware        │
//! │                                    │ UiEvent                │
//! │                                    ▼                        │
//! │                               WorldLog                      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use dashview_sim::{ScenarioRunner, scenarios::ScenarioId};
//!
//! let result = ScenarioRunner::new(42).run(ScenarioId::Drive);
//! assert!(result.passed);
//! ```

mod context;
mod error;
mod exporter;
mod hardware;
mod oracle;
mod runner;
pub mod scenarios;
mod world;

pub use context::SimContext;
pub use error::{load_ui_config, SimError};
pub use exporter::{SimEvent, SimExport, SimFrame};
pub use hardware::RecordingHardware;
pub use oracle::{AlertTruth, DriveOracle, LeadTruth};
pub use runner::{ScenarioMetrics, ScenarioResult, ScenarioRunner};
pub use world::{SimConfig, SimWorld, WorldLog};
