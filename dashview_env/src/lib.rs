//! DashView Environment Abstraction Layer
//!
//! This crate provides the collaborators the UI state loop talks to, behind
//! traits so the same loop runs in **Production** (tokio, sysfs, sled) and
//! **Simulation** (virtual clock, recording hardware, in-memory params).
//!
//! # Collaborators
//!
//! - Clock and off-thread execution (`UiContext`)
//! - Message transport (`MessageSource`, `SubMaster`)
//! - Persisted settings (`ParamStore`)
//! - Display hardware (`Hardware`)
//!
//! # Example
//!
//! ```ignore
//! use dashview_env::{ChannelSource, SubMaster, Topic};
//!
//! let (tx, source) = ChannelSource::channel(256);
//! let mut sm = SubMaster::new(source, &Topic::ALL);
//! loop {
//!     sm.update();
//!     if sm.updated(Topic::CarState) { /* ... */ }
//! }
//! ```

mod context;
mod error;
mod hardware;
pub mod messages;
mod params;
mod submaster;
mod tokio_impl;
mod transport;

pub use context::UiContext;
pub use error::EnvError;
pub use hardware::{Hardware, HardwareProfile, SysfsHardware};
pub use messages::{Message, Topic};
pub use params::{MemoryParams, ParamKey, ParamStore, SledParams};
pub use submaster::SubMaster;
pub use tokio_impl::TokioContext;
pub use transport::{ChannelSource, MessageSource};
