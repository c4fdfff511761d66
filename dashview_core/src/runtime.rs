//! UI Runtime - the fixed-rate tick that ties everything together.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         UiRuntime                            │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │ Context: UiContext                                     │  │
//! │  │  • now()            → running time                     │  │
//! │  │  • sleep()          → tick rate                        │  │
//! │  │  • spawn_blocking() → backlight writes                 │  │
//! │  └────────────────────────────────────────────────────────┘  │
//! │                                                              │
//! │  SubMaster ─▶ SceneFuser ─▶ status ─▶ Brightness ─▶ Wake     │
//! │                                 │                            │
//! │                                 ▼                            │
//! │                    broadcast<UiEvent> to renderers           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use dashview_core::{UiConfig, UiRuntime};
//! use dashview_env::{ChannelSource, SledParams, SysfsHardware, TokioContext};
//!
//! let (tx, source) = ChannelSource::channel(256);
//! let mut runtime = UiRuntime::new(ctx, source, hw, params, UiConfig::default());
//! let mut events = runtime.subscribe();
//! runtime.run().await;
//! ```

use crate::brightness::BrightnessController;
use crate::config::UiConfig;
use crate::fuser::{SceneFuser, UI_TOPICS};
use crate::scene::{UiScene, UiState};
use crate::wakefulness::{WakeEvents, Wakefulness};
use dashview_env::{Hardware, MessageSource, ParamStore, SubMaster, UiContext};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info};

/// Signals for renderers and other consumers.
#[derive(Debug, Clone)]
pub enum UiEvent {
    /// Emitted every tick with the fused scene
    SceneUpdated(Arc<UiScene>),
    /// Onroad/offroad edge; carries the new offroad flag
    OffroadTransition(bool),
    /// Display power was switched
    DisplayPowerChanged(bool),
}

/// Outcome of one tick, for callers that drive the loop by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TickReport {
    pub frame: u64,
    /// Messages accepted this tick
    pub messages: usize,
    pub started: bool,
    /// New offroad flag when an offroad transition was emitted
    pub offroad_transition: Option<bool>,
    /// Brightness dispatched to the hardware this tick
    pub brightness: Option<i32>,
    pub wake: WakeEvents,
    pub awake: bool,
}

pub struct UiRuntime<Ctx, Src>
where
    Ctx: UiContext,
    Src: MessageSource,
{
    context: Arc<Ctx>,
    hardware: Arc<dyn Hardware>,
    sm: SubMaster<Src>,
    fuser: SceneFuser,
    brightness: BrightnessController,
    wakefulness: Wakefulness,
    state: UiState,
    events: broadcast::Sender<UiEvent>,
    config: UiConfig,
}

impl<Ctx, Src> UiRuntime<Ctx, Src>
where
    Ctx: UiContext,
    Src: MessageSource,
{
    /// Creates a runtime, loads settings and turns the display on.
    pub fn new(
        context: Arc<Ctx>,
        source: Src,
        hardware: Arc<dyn Hardware>,
        params: Arc<dyn ParamStore>,
        config: UiConfig,
    ) -> Self {
        let profile = hardware.profile();
        let fuser = SceneFuser::new(config.clone(), profile, params);
        let brightness = BrightnessController::new(&config, profile);
        let mut wakefulness = Wakefulness::new(&config);
        let (events, _) = broadcast::channel(config.event_capacity.max(1));

        let mut state = UiState::new(&config);
        fuser.load_params(&mut state);
        wakefulness.wake(&mut state.scene, hardware.as_ref());
        state.awake = wakefulness.awake();

        info!(
            "ui runtime on {} at {} Hz, wide camera {}",
            profile, config.ui_freq, state.wide_camera
        );

        Self {
            context,
            hardware,
            sm: SubMaster::new(source, &UI_TOPICS),
            fuser,
            brightness,
            wakefulness,
            state,
            events,
            config,
        }
    }

    /// New receiver for [`UiEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.events.subscribe()
    }

    pub fn state(&self) -> &UiState {
        &self.state
    }

    pub fn submaster(&self) -> &SubMaster<Src> {
        &self.sm
    }

    pub fn context(&self) -> &Arc<Ctx> {
        &self.context
    }

    pub fn config(&self) -> &UiConfig {
        &self.config
    }

    /// Filtered backlight value before sleep and dimming.
    pub fn filtered_brightness(&self) -> f32 {
        self.brightness.filtered()
    }

    pub fn awake_timeout(&self) -> i32 {
        self.wakefulness.awake_timeout()
    }

    fn emit(&self, event: UiEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    /// Runs one frame: drain, fuse, derive status, then drive the display.
    pub fn tick(&mut self) -> TickReport {
        let messages = self.sm.update();
        let frame = self.sm.frame();

        self.fuser
            .update_state(&self.sm, &mut self.state, self.context.now());
        let transition = self.fuser.update_status(&self.sm, &mut self.state);

        let started = self.state.scene.started;
        let offroad_transition = (transition || frame == 1).then_some(!started);
        if let Some(offroad) = offroad_transition {
            self.emit(UiEvent::OffroadTransition(offroad));
        }

        if frame % u64::from(self.config.ui_freq.max(1)) == 0 {
            debug!(
                frame,
                started,
                status = ?self.state.scene.status,
                awake = self.state.awake,
                "heartbeat"
            );
        }

        self.emit(UiEvent::SceneUpdated(Arc::new(self.state.scene.clone())));

        let brightness = self.brightness.update(
            &self.state,
            self.wakefulness.awake(),
            self.context.as_ref(),
            &self.hardware,
        );
        let wake = self
            .wakefulness
            .update(&mut self.state.scene, self.hardware.as_ref());
        if let Some(on) = wake.power_changed {
            self.emit(UiEvent::DisplayPowerChanged(on));
        }
        self.state.awake = self.wakefulness.awake();

        TickReport {
            frame,
            messages,
            started,
            offroad_transition,
            brightness,
            wake,
            awake: self.state.awake,
        }
    }

    /// Runs `ticks` frames at the configured rate.
    pub async fn run_ticks(&mut self, ticks: u64) {
        let period = self.config.tick_period();
        for _ in 0..ticks {
            self.tick();
            self.context.sleep(period).await;
        }
    }

    /// Runs until the process exits.
    pub async fn run(&mut self) {
        let period = self.config.tick_period();
        loop {
            self.tick();
            self.context.sleep(period).await;
        }
    }
}
