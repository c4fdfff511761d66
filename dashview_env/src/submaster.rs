//! Per-tick subscription bookkeeping over a [`MessageSource`].
//!
//! The SubMaster answers three questions per topic after each `update()`:
//! did it update this tick, what is its latest value, and in which frame was
//! it last received.

use crate::messages::*;
use crate::transport::MessageSource;
use tracing::trace;

macro_rules! latest_accessor {
    ($(#[$doc:meta])* $fn_name:ident, $variant:ident, $ty:ty) => {
        $(#[$doc])*
        pub fn $fn_name(&self) -> Option<&$ty> {
            match self.latest[Topic::$variant.index()].as_ref()? {
                Message::$variant(inner) => Some(inner),
                _ => None,
            }
        }
    };
}

/// Subscription state for a fixed topic set.
pub struct SubMaster<S: MessageSource> {
    source: S,

    /// Topics accepted by this subscriber, fixed at construction
    subscribed: [bool; Topic::COUNT],

    /// Topics that received at least one message in the current frame
    updated: [bool; Topic::COUNT],

    /// Frame number of the last delivery per topic (0 = never)
    rcv_frame: [u64; Topic::COUNT],

    /// Latest payload per topic
    latest: [Option<Message>; Topic::COUNT],

    /// Number of `update()` calls so far
    frame: u64,
}

impl<S: MessageSource> SubMaster<S> {
    /// Creates a SubMaster that accepts only `topics`.
    pub fn new(source: S, topics: &[Topic]) -> Self {
        let mut subscribed = [false; Topic::COUNT];
        for topic in topics {
            subscribed[topic.index()] = true;
        }

        Self {
            source,
            subscribed,
            updated: [false; Topic::COUNT],
            rcv_frame: [0; Topic::COUNT],
            latest: std::array::from_fn(|_| None),
            frame: 0,
        }
    }

    /// Advances one frame and drains the source without blocking.
    ///
    /// When a topic delivers several messages in the same frame only the
    /// newest is kept. Returns the number of accepted messages.
    pub fn update(&mut self) -> usize {
        self.frame += 1;
        self.updated = [false; Topic::COUNT];

        let mut accepted = 0;
        for msg in self.source.drain() {
            let topic = msg.topic();
            let idx = topic.index();
            if !self.subscribed[idx] {
                trace!("dropping message on unsubscribed topic {}", topic);
                continue;
            }
            self.updated[idx] = true;
            self.rcv_frame[idx] = self.frame;
            self.latest[idx] = Some(msg);
            accepted += 1;
        }
        accepted
    }

    /// Current frame number (1 after the first `update()`).
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// Whether `topic` delivered a message in the current frame.
    pub fn updated(&self, topic: Topic) -> bool {
        self.updated[topic.index()]
    }

    /// Frame in which `topic` was last received, 0 if never.
    pub fn rcv_frame(&self, topic: Topic) -> u64 {
        self.rcv_frame[topic.index()]
    }

    /// Frames elapsed since `topic` was last received.
    ///
    /// A never-received topic counts from frame 0.
    pub fn frames_since(&self, topic: Topic) -> u64 {
        self.frame - self.rcv_frame[topic.index()]
    }

    /// Whether `topic` is part of the subscription set.
    pub fn is_subscribed(&self, topic: Topic) -> bool {
        self.subscribed[topic.index()]
    }

    /// Latest raw payload of `topic`.
    pub fn latest(&self, topic: Topic) -> Option<&Message> {
        self.latest[topic.index()].as_ref()
    }

    latest_accessor!(model_v2, ModelV2, ModelV2);
    latest_accessor!(controls_state, ControlsState, ControlsState);
    latest_accessor!(live_calibration, LiveCalibration, LiveCalibration);
    latest_accessor!(radar_state, RadarState, RadarState);
    latest_accessor!(device_state, DeviceState, DeviceState);
    latest_accessor!(road_camera_state, RoadCameraState, RoadCameraState);
    latest_accessor!(
        /// Adapter states, one per connected panda.
        panda_states, PandaStates, Vec<PandaState>
    );
    latest_accessor!(car_params, CarParams, CarParams);
    latest_accessor!(driver_monitoring_state, DriverMonitoringState, DriverMonitoringState);
    latest_accessor!(sensor_events, SensorEvents, Vec<SensorEvent>);
    latest_accessor!(car_state, CarState, CarState);
    latest_accessor!(live_navi_data, LiveNaviData, LiveNaviData);
    latest_accessor!(gps_location_external, GpsLocationExternal, GpsLocationExternal);
    latest_accessor!(lateral_plan, LateralPlan, LateralPlan);
    latest_accessor!(live_parameters, LiveParameters, LiveParameters);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelSource;

    fn submaster(topics: &[Topic]) -> (tokio::sync::mpsc::Sender<Message>, SubMaster<ChannelSource>) {
        let (tx, source) = ChannelSource::channel(64);
        (tx, SubMaster::new(source, topics))
    }

    #[test]
    fn test_updated_is_per_frame() {
        let (tx, mut sm) = submaster(&Topic::ALL);

        tx.try_send(Message::CarState(CarState::default())).unwrap();
        assert_eq!(sm.update(), 1);
        assert!(sm.updated(Topic::CarState));
        assert_eq!(sm.rcv_frame(Topic::CarState), 1);

        sm.update();
        assert!(!sm.updated(Topic::CarState));
        assert_eq!(sm.rcv_frame(Topic::CarState), 1);
        assert_eq!(sm.frames_since(Topic::CarState), 1);
        assert!(sm.car_state().is_some());
    }

    #[test]
    fn test_newest_message_wins_within_frame() {
        let (tx, mut sm) = submaster(&Topic::ALL);

        for v in [1.0, 2.0, 3.0] {
            let state = CarState {
                v_ego: v,
                ..Default::default()
            };
            tx.try_send(Message::CarState(state)).unwrap();
        }
        sm.update();

        assert_eq!(sm.car_state().map(|c| c.v_ego), Some(3.0));
    }

    #[test]
    fn test_unsubscribed_topics_are_dropped() {
        let (tx, mut sm) = submaster(&[Topic::CarState]);

        tx.try_send(Message::CarParams(CarParams::default())).unwrap();
        assert_eq!(sm.update(), 0);
        assert!(!sm.updated(Topic::CarParams));
        assert!(sm.car_params().is_none());
        assert!(!sm.is_subscribed(Topic::CarParams));
    }

    #[test]
    fn test_never_received_counts_from_zero() {
        let (_tx, mut sm) = submaster(&Topic::ALL);
        for _ in 0..7 {
            sm.update();
        }
        assert_eq!(sm.frame(), 7);
        assert_eq!(sm.rcv_frame(Topic::PandaStates), 0);
        assert_eq!(sm.frames_since(Topic::PandaStates), 7);
        assert!(sm.latest(Topic::PandaStates).is_none());
    }
}
