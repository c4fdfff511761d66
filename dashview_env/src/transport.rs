//! Message transport abstraction for the UI loop.

use crate::messages::Message;
use tokio::sync::mpsc;

/// A non-blocking source of decoded messages.
///
/// # Implementations
///
/// - **Production**: a bridge task feeding [`ChannelSource`] from the real bus
/// - **Simulation**: the drive oracle feeding [`ChannelSource`] directly
///
/// # Packet Flow
///
/// ```text
/// Publisher                Channel                   UI tick
///   |                         |                         |
///   |-- send(Message) ------->|                         |
///   |                         |<------- drain() --------|
///   |                         |-- Vec<Message> -------->|
/// ```
pub trait MessageSource: Send {
    /// Returns every message delivered since the previous call.
    ///
    /// Never blocks; an empty vector means nothing arrived.
    fn drain(&mut self) -> Vec<Message>;
}

/// Channel-backed message source.
pub struct ChannelSource {
    rx: mpsc::Receiver<Message>,
}

impl ChannelSource {
    /// Wraps an existing receiver.
    pub fn new(rx: mpsc::Receiver<Message>) -> Self {
        Self { rx }
    }

    /// Creates a bounded channel and returns the publishing half with the source.
    pub fn channel(capacity: usize) -> (mpsc::Sender<Message>, Self) {
        let (tx, rx) = mpsc::channel(capacity);
        (tx, Self::new(rx))
    }
}

impl MessageSource for ChannelSource {
    fn drain(&mut self) -> Vec<Message> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{CarParams, DriverMonitoringState};

    #[test]
    fn test_channel_source_drains_everything() {
        let (tx, mut source) = ChannelSource::channel(8);

        tx.try_send(Message::CarParams(CarParams::default())).unwrap();
        tx.try_send(Message::DriverMonitoringState(DriverMonitoringState {
            is_active_mode: true,
        }))
        .unwrap();

        let drained = source.drain();
        assert_eq!(drained.len(), 2);
        assert!(source.drain().is_empty());
    }

    #[test]
    fn test_channel_source_survives_closed_sender() {
        let (tx, mut source) = ChannelSource::channel(1);
        drop(tx);
        assert!(source.drain().is_empty());
    }
}
