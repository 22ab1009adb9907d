//! Broadcast channel fan-out for socket subscribers

use tokio::sync::broadcast;

use crate::application::ports::{BroadcastError, RecorderEvent, StatusBroadcaster};

/// Events buffered per subscriber before it starts lagging
pub const CHANNEL_CAPACITY: usize = 64;

/// Delivers every event to all current subscribers.
///
/// A slow subscriber lags and loses the oldest events; it never blocks
/// the publisher.
#[derive(Clone)]
pub struct ChannelBroadcaster {
    sender: broadcast::Sender<RecorderEvent>,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Receive every event published from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RecorderEvent> {
        self.sender.subscribe()
    }

    pub fn observer_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusBroadcaster for ChannelBroadcaster {
    fn publish(&self, event: RecorderEvent) -> Result<(), BroadcastError> {
        self.sender
            .send(event)
            .map(|_| ())
            .map_err(|_| BroadcastError::NoObservers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn photo() -> RecorderEvent {
        RecorderEvent::PhotoCaptured {
            backend: "software".to_string(),
            file: PathBuf::from("/m/p.jpg"),
        }
    }

    #[test]
    fn no_observers_is_reported() {
        let broadcaster = ChannelBroadcaster::new();
        assert!(matches!(
            broadcaster.publish(photo()),
            Err(BroadcastError::NoObservers)
        ));
    }

    #[tokio::test]
    async fn every_subscriber_sees_events() {
        let broadcaster = ChannelBroadcaster::new();
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();
        assert_eq!(broadcaster.observer_count(), 2);

        broadcaster.publish(photo()).unwrap();
        assert_eq!(a.recv().await.unwrap(), photo());
        assert_eq!(b.recv().await.unwrap(), photo());
    }

    #[tokio::test]
    async fn slow_subscriber_lags() {
        let broadcaster = ChannelBroadcaster::with_capacity(2);
        let mut rx = broadcaster.subscribe();
        for _ in 0..5 {
            broadcaster.publish(photo()).unwrap();
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(_))
        ));
        assert!(rx.recv().await.is_ok());
    }
}
