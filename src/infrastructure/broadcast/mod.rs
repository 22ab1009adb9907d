//! Status broadcaster adapters

mod channel;
mod log;

use std::sync::Arc;

pub use channel::{ChannelBroadcaster, CHANNEL_CAPACITY};
pub use log::LogBroadcaster;

use crate::application::ports::{BroadcastError, RecorderEvent, StatusBroadcaster};

/// Publishes to several broadcasters; one failing does not stop the rest
pub struct FanOutBroadcaster {
    targets: Vec<Arc<dyn StatusBroadcaster>>,
}

impl FanOutBroadcaster {
    pub fn new(targets: Vec<Arc<dyn StatusBroadcaster>>) -> Self {
        Self { targets }
    }
}

impl StatusBroadcaster for FanOutBroadcaster {
    /// Reports the first failure after every target has been tried
    fn publish(&self, event: RecorderEvent) -> Result<(), BroadcastError> {
        let mut first_error = None;
        for target in &self.targets {
            if let Err(e) = target.publish(event.clone()) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}
