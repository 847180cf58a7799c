//! Notification sink port.

use crate::error::Result;

pub use crate::format::{Message, RenderedTask, Segment};

/// Capability to deliver a composed digest to a channel.
pub trait NotificationSink {
    /// Post `message` to `channel` and return the delivery id assigned by the sink.
    fn post(&self, channel: &str, message: &Message) -> Result<String>;
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn post(&self, channel: &str, message: &Message) -> Result<String> {
        (**self).post(channel, message)
    }
}
