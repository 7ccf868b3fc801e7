//! Out-of-process forwarding of occurrence records.
//!
//! The engine forwards each occurrence to an optional message channel for
//! external inspection. Forwarding is best-effort by contract: the engine
//! logs a failed send at debug level and moves on, so a missing or dead
//! channel can never disturb correlation state.

use hurum_inspector_protocol::ChannelMessage;

use crate::error::ChannelError;

/// A destination for forwarded occurrence messages.
pub trait MessageChannel: Send {
    fn send(&self, message: ChannelMessage) -> Result<(), ChannelError>;
}

/// Standard-library mpsc senders work directly as channels; a dropped
/// receiver surfaces as `ChannelError::Closed`.
impl MessageChannel for std::sync::mpsc::Sender<ChannelMessage> {
    fn send(&self, message: ChannelMessage) -> Result<(), ChannelError> {
        std::sync::mpsc::Sender::send(self, message).map_err(|_| ChannelError::Closed)
    }
}
