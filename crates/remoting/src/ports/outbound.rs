//! Outbound ports for the remoting client.

use crate::domain::message::OutboundMessage;
use async_trait::async_trait;

/// Transport errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("channel closed")]
    ChannelClosed,
    #[error("send failed: {0}")]
    SendFailed(String),
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
    #[error("no route for {0}")]
    Unroutable(String),
    #[error("transport unavailable: {0}")]
    Unavailable(String),
}

/// Publishes requests towards remote handlers.
///
/// The transport owns connections, topology and delivery guarantees. It must
/// deliver replies back through the pending call registry, either by feeding a
/// `ReplyReceiver` or by calling `PendingCallRegistry::dispatch` directly.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Hand one request to the transport.
    ///
    /// `Ok` means the transport accepted the message; an error means it will
    /// never be delivered and no reply will come.
    async fn publish(&self, message: OutboundMessage) -> Result<(), TransportError>;
}
