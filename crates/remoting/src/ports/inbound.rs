//! Inbound ports for the remoting client.

use crate::domain::message::InboundReply;
use crate::ports::outbound::TransportError;
use async_trait::async_trait;

/// Source of replies from remote handlers.
#[async_trait]
pub trait ReplyReceiver: Send + Sync {
    /// Receive the next reply (waits until one is available).
    ///
    /// `Err(TransportError::ChannelClosed)` means no more replies will come.
    async fn receive(&self) -> Result<InboundReply, TransportError>;
}
