//! Reply listener that feeds transport replies into the registry.

use crate::adapters::pending::PendingCallRegistry;
use crate::domain::error::RemotingError;
use crate::domain::message::InboundReply;
use crate::ports::inbound::ReplyReceiver;
use crate::ports::outbound::TransportError;
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Drains a `ReplyReceiver` into the pending call registry.
pub struct ReplyListener {
    registry: Arc<PendingCallRegistry>,
    receiver: Arc<dyn ReplyReceiver>,
}

impl ReplyListener {
    pub fn new(registry: Arc<PendingCallRegistry>, receiver: Arc<dyn ReplyReceiver>) -> Self {
        Self { registry, receiver }
    }

    /// Run the listener loop.
    ///
    /// When the receiver closes, every call still outstanding is failed with
    /// `ChannelClosed`, since its reply can no longer arrive.
    pub async fn run(self) {
        loop {
            match self.receiver.receive().await {
                Ok(reply) => self.handle_reply(reply),
                Err(TransportError::ChannelClosed) => {
                    warn!("Reply channel closed, stopping listener");
                    break;
                }
                Err(e) => {
                    error!(error = %e, "Error receiving reply");
                }
            }
        }

        let failed = self.registry.fail_all(|_| RemotingError::ChannelClosed);
        if failed > 0 {
            warn!(failed = failed, "Failed outstanding calls after reply channel closed");
        }
    }

    fn handle_reply(&self, reply: InboundReply) {
        let correlation_id = reply.correlation_id;
        if let Err(e) = self.registry.dispatch(reply) {
            // Late, duplicate or unknown; the registry already logged it
            debug!(correlation_id = %correlation_id, error = %e, "Dropped reply");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::channel::channel_transport;
    use crate::adapters::pending::PendingCall;
    use crate::domain::correlation::CorrelationId;
    use std::time::Duration;

    #[tokio::test]
    async fn test_listener_fulfills_pending_call() {
        let (_transport, replies, endpoint) = channel_transport(8);
        let registry = Arc::new(PendingCallRegistry::new());
        tokio::spawn(ReplyListener::new(Arc::clone(&registry), Arc::new(replies)).run());

        let (call, reply) = PendingCall::new("ITest.Method", None);
        registry.register(&call).unwrap();

        // Unknown id first; must not disturb the real call
        endpoint
            .reply(InboundReply::success(CorrelationId::new(), "false"))
            .await
            .unwrap();
        endpoint
            .reply(InboundReply::success(call.correlation_id(), "true"))
            .await
            .unwrap();

        let payload = tokio::time::timeout(Duration::from_secs(1), reply)
            .await
            .expect("reply within timeout")
            .unwrap();
        assert_eq!(payload, "true");
    }

    #[tokio::test]
    async fn test_listener_fails_outstanding_on_close() {
        let (_transport, replies, endpoint) = channel_transport(8);
        let registry = Arc::new(PendingCallRegistry::new());

        let (call, reply) = PendingCall::new("ITest.Method", None);
        registry.register(&call).unwrap();

        let listener = tokio::spawn(ReplyListener::new(Arc::clone(&registry), Arc::new(replies)).run());
        drop(endpoint);
        listener.await.unwrap();

        assert!(matches!(reply.await, Err(RemotingError::ChannelClosed)));
        assert_eq!(registry.pending_count(), 0);
    }
}
