//! In-memory transport over tokio mpsc channels.
//!
//! Used for in-process wiring and tests. The client side gets a `Transport`
//! and a `ReplyReceiver`; the remote side gets a `RemoteEndpoint` that reads
//! requests and writes replies.

use crate::domain::message::{InboundReply, OutboundMessage, ReplyOutcome};
use crate::domain::request::RemoteRequest;
use crate::ports::inbound::ReplyReceiver;
use crate::ports::outbound::{Transport, TransportError};
use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, warn};

/// Client-side sender of requests
pub struct ChannelTransport {
    requests: mpsc::Sender<OutboundMessage>,
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn publish(&self, message: OutboundMessage) -> Result<(), TransportError> {
        self.requests
            .send(message)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }
}

/// Client-side receiver of replies
pub struct ChannelReplies {
    replies: Mutex<mpsc::Receiver<InboundReply>>,
}

#[async_trait]
impl ReplyReceiver for ChannelReplies {
    async fn receive(&self) -> Result<InboundReply, TransportError> {
        let mut guard = self.replies.lock().await;
        guard.recv().await.ok_or(TransportError::ChannelClosed)
    }
}

/// Remote side of an in-memory transport.
pub struct RemoteEndpoint {
    requests: mpsc::Receiver<OutboundMessage>,
    replies: mpsc::Sender<InboundReply>,
}

impl RemoteEndpoint {
    /// Next published request, or `None` once every client sender is gone.
    pub async fn next_request(&mut self) -> Option<OutboundMessage> {
        self.requests.recv().await
    }

    /// Send a reply back to the client.
    pub async fn reply(&self, reply: InboundReply) -> Result<(), TransportError> {
        self.replies
            .send(reply)
            .await
            .map_err(|_| TransportError::ChannelClosed)
    }

    /// Another handle for sending replies, e.g. from a spawned handler.
    pub fn reply_sender(&self) -> mpsc::Sender<InboundReply> {
        self.replies.clone()
    }

    /// Answer every request with `handler` until either side hangs up.
    ///
    /// Requests whose body does not decode are dropped with a warning.
    pub async fn serve<F>(mut self, mut handler: F)
    where
        F: FnMut(&OutboundMessage, RemoteRequest) -> ReplyOutcome + Send,
    {
        while let Some(message) = self.next_request().await {
            let request: RemoteRequest = match serde_json::from_str(&message.body) {
                Ok(request) => request,
                Err(e) => {
                    warn!(
                        correlation_id = %message.correlation_id,
                        routing_key = %message.routing_key,
                        error = %e,
                        "Dropping undecodable request"
                    );
                    continue;
                }
            };

            let outcome = handler(&message, request);
            let reply = InboundReply {
                correlation_id: message.correlation_id,
                outcome,
            };
            if self.reply(reply).await.is_err() {
                debug!("Reply channel closed, stopping endpoint");
                break;
            }
        }
    }
}

/// Create a connected in-memory transport.
pub fn channel_transport(buffer: usize) -> (ChannelTransport, ChannelReplies, RemoteEndpoint) {
    let (req_tx, req_rx) = mpsc::channel(buffer);
    let (resp_tx, resp_rx) = mpsc::channel(buffer);

    (
        ChannelTransport { requests: req_tx },
        ChannelReplies {
            replies: Mutex::new(resp_rx),
        },
        RemoteEndpoint {
            requests: req_rx,
            replies: resp_tx,
        },
    )
}
