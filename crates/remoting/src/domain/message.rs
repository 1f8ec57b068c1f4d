//! Transport envelopes for outbound requests and inbound replies.

use crate::domain::correlation::CorrelationId;
use crate::domain::error::RemoteFault;
use crate::domain::method::RoutingKey;
use serde::{Deserialize, Serialize};

/// Outbound request as handed to the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Id the reply must carry back
    pub correlation_id: CorrelationId,
    /// Address of the remote handler
    pub routing_key: RoutingKey,
    /// Serialized `RemoteRequest`
    pub body: String,
}

/// Terminal outcome carried by a reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplyOutcome {
    /// Encoded result payload
    Success(String),
    /// Fault raised on the remote side
    Fault(RemoteFault),
}

/// Reply delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundReply {
    pub correlation_id: CorrelationId,
    pub outcome: ReplyOutcome,
}

impl InboundReply {
    pub fn success(correlation_id: CorrelationId, payload: impl Into<String>) -> Self {
        Self {
            correlation_id,
            outcome: ReplyOutcome::Success(payload.into()),
        }
    }

    pub fn fault(correlation_id: CorrelationId, fault: RemoteFault) -> Self {
        Self {
            correlation_id,
            outcome: ReplyOutcome::Fault(fault),
        }
    }
}

/// Minimal capability of a reply: who it is for, and either a payload or a
/// fault.
///
/// Transports with their own message types implement this instead of
/// converting to `InboundReply`.
pub trait RemoteMessage {
    /// Correlation id of the call this message answers
    fn correlation_id(&self) -> CorrelationId;

    /// Consume the message into its payload or fault
    fn into_outcome(self) -> Result<String, RemoteFault>;
}

impl RemoteMessage for InboundReply {
    fn correlation_id(&self) -> CorrelationId {
        self.correlation_id
    }

    fn into_outcome(self) -> Result<String, RemoteFault> {
        match self.outcome {
            ReplyOutcome::Success(payload) => Ok(payload),
            ReplyOutcome::Fault(fault) => Err(fault),
        }
    }
}
