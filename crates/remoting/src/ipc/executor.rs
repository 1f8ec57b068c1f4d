//! Request executor: register, publish, await.

use crate::adapters::pending::{PendingCall, PendingCallRegistry};
use crate::domain::correlation::CorrelationId;
use crate::domain::error::{RemotingError, RemotingResult};
use crate::domain::message::OutboundMessage;
use crate::domain::method::RoutingKey;
use crate::domain::request::RemoteRequest;
use crate::ports::outbound::Transport;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sends requests through the transport and waits for the correlated reply.
///
/// One executor is shared by every proxy of a client; the registry it holds
/// is the only shared mutable state.
pub struct RequestExecutor {
    /// Pending call registry for correlation
    registry: Arc<PendingCallRegistry>,
    /// Outbound transport
    transport: Arc<dyn Transport>,
    /// Deadline for calls that do not set their own
    default_timeout: Option<Duration>,
}

impl RequestExecutor {
    pub fn new(
        registry: Arc<PendingCallRegistry>,
        transport: Arc<dyn Transport>,
        default_timeout: Option<Duration>,
    ) -> Self {
        Self {
            registry,
            transport,
            default_timeout,
        }
    }

    pub fn registry(&self) -> &Arc<PendingCallRegistry> {
        &self.registry
    }

    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    /// Execute a request with the default timeout and return the raw payload.
    pub async fn execute(
        &self,
        request: &RemoteRequest,
        routing_key: &RoutingKey,
    ) -> RemotingResult<String> {
        self.execute_with_timeout(request, routing_key, self.default_timeout)
            .await
    }

    /// Execute a request and return the raw success payload.
    ///
    /// Remote faults come back with transport wrapping removed, so the caller
    /// sees the handler's own fault kind. If the future is dropped before the
    /// reply arrives, the registration is removed and the late reply is
    /// dropped by the registry.
    pub async fn execute_with_timeout(
        &self,
        request: &RemoteRequest,
        routing_key: &RoutingKey,
        timeout: Option<Duration>,
    ) -> RemotingResult<String> {
        let body = serde_json::to_string(request)
            .map_err(|e| RemotingError::Serialization(e.to_string()))?;

        let (call, mut reply) = PendingCall::new(routing_key.as_str(), timeout);
        let correlation_id = call.correlation_id();
        self.registry.register(&call)?;
        let _registration = Registration {
            registry: &self.registry,
            correlation_id,
        };

        let message = OutboundMessage {
            correlation_id,
            routing_key: routing_key.clone(),
            body,
        };

        if let Err(source) = self.transport.publish(message).await {
            warn!(
                correlation_id = %correlation_id,
                routing_key = %routing_key,
                error = %source,
                "Publishing remote request failed"
            );
            // No reply will ever come for this id
            let error = RemotingError::PublishFailure {
                correlation_id,
                source,
            };
            let _ = self.registry.fault(correlation_id, error.clone());
            return Err(error);
        }

        debug!(
            correlation_id = %correlation_id,
            routing_key = %routing_key,
            method = request.method(),
            "Published remote request"
        );

        let outcome = match timeout {
            None => reply.await,
            Some(after) => match tokio::time::timeout(after, &mut reply).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let error = RemotingError::Timeout {
                        correlation_id,
                        after,
                    };
                    // A reply that got in first still wins
                    if self.registry.fault(correlation_id, error.clone()).is_err()
                        && !call.is_completed()
                    {
                        let _ = call.set_exception(error);
                    }
                    reply.await
                }
            },
        };

        match outcome {
            Ok(payload) => Ok(payload),
            Err(RemotingError::Remote(fault)) => {
                let fault = fault.into_root_cause();
                debug!(
                    correlation_id = %correlation_id,
                    routing_key = %routing_key,
                    fault = %fault,
                    "Remote call faulted"
                );
                Err(RemotingError::Remote(fault))
            }
            Err(e) => {
                warn!(
                    correlation_id = %correlation_id,
                    routing_key = %routing_key,
                    error = %e,
                    "Remote call failed"
                );
                Err(e)
            }
        }
    }

    /// Get pending call count
    pub fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }
}

/// Removes the registry entry when the call ends, however it ends.
struct Registration<'a> {
    registry: &'a PendingCallRegistry,
    correlation_id: CorrelationId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        if self.registry.remove(&self.correlation_id) {
            debug!(
                correlation_id = %self.correlation_id,
                "Pending call abandoned before completion"
            );
        }
    }
}
