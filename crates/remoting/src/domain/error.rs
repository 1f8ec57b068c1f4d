//! Remoting error types.
//!
//! Every failure of a proxied call surfaces to the caller as a `RemotingError`
//! through the method's own `Result`, the same channel a local implementation
//! of the interface would use.

use crate::domain::correlation::CorrelationId;
use crate::domain::method::ReturnShape;
use crate::ports::outbound::TransportError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Kind of a fault raised by the remote handler.
///
/// Callers pattern-match on this to react to specific remote failures, so it
/// must survive the trip through the transport untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// A required argument was null or missing
    ArgumentNull,
    /// An argument was present but invalid
    Argument,
    /// The operation is not valid in the handler's current state
    InvalidOperation,
    /// The addressed entity does not exist
    NotFound,
    /// The caller is not allowed to perform the operation
    Unauthorized,
    /// The handler gave up waiting on something downstream
    Timeout,
    /// Unclassified handler failure
    Internal,
    /// Wrapper added by the transport or the remote dispatcher around the
    /// handler's own fault. Unwrapped before the caller sees it.
    Invocation,
    /// Application-defined kind
    Other(String),
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ArgumentNull => write!(f, "argument_null"),
            Self::Argument => write!(f, "argument"),
            Self::InvalidOperation => write!(f, "invalid_operation"),
            Self::NotFound => write!(f, "not_found"),
            Self::Unauthorized => write!(f, "unauthorized"),
            Self::Timeout => write!(f, "timeout"),
            Self::Internal => write!(f, "internal"),
            Self::Invocation => write!(f, "invocation"),
            Self::Other(kind) => write!(f, "{}", kind),
        }
    }
}

/// Fault description carried by a failed reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFault {
    /// Fault kind
    pub kind: FaultKind,
    /// Human-readable message from the handler
    pub message: String,
    /// Fault this one wraps, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inner: Option<Box<RemoteFault>>,
}

impl RemoteFault {
    /// Create a fault with no inner cause
    pub fn new(kind: FaultKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            inner: None,
        }
    }

    /// "Argument null" fault
    pub fn argument_null(message: impl Into<String>) -> Self {
        Self::new(FaultKind::ArgumentNull, message)
    }

    /// Unclassified handler fault
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(FaultKind::Internal, message)
    }

    /// Wrap this fault in an invocation layer, the way a remote dispatcher
    /// reports a handler that threw.
    pub fn wrapped(self, message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Invocation,
            message: message.into(),
            inner: Some(Box::new(self)),
        }
    }

    /// Strip invocation layers and return the handler's original fault.
    ///
    /// An invocation layer without an inner fault is itself the root.
    pub fn into_root_cause(self) -> Self {
        let mut fault = self;
        loop {
            match fault {
                Self {
                    kind: FaultKind::Invocation,
                    inner: Some(inner),
                    ..
                } => fault = *inner,
                root => return root,
            }
        }
    }
}

impl fmt::Display for RemoteFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for RemoteFault {}

/// Codec failures at the serialization boundary.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("encode failed: {0}")]
    Encode(String),
    #[error("decode failed: {0}")]
    Decode(String),
}

/// Errors surfaced by proxied calls and the correlation engine.
#[derive(Debug, Clone, thiserror::Error)]
pub enum RemotingError {
    /// Method is not an asynchronous call with a typed result. Raised before
    /// anything is published.
    #[error("method {method} has unsupported shape '{shape}': only asynchronous methods returning a value can be proxied")]
    UnsupportedMethodShape { method: String, shape: ReturnShape },

    /// Transport refused the outbound message
    #[error("publish failed for call {correlation_id}: {source}")]
    PublishFailure {
        correlation_id: CorrelationId,
        source: TransportError,
    },

    /// Remote handler raised a fault
    #[error("remote fault: {0}")]
    Remote(RemoteFault),

    /// Reply arrived for an id that is unknown, expired or already completed
    #[error("reply for unknown or already completed call {0}")]
    UnmatchedReply(CorrelationId),

    /// A pending call was resolved twice
    #[error("pending call {0} completed more than once")]
    DoubleCompletion(CorrelationId),

    /// A correlation id was registered while still outstanding
    #[error("correlation id {0} is already registered")]
    DuplicateCorrelationId(CorrelationId),

    /// Payload does not match the declared result type
    #[error("cannot convert response to {target}: {reason}")]
    Conversion { target: &'static str, reason: String },

    /// An argument could not be serialized
    #[error("argument serialization failed: {0}")]
    Serialization(String),

    /// No reply within the call's deadline
    #[error("call {correlation_id} timed out after {}ms", .after.as_millis())]
    Timeout {
        correlation_id: CorrelationId,
        after: Duration,
    },

    /// The call was abandoned locally
    #[error("call {0} was cancelled")]
    Cancelled(CorrelationId),

    /// The reply path shut down before the call completed
    #[error("reply channel closed before the call completed")]
    ChannelClosed,

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),
}

impl RemotingError {
    /// The remote fault, if this error came from the remote handler.
    pub fn remote_fault(&self) -> Option<&RemoteFault> {
        match self {
            Self::Remote(fault) => Some(fault),
            _ => None,
        }
    }

    /// Whether the error was raised locally, without the remote handler
    /// having seen the call.
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedMethodShape { .. }
                | Self::Serialization(_)
                | Self::PublishFailure { .. }
                | Self::DuplicateCorrelationId(_)
                | Self::Config(_)
        )
    }
}

/// Result type for remoting operations
pub type RemotingResult<T> = Result<T, RemotingError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_root_cause_strips_invocation_layers() {
        let fault = RemoteFault::argument_null("someerror")
            .wrapped("handler threw")
            .wrapped("dispatch failed");

        let root = fault.into_root_cause();
        assert_eq!(root.kind, FaultKind::ArgumentNull);
        assert_eq!(root.message, "someerror");
        assert!(root.inner.is_none());
    }

    #[test]
    fn test_root_cause_keeps_unwrapped_fault() {
        let fault = RemoteFault::internal("boom");
        assert_eq!(fault.clone().into_root_cause(), fault);

        let bare = RemoteFault::new(FaultKind::Invocation, "no inner");
        assert_eq!(bare.clone().into_root_cause(), bare);
    }

    #[test]
    fn test_non_invocation_inner_is_not_unwrapped() {
        let fault = RemoteFault {
            kind: FaultKind::NotFound,
            message: "account".into(),
            inner: Some(Box::new(RemoteFault::internal("db"))),
        };
        assert_eq!(fault.clone().into_root_cause().kind, FaultKind::NotFound);
    }

    #[test]
    fn test_fault_serialization() {
        let fault = RemoteFault::argument_null("someerror").wrapped("outer");
        let json = serde_json::to_value(&fault).unwrap();
        assert_eq!(json["kind"], "invocation");
        assert_eq!(json["inner"]["kind"], "argument_null");

        let custom = RemoteFault::new(FaultKind::Other("quota".into()), "over limit");
        let json = serde_json::to_string(&custom).unwrap();
        let parsed: RemoteFault = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, custom);
        assert_eq!(parsed.to_string(), "quota: over limit");
    }

    #[test]
    fn test_error_classification() {
        let shape = RemotingError::UnsupportedMethodShape {
            method: "VoidMethod".into(),
            shape: ReturnShape::Sync,
        };
        assert!(shape.is_local());
        assert!(shape.remote_fault().is_none());
        assert!(shape.to_string().contains("VoidMethod"));

        let remote = RemotingError::Remote(RemoteFault::internal("x"));
        assert!(!remote.is_local());
        assert_eq!(remote.remote_fault().unwrap().kind, FaultKind::Internal);
    }

    #[test]
    fn test_timeout_message() {
        let err = RemotingError::Timeout {
            correlation_id: CorrelationId::new(),
            after: Duration::from_millis(250),
        };
        assert!(err.to_string().ends_with("timed out after 250ms"));
    }
}
