//! Domain types for the remoting client.
//!
//! Identifiers, envelopes, method metadata, configuration and errors.
//! Async infrastructure (pending calls, channels) lives in the adapters layer.

pub mod config;
pub mod correlation;
pub mod error;
pub mod message;
pub mod method;
pub mod request;

// Re-exports for convenience
pub use config::{ConfigError, RemotingConfig};
pub use correlation::CorrelationId;
pub use error::{CodecError, FaultKind, RemoteFault, RemotingError, RemotingResult};
pub use message::{InboundReply, OutboundMessage, RemoteMessage, ReplyOutcome};
pub use method::{MethodDescriptor, RemoteInterface, ReturnShape, RoutingKey};
pub use request::RemoteRequest;
