//! Adapters for the remoting client.
//!
//! Infrastructure implementations for pending call tracking, codecs and
//! in-memory transports.

pub mod channel;
pub mod codec;
pub mod pending;

pub use channel::{channel_transport, ChannelReplies, ChannelTransport, RemoteEndpoint};
pub use codec::JsonCodec;
pub use pending::{cleanup_task, PendingCall, PendingCallRegistry, PendingReply, RegistryStats};
