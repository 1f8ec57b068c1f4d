//! Ports: the seams to collaborators outside the correlation engine.

pub mod codec;
pub mod inbound;
pub mod outbound;

pub use codec::Codec;
pub use inbound::ReplyReceiver;
pub use outbound::{Transport, TransportError};
