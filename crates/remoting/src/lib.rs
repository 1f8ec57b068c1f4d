// Allow missing docs for internal items in development
#![allow(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

//! Remoting - typed interface proxies over an asynchronous message transport.
//!
//! A caller invokes a method on a local object implementing an interface
//! trait; the call is published as a request message, and the reply that
//! comes back on some other task is matched to the waiting caller by its
//! correlation id.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │                          REMOTING CLIENT                              │
//! ├──────────────────────────────────────────────────────────────────────┤
//! │  ┌───────────────────┐      ┌───────────────────┐                    │
//! │  │ Interface adapter │ ───► │   ServiceProxy    │  shape validation  │
//! │  │ (remote_proxy!)   │      │ args → request    │  routing key       │
//! │  └───────────────────┘      └─────────┬─────────┘                    │
//! │                                       │                              │
//! │                             ┌─────────┴─────────┐                    │
//! │                             │  RequestExecutor  │  register/publish  │
//! │                             └────┬─────────┬────┘                    │
//! │                                  │         │                         │
//! │            ┌─────────────────────┴──┐   ┌──┴──────────────────┐      │
//! │            │  PendingCallRegistry   │   │     Transport       │      │
//! │            │ (correlation id → call)│   │   (publish port)    │      │
//! │            └─────────────▲──────────┘   └──────────┬──────────┘      │
//! │                          │                         │                 │
//! │            ┌─────────────┴──────────┐              │                 │
//! │            │     ReplyListener      │              │                 │
//! │            └─────────────▲──────────┘              │                 │
//! └──────────────────────────┼─────────────────────────┼─────────────────┘
//!                            │ replies                 │ requests
//!                            └────────── remote handler ◄┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use remoting::{remote_proxy, RemotingClient, RemotingConfig, RemotingResult};
//!
//! #[async_trait::async_trait]
//! pub trait Inventory: Send + Sync {
//!     async fn in_stock(&self, sku: String) -> RemotingResult<bool>;
//! }
//!
//! remote_proxy! {
//!     pub struct InventoryProxy implements Inventory as "IInventory" {
//!         async fn in_stock(&self, sku: String) -> RemotingResult<bool> => "InStock";
//!     }
//! }
//!
//! let (client, endpoint) = RemotingClient::in_memory(RemotingConfig::from_env())?;
//! let inventory: InventoryProxy = client.create();
//! let available = inventory.in_stock("sku-1".into()).await?;
//! ```

pub mod adapters;
pub mod client;
pub mod domain;
pub mod ipc;
pub mod ports;
pub mod proxy;
pub mod telemetry;

// Re-exports
pub use adapters::{
    channel_transport, cleanup_task, ChannelReplies, ChannelTransport, JsonCodec, PendingCall,
    PendingCallRegistry, RegistryStats, RemoteEndpoint,
};
pub use client::{RemotingClient, RemotingClientBuilder};
pub use domain::{
    CorrelationId, FaultKind, InboundReply, MethodDescriptor, OutboundMessage, RemoteFault,
    RemoteInterface, RemoteMessage, RemoteRequest, RemotingConfig, RemotingError,
    RemotingResult, ReplyOutcome, ReturnShape, RoutingKey,
};
pub use ipc::{ReplyListener, RequestExecutor};
pub use ports::{Codec, ReplyReceiver, Transport, TransportError};
pub use proxy::{RemoteProxy, ResponseConverter, ServiceProxy};
pub use telemetry::{init_logging, TelemetryError};

#[doc(hidden)]
pub mod __private {
    pub use async_trait::async_trait;
}

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
