//! Proxy invocation engine.
//!
//! `ServiceProxy<I>` turns a method call on interface `I` into a remote
//! request and the reply into the method's declared result. Interface
//! adapters are generated with `remote_proxy!` or written by hand.

pub mod converter;
pub mod macros;
pub mod service_proxy;

pub use converter::ResponseConverter;
pub use service_proxy::{RemoteProxy, ServiceProxy};
