//! Request execution and reply handling.

pub mod executor;
pub mod listener;

pub use executor::RequestExecutor;
pub use listener::ReplyListener;
