//! Remoting client: composition root for proxies.
//!
//! Owns the pending call registry and the request executor, runs the reply
//! listener and the expiry sweep, and hands out proxies that share them.

use crate::adapters::channel::{channel_transport, RemoteEndpoint};
use crate::adapters::codec::JsonCodec;
use crate::adapters::pending::{cleanup_task, saturating_millis, PendingCallRegistry};
use crate::domain::config::RemotingConfig;
use crate::domain::error::{RemotingError, RemotingResult};
use crate::domain::method::RemoteInterface;
use crate::ipc::executor::RequestExecutor;
use crate::ipc::listener::ReplyListener;
use crate::ports::codec::Codec;
use crate::ports::inbound::ReplyReceiver;
use crate::ports::outbound::Transport;
use crate::proxy::service_proxy::{RemoteProxy, ServiceProxy};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Builder for `RemotingClient`
#[derive(Default)]
pub struct RemotingClientBuilder {
    config: RemotingConfig,
    transport: Option<Arc<dyn Transport>>,
    replies: Option<Arc<dyn ReplyReceiver>>,
    codec: Option<Arc<dyn Codec>>,
}

impl RemotingClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(mut self, config: RemotingConfig) -> Self {
        self.config = config;
        self
    }

    /// Transport requests are published on (required)
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Source of replies.
    ///
    /// Optional: a transport may instead push replies straight into
    /// `RemotingClient::registry()`.
    pub fn with_replies(mut self, replies: impl ReplyReceiver + 'static) -> Self {
        self.replies = Some(Arc::new(replies));
        self
    }

    /// Codec for arguments and results (default: JSON)
    pub fn with_codec(mut self, codec: impl Codec + 'static) -> Self {
        self.codec = Some(Arc::new(codec));
        self
    }

    /// Build the client and start its background tasks.
    ///
    /// Must be called from within a tokio runtime.
    pub fn build(self) -> RemotingResult<RemotingClient> {
        self.config
            .validate()
            .map_err(|e| RemotingError::Config(e.to_string()))?;

        let transport = self
            .transport
            .ok_or_else(|| RemotingError::Config("no transport configured".to_string()))?;
        let runtime = Handle::try_current()
            .map_err(|e| RemotingError::Config(format!("no tokio runtime: {}", e)))?;

        let registry = Arc::new(PendingCallRegistry::new());
        let executor = Arc::new(RequestExecutor::new(
            Arc::clone(&registry),
            transport,
            self.config.default_timeout,
        ));

        let mut tasks = Vec::with_capacity(2);
        if let Some(replies) = self.replies {
            let listener = ReplyListener::new(Arc::clone(&registry), replies);
            tasks.push(runtime.spawn(listener.run()));
        }
        tasks.push(runtime.spawn(cleanup_task(
            Arc::clone(&registry),
            self.config.cleanup_interval,
        )));

        info!(
            service = %self.config.service_name,
            default_timeout_ms = self.config.default_timeout.map(saturating_millis),
            "Remoting client started"
        );

        Ok(RemotingClient {
            config: self.config,
            registry,
            executor,
            codec: self.codec.unwrap_or_else(|| Arc::new(JsonCodec)),
            tasks: Mutex::new(tasks),
        })
    }
}

/// Remoting client.
///
/// Proxies created by a client keep working after it is dropped only until
/// their outstanding calls are failed; keep the client alive while in use.
pub struct RemotingClient {
    config: RemotingConfig,
    registry: Arc<PendingCallRegistry>,
    executor: Arc<RequestExecutor>,
    codec: Arc<dyn Codec>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl RemotingClient {
    pub fn builder() -> RemotingClientBuilder {
        RemotingClientBuilder::new()
    }

    /// Client wired to an in-memory transport, plus the remote end of it.
    pub fn in_memory(config: RemotingConfig) -> RemotingResult<(Self, RemoteEndpoint)> {
        let (transport, replies, endpoint) = channel_transport(config.reply_buffer.max(1));
        let client = Self::builder()
            .with_config(config)
            .with_transport(transport)
            .with_replies(replies)
            .build()?;
        Ok((client, endpoint))
    }

    /// Proxy for interface `I`
    pub fn proxy<I: RemoteInterface + ?Sized>(&self) -> ServiceProxy<I> {
        ServiceProxy::new(Arc::clone(&self.executor), Arc::clone(&self.codec))
    }

    /// Interface adapter `P` backed by this client
    pub fn create<P: RemoteProxy>(&self) -> P {
        P::from_service_proxy(self.proxy::<P::Interface>())
    }

    pub fn config(&self) -> &RemotingConfig {
        &self.config
    }

    /// Registry for transports that deliver replies directly
    pub fn registry(&self) -> &Arc<PendingCallRegistry> {
        &self.registry
    }

    pub fn pending_count(&self) -> usize {
        self.registry.pending_count()
    }

    /// Stop background tasks and fail every outstanding call with `Cancelled`.
    pub fn shutdown(&self) {
        let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
        if tasks.is_empty() {
            return;
        }
        for task in tasks {
            task.abort();
        }

        let cancelled = self.registry.fail_all(RemotingError::Cancelled);
        if cancelled > 0 {
            warn!(
                service = %self.config.service_name,
                cancelled = cancelled,
                "Cancelled outstanding calls on shutdown"
            );
        }
        info!(service = %self.config.service_name, "Remoting client stopped");
    }
}

impl Drop for RemotingClient {
    fn drop(&mut self) {
        self.shutdown();
    }
}
