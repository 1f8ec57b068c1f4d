//! Service proxy: the shared invoke primitive behind every interface adapter.

use crate::domain::error::{RemotingError, RemotingResult};
use crate::domain::method::{MethodDescriptor, RemoteInterface, ReturnShape, RoutingKey};
use crate::domain::request::RemoteRequest;
use crate::ipc::executor::RequestExecutor;
use crate::ports::codec::Codec;
use crate::proxy::converter::ResponseConverter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::any::TypeId;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Remote invocation for the methods of interface `I`.
///
/// Interface adapters (see `remote_proxy!`) hold one of these and implement
/// each trait method by encoding its arguments and calling `invoke`.
pub struct ServiceProxy<I: RemoteInterface + ?Sized> {
    executor: Arc<RequestExecutor>,
    codec: Arc<dyn Codec>,
    converter: ResponseConverter,
    _interface: PhantomData<fn(&I)>,
}

impl<I: RemoteInterface + ?Sized> ServiceProxy<I> {
    pub fn new(executor: Arc<RequestExecutor>, codec: Arc<dyn Codec>) -> Self {
        Self {
            executor,
            converter: ResponseConverter::new(Arc::clone(&codec)),
            codec,
            _interface: PhantomData,
        }
    }

    /// Interface name, the first routing key segment
    pub fn interface_name(&self) -> &'static str {
        I::NAME
    }

    /// Routing key for a method of this interface
    pub fn routing_key(&self, method: &MethodDescriptor) -> RoutingKey {
        RoutingKey::for_method::<I>(method)
    }

    /// Serialize one argument with the proxy's codec.
    pub fn encode_argument<T: Serialize + ?Sized>(&self, value: &T) -> RemotingResult<String> {
        let value =
            serde_json::to_value(value).map_err(|e| RemotingError::Serialization(e.to_string()))?;
        self.codec
            .encode(&value)
            .map_err(|e| RemotingError::Serialization(e.to_string()))
    }

    /// Reject methods that are not asynchronous with a typed result.
    pub fn validate(&self, method: &MethodDescriptor) -> RemotingResult<()> {
        if method.shape.is_supported() {
            return Ok(());
        }

        warn!(
            interface = I::NAME,
            method = method.name,
            shape = %method.shape,
            "Rejected call to method with unsupported shape"
        );
        Err(RemotingError::UnsupportedMethodShape {
            method: method.name.to_string(),
            shape: method.shape,
        })
    }

    /// Shape `method` actually has when its result type is `R`.
    ///
    /// A method declared as returning a value but typed `()` carries no
    /// result, so it is fire and forget.
    pub fn declared_shape<R: 'static>(method: &MethodDescriptor) -> MethodDescriptor {
        if method.shape == ReturnShape::AsyncValue && TypeId::of::<R>() == TypeId::of::<()>() {
            MethodDescriptor::async_unit(method.name)
        } else {
            *method
        }
    }

    /// Call `method` remotely and convert the reply into `R`.
    pub async fn invoke<R: DeserializeOwned + 'static>(
        &self,
        method: &MethodDescriptor,
        args: Vec<String>,
    ) -> RemotingResult<R> {
        self.invoke_with_timeout(method, args, self.executor.default_timeout())
            .await
    }

    /// Call `method` remotely with an explicit deadline.
    pub async fn invoke_with_timeout<R: DeserializeOwned + 'static>(
        &self,
        method: &MethodDescriptor,
        args: Vec<String>,
        timeout: Option<Duration>,
    ) -> RemotingResult<R> {
        self.validate(&Self::declared_shape::<R>(method))?;

        let request = RemoteRequest::new(method.name, args);
        let routing_key = self.routing_key(method);
        debug!(
            routing_key = %routing_key,
            args = request.args().len(),
            "Invoking remote method"
        );

        let payload = self
            .executor
            .execute_with_timeout(&request, &routing_key, timeout)
            .await?;
        self.converter.convert(&payload)
    }

    /// Entry point for methods declared synchronous.
    ///
    /// Remote calls are never made on the caller's thread, so this always
    /// fails with `UnsupportedMethodShape` and publishes nothing.
    pub fn invoke_sync<R>(&self, method: &MethodDescriptor) -> RemotingResult<R> {
        self.validate(method)?;
        // Declared asynchronous but reached through a synchronous signature
        warn!(
            interface = I::NAME,
            method = method.name,
            "Rejected synchronous call to asynchronous method"
        );
        Err(RemotingError::UnsupportedMethodShape {
            method: method.name.to_string(),
            shape: ReturnShape::Sync,
        })
    }
}

impl<I: RemoteInterface + ?Sized> Clone for ServiceProxy<I> {
    fn clone(&self) -> Self {
        Self {
            executor: Arc::clone(&self.executor),
            codec: Arc::clone(&self.codec),
            converter: self.converter.clone(),
            _interface: PhantomData,
        }
    }
}

/// An adapter implementing an interface on top of a `ServiceProxy`.
pub trait RemoteProxy: Sized {
    /// Interface the adapter implements
    type Interface: RemoteInterface + ?Sized;

    fn from_service_proxy(proxy: ServiceProxy<Self::Interface>) -> Self;
}
