//! `remote_proxy!`: generates an interface adapter over `ServiceProxy`.

/// Implement an `#[async_trait]` interface by forwarding every method to a
/// remote handler.
///
/// Each method must be asynchronous and return `RemotingResult<T>`. The
/// literal after `=>` is the remote method name used in the routing key.
/// Methods returning `RemotingResult<()>` are fire and forget: calling them
/// fails with `UnsupportedMethodShape` and publishes nothing. Interfaces with
/// synchronous methods need a hand-written adapter that rejects them through
/// `ServiceProxy::invoke_sync`.
///
/// ```ignore
/// #[async_trait]
/// pub trait Calculator: Send + Sync {
///     async fn add(&self, a: i64, b: i64) -> RemotingResult<i64>;
/// }
///
/// remote_proxy! {
///     pub struct CalculatorProxy implements Calculator as "ICalculator" {
///         async fn add(&self, a: i64, b: i64) -> RemotingResult<i64> => "Add";
///     }
/// }
/// ```
#[macro_export]
macro_rules! remote_proxy {
    (
        $(#[$meta:meta])*
        $vis:vis struct $proxy:ident implements $iface:ident as $name:literal {
            $(
                async fn $method:ident(&self $(, $arg:ident : $ty:ty)*) -> $ret:ty => $remote:literal;
            )*
        }
    ) => {
        impl $crate::RemoteInterface for dyn $iface {
            const NAME: &'static str = $name;
        }

        $(#[$meta])*
        #[derive(Clone)]
        $vis struct $proxy {
            inner: $crate::ServiceProxy<dyn $iface>,
        }

        impl $proxy {
            pub fn new(inner: $crate::ServiceProxy<dyn $iface>) -> Self {
                Self { inner }
            }

            pub fn service_proxy(&self) -> &$crate::ServiceProxy<dyn $iface> {
                &self.inner
            }
        }

        impl $crate::RemoteProxy for $proxy {
            type Interface = dyn $iface;

            fn from_service_proxy(proxy: $crate::ServiceProxy<dyn $iface>) -> Self {
                Self::new(proxy)
            }
        }

        #[$crate::__private::async_trait]
        impl $iface for $proxy {
            $(
                async fn $method(&self $(, $arg: $ty)*) -> $ret {
                    const METHOD: $crate::MethodDescriptor =
                        $crate::MethodDescriptor::returning($remote);
                    let args: ::std::vec::Vec<::std::string::String> =
                        ::std::vec![$(self.inner.encode_argument(&$arg)?),*];
                    self.inner.invoke(&METHOD, args).await
                }
            )*
        }
    };
}
