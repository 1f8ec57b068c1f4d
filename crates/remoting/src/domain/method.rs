//! Interface and method metadata used by proxies.
//!
//! Rust has no runtime reflection over trait methods, so each proxy adapter
//! describes its methods with a `MethodDescriptor` and names its interface
//! through `RemoteInterface`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Declared return shape of an interface method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReturnShape {
    /// Returns a value synchronously (or nothing at all)
    Sync,
    /// Asynchronous with no result payload (fire and forget)
    AsyncUnit,
    /// Asynchronous with a typed result
    AsyncValue,
}

impl ReturnShape {
    /// Only request/response calls with a typed result can be proxied.
    pub fn is_supported(&self) -> bool {
        matches!(self, Self::AsyncValue)
    }
}

impl fmt::Display for ReturnShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sync => write!(f, "sync"),
            Self::AsyncUnit => write!(f, "async-unit"),
            Self::AsyncValue => write!(f, "async-value"),
        }
    }
}

/// Static description of one interface method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodDescriptor {
    /// Remote method name, as the handler knows it
    pub name: &'static str,
    /// Declared return shape
    pub shape: ReturnShape,
}

impl MethodDescriptor {
    /// Asynchronous method with a typed result
    pub const fn returning(name: &'static str) -> Self {
        Self {
            name,
            shape: ReturnShape::AsyncValue,
        }
    }

    /// Asynchronous method without a result
    pub const fn async_unit(name: &'static str) -> Self {
        Self {
            name,
            shape: ReturnShape::AsyncUnit,
        }
    }

    /// Synchronous method
    pub const fn sync(name: &'static str) -> Self {
        Self {
            name,
            shape: ReturnShape::Sync,
        }
    }
}

/// An interface that can be called remotely.
///
/// Usually implemented for the trait object type, e.g.
/// `impl RemoteInterface for dyn Calculator`.
pub trait RemoteInterface: Send + Sync + 'static {
    /// Interface name used as the first routing key segment
    const NAME: &'static str;
}

/// Address of a remote handler: `"{InterfaceName}.{MethodName}"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoutingKey(String);

impl RoutingKey {
    /// Build the routing key for a method on an interface.
    pub fn new(interface: &str, method: &str) -> Self {
        Self(format!("{}.{}", interface, method))
    }

    /// Routing key for a method of `I`
    pub fn for_method<I: RemoteInterface + ?Sized>(method: &MethodDescriptor) -> Self {
        Self::new(I::NAME, method.name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for RoutingKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    trait Inventory: Send + Sync {}

    impl RemoteInterface for dyn Inventory {
        const NAME: &'static str = "IInventory";
    }

    #[test]
    fn test_routing_key_format() {
        let key = RoutingKey::for_method::<dyn Inventory>(&MethodDescriptor::returning("Reserve"));
        assert_eq!(key.as_str(), "IInventory.Reserve");
        assert_eq!(key.to_string(), "IInventory.Reserve");
    }

    #[test]
    fn test_routing_key_is_pure() {
        let method = MethodDescriptor::returning("Reserve");
        let first = RoutingKey::for_method::<dyn Inventory>(&method);
        let second = RoutingKey::for_method::<dyn Inventory>(&method);
        assert_eq!(first, second);
        assert_eq!(first, RoutingKey::new("IInventory", "Reserve"));
    }

    #[test]
    fn test_shape_support() {
        assert!(MethodDescriptor::returning("a").shape.is_supported());
        assert!(!MethodDescriptor::async_unit("b").shape.is_supported());
        assert!(!MethodDescriptor::sync("c").shape.is_supported());
    }
}
