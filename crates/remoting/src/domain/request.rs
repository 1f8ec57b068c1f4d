//! Remote request body.

use serde::{Deserialize, Serialize};

/// A method call as it is sent to the remote handler.
///
/// Arguments are serialized one by one, in declaration order. The request
/// is immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteRequest {
    method: String,
    args: Vec<String>,
}

impl RemoteRequest {
    pub fn new(method: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            method: method.into(),
            args,
        }
    }

    /// Method name
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Serialized arguments, in declaration order
    pub fn args(&self) -> &[String] {
        &self.args
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_wire_shape() {
        let request = RemoteRequest::new("AsyncBooleanMethod", vec!["\"adf\"".into()]);
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["method"], "AsyncBooleanMethod");
        assert_eq!(json["args"][0], "\"adf\"");
    }

    #[test]
    fn test_argument_order_is_kept() {
        let request = RemoteRequest::new("Add", vec!["1".into(), "2".into(), "3".into()]);
        assert_eq!(request.method(), "Add");
        assert_eq!(request.args(), ["1", "2", "3"]);
    }
}
