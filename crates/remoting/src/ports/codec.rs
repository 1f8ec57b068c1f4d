//! Codec port for arguments and result payloads.

use crate::domain::error::CodecError;

/// Turns structured values into strings and back.
///
/// Arguments are encoded one at a time; result payloads are decoded before
/// being deserialized into the declared return type.
pub trait Codec: Send + Sync {
    /// Encode a single value
    fn encode(&self, value: &serde_json::Value) -> Result<String, CodecError>;

    /// Decode a single value
    fn decode(&self, raw: &str) -> Result<serde_json::Value, CodecError>;
}
