//! JSON codec.

use crate::domain::error::CodecError;
use crate::ports::codec::Codec;

/// Compact JSON, one document per argument or payload.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode(&self, value: &serde_json::Value) -> Result<String, CodecError> {
        serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string()))
    }

    fn decode(&self, raw: &str) -> Result<serde_json::Value, CodecError> {
        serde_json::from_str(raw).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_encode_is_compact() {
        let encoded = JsonCodec.encode(&json!({ "a": [1, 2] })).unwrap();
        assert_eq!(encoded, r#"{"a":[1,2]}"#);
        assert_eq!(JsonCodec.encode(&json!("adf")).unwrap(), "\"adf\"");
    }

    #[test]
    fn test_decode_scalars() {
        assert_eq!(JsonCodec.decode("true").unwrap(), json!(true));
        assert_eq!(JsonCodec.decode("null").unwrap(), json!(null));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(matches!(
            JsonCodec.decode("{not json"),
            Err(CodecError::Decode(_))
        ));
    }
}
