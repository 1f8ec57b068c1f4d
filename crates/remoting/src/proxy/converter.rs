//! Response converter: raw payload to declared result type.

use crate::adapters::codec::JsonCodec;
use crate::domain::error::{RemotingError, RemotingResult};
use crate::domain::message::RemoteMessage;
use crate::ports::codec::Codec;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Converts success payloads into the result type a method declares.
#[derive(Clone)]
pub struct ResponseConverter {
    codec: Arc<dyn Codec>,
}

impl ResponseConverter {
    pub fn new(codec: Arc<dyn Codec>) -> Self {
        Self { codec }
    }

    /// Decode `payload` and deserialize it into `T`.
    ///
    /// Any mismatch is a `Conversion` error naming the target type.
    pub fn convert<T: DeserializeOwned>(&self, payload: &str) -> RemotingResult<T> {
        let target = std::any::type_name::<T>();
        let value = self
            .codec
            .decode(payload)
            .map_err(|e| RemotingError::Conversion {
                target,
                reason: e.to_string(),
            })?;

        serde_json::from_value(value).map_err(|e| RemotingError::Conversion {
            target,
            reason: e.to_string(),
        })
    }

    /// Convert a whole reply.
    ///
    /// Faults are not converted: they come back as the unwrapped remote fault.
    pub fn convert_message<T, M>(&self, message: M) -> RemotingResult<T>
    where
        T: DeserializeOwned,
        M: RemoteMessage,
    {
        match message.into_outcome() {
            Ok(payload) => self.convert(&payload),
            Err(fault) => Err(RemotingError::Remote(fault.into_root_cause())),
        }
    }
}

impl Default for ResponseConverter {
    fn default() -> Self {
        Self::new(Arc::new(JsonCodec))
    }
}
