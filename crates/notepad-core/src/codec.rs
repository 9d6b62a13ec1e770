//! Value (de)serialization for the persistent store
//!
//! Stores hold typed values but the substrate only speaks strings. A store is
//! configured with a serializer and deserializer pair; JSON is the default.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while converting between values and raw entries
#[derive(Error, Debug)]
pub enum CodecError {
    /// The value could not be turned into a string
    #[error("Failed to encode value: {0}")]
    Encode(String),

    /// The raw entry could not be interpreted as a value
    #[error("Failed to decode value: {0}")]
    Decode(String),
}

impl From<serde_json::Error> for CodecError {
    fn from(error: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match error.classify() {
            Category::Io => CodecError::Encode(error.to_string()),
            Category::Syntax | Category::Data | Category::Eof => {
                CodecError::Decode(error.to_string())
            }
        }
    }
}

/// Converts a typed value into a raw entry
pub type Serializer<T> = Arc<dyn Fn(&T) -> Result<String, CodecError> + Send + Sync>;

/// Converts a raw entry back into a typed value
pub type Deserializer<T> = Arc<dyn Fn(&str) -> Result<T, CodecError> + Send + Sync>;

/// Default serializer: compact JSON
pub fn json_serializer<T: Serialize + 'static>() -> Serializer<T> {
    Arc::new(|value: &T| serde_json::to_string(value).map_err(|e| CodecError::Encode(e.to_string())))
}

/// Default deserializer: JSON
pub fn json_deserializer<T: DeserializeOwned + 'static>() -> Deserializer<T> {
    Arc::new(|raw: &str| serde_json::from_str(raw).map_err(CodecError::from))
}
