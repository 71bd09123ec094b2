//! Message codec
//!
//! Translates between typed protocol messages and the JSON text carried by
//! the connection. Decoding never panics: malformed text, a missing `kind`
//! discriminator, an unknown kind and a payload of the wrong shape are all
//! reported as a [`DecodeError`]. Unknown fields inside payloads are ignored
//! so that the server can add fields without breaking older clients.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

/// A message family that can be carried in an envelope
///
/// Implementors map each variant to its `kind` discriminator and to the
/// JSON value stored under `data`.
pub trait Message: Sized {
    /// The discriminator written to the envelope's `kind` field
    fn kind(&self) -> &'static str;

    /// The payload written to the envelope's `data` field
    ///
    /// Returns `Value::Null` for kinds without a payload, in which case the
    /// field is omitted from the wire.
    fn to_data(&self) -> serde_json::Result<Value>;

    /// Rebuilds a message from its discriminator and payload
    ///
    /// # Returns
    ///
    /// `Ok(None)` if `kind` is not part of this message family
    fn from_data(kind: &str, data: Value) -> serde_json::Result<Option<Self>>;
}

/// Reasons an inbound message could not be decoded
#[derive(Debug, Error)]
pub enum DecodeError {
    /// The text is not valid JSON
    #[error("malformed message: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The message has no string `kind` field
    #[error("message has no kind discriminator")]
    MissingKind,
    /// The `kind` is not one this client understands
    #[error("unknown message kind `{0}`")]
    UnknownKind(String),
    /// The payload does not match the shape expected for its kind
    #[error("invalid payload for `{kind}`: {source}")]
    Payload {
        /// The discriminator of the offending message
        kind: String,
        /// The underlying deserialization error
        #[source]
        source: serde_json::Error,
    },
}

/// The wire shape shared by every message
#[derive(Debug, Serialize)]
struct Envelope<'a> {
    kind: &'a str,
    #[serde(skip_serializing_if = "Value::is_null")]
    data: Value,
}

/// Serializes a payload struct into an envelope `data` value
pub(crate) fn data<T: Serialize>(payload: &T) -> serde_json::Result<Value> {
    serde_json::to_value(payload)
}

/// Deserializes an envelope `data` value into a payload struct
///
/// An absent `data` field is read as an empty object so that payloads whose
/// fields all have defaults can be omitted entirely.
pub(crate) fn payload<T: DeserializeOwned>(data: Value) -> serde_json::Result<T> {
    match data {
        Value::Null => serde_json::from_value(Value::Object(Map::new())),
        data => serde_json::from_value(data),
    }
}

/// Encodes a message into its wire text
///
/// # Errors
///
/// Returns the serializer's error if a payload cannot be represented as JSON.
pub fn encode<M: Message>(message: &M) -> serde_json::Result<String> {
    serde_json::to_string(&Envelope {
        kind: message.kind(),
        data: message.to_data()?,
    })
}

/// Decodes wire text into a message
///
/// # Errors
///
/// Returns a [`DecodeError`] describing why the text is not a message of
/// family `M`.
pub fn decode<M: Message>(text: &str) -> Result<M, DecodeError> {
    let value: Value = serde_json::from_str(text).map_err(DecodeError::Malformed)?;

    let Value::Object(mut object) = value else {
        return Err(DecodeError::MissingKind);
    };

    let kind = match object.remove("kind") {
        Some(Value::String(kind)) => kind,
        _ => return Err(DecodeError::MissingKind),
    };

    let data = object.remove("data").unwrap_or(Value::Null);

    match M::from_data(&kind, data) {
        Ok(Some(message)) => Ok(message),
        Ok(None) => Err(DecodeError::UnknownKind(kind)),
        Err(source) => Err(DecodeError::Payload { kind, source }),
    }
}
