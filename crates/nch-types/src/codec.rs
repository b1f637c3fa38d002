//! Message codec registry.
//!
//! A [`Registry`] maps a stable type name (for example `"nch/MsgContract"`) to a
//! concrete message type. It is built once at startup, sealed, and then shared
//! by reference with every component that encodes or decodes messages. The
//! wire form is a JSON envelope `{"type": <name>, "value": <message>}`.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Codec errors
#[derive(Debug, Error)]
pub enum CodecError {
    /// Registration attempted after [`Registry::seal`]
    #[error("registry is sealed")]
    Sealed,
    /// The name or the type is already registered
    #[error("duplicate registration: {0}")]
    Duplicate(String),
    /// Envelope names a type that was never registered
    #[error("unknown message type: {0}")]
    UnknownType(String),
    /// Message type was never registered
    #[error("unregistered message type")]
    Unregistered,
    /// Decoded message does not have the requested type
    #[error("message is {found}, not the requested type")]
    TypeMismatch {
        /// Registered name of the decoded message
        found: String,
    },
    /// Message failed stateless validation
    #[error("invalid message: {0}")]
    Invalid(String),
    /// JSON error
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// A transaction message
pub trait Message: fmt::Debug + Any + Send + Sync {
    /// Name of the module that handles the message
    fn route(&self) -> &'static str;

    /// Stateless checks run before execution
    fn validate_basic(&self) -> Result<(), CodecError>;
}

type EncodeFn = fn(&dyn Any) -> Result<serde_json::Value, CodecError>;
type DecodeFn = fn(serde_json::Value) -> Result<Box<dyn Any + Send + Sync>, CodecError>;

struct Entry {
    name: &'static str,
    encode: EncodeFn,
    decode: DecodeFn,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    value: serde_json::Value,
}

/// Explicit message type registry
#[derive(Default)]
pub struct Registry {
    by_type: HashMap<TypeId, Entry>,
    by_name: HashMap<&'static str, TypeId>,
    sealed: bool,
}

/// A decoded message together with its registered name
pub struct Decoded {
    name: &'static str,
    value: Box<dyn Any + Send + Sync>,
}

impl fmt::Debug for Decoded {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Decoded").field("name", &self.name).finish_non_exhaustive()
    }
}

impl Decoded {
    /// Registered name of the message type
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Take the message as its concrete type
    pub fn downcast<T: Message>(self) -> Result<T, CodecError> {
        let name = self.name;
        self.value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| CodecError::TypeMismatch { found: name.to_string() })
    }
}

fn encode_as<T: Message + Serialize>(msg: &dyn Any) -> Result<serde_json::Value, CodecError> {
    let msg = msg.downcast_ref::<T>().ok_or(CodecError::Unregistered)?;
    Ok(serde_json::to_value(msg)?)
}

fn decode_as<T: Message + DeserializeOwned>(
    value: serde_json::Value,
) -> Result<Box<dyn Any + Send + Sync>, CodecError> {
    let msg: T = serde_json::from_value(value)?;
    msg.validate_basic()?;
    Ok(Box::new(msg))
}

impl Registry {
    /// Create an empty, unsealed registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` under `name`
    pub fn register<T>(&mut self, name: &'static str) -> Result<&mut Self, CodecError>
    where
        T: Message + Serialize + DeserializeOwned,
    {
        if self.sealed {
            return Err(CodecError::Sealed);
        }
        let id = TypeId::of::<T>();
        if self.by_name.contains_key(name) || self.by_type.contains_key(&id) {
            return Err(CodecError::Duplicate(name.to_string()));
        }
        self.by_type.insert(
            id,
            Entry {
                name,
                encode: encode_as::<T>,
                decode: decode_as::<T>,
            },
        );
        self.by_name.insert(name, id);
        Ok(self)
    }

    /// Forbid further registrations
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    /// Whether [`Registry::seal`] was called
    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    /// Registered name of `T`, if any
    pub fn name_of<T: Message>(&self) -> Option<&'static str> {
        self.by_type.get(&TypeId::of::<T>()).map(|e| e.name)
    }

    /// Encode a message into its JSON envelope
    pub fn encode<T: Message>(&self, msg: &T) -> Result<Vec<u8>, CodecError> {
        let entry = self
            .by_type
            .get(&TypeId::of::<T>())
            .ok_or(CodecError::Unregistered)?;
        let envelope = Envelope {
            kind: entry.name.to_string(),
            value: (entry.encode)(msg)?,
        };
        Ok(serde_json::to_vec(&envelope)?)
    }

    /// Decode and validate a JSON envelope
    pub fn decode(&self, bytes: &[u8]) -> Result<Decoded, CodecError> {
        let envelope: Envelope = serde_json::from_slice(bytes)?;
        let entry = self
            .by_name
            .get(envelope.kind.as_str())
            .and_then(|id| self.by_type.get(id))
            .ok_or(CodecError::UnknownType(envelope.kind))?;
        Ok(Decoded {
            name: entry.name,
            value: (entry.decode)(envelope.value)?,
        })
    }
}
