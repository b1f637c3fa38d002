//! `0x`-prefixed hex (de)serialization for byte payloads.
//!
//! Use with `#[serde(with = "nch_types::serde_hex")]` on a [`Bytes`] field.

use bytes::Bytes;
use serde::{de, Deserialize, Deserializer, Serializer};

/// Serialize bytes as a `0x`-prefixed hex string
pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("0x{}", hex::encode(bytes)))
}

/// Deserialize bytes from a hex string, `0x` prefix optional
pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
    let s = String::deserialize(deserializer)?;
    let s = s.strip_prefix("0x").unwrap_or(&s);
    hex::decode(s).map(Bytes::from).map_err(de::Error::custom)
}
