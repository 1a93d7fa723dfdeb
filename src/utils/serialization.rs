// src/utils/serialization.rs
//! Serialization utilities.
//!
//! Thin wrappers over `serde_json` used by the durable token store and by
//! certificate signing, which needs a stable compact encoding.

use serde::{Deserialize, Serialize};
use serde_json;

/// Serializes a value to a compact JSON string.
///
/// # Arguments
/// * `data` - The value to serialize (must implement `Serialize`)
///
/// # Returns
/// - `Ok(String)` with JSON representation on success
/// - `Err(serde_json::Error)` if serialization fails
pub fn serialize<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string(data)
}

/// Serializes a value to indented JSON, for files a human may open.
pub fn serialize_pretty<T: Serialize>(data: &T) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(data)
}

/// Deserializes a value from a JSON string.
///
/// # Arguments
/// * `data` - JSON string to deserialize
///
/// # Note
/// The lifetime parameter lets the deserialized value borrow from the input.
pub fn deserialize<'a, T: Deserialize<'a>>(data: &'a str) -> Result<T, serde_json::Error> {
    serde_json::from_str(data)
}
