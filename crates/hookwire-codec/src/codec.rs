//! The base codec: plain serde conversion to and from JSON trees.
//!
//! The lifecycle adapter doesn't care HOW a type is serialized; it just
//! needs something that implements [`Codec`]. Hooks and wrapped fields
//! are layered on top; the base codec never sees them.
//!
//! The codec works on `serde_json::Value` trees rather than bytes because
//! wrapped fields are looked up by key in the same tree the base decode
//! reads from, and inserted into the tree the base encode produced.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use hookwire_marker::short_type_name;

use crate::WireError;

/// A codec that converts Rust values to JSON trees and back.
///
/// ## Trait bounds explained
///
/// - `Send + Sync` → one codec is shared by every thread decoding
///   responses.
/// - `'static` → the codec owns everything it needs, so it can live in a
///   long-lived pipeline.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into a tree.
    ///
    /// # Errors
    /// Returns `WireError::Encode` if the value can't be represented as
    /// JSON (e.g. a map with non-string keys).
    fn encode<T: Serialize>(&self, value: &T) -> Result<Value, WireError>;

    /// Deserializes a tree into a value.
    ///
    /// # Errors
    /// Returns `WireError::Decode` if the tree doesn't match the expected
    /// type.
    fn decode<T: DeserializeOwned>(&self, tree: &Value) -> Result<T, WireError>;

    /// Parses raw bytes into a tree.
    ///
    /// # Errors
    /// Returns `WireError::Syntax` for anything that isn't a JSON document.
    fn parse(&self, data: &[u8]) -> Result<Value, WireError>;

    /// Renders a tree as bytes.
    ///
    /// # Errors
    /// Returns `WireError::Encode` if rendering fails.
    fn render(&self, tree: &Value) -> Result<Vec<u8>, WireError>;
}

// ---------------------------------------------------------------------------
// JsonCodec
// ---------------------------------------------------------------------------

/// A [`Codec`] backed by `serde_json`.
///
/// ## Example
///
/// ```rust
/// use hookwire_codec::{Codec, JsonCodec};
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Debug, PartialEq, Serialize, Deserialize)]
/// struct Champion {
///     id: u32,
///     name: String,
/// }
///
/// let codec = JsonCodec;
/// let champion = Champion { id: 7, name: "Leblanc".into() };
///
/// let tree = codec.encode(&champion).unwrap();
/// assert_eq!(tree["name"], "Leblanc");
///
/// let decoded: Champion = codec.decode(&tree).unwrap();
/// assert_eq!(champion, decoded);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Value, WireError> {
        serde_json::to_value(value).map_err(|source| WireError::Encode {
            ty: short_type_name(std::any::type_name::<T>()),
            source,
        })
    }

    fn decode<T: DeserializeOwned>(&self, tree: &Value) -> Result<T, WireError> {
        // `&Value` is itself a serde `Deserializer`, so this reads the tree
        // in place instead of cloning it first.
        T::deserialize(tree).map_err(|source| WireError::Decode {
            ty: short_type_name(std::any::type_name::<T>()),
            source,
        })
    }

    fn parse(&self, data: &[u8]) -> Result<Value, WireError> {
        serde_json::from_slice(data).map_err(|source| WireError::Syntax { source })
    }

    fn render(&self, tree: &Value) -> Result<Vec<u8>, WireError> {
        serde_json::to_vec(tree).map_err(|source| WireError::Encode {
            ty: "Value",
            source,
        })
    }
}
